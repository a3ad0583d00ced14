use crate::base::{t2_isotropic, t2_pressure};
use crate::StrError;
use russell_lab::Vector;
use russell_tensor::Tensor2;

/// Defines the outcome of a pre-integration callback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intercept {
    /// Continue with the regular integration (the trial stress must be left unchanged)
    Proceed,

    /// Accept the (modified) trial stress as the final stress of the increment
    Accept,
}

/// Specifies a callback executed after the elastic trial and before the yield check
pub trait PreIntegrationTrait: Send + Sync {
    /// Inspects and possibly replaces the trial stress
    ///
    /// # Input
    ///
    /// * `trial` -- the elastic trial stress; may be overwritten when returning [Intercept::Accept]
    /// * `z` -- the internal values at the beginning of the increment
    fn intercept(&self, trial: &mut Tensor2, z: &Vector) -> Result<Intercept, StrError>;
}

/// Maps trial states in tension to the apex of the cone
///
/// Any trial stress with mean pressure `p < p_cutoff` is replaced by the
/// isotropic state `σ = -p_cutoff I` and accepted. The inelastic part of the
/// strain increment becomes plastic strain.
pub struct TensionCutoff {
    /// Mean pressure of the cutoff (apex) state
    p_cutoff: f64,
}

impl TensionCutoff {
    /// Allocates a new instance
    pub fn new(p_cutoff: f64) -> Result<Self, StrError> {
        if p_cutoff < 0.0 {
            return Err("cutoff pressure must be ≥ 0.0");
        }
        Ok(TensionCutoff { p_cutoff })
    }
}

impl PreIntegrationTrait for TensionCutoff {
    fn intercept(&self, trial: &mut Tensor2, _z: &Vector) -> Result<Intercept, StrError> {
        if t2_pressure(trial) >= self.p_cutoff {
            return Ok(Intercept::Proceed);
        }
        t2_isotropic(trial, -self.p_cutoff);
        Ok(Intercept::Accept)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
