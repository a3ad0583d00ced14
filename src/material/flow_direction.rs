use super::{BackstressAndSize, InternalLayout, YieldFunctionTrait};
use crate::base::{t2_load, t2_split};
use crate::StrError;
use russell_lab::{vec_scale, Vector};
use russell_tensor::{t2_add, Mandel, Tensor2};

/// Specifies the essential functions for the plastic flow direction
///
/// The direction m is unit-normalized, thus the plastic strain increment is Δεp = Δλ m.
pub trait FlowDirectionTrait: Send + Sync {
    /// Validates the internal layout and records the position of the variables
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError>;

    /// Calculates the unit flow direction m(σ, Z)
    fn direction(&mut self, m: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError>;

    /// Returns the names of the parameters
    fn parameter_names(&self) -> &'static [&'static str] {
        &[]
    }

    /// Returns the value of a parameter
    fn get_parameter(&self, _index: usize) -> Result<f64, StrError> {
        Err("parameter index is out of range")
    }

    /// Sets the value of a parameter
    fn set_parameter(&mut self, _index: usize, _value: f64) -> Result<(), StrError> {
        Err("parameter index is out of range")
    }
}

/// Implements the deviatoric (non-associated) Drucker-Prager flow
///
/// ```text
/// ξ = dev(σ) - p α
/// m = ξ / ‖ξ‖
/// ```
pub struct DeviatoricFlow {
    offsets: Option<BackstressAndSize>,
    s: Tensor2,
    alpha: Tensor2,
}

/// Implements a dilatant (non-associated) Drucker-Prager flow
///
/// ```text
/// m ∝ ξ/‖ξ‖ + (d/3) I
/// ```
///
/// where d is the dilatancy. The associated flow corresponds to d = √(2/3) k.
pub struct DilatantFlow {
    dilatancy: f64,
    offsets: Option<BackstressAndSize>,
    ii: Tensor2,
    s: Tensor2,
    alpha: Tensor2,
}

/// Implements the associated flow m = (∂f/∂σ) / ‖∂f/∂σ‖
pub struct AssociatedFlow<Y: YieldFunctionTrait> {
    yield_function: Y,
}

/// Computes ξ = dev(σ) - p α into xi and returns ‖ξ‖
fn relative_deviator(
    xi: &mut Tensor2,
    s: &mut Tensor2,
    alpha: &mut Tensor2,
    offsets: Option<BackstressAndSize>,
    stress: &Tensor2,
    z: &Vector,
) -> Result<f64, StrError> {
    let offsets = offsets.ok_or("flow direction must be bound to the internal layout")?;
    let p = t2_split(s, stress);
    match offsets.alpha {
        Some(a) => {
            t2_load(alpha, &z.as_data()[a..]);
            t2_add(xi, 1.0, s, -p, alpha);
        }
        None => xi.set_tensor(1.0, s),
    }
    Ok(xi.norm())
}

/// Scales m to unit length (unless m = 0)
fn normalize(m: &mut Tensor2) {
    let norm = m.norm();
    if norm > 0.0 {
        vec_scale(m.vector_mut(), 1.0 / norm);
    }
}

impl DeviatoricFlow {
    /// Allocates a new instance
    pub fn new() -> Self {
        DeviatoricFlow {
            offsets: None,
            s: Tensor2::new(Mandel::Symmetric),
            alpha: Tensor2::new(Mandel::Symmetric),
        }
    }
}

impl FlowDirectionTrait for DeviatoricFlow {
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError> {
        self.offsets = Some(layout.backstress_and_size()?);
        self.s = Tensor2::new(layout.mandel());
        self.alpha = Tensor2::new(layout.mandel());
        Ok(())
    }

    fn direction(&mut self, m: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        relative_deviator(m, &mut self.s, &mut self.alpha, self.offsets, stress, z)?;
        normalize(m);
        Ok(())
    }
}

impl DilatantFlow {
    /// Allocates a new instance
    pub fn new(dilatancy: f64) -> Result<Self, StrError> {
        if dilatancy < 0.0 {
            return Err("dilatancy must be ≥ 0.0");
        }
        Ok(DilatantFlow {
            dilatancy,
            offsets: None,
            ii: Tensor2::identity(Mandel::Symmetric),
            s: Tensor2::new(Mandel::Symmetric),
            alpha: Tensor2::new(Mandel::Symmetric),
        })
    }
}

impl FlowDirectionTrait for DilatantFlow {
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError> {
        self.offsets = Some(layout.backstress_and_size()?);
        self.ii = Tensor2::identity(layout.mandel());
        self.s = Tensor2::new(layout.mandel());
        self.alpha = Tensor2::new(layout.mandel());
        Ok(())
    }

    fn direction(&mut self, m: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        relative_deviator(m, &mut self.s, &mut self.alpha, self.offsets, stress, z)?;
        normalize(m);
        m.update(self.dilatancy / 3.0, &self.ii);
        normalize(m);
        Ok(())
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["dilatancy"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.dilatancy),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        match index {
            0 => {
                if value < 0.0 {
                    return Err("dilatancy must be ≥ 0.0");
                }
                self.dilatancy = value;
                Ok(())
            }
            _ => Err("parameter index is out of range"),
        }
    }
}

impl<Y: YieldFunctionTrait> AssociatedFlow<Y> {
    /// Allocates a new instance holding its own copy of the yield function
    pub fn new(yield_function: Y) -> Self {
        AssociatedFlow { yield_function }
    }
}

impl<Y: YieldFunctionTrait> FlowDirectionTrait for AssociatedFlow<Y> {
    fn bind(&mut self, layout: &InternalLayout) -> Result<(), StrError> {
        self.yield_function.bind(layout)
    }

    fn direction(&mut self, m: &mut Tensor2, stress: &Tensor2, z: &Vector) -> Result<(), StrError> {
        self.yield_function.df_dsigma(m, stress, z)?;
        normalize(m);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
