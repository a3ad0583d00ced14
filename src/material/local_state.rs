use russell_lab::{vec_copy, Vector};
use russell_tensor::{Mandel, Tensor2, Tensor4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Holds the state of a material point
///
/// This data is associated with a Gauss (integration) point.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalState {
    /// Holds the stress tensor σ
    pub stress: Tensor2,

    /// Holds the total strain tensor ε
    pub strain: Tensor2,

    /// Holds the plastic strain tensor εp
    pub plastic_strain: Tensor2,

    /// Holds the internal values Z (all evolving variables, concatenated)
    pub internal_values: Vector,

    /// Holds the consistent tangent of the last increment
    pub tangent: Tensor4,

    /// Holds the elastic (vs elastoplastic) flag of the last increment
    pub elastic: bool,

    /// Holds the apex return flag
    pub apex_return: bool,

    /// Holds the algorithmic lagrange multiplier (ΣΔλ) of the last increment
    pub algo_lagrange: f64,

    /// Holds the yield function evaluation f(σ, Z) at the end of the last increment
    pub yield_value: f64,

    /// Holds the number of accepted sub-steps of the last increment
    pub n_substeps: usize,
}

impl LocalState {
    /// Allocates a new instance with zero stress and strain
    pub fn new(mandel: Mandel, n_internal_values: usize) -> Self {
        LocalState {
            stress: Tensor2::new(mandel),
            strain: Tensor2::new(mandel),
            plastic_strain: Tensor2::new(mandel),
            internal_values: Vector::new(n_internal_values),
            tangent: Tensor4::new(mandel),
            elastic: true,
            apex_return: false,
            algo_lagrange: 0.0,
            yield_value: 0.0,
            n_substeps: 0,
        }
    }

    /// Returns the Mandel representation
    pub fn mandel(&self) -> Mandel {
        self.stress.mandel()
    }

    /// Copies all data from another state without allocating memory
    ///
    /// ```text
    /// self := other
    /// ```
    ///
    /// # Panics
    ///
    /// A panic will occur if the states have different dimensions.
    pub fn mirror(&mut self, other: &LocalState) {
        self.stress.set_tensor(1.0, &other.stress);
        self.strain.set_tensor(1.0, &other.strain);
        self.plastic_strain.set_tensor(1.0, &other.plastic_strain);
        vec_copy(&mut self.internal_values, &other.internal_values).unwrap();
        self.tangent.set_tensor(1.0, &other.tangent);
        self.elastic = other.elastic;
        self.apex_return = other.apex_return;
        self.algo_lagrange = other.algo_lagrange;
        self.yield_value = other.yield_value;
        self.n_substeps = other.n_substeps;
    }

    /// Updates the strain tensor given Δε
    ///
    /// ```text
    /// ε += α Δε
    /// ```
    ///
    /// # Panics
    ///
    /// A panic will occur if the tensors have different [Mandel].
    pub fn update_strain(&mut self, alpha: f64, deps: &Tensor2) {
        assert_eq!(deps.mandel(), self.strain.mandel());
        self.strain.update(alpha, deps);
    }
}

impl fmt::Display for LocalState {
    /// Returns a nicely formatted string representing the state
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "σ =\n")?;
        let mat = self.stress.as_matrix();
        match f.precision() {
            Some(v) => write!(f, "{:.1$}", mat, v)?,
            None => write!(f, "{}", mat)?,
        }
        write!(f, "\nε =\n")?;
        let mat = self.strain.as_matrix();
        match f.precision() {
            Some(v) => write!(f, "{:.1$}", mat, v)?,
            None => write!(f, "{}", mat)?,
        }
        write!(f, "\nεp = {:?}", self.plastic_strain.vector().as_data())?;
        write!(f, "\nz = {:?}", self.internal_values.as_data())?;
        write!(f, "\nelastic = {}", self.elastic)?;
        write!(f, "\napex_return = {}", self.apex_return)?;
        write!(f, "\nalgo_lagrange = {:?}", self.algo_lagrange)?;
        write!(f, "\nyield_value = {:?}", self.yield_value)?;
        write!(f, "\nn_substeps = {}", self.n_substeps)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
