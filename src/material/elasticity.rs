use crate::base::{check_young_poisson, t2_pressure, Idealization};
use crate::StrError;
use russell_tensor::{t4_ddot_t2, LinElasticity, Tensor2, Tensor4};

/// Specifies the essential functions for elasticity models
///
/// Implementations are pure functions of their inputs.
pub trait ElasticityTrait: Send + Sync {
    /// Computes the elastic rigidity modulus Dₑ at the given stress state
    fn stiffness(&self, dde: &mut Tensor4, stress: &Tensor2) -> Result<(), StrError>;

    /// Computes the stress corresponding to an elastic strain
    fn stress_given_strain(&self, stress: &mut Tensor2, elastic_strain: &Tensor2) -> Result<(), StrError>;

    /// Returns the names of the parameters
    fn parameter_names(&self) -> &'static [&'static str];

    /// Returns the value of a parameter
    fn get_parameter(&self, index: usize) -> Result<f64, StrError>;

    /// Sets the value of a parameter
    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError>;
}

/// Implements linear isotropic elasticity
pub struct LinearIsotropic {
    /// Linear elasticity
    lin_elasticity: LinElasticity,

    /// Young's modulus
    young: f64,

    /// Poisson's coefficient
    poisson: f64,
}

/// Implements isotropic elasticity with pressure-dependent Young's modulus
///
/// ```text
/// E(p) = Eref (max(p, pmin pref) / pref)ⁿ
/// ```
///
/// The Poisson coefficient is constant, thus the bulk and shear moduli scale together.
pub struct PressureDependentIsotropic {
    young_ref: f64,
    poisson: f64,
    p_ref: f64,
    exponent: f64,
    p_min_ratio: f64,
}

impl LinearIsotropic {
    /// Allocates a new instance
    pub fn new(ideal: &Idealization, young: f64, poisson: f64) -> Result<Self, StrError> {
        ideal.validate()?;
        check_young_poisson(young, poisson)?;
        Ok(LinearIsotropic {
            lin_elasticity: LinElasticity::new(young, poisson, ideal.two_dim, false),
            young,
            poisson,
        })
    }
}

impl ElasticityTrait for LinearIsotropic {
    fn stiffness(&self, dde: &mut Tensor4, _stress: &Tensor2) -> Result<(), StrError> {
        dde.set_tensor(1.0, self.lin_elasticity.get_modulus());
        Ok(())
    }

    fn stress_given_strain(&self, stress: &mut Tensor2, elastic_strain: &Tensor2) -> Result<(), StrError> {
        t4_ddot_t2(stress, 1.0, self.lin_elasticity.get_modulus(), elastic_strain);
        Ok(())
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["young", "poisson"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.young),
            1 => Ok(self.poisson),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        let (young, poisson) = match index {
            0 => (value, self.poisson),
            1 => (self.young, value),
            _ => return Err("parameter index is out of range"),
        };
        check_young_poisson(young, poisson)?;
        self.lin_elasticity.set_young_poisson(young, poisson);
        self.young = young;
        self.poisson = poisson;
        Ok(())
    }
}

impl PressureDependentIsotropic {
    /// Allocates a new instance
    pub fn new(
        ideal: &Idealization,
        young_ref: f64,
        poisson: f64,
        p_ref: f64,
        exponent: f64,
        p_min_ratio: f64,
    ) -> Result<Self, StrError> {
        ideal.validate()?;
        check_young_poisson(young_ref, poisson)?;
        let mut model = PressureDependentIsotropic {
            young_ref,
            poisson,
            p_ref: 1.0,
            exponent: 0.0,
            p_min_ratio: 1.0,
        };
        model.set_parameter(2, p_ref)?;
        model.set_parameter(3, exponent)?;
        model.set_parameter(4, p_min_ratio)?;
        Ok(model)
    }

    /// Returns the Young modulus at a given mean pressure
    pub fn young_at(&self, p: f64) -> f64 {
        let p_eff = f64::max(p, self.p_min_ratio * self.p_ref);
        self.young_ref * f64::powf(p_eff / self.p_ref, self.exponent)
    }

    /// Sets the isotropic modulus D = 2G Psd + K I⊗I
    fn set_modulus(&self, dde: &mut Tensor4, young: f64) {
        let kk = young / (3.0 * (1.0 - 2.0 * self.poisson));
        let gg = young / (2.0 * (1.0 + self.poisson));
        let mat = dde.matrix_mut();
        let (n, _) = mat.dims();
        for i in 0..n {
            for j in 0..n {
                let sym = if i == j { 1.0 } else { 0.0 };
                let iso = if i < 3 && j < 3 { 1.0 } else { 0.0 };
                mat.set(i, j, 2.0 * gg * (sym - iso / 3.0) + kk * iso);
            }
        }
    }
}

impl ElasticityTrait for PressureDependentIsotropic {
    fn stiffness(&self, dde: &mut Tensor4, stress: &Tensor2) -> Result<(), StrError> {
        let young = self.young_at(t2_pressure(stress));
        self.set_modulus(dde, young);
        Ok(())
    }

    /// Computes the stress using the modulus at the reference pressure (secant at p = pref)
    fn stress_given_strain(&self, stress: &mut Tensor2, elastic_strain: &Tensor2) -> Result<(), StrError> {
        let mut dde = Tensor4::new(stress.mandel());
        self.set_modulus(&mut dde, self.young_ref);
        t4_ddot_t2(stress, 1.0, &dde, elastic_strain);
        Ok(())
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["young_ref", "poisson", "p_ref", "exponent", "p_min_ratio"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.young_ref),
            1 => Ok(self.poisson),
            2 => Ok(self.p_ref),
            3 => Ok(self.exponent),
            4 => Ok(self.p_min_ratio),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        match index {
            0 => {
                check_young_poisson(value, self.poisson)?;
                self.young_ref = value;
            }
            1 => {
                check_young_poisson(self.young_ref, value)?;
                self.poisson = value;
            }
            2 => {
                if value <= 0.0 {
                    return Err("reference pressure must be > 0.0");
                }
                self.p_ref = value;
            }
            3 => {
                if value < 0.0 || value > 1.0 {
                    return Err("pressure exponent must be in [0.0, 1.0]");
                }
                self.exponent = value;
            }
            4 => {
                if value <= 0.0 || value > 1.0 {
                    return Err("minimum pressure ratio must be in (0.0, 1.0]");
                }
                self.p_min_ratio = value;
            }
            _ => return Err("parameter index is out of range"),
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
