use super::VariableKind;
use crate::StrError;
use russell_tensor::{Tensor2, IDENTITY2, SQRT_2_BY_3, TWO_BY_3};

/// Specifies the essential functions for evolving (hardening) variables
///
/// The rate is the derivative of the variable per unit plastic multiplier:
///
/// ```text
/// Z = Zn + Δλ h(m, σ, Z)
/// ```
pub trait EvolvingVariableTrait: Send + Sync {
    /// Returns the name of the variable
    fn name(&self) -> &'static str;

    /// Returns the kind of the variable (scalar or tensor)
    fn kind(&self) -> VariableKind;

    /// Writes the initial value of the variable
    fn initial_value(&self, value: &mut [f64]);

    /// Calculates the rate h given the flow direction m
    ///
    /// `rate` and `value` hold the components of this variable only.
    fn rate(
        &self,
        rate: &mut [f64],
        m: &Tensor2,
        stress: &Tensor2,
        value: &[f64],
        delta_strain: &Tensor2,
    ) -> Result<(), StrError>;

    /// Indicates whether the variable is bounded by a saturation limit
    fn has_saturation_limit(&self) -> bool {
        false
    }

    /// Brings the value back to the saturation limit, if exceeded
    fn enforce_saturation_limit(&self, _value: &mut [f64], _m: &Tensor2) {}

    /// Returns the names of the parameters
    fn parameter_names(&self) -> &'static [&'static str];

    /// Returns the value of a parameter
    fn get_parameter(&self, index: usize) -> Result<f64, StrError>;

    /// Sets the value of a parameter
    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError>;
}

/// Implements the linear hardening of a scalar variable
///
/// ```text
/// k̇ = H √(⅔ m:m)
/// ```
pub struct LinearHardeningScalar {
    /// Hardening modulus H
    hh: f64,

    /// Initial value k0
    k0: f64,
}

/// Implements the linear hardening of a tensor variable (Prager's rule)
///
/// ```text
/// α̇ = H m
/// ```
pub struct LinearHardeningTensor {
    /// Hardening modulus H
    hh: f64,
}

/// Implements the Armstrong-Frederick nonlinear kinematic hardening
///
/// ```text
/// α̇ = ⅔ ha dev(m) - cr √(⅔ dev(m):dev(m)) α
/// ```
///
/// The backstress saturates at ‖α‖ = √(2/3) ha / cr.
pub struct ArmstrongFrederickTensor {
    /// Hardening modulus ha
    ha: f64,

    /// Recall coefficient cr
    cr: f64,
}

impl LinearHardeningScalar {
    /// Allocates a new instance
    pub fn new(hh: f64, k0: f64) -> Result<Self, StrError> {
        let mut var = LinearHardeningScalar { hh: 0.0, k0: 0.0 };
        var.set_parameter(0, hh)?;
        var.set_parameter(1, k0)?;
        Ok(var)
    }
}

impl EvolvingVariableTrait for LinearHardeningScalar {
    fn name(&self) -> &'static str {
        "k"
    }

    fn kind(&self) -> VariableKind {
        VariableKind::Scalar
    }

    fn initial_value(&self, value: &mut [f64]) {
        value[0] = self.k0;
    }

    fn rate(&self, rate: &mut [f64], m: &Tensor2, _: &Tensor2, _: &[f64], _: &Tensor2) -> Result<(), StrError> {
        rate[0] = self.hh * SQRT_2_BY_3 * m.norm();
        Ok(())
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["hh", "k0"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.hh),
            1 => Ok(self.k0),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        match index {
            0 => {
                if value < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
                self.hh = value;
            }
            1 => {
                if value <= 0.0 {
                    return Err("initial size k0 must be > 0.0");
                }
                self.k0 = value;
            }
            _ => return Err("parameter index is out of range"),
        }
        Ok(())
    }
}

impl LinearHardeningTensor {
    /// Allocates a new instance
    pub fn new(hh: f64) -> Result<Self, StrError> {
        if hh < 0.0 {
            return Err("hardening moduli must be ≥ 0.0");
        }
        Ok(LinearHardeningTensor { hh })
    }
}

impl EvolvingVariableTrait for LinearHardeningTensor {
    fn name(&self) -> &'static str {
        "alpha"
    }

    fn kind(&self) -> VariableKind {
        VariableKind::Tensor
    }

    fn initial_value(&self, value: &mut [f64]) {
        value.fill(0.0);
    }

    fn rate(&self, rate: &mut [f64], m: &Tensor2, _: &Tensor2, _: &[f64], _: &Tensor2) -> Result<(), StrError> {
        for (r, mi) in rate.iter_mut().zip(m.vector()) {
            *r = self.hh * mi;
        }
        Ok(())
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["hh_kin"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.hh),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        match index {
            0 => {
                if value < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
                self.hh = value;
                Ok(())
            }
            _ => Err("parameter index is out of range"),
        }
    }
}

impl ArmstrongFrederickTensor {
    /// Allocates a new instance
    pub fn new(ha: f64, cr: f64) -> Result<Self, StrError> {
        let mut var = ArmstrongFrederickTensor { ha: 0.0, cr: 0.0 };
        var.set_parameter(0, ha)?;
        var.set_parameter(1, cr)?;
        Ok(var)
    }

    /// Returns the saturation radius √(2/3) ha / cr (infinite if cr = 0)
    pub fn saturation_radius(&self) -> f64 {
        if self.cr > 0.0 {
            SQRT_2_BY_3 * self.ha / self.cr
        } else {
            f64::INFINITY
        }
    }
}

impl EvolvingVariableTrait for ArmstrongFrederickTensor {
    fn name(&self) -> &'static str {
        "alpha"
    }

    fn kind(&self) -> VariableKind {
        VariableKind::Tensor
    }

    fn initial_value(&self, value: &mut [f64]) {
        value.fill(0.0);
    }

    fn rate(&self, rate: &mut [f64], m: &Tensor2, _: &Tensor2, value: &[f64], _: &Tensor2) -> Result<(), StrError> {
        let mean = m.invariant_sigma_m();
        let recall = self.cr * SQRT_2_BY_3 * m.deviator_norm();
        let mv = m.vector();
        for i in 0..mv.dim() {
            let dev = mv[i] - mean * IDENTITY2[i];
            rate[i] = TWO_BY_3 * self.ha * dev - recall * value[i];
        }
        Ok(())
    }

    fn has_saturation_limit(&self) -> bool {
        true
    }

    fn enforce_saturation_limit(&self, value: &mut [f64], _m: &Tensor2) {
        let radius = self.saturation_radius();
        let norm = f64::sqrt(value.iter().map(|v| v * v).sum::<f64>());
        if norm > radius {
            let factor = radius / norm;
            value.iter_mut().for_each(|v| *v *= factor);
        }
    }

    fn parameter_names(&self) -> &'static [&'static str] {
        &["ha", "cr"]
    }

    fn get_parameter(&self, index: usize) -> Result<f64, StrError> {
        match index {
            0 => Ok(self.ha),
            1 => Ok(self.cr),
            _ => Err("parameter index is out of range"),
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) -> Result<(), StrError> {
        match index {
            0 => {
                if value < 0.0 {
                    return Err("Armstrong-Frederick modulus ha must be ≥ 0.0");
                }
                self.ha = value;
            }
            1 => {
                if value < 0.0 {
                    return Err("Armstrong-Frederick coefficient cr must be ≥ 0.0");
                }
                self.cr = value;
            }
            _ => return Err("parameter index is out of range"),
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ArmstrongFrederickTensor, EvolvingVariableTrait, LinearHardeningScalar, LinearHardeningTensor};
    use crate::material::VariableKind;
    use russell_lab::approx_eq;
    use russell_tensor::{Mandel, Tensor2, SQRT_2_BY_3};

    // unit deviatoric direction along axial compression
    fn axial_direction() -> Tensor2 {
        let mut m = Tensor2::new(Mandel::Symmetric);
        let c = 1.0 / f64::sqrt(6.0);
        m.vector_mut()[0] = c;
        m.vector_mut()[1] = c;
        m.vector_mut()[2] = -2.0 * c;
        m
    }

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            LinearHardeningScalar::new(-1.0, 0.3).err(),
            Some("hardening moduli must be ≥ 0.0")
        );
        assert_eq!(
            LinearHardeningScalar::new(1.0, 0.0).err(),
            Some("initial size k0 must be > 0.0")
        );
        assert_eq!(LinearHardeningTensor::new(-1.0).err(), Some("hardening moduli must be ≥ 0.0"));
        assert_eq!(
            ArmstrongFrederickTensor::new(10.0, -1.0).err(),
            Some("Armstrong-Frederick coefficient cr must be ≥ 0.0")
        );
    }

    #[test]
    fn linear_hardening_scalar_works() {
        let var = LinearHardeningScalar::new(800.0, 9.0).unwrap();
        assert_eq!(var.name(), "k");
        assert_eq!(var.kind(), VariableKind::Scalar);
        let mut k = [0.0];
        var.initial_value(&mut k);
        assert_eq!(k, [9.0]);
        let m = axial_direction();
        let zero = Tensor2::new(Mandel::Symmetric);
        let mut rate = [0.0];
        var.rate(&mut rate, &m, &zero, &k, &zero).unwrap();
        approx_eq(rate[0], 800.0 * SQRT_2_BY_3, 1e-12);
        assert!(!var.has_saturation_limit());
        assert_eq!(var.parameter_names(), &["hh", "k0"]);
        assert_eq!(var.get_parameter(1), Ok(9.0));
    }

    #[test]
    fn linear_hardening_tensor_works() {
        let var = LinearHardeningTensor::new(100.0).unwrap();
        assert_eq!(var.kind(), VariableKind::Tensor);
        let m = axial_direction();
        let zero = Tensor2::new(Mandel::Symmetric);
        let mut alpha = [1.0; 6];
        var.initial_value(&mut alpha);
        assert_eq!(alpha, [0.0; 6]);
        let mut rate = [0.0; 6];
        var.rate(&mut rate, &m, &zero, &alpha, &zero).unwrap();
        for i in 0..6 {
            approx_eq(rate[i], 100.0 * m.vector()[i], 1e-14);
        }
    }

    #[test]
    fn armstrong_frederick_works() {
        let (ha, cr) = (10.0, 20.0);
        let var = ArmstrongFrederickTensor::new(ha, cr).unwrap();
        assert!(var.has_saturation_limit());
        approx_eq(var.saturation_radius(), SQRT_2_BY_3 * 0.5, 1e-15);
        let m = axial_direction();
        let zero = Tensor2::new(Mandel::Symmetric);

        // from zero backstress the rate is ⅔ ha m
        let alpha = [0.0; 6];
        let mut rate = [0.0; 6];
        var.rate(&mut rate, &m, &zero, &alpha, &zero).unwrap();
        for i in 0..6 {
            approx_eq(rate[i], 2.0 * ha * m.vector()[i] / 3.0, 1e-14);
        }

        // at saturation (α aligned with m) the rate vanishes
        let radius = var.saturation_radius();
        let mut alpha = [0.0; 6];
        for i in 0..6 {
            alpha[i] = radius * m.vector()[i];
        }
        var.rate(&mut rate, &m, &zero, &alpha, &zero).unwrap();
        for i in 0..6 {
            approx_eq(rate[i], 0.0, 1e-14);
        }

        // values beyond the limit are scaled back
        for i in 0..6 {
            alpha[i] *= 2.0;
        }
        var.enforce_saturation_limit(&mut alpha, &m);
        let norm = f64::sqrt(alpha.iter().map(|v| v * v).sum::<f64>());
        approx_eq(norm, radius, 1e-14);

        // without recall there is no limit
        let var = ArmstrongFrederickTensor::new(ha, 0.0).unwrap();
        assert_eq!(var.saturation_radius(), f64::INFINITY);
        var.enforce_saturation_limit(&mut alpha, &m);
        approx_eq(alpha[2], -2.0 * radius / f64::sqrt(6.0), 1e-14);
    }
}
