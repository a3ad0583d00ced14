use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds parameters for elasticity models
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamElasticity {
    /// Linear isotropic elasticity
    LinearIsotropic {
        /// Young's modulus
        young: f64,

        /// Poisson's coefficient
        poisson: f64,
    },

    /// Isotropic elasticity with pressure-dependent Young's modulus
    ///
    /// ```text
    /// E(p) = Eref (max(p, pmin pref) / pref)ⁿ
    /// ```
    PressureDependent {
        /// Young's modulus at the reference pressure
        young_ref: f64,

        /// Poisson's coefficient
        poisson: f64,

        /// Reference pressure (positive)
        p_ref: f64,

        /// Exponent n
        exponent: f64,

        /// Minimum pressure ratio pmin (cuts the modulus in tension)
        p_min_ratio: f64,
    },
}

/// Holds parameters for the family of elastoplastic models
///
/// The internal variables of all models follow the same order: an optional
/// backstress tensor α first, followed by the scalar size k of the yield surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParamPlasticity {
    /// von Mises with linear isotropic and linear kinematic hardening (associated flow)
    ///
    /// ```text
    /// f = ‖s - α‖ - √(2/3) k
    /// ```
    VonMisesLinearHardening {
        /// Initial size of the yield surface (uniaxial yield stress)
        k0: f64,

        /// Isotropic hardening modulus
        hh_iso: f64,

        /// Kinematic hardening modulus
        hh_kin: f64,
    },

    /// von Mises with Armstrong-Frederick kinematic hardening and linear isotropic hardening
    VonMisesArmstrongFrederick {
        /// Initial size of the yield surface (uniaxial yield stress)
        k0: f64,

        /// Armstrong-Frederick hardening modulus
        ha: f64,

        /// Armstrong-Frederick recall (saturation) coefficient
        cr: f64,

        /// Isotropic hardening modulus
        hh_iso: f64,
    },

    /// Drucker-Prager with associated flow and linear hardening of the friction parameter
    ///
    /// ```text
    /// f = ‖s‖ - √(2/3) k p
    /// ```
    DruckerPragerLinearHardening {
        /// Initial friction parameter
        k0: f64,

        /// Hardening modulus of the friction parameter
        hh: f64,
    },

    /// Drucker-Prager with dilatant non-associated flow and linear hardening
    DruckerPragerNonAssociated {
        /// Initial friction parameter
        k0: f64,

        /// Hardening modulus of the friction parameter
        hh: f64,

        /// Dilatancy coefficient of the flow direction
        dilatancy: f64,
    },

    /// Drucker-Prager with Armstrong-Frederick backstress, linear hardening of
    /// the friction parameter, deviatoric flow and tension cutoff
    ///
    /// ```text
    /// f = ‖s - p α‖ - √(2/3) k p
    /// ```
    DruckerPragerArmstrongFrederick {
        /// Initial friction parameter
        k0: f64,

        /// Armstrong-Frederick hardening modulus
        ha: f64,

        /// Armstrong-Frederick recall (saturation) coefficient
        cr: f64,

        /// Hardening modulus of the friction parameter
        hh: f64,
    },

    /// Drucker-Prager with Armstrong-Frederick backstress, linear hardening of
    /// the friction parameter, dilatant non-associated flow and tension cutoff
    DruckerPragerNonAssociatedArmstrongFrederick {
        /// Initial friction parameter
        k0: f64,

        /// Armstrong-Frederick hardening modulus
        ha: f64,

        /// Armstrong-Frederick recall (saturation) coefficient
        cr: f64,

        /// Hardening modulus of the friction parameter
        hh: f64,

        /// Dilatancy coefficient of the flow direction
        dilatancy: f64,
    },
}

/// Holds all parameters of a material point
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamMaterial {
    /// Elasticity parameters
    pub elasticity: ParamElasticity,

    /// Plasticity parameters
    pub plasticity: ParamPlasticity,

    /// Initial isotropic pressure p₀ (positive in compression)
    pub p0: f64,
}

impl ParamElasticity {
    /// Checks the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        match *self {
            ParamElasticity::LinearIsotropic { young, poisson } => {
                check_young_poisson(young, poisson)?;
            }
            ParamElasticity::PressureDependent {
                young_ref,
                poisson,
                p_ref,
                exponent,
                p_min_ratio,
            } => {
                check_young_poisson(young_ref, poisson)?;
                if p_ref <= 0.0 {
                    return Err("reference pressure must be > 0.0");
                }
                if exponent < 0.0 || exponent > 1.0 {
                    return Err("pressure exponent must be in [0.0, 1.0]");
                }
                if p_min_ratio <= 0.0 || p_min_ratio > 1.0 {
                    return Err("minimum pressure ratio must be in (0.0, 1.0]");
                }
            }
        }
        Ok(())
    }

    /// Sets the value of a named parameter
    ///
    /// Returns false if the name does not refer to a field of this model.
    pub fn set_value(&mut self, name: &str, value: f64) -> bool {
        let field = match (self, name) {
            (ParamElasticity::LinearIsotropic { young, .. }, "young") => young,
            (ParamElasticity::LinearIsotropic { poisson, .. }, "poisson") => poisson,
            (ParamElasticity::PressureDependent { young_ref, .. }, "young_ref") => young_ref,
            (ParamElasticity::PressureDependent { poisson, .. }, "poisson") => poisson,
            (ParamElasticity::PressureDependent { p_ref, .. }, "p_ref") => p_ref,
            (ParamElasticity::PressureDependent { exponent, .. }, "exponent") => exponent,
            (ParamElasticity::PressureDependent { p_min_ratio, .. }, "p_min_ratio") => p_min_ratio,
            _ => return false,
        };
        *field = value;
        true
    }
}

impl ParamPlasticity {
    /// Checks the parameters
    pub fn validate(&self) -> Result<(), StrError> {
        match *self {
            ParamPlasticity::VonMisesLinearHardening { k0, hh_iso, hh_kin } => {
                if k0 <= 0.0 {
                    return Err("initial yield stress k0 must be > 0.0");
                }
                if hh_iso < 0.0 || hh_kin < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
            }
            ParamPlasticity::VonMisesArmstrongFrederick { k0, ha, cr, hh_iso } => {
                if k0 <= 0.0 {
                    return Err("initial yield stress k0 must be > 0.0");
                }
                check_armstrong_frederick(ha, cr)?;
                if hh_iso < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
            }
            ParamPlasticity::DruckerPragerLinearHardening { k0, hh } => {
                check_friction(k0)?;
                if hh < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
            }
            ParamPlasticity::DruckerPragerNonAssociated { k0, hh, dilatancy } => {
                check_friction(k0)?;
                if hh < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
                if dilatancy < 0.0 {
                    return Err("dilatancy must be ≥ 0.0");
                }
            }
            ParamPlasticity::DruckerPragerArmstrongFrederick { k0, ha, cr, hh } => {
                check_friction(k0)?;
                check_armstrong_frederick(ha, cr)?;
                if hh < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
            }
            ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick {
                k0,
                ha,
                cr,
                hh,
                dilatancy,
            } => {
                check_friction(k0)?;
                check_armstrong_frederick(ha, cr)?;
                if hh < 0.0 {
                    return Err("hardening moduli must be ≥ 0.0");
                }
                if dilatancy < 0.0 {
                    return Err("dilatancy must be ≥ 0.0");
                }
            }
        }
        Ok(())
    }

    /// Sets the value of a named parameter
    ///
    /// The modulus of the scalar hardening is named `hh` for all models.
    /// Returns false if the name does not refer to a field of this model.
    pub fn set_value(&mut self, name: &str, value: f64) -> bool {
        use ParamPlasticity::*;
        let field = match (self, name) {
            (VonMisesLinearHardening { k0, .. }, "k0") => k0,
            (VonMisesLinearHardening { hh_iso, .. }, "hh") => hh_iso,
            (VonMisesLinearHardening { hh_kin, .. }, "hh_kin") => hh_kin,
            (VonMisesArmstrongFrederick { k0, .. }, "k0") => k0,
            (VonMisesArmstrongFrederick { ha, .. }, "ha") => ha,
            (VonMisesArmstrongFrederick { cr, .. }, "cr") => cr,
            (VonMisesArmstrongFrederick { hh_iso, .. }, "hh") => hh_iso,
            (DruckerPragerLinearHardening { k0, .. }, "k0") => k0,
            (DruckerPragerLinearHardening { hh, .. }, "hh") => hh,
            (DruckerPragerNonAssociated { k0, .. }, "k0") => k0,
            (DruckerPragerNonAssociated { hh, .. }, "hh") => hh,
            (DruckerPragerNonAssociated { dilatancy, .. }, "dilatancy") => dilatancy,
            (DruckerPragerArmstrongFrederick { k0, .. }, "k0") => k0,
            (DruckerPragerArmstrongFrederick { ha, .. }, "ha") => ha,
            (DruckerPragerArmstrongFrederick { cr, .. }, "cr") => cr,
            (DruckerPragerArmstrongFrederick { hh, .. }, "hh") => hh,
            (DruckerPragerNonAssociatedArmstrongFrederick { k0, .. }, "k0") => k0,
            (DruckerPragerNonAssociatedArmstrongFrederick { ha, .. }, "ha") => ha,
            (DruckerPragerNonAssociatedArmstrongFrederick { cr, .. }, "cr") => cr,
            (DruckerPragerNonAssociatedArmstrongFrederick { hh, .. }, "hh") => hh,
            (DruckerPragerNonAssociatedArmstrongFrederick { dilatancy, .. }, "dilatancy") => dilatancy,
            _ => return false,
        };
        *field = value;
        true
    }

    /// Indicates whether the yield surface depends on the mean pressure
    pub fn pressure_dependent(&self) -> bool {
        match self {
            ParamPlasticity::VonMisesLinearHardening { .. } | ParamPlasticity::VonMisesArmstrongFrederick { .. } => false,
            _ => true,
        }
    }
}

impl ParamMaterial {
    /// Checks all parameters
    pub fn validate(&self) -> Result<(), StrError> {
        self.elasticity.validate()?;
        self.plasticity.validate()?;
        if self.p0 < 0.0 {
            return Err("initial pressure p0 must be ≥ 0.0");
        }
        Ok(())
    }

    /// Sets the value of a named parameter of the elasticity, plasticity or `"p0"`
    pub fn set_value(&mut self, name: &str, value: f64) -> Result<(), StrError> {
        if name == "p0" {
            self.p0 = value;
            return Ok(());
        }
        if self.elasticity.set_value(name, value) || self.plasticity.set_value(name, value) {
            Ok(())
        } else {
            Err("parameter name is not available")
        }
    }
}

/// Checks Young's modulus and Poisson's coefficient
pub(crate) fn check_young_poisson(young: f64, poisson: f64) -> Result<(), StrError> {
    if !(young > 0.0) {
        return Err("Young's modulus must be > 0.0");
    }
    if !(poisson > -1.0 && poisson < 0.5) {
        return Err("Poisson's coefficient must be in (-1.0, 0.5)");
    }
    Ok(())
}

fn check_friction(k0: f64) -> Result<(), StrError> {
    if !(k0 > 0.0) {
        return Err("initial friction parameter k0 must be > 0.0");
    }
    Ok(())
}

fn check_armstrong_frederick(ha: f64, cr: f64) -> Result<(), StrError> {
    if ha < 0.0 {
        return Err("Armstrong-Frederick modulus ha must be ≥ 0.0");
    }
    if cr < 0.0 {
        return Err("Armstrong-Frederick coefficient cr must be ≥ 0.0");
    }
    Ok(())
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ParamElasticity, ParamMaterial, ParamPlasticity};
    use crate::base::SampleParams;

    #[test]
    fn samples_are_valid() {
        for param in SampleParams::all_materials() {
            assert_eq!(param.validate(), Ok(()));
        }
    }

    #[test]
    fn validate_captures_elasticity_errors() {
        let bad = ParamElasticity::LinearIsotropic {
            young: -1.0,
            poisson: 0.2,
        };
        assert_eq!(bad.validate().err(), Some("Young's modulus must be > 0.0"));
        let bad = ParamElasticity::LinearIsotropic {
            young: 1.0,
            poisson: 0.5,
        };
        assert_eq!(bad.validate().err(), Some("Poisson's coefficient must be in (-1.0, 0.5)"));
        let bad = ParamElasticity::PressureDependent {
            young_ref: 1.0,
            poisson: 0.2,
            p_ref: 0.0,
            exponent: 0.5,
            p_min_ratio: 0.1,
        };
        assert_eq!(bad.validate().err(), Some("reference pressure must be > 0.0"));
        let bad = ParamElasticity::PressureDependent {
            young_ref: 1.0,
            poisson: 0.2,
            p_ref: 100.0,
            exponent: 1.5,
            p_min_ratio: 0.1,
        };
        assert_eq!(bad.validate().err(), Some("pressure exponent must be in [0.0, 1.0]"));
        let bad = ParamElasticity::PressureDependent {
            young_ref: 1.0,
            poisson: 0.2,
            p_ref: 100.0,
            exponent: 0.5,
            p_min_ratio: 0.0,
        };
        assert_eq!(bad.validate().err(), Some("minimum pressure ratio must be in (0.0, 1.0]"));
    }

    #[test]
    fn validate_captures_plasticity_errors() {
        let bad = ParamPlasticity::VonMisesLinearHardening {
            k0: 0.0,
            hh_iso: 0.0,
            hh_kin: 0.0,
        };
        assert_eq!(bad.validate().err(), Some("initial yield stress k0 must be > 0.0"));
        let bad = ParamPlasticity::VonMisesArmstrongFrederick {
            k0: 1.0,
            ha: -1.0,
            cr: 0.0,
            hh_iso: 0.0,
        };
        assert_eq!(bad.validate().err(), Some("Armstrong-Frederick modulus ha must be ≥ 0.0"));
        let bad = ParamPlasticity::DruckerPragerArmstrongFrederick {
            k0: 0.3,
            ha: 10.0,
            cr: -1.0,
            hh: 0.0,
        };
        assert_eq!(bad.validate().err(), Some("Armstrong-Frederick coefficient cr must be ≥ 0.0"));
        let bad = ParamPlasticity::DruckerPragerLinearHardening { k0: -0.3, hh: 0.0 };
        assert_eq!(bad.validate().err(), Some("initial friction parameter k0 must be > 0.0"));
        let bad = ParamPlasticity::DruckerPragerNonAssociated {
            k0: 0.3,
            hh: 0.0,
            dilatancy: -0.1,
        };
        assert_eq!(bad.validate().err(), Some("dilatancy must be ≥ 0.0"));
        let bad = ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick {
            k0: 0.3,
            ha: 10.0,
            cr: 20.0,
            hh: 0.0,
            dilatancy: -0.1,
        };
        assert_eq!(bad.validate().err(), Some("dilatancy must be ≥ 0.0"));
        let bad = ParamPlasticity::DruckerPragerLinearHardening { k0: 0.3, hh: -1.0 };
        assert_eq!(bad.validate().err(), Some("hardening moduli must be ≥ 0.0"));
    }

    #[test]
    fn validate_captures_initial_pressure_error() {
        let mut param = SampleParams::drucker_prager_armstrong_frederick();
        param.p0 = -1.0;
        assert_eq!(param.validate().err(), Some("initial pressure p0 must be ≥ 0.0"));
    }

    #[test]
    fn pressure_dependent_works() {
        let param: ParamMaterial = SampleParams::von_mises();
        assert!(!param.plasticity.pressure_dependent());
        let param = SampleParams::drucker_prager_armstrong_frederick();
        assert!(param.plasticity.pressure_dependent());
    }

    #[test]
    fn set_value_works() {
        let mut param = SampleParams::von_mises();
        param.set_value("young", 8000.0).unwrap();
        param.set_value("hh", 12.0).unwrap();
        param.set_value("p0", 3.0).unwrap();
        assert_eq!(param.p0, 3.0);
        match param.elasticity {
            ParamElasticity::LinearIsotropic { young, .. } => assert_eq!(young, 8000.0),
            _ => panic!("elasticity must be linear isotropic"),
        }
        match param.plasticity {
            ParamPlasticity::VonMisesLinearHardening { hh_iso, .. } => assert_eq!(hh_iso, 12.0),
            _ => panic!("plasticity must be von Mises with linear hardening"),
        }
        assert_eq!(param.set_value("dilatancy", 0.1).err(), Some("parameter name is not available"));

        let mut param = SampleParams::drucker_prager_non_associated_armstrong_frederick();
        param.set_value("dilatancy", 0.25).unwrap();
        param.set_value("k0", 0.5).unwrap();
        match param.plasticity {
            ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick { k0, dilatancy, .. } => {
                assert_eq!(k0, 0.5);
                assert_eq!(dilatancy, 0.25);
            }
            _ => panic!("plasticity must be Drucker-Prager with dilatant flow"),
        }
    }

    #[test]
    fn serialize_works() {
        let param = SampleParams::drucker_prager_armstrong_frederick();
        let json = serde_json::to_string(&param).unwrap();
        let read: ParamMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(read, param);
    }
}
