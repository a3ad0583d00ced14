use super::{ParamElasticity, ParamMaterial, ParamPlasticity};

/// Holds samples of material parameters
pub struct SampleParams {}

impl SampleParams {
    /// Returns linear elastic parameters (E = 2000, ν = 0.2)
    pub fn linear_elasticity() -> ParamElasticity {
        ParamElasticity::LinearIsotropic {
            young: 2000.0,
            poisson: 0.2,
        }
    }

    /// Returns parameters for the Drucker-Prager model with Armstrong-Frederick backstress
    ///
    /// E = 2000, ν = 0.2, k0 = 0.3 and zero initial stress.
    pub fn drucker_prager_armstrong_frederick() -> ParamMaterial {
        ParamMaterial {
            elasticity: SampleParams::linear_elasticity(),
            plasticity: ParamPlasticity::DruckerPragerArmstrongFrederick {
                k0: 0.3,
                ha: 10.0,
                cr: 20.0,
                hh: 1.0,
            },
            p0: 0.0,
        }
    }

    /// Returns parameters for the Drucker-Prager model with associated flow
    pub fn drucker_prager() -> ParamMaterial {
        ParamMaterial {
            elasticity: SampleParams::linear_elasticity(),
            plasticity: ParamPlasticity::DruckerPragerLinearHardening { k0: 0.3, hh: 1.0 },
            p0: 10.0,
        }
    }

    /// Returns parameters for the Drucker-Prager model with dilatant non-associated flow
    pub fn drucker_prager_non_associated() -> ParamMaterial {
        ParamMaterial {
            elasticity: SampleParams::linear_elasticity(),
            plasticity: ParamPlasticity::DruckerPragerNonAssociated {
                k0: 0.3,
                hh: 1.0,
                dilatancy: 0.1,
            },
            p0: 10.0,
        }
    }

    /// Returns parameters for the Drucker-Prager model with Armstrong-Frederick backstress and dilatant flow
    pub fn drucker_prager_non_associated_armstrong_frederick() -> ParamMaterial {
        ParamMaterial {
            elasticity: SampleParams::linear_elasticity(),
            plasticity: ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick {
                k0: 0.3,
                ha: 10.0,
                cr: 20.0,
                hh: 1.0,
                dilatancy: 0.1,
            },
            p0: 10.0,
        }
    }

    /// Returns parameters for the von Mises model with linear hardening (E = 1500, ν = 0.25, k0 = 9, H = 800)
    pub fn von_mises() -> ParamMaterial {
        ParamMaterial {
            elasticity: ParamElasticity::LinearIsotropic {
                young: 1500.0,
                poisson: 0.25,
            },
            plasticity: ParamPlasticity::VonMisesLinearHardening {
                k0: 9.0,
                hh_iso: 800.0,
                hh_kin: 0.0,
            },
            p0: 0.0,
        }
    }

    /// Returns parameters for the von Mises model with Armstrong-Frederick kinematic hardening
    pub fn von_mises_armstrong_frederick() -> ParamMaterial {
        ParamMaterial {
            elasticity: ParamElasticity::LinearIsotropic {
                young: 1500.0,
                poisson: 0.25,
            },
            plasticity: ParamPlasticity::VonMisesArmstrongFrederick {
                k0: 9.0,
                ha: 600.0,
                cr: 100.0,
                hh_iso: 100.0,
            },
            p0: 0.0,
        }
    }

    /// Returns parameters for the Drucker-Prager model with pressure-dependent elasticity
    pub fn drucker_prager_pressure_dependent() -> ParamMaterial {
        ParamMaterial {
            elasticity: ParamElasticity::PressureDependent {
                young_ref: 2000.0,
                poisson: 0.2,
                p_ref: 10.0,
                exponent: 0.5,
                p_min_ratio: 0.01,
            },
            plasticity: ParamPlasticity::DruckerPragerArmstrongFrederick {
                k0: 0.3,
                ha: 10.0,
                cr: 20.0,
                hh: 1.0,
            },
            p0: 10.0,
        }
    }

    /// Returns all samples
    pub fn all_materials() -> Vec<ParamMaterial> {
        vec![
            SampleParams::drucker_prager_armstrong_frederick(),
            SampleParams::drucker_prager(),
            SampleParams::drucker_prager_non_associated(),
            SampleParams::drucker_prager_non_associated_armstrong_frederick(),
            SampleParams::von_mises(),
            SampleParams::von_mises_armstrong_frederick(),
            SampleParams::drucker_prager_pressure_dependent(),
        ]
    }
}
