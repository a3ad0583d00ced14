use super::{ArmstrongFrederickTensor, AssociatedFlow, ConstitutiveIntegrator, DeviatoricFlow, DilatantFlow};
use super::{DruckerPrager, ElasticityTrait, EvolvingVariableTrait, FlowDirectionTrait, LinearHardeningScalar};
use super::{LinearHardeningTensor, LinearIsotropic, ModelComponents, PreIntegrationTrait};
use super::{PressureDependentIsotropic, TensionCutoff, VonMises, YieldFunctionTrait};
use crate::base::{Idealization, IntegratorConfig, ParamElasticity, ParamMaterial, ParamPlasticity};
use crate::StrError;

impl ConstitutiveIntegrator {
    /// Allocates a new instance from the material parameters
    ///
    /// The internal values are ordered as `[α, k]` (backstress tensor, if any,
    /// followed by the scalar size of the yield surface). Drucker-Prager models
    /// carry a tension cutoff at `p = 0`.
    pub fn new(ideal: &Idealization, param: &ParamMaterial, config: &IntegratorConfig) -> Result<Self, StrError> {
        param.validate()?;
        let elasticity = allocate_elasticity(ideal, &param.elasticity)?;
        let components = match param.plasticity {
            ParamPlasticity::VonMisesLinearHardening { k0, hh_iso, hh_kin } => {
                let mut evolving_variables: Vec<Box<dyn EvolvingVariableTrait>> = Vec::new();
                if hh_kin > 0.0 {
                    evolving_variables.push(Box::new(LinearHardeningTensor::new(hh_kin)?));
                }
                evolving_variables.push(Box::new(LinearHardeningScalar::new(hh_iso, k0)?));
                von_mises(elasticity, evolving_variables)
            }
            ParamPlasticity::VonMisesArmstrongFrederick { k0, ha, cr, hh_iso } => von_mises(
                elasticity,
                vec![
                    Box::new(ArmstrongFrederickTensor::new(ha, cr)?),
                    Box::new(LinearHardeningScalar::new(hh_iso, k0)?),
                ],
            ),
            ParamPlasticity::DruckerPragerLinearHardening { k0, hh } => drucker_prager(
                elasticity,
                Box::new(AssociatedFlow::new(DruckerPrager::new())),
                vec![Box::new(LinearHardeningScalar::new(hh, k0)?)],
            )?,
            ParamPlasticity::DruckerPragerNonAssociated { k0, hh, dilatancy } => drucker_prager(
                elasticity,
                Box::new(DilatantFlow::new(dilatancy)?),
                vec![Box::new(LinearHardeningScalar::new(hh, k0)?)],
            )?,
            ParamPlasticity::DruckerPragerArmstrongFrederick { k0, ha, cr, hh } => drucker_prager(
                elasticity,
                Box::new(DeviatoricFlow::new()),
                vec![
                    Box::new(ArmstrongFrederickTensor::new(ha, cr)?),
                    Box::new(LinearHardeningScalar::new(hh, k0)?),
                ],
            )?,
            ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick {
                k0,
                ha,
                cr,
                hh,
                dilatancy,
            } => drucker_prager(
                elasticity,
                Box::new(DilatantFlow::new(dilatancy)?),
                vec![
                    Box::new(ArmstrongFrederickTensor::new(ha, cr)?),
                    Box::new(LinearHardeningScalar::new(hh, k0)?),
                ],
            )?,
        };
        ConstitutiveIntegrator::compose(ideal, config, components)
    }
}

/// Allocates the elasticity model
fn allocate_elasticity(ideal: &Idealization, param: &ParamElasticity) -> Result<Box<dyn ElasticityTrait>, StrError> {
    let model: Box<dyn ElasticityTrait> = match *param {
        ParamElasticity::LinearIsotropic { young, poisson } => Box::new(LinearIsotropic::new(ideal, young, poisson)?),
        ParamElasticity::PressureDependent {
            young_ref,
            poisson,
            p_ref,
            exponent,
            p_min_ratio,
        } => Box::new(PressureDependentIsotropic::new(
            ideal,
            young_ref,
            poisson,
            p_ref,
            exponent,
            p_min_ratio,
        )?),
    };
    Ok(model)
}

fn von_mises(
    elasticity: Box<dyn ElasticityTrait>,
    evolving_variables: Vec<Box<dyn EvolvingVariableTrait>>,
) -> ModelComponents {
    ModelComponents {
        elasticity,
        yield_function: Box::new(VonMises::new()),
        flow_direction: Box::new(AssociatedFlow::new(VonMises::new())),
        evolving_variables,
        pre_integration: None,
    }
}

fn drucker_prager(
    elasticity: Box<dyn ElasticityTrait>,
    flow_direction: Box<dyn FlowDirectionTrait>,
    evolving_variables: Vec<Box<dyn EvolvingVariableTrait>>,
) -> Result<ModelComponents, StrError> {
    let yield_function: Box<dyn YieldFunctionTrait> = Box::new(DruckerPrager::new());
    let pre_integration: Box<dyn PreIntegrationTrait> = Box::new(TensionCutoff::new(0.0)?);
    Ok(ModelComponents {
        elasticity,
        yield_function,
        flow_direction,
        evolving_variables,
        pre_integration: Some(pre_integration),
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use crate::base::{Idealization, IntegratorConfig, ParamPlasticity, SampleParams};
    use crate::material::{ConstitutiveIntegrator, ParamComponent};

    #[test]
    fn new_captures_errors() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let mut param = SampleParams::von_mises();
        param.plasticity = ParamPlasticity::VonMisesLinearHardening {
            k0: -1.0,
            hh_iso: 0.0,
            hh_kin: 0.0,
        };
        assert_eq!(
            ConstitutiveIntegrator::new(&ideal, &param, &config).err(),
            Some("initial yield stress k0 must be > 0.0")
        );
        let ideal = Idealization {
            two_dim: true,
            plane_stress: true,
        };
        let param = SampleParams::von_mises();
        assert_eq!(
            ConstitutiveIntegrator::new(&ideal, &param, &config).err(),
            Some("elastoplastic models do not work in plane-stress")
        );
    }

    #[test]
    fn new_works() {
        let config = IntegratorConfig::new();
        for ndim in [2, 3] {
            let ideal = Idealization::new(ndim);
            let nc = ideal.mandel().dim();
            for param in SampleParams::all_materials() {
                let model = ConstitutiveIntegrator::new(&ideal, &param, &config).unwrap();
                let expected = match param.plasticity {
                    ParamPlasticity::VonMisesLinearHardening { hh_kin, .. } => {
                        if hh_kin > 0.0 {
                            nc + 1
                        } else {
                            1
                        }
                    }
                    ParamPlasticity::VonMisesArmstrongFrederick { .. } => nc + 1,
                    ParamPlasticity::DruckerPragerArmstrongFrederick { .. } => nc + 1,
                    ParamPlasticity::DruckerPragerNonAssociatedArmstrongFrederick { .. } => nc + 1,
                    _ => 1,
                };
                assert_eq!(model.layout().dim(), expected);
                assert_eq!(model.variable_names().last(), Some(&"k"));
            }
        }
    }

    #[test]
    fn kinematic_hardening_adds_backstress() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let mut param = SampleParams::von_mises();
        param.plasticity = ParamPlasticity::VonMisesLinearHardening {
            k0: 9.0,
            hh_iso: 100.0,
            hh_kin: 200.0,
        };
        let model = ConstitutiveIntegrator::new(&ideal, &param, &config).unwrap();
        assert_eq!(model.variable_names(), &["alpha", "k"]);
        assert_eq!(model.layout().dim(), 7);
    }

    #[test]
    fn dilatant_armstrong_frederick_exposes_all_parameters() {
        let ideal = Idealization::new(3);
        let config = IntegratorConfig::new();
        let param = SampleParams::drucker_prager_non_associated_armstrong_frederick();
        let model = ConstitutiveIntegrator::new(&ideal, &param, &config).unwrap();
        assert_eq!(model.variable_names(), &["alpha", "k"]);
        assert_eq!(model.find_parameter("dilatancy"), Some((ParamComponent::FlowDirection, 0)));
        assert_eq!(model.find_parameter("ha"), Some((ParamComponent::EvolvingVariable(0), 0)));
        assert_eq!(model.find_parameter("k0"), Some((ParamComponent::EvolvingVariable(1), 1)));
        assert_eq!(model.get_parameter(ParamComponent::FlowDirection, 0), Ok(0.1));
    }
}
