use super::{ElasticityTrait, EvolvingVariableTrait, FlowDirectionTrait, InternalLayout, Intercept, LocalState};
use super::{PreIntegrationTrait, VariableKind, YieldFunctionTrait};
use crate::base::{t2_load, t2_pressure, t2_store, t4_inverse, Idealization, IntegratorConfig};
use crate::StrError;
use russell_lab::{mat_copy, mat_inverse, mat_mat_mul, solve_lin_sys, vec_add, vec_copy, vec_norm, vec_update};
use russell_lab::{Matrix, Norm, Vector};
use russell_tensor::{t2_add, t2_ddot_t2, t4_ddot_t2, Mandel, Tensor2, Tensor4};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Holds the pseudo-time tolerance to detect the smallest sub-step
const DT_TOL: f64 = 1e-10;

/// Defines the outcome of the integration of a strain increment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The increment was integrated elastically
    ElasticConverged,

    /// The increment was integrated with plastic flow in at least one sub-step
    PlasticConverged,

    /// The integration failed and the trial state was reset to the committed state
    Failed,
}

/// Identifies the component of a model owning a parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamComponent {
    Elasticity,
    YieldFunction,
    FlowDirection,
    EvolvingVariable(usize),
}

/// Holds the sub-models composing an elastoplastic model
pub struct ModelComponents {
    /// Elasticity model
    pub elasticity: Box<dyn ElasticityTrait>,

    /// Yield function
    pub yield_function: Box<dyn YieldFunctionTrait>,

    /// Plastic flow direction
    pub flow_direction: Box<dyn FlowDirectionTrait>,

    /// Evolving variables; their order defines the layout of the internal values
    pub evolving_variables: Vec<Box<dyn EvolvingVariableTrait>>,

    /// Optional callback executed after the elastic trial
    pub pre_integration: Option<Box<dyn PreIntegrationTrait>>,
}

/// Outcome of a single sub-step
enum Substep {
    Elastic,
    Plastic(f64),
    Rejected(&'static str),
}

/// Holds the scratch data of the integrator
struct Workspace {
    /// Elastic modulus Dₑ at the beginning of the sub-step
    dde: Tensor4,

    /// Inverse of Dₑ
    dde_inv: Tensor4,

    /// Elastic modulus at the end of the last elastic sub-step
    tangent: Tensor4,

    /// Stress at the beginning of the sub-step (last accepted stress)
    sigma_n: Tensor2,

    /// Elastic trial stress
    sigma_tr: Tensor2,

    /// Stress iterate
    sigma: Tensor2,

    /// Perturbed stress
    sigma_p: Tensor2,

    /// Strain increment of the sub-step
    deps_sub: Tensor2,

    /// Auxiliary tensor (e.g., Dₑ:m)
    aux: Tensor2,

    /// Elastic part of the strain increment
    deps_e: Tensor2,

    /// Flow direction
    m: Tensor2,

    /// Perturbed flow direction
    m_p: Tensor2,

    /// Flow direction at the trial state
    m_tr: Tensor2,

    /// Derivative of f w.r.t σ
    df_dsigma: Tensor2,

    /// Accumulated plastic strain increment
    plastic_inc: Tensor2,

    /// Stress residual Rσ
    r_sigma: Tensor2,

    /// Internal values at the beginning of the sub-step
    z_n: Vector,

    /// Internal values iterate
    z: Vector,

    /// Perturbed internal values
    z_p: Vector,

    /// Rates of the internal values
    h: Vector,

    /// Perturbed rates
    h_p: Vector,

    /// Derivative of f w.r.t Z
    df_dz: Vector,

    /// Internal-value residual RZ
    r_z: Vector,

    /// Unknowns x = {σ, Z, Δλ}
    x: Vector,

    /// Residual vector (becomes the Newton correction after solving)
    res: Vector,

    dm_dsigma: Matrix,
    dm_dz: Matrix,
    dh_dsigma: Matrix,
    dh_dz: Matrix,

    /// Dₑ · ∂m/∂σ
    dd_dm_dsigma: Matrix,

    /// Dₑ · ∂m/∂Z
    dd_dm_dz: Matrix,

    /// Jacobian of the residual
    jac: Matrix,

    /// Inverse of the Jacobian
    jac_inv: Matrix,

    /// Upper-left {σ, Z} block of J⁻¹
    jac_inv_sz: Matrix,

    /// Sensitivities d{σ, Z}/dΔε of the accepted sub-steps
    sens: Matrix,

    /// Auxiliary matrix for the sensitivities
    sens_aux: Matrix,
}

/// Implements the implicit (backward-Euler) return mapping with adaptive sub-stepping
///
/// The unknowns of the local problem are `x = {σ, Z, Δλ}` and the residuals are:
///
/// ```text
/// Rσ = σ - σtr + Δλ Dₑ : m(σ, Z)
/// RZ = Z - Zn - Δλ h(m, σ, Z)
/// Rf = f(σ, Z)
/// ```
///
/// The derivatives of m and h are computed by finite differences; the derivatives
/// of f are analytical. The consistent tangent chains the sensitivities of all
/// accepted sub-steps:
///
/// ```text
/// S := (J⁻¹)ₛₛ · (S + φ [Dₑ; 0])
/// ```
///
/// where `S = d{σ, Z}/dΔε`, `φ` is the fraction of the sub-step and `(J⁻¹)ₛₛ` is
/// the {σ, Z} block of the inverse Jacobian (identity for elastic sub-steps).
pub struct ConstitutiveIntegrator {
    mandel: Mandel,
    config: IntegratorConfig,
    layout: InternalLayout,
    elasticity: Box<dyn ElasticityTrait>,
    yield_function: Box<dyn YieldFunctionTrait>,
    flow_direction: Box<dyn FlowDirectionTrait>,
    evolving_variables: Vec<Box<dyn EvolvingVariableTrait>>,
    pre_integration: Option<Box<dyn PreIntegrationTrait>>,
    work: Workspace,
}

impl Workspace {
    fn new(mandel: Mandel, nz: usize) -> Self {
        let nc = mandel.dim();
        let n = nc + nz + 1;
        Workspace {
            dde: Tensor4::new(mandel),
            dde_inv: Tensor4::new(mandel),
            tangent: Tensor4::new(mandel),
            sigma_n: Tensor2::new(mandel),
            sigma_tr: Tensor2::new(mandel),
            sigma: Tensor2::new(mandel),
            sigma_p: Tensor2::new(mandel),
            deps_sub: Tensor2::new(mandel),
            aux: Tensor2::new(mandel),
            deps_e: Tensor2::new(mandel),
            m: Tensor2::new(mandel),
            m_p: Tensor2::new(mandel),
            m_tr: Tensor2::new(mandel),
            df_dsigma: Tensor2::new(mandel),
            plastic_inc: Tensor2::new(mandel),
            r_sigma: Tensor2::new(mandel),
            z_n: Vector::new(nz),
            z: Vector::new(nz),
            z_p: Vector::new(nz),
            h: Vector::new(nz),
            h_p: Vector::new(nz),
            df_dz: Vector::new(nz),
            r_z: Vector::new(nz),
            x: Vector::new(n),
            res: Vector::new(n),
            dm_dsigma: Matrix::new(nc, nc),
            dm_dz: Matrix::new(nc, nz),
            dh_dsigma: Matrix::new(nz, nc),
            dh_dz: Matrix::new(nz, nz),
            dd_dm_dsigma: Matrix::new(nc, nc),
            dd_dm_dz: Matrix::new(nc, nz),
            jac: Matrix::new(n, n),
            jac_inv: Matrix::new(n, n),
            jac_inv_sz: Matrix::new(nc + nz, nc + nz),
            sens: Matrix::new(nc + nz, nc),
            sens_aux: Matrix::new(nc + nz, nc),
        }
    }

    /// Copies {σ, Z, Δλ} into x
    fn pack(&mut self, dlambda: f64) {
        let nc = self.sigma.dim();
        let nz = self.z.dim();
        let x = self.x.as_mut_data();
        t2_store(&mut x[..nc], &self.sigma);
        x[nc..(nc + nz)].copy_from_slice(self.z.as_data());
        x[nc + nz] = dlambda;
    }

    /// Copies x into {σ, Z} and returns Δλ
    fn unpack(&mut self) -> f64 {
        let nc = self.sigma.dim();
        let nz = self.z.dim();
        let x = self.x.as_data();
        t2_load(&mut self.sigma, &x[..nc]);
        self.z.as_mut_data().copy_from_slice(&x[nc..(nc + nz)]);
        x[nc + nz]
    }
}

/// Calculates the flow direction m and the rates h of all evolving variables
fn flow_and_rates(
    flow_direction: &mut dyn FlowDirectionTrait,
    evolving_variables: &[Box<dyn EvolvingVariableTrait>],
    layout: &InternalLayout,
    m: &mut Tensor2,
    h: &mut Vector,
    stress: &Tensor2,
    z: &Vector,
    deps: &Tensor2,
) -> Result<(), StrError> {
    flow_direction.direction(m, stress, z)?;
    for (i, var) in evolving_variables.iter().enumerate() {
        let range = layout.range(i);
        var.rate(&mut h.as_mut_data()[range.clone()], m, stress, &z.as_data()[range], deps)?;
    }
    Ok(())
}

impl ConstitutiveIntegrator {
    /// Allocates a new instance
    ///
    /// The layout of the internal values follows the order of the evolving variables.
    /// The yield function and the flow direction are bound to the layout here.
    pub fn compose(
        ideal: &Idealization,
        config: &IntegratorConfig,
        components: ModelComponents,
    ) -> Result<Self, StrError> {
        ideal.validate()?;
        config.validate()?;
        let ModelComponents {
            elasticity,
            mut yield_function,
            mut flow_direction,
            evolving_variables,
            pre_integration,
        } = components;
        let mandel = ideal.mandel();
        let kinds: Vec<VariableKind> = evolving_variables.iter().map(|v| v.kind()).collect();
        let layout = InternalLayout::new(mandel, &kinds);
        yield_function.bind(&layout)?;
        flow_direction.bind(&layout)?;
        let work = Workspace::new(mandel, layout.dim());
        Ok(ConstitutiveIntegrator {
            mandel,
            config: *config,
            layout,
            elasticity,
            yield_function,
            flow_direction,
            evolving_variables,
            pre_integration,
            work,
        })
    }

    /// Returns the Mandel representation
    pub fn mandel(&self) -> Mandel {
        self.mandel
    }

    /// Returns the configuration
    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Returns the layout of the internal values
    pub fn layout(&self) -> &InternalLayout {
        &self.layout
    }

    /// Returns the names of the evolving variables
    pub fn variable_names(&self) -> Vec<&'static str> {
        self.evolving_variables.iter().map(|v| v.name()).collect()
    }

    /// Calculates the yield function
    pub fn yield_value(&mut self, stress: &Tensor2, z: &Vector) -> Result<f64, StrError> {
        self.yield_function.value(stress, z)
    }

    /// Calculates the elastic modulus at a stress state
    pub fn elastic_stiffness(&self, dde: &mut Tensor4, stress: &Tensor2) -> Result<(), StrError> {
        self.elasticity.stiffness(dde, stress)
    }

    /// Initializes the internal values and the tangent of a state with given stress
    ///
    /// # Errors
    ///
    /// Returns an error if the stress lies outside the initial yield surface.
    pub fn initialize_state(&mut self, state: &mut LocalState) -> Result<(), StrError> {
        if state.mandel() != self.mandel {
            return Err("state must have the same Mandel representation as the model");
        }
        if state.internal_values.dim() != self.layout.dim() {
            return Err("number of internal values does not match the model");
        }
        for (i, var) in self.evolving_variables.iter().enumerate() {
            let range = self.layout.range(i);
            var.initial_value(&mut state.internal_values.as_mut_data()[range]);
        }
        self.elasticity.stiffness(&mut state.tangent, &state.stress)?;
        let f = self.yield_function.value(&state.stress, &state.internal_values)?;
        let scale = f64::max(state.stress.norm(), f64::MIN_POSITIVE);
        if f > self.config.yield_tolerance * scale {
            return Err("initial stress state is outside the yield surface");
        }
        state.yield_value = f;
        state.elastic = true;
        state.apex_return = false;
        state.algo_lagrange = 0.0;
        state.n_substeps = 0;
        Ok(())
    }

    /// Finds a parameter by name
    ///
    /// Components are searched in the order: elasticity, yield function,
    /// flow direction and evolving variables.
    pub fn find_parameter(&self, name: &str) -> Option<(ParamComponent, usize)> {
        let find = |names: &[&str]| names.iter().position(|n| *n == name);
        if let Some(i) = find(self.elasticity.parameter_names()) {
            return Some((ParamComponent::Elasticity, i));
        }
        if let Some(i) = find(self.yield_function.parameter_names()) {
            return Some((ParamComponent::YieldFunction, i));
        }
        if let Some(i) = find(self.flow_direction.parameter_names()) {
            return Some((ParamComponent::FlowDirection, i));
        }
        for (v, var) in self.evolving_variables.iter().enumerate() {
            if let Some(i) = find(var.parameter_names()) {
                return Some((ParamComponent::EvolvingVariable(v), i));
            }
        }
        None
    }

    /// Returns the name of a parameter
    pub fn parameter_name(&self, component: ParamComponent, index: usize) -> Result<&'static str, StrError> {
        let names = match component {
            ParamComponent::Elasticity => self.elasticity.parameter_names(),
            ParamComponent::YieldFunction => self.yield_function.parameter_names(),
            ParamComponent::FlowDirection => self.flow_direction.parameter_names(),
            ParamComponent::EvolvingVariable(v) => match self.evolving_variables.get(v) {
                Some(var) => var.parameter_names(),
                None => return Err("parameter component is out of range"),
            },
        };
        names.get(index).copied().ok_or("parameter index is out of range")
    }

    /// Returns the value of a parameter
    pub fn get_parameter(&self, component: ParamComponent, index: usize) -> Result<f64, StrError> {
        match component {
            ParamComponent::Elasticity => self.elasticity.get_parameter(index),
            ParamComponent::YieldFunction => self.yield_function.get_parameter(index),
            ParamComponent::FlowDirection => self.flow_direction.get_parameter(index),
            ParamComponent::EvolvingVariable(v) => match self.evolving_variables.get(v) {
                Some(var) => var.get_parameter(index),
                None => Err("parameter component is out of range"),
            },
        }
    }

    /// Sets the value of a parameter
    pub fn set_parameter(&mut self, component: ParamComponent, index: usize, value: f64) -> Result<(), StrError> {
        match component {
            ParamComponent::Elasticity => self.elasticity.set_parameter(index, value),
            ParamComponent::YieldFunction => self.yield_function.set_parameter(index, value),
            ParamComponent::FlowDirection => self.flow_direction.set_parameter(index, value),
            ParamComponent::EvolvingVariable(v) => match self.evolving_variables.get_mut(v) {
                Some(var) => var.set_parameter(index, value),
                None => Err("parameter component is out of range"),
            },
        }
    }

    /// Integrates a strain increment starting from the given state
    ///
    /// On success, the state holds the updated stress, strain, plastic strain,
    /// internal values and consistent tangent. On error, the state is not modified.
    pub fn integrate(&mut self, state: &mut LocalState, deps: &Tensor2) -> Result<Status, StrError> {
        if deps.mandel() != self.mandel || state.mandel() != self.mandel {
            return Err("strain increment and state must have the same Mandel representation as the model");
        }
        if state.internal_values.dim() != self.layout.dim() {
            return Err("number of internal values does not match the model");
        }
        self.work.sigma_n.set_tensor(1.0, &state.stress);
        vec_copy(&mut self.work.z_n, &state.internal_values)?;
        self.work.plastic_inc.clear();
        self.work.sens.fill(0.0);

        // pre-integration callback over the whole increment
        if self.pre_integration.is_some() && self.intercept_increment(deps)? {
            let f = self.yield_function.value(&self.work.sigma_tr, &self.work.z_n)?;
            state.stress.set_tensor(1.0, &self.work.sigma_tr);
            state.update_strain(1.0, deps);
            state.plastic_strain.update(1.0, &self.work.plastic_inc);
            state.tangent.set_tensor(1.0, &self.work.dde);
            state.elastic = false;
            state.apex_return = true;
            state.algo_lagrange = 0.0;
            state.yield_value = f;
            state.n_substeps = 1;
            debug!(p = t2_pressure(&state.stress), "trial stress intercepted");
            return Ok(Status::PlasticConverged);
        }

        // sub-stepping
        let dt_min = 1.0 / (self.config.max_substeps as f64);
        let dt_max = 1.0 / (self.config.initial_substeps as f64);
        let mut t = 0.0;
        let mut dt = dt_max;
        let mut n_accepted = 0;
        let mut n_rejected = 0;
        let mut plastic = false;
        let mut just_rejected = false;
        let mut lambda_total = 0.0;
        while t < 1.0 {
            let last = dt >= 1.0 - t;
            let fraction = if last { 1.0 - t } else { dt };
            let at_min = fraction * (self.config.max_substeps as f64) <= 1.0 + DT_TOL;
            match self.substep(fraction, deps, at_min)? {
                Substep::Rejected(reason) => {
                    n_rejected += 1;
                    debug!(t, dt = fraction, reason, "sub-step rejected");
                    if at_min {
                        warn!(t, n_accepted, n_rejected, reason, "sub-step budget exhausted");
                        return Err("sub-step budget exhausted");
                    }
                    dt = f64::max(0.5 * fraction, dt_min);
                    just_rejected = true;
                }
                outcome => {
                    let plastic_substep = if let Substep::Plastic(dlambda) = outcome {
                        plastic = true;
                        lambda_total += dlambda;
                        self.work.plastic_inc.update(dlambda, &self.work.m);
                        true
                    } else {
                        false
                    };
                    self.chain_sensitivities(fraction, plastic_substep)?;
                    self.work.sigma_n.set_tensor(1.0, &self.work.sigma);
                    vec_copy(&mut self.work.z_n, &self.work.z)?;
                    n_accepted += 1;
                    t = if last { 1.0 } else { t + fraction };
                    if !just_rejected {
                        dt = f64::min(2.0 * dt, dt_max);
                    }
                    just_rejected = false;
                }
            }
        }

        // final values (computed before touching the state)
        let f = self.yield_function.value(&self.work.sigma_n, &self.work.z_n)?;
        let apex = if plastic {
            self.yield_function.at_apex(&self.work.sigma_n, &self.work.z_n)?
        } else {
            false
        };
        debug!(n_accepted, n_rejected, plastic, lambda_total, f, "increment integrated");

        // update state
        state.stress.set_tensor(1.0, &self.work.sigma_n);
        vec_copy(&mut state.internal_values, &self.work.z_n)?;
        state.update_strain(1.0, deps);
        state.plastic_strain.update(1.0, &self.work.plastic_inc);
        if plastic {
            let nc = self.mandel.dim();
            let tangent = state.tangent.matrix_mut();
            for i in 0..nc {
                for j in 0..nc {
                    tangent.set(i, j, self.work.sens.get(i, j));
                }
            }
        } else {
            state.tangent.set_tensor(1.0, &self.work.tangent);
        }
        state.elastic = !plastic;
        state.apex_return = apex;
        state.algo_lagrange = lambda_total;
        state.yield_value = f;
        state.n_substeps = n_accepted;
        if plastic {
            Ok(Status::PlasticConverged)
        } else {
            Ok(Status::ElasticConverged)
        }
    }

    /// Runs the pre-integration callback on the elastic trial of the whole increment
    ///
    /// Returns true if the trial was accepted by the callback. In this case,
    /// `sigma_tr` holds the final stress and `plastic_inc` the plastic strain increment.
    fn intercept_increment(&mut self, deps: &Tensor2) -> Result<bool, StrError> {
        let pre = match self.pre_integration.as_ref() {
            Some(p) => p,
            None => return Ok(false),
        };
        let w = &mut self.work;
        self.elasticity.stiffness(&mut w.dde, &w.sigma_n)?;
        t4_ddot_t2(&mut w.aux, 1.0, &w.dde, deps);
        t2_add(&mut w.sigma_tr, 1.0, &w.sigma_n, 1.0, &w.aux);
        if pre.intercept(&mut w.sigma_tr, &w.z_n)? == Intercept::Proceed {
            return Ok(false);
        }
        // Δεp = Δε - Dₑ⁻¹ : (σ - σn)
        t4_inverse(&mut w.dde_inv, &w.dde)?;
        t2_add(&mut w.aux, 1.0, &w.sigma_tr, -1.0, &w.sigma_n);
        t4_ddot_t2(&mut w.deps_e, 1.0, &w.dde_inv, &w.aux);
        t2_add(&mut w.plastic_inc, 1.0, deps, -1.0, &w.deps_e);
        Ok(true)
    }

    /// Integrates a fraction of the strain increment from (σn, Zn)
    fn substep(&mut self, fraction: f64, deps: &Tensor2, at_min: bool) -> Result<Substep, StrError> {
        let config = self.config;
        let w = &mut self.work;

        // elastic trial (singular Dₑ is fatal)
        w.deps_sub.set_tensor(fraction, deps);
        self.elasticity.stiffness(&mut w.dde, &w.sigma_n)?;
        t4_inverse(&mut w.dde_inv, &w.dde)?;
        t4_ddot_t2(&mut w.aux, 1.0, &w.dde, &w.deps_sub);
        t2_add(&mut w.sigma_tr, 1.0, &w.sigma_n, 1.0, &w.aux);

        // characteristic magnitudes
        let sigma_scale = f64::max(
            f64::max(w.sigma_n.norm(), w.sigma_tr.norm()),
            f64::max(w.aux.norm(), f64::MIN_POSITIVE),
        );
        let z_scale = vec_norm(&w.z_n, Norm::Euc);

        // yield check
        let f_trial = self.yield_function.value(&w.sigma_tr, &w.z_n)?;
        if f_trial <= config.yield_tolerance * sigma_scale {
            w.sigma.set_tensor(1.0, &w.sigma_tr);
            vec_copy(&mut w.z, &w.z_n)?;
            self.elasticity.stiffness(&mut w.tangent, &w.sigma)?;
            return Ok(Substep::Elastic);
        }

        // flow direction at the trial state
        self.flow_direction.direction(&mut w.m_tr, &w.sigma_tr, &w.z_n)?;

        // return mapping
        w.sigma.set_tensor(1.0, &w.sigma_tr);
        vec_copy(&mut w.z, &w.z_n)?;
        w.pack(0.0);
        let mut dlambda = 0.0;
        let mut converged = false;
        for it in 0..(config.max_iterations + 1) {
            // residual
            let w = &mut self.work;
            flow_and_rates(
                self.flow_direction.as_mut(),
                &self.evolving_variables,
                &self.layout,
                &mut w.m,
                &mut w.h,
                &w.sigma,
                &w.z,
                &w.deps_sub,
            )?;
            let f = self.yield_function.value(&w.sigma, &w.z)?;
            t4_ddot_t2(&mut w.aux, 1.0, &w.dde, &w.m);
            t2_add(&mut w.r_sigma, 1.0, &w.sigma, -1.0, &w.sigma_tr);
            w.r_sigma.update(dlambda, &w.aux);
            vec_add(&mut w.r_z, 1.0, &w.z, -1.0, &w.z_n)?;
            vec_update(&mut w.r_z, -dlambda, &w.h)?;

            // check convergence
            let r_sigma = w.r_sigma.norm();
            let r_z = vec_norm(&w.r_z, Norm::Euc);
            let z_tol = config.residual_tolerance * f64::max(z_scale, vec_norm(&w.z, Norm::Euc))
                + config.absolute_tolerance;
            if r_sigma <= config.residual_tolerance * sigma_scale + config.absolute_tolerance
                && r_z <= z_tol
                && f64::abs(f) <= config.yield_tolerance * sigma_scale
            {
                debug!(iterations = it, r_sigma, r_z, f, dlambda, "return mapping converged");
                converged = true;
                break;
            }
            if it == config.max_iterations {
                break;
            }

            // Jacobian
            self.assemble_jacobian_at_iterate(dlambda, sigma_scale)?;

            // update: x -= J⁻¹ · R
            let w = &mut self.work;
            let nc = w.sigma.dim();
            let nz = w.z.dim();
            let res = w.res.as_mut_data();
            t2_store(&mut res[..nc], &w.r_sigma);
            res[nc..(nc + nz)].copy_from_slice(w.r_z.as_data());
            res[nc + nz] = f;
            if solve_lin_sys(&mut w.res, &mut w.jac).is_err() {
                return Ok(Substep::Rejected("singular jacobian"));
            }
            vec_update(&mut w.x, -1.0, &w.res)?;
            dlambda = w.unpack();
            if !dlambda.is_finite() {
                return Ok(Substep::Rejected("local Newton diverged"));
            }
        }
        if !converged {
            return Ok(Substep::Rejected("local Newton did not converge"));
        }

        // a negative multiplier means the sub-step is not a plastic loading
        if dlambda < 0.0 {
            let w = &mut self.work;
            warn!(dlambda, f_trial, "negative plastic multiplier; sub-step taken as elastic");
            w.sigma.set_tensor(1.0, &w.sigma_tr);
            vec_copy(&mut w.z, &w.z_n)?;
            self.elasticity.stiffness(&mut w.tangent, &w.sigma)?;
            return Ok(Substep::Elastic);
        }

        // inverse Jacobian at the solution (for the consistent tangent)
        self.assemble_jacobian_at_iterate(dlambda, sigma_scale)?;
        let w = &mut self.work;
        match mat_inverse(&mut w.jac_inv, &w.jac) {
            Ok(det) if det != 0.0 && det.is_finite() => (),
            _ => return Ok(Substep::Rejected("singular jacobian")),
        }

        // rotation of the flow direction within the sub-step
        let (norm_tr, norm_m) = (w.m_tr.norm(), w.m.norm());
        if !at_min && norm_tr > 0.0 && norm_m > 0.0 {
            let cos = f64::max(-1.0, f64::min(1.0, t2_ddot_t2(&w.m_tr, &w.m) / (norm_tr * norm_m)));
            if f64::acos(cos) > config.max_flow_rotation {
                return Ok(Substep::Rejected("flow direction rotated too much"));
            }
        }

        // saturation limits
        for (i, var) in self.evolving_variables.iter().enumerate() {
            if var.has_saturation_limit() {
                let range = self.layout.range(i);
                var.enforce_saturation_limit(&mut w.z.as_mut_data()[range], &w.m);
            }
        }
        Ok(Substep::Plastic(dlambda))
    }

    /// Chains the sensitivities d{σ, Z}/dΔε with the last accepted sub-step
    ///
    /// Requires Dₑ of the sub-step and, if plastic, the inverse Jacobian at the solution.
    fn chain_sensitivities(&mut self, fraction: f64, plastic: bool) -> Result<(), StrError> {
        let w = &mut self.work;
        let nc = w.sigma.dim();
        let nsz = nc + w.z.dim();
        let dd = w.dde.matrix();
        for i in 0..nc {
            for j in 0..nc {
                w.sens.add(i, j, fraction * dd.get(i, j));
            }
        }
        if plastic {
            for i in 0..nsz {
                for j in 0..nsz {
                    w.jac_inv_sz.set(i, j, w.jac_inv.get(i, j));
                }
            }
            mat_mat_mul(&mut w.sens_aux, 1.0, &w.jac_inv_sz, &w.sens, 0.0)?;
            mat_copy(&mut w.sens, &w.sens_aux)?;
        }
        Ok(())
    }

    /// Assembles the Jacobian of the residual at the current iterate
    ///
    /// Requires m and h at the current iterate.
    fn assemble_jacobian_at_iterate(&mut self, dlambda: f64, sigma_scale: f64) -> Result<(), StrError> {
        let w = &mut self.work;
        let nc = w.sigma.dim();
        let nz = w.z.dim();
        let n = nc + nz + 1;
        let pert = self.config.perturbation;

        // derivatives of m and h w.r.t σ
        let delta = pert * f64::max(w.sigma.norm(), sigma_scale);
        for j in 0..nc {
            w.sigma_p.set_tensor(1.0, &w.sigma);
            w.sigma_p.vector_mut()[j] += delta;
            flow_and_rates(
                self.flow_direction.as_mut(),
                &self.evolving_variables,
                &self.layout,
                &mut w.m_p,
                &mut w.h_p,
                &w.sigma_p,
                &w.z,
                &w.deps_sub,
            )?;
            for i in 0..nc {
                w.dm_dsigma.set(i, j, (w.m_p.vector()[i] - w.m.vector()[i]) / delta);
            }
            for i in 0..nz {
                w.dh_dsigma.set(i, j, (w.h_p[i] - w.h[i]) / delta);
            }
        }

        // derivatives of m and h w.r.t Z
        for j in 0..nz {
            vec_copy(&mut w.z_p, &w.z)?;
            let delta = pert * f64::max(f64::abs(w.z[j]), 1.0);
            w.z_p[j] += delta;
            flow_and_rates(
                self.flow_direction.as_mut(),
                &self.evolving_variables,
                &self.layout,
                &mut w.m_p,
                &mut w.h_p,
                &w.sigma,
                &w.z_p,
                &w.deps_sub,
            )?;
            for i in 0..nc {
                w.dm_dz.set(i, j, (w.m_p.vector()[i] - w.m.vector()[i]) / delta);
            }
            for i in 0..nz {
                w.dh_dz.set(i, j, (w.h_p[i] - w.h[i]) / delta);
            }
        }

        // derivatives of f
        self.yield_function.df_dsigma(&mut w.df_dsigma, &w.sigma, &w.z)?;
        self.yield_function.df_dz(&mut w.df_dz, &w.sigma, &w.z)?;

        // Dₑ : m, Dₑ · ∂m/∂σ and Dₑ · ∂m/∂Z
        t4_ddot_t2(&mut w.aux, 1.0, &w.dde, &w.m);
        mat_mat_mul(&mut w.dd_dm_dsigma, 1.0, w.dde.matrix(), &w.dm_dsigma, 0.0)?;
        mat_mat_mul(&mut w.dd_dm_dz, 1.0, w.dde.matrix(), &w.dm_dz, 0.0)?;

        // stress rows
        w.jac.fill(0.0);
        for i in 0..nc {
            w.jac.set(i, i, 1.0);
            for j in 0..nc {
                w.jac.add(i, j, dlambda * w.dd_dm_dsigma.get(i, j));
            }
            for j in 0..nz {
                w.jac.set(i, nc + j, dlambda * w.dd_dm_dz.get(i, j));
            }
            w.jac.set(i, n - 1, w.aux.vector()[i]);
        }

        // internal-value rows
        for i in 0..nz {
            w.jac.set(nc + i, nc + i, 1.0);
            for j in 0..nc {
                w.jac.set(nc + i, j, -dlambda * w.dh_dsigma.get(i, j));
            }
            for j in 0..nz {
                w.jac.add(nc + i, nc + j, -dlambda * w.dh_dz.get(i, j));
            }
            w.jac.set(nc + i, n - 1, -w.h[i]);
        }

        // yield function row
        for j in 0..nc {
            w.jac.set(n - 1, j, w.df_dsigma.vector()[j]);
        }
        for j in 0..nz {
            w.jac.set(n - 1, nc + j, w.df_dz[j]);
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
