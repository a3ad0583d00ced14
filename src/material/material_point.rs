use super::{ConstitutiveIntegrator, LocalState, ParamComponent, Status};
use crate::base::{t2_isotropic, t2_load, t2_store, Idealization, IntegratorConfig, ParamMaterial};
use crate::StrError;
use russell_tensor::{t2_add, Tensor2, Tensor4};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifies a parameter registered with [MaterialPoint::set_parameter]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamHandle {
    /// Parameter of one component of the constitutive model
    Model(ParamComponent, usize),

    /// Initial pressure p₀ of the ground state
    InitialPressure,
}

/// Implements a material point with trial and committed states
///
/// The point owns its integrator (and all scratch data); thus distinct points
/// may be updated concurrently.
pub struct MaterialPoint {
    /// Identification number
    tag: usize,

    /// Material parameters
    param: ParamMaterial,

    /// Constitutive integrator
    integrator: ConstitutiveIntegrator,

    /// Ground state (as constructed)
    ground: LocalState,

    /// Last committed state
    committed: LocalState,

    /// Trial state
    trial: LocalState,

    /// Status of the last trial
    status: Status,
}

impl MaterialPoint {
    /// Allocates a new instance
    ///
    /// The ground state has zero strain and the isotropic stress `σ = -p₀ I`.
    pub fn new(
        tag: usize,
        param: &ParamMaterial,
        ideal: &Idealization,
        config: &IntegratorConfig,
    ) -> Result<Self, StrError> {
        let mut integrator = ConstitutiveIntegrator::new(ideal, param, config)?;
        let ground = ground_state(&mut integrator, param.p0)?;
        Ok(MaterialPoint {
            tag,
            param: *param,
            integrator,
            committed: ground.clone(),
            trial: ground.clone(),
            ground,
            status: Status::ElasticConverged,
        })
    }

    /// Returns the identification number
    pub fn tag(&self) -> usize {
        self.tag
    }

    /// Returns the material parameters
    pub fn param(&self) -> &ParamMaterial {
        &self.param
    }

    /// Returns the constitutive integrator
    pub fn integrator(&self) -> &ConstitutiveIntegrator {
        &self.integrator
    }

    /// Sets the trial total strain and integrates from the committed state
    ///
    /// On error, the trial state is reset to the committed state and the status becomes [Status::Failed].
    pub fn set_trial_strain(&mut self, strain: &Tensor2) -> Result<Status, StrError> {
        if strain.mandel() != self.committed.mandel() {
            return Err("strain must have the same Mandel representation as the state");
        }
        let mut deps = Tensor2::new(strain.mandel());
        t2_add(&mut deps, 1.0, strain, -1.0, &self.committed.strain);
        self.set_trial_strain_increment(&deps)
    }

    /// Sets the trial strain increment (from the committed state) and integrates
    pub fn set_trial_strain_increment(&mut self, deps: &Tensor2) -> Result<Status, StrError> {
        self.trial.mirror(&self.committed);
        match self.integrator.integrate(&mut self.trial, deps) {
            Ok(status) => {
                self.status = status;
                Ok(status)
            }
            Err(e) => {
                warn!(tag = self.tag, error = e, "integration failed");
                self.trial.mirror(&self.committed);
                self.status = Status::Failed;
                Err(e)
            }
        }
    }

    /// Returns the trial stress
    pub fn get_stress(&self) -> &Tensor2 {
        &self.trial.stress
    }

    /// Returns the trial strain
    pub fn get_strain(&self) -> &Tensor2 {
        &self.trial.strain
    }

    /// Returns the consistent tangent of the trial
    pub fn get_tangent(&self) -> &Tensor4 {
        &self.trial.tangent
    }

    /// Returns the trial state
    pub fn get_state(&self) -> &LocalState {
        &self.trial
    }

    /// Returns the committed state
    pub fn get_committed_state(&self) -> &LocalState {
        &self.committed
    }

    /// Returns the status of the last trial
    pub fn status(&self) -> Status {
        self.status
    }

    /// Copies the trial state into the committed state
    pub fn commit(&mut self) {
        self.committed.mirror(&self.trial);
    }

    /// Discards the trial state
    ///
    /// The status becomes the one of the committed state.
    pub fn revert_to_last_commit(&mut self) {
        self.trial.mirror(&self.committed);
        self.status = committed_status(&self.committed);
    }

    /// Resets the trial and committed states to the ground state
    pub fn revert_to_start(&mut self) {
        self.committed.mirror(&self.ground);
        self.trial.mirror(&self.ground);
        self.status = committed_status(&self.ground);
    }

    /// Returns the number of values written by [MaterialPoint::send_self]
    pub fn send_size(&self) -> usize {
        let nc = self.committed.mandel().dim();
        let nz = self.committed.internal_values.dim();
        3 + 3 * nc + nz + 3
    }

    /// Serializes the committed state
    ///
    /// ```text
    /// [tag, n_comp, n_z, σ, ε, εp, z, elastic, apex_return, Δλ]
    /// ```
    pub fn send_self(&self) -> Vec<f64> {
        let state = &self.committed;
        let nc = state.mandel().dim();
        let nz = state.internal_values.dim();
        let mut data = vec![0.0; self.send_size()];
        data[0] = self.tag as f64;
        data[1] = nc as f64;
        data[2] = nz as f64;
        let mut start = 3;
        for tensor in [&state.stress, &state.strain, &state.plastic_strain] {
            t2_store(&mut data[start..(start + nc)], tensor);
            start += nc;
        }
        data[start..(start + nz)].copy_from_slice(state.internal_values.as_data());
        start += nz;
        data[start] = if state.elastic { 1.0 } else { 0.0 };
        data[start + 1] = if state.apex_return { 1.0 } else { 0.0 };
        data[start + 2] = state.algo_lagrange;
        data
    }

    /// Restores the committed (and trial) state from data written by [MaterialPoint::send_self]
    ///
    /// The tangent and the yield value are recomputed from the restored stress.
    pub fn receive_self(&mut self, data: &[f64]) -> Result<(), StrError> {
        let nc = self.committed.mandel().dim();
        let nz = self.committed.internal_values.dim();
        if data.len() != self.send_size() {
            return Err("data has an incorrect length");
        }
        if data[1] != nc as f64 || data[2] != nz as f64 {
            return Err("data does not match the number of components of the state");
        }
        let mut state = self.committed.clone();
        let mut start = 3;
        for tensor in [&mut state.stress, &mut state.strain, &mut state.plastic_strain] {
            t2_load(tensor, &data[start..(start + nc)]);
            start += nc;
        }
        state.internal_values.as_mut_data().copy_from_slice(&data[start..(start + nz)]);
        start += nz;
        state.elastic = data[start] != 0.0;
        state.apex_return = data[start + 1] != 0.0;
        state.algo_lagrange = data[start + 2];
        self.integrator.elastic_stiffness(&mut state.tangent, &state.stress)?;
        state.yield_value = self.integrator.yield_value(&state.stress, &state.internal_values)?;
        self.tag = data[0] as usize;
        self.committed.mirror(&state);
        self.trial.mirror(&state);
        Ok(())
    }

    /// Sets a parameter given its name and returns a handle for subsequent updates
    ///
    /// The name `"p0"` refers to the initial pressure and rebuilds the ground state.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<ParamHandle, StrError> {
        let handle = if name == "p0" {
            ParamHandle::InitialPressure
        } else {
            match self.integrator.find_parameter(name) {
                Some((component, index)) => ParamHandle::Model(component, index),
                None => return Err("parameter name is not available"),
            }
        };
        self.update_parameter(handle, value)?;
        Ok(handle)
    }

    /// Updates the value of a parameter
    ///
    /// The material parameters returned by [MaterialPoint::param] and the ground
    /// state used by [MaterialPoint::revert_to_start] follow the new value.
    /// On error, nothing is modified.
    pub fn update_parameter(&mut self, handle: ParamHandle, value: f64) -> Result<(), StrError> {
        match handle {
            ParamHandle::Model(component, index) => {
                let name = self.integrator.parameter_name(component, index)?;
                let mut param = self.param;
                param.set_value(name, value)?;
                let old = self.integrator.get_parameter(component, index)?;
                self.integrator.set_parameter(component, index, value)?;
                match ground_state(&mut self.integrator, param.p0) {
                    Ok(ground) => {
                        self.param = param;
                        self.ground = ground;
                        Ok(())
                    }
                    Err(e) => {
                        self.integrator.set_parameter(component, index, old)?;
                        Err(e)
                    }
                }
            }
            ParamHandle::InitialPressure => {
                if value < 0.0 {
                    return Err("initial pressure p0 must be ≥ 0.0");
                }
                let ground = ground_state(&mut self.integrator, value)?;
                self.param.p0 = value;
                self.ground = ground;
                Ok(())
            }
        }
    }

    /// Returns the value of a parameter
    pub fn get_parameter(&self, handle: ParamHandle) -> Result<f64, StrError> {
        match handle {
            ParamHandle::Model(component, index) => self.integrator.get_parameter(component, index),
            ParamHandle::InitialPressure => Ok(self.param.p0),
        }
    }
}

/// Allocates the ground state with isotropic stress σ = -p₀ I
fn ground_state(integrator: &mut ConstitutiveIntegrator, p0: f64) -> Result<LocalState, StrError> {
    let mut state = LocalState::new(integrator.mandel(), integrator.layout().dim());
    t2_isotropic(&mut state.stress, -p0);
    integrator.initialize_state(&mut state)?;
    Ok(state)
}

/// Returns the status corresponding to a converged state
fn committed_status(state: &LocalState) -> Status {
    if state.elastic {
        Status::ElasticConverged
    } else {
        Status::PlasticConverged
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
