//! Makes available common structures needed to integrate material points
//!
//! You may write `use elastoplast::prelude::*` in your code and obtain
//! access to commonly used functionality.

pub use crate::base::{Idealization, IntegratorConfig, ParamElasticity, ParamMaterial, ParamPlasticity, SampleParams, SampleStrains};
pub use crate::material::{Checkpoint, ConstitutiveIntegrator, LocalState, MaterialPoint, MaterialPoints, ParamHandle, Status};
