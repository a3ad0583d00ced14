//! Implements the elastoplastic models and the constitutive integrator

mod checkpoint;
mod elasticity;
mod evolving_variables;
mod flow_direction;
mod integrator;
mod internal_values;
mod local_state;
mod material_point;
mod material_points;
mod models;
mod pre_integration;
mod yield_function;
pub use crate::material::checkpoint::*;
pub use crate::material::elasticity::*;
pub use crate::material::evolving_variables::*;
pub use crate::material::flow_direction::*;
pub use crate::material::integrator::*;
pub use crate::material::internal_values::*;
pub use crate::material::local_state::*;
pub use crate::material::material_point::*;
pub use crate::material::material_points::*;
pub use crate::material::models::*;
pub use crate::material::pre_integration::*;
pub use crate::material::yield_function::*;
