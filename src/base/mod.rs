//! Implements the base structures for the constitutive integration

mod config;
mod idealization;
mod parameters;
mod sample_params;
mod sample_strains;
mod tensor_ops;
pub use crate::base::config::*;
pub use crate::base::idealization::*;
pub use crate::base::parameters::*;
pub use crate::base::sample_params::*;
pub use crate::base::sample_strains::*;
pub use crate::base::tensor_ops::*;
