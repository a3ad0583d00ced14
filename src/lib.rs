//! Elastoplast implements the integration of elastoplastic constitutive models at material points
//!
//! A model is composed of an elasticity law, a yield function, a plastic flow
//! direction and a list of evolving (hardening) variables. The integrator
//! computes the stress, the internal values and the consistent tangent given a
//! strain increment, using an implicit return mapping with adaptive sub-stepping.
//! The material point keeps the trial/committed/ground states.

/// Defines a type alias for the error type as a static string
pub type StrError = &'static str;

pub mod base;
pub mod material;
pub mod prelude;
