//! Application Layer
//!
//! Services orchestrating the domain collaborators on behalf of the
//! presentation layer.

pub mod services;
