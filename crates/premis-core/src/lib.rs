//! PREMIS Core — domain models, errors, and data-access trait
//! definitions shared across the workspace.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{FieldError, PremisError, PremisResult};
