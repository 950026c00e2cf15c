//! psyphys-core: Foundation types for physiological event extraction
//!
//! Signals, provenance metadata, peak sets and the shared error type.

pub mod signal_entity;
pub mod signal_types;
pub mod peaks;
pub mod error;

pub use signal_entity::*;
pub use signal_types::*;
pub use peaks::*;
pub use error::{PsyError, PsyResult};
