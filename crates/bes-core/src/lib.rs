//! bes-core: shared vocabulary of the building energy simulation engine.
//!
//! Contains:
//! - quantity (reference types, quantity names, input references, result descriptions)
//! - ids (value arena handles, node indices, object ids)
//! - numeric (Real, convergence tolerances, finiteness checks)
//! - units (uom SI conversions for project parameters)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod quantity;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use quantity::*;
