//! Input/output helpers.
//!
//! - CSV observation ingest (`ingest`)
//! - per-observation residual CSV export (`export`)
//! - estimate JSON read/write (`result`)

pub mod export;
pub mod ingest;
pub mod result;

pub use export::*;
pub use ingest::*;
pub use result::*;
