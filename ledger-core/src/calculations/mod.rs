//! Pure calculation modules for the bookkeeping tax engine.
//!
//! Everything in here is stateless computation over caller-supplied
//! snapshots: depreciation amortization, progressive slab application, and
//! shared monetary rounding. Persistence and orchestration live elsewhere.

pub mod common;
pub mod depreciation;
pub mod slabs;

pub use depreciation::{DepreciationError, accumulated_depreciation};
pub use slabs::{default_slab_schedule, tax_from_slabs};
