//! CSV loading for configured slab schedules.

mod loader;

pub use loader::{SlabLoaderError, SlabRecord, SlabScheduleLoader};
