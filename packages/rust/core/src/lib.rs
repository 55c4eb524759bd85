//! Pipeline orchestration for secfeed.
//!
//! Ties sources, the safety filter, storage, and delivery into the
//! collection cycle, plus the scheduled trigger and the lookup surface
//! built on top of the store.

pub mod lookup;
pub mod pipeline;
pub mod schedule;

pub use pipeline::{CollectPlan, Collector, CycleObserver, SilentObserver};
pub use schedule::run_scheduled;
