//! TWAPEngine, spec §4.7: slice scheduling, per-slice execution, imbalance
//! checks.

pub mod engine;
pub mod schedule;

pub use engine::{ExecutionStatus, SliceResult, TwapEngine, TwapExecution};
pub use schedule::{build_schedule, build_schedule_from_profiles, SlippageConfidence, TwapSchedule, DEFAULT_MAX_DURATION_MINUTES};
