#![forbid(unsafe_code)]

pub mod mastery;
pub mod model;
pub mod quiz;
pub mod time;

pub use mastery::{AggregationPolicy, ParsePolicyError, ProgressAggregator, ProgressSummary};
pub use time::Clock;
