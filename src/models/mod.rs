// Domain models streamed to clients

mod record;
mod stats;

pub use record::{EVENT_DELIMITER, MergedRecord};
pub use stats::DerivedStats;
