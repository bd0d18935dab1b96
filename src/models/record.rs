// One log line paired with one stats sample

use super::DerivedStats;

/// Separates the stats JSON from the log line in an event payload.
pub const EVENT_DELIMITER: char = '|';

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub line: String,
    pub stats: DerivedStats,
}

impl MergedRecord {
    /// Event payload: compact stats JSON, the delimiter, then the log line.
    pub fn render(&self) -> Result<String, serde_json::Error> {
        let stats = serde_json::to_string(&self.stats)?;
        Ok(format!("{stats}{EVENT_DELIMITER}{}", self.line))
    }
}
