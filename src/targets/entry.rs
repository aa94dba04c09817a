use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::log_level::LogLevel;
use crate::manager::WriteContext;

#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub logger: String,
    pub message: String,
}

#[derive(Serialize)]
struct SerializedEntry<'a> {
    timestamp: i64,
    level: &'a str,
    logger: &'a str,
    message: &'a str,
    sequence: u64,
    session_id: &'a str,
    process_id: u32,
}

impl LogEntry {
    /// One JSON line for the entry, enriched with the write context.
    #[must_use]
    pub fn to_json_line(&self, context: &WriteContext) -> String {
        let entry = SerializedEntry {
            timestamp: self.timestamp.timestamp_millis(),
            level: self.level.as_ref(),
            logger: &self.logger,
            message: &self.message,
            sequence: self.sequence,
            session_id: &context.session_id,
            process_id: context.process_id,
        };
        // only strings and integers, serialization cannot fail
        serde_json::to_string(&entry).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::manager::ManagerId;
    use chrono::TimeZone;

    #[test]
    fn json_line_carries_context() {
        let entry = LogEntry {
            sequence: 7,
            timestamp: Utc.timestamp_millis_opt(1_666_361_103_165).unwrap(),
            level: LogLevel::Warn,
            logger: "app".to_string(),
            message: "disk \"almost\" full".to_string(),
        };
        let context = WriteContext {
            manager_id: ManagerId::next(),
            session_id: "s-1".to_string(),
            process_id: 42,
        };
        let line = entry.to_json_line(&context);
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["timestamp"], 1_666_361_103_165_i64);
        assert_eq!(value["level"], "WARN");
        assert_eq!(value["message"], "disk \"almost\" full");
        assert_eq!(value["session_id"], "s-1");
        assert_eq!(value["process_id"], 42);
    }
}
