use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CANONICAL_KEYS: [&str; 8] = [
    "timestamp",
    "severity",
    "name",
    "filename",
    "lineno",
    "trace_id",
    "span_id",
    "message",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogLine {
    pub timestamp: String,
    pub severity: String,
    pub name: String,
    pub filename: String,
    pub lineno: u32,
    pub trace_id: String,
    pub span_id: String,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogLine {
    pub fn insert_field(&mut self, key: &str, value: Value) {
        if CANONICAL_KEYS.contains(&key) {
            return;
        }
        self.fields.insert(key.to_string(), value);
    }

    pub fn to_json_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"severity\":{:?},\"trace_id\":\"{}\",\"span_id\":\"{}\",\"message\":{:?}}}",
                self.severity, self.trace_id, self.span_id, self.message
            )
        });
        line.push('\n');
        line
    }
}
