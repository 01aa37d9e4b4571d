use std::fmt;

use serde::{Deserialize, Serialize};

pub const ZERO_TRACE_ID: &str = "00000000000000000000000000000000";
pub const ZERO_SPAN_ID: &str = "0000000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(String);

impl TraceId {
    pub fn from_u128(raw: u128) -> Self {
        Self(format!("{raw:032x}"))
    }

    pub fn zero() -> Self {
        Self(ZERO_TRACE_ID.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_TRACE_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl SpanId {
    pub fn from_u64(raw: u64) -> Self {
        Self(format!("{raw:016x}"))
    }

    pub fn zero() -> Self {
        Self(ZERO_SPAN_ID.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_SPAN_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::zero()
    }
}

impl Default for SpanId {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_raw_ids_zero_padded() {
        assert_eq!(
            TraceId::from_u128(0xabc).as_str(),
            "00000000000000000000000000000abc"
        );
        assert_eq!(SpanId::from_u64(1).as_str(), "0000000000000001");
    }

    #[test]
    fn zero_ids_match_placeholders() {
        assert!(TraceId::from_u128(0).is_zero());
        assert!(SpanId::from_u64(0).is_zero());
        assert_eq!(TraceId::default().to_string(), ZERO_TRACE_ID);
        assert_eq!(SpanId::default().to_string(), ZERO_SPAN_ID);
        assert_eq!(ZERO_TRACE_ID.len(), 32);
        assert_eq!(ZERO_SPAN_ID.len(), 16);
    }
}
