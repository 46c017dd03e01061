use std::num::IntErrorKind;

use serde_json::{Map, Value};

use super::service::TriggerError;

const SAMPLE_SIZE_KEY: &str = "sample_size";
const MAX_CANDIDATES_KEY: &str = "max_candidates";
const MIN_CANDIDATES_KEY: &str = "min_candidates";

const RESERVED_KEYS: [&str; 3] = [SAMPLE_SIZE_KEY, MAX_CANDIDATES_KEY, MIN_CANDIDATES_KEY];

const DEFAULT_SAMPLE_SIZE: i64 = 1000;
const MAX_SAMPLE_SIZE: i64 = 5000;
const DEFAULT_MAX_CANDIDATES: i64 = 10;
const MAX_CANDIDATES_CEILING: i64 = 10;
const DEFAULT_MIN_CANDIDATES: i64 = 3;

/// Notebook run parameters after clamping, plus any caller fields that are
/// forwarded untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerParameters {
    pub sample_size: u32,
    pub max_candidates: u32,
    pub min_candidates: u32,
    pub passthrough: Map<String, Value>,
}

impl TriggerParameters {
    /// Parse a raw request body. Unparseable and empty-valued bodies
    /// (`null`, `false`, `0`, `""`, `[]`) count as `{}`; any other
    /// non-object is rejected.
    pub fn from_body(body: &[u8]) -> Result<Self, TriggerError> {
        let fields = match serde_json::from_slice::<Value>(body) {
            Err(_) => Map::new(),
            Ok(Value::Object(fields)) => fields,
            Ok(value) if is_empty_value(&value) => Map::new(),
            Ok(_) => return Err(TriggerError::InvalidParameters),
        };
        Self::from_map(fields)
    }

    pub fn from_map(mut fields: Map<String, Value>) -> Result<Self, TriggerError> {
        let sample_size = read_count(&fields, SAMPLE_SIZE_KEY, DEFAULT_SAMPLE_SIZE)?
            .clamp(1, MAX_SAMPLE_SIZE);
        let max_candidates = read_count(&fields, MAX_CANDIDATES_KEY, DEFAULT_MAX_CANDIDATES)?
            .clamp(1, MAX_CANDIDATES_CEILING);
        let min_candidates = read_count(&fields, MIN_CANDIDATES_KEY, DEFAULT_MIN_CANDIDATES)?
            .clamp(1, max_candidates);
        fields.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));

        Ok(Self {
            sample_size: sample_size as u32,
            max_candidates: max_candidates as u32,
            min_candidates: min_candidates as u32,
            passthrough: fields,
        })
    }

    /// Notebook payload: the three reserved keys first, then passthrough fields.
    pub fn into_payload(self) -> Value {
        let mut payload = Map::new();
        payload.insert(SAMPLE_SIZE_KEY.to_string(), Value::from(self.sample_size));
        payload.insert(MAX_CANDIDATES_KEY.to_string(), Value::from(self.max_candidates));
        payload.insert(MIN_CANDIDATES_KEY.to_string(), Value::from(self.min_candidates));
        payload.extend(self.passthrough);
        Value::Object(payload)
    }
}

impl Default for TriggerParameters {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE as u32,
            max_candidates: DEFAULT_MAX_CANDIDATES as u32,
            min_candidates: DEFAULT_MIN_CANDIDATES as u32,
            passthrough: Map::new(),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}

fn read_count(fields: &Map<String, Value>, key: &str, default: i64) -> Result<i64, TriggerError> {
    match fields.get(key) {
        None => Ok(default),
        Some(value) => coerce_integer(value).ok_or(TriggerError::InvalidParameters),
    }
}

/// Integers as-is, floats truncated toward zero, integer strings parsed.
/// Out-of-range values saturate so the later clamp still applies.
fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_u64().map(|_| i64::MAX))
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64)),
        Value::String(raw) => match raw.trim().parse::<i64>() {
            Ok(parsed) => Some(parsed),
            Err(error) => match error.kind() {
                IntErrorKind::PosOverflow => Some(i64::MAX),
                IntErrorKind::NegOverflow => Some(i64::MIN),
                _ => None,
            },
        },
        _ => None,
    }
}
