use chrono::{Datelike, NaiveDate, TimeZone, Utc};

mod error;
mod event;
mod id;
mod thread;

pub use error::Error;
pub use event::{Event, NewEvent};
pub use id::{RecordId, ID_LEN};
pub use thread::{Comment, NewComment, NewThread, Thread};

pub type Time = chrono::DateTime<Utc>;

/// A point in time as clients may send it: milliseconds since the epoch, or a date string
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(i64),
    /// Fractional milliseconds, truncated toward zero
    FractionalMillis(f64),
    Text(String),
}

impl TimeInput {
    /// The time this designates, if it parses and falls within years 0 to 9999
    pub fn resolve(&self) -> Option<Time> {
        self.parse().filter(|t| (0..=9999).contains(&t.year()))
    }

    fn parse(&self) -> Option<Time> {
        match self {
            TimeInput::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            TimeInput::FractionalMillis(ms) => {
                let ms = ms.trunc();
                if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
                    return None;
                }
                Utc.timestamp_millis_opt(ms as i64).single()
            }
            TimeInput::Text(s) => {
                let s = s.trim();
                if let Ok(t) = chrono::DateTime::parse_from_rfc3339(s) {
                    return Some(t.with_timezone(&Utc));
                }
                let day = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
                Some(Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0)?))
            }
        }
    }
}

impl From<Time> for TimeInput {
    fn from(t: Time) -> TimeInput {
        TimeInput::Text(t.to_rfc3339())
    }
}

pub(crate) fn require_str(field: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(Error::MissingField(String::from(field))),
    }
}

/// Untyped values follow the usual truthiness rules: null, false, 0 and "" count as missing
pub(crate) fn require_value(
    field: &str,
    value: Option<serde_json::Value>,
) -> Result<serde_json::Value, Error> {
    use serde_json::Value;
    let present = match &value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) | Some(Value::Bool(true)) => true,
    };
    match value {
        Some(v) if present => Ok(v),
        _ => Err(Error::MissingField(String::from(field))),
    }
}

/// Coordinates are numbers, so 0 counts as missing like any other falsy value
pub(crate) fn require_coordinate(field: &str, value: Option<f64>) -> Result<f64, Error> {
    match value {
        None => Err(Error::MissingField(String::from(field))),
        Some(v) if v == 0.0 => Err(Error::MissingField(String::from(field))),
        Some(v) if !v.is_finite() => Err(Error::InvalidField(String::from(field))),
        Some(v) => Ok(v),
    }
}

pub(crate) fn require_time(field: &str, value: Option<TimeInput>) -> Result<Time, Error> {
    value
        .ok_or_else(|| Error::MissingField(String::from(field)))?
        .resolve()
        .ok_or_else(|| Error::InvalidField(String::from(field)))
}
