use {
    crate::error::RotatingLoggerError,
    chrono::{DateTime, Utc},
    std::{collections::BTreeMap, fmt, str::FromStr},
};

/// Severity of a log record.
///
/// The variants are ordered from least to most severe, so a minimum severity
/// filter is a plain comparison:
///
/// ```
/// use rotalog::Severity;
///
/// assert!(Severity::Warn > Severity::Info);
/// assert!(Severity::Trace < Severity::Fatal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Highest severity. Records are written like any other; the engine never
    /// terminates the process on their behalf.
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = RotatingLoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "warn" | "warning" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(RotatingLoggerError::InvalidConfig(format!("unknown severity '{other}'"))),
        }
    }
}

/// A structured field value attached to a [`LogRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::UInt(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Structured fields of a record, kept sorted by key.
pub type Fields = BTreeMap<String, Value>;

/// A single log record as accepted from a producer.
///
/// Records are immutable once enqueued; the timestamp is taken from the
/// engine clock at the moment the producer calls into the logger.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(severity: Severity, message: impl Into<String>, fields: Fields, timestamp: DateTime<Utc>) -> Self {
        LogRecord {
            severity,
            message: message.into(),
            fields,
            timestamp,
        }
    }

    /// Look up a field rendered as a string.
    pub fn field(&self, key: &str) -> Option<String> {
        self.fields.get(key).map(|v| v.to_string())
    }
}
