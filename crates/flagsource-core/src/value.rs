//! Flag value types
//!
//! Every flag-set cell stores a tagged [`FlagValue`]. Typed accessors convert
//! the tag directly; the `Display` form is the flag's raw string
//! representation, which is what the command line and help output see.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A resolved flag value
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    /// Boolean switch
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point value
    Float(f64),
    /// Plain string
    String(String),
    /// Filesystem path
    Path(PathBuf),
    /// Time span
    Duration(Duration),
    /// Ordered list of strings
    StringList(Vec<String>),
}

impl FlagValue {
    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "bool",
            FlagValue::Int(_) => "int",
            FlagValue::Uint(_) => "uint",
            FlagValue::Float(_) => "float",
            FlagValue::String(_) => "string",
            FlagValue::Path(_) => "path",
            FlagValue::Duration(_) => "duration",
            FlagValue::StringList(_) => "string slice",
        }
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlagValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as u64 if this is a Uint
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FlagValue::Uint(u) => Some(*u),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FlagValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlagValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as path if this is a Path
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            FlagValue::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Get as duration if this is a Duration
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            FlagValue::Duration(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as slice if this is a StringList
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FlagValue::StringList(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Int(i) => write!(f, "{}", i),
            FlagValue::Uint(u) => write!(f, "{}", u),
            FlagValue::Float(x) => write!(f, "{}", x),
            FlagValue::String(s) => f.write_str(s),
            FlagValue::Path(p) => write!(f, "{}", p.display()),
            FlagValue::Duration(d) => f.write_str(&format_duration(*d)),
            FlagValue::StringList(l) => f.write_str(&l.join(",")),
        }
    }
}

/// Render a duration the way Go's `time.Duration` prints it
/// (`1h30m0s`, `1.5s`, `250ms`, `0s`).
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fraction(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", fraction(nanos, 1_000_000));
    }

    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let seconds = fraction(
        u128::from(seconds) * 1_000_000_000 + u128::from(d.subsec_nanos()),
        1_000_000_000,
    );

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// `n / unit` as a decimal with trailing zeros trimmed
fn fraction(n: u128, unit: u128) -> String {
    let whole = n / unit;
    let rem = n % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.to_string().len() - 1;
    let digits = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

impl From<bool> for FlagValue {
    fn from(b: bool) -> Self {
        FlagValue::Bool(b)
    }
}

impl From<i64> for FlagValue {
    fn from(i: i64) -> Self {
        FlagValue::Int(i)
    }
}

impl From<u64> for FlagValue {
    fn from(u: u64) -> Self {
        FlagValue::Uint(u)
    }
}

impl From<f64> for FlagValue {
    fn from(f: f64) -> Self {
        FlagValue::Float(f)
    }
}

impl From<String> for FlagValue {
    fn from(s: String) -> Self {
        FlagValue::String(s)
    }
}

impl From<&str> for FlagValue {
    fn from(s: &str) -> Self {
        FlagValue::String(s.to_string())
    }
}

impl From<PathBuf> for FlagValue {
    fn from(p: PathBuf) -> Self {
        FlagValue::Path(p)
    }
}

impl From<Duration> for FlagValue {
    fn from(d: Duration) -> Self {
        FlagValue::Duration(d)
    }
}

impl From<Vec<String>> for FlagValue {
    fn from(l: Vec<String>) -> Self {
        FlagValue::StringList(l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_is_raw_form() {
        assert_eq!(FlagValue::Uint(31).to_string(), "31");
        assert_eq!(FlagValue::Int(-4).to_string(), "-4");
        assert_eq!(FlagValue::Bool(true).to_string(), "true");
        assert_eq!(FlagValue::Float(1.5).to_string(), "1.5");
        assert_eq!(FlagValue::from("/tmp").to_string(), "/tmp");
        assert_eq!(FlagValue::Path(PathBuf::from("/var/log")).to_string(), "/var/log");
        assert_eq!(
            FlagValue::StringList(vec!["a".into(), "b".into()]).to_string(),
            "a,b"
        );
    }

    #[test]
    fn test_type_checks() {
        assert_eq!(FlagValue::Uint(1).as_u64(), Some(1));
        assert_eq!(FlagValue::Uint(1).as_i64(), None);
        assert_eq!(FlagValue::from("x").as_str(), Some("x"));
        assert_eq!(FlagValue::from("x").as_path(), None);
        assert_eq!(FlagValue::Bool(false).type_name(), "bool");
        assert_eq!(FlagValue::StringList(vec![]).type_name(), "string slice");
    }

    #[test]
    fn test_format_duration_go_style() {
        assert_eq!(format_duration(Duration::ZERO), "0s");
        assert_eq!(format_duration(Duration::from_nanos(42)), "42ns");
        assert_eq!(format_duration(Duration::from_micros(1)), "1µs");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m0s");
    }
}
