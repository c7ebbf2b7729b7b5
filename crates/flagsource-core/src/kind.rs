//! Flag kinds
//!
//! A [`FlagKind`] describes how one family of flags turns raw strings into
//! typed values and back. The resolution engine in [`crate::flag`] is generic
//! over this trait, so adding a kind never touches the engine.

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::value::{format_duration, FlagValue};

/// Why a raw string could not be coerced to a flag's type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoerceError {
    /// The input is malformed for the target type
    #[error("invalid syntax")]
    Syntax,
    /// The input is well formed but does not fit the target type
    #[error("value out of range")]
    Range,
    /// The configured numeric base is not 0 or 2..=36
    #[error("invalid base {0}")]
    Base(u32),
    /// Durations cannot be negative
    #[error("negative durations are not supported")]
    Negative,
    /// A duration component has a missing or unknown unit
    #[error("{0}")]
    Unit(String),
}

/// Parsing and rendering rules for one family of flags
pub trait FlagKind: Clone + fmt::Debug + 'static {
    /// The concrete value type held by flags of this kind
    type Value: Clone + fmt::Debug + Default + Into<FlagValue> + 'static;

    /// Short name used in error messages ("uint", "path", ...)
    fn type_name(&self) -> &'static str;

    /// Coerce a raw external string
    fn parse(&self, raw: &str) -> Result<Self::Value, CoerceError>;

    /// Render the current value for display. Value-less kinds return "".
    fn format(&self, value: &Self::Value) -> String;

    /// Render a value as a raw string that [`FlagKind::parse`] reads back
    fn render(&self, value: &Self::Value) -> String {
        Self::to_value(value).to_string()
    }

    /// Render a default value for help output
    fn default_text(&self, value: &Self::Value) -> String {
        self.format(value)
    }

    /// Convert a tagged cell value back to this kind's type
    fn from_value(value: &FlagValue) -> Option<Self::Value>;

    /// Whether the flag consumes an argument on the command line
    fn takes_value(&self) -> bool {
        true
    }

    /// Store a typed value in a tagged cell
    fn to_value(value: &Self::Value) -> FlagValue {
        value.clone().into()
    }
}

/// Quoted rendering shared by string-like kinds; empty stays empty
fn quoted(s: &str) -> String {
    if s.is_empty() {
        String::new()
    } else {
        format!("{:?}", s)
    }
}

/// Free-form string flags
#[derive(Debug, Clone, Copy, Default)]
pub struct StringKind;

impl FlagKind for StringKind {
    type Value = String;

    fn type_name(&self) -> &'static str {
        "string"
    }

    fn parse(&self, raw: &str) -> Result<String, CoerceError> {
        Ok(raw.to_string())
    }

    fn format(&self, value: &String) -> String {
        value.clone()
    }

    fn default_text(&self, value: &String) -> String {
        quoted(value)
    }

    fn from_value(value: &FlagValue) -> Option<String> {
        value.as_str().map(str::to_string)
    }
}

/// Filesystem path flags. Coercion is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathKind;

impl FlagKind for PathKind {
    type Value = PathBuf;

    fn type_name(&self) -> &'static str {
        "path"
    }

    fn parse(&self, raw: &str) -> Result<PathBuf, CoerceError> {
        Ok(PathBuf::from(raw))
    }

    fn format(&self, value: &PathBuf) -> String {
        value.display().to_string()
    }

    fn default_text(&self, value: &PathBuf) -> String {
        quoted(&value.display().to_string())
    }

    fn from_value(value: &FlagValue) -> Option<PathBuf> {
        value.as_path().map(PathBuf::from)
    }
}

/// Boolean switches; they take no value on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolKind;

impl FlagKind for BoolKind {
    type Value = bool;

    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn parse(&self, raw: &str) -> Result<bool, CoerceError> {
        parse_bool(raw)
    }

    fn format(&self, _value: &bool) -> String {
        String::new()
    }

    fn default_text(&self, value: &bool) -> String {
        value.to_string()
    }

    fn from_value(value: &FlagValue) -> Option<bool> {
        value.as_bool()
    }

    fn takes_value(&self) -> bool {
        false
    }
}

/// Signed 64-bit integer flags
#[derive(Debug, Clone, Copy, Default)]
pub struct IntKind {
    /// Numeric base; 0 detects it from the prefix
    pub base: u32,
}

impl FlagKind for IntKind {
    type Value = i64;

    fn type_name(&self) -> &'static str {
        "int"
    }

    fn parse(&self, raw: &str) -> Result<i64, CoerceError> {
        parse_signed(raw, self.base)
    }

    fn format(&self, value: &i64) -> String {
        value.to_string()
    }

    fn from_value(value: &FlagValue) -> Option<i64> {
        value.as_i64()
    }
}

/// Unsigned 64-bit integer flags
#[derive(Debug, Clone, Copy, Default)]
pub struct UintKind {
    /// Numeric base; 0 detects it from the prefix
    pub base: u32,
}

impl FlagKind for UintKind {
    type Value = u64;

    fn type_name(&self) -> &'static str {
        "uint"
    }

    fn parse(&self, raw: &str) -> Result<u64, CoerceError> {
        parse_unsigned(raw, self.base)
    }

    fn format(&self, value: &u64) -> String {
        value.to_string()
    }

    fn from_value(value: &FlagValue) -> Option<u64> {
        value.as_u64()
    }
}

/// 64-bit floating point flags
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatKind;

impl FlagKind for FloatKind {
    type Value = f64;

    fn type_name(&self) -> &'static str {
        "float"
    }

    fn parse(&self, raw: &str) -> Result<f64, CoerceError> {
        raw.parse().map_err(|_| CoerceError::Syntax)
    }

    fn format(&self, value: &f64) -> String {
        value.to_string()
    }

    fn from_value(value: &FlagValue) -> Option<f64> {
        value.as_f64()
    }
}

/// Time span flags written as `1h30m`, `250ms`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationKind;

impl FlagKind for DurationKind {
    type Value = Duration;

    fn type_name(&self) -> &'static str {
        "duration"
    }

    fn parse(&self, raw: &str) -> Result<Duration, CoerceError> {
        parse_duration(raw)
    }

    fn format(&self, value: &Duration) -> String {
        format_duration(*value)
    }

    fn from_value(value: &FlagValue) -> Option<Duration> {
        value.as_duration()
    }
}

/// Lists of strings split on a separator
#[derive(Debug, Clone, Copy)]
pub struct StringSliceKind {
    /// Element separator for external values
    pub separator: char,
}

impl Default for StringSliceKind {
    fn default() -> Self {
        Self { separator: ',' }
    }
}

impl FlagKind for StringSliceKind {
    type Value = Vec<String>;

    fn type_name(&self) -> &'static str {
        "string slice"
    }

    fn parse(&self, raw: &str) -> Result<Vec<String>, CoerceError> {
        Ok(raw
            .split(self.separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn format(&self, value: &Vec<String>) -> String {
        value.join(&self.separator.to_string())
    }

    fn render(&self, value: &Vec<String>) -> String {
        self.format(value)
    }

    fn default_text(&self, value: &Vec<String>) -> String {
        value
            .iter()
            .map(|s| format!("{:?}", s))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn from_value(value: &FlagValue) -> Option<Vec<String>> {
        value.as_list().map(<[String]>::to_vec)
    }
}

/// Parse a boolean with the spellings Go's `strconv.ParseBool` accepts
pub fn parse_bool(raw: &str) -> Result<bool, CoerceError> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(CoerceError::Syntax),
    }
}

/// Parse an unsigned integer in `base`.
///
/// Base 0 detects `0x`, `0o`, `0b` and leading-`0` octal prefixes and allows
/// `_` between digits. Explicit bases must be within 2..=36 and take bare
/// digits only.
pub fn parse_unsigned(raw: &str, base: u32) -> Result<u64, CoerceError> {
    if raw.is_empty() {
        return Err(CoerceError::Syntax);
    }

    let (digits, radix, prefixed) = match base {
        0 => split_prefix(raw),
        2..=36 => (raw, base, false),
        _ => return Err(CoerceError::Base(base)),
    };

    let digits: Cow<'_, str> = if base == 0 && digits.contains('_') {
        if digits.ends_with('_') || digits.contains("__") || (digits.starts_with('_') && !prefixed)
        {
            return Err(CoerceError::Syntax);
        }
        Cow::Owned(digits.replace('_', ""))
    } else {
        Cow::Borrowed(digits)
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(CoerceError::Syntax);
    }

    // Only overflow is left once every character is a valid digit
    u64::from_str_radix(&digits, radix).map_err(|_| CoerceError::Range)
}

fn split_prefix(raw: &str) -> (&str, u32, bool) {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        match bytes[1] {
            b'x' | b'X' => return (&raw[2..], 16, true),
            b'o' | b'O' => return (&raw[2..], 8, true),
            b'b' | b'B' => return (&raw[2..], 2, true),
            _ => return (&raw[1..], 8, true),
        }
    }
    (raw, 10, false)
}

/// Parse a signed integer in `base`, with an optional leading sign
pub fn parse_signed(raw: &str, base: u32) -> Result<i64, CoerceError> {
    let (negative, magnitude) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let magnitude = parse_unsigned(magnitude, base)?;
    if negative {
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(CoerceError::Range);
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| CoerceError::Range)
    }
}

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parse a duration such as `300ms`, `1.5h` or `2h45m`
pub fn parse_duration(raw: &str) -> Result<Duration, CoerceError> {
    let mut rest = raw;
    let mut negative = false;
    if let Some(r) = rest.strip_prefix('-') {
        negative = true;
        rest = r;
    } else if let Some(r) = rest.strip_prefix('+') {
        rest = r;
    }

    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(CoerceError::Syntax);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after_int) = rest.split_at(int_len);

        let (frac_part, after_num) = match after_int.strip_prefix('.') {
            Some(after_dot) => {
                let frac_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
                after_dot.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(CoerceError::Syntax);
        }

        let unit_len = after_num
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after_num.len());
        let (unit, remaining) = after_num.split_at(unit_len);
        if unit.is_empty() {
            return Err(CoerceError::Unit(format!(
                "missing unit in duration {:?}",
                raw
            )));
        }
        let scale = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| {
                CoerceError::Unit(format!("unknown unit {:?} in duration {:?}", unit, raw))
            })?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| CoerceError::Range)?
        };
        // Digits past nanosecond precision of the largest unit carry nothing
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        let frac_nanos = if frac_digits.is_empty() {
            0
        } else {
            let numerator: u128 = frac_digits.parse().map_err(|_| CoerceError::Syntax)?;
            numerator * scale / 10u128.pow(frac_digits.len() as u32)
        };

        total = whole
            .checked_mul(scale)
            .and_then(|n| n.checked_add(frac_nanos))
            .and_then(|n| n.checked_add(total))
            .ok_or(CoerceError::Range)?;
        rest = remaining;
    }

    if negative && total > 0 {
        return Err(CoerceError::Negative);
    }
    let nanos = u64::try_from(total).map_err(|_| CoerceError::Range)?;
    Ok(Duration::from_nanos(nanos))
}
