use std::fmt;
use std::str::FromStr;

/// The column type a [`Value`] is tagged with. Fixed to the three scalar
/// kinds the table model supports — there is no null variant, only each
/// type's zero value (`""`, `0`, `0.0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Int,
    Real,
}

impl ColumnType {
    pub fn zero_value(self) -> Value {
        match self {
            ColumnType::Text => Value::Text(String::new()),
            ColumnType::Int => Value::Int(0),
            ColumnType::Real => Value::Real(0.0),
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Text => "TEXT",
            ColumnType::Int => "INT",
            ColumnType::Real => "REAL",
        };
        f.write_str(s)
    }
}

impl FromStr for ColumnType {
    type Err = std::convert::Infallible;

    /// Unknown type names default to `TEXT` per the CSV schema header rule;
    /// this is intentionally infallible.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "INT" => ColumnType::Int,
            "REAL" => ColumnType::Real,
            _ => ColumnType::Text,
        })
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Real(f64),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Text(_) => ColumnType::Text,
            Value::Int(_) => ColumnType::Int,
            Value::Real(_) => ColumnType::Real,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Real(_))
    }

    /// Numeric value of this cell, for arithmetic/comparison. `TEXT` has no
    /// numeric coercion here — callers that need text truthiness use
    /// [`Value::is_truthy`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// Boolean coercion per the expression language's truthiness rule:
    /// `0`/`0.0`/`""` are false, everything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.is_empty(),
            Value::Int(v) => *v != 0,
            Value::Real(v) => *v != 0.0,
        }
    }

    /// `BLANK(x)`: true iff this is the type-default / absent value.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Text(s) => s.is_empty(),
            Value::Int(v) => *v == 0,
            Value::Real(v) => *v == 0.0,
        }
    }

    /// Stringification used by `APPEND`, text concatenation, and CSV
    /// serialization of non-REAL cells.
    pub fn display_string(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Int(v) => v.to_string(),
            Value::Real(v) => format_real(*v),
        }
    }

    /// Coerce this value to `ty`, following the CSV ingestion rules
    /// (§4.1/§4.3): REAL strips `$`/`,` before parsing and defaults to
    /// `0.0` on failure; INT defaults to `0` on failure; `TypeMismatch` is
    /// never raised here by design — callers needing a hard validation
    /// error (rule-engine field typing) reparse with [`Value::parse_strict`].
    pub fn coerce(&self, ty: ColumnType) -> Value {
        match ty {
            ColumnType::Text => Value::Text(self.display_string()),
            ColumnType::Int => Value::Int(match self {
                Value::Int(v) => *v,
                Value::Real(v) => *v as i64,
                Value::Text(s) => s.trim().parse::<i64>().unwrap_or(0),
            }),
            ColumnType::Real => Value::Real(match self {
                Value::Int(v) => *v as f64,
                Value::Real(v) => *v,
                Value::Text(s) => parse_real_lenient(s).unwrap_or(0.0),
            }),
        }
    }

    /// Strict parse used when ingesting user-supplied row fields through the
    /// rules engine: a non-parsable INT/REAL string is a validation error
    /// rather than silently defaulting to zero.
    pub fn parse_strict(text: &str, ty: ColumnType) -> Result<Value, ()> {
        match ty {
            ColumnType::Text => Ok(Value::Text(text.to_string())),
            ColumnType::Int => text.trim().parse::<i64>().map(Value::Int).map_err(|_| ()),
            ColumnType::Real => parse_real_lenient(text).map(Value::Real).ok_or(()),
        }
    }
}

/// REAL cells render with exactly one fractional digit on serialization.
pub fn format_real(v: f64) -> String {
    format!("{:.1}", v)
}

/// Strip `$` and `,` (thousands separators / currency marks) before parsing
/// a REAL, per §4.1's row-parsing rule.
pub fn parse_real_lenient(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_defaults_unknown_to_text() {
        assert_eq!("FROBNICATE".parse::<ColumnType>().unwrap(), ColumnType::Text);
        assert_eq!("int".parse::<ColumnType>().unwrap(), ColumnType::Int);
        assert_eq!("Real".parse::<ColumnType>().unwrap(), ColumnType::Real);
    }

    #[test]
    fn real_formats_with_one_fractional_digit() {
        assert_eq!(format_real(110.55), "110.6");
        assert_eq!(format_real(3.0), "3.0");
    }

    #[test]
    fn lenient_real_strips_currency_formatting() {
        assert_eq!(parse_real_lenient("$1,234.50"), Some(1234.50));
        assert_eq!(parse_real_lenient("garbage"), None);
    }

    #[test]
    fn blank_matches_type_default() {
        assert!(Value::Text(String::new()).is_blank());
        assert!(Value::Int(0).is_blank());
        assert!(!Value::Int(1).is_blank());
    }
}
