use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

/// Numeric cells are always held as plain `f64`, whatever their textual
/// form in the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Self::Number(number),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Number(n) => Some(format_number(*n)),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "-"),
            Self::Number(n) => write!(f, "{}", format_number(*n)),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::CellValue;

    #[test]
    fn integers_are_held_as_floats() {
        let value = CellValue::parse(" 1200 ");
        assert_eq!(value, CellValue::Number(1200.0));
        let json = serde_json::to_string(&value).expect("serialize");
        assert_eq!(json, "1200.0");
    }

    #[test]
    fn empty_and_text_cells() {
        assert!(CellValue::parse("   ").is_null());
        assert_eq!(
            CellValue::parse("NO0010096985"),
            CellValue::Text("NO0010096985".to_string())
        );
        assert_eq!(
            serde_json::to_string(&CellValue::Null).expect("serialize"),
            "null"
        );
    }

    #[test]
    fn numeric_keys_keep_their_integer_form() {
        assert_eq!(
            CellValue::parse("950123456").as_key().as_deref(),
            Some("950123456")
        );
        assert_eq!(CellValue::parse("0.25").as_key().as_deref(), Some("0.25"));
    }
}
