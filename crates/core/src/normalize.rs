use std::str::FromStr;

use crate::record::Scalar;

/// Decimal-separator convention of the detected (OCR) text.
///
/// Which separator marks the decimals decides how detected text is
/// canonicalized before substring comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalStyle {
    /// Period groups thousands, comma marks decimals (`1.234,56`).
    #[default]
    CommaDecimal,
    /// Comma groups thousands, period marks decimals (`1,234.56`).
    PointDecimal,
}

impl FromStr for DecimalStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "comma" => Ok(DecimalStyle::CommaDecimal),
            "point" => Ok(DecimalStyle::PointDecimal),
            other => Err(format!("Unknown decimal style: '{other}'")),
        }
    }
}

/// Reduce a scalar to digits and separators so it can be compared by
/// substring against detected text. Numeric input already has a canonical
/// form; text keeps its comma/period arrangement untouched.
pub fn clean_number(value: &Scalar) -> String {
    match value {
        Scalar::Number(_) => value.to_string(),
        Scalar::Text(s) => s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .collect(),
    }
}

/// Canonicalize detected text to period-decimal, separator-free form.
pub fn normalize_detected_text(text: &str, style: DecimalStyle) -> String {
    match style {
        DecimalStyle::CommaDecimal => text.replace('.', "").replace(',', "."),
        DecimalStyle::PointDecimal => text.replace(',', ""),
    }
}
