use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;

/// A numeric-or-text value exactly as the extraction model returned it.
///
/// The model is instructed to use numbers for amounts, but real responses
/// mix in strings like `"720.00"` or `"1.234,56"`. The lexical form is kept
/// because the cross-check against detected text compares raw substrings.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(Decimal),
    Text(String),
}

impl Scalar {
    pub fn zero() -> Self {
        Scalar::Number(Decimal::ZERO)
    }

    /// Strict numeric coercion: numbers pass through, text must parse as a
    /// plain decimal. Locale-formatted text (`"1.234,56"`) stays `None`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Number(d) => Some(*d),
            Scalar::Text(s) => Decimal::from_str(s.trim()).ok(),
        }
    }

    /// The model uses 0 for fields it could not find; zero and empty text
    /// are therefore treated as absent.
    pub fn has_value(&self) -> bool {
        match self {
            Scalar::Number(d) => !d.is_zero(),
            Scalar::Text(s) => !s.is_empty(),
        }
    }
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::zero()
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(d) => write!(f, "{d}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScalarVisitor;

        impl Visitor<'_> for ScalarVisitor {
            type Value = Scalar;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or a numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
                Ok(Scalar::Number(Decimal::from(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
                Ok(Scalar::Number(Decimal::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
                Decimal::try_from(v).map(Scalar::Number).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
                Ok(Scalar::Text(v.to_string()))
            }

            // JSON null: the field was reported but empty. Coercion later
            // fails closed on it.
            fn visit_unit<E: de::Error>(self) -> Result<Scalar, E> {
                Ok(Scalar::Text(String::new()))
            }
        }

        deserializer.deserialize_any(ScalarVisitor)
    }
}

impl Serialize for Scalar {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Scalar::Number(d) if d.is_integer() => match d.to_i64() {
                Some(v) => serializer.serialize_i64(v),
                None => serializer.collect_str(d),
            },
            Scalar::Number(d) => match d.to_f64() {
                Some(v) => serializer.serialize_f64(v),
                None => serializer.collect_str(d),
            },
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// One extracted invoice as the model returned it, untrusted until both
/// validators have seen it. Lives for a single processing pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRecord {
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub total: Scalar,
    #[serde(default)]
    pub vat: Scalar,
    #[serde(default)]
    pub vat_rate: Scalar,
}

fn default_vendor() -> String {
    "Unknown".to_string()
}

impl InvoiceRecord {
    /// Parse the model's JSON payload. A wrong shape is a processing error
    /// for the caller to surface, never a validation rejection.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Vendor with the row delimiter replaced, safe to embed in a CSV row.
    pub fn sanitized_vendor(&self) -> String {
        self.vendor.replace(',', " ")
    }

    /// The extracted date in canonical `YYYY-MM-DD` form, falling back to
    /// today when the field is absent or unparseable.
    pub fn resolved_date(&self) -> String {
        self.date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%Y-%m-%d")
            .to_string()
    }
}
