use rust_decimal::Decimal;

use crate::normalize::{clean_number, normalize_detected_text, DecimalStyle};
use crate::record::{InvoiceRecord, Scalar};

/// Reason reported when an extracted amount cannot be traced to the
/// detected text. Kept byte-for-byte for ledger compatibility.
pub const REASON_TEXT_MISMATCH: &str = "No match AI vs Rekognition";
/// Reason reported when the VAT arithmetic does not hold.
pub const REASON_VAT_MATH: &str = "VAT math validation failed";

/// Absolute tolerance, in currency units, absorbing rounding noise in the
/// recomputed VAT.
const VAT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Verdicts of the two independent checks over one extracted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub presence_ok: bool,
    pub arithmetic_ok: bool,
}

impl ValidationOutcome {
    /// Run both validators. They are independent pure predicates over the
    /// same record; neither short-circuits the other.
    pub fn check(record: &InvoiceRecord, detected_text: Option<&str>, style: DecimalStyle) -> Self {
        Self {
            presence_ok: amounts_in_detected_text(record, detected_text, style),
            arithmetic_ok: vat_math_consistent(record),
        }
    }

    pub fn accepted(&self) -> bool {
        self.presence_ok && self.arithmetic_ok
    }

    /// Rejection reason; the text-mismatch reason wins when both checks fail.
    pub fn reason(&self) -> Option<&'static str> {
        if !self.presence_ok {
            Some(REASON_TEXT_MISMATCH)
        } else if !self.arithmetic_ok {
            Some(REASON_VAT_MATH)
        } else {
            None
        }
    }
}

/// Guard against hallucinated amounts: `total` and a nonzero `vat` must
/// literally occur in the detected text, either in canonicalized form or as
/// the raw lexical value. With no detected text there is nothing to
/// cross-check and the record passes.
pub fn amounts_in_detected_text(
    record: &InvoiceRecord,
    detected_text: Option<&str>,
    style: DecimalStyle,
) -> bool {
    let Some(raw) = detected_text.filter(|t| !t.is_empty()) else {
        return true;
    };
    let normalized = normalize_detected_text(raw, style);

    if record.total.has_value() && !traceable(&record.total, raw, &normalized) {
        return false;
    }

    // A vat that does not coerce is the arithmetic check's problem, not ours.
    let vat_positive = record
        .vat
        .to_decimal()
        .is_some_and(|v| v > Decimal::ZERO);
    if vat_positive && !traceable(&record.vat, raw, &normalized) {
        return false;
    }

    true
}

/// Two-stage substring check: canonical form against normalized text first,
/// then the raw lexical form against the unmodified text.
fn traceable(value: &Scalar, raw: &str, normalized: &str) -> bool {
    let cleaned = clean_number(value).replace(',', "");
    normalized.contains(&cleaned) || raw.contains(&value.to_string())
}

/// Verify internal VAT consistency: recompute the VAT implied by total and
/// rate and compare within tolerance. Any value that fails numeric coercion
/// fails the whole check (fail-closed).
pub fn vat_math_consistent(record: &InvoiceRecord) -> bool {
    let (Some(total), Some(vat), Some(rate_percent)) = (
        record.total.to_decimal(),
        record.vat.to_decimal(),
        record.vat_rate.to_decimal(),
    ) else {
        return false;
    };

    if rate_percent.is_zero() {
        // No stated rate: only a zero VAT is consistent.
        return vat.is_zero();
    }

    let rate = rate_percent / Decimal::ONE_HUNDRED;
    let divisor = Decimal::ONE + rate;
    if divisor.is_zero() {
        return false;
    }
    let Some(expected) = total
        .checked_div(divisor)
        .and_then(|net| net.checked_mul(rate))
    else {
        return false;
    };

    (expected - vat).abs() < VAT_TOLERANCE
}
