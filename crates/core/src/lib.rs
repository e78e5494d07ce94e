pub mod normalize;
pub mod record;
pub mod row;
pub mod validate;

pub use normalize::{clean_number, normalize_detected_text, DecimalStyle};
pub use record::{InvoiceRecord, Scalar};
pub use row::{error_row, success_row, CSV_HEADER};
pub use validate::{
    amounts_in_detected_text, vat_math_consistent, ValidationOutcome, REASON_TEXT_MISMATCH,
    REASON_VAT_MATH,
};
