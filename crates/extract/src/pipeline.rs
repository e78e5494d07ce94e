use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use facit_core::{error_row, success_row, DecimalStyle, InvoiceRecord, ValidationOutcome};

use crate::oracle::{InvoiceOracle, OracleError};

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither text nor image was supplied; rejected before any oracle call.
    #[error("No text or image provided")]
    NoInput,
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// One processing request: detected text and/or an encoded image.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractRequest {
    pub text: Option<String>,
    pub image_base64: Option<String>,
}

/// Verdict on one processed invoice. Rejection is a result, not an error;
/// the ledger still receives a well-formed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected { reason: &'static str },
}

/// A completed pipeline pass, carrying the verdict and the ready-to-append
/// ledger row alongside the parsed record.
#[derive(Debug, Clone)]
pub struct Processed {
    pub record: InvoiceRecord,
    pub outcome: Outcome,
    pub csv_row: String,
}

/// Orchestrates: input check → oracle call → both validators → row.
pub struct InvoicePipeline<O: InvoiceOracle> {
    oracle: O,
    decimal_style: DecimalStyle,
}

impl<O: InvoiceOracle> InvoicePipeline<O> {
    pub fn new(oracle: O, decimal_style: DecimalStyle) -> Self {
        Self { oracle, decimal_style }
    }

    /// Run one request through extraction and validation. Dropping the
    /// returned future abandons the in-flight oracle call, so a cancelled
    /// request can never commit a partial result.
    pub async fn process(&self, request: &ExtractRequest) -> Result<Processed, PipelineError> {
        let text = request.text.as_deref().filter(|t| !t.is_empty());
        let image = request.image_base64.as_deref().filter(|i| !i.is_empty());
        if text.is_none() && image.is_none() {
            return Err(PipelineError::NoInput);
        }

        let record = self.oracle.extract(text, image).await?;
        debug!(?record, "oracle returned record");

        let verdict = ValidationOutcome::check(&record, text, self.decimal_style);
        match verdict.reason() {
            None => {
                info!(vendor = %record.vendor, "invoice accepted");
                let csv_row = success_row(&record);
                Ok(Processed { record, outcome: Outcome::Accepted, csv_row })
            }
            Some(reason) => {
                warn!(
                    reason,
                    presence_ok = verdict.presence_ok,
                    arithmetic_ok = verdict.arithmetic_ok,
                    "invoice rejected"
                );
                Ok(Processed {
                    record,
                    outcome: Outcome::Rejected { reason },
                    csv_row: error_row(reason),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::MockOracle;
    use facit_core::{REASON_TEXT_MISMATCH, REASON_VAT_MATH};
    use serde_json::json;

    const INVOICE_TEXT: &str = "INVOICE #1001\n\
        Date: 2024-01-15\n\
        Vendor: Tech Corp Inc.\n\
        Item 1: Server hosting ... 500.00\n\
        Item 2: Support .......... 100.00\n\
        Subtotal: 600.00\n\
        VAT (20%): 120.00\n\
        TOTAL: 720.00";

    fn oracle_record(value: serde_json::Value) -> InvoiceRecord {
        serde_json::from_value(value).unwrap()
    }

    fn pipeline(record: serde_json::Value) -> InvoicePipeline<MockOracle> {
        InvoicePipeline::new(
            MockOracle::returning(oracle_record(record)),
            DecimalStyle::default(),
        )
    }

    fn text_request(text: &str) -> ExtractRequest {
        ExtractRequest { text: Some(text.to_string()), image_base64: None }
    }

    #[tokio::test]
    async fn consistent_extraction_is_accepted() {
        let p = pipeline(json!({
            "vendor": "Tech Corp Inc.",
            "date": "2024-01-15",
            "total": 720,
            "vat": 120,
            "vat_rate": 20
        }));
        let processed = p.process(&text_request(INVOICE_TEXT)).await.unwrap();

        assert_eq!(processed.outcome, Outcome::Accepted);
        assert!(processed.csv_row.starts_with("2024-01-15,Tech Corp Inc.,720,120,"));
        assert_eq!(processed.csv_row.split(',').count(), 5);
    }

    #[tokio::test]
    async fn bad_vat_math_is_rejected() {
        let p = pipeline(json!({
            "vendor": "Tech Corp Inc.",
            "date": "2024-01-15",
            "total": 720,
            "vat": 50,
            "vat_rate": 20
        }));
        let processed = p.process(&text_request(INVOICE_TEXT)).await.unwrap();

        assert_eq!(processed.outcome, Outcome::Rejected { reason: REASON_VAT_MATH });
        assert!(processed
            .csv_row
            .starts_with("ERROR,AI_ERROR - VAT math validation failed,0,0,"));
    }

    #[tokio::test]
    async fn hallucinated_total_is_rejected_with_mismatch_reason() {
        let p = pipeline(json!({
            "vendor": "Tech Corp Inc.",
            "total": 999,
            "vat": 0,
            "vat_rate": 0
        }));
        let processed = p.process(&text_request(INVOICE_TEXT)).await.unwrap();

        assert_eq!(
            processed.outcome,
            Outcome::Rejected { reason: REASON_TEXT_MISMATCH }
        );
    }

    #[tokio::test]
    async fn image_only_request_skips_the_text_cross_check() {
        let p = pipeline(json!({
            "vendor": "Tech Corp Inc.",
            "total": 999,
            "vat": 0,
            "vat_rate": 0
        }));
        let request = ExtractRequest {
            text: None,
            image_base64: Some("aGVsbG8=".to_string()),
        };
        let processed = p.process(&request).await.unwrap();
        assert_eq!(processed.outcome, Outcome::Accepted);
    }

    #[tokio::test]
    async fn empty_request_never_reaches_the_oracle() {
        // The failing mock proves the oracle is not called: the error we get
        // back is NoInput, not the oracle's.
        let p = InvoicePipeline::new(
            MockOracle::failing("oracle must not be called"),
            DecimalStyle::default(),
        );
        let err = p.process(&ExtractRequest::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoInput));

        let blank = ExtractRequest {
            text: Some(String::new()),
            image_base64: Some(String::new()),
        };
        let err = p.process(&blank).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoInput));
    }

    #[tokio::test]
    async fn oracle_failure_propagates_as_processing_error() {
        let p = InvoicePipeline::new(
            MockOracle::failing("connection refused"),
            DecimalStyle::default(),
        );
        let err = p.process(&text_request(INVOICE_TEXT)).await.unwrap_err();
        assert!(matches!(err, PipelineError::Oracle(OracleError::Malformed(_))));
    }

    #[tokio::test]
    async fn defaults_apply_before_validation() {
        // Oracle found nothing but the vendor; zero amounts are consistent
        // and nothing needs tracing to the text.
        let p = pipeline(json!({"vendor": "Corner Cafe"}));
        let processed = p.process(&text_request("a blurry receipt")).await.unwrap();
        assert_eq!(processed.outcome, Outcome::Accepted);
        assert!(processed.csv_row.contains(",Corner Cafe,0,0,"));
    }
}
