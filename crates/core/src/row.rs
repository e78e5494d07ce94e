use chrono::Local;

use crate::record::InvoiceRecord;

/// Header of the ledger table every row below must line up with.
pub const CSV_HEADER: &str = "Date,Vendor,Total,VAT,ProcessedAt";

/// Marker placed in the first field of a rejected row.
pub const ERROR_MARKER: &str = "ERROR";

fn processed_at() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// `date,vendor,total,vat,processedAt` for an accepted record. The vendor is
/// sanitized so the row always carries exactly five fields.
pub fn success_row(record: &InvoiceRecord) -> String {
    format!(
        "{},{},{},{},{}",
        record.resolved_date(),
        record.sanitized_vendor(),
        record.total,
        record.vat,
        processed_at()
    )
}

/// `ERROR,AI_ERROR - <reason>,0,0,processedAt` for a rejected extraction.
pub fn error_row(reason: &str) -> String {
    format!("{ERROR_MARKER},AI_ERROR - {reason},0,0,{}", processed_at())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn record(value: serde_json::Value) -> InvoiceRecord {
        serde_json::from_value(value).unwrap()
    }

    fn assert_timestamp(field: &str) {
        assert!(
            NaiveDateTime::parse_from_str(field, "%Y-%m-%dT%H:%M:%S%.f").is_ok(),
            "not an ISO timestamp: {field}"
        );
    }

    #[test]
    fn success_row_has_five_fields_in_order() {
        let r = record(json!({
            "vendor": "Tech Corp Inc.",
            "date": "2024-01-15",
            "total": 720,
            "vat": 120,
            "vat_rate": 20
        }));
        let row = success_row(&r);
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "2024-01-15");
        assert_eq!(fields[1], "Tech Corp Inc.");
        assert_eq!(fields[2], "720");
        assert_eq!(fields[3], "120");
        assert_timestamp(fields[4]);
    }

    #[test]
    fn vendor_commas_cannot_break_the_row() {
        let r = record(json!({"vendor": "Acme, Inc.", "total": 10, "vat": 0, "vat_rate": 0}));
        let row = success_row(&r);
        assert_eq!(row.split(',').count(), 5);
        assert_eq!(row.split(',').nth(1).unwrap(), "Acme  Inc.");
    }

    #[test]
    fn error_row_shape() {
        let row = error_row("VAT math validation failed");
        let fields: Vec<&str> = row.split(',').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0], "ERROR");
        assert_eq!(fields[1], "AI_ERROR - VAT math validation failed");
        assert_eq!(fields[2], "0");
        assert_eq!(fields[3], "0");
        assert_timestamp(fields[4]);
    }

    #[test]
    fn header_matches_row_width() {
        assert_eq!(CSV_HEADER.split(',').count(), 5);
    }
}
