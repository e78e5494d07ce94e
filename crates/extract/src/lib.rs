pub mod detector;
pub mod oracle;
pub mod pipeline;

pub use detector::{join_lines, DetectError, MockDetector, TextDetector};
pub use oracle::{InvoiceOracle, MockOracle, OpenAiOracle, OracleConfig, OracleError};
pub use pipeline::{ExtractRequest, InvoicePipeline, Outcome, PipelineError, Processed};
