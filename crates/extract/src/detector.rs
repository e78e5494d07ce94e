use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("text detection failed: {0}")]
    Backend(String),
}

/// Abstraction over the line-level text detection service that supplies the
/// cross-check text. Given an opaque image reference (object key, path),
/// implementations return the detected lines in reading order.
pub trait TextDetector: Send + Sync {
    fn detect_lines(
        &self,
        image_ref: &str,
    ) -> impl Future<Output = Result<Vec<String>, DetectError>> + Send;
}

/// Detected lines joined the way the pipeline expects its raw text.
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

/// Returns pre-set lines, standing in for the detection service in tests.
pub struct MockDetector {
    lines: Vec<String>,
}

impl MockDetector {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect() }
    }
}

impl TextDetector for MockDetector {
    async fn detect_lines(&self, _image_ref: &str) -> Result<Vec<String>, DetectError> {
        Ok(self.lines.clone())
    }
}
