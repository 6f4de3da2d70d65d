use crate::error::InferenceError;
use async_trait::async_trait;
use refine_protocol::{AnalysisFocus, Finding};

/// One inference request: the code payload of a single chunk plus what to
/// look for. Line numbers in the payload start at 1; returned findings are
/// chunk-local and translated to unit coordinates by the aggregator.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub code: String,
    pub language: String,
    pub focus: AnalysisFocus,
    /// The payload came from a forced oversized chunk and may have been
    /// truncated to the relaxed limit
    pub oversized: bool,
}

/// The external model capability, treated as opaque: prompt payload in,
/// findings out, or an error classified transient or fatal.
///
/// Implementations own their wire format. They must be cheap to clone
/// behind an `Arc` and safe to call from many workers at once.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<Vec<Finding>, InferenceError>;

    /// Stable identity of the model (name + version); participates in
    /// fingerprints and cache entry metadata.
    fn model_id(&self) -> &str;
}
