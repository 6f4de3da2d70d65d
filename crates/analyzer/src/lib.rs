//! # Refine Analyzer
//!
//! Orchestrates the full analysis pipeline per unit and across a project.
//!
//! ## Pipeline
//!
//! ```text
//! Unit
//!     │  PENDING -> CHUNKING
//!     ├──> Chunker (fingerprint, split, overlap)
//!     │  -> DISPATCHING
//!     ├──> Worker pool ──> Dispatcher per chunk (cache / model / retry)
//!     │  -> AGGREGATING
//!     └──> Aggregator (translate, dedup, sort)
//!            └─> AnalysisResult {COMPLETE | PARTIAL | FAILED}
//! ```
//!
//! Chunk failures never abort sibling chunks; unit failures never abort
//! sibling units. Completion order is unconstrained; the aggregator
//! re-orders by chunk index, so output is deterministic regardless.

mod aggregate;
mod cancel;
mod error;
mod pipeline;
mod scanner;
mod stats;

pub use aggregate::{merge, ChunkOutcome};
pub use cancel::CancelToken;
pub use error::{AnalyzerError, Result};
pub use pipeline::Pipeline;
pub use scanner::UnitScanner;
pub use stats::AnalysisStats;
