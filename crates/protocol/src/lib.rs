//! # Refine Protocol
//!
//! Shared value types for the analysis pipeline: findings, per-unit results,
//! fingerprints, and the analysis configuration that participates in them.
//!
//! Everything in this crate is a plain value object. Identity lives in the
//! content, not in handles: two findings with the same category, severity,
//! line range, and message are the same finding.

mod config;
mod fingerprint;
mod finding;
mod result;

pub use config::{AnalysisConfig, AnalysisFocus};
pub use fingerprint::{fingerprint_chunk, fingerprint_unit, Fingerprint};
pub use finding::{Category, Finding, LineRange, Severity};
pub use result::{AnalysisResult, ChunkFailure, UnitStatus};
