//! # Refine Inference
//!
//! Dispatches chunk analyses against the external model capability.
//!
//! ## Flow per chunk
//!
//! ```text
//! Chunk
//!     │
//!     ├──> Cache check (fingerprint)  ── hit ──> cached findings, no model call
//!     │
//!     ├──> Single-flight gate (don't race the same fingerprint twice)
//!     │
//!     ├──> Model call
//!     │      ├─> transient failure → exponential backoff + jitter, retry
//!     │      ├─> fatal failure → abort, never retried, never cached
//!     │      └─> attempt timeout → counts as transient
//!     │
//!     └──> Cache write (successes only) ──> findings
//! ```
//!
//! The model capability is opaque: prompt in, findings out, or an error
//! classified transient or fatal. Providers own their wire formats; the
//! dispatcher owns scheduling, retries, and the cache contract.

mod dispatcher;
mod error;
mod http;
mod mock;
mod parse;
mod prompt;
mod provider;
mod retry;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::InferenceError;
pub use http::HttpProvider;
pub use mock::MockProvider;
pub use parse::parse_findings;
pub use prompt::render_prompt;
pub use provider::{InferenceRequest, ModelProvider};
pub use retry::RetryPolicy;
