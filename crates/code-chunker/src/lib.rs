//! # Refine Code Chunker
//!
//! Splits source units that exceed the model's context window into
//! analyzable chunks while keeping every finding mappable back to the
//! original file.
//!
//! ## Architecture
//!
//! ```text
//! Source Unit
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Boundary Detection
//!     │    ├─> Blank-line boundaries (any language)
//!     │    └─> Top-level item boundaries (tree-sitter, when cheap)
//!     │
//!     └──> Chunk Generation
//!          ├─> Greedy fill up to the byte budget, snapped to boundaries
//!          ├─> Oversized single lines emitted whole and flagged
//!          └─> Overlap lines repeated for cross-boundary context
//! ```
//!
//! Chunk payloads are exact byte slices of the unit. Concatenating payloads
//! in sequence order, with each non-first chunk's declared overlap lines
//! dropped, reproduces the unit byte-for-byte.

mod boundary;
mod chunker;
mod error;
mod language;
mod types;

pub use chunker::{reconstruct, Chunker};
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use types::{Chunk, SourceUnit};
