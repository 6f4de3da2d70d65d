use crate::boundary::preferred_boundaries;
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{Chunk, SourceUnit};
use refine_protocol::{fingerprint_chunk, Fingerprint};

/// Derives bounded chunks from source units.
///
/// The byte budget applies to a chunk's body (the lines it owns); overlap
/// lines are declared context on top of the body, resolved later by the
/// aggregator.
pub struct Chunker {
    max_chunk_bytes: usize,
    overlap_lines: usize,
}

/// A body range before overlap is applied: lines `[start, end)` of the unit.
#[derive(Debug, Clone, Copy)]
struct BodyRange {
    start: usize,
    end: usize,
    oversized: bool,
}

/// Byte span of one line including its terminator
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    start: usize,
    end: usize,
}

impl LineSpan {
    const fn len(self) -> usize {
        self.end - self.start
    }
}

impl Chunker {
    pub fn new(max_chunk_bytes: usize, overlap_lines: usize) -> Result<Self> {
        if max_chunk_bytes == 0 {
            return Err(ChunkerError::invalid_config("max_chunk_bytes must be > 0"));
        }
        Ok(Self {
            max_chunk_bytes,
            overlap_lines,
        })
    }

    /// Split a unit into chunks keyed off its fingerprint.
    ///
    /// Indices are 0-based and contiguous. A unit no larger than the byte
    /// budget yields exactly one chunk.
    pub fn chunk(&self, unit: &SourceUnit, unit_fingerprint: &Fingerprint) -> Result<Vec<Chunk>> {
        if unit.content.is_empty() {
            return Err(ChunkerError::EmptyUnit);
        }

        let lines = line_spans(&unit.content);
        let ranges = if unit.content.len() <= self.max_chunk_bytes {
            vec![BodyRange {
                start: 0,
                end: lines.len(),
                oversized: false,
            }]
        } else {
            self.split(&unit.content, &lines, unit.language)
        };

        log::debug!(
            "unit {} ({} bytes) -> {} chunks",
            unit.name,
            unit.content.len(),
            ranges.len()
        );

        let mut chunks = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.iter().enumerate() {
            let overlap = if index == 0 {
                0
            } else {
                self.overlap_lines.min(range.start - ranges[index - 1].start)
            };
            let first_line = range.start - overlap;
            let start_byte = lines[first_line].start;
            let end_byte = lines[range.end - 1].end;

            chunks.push(Chunk {
                index,
                start_line: first_line + 1,
                end_line: range.end,
                start_byte,
                end_byte,
                overlap,
                oversized: range.oversized,
                payload: unit.content[start_byte..end_byte].to_string(),
                fingerprint: fingerprint_chunk(unit_fingerprint, index, start_byte, end_byte),
            });
        }

        Ok(chunks)
    }

    /// Greedy fill up to the byte budget, snapping each cut to the last
    /// preferred boundary inside the filled window when one exists.
    fn split(&self, content: &str, lines: &[LineSpan], language: Language) -> Vec<BodyRange> {
        let boundaries = preferred_boundaries(content, language);
        let mut ranges = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            if lines[start].len() > self.max_chunk_bytes {
                // A single line over budget is never split mid-line.
                ranges.push(BodyRange {
                    start,
                    end: start + 1,
                    oversized: true,
                });
                start += 1;
                continue;
            }

            let mut end = start + 1;
            let mut bytes = lines[start].len();
            while end < lines.len() && bytes + lines[end].len() <= self.max_chunk_bytes {
                bytes += lines[end].len();
                end += 1;
            }

            if end < lines.len() {
                if let Some(&cut) = boundaries.range(start + 1..=end).next_back() {
                    end = cut;
                }
            }

            ranges.push(BodyRange {
                start,
                end,
                oversized: false,
            });
            start = end;
        }

        ranges
    }
}

/// Rebuild unit content from chunks: concatenate payloads in sequence order
/// with each declared overlap prefix dropped.
#[must_use]
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|chunk| chunk.index);

    let mut out = String::new();
    for chunk in ordered {
        let mut rest = chunk.payload.as_str();
        for _ in 0..chunk.overlap {
            match rest.find('\n') {
                Some(pos) => rest = &rest[pos + 1..],
                None => {
                    rest = "";
                    break;
                }
            }
        }
        out.push_str(rest);
    }
    out
}

fn line_spans(content: &str) -> Vec<LineSpan> {
    let mut spans = Vec::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        spans.push(LineSpan {
            start: offset,
            end: offset + line.len(),
        });
        offset += line.len();
    }
    spans
}
