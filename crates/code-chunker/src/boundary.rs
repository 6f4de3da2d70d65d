use crate::language::Language;
use std::collections::BTreeSet;

/// Find line indices (0-based) that are good split points: splitting before
/// such a line does not cut through a logical statement or block.
///
/// Blank-line boundaries apply to any language. For languages where the
/// structure can be determined cheaply, the start lines of top-level items
/// are added so splits snap to declarations.
pub(crate) fn preferred_boundaries(content: &str, language: Language) -> BTreeSet<usize> {
    let mut boundaries = BTreeSet::new();

    let mut prev_blank = false;
    for (idx, line) in content.lines().enumerate() {
        if idx > 0 && prev_blank {
            boundaries.insert(idx);
        }
        prev_blank = line.trim().is_empty();
    }

    if language.supports_structure() {
        match item_start_rows(content, language) {
            Some(rows) => boundaries.extend(rows),
            None => log::debug!(
                "structural boundary detection unavailable for {}; using blank lines only",
                language.as_str()
            ),
        }
    }

    boundaries
}

/// Start rows of the root node's named children. A failed parse is not an
/// error: the caller falls back to blank-line snapping.
fn item_start_rows(content: &str, language: Language) -> Option<BTreeSet<usize>> {
    let ts_language = language.tree_sitter_language().ok()?;
    let mut parser = tree_sitter::Parser::new();
    parser.set_language(&ts_language).ok()?;
    let tree = parser.parse(content, None)?;

    let root = tree.root_node();
    let mut rows = BTreeSet::new();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        let row = child.start_position().row;
        if row > 0 {
            rows.insert(row);
        }
    }
    Some(rows)
}
