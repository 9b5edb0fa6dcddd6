//! Byte-range edits against the original manifest text
//!
//! Edits are only collected while instructions run. [`EditSet::apply`] sorts them once and
//! splices the replacement text into a fresh string, so every offset always refers to the
//! untouched original buffer.

use std::ops::Range;
use tracing::trace;

use crate::errors::RewriteError;

/// One pending change to the original buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditInstruction {
    /// Replace `range` with `text`
    Replace { range: Range<usize>, text: String },
    /// Insert `text` at `position`, leaving existing bytes in place
    InsertAfter { position: usize, text: String },
    /// Remove `range`
    DeleteRange { range: Range<usize> },
}

impl EditInstruction {
    /// Range of original bytes the edit covers (empty for insertions)
    pub fn span(&self) -> Range<usize> {
        match self {
            EditInstruction::Replace { range, .. } | EditInstruction::DeleteRange { range } => {
                range.clone()
            }
            EditInstruction::InsertAfter { position, .. } => *position..*position,
        }
    }

    pub fn is_insertion(&self) -> bool {
        matches!(self, EditInstruction::InsertAfter { .. })
    }

    /// Text written in place of the span
    pub fn text(&self) -> &str {
        match self {
            EditInstruction::Replace { text, .. } | EditInstruction::InsertAfter { text, .. } => {
                text
            }
            EditInstruction::DeleteRange { .. } => "",
        }
    }
}

/// Ordered collection of edits applied in one pass
#[derive(Debug, Clone, Default)]
pub struct EditSet {
    edits: Vec<EditInstruction>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: EditInstruction) {
        self.edits.push(edit);
    }

    pub fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.push(EditInstruction::Replace {
            range,
            text: text.into(),
        });
    }

    pub fn insert_after(&mut self, position: usize, text: impl Into<String>) {
        self.push(EditInstruction::InsertAfter {
            position,
            text: text.into(),
        });
    }

    pub fn delete(&mut self, range: Range<usize>) {
        self.push(EditInstruction::DeleteRange { range });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditInstruction> {
        self.edits.iter()
    }

    /// Apply every edit to `source` and return the new text
    ///
    /// Edits are ordered by start offset; at equal offsets insertions come first and
    /// otherwise accumulation order is kept. Overlapping spans, spans past the end of the
    /// buffer and spans that split a UTF-8 character are rejected.
    pub fn apply(&self, source: &str) -> Result<String, RewriteError> {
        for edit in &self.edits {
            check_span(source, &edit.span())?;
        }

        let mut ordered: Vec<&EditInstruction> = self.edits.iter().collect();
        ordered.sort_by_key(|edit| (edit.span().start, u8::from(!edit.is_insertion())));

        let mut output = String::with_capacity(source.len());
        let mut cursor = 0;
        let mut previous: Option<Range<usize>> = None;
        for edit in ordered {
            let span = edit.span();
            if span.start < cursor {
                return Err(RewriteError::InternalInvariant(format!(
                    "edit at bytes {:?} overlaps edit at bytes {:?}",
                    span,
                    previous.unwrap_or(0..cursor)
                )));
            }
            trace!("Applying {:?}", edit);
            output.push_str(&source[cursor..span.start]);
            output.push_str(edit.text());
            cursor = span.end;
            previous = Some(span);
        }
        output.push_str(&source[cursor..]);
        Ok(output)
    }
}

fn check_span(source: &str, span: &Range<usize>) -> Result<(), RewriteError> {
    if span.start > span.end || span.end > source.len() {
        return Err(RewriteError::InternalInvariant(format!(
            "edit range {:?} is outside the {}-byte buffer",
            span,
            source.len()
        )));
    }
    if !source.is_char_boundary(span.start) || !source.is_char_boundary(span.end) {
        return Err(RewriteError::InternalInvariant(format!(
            "edit range {:?} does not fall on character boundaries",
            span
        )));
    }
    Ok(())
}
