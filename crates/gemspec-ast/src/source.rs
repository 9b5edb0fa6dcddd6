//! Original manifest text with byte offset to line/column mapping
//!
//! Every range the engine computes is expressed against this buffer, so the helpers
//! here are all about finding line boundaries and whitespace around a statement.

/// Immutable source text plus a line-start index
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        SourceBuffer { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line index containing `offset`
    pub fn line_index(&self, offset: usize) -> usize {
        let offset = offset.min(self.text.len());
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        }
    }

    /// One-based (line, column); the column counts characters, not bytes
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = self.floor_char_boundary(offset);
        let line = self.line_index(offset);
        let start = self.line_starts[line];
        let column = self.text[start..offset].chars().count();
        (line + 1, column + 1)
    }

    /// Byte offset where the line containing `offset` starts
    pub fn line_start(&self, offset: usize) -> usize {
        self.line_starts[self.line_index(offset)]
    }

    /// Byte offset of the terminator (`\n` or `\r\n`) ending the line containing `offset`,
    /// or the buffer length for the last line
    pub fn line_end(&self, offset: usize) -> usize {
        let line = self.line_index(offset);
        match self.line_starts.get(line + 1) {
            Some(&next_start) => {
                let newline = next_start - 1;
                if newline > 0 && self.text.as_bytes()[newline - 1] == b'\r' {
                    newline - 1
                } else {
                    newline
                }
            }
            None => self.text.len(),
        }
    }

    /// Text of the line containing `offset`, without its terminator
    pub fn line_text(&self, offset: usize) -> &str {
        &self.text[self.line_start(offset)..self.line_end(offset)]
    }

    /// Leading whitespace of the line containing `offset`
    pub fn indentation_at(&self, offset: usize) -> &str {
        let line = self.line_text(offset);
        let trimmed = line.trim_start_matches([' ', '\t']);
        &line[..line.len() - trimmed.len()]
    }

    /// True when only spaces or tabs sit between the start of the line and `offset`
    pub fn is_line_prefix_blank(&self, offset: usize) -> bool {
        let start = self.line_start(offset);
        self.text[start..offset]
            .chars()
            .all(|c| c == ' ' || c == '\t')
    }

    /// True when everything after `offset` up to the line terminator is whitespace,
    /// optionally followed by a comment
    pub fn rest_of_line_is_trivia(&self, offset: usize) -> bool {
        let end = self.line_end(offset);
        if offset >= end {
            return true;
        }
        let rest = self.text[offset..end].trim_start_matches([' ', '\t']);
        rest.is_empty() || rest.starts_with('#')
    }

    /// Start of the terminator that ends the line before the one starting at `line_start`
    pub fn preceding_terminator(&self, line_start: usize) -> Option<usize> {
        if line_start == 0 {
            return None;
        }
        let newline = line_start - 1;
        if newline > 0 && self.text.as_bytes()[newline - 1] == b'\r' {
            Some(newline - 1)
        } else {
            Some(newline)
        }
    }

    /// The line terminator style used by the buffer (first one wins)
    pub fn newline(&self) -> &'static str {
        match self.text.find('\n') {
            Some(idx) if idx > 0 && self.text.as_bytes()[idx - 1] == b'\r' => "\r\n",
            _ => "\n",
        }
    }

    fn floor_char_boundary(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
