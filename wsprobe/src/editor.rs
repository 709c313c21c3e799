//! Cursor movement and editing over a multi-line string.
//!
//! The text itself lives in the session; [`EditBuffer`] borrows it together
//! with a byte cursor that is always on a `char` boundary.

/// A string being edited and its cursor.
#[derive(Debug)]
pub struct EditBuffer<'a> {
    text: &'a mut String,
    cursor: &'a mut usize,
}

impl<'a> EditBuffer<'a> {
    /// Wrap `text` and `cursor`, clamping the cursor into the text.
    pub fn new(text: &'a mut String, cursor: &'a mut usize) -> Self {
        let mut buffer = Self { text, cursor };
        buffer.clamp();
        buffer
    }

    fn clamp(&mut self) {
        let mut at = (*self.cursor).min(self.text.len());
        while !self.text.is_char_boundary(at) {
            at -= 1;
        }
        *self.cursor = at;
    }

    fn line_start(&self) -> usize {
        self.text[..*self.cursor].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self) -> usize {
        self.text[*self.cursor..]
            .find('\n')
            .map_or(self.text.len(), |i| *self.cursor + i)
    }

    /// Insert `c` at the cursor.
    pub fn insert(&mut self, c: char) {
        self.text.insert(*self.cursor, c);
        *self.cursor += c.len_utf8();
    }

    /// Insert `s` at the cursor.
    pub fn insert_str(&mut self, s: &str) {
        self.text.insert_str(*self.cursor, s);
        *self.cursor += s.len();
    }

    /// Delete the character before the cursor. Returns whether anything changed.
    pub fn backspace(&mut self) -> bool {
        let Some(c) = self.text[..*self.cursor].chars().next_back() else {
            return false;
        };
        *self.cursor -= c.len_utf8();
        self.text.remove(*self.cursor);
        true
    }

    /// Delete the character under the cursor. Returns whether anything changed.
    pub fn delete(&mut self) -> bool {
        if *self.cursor >= self.text.len() {
            return false;
        }
        self.text.remove(*self.cursor);
        true
    }

    /// Move one character left.
    pub fn left(&mut self) {
        if let Some(c) = self.text[..*self.cursor].chars().next_back() {
            *self.cursor -= c.len_utf8();
        }
    }

    /// Move one character right.
    pub fn right(&mut self) {
        if let Some(c) = self.text[*self.cursor..].chars().next() {
            *self.cursor += c.len_utf8();
        }
    }

    /// Move to the start of the line.
    pub fn home(&mut self) {
        *self.cursor = self.line_start();
    }

    /// Move to the end of the line.
    pub fn end(&mut self) {
        *self.cursor = self.line_end();
    }

    /// Move one line up, keeping the column where possible.
    pub fn up(&mut self) {
        let start = self.line_start();
        if start == 0 {
            *self.cursor = 0;
            return;
        }
        let column = self.text[start..*self.cursor].chars().count();
        let prev_end = start - 1;
        let prev_start = self.text[..prev_end].rfind('\n').map_or(0, |i| i + 1);
        *self.cursor = offset_of_column(&self.text[prev_start..prev_end], column) + prev_start;
    }

    /// Move one line down, keeping the column where possible.
    pub fn down(&mut self) {
        let end = self.line_end();
        if end == self.text.len() {
            *self.cursor = end;
            return;
        }
        let column = self.text[self.line_start()..*self.cursor].chars().count();
        let next_start = end + 1;
        let next_end = self.text[next_start..]
            .find('\n')
            .map_or(self.text.len(), |i| next_start + i);
        *self.cursor = offset_of_column(&self.text[next_start..next_end], column) + next_start;
    }

    /// Zero-based line and column (in characters) of the cursor.
    #[must_use]
    pub fn cursor_line_col(&self) -> (usize, usize) {
        line_col(self.text, *self.cursor)
    }
}

/// Byte offset of character `column` in `line`, or the line length.
fn offset_of_column(line: &str, column: usize) -> usize {
    line.char_indices().nth(column).map_or(line.len(), |(i, _)| i)
}

/// Zero-based line and column (in characters) of byte offset `cursor`.
#[must_use]
pub fn line_col(text: &str, cursor: usize) -> (usize, usize) {
    let cursor = cursor.min(text.len());
    let before = text.get(..cursor).unwrap_or(text);
    let line = before.matches('\n').count();
    let column = before
        .rfind('\n')
        .map_or(before, |i| &before[i + 1..])
        .chars()
        .count();
    (line, column)
}
