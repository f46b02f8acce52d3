//! Lexical selection extension.
//!
//! Shift-Up selects an increasingly larger chunk of the line, going from
//! word to file name, full path, argument and finally the entire line.
//! Shift-Down replays the exact same states in reverse.

use super::InputState;

const SEPARATORS_OUTSIDE_QUOTES: [char; 11] =
    ['-', '.', '=', '\\', ';', ' ', '>', '<', '&', '|', '\0'];
const SEPARATORS_INSIDE_QUOTES: [char; 7] = ['-', ' ', '.', '&', '|', '\\', '"'];

/// Snapshot taken before an extension step, so shrinking restores it.
pub(super) struct ExtendFrame {
    before_cursor: String,
    after_cursor: String,
    selection_start: usize,
    separators: Vec<char>,
}

impl InputState {
    /// Extend the selection lexically.
    pub(super) fn key_extend_selection(&mut self) {
        if self.extend_separators.is_none() {
            self.reset_selection();
            self.history.reset();

            // Stick to the closest word, left or right of the cursor.
            let whitespace_left = trailing_spaces(&self.before_cursor);
            let whitespace_right = leading_spaces(&self.after_cursor);
            let before_len = self.before_cursor.chars().count();
            let after_len = self.after_cursor.chars().count();
            if whitespace_left == before_len
                || (whitespace_right > 0 && whitespace_left >= whitespace_right)
            {
                for _ in 0..whitespace_right {
                    self.key_right(false);
                }
            } else if whitespace_right == after_len
                || (whitespace_left > 0 && whitespace_right >= whitespace_left)
            {
                for _ in 0..whitespace_left {
                    self.key_left(false);
                }
            }

            // Skip over trailing backslashes that abut whitespace.
            while self.before_cursor.ends_with('\\')
                && (self.after_cursor.is_empty() || self.after_cursor.starts_with(' '))
            {
                self.key_left(false);
            }

            if count_quotes(&self.before_cursor) % 2 == 0 {
                if self.before_cursor.ends_with('"') {
                    self.key_left(false);
                } else if self.after_cursor.starts_with('"') {
                    self.key_right(false);
                }
            }

            self.extend_separators = Some(if count_quotes(&self.before_cursor) % 2 == 0 {
                SEPARATORS_OUTSIDE_QUOTES.to_vec()
            } else {
                SEPARATORS_INSIDE_QUOTES.to_vec()
            });
        }

        self.extend_selection();
    }

    /// Shrink the selection, reversing the last extension step.
    pub(super) fn key_shrink_selection(&mut self) {
        match self.selection_history.pop() {
            Some(frame) => {
                self.before_cursor = frame.before_cursor;
                self.after_cursor = frame.after_cursor;
                self.selection_start = frame.selection_start;
                self.extend_separators = Some(frame.separators);
                if self.selection_history.is_empty() {
                    self.reset_selection();
                }
            }
            None => self.bell = true,
        }
    }

    fn extend_selection(&mut self) {
        let line: Vec<char> = self.line().chars().collect();
        let mut extend_begin = self.before_cursor.chars().count();
        let mut extend_end = self.selection_start.max(extend_begin);
        let mut separators = self.extend_separators.clone().unwrap_or_default();
        let mut expanded = false;

        // Each round expands against the remaining separator set, then pops
        // the strictest separator; exhausting the inside-quotes set falls
        // back to the outside set.
        while !expanded && !separators.is_empty() {
            while extend_begin >= 1 && !separators.contains(&line[extend_begin - 1]) {
                extend_begin -= 1;
                expanded = true;
            }
            while extend_end < line.len() && !separators.contains(&line[extend_end]) {
                extend_end += 1;
                expanded = true;
            }
            separators.remove(0);

            if separators.is_empty() && count_quotes(&self.before_cursor) % 2 == 1 {
                separators = SEPARATORS_OUTSIDE_QUOTES.to_vec();
            }
        }

        if expanded {
            self.selection_history.push(ExtendFrame {
                before_cursor: self.before_cursor.clone(),
                after_cursor: self.after_cursor.clone(),
                selection_start: self.selection_start,
                separators: self.extend_separators.clone().unwrap_or_default(),
            });
            self.before_cursor = line[..extend_begin].iter().collect();
            self.after_cursor = line[extend_begin..].iter().collect();
            self.selection_start = extend_end;
            self.extend_separators = Some(separators);
        } else {
            self.bell = true;
        }
    }
}

fn trailing_spaces(s: &str) -> usize {
    s.chars().rev().take_while(|&c| c == ' ').count()
}

fn leading_spaces(s: &str) -> usize {
    s.chars().take_while(|&c| c == ' ').count()
}

fn count_quotes(s: &str) -> usize {
    s.chars().filter(|&c| c == '"').count()
}
