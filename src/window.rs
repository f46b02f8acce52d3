//! A scrollable, filterable grid picker over a list of strings.

use regex::Regex;

use crate::config::Appearance;
use crate::console::attr::color;
use crate::console::{Console, InputQueue, Key, KeyPress};
use crate::parse::fuzzy_match;

/// What the user did with the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An entry was chosen.
    Select(String),
    /// An entry should be removed from the backing list.
    Zap(String),
    /// The window was dismissed.
    Cancel,
}

/// Grid dimensions: column width, number of columns, number of lines.
pub fn grid_layout(
    entry_count: usize,
    max_entry_len: usize,
    width: usize,
    viewport_height: usize,
) -> (usize, usize, usize) {
    let cap = width.saturating_sub(1).max(1);
    let column_width = (max_entry_len + 10).min(cap);
    let num_columns = if entry_count > viewport_height / 4 {
        // Print multiple columns to save space.
        (cap / column_width).max(1)
    } else {
        // A single column for clarity.
        1
    };
    let num_lines = entry_count.div_ceil(num_columns).max(1);
    (column_width, num_columns, num_lines)
}

/// Clamp the scroll offset so the selection sits inside the middle half of
/// the viewport.
pub fn center_offset(offset: usize, selected: usize, height: usize, num_lines: usize) -> usize {
    let low = selected.saturating_sub(3 * height / 4);
    let high = selected.saturating_sub(height / 4);
    let max_offset = num_lines.saturating_sub(height);
    offset.clamp(low, high.max(low)).min(max_offset)
}

pub struct Window {
    entries: Vec<String>,
    pattern: Regex,
    filter: String,
    /// Viewport height; 0 asks for the natural height of the list.
    requested_height: usize,
    pub height: usize,
    width: usize,
    viewport_height: usize,

    column_width: usize,
    num_columns: usize,
    pub num_lines: usize,
    offset: usize,
    selected_line: usize,
    selected_column: usize,

    orig_cursor: (usize, usize),
    top: usize,
}

impl Window {
    pub fn new(
        entries: Vec<String>,
        pattern: Regex,
        height: usize,
        console: &Console,
    ) -> Self {
        let (width, viewport_height) = console.size();
        let mut window = Self {
            entries,
            pattern,
            filter: String::new(),
            requested_height: height,
            height: 0,
            width,
            viewport_height,
            column_width: 0,
            num_columns: 1,
            num_lines: 0,
            offset: 0,
            selected_line: 0,
            selected_column: 0,
            orig_cursor: console.cursor(),
            top: 0,
        };
        window.layout();
        window
    }

    /// Entries matching the live filter.
    fn filtered(&self) -> Vec<&String> {
        if self.filter.is_empty() {
            self.entries.iter().collect()
        } else {
            self.entries
                .iter()
                .filter(|e| !fuzzy_match(&self.filter, e).is_empty())
                .collect()
        }
    }

    fn layout(&mut self) {
        let count;
        let column_width;
        let num_columns;
        let num_lines;
        {
            let filtered = self.filtered();
            let max_len = filtered.iter().map(|e| e.chars().count()).max().unwrap_or(0);
            count = filtered.len();
            (column_width, num_columns, num_lines) =
                grid_layout(count, max_len, self.width, self.viewport_height);
        }
        self.column_width = column_width;
        self.num_columns = num_columns;
        self.num_lines = num_lines;
        self.height = if self.requested_height == 0 || self.requested_height > num_lines {
            num_lines
        } else {
            self.requested_height
        };
        if count == 0 {
            self.selected_line = 0;
            self.selected_column = 0;
            self.offset = 0;
        } else {
            while self.selected_index() >= count {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                } else if self.selected_line > 0 {
                    self.selected_line -= 1;
                } else {
                    break;
                }
            }
            self.selected_line = self.selected_line.min(self.num_lines - 1);
            self.center();
        }
    }

    fn selected_index(&self) -> usize {
        self.selected_line + self.selected_column * self.num_lines
    }

    fn center(&mut self) {
        self.offset = center_offset(self.offset, self.selected_line, self.height, self.num_lines);
    }

    /// Paint the grid below the current line.
    pub fn display(&mut self, console: &mut Console, appearance: &Appearance) {
        console.set_cursor_visible(false);
        console.write_str("\n");
        self.top = console.cursor().1;
        let filtered: Vec<String> = self.filtered().into_iter().cloned().collect();
        for line in self.offset..self.offset + self.height {
            console.write_str("\r");
            for column in 0..self.num_columns {
                let index = line + column * self.num_lines;
                let Some(entry) = filtered.get(index) else {
                    continue;
                };
                if line == self.selected_line && column == self.selected_column {
                    console.write_str(&format!(
                        "{}{}{}{}",
                        appearance.colors.selection,
                        entry,
                        color::fore::DEFAULT,
                        color::back::DEFAULT
                    ));
                } else {
                    self.write_highlighted(console, appearance, entry);
                }
                let pad = self.column_width.saturating_sub(entry.chars().count());
                console.write_str(&format!(
                    "{}{}{}",
                    color::fore::DEFAULT,
                    color::back::DEFAULT,
                    " ".repeat(pad)
                ));
            }
            console.write_str("\n");
        }
        if !self.filter.is_empty() {
            console.write_str(&format!(
                "\r{}{}{}{} ",
                appearance.colors.search_filter,
                self.filter,
                color::fore::DEFAULT,
                color::back::DEFAULT
            ));
        }
        console.set_cursor_visible(true);
    }

    fn write_highlighted(&self, console: &mut Console, appearance: &Appearance, entry: &str) {
        if !self.filter.is_empty() {
            // Highlight the spans matched by the live filter.
            let spans = fuzzy_match(&self.filter, entry);
            let chars: Vec<char> = entry.chars().collect();
            let mut pos = 0;
            for (start, end) in spans {
                let before: String = chars[pos..start].iter().collect();
                let matched: String = chars[start..end].iter().collect();
                console.write_str(&format!(
                    "{}{}{}{}{}{}",
                    color::fore::DEFAULT,
                    before,
                    appearance.colors.completion_match,
                    matched,
                    color::fore::DEFAULT,
                    color::back::DEFAULT
                ));
                pos = end;
            }
            let rest: String = chars[pos..].iter().collect();
            console.write_str(&rest);
        } else if let Some(caps) = self.pattern.captures(entry) {
            // The literal (non-wildcard) parts are highlighted.
            let mut pos = 0;
            for group in caps.iter().skip(1).flatten() {
                console.write_str(&format!(
                    "{}{}{}{}{}",
                    appearance.colors.completion_match,
                    &entry[pos..group.start()],
                    color::fore::DEFAULT,
                    color::back::DEFAULT,
                    group.as_str()
                ));
                pos = group.end();
            }
            console.write_str(&format!(
                "{}{}{}{}",
                appearance.colors.completion_match,
                &entry[pos..],
                color::fore::DEFAULT,
                color::back::DEFAULT
            ));
        } else {
            console.write_str(entry);
        }
    }

    fn reset_cursor(&self, console: &mut Console) {
        console.move_cursor(self.orig_cursor.0, self.orig_cursor.1);
    }

    /// Erase the window from the screen.
    pub fn erase(&self, console: &mut Console) {
        self.reset_cursor(console);
        let bottom = self.top + self.height;
        console.erase_to((self.width - 1, bottom));
        self.reset_cursor(console);
    }

    /// Run the interaction loop until an entry is chosen or the window is
    /// dismissed.
    pub fn interact(
        &mut self,
        console: &mut Console,
        input: &mut InputQueue,
        appearance: &Appearance,
    ) -> Outcome {
        loop {
            self.reset_cursor(console);
            self.display(console, appearance);
            self.reset_cursor(console);
            let press = input.read();
            match press {
                KeyPress {
                    key: Key::Left, ..
                } if self.selected_column > 0 => {
                    self.selected_column -= 1;
                }
                KeyPress {
                    key: Key::Right, ..
                } if self.selected_column + 1 < self.num_columns => {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
                KeyPress { key: Key::Down, .. } if self.selected_line + 1 < self.num_lines => {
                    self.selected_line += 1;
                    self.clamp_selection();
                    self.center();
                }
                KeyPress { key: Key::Up, .. } if self.selected_line > 0 => {
                    self.selected_line -= 1;
                    self.center();
                }
                KeyPress { key: Key::Enter, .. } => {
                    let chosen = self.filtered().get(self.selected_index()).cloned().cloned();
                    self.erase(console);
                    return match chosen {
                        Some(entry) => Outcome::Select(entry),
                        None => Outcome::Cancel,
                    };
                }
                KeyPress { key: Key::Esc, .. } => {
                    self.erase(console);
                    return Outcome::Cancel;
                }
                KeyPress {
                    key: Key::Char('k'),
                    ctrl: true,
                    alt: true,
                    ..
                } => {
                    if let Some(entry) = self.filtered().get(self.selected_index()).cloned().cloned() {
                        self.erase(console);
                        return Outcome::Zap(entry);
                    }
                }
                KeyPress { key: Key::Backspace, .. } => {
                    self.filter.pop();
                    self.erase(console);
                    self.layout();
                }
                KeyPress {
                    key: Key::Char(c),
                    ctrl: false,
                    alt: false,
                    ..
                } => {
                    self.filter.push(c);
                    self.erase(console);
                    self.layout();
                }
                _ => {}
            }
        }
    }

    fn clamp_selection(&mut self) {
        let count = self.filtered().len();
        if count == 0 {
            return;
        }
        while self.selected_index() >= count {
            if self.selected_line > 0 {
                self.selected_line -= 1;
            } else if self.selected_column > 0 {
                self.selected_column -= 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_lists_use_a_single_column() {
        let (column_width, num_columns, num_lines) = grid_layout(4, 10, 80, 40);
        assert_eq!(column_width, 20);
        assert_eq!(num_columns, 1);
        assert_eq!(num_lines, 4);
    }

    #[test]
    fn large_lists_use_multiple_columns() {
        let (column_width, num_columns, num_lines) = grid_layout(30, 10, 80, 40);
        assert_eq!(column_width, 20);
        assert_eq!(num_columns, 3);
        assert_eq!(num_lines, 10);
    }

    #[test]
    fn column_width_is_capped_to_the_terminal() {
        let (column_width, num_columns, _) = grid_layout(30, 200, 80, 40);
        assert_eq!(column_width, 79);
        assert_eq!(num_columns, 1);
    }

    #[test]
    fn centering_keeps_the_selection_in_the_middle_band() {
        // Selection far below the viewport: offset must move down.
        let offset = center_offset(0, 20, 8, 40);
        assert!(offset >= 20 - 6 && offset <= 20 - 2);
        // Selection at the top: offset goes to zero.
        assert_eq!(center_offset(10, 0, 8, 40), 0);
        // Offset never exceeds the scroll range.
        assert!(center_offset(100, 39, 8, 40) <= 32);
    }
}
