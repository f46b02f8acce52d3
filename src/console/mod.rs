//! Terminal adapter: colored output, cursor bookkeeping and raw mode.
//!
//! The writer understands the 4-byte color escapes of [`attr`] and tracks the
//! cursor position relative to its own output, so the line editor can repaint
//! in place without querying the terminal.

pub mod attr;
mod input;

pub use input::{InputQueue, Key, KeyPress};

use std::io::{self, Stdout, Write};

use crossterm::cursor::SetCursorStyle;
use crossterm::style::{SetBackgroundColor, SetForegroundColor};
use crossterm::{cursor, queue, terminal};

use self::attr::{background_color, foreground_color};

/// Cursor shapes used to mirror the editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    /// Regular typing.
    Normal,
    /// Overwrite mode.
    Overwrite,
    /// Incremental search.
    Search,
}

/// The terminal writer. Keeps the terminal in raw mode for its lifetime.
pub struct Console {
    out: Stdout,
    attributes: u16,
    /// Cursor position relative to our own output.
    cursor: (usize, usize),
    raw: bool,
}

impl Console {
    /// Enter raw mode and build the writer.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self {
            out: io::stdout(),
            attributes: attr::DEFAULT_ATTRIBUTES,
            cursor: (0, 0),
            raw: true,
        })
    }

    /// Leave raw mode early (e.g. while a command writes to the terminal).
    pub fn suspend_raw_mode(&mut self) {
        if self.raw {
            let _ = terminal::disable_raw_mode();
            self.raw = false;
        }
    }

    /// Re-enter raw mode after a command completes.
    pub fn resume_raw_mode(&mut self) {
        if !self.raw {
            let _ = terminal::enable_raw_mode();
            self.raw = true;
        }
    }

    /// The terminal size as (columns, rows).
    pub fn size(&self) -> (usize, usize) {
        terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((80, 24))
    }

    /// The tracked cursor position.
    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    /// Write text, translating color escapes into terminal attributes.
    pub fn write_str(&mut self, s: &str) {
        let mut chars = s.chars();
        let mut run = String::new();
        while let Some(c) = chars.next() {
            if c == '\u{1b}' {
                self.write_plain(&run);
                run.clear();
                let target = chars.next().unwrap_or('F');
                let op = chars.next().unwrap_or('S');
                let component = chars.next().unwrap_or('X');
                self.attributes = attr::apply_escape(self.attributes, target, op, component);
                self.apply_attributes();
            } else {
                run.push(c);
            }
        }
        self.write_plain(&run);
        let _ = self.out.flush();
    }

    fn apply_attributes(&mut self) {
        let _ = queue!(
            self.out,
            SetForegroundColor(foreground_color(self.attributes)),
            SetBackgroundColor(background_color(self.attributes)),
        );
    }

    /// Write text with no escapes, tracking the cursor and forcing the wrap
    /// to the next line when the last column is reached.
    fn write_plain(&mut self, s: &str) {
        let (width, height) = self.size();
        for c in s.chars() {
            match c {
                '\r' => {
                    let _ = self.out.write_all(b"\r");
                    self.cursor.0 = 0;
                }
                '\x08' => {
                    let _ = self.out.write_all(b"\x08");
                    self.cursor.0 = self.cursor.0.saturating_sub(1);
                }
                '\n' => {
                    let _ = self.out.write_all(b"\r\n");
                    self.cursor.0 = 0;
                    self.cursor.1 += 1;
                }
                _ => {
                    let mut buf = [0u8; 4];
                    let _ = self.out.write_all(c.encode_utf8(&mut buf).as_bytes());
                    self.cursor.0 += 1;
                    if self.cursor.0 >= width {
                        let _ = self.out.write_all(b"\r\n");
                        self.cursor.0 = 0;
                        self.cursor.1 += 1;
                    }
                }
            }
            if self.cursor.1 >= height {
                self.cursor.1 = height.saturating_sub(1);
            }
        }
    }

    /// Move the cursor to a tracked position using relative motions.
    pub fn move_cursor(&mut self, x: usize, y: usize) {
        let (cx, cy) = self.cursor;
        if x > cx {
            let _ = queue!(self.out, cursor::MoveRight((x - cx) as u16));
        } else if x < cx {
            let _ = queue!(self.out, cursor::MoveLeft((cx - x) as u16));
        }
        if y > cy {
            let _ = queue!(self.out, cursor::MoveDown((y - cy) as u16));
        } else if y < cy {
            let _ = queue!(self.out, cursor::MoveUp((cy - y) as u16));
        }
        let _ = self.out.flush();
        self.cursor = (x, y);
    }

    /// Move the cursor backward, wrapping across line boundaries.
    pub fn cursor_backward(&mut self, count: usize) {
        let (width, _) = self.size();
        let (mut x, mut y) = self.cursor;
        for _ in 0..count {
            if x == 0 {
                y = y.saturating_sub(1);
                x = width.saturating_sub(1);
            } else {
                x -= 1;
            }
        }
        self.move_cursor(x, y);
    }

    /// Erase from the cursor up to the given tracked position.
    pub fn erase_to(&mut self, end: (usize, usize)) {
        let (width, _) = self.size();
        let (cx, cy) = self.cursor;
        let count = (end.1.saturating_sub(cy)) * width + end.0.saturating_sub(cx);
        self.write_str(&format!(
            "{}{}{}",
            attr::color::fore::DEFAULT,
            attr::color::back::DEFAULT,
            " ".repeat(count)
        ));
        self.cursor_backward(count);
    }

    /// Set the cursor shape to mirror the editing mode.
    pub fn set_cursor_shape(&mut self, shape: CursorShape) {
        let style = match shape {
            CursorShape::Normal => SetCursorStyle::DefaultUserShape,
            CursorShape::Overwrite => SetCursorStyle::SteadyBlock,
            CursorShape::Search => SetCursorStyle::SteadyUnderScore,
        };
        let _ = queue!(self.out, style);
        let _ = self.out.flush();
    }

    /// Show or hide the cursor.
    pub fn set_cursor_visible(&mut self, visible: bool) {
        if visible {
            let _ = queue!(self.out, cursor::Show);
        } else {
            let _ = queue!(self.out, cursor::Hide);
        }
        let _ = self.out.flush();
    }

    /// Set the terminal title.
    pub fn set_title(&mut self, title: &str) {
        let _ = queue!(self.out, terminal::SetTitle(title));
        let _ = self.out.flush();
    }

    /// Notify the user of an invalid operation.
    pub fn bell(&mut self) {
        let _ = self.out.write_all(b"\x07");
        let _ = self.out.flush();
    }

    /// Forget the tracked cursor position (e.g. after child output).
    pub fn reset_tracking(&mut self) {
        self.cursor = (0, 0);
        self.attributes = attr::DEFAULT_ATTRIBUTES;
        self.apply_attributes();
        let _ = self.out.flush();
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        let _ = queue!(self.out, SetCursorStyle::DefaultUserShape, cursor::Show);
        let _ = self.out.flush();
        if self.raw {
            let _ = terminal::disable_raw_mode();
        }
    }
}
