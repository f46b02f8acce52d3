//! The 4-byte color escape protocol and its attribute bit masks.
//!
//! Output text is interleaved with escapes of the form `ESC TGT OP COMP`:
//! target `F`/`B` (foreground/background), operation `S`/`C`/`T`
//! (set/clear/toggle) and component `R`/`G`/`B`/`X` (bright). They drive a
//! Windows-console-style attribute word which the writer translates into
//! terminal colors; they are never written to the persistence layer.

use crossterm::style::Color;

pub const FOREGROUND_BLUE: u16 = 0x01;
pub const FOREGROUND_GREEN: u16 = 0x02;
pub const FOREGROUND_RED: u16 = 0x04;
pub const FOREGROUND_BRIGHT: u16 = 0x08;
pub const BACKGROUND_BLUE: u16 = 0x10;
pub const BACKGROUND_GREEN: u16 = 0x20;
pub const BACKGROUND_RED: u16 = 0x40;
pub const BACKGROUND_BRIGHT: u16 = 0x80;

pub const FOREGROUND_WHITE: u16 = FOREGROUND_BLUE | FOREGROUND_GREEN | FOREGROUND_RED;
pub const BACKGROUND_BLACK: u16 = 0x00;

/// The attribute word every session starts from.
pub const DEFAULT_ATTRIBUTES: u16 = FOREGROUND_WHITE | BACKGROUND_BLACK;

/// Escape-string constants for use in prompts and configuration, similar to
/// ANSI sequences but supporting set/clear/toggle of individual components.
pub mod color {
    /// Foreground color commands.
    pub mod fore {
        pub const SET_RED: &str = "\u{1b}FSR";
        pub const SET_GREEN: &str = "\u{1b}FSG";
        pub const SET_BLUE: &str = "\u{1b}FSB";
        pub const SET_BRIGHT: &str = "\u{1b}FSX";

        pub const CLEAR_RED: &str = "\u{1b}FCR";
        pub const CLEAR_GREEN: &str = "\u{1b}FCG";
        pub const CLEAR_BLUE: &str = "\u{1b}FCB";
        pub const CLEAR_BRIGHT: &str = "\u{1b}FCX";

        pub const TOGGLE_RED: &str = "\u{1b}FTR";
        pub const TOGGLE_GREEN: &str = "\u{1b}FTG";
        pub const TOGGLE_BLUE: &str = "\u{1b}FTB";
        pub const TOGGLE_BRIGHT: &str = "\u{1b}FTX";

        pub const RED: &str = concat!("\u{1b}FSR", "\u{1b}FCG", "\u{1b}FCB");
        pub const GREEN: &str = concat!("\u{1b}FCR", "\u{1b}FSG", "\u{1b}FCB");
        pub const YELLOW: &str = concat!("\u{1b}FSR", "\u{1b}FSG", "\u{1b}FCB");
        pub const BLUE: &str = concat!("\u{1b}FCR", "\u{1b}FCG", "\u{1b}FSB");
        pub const MAGENTA: &str = concat!("\u{1b}FSR", "\u{1b}FCG", "\u{1b}FSB");
        pub const CYAN: &str = concat!("\u{1b}FCR", "\u{1b}FSG", "\u{1b}FSB");
        pub const WHITE: &str = concat!("\u{1b}FSR", "\u{1b}FSG", "\u{1b}FSB");

        /// The default terminal foreground (white, not bright).
        pub const DEFAULT: &str =
            concat!("\u{1b}FSR", "\u{1b}FSG", "\u{1b}FSB", "\u{1b}FCX");
    }

    /// Background color commands.
    pub mod back {
        pub const SET_RED: &str = "\u{1b}BSR";
        pub const SET_GREEN: &str = "\u{1b}BSG";
        pub const SET_BLUE: &str = "\u{1b}BSB";
        pub const SET_BRIGHT: &str = "\u{1b}BSX";

        pub const CLEAR_RED: &str = "\u{1b}BCR";
        pub const CLEAR_GREEN: &str = "\u{1b}BCG";
        pub const CLEAR_BLUE: &str = "\u{1b}BCB";
        pub const CLEAR_BRIGHT: &str = "\u{1b}BCX";

        pub const TOGGLE_RED: &str = "\u{1b}BTR";
        pub const TOGGLE_GREEN: &str = "\u{1b}BTG";
        pub const TOGGLE_BLUE: &str = "\u{1b}BTB";
        pub const TOGGLE_BRIGHT: &str = "\u{1b}BTX";

        /// The default terminal background (black, not bright).
        pub const DEFAULT: &str =
            concat!("\u{1b}BCR", "\u{1b}BCG", "\u{1b}BCB", "\u{1b}BCX");
    }
}

/// Apply one escape command (the three bytes after ESC) to an attribute word.
pub fn apply_escape(attr: u16, target: char, op: char, component: char) -> u16 {
    let shift = if target == 'F' { 0 } else { 4 };
    let mask = match component {
        'B' => FOREGROUND_BLUE,
        'G' => FOREGROUND_GREEN,
        'R' => FOREGROUND_RED,
        _ => FOREGROUND_BRIGHT,
    } << shift;
    match op {
        'S' => attr | mask,
        'C' => attr & !mask,
        _ => attr ^ mask,
    }
}

/// Translate the foreground half of an attribute word into a terminal color.
pub fn foreground_color(attr: u16) -> Color {
    let index = (u8::from(attr & FOREGROUND_RED != 0))
        | (u8::from(attr & FOREGROUND_GREEN != 0) << 1)
        | (u8::from(attr & FOREGROUND_BLUE != 0) << 2);
    let bright = attr & FOREGROUND_BRIGHT != 0;
    if index == 7 && !bright {
        // Use the terminal default instead of explicit white.
        Color::Reset
    } else {
        Color::AnsiValue(index + if bright { 8 } else { 0 })
    }
}

/// Translate the background half of an attribute word into a terminal color.
pub fn background_color(attr: u16) -> Color {
    let index = (u8::from(attr & BACKGROUND_RED != 0))
        | (u8::from(attr & BACKGROUND_GREEN != 0) << 1)
        | (u8::from(attr & BACKGROUND_BLUE != 0) << 2);
    let bright = attr & BACKGROUND_BRIGHT != 0;
    if index == 0 && !bright {
        // Use the terminal default instead of explicit black.
        Color::Reset
    } else {
        Color::AnsiValue(index + if bright { 8 } else { 0 })
    }
}

/// Remove color escape sequences from a string.
pub fn strip_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // Swallow the target, operation and component bytes.
            chars.next();
            chars.next();
            chars.next();
        } else {
            result.push(c);
        }
    }
    result
}

/// The on-screen length of a string, ignoring color escapes.
pub fn visible_len(s: &str) -> usize {
    strip_escapes(s).chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clear_toggle() {
        let attr = DEFAULT_ATTRIBUTES;
        assert_eq!(apply_escape(attr, 'F', 'C', 'R'), attr & !FOREGROUND_RED);
        assert_eq!(apply_escape(attr, 'B', 'S', 'X'), attr | BACKGROUND_BRIGHT);
        let toggled = apply_escape(attr, 'F', 'T', 'G');
        assert_eq!(apply_escape(toggled, 'F', 'T', 'G'), attr);
    }

    #[test]
    fn default_white_maps_to_terminal_default() {
        assert_eq!(foreground_color(DEFAULT_ATTRIBUTES), Color::Reset);
        assert_eq!(background_color(DEFAULT_ATTRIBUTES), Color::Reset);
        assert_eq!(
            foreground_color(FOREGROUND_RED | FOREGROUND_BRIGHT),
            Color::AnsiValue(9)
        );
    }

    #[test]
    fn strip_escapes_removes_color_commands() {
        let s = format!("{}hello{}", color::fore::RED, color::fore::DEFAULT);
        assert_eq!(strip_escapes(&s), "hello");
        assert_eq!(visible_len(&s), 5);
    }
}
