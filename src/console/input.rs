//! Keyboard input: key records, decoding and the shared input queue.

use std::collections::VecDeque;
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// A decoded key, free of modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Tab,
    BackTab,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Delete,
    Insert,
    PageUp,
    PageDown,
    F(u8),
}

/// A key together with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    /// Whether no modifier is held.
    pub fn is_plain(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift
    }

    /// Encode the key press as terminal input bytes, for forwarding to the
    /// interpreter while a command is running.
    pub fn to_bytes(self) -> Vec<u8> {
        let mut bytes = Vec::new();
        if self.alt {
            bytes.push(0x1b);
        }
        match self.key {
            Key::Char(c) => {
                if self.ctrl && c.is_ascii_alphabetic() {
                    bytes.push(c.to_ascii_uppercase() as u8 & 0x1f);
                } else if self.ctrl && c == ' ' {
                    bytes.push(0x00);
                } else {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
            Key::Enter => bytes.push(b'\r'),
            Key::Esc => bytes.push(0x1b),
            Key::Tab => bytes.push(b'\t'),
            Key::BackTab => bytes.extend_from_slice(b"\x1b[Z"),
            Key::Backspace => bytes.push(0x7f),
            Key::Left => bytes.extend_from_slice(b"\x1b[D"),
            Key::Right => bytes.extend_from_slice(b"\x1b[C"),
            Key::Up => bytes.extend_from_slice(b"\x1b[A"),
            Key::Down => bytes.extend_from_slice(b"\x1b[B"),
            Key::Home => bytes.extend_from_slice(b"\x1b[H"),
            Key::End => bytes.extend_from_slice(b"\x1b[F"),
            Key::Delete => bytes.extend_from_slice(b"\x1b[3~"),
            Key::Insert => bytes.extend_from_slice(b"\x1b[2~"),
            Key::PageUp => bytes.extend_from_slice(b"\x1b[5~"),
            Key::PageDown => bytes.extend_from_slice(b"\x1b[6~"),
            Key::F(n) => match n {
                1..=4 => bytes.extend_from_slice(&[0x1b, b'O', b'P' + n - 1]),
                _ => bytes.extend_from_slice(format!("\x1b[{}~", n + 12).as_bytes()),
            },
        }
        bytes
    }
}

impl TryFrom<KeyEvent> for KeyPress {
    type Error = ();

    fn try_from(event: KeyEvent) -> Result<Self, ()> {
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Esc => Key::Esc,
            KeyCode::Tab => Key::Tab,
            KeyCode::BackTab => Key::BackTab,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Delete => Key::Delete,
            KeyCode::Insert => Key::Insert,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::F(n) => Key::F(n),
            _ => return Err(()),
        };
        Ok(Self {
            key,
            ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
            alt: event.modifiers.contains(KeyModifiers::ALT),
            shift: event.modifiers.contains(KeyModifiers::SHIFT),
        })
    }
}

/// The FIFO of decoded key presses, fed by a dedicated reader thread.
///
/// Synthetic key presses pushed with [`push_back`](Self::push_back) are
/// consumed before anything from the terminal.
pub struct InputQueue {
    rx: kanal::Receiver<KeyPress>,
    /// Sender half, for injecting synthetic events from signal handlers.
    tx: kanal::Sender<KeyPress>,
    write_back: VecDeque<KeyPress>,
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::start()
    }
}

impl InputQueue {
    /// Spawn the reader thread and return the queue.
    pub fn start() -> Self {
        let (tx, rx) = kanal::unbounded();
        let reader_tx = tx.clone();
        thread::Builder::new()
            .name("input".to_string())
            .spawn(move || {
                loop {
                    match event::read() {
                        Ok(Event::Key(k)) if k.kind != KeyEventKind::Release => {
                            if let Ok(press) = KeyPress::try_from(k) {
                                if reader_tx.send(press).is_err() {
                                    break;
                                }
                            }
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!("input thread: {err}");
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn the input thread");
        Self {
            rx,
            tx,
            write_back: VecDeque::new(),
        }
    }

    /// Block until the next key press.
    pub fn read(&mut self) -> KeyPress {
        if let Some(press) = self.write_back.pop_front() {
            return press;
        }
        self.rx.recv().unwrap_or(KeyPress::ctrl(Key::Char('d')))
    }

    /// Fetch a key press if one is pending.
    pub fn try_read(&mut self) -> Option<KeyPress> {
        if let Some(press) = self.write_back.pop_front() {
            return Some(press);
        }
        self.rx.try_recv().ok().flatten()
    }

    /// Inject a synthetic key press, consumed before terminal input.
    pub fn push_back(&mut self, press: KeyPress) {
        self.write_back.push_back(press);
    }

    /// A sender that can inject key presses from another thread.
    pub fn sender(&self) -> kanal::Sender<KeyPress> {
        self.tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_chars_encode_as_control_bytes() {
        assert_eq!(KeyPress::ctrl(Key::Char('c')).to_bytes(), vec![0x03]);
        assert_eq!(KeyPress::ctrl(Key::Char('u')).to_bytes(), vec![0x15]);
    }

    #[test]
    fn arrows_encode_as_csi_sequences() {
        assert_eq!(KeyPress::plain(Key::Up).to_bytes(), b"\x1b[A");
        assert_eq!(KeyPress::plain(Key::Enter).to_bytes(), b"\r");
    }

    #[test]
    fn alt_prefixes_escape() {
        let press = KeyPress {
            key: Key::Char('f'),
            ctrl: false,
            alt: true,
            shift: false,
        };
        assert_eq!(press.to_bytes(), b"\x1bf");
    }
}
