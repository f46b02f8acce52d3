//! The POSIX strategy: a long-lived `bash` child behind a pseudo-terminal.
//!
//! The child's `PS1` is a sentinel-delimited string carrying `$PWD|$?`, and
//! its `PROMPT_COMMAND` dumps the environment to a per-session temp file.
//! A reader thread streams child output to the real terminal while a rolling
//! matcher watches for the sentinel; the captured middle yields the new CWD
//! and exit code and hands control back to the main loop.

use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use portable_pty::{Child, CommandBuilder, MasterPty, PtySize, native_pty_system};
use tempfile::NamedTempFile;

use super::{BridgeError, set_process_var};
use crate::console::InputQueue;

/// The sentinel bracketing the prompt output. The leading byte is a
/// non-printable control character (0x1E) to reduce collision with user
/// output; the raw `\036` spelling keeps an echoed `$PS1` from fooling the
/// detector.
pub const MARKER: &[u8] = b"\x1e_MARKER_";
const MARKER_RAW: &str = r"\036_MARKER_";

/// Control bytes prepended to a queued command: kill the line bash may
/// already hold, then the command, then a newline.
const KILL_LINE: &[u8] = b"\x15\x0b";

const MODE_IDLE: u8 = 0;
const MODE_SWALLOW: u8 = 1;
const MODE_RUN: u8 = 2;

/// What the reader thread reports back to the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyEvent {
    /// The closing sentinel was matched: the child is back at its prompt.
    Completed { cwd: String, status: String },
    /// The child exited or the PTY was torn down.
    Terminated,
}

/// Rolling matcher for the sentinel protocol: passes bytes through until a
/// first full sentinel opens a capture, and a second one closes it.
pub struct SentinelScanner {
    matched: usize,
    capturing: bool,
    capture: Vec<u8>,
    skip_next: bool,
}

impl Default for SentinelScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SentinelScanner {
    pub fn new() -> Self {
        Self {
            matched: 0,
            capturing: false,
            capture: Vec::new(),
            skip_next: false,
        }
    }

    /// Forget any partial match (e.g. after a new command is queued).
    pub fn reset(&mut self) {
        self.matched = 0;
        self.capturing = false;
        self.capture.clear();
        self.skip_next = false;
    }

    /// Feed one byte. Pass-through bytes are appended to `out`; when the
    /// closing sentinel is matched the captured middle is returned.
    pub fn feed(&mut self, byte: u8, out: &mut Vec<u8>) -> Option<String> {
        if self.capturing {
            if self.skip_next {
                self.skip_next = false;
                return None;
            }
            if byte == b'\r' {
                // When the prompt overflows $COLUMNS some bash versions
                // re-print the overflowing character preceded by '\r'.
                self.skip_next = true;
                return None;
            }
            self.capture.push(byte);
            if self.capture.ends_with(MARKER) {
                let body = &self.capture[..self.capture.len() - MARKER.len()];
                let captured = String::from_utf8_lossy(body).into_owned();
                self.reset();
                return Some(captured);
            }
            return None;
        }

        if byte == MARKER[self.matched] {
            self.matched += 1;
            if self.matched == MARKER.len() {
                self.capturing = true;
                self.matched = 0;
                self.capture.clear();
            }
        } else {
            // Not the sentinel after all: release what was held back.
            out.extend_from_slice(&MARKER[..self.matched]);
            self.matched = 0;
            if byte == MARKER[0] {
                self.matched = 1;
            } else {
                out.push(byte);
            }
        }
        None
    }
}

/// The long-lived bash child and the channels around it.
pub struct PosixBridge {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    events: kanal::Receiver<PtyEvent>,
    mode: Arc<AtomicU8>,
    env_dump: PathBuf,
    _rcfile: NamedTempFile,
}

impl PosixBridge {
    /// Spawn bash behind a PTY, configured for the sentinel protocol, and
    /// wait for its first prompt.
    pub fn start(env_dump: &Path) -> Result<Self, BridgeError> {
        let rcfile = write_rcfile(env_dump)?;

        let pty_system = native_pty_system();
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let pair = pty_system.openpty(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })?;

        let mut cmd = CommandBuilder::new("/bin/bash");
        cmd.arg("--rcfile");
        cmd.arg(rcfile.path());
        if let Ok(cwd) = env::current_dir() {
            cmd.cwd(cwd);
        }
        let child = pair.slave.spawn_command(cmd)?;
        drop(pair.slave);

        let reader = pair.master.try_clone_reader()?;
        let writer = pair.master.take_writer()?;

        let (tx, events) = kanal::unbounded();
        let mode = Arc::new(AtomicU8::new(MODE_RUN));
        spawn_reader(reader, tx, mode.clone());

        let mut bridge = Self {
            master: pair.master,
            writer,
            child,
            events,
            mode,
            env_dump: env_dump.to_path_buf(),
            _rcfile: rcfile,
        };

        // The first prompt carries the initial CWD and environment.
        bridge.wait_for_completion(None)?;
        Ok(bridge)
    }

    /// Run one command line in the child, forwarding keystrokes while it
    /// executes, and re-import the resulting environment.
    pub fn run(&mut self, line: &str, input: &mut InputQueue) -> Result<(), BridgeError> {
        // Match the child's idea of the terminal size to reality before the
        // command draws anything.
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let _ = self.master.resize(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        });

        debug!("queueing {line:?} for the interpreter");
        // The echo of the queued command is swallowed up to the newline.
        self.mode.store(MODE_SWALLOW, Ordering::SeqCst);
        self.writer.write_all(KILL_LINE)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        self.wait_for_completion(Some(input))
    }

    /// Block until the closing sentinel, feeding the user's keystrokes to
    /// the child in the meantime.
    fn wait_for_completion(&mut self, mut input: Option<&mut InputQueue>) -> Result<(), BridgeError> {
        loop {
            match self.events.recv_timeout(Duration::from_millis(10)) {
                Ok(PtyEvent::Completed { cwd, status }) => {
                    self.apply_env_dump(&cwd, &status);
                    return Ok(());
                }
                Ok(PtyEvent::Terminated) => return Err(BridgeError::InterpreterGone),
                Err(kanal::ReceiveErrorTimeout::Timeout) => {
                    // Keystrokes are delivered to the child group verbatim;
                    // Ctrl-C included, the bridge does not intercept.
                    if let Some(input) = input.as_deref_mut() {
                        let mut wrote = false;
                        while let Some(press) = input.try_read() {
                            self.writer.write_all(&press.to_bytes())?;
                            wrote = true;
                        }
                        if wrote {
                            self.writer.flush()?;
                        }
                    }
                }
                Err(_) => return Err(BridgeError::InterpreterGone),
            }
        }
    }

    /// Re-import the child's state: environment dump, exit code and CWD.
    fn apply_env_dump(&self, cwd: &str, status: &str) {
        if let Ok(text) = fs::read_to_string(&self.env_dump) {
            let new_vars: Vec<(String, String)> = text
                .lines()
                .filter_map(|l| l.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            if !new_vars.is_empty() {
                let current: Vec<String> = env::vars().map(|(k, _)| k).collect();
                for key in current {
                    if !new_vars.iter().any(|(k, _)| *k == key) {
                        set_process_var(&key, None);
                    }
                }
                for (key, value) in &new_vars {
                    set_process_var(key, Some(value.as_str()));
                }
            }
        }

        set_process_var("ERRORLEVEL", Some(status));
        if !cwd.is_empty() {
            if let Err(err) = env::set_current_dir(cwd) {
                warn!("cannot enter the interpreter's CWD {cwd}: {err}");
            }
        }
        set_process_var("CD", Some(cwd));
    }

    /// Whether the child is still alive.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

impl Drop for PosixBridge {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

fn spawn_reader(
    mut reader: Box<dyn Read + Send>,
    tx: kanal::Sender<PtyEvent>,
    mode: Arc<AtomicU8>,
) {
    thread::Builder::new()
        .name("pty-reader".to_string())
        .spawn(move || {
            let mut scanner = SentinelScanner::new();
            let mut buf = [0u8; 4096];
            let mut stdout = std::io::stdout();
            loop {
                let n = match reader.read(&mut buf) {
                    Ok(0) | Err(_) => {
                        let _ = tx.send(PtyEvent::Terminated);
                        return;
                    }
                    Ok(n) => n,
                };
                let mut out = Vec::new();
                for &byte in &buf[..n] {
                    match mode.load(Ordering::SeqCst) {
                        MODE_SWALLOW => {
                            if byte == b'\n' {
                                scanner.reset();
                                mode.store(MODE_RUN, Ordering::SeqCst);
                            }
                        }
                        current => {
                            if let Some(captured) = scanner.feed(byte, &mut out) {
                                let (cwd, status) = split_capture(&captured);
                                if current == MODE_RUN {
                                    mode.store(MODE_IDLE, Ordering::SeqCst);
                                    if tx
                                        .send(PtyEvent::Completed {
                                            cwd,
                                            status,
                                        })
                                        .is_err()
                                    {
                                        return;
                                    }
                                }
                            }
                        }
                    }
                }
                if !out.is_empty() {
                    let _ = stdout.write_all(&out);
                    let _ = stdout.flush();
                }
            }
        })
        .expect("failed to spawn the pty reader thread");
}

/// Split the captured `$PWD|$?` middle.
fn split_capture(captured: &str) -> (String, String) {
    match captured.rsplit_once('|') {
        Some((cwd, status)) => (cwd.to_string(), status.to_string()),
        None => (captured.to_string(), String::new()),
    }
}

/// Write the generated rcfile: the user's own `.bashrc` followed by the
/// sentinel `PS1`, the env-dump `PROMPT_COMMAND`, and input settings that
/// keep queued commands out of bash's history and paste bracketing.
fn write_rcfile(env_dump: &Path) -> std::io::Result<NamedTempFile> {
    let mut rcfile = NamedTempFile::new()?;
    if let Some(home) = env::var_os("HOME") {
        if let Ok(bashrc) = fs::read(Path::new(&home).join(".bashrc")) {
            rcfile.write_all(&bashrc)?;
            rcfile.write_all(b"\n")?;
        }
    }
    writeln!(rcfile, "PS1='{MARKER_RAW}$PWD|$?{MARKER_RAW}'")?;
    writeln!(rcfile, "PROMPT_COMMAND=\"printenv > {}\"", env_dump.display())?;
    writeln!(rcfile, "HISTCONTROL=ignorespace")?;
    writeln!(rcfile, "bind 'set enable-bracketed-paste off'")?;
    rcfile.flush()?;
    Ok(rcfile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(scanner: &mut SentinelScanner, bytes: &[u8]) -> (Vec<u8>, Vec<String>) {
        let mut out = Vec::new();
        let mut captures = Vec::new();
        for &b in bytes {
            if let Some(c) = scanner.feed(b, &mut out) {
                captures.push(c);
            }
        }
        (out, captures)
    }

    #[test]
    fn passes_plain_output_through() {
        let mut scanner = SentinelScanner::new();
        let (out, captures) = feed_all(&mut scanner, b"hello world\n");
        assert_eq!(out, b"hello world\n");
        assert!(captures.is_empty());
    }

    #[test]
    fn captures_the_sentinel_middle() {
        let mut scanner = SentinelScanner::new();
        let mut stream = Vec::new();
        stream.extend_from_slice(b"build ok\n");
        stream.extend_from_slice(MARKER);
        stream.extend_from_slice(b"/home/user|0");
        stream.extend_from_slice(MARKER);
        let (out, captures) = feed_all(&mut scanner, &stream);
        assert_eq!(out, b"build ok\n");
        assert_eq!(captures, vec!["/home/user|0".to_string()]);
    }

    #[test]
    fn partial_sentinel_lookalikes_are_released() {
        let mut scanner = SentinelScanner::new();
        // The 0x1E prefix and a few marker bytes, then a divergence.
        let (out, captures) = feed_all(&mut scanner, b"\x1e_MARKxyz");
        assert_eq!(out, b"\x1e_MARKxyz");
        assert!(captures.is_empty());
    }

    #[test]
    fn a_restarted_sentinel_is_still_detected() {
        let mut scanner = SentinelScanner::new();
        let mut stream = Vec::new();
        stream.push(0x1e);
        stream.extend_from_slice(MARKER);
        stream.extend_from_slice(b"/|0");
        stream.extend_from_slice(MARKER);
        let (out, captures) = feed_all(&mut scanner, &stream);
        assert_eq!(out, vec![0x1e]);
        assert_eq!(captures, vec!["/|0".to_string()]);
    }

    #[test]
    fn carriage_returns_in_the_capture_are_repair_sequences() {
        let mut scanner = SentinelScanner::new();
        let mut stream = Vec::new();
        stream.extend_from_slice(MARKER);
        stream.extend_from_slice(b"/ho");
        stream.extend_from_slice(b"\rXme|0");
        stream.extend_from_slice(MARKER);
        let (_, captures) = feed_all(&mut scanner, &stream);
        assert_eq!(captures, vec!["/home|0".to_string()]);
    }

    #[test]
    fn capture_splits_cwd_and_status() {
        assert_eq!(
            split_capture("/home/a|b|127"),
            ("/home/a|b".to_string(), "127".to_string())
        );
        assert_eq!(split_capture("nodivider"), ("nodivider".to_string(), String::new()));
    }

    #[test]
    fn rcfile_carries_the_protocol_setup() {
        let rcfile = write_rcfile(Path::new("/tmp/env_dump")).unwrap();
        let text = fs::read_to_string(rcfile.path()).unwrap();
        assert!(text.contains(r"PS1='\036_MARKER_$PWD|$?\036_MARKER_'"));
        assert!(text.contains("PROMPT_COMMAND=\"printenv > /tmp/env_dump\""));
        assert!(text.contains("HISTCONTROL=ignorespace"));
    }
}
