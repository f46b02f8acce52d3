//! rcmd is a smarter interactive prompt for `cmd.exe` and `bash`.
//!
//! It replaces the stock prompt with a richer line editor: fuzzy command
//! history, browser-style directory history, multi-mode tab completion,
//! selection with lexical extension, undo/redo and dynamic word expansion.
//! It does not execute commands itself; each line is delegated to the
//! back-end interpreter and the resulting environment and CWD are harvested
//! afterwards.

#[macro_use]
extern crate log;

pub mod bridge;
pub mod complete;
pub mod config;
pub mod console;
pub mod dirs;
pub mod edit;
pub mod history;
pub mod options;
pub mod parse;
pub mod prompt;
pub mod shell;
pub mod store;
pub mod window;

pub use crate::edit::{Action, InputState};
pub use crate::history::CommandHistory;
pub use crate::options::CliOptions;
pub use crate::shell::Shell;
