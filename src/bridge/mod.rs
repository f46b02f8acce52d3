//! The back-end execution bridge.
//!
//! The shell does not interpret the command language; each line is delegated
//! to an external interpreter (`cmd.exe` on Windows, a long-lived `bash` on
//! POSIX) and the shell's own process state is reconstructed from the
//! child's final environment. The env-dump protocol is the only consistent
//! way to re-import that state; individual `set` / `cd` commands are never
//! emulated in the front-end.

#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod windows;

use std::env;
use std::path::Path;

use thiserror::Error;

use crate::parse::{expand_tilde, is_sep_token};

/// Variables written by the child at command end, stripped of quotes and
/// re-imposed on the parent process.
pub const PSEUDO_VARS: [&str; 5] = ["CD", "DATE", "ERRORLEVEL", "RANDOM", "TIME"];

pub const PUSHD_STACK_BEGIN: &str = "===PUSHD STACK BEGIN===";
pub const PUSHD_STACK_END: &str = "===PUSHD STACK END===";

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("pty error: {0}")]
    Pty(anyhow::Error),
    #[error("the interpreter terminated")]
    InterpreterGone,
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        BridgeError::Pty(err)
    }
}

/// Result of pre-sanitizing a user line for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitized {
    /// The line is ready to be handed to the interpreter.
    Command(String),
    /// The interpreter would refuse the line; print its syntax error locally
    /// and do not spawn.
    SyntaxError,
    /// Nothing to run.
    Empty,
}

/// Sanitize tokenized user input the way the interpreter expects it:
/// a leading tilde becomes `%HOME%`/`%USERPROFILE%`, trailing backslashes are
/// stripped from tokens (except `\` and drive roots), an odd number of
/// quotes is closed, a redundant trailing `&` is dropped, and a trailing `|`
/// or `&&` is predicted as a syntax error.
pub fn sanitize_line(tokens: &[String]) -> Sanitized {
    let mut parts: Vec<String> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let mut sane = expand_tilde(token);
        if sane != "\\" && !is_drive_root(&sane) {
            sane = sane.trim_end_matches('\\').to_string();
        }
        if sane.matches('"').count() % 2 == 1 {
            sane.push('"');
        }
        parts.push(sane);
    }
    let mut line = parts.join(" ");

    if line.ends_with("&&") && !line.ends_with("^&&") {
        return Sanitized::SyntaxError;
    }
    if line.ends_with('|') && !line.ends_with("^|") {
        return Sanitized::SyntaxError;
    }
    if line.ends_with('&') && !line.ends_with("^&") {
        // The trailing & would collide with the appended env dump; cmd.exe
        // ignores it anyway.
        line.pop();
        line.truncate(line.trim_end().len());
    }

    if line.is_empty() {
        Sanitized::Empty
    } else {
        Sanitized::Command(line)
    }
}

/// A token of the form `X:\`.
fn is_drive_root(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next(), chars.next()),
        (Some(c), Some(':'), Some('\\'), None) if c.is_ascii_alphabetic()
    )
}

/// Whether the tokens form a simple (non-compound) command.
pub fn is_simple_command(tokens: &[String]) -> bool {
    !tokens.iter().any(|t| is_sep_token(t))
}

/// Whether the tokens are a single `cd` command with no sequencing.
pub fn is_pure_cd(tokens: &[String]) -> bool {
    tokens
        .first()
        .is_some_and(|t| t.eq_ignore_ascii_case("cd"))
        && is_simple_command(tokens)
}

/// Replace every `%ERRORLEVEL%` reference (any casing) with the given value.
/// Applied before handing the line to a delayed-expansion interpreter, which
/// would otherwise see the value from before the previous command.
pub fn presubstitute_errorlevel(line: &str, value: &str) -> String {
    let mut result = String::with_capacity(line.len());
    let mut rest = line;
    let needle = "%errorlevel%";
    loop {
        let lower = rest.to_ascii_lowercase();
        match lower.find(needle) {
            Some(pos) => {
                result.push_str(&rest[..pos]);
                result.push_str(value);
                rest = &rest[pos + needle.len()..];
            }
            None => {
                result.push_str(rest);
                return result;
            }
        }
    }
}

/// Build the command string that runs the user line and dumps the resulting
/// environment, pseudo-variables and pushd stack to `dump_file`.
pub fn build_command_string(line: &str, dump_file: &Path, delayed_expansion: bool) -> String {
    let dump = dump_file.display();
    let mut command = String::from("\"");
    command.push_str(line);
    command.push_str(&format!(" & set > \"{dump}\""));
    for var in PSEUDO_VARS {
        let reference = if delayed_expansion {
            format!("!{var}!")
        } else {
            format!("%{var}%")
        };
        command.push_str(&format!(" & echo {var}=\"{reference}\" >> \"{dump}\""));
    }
    command.push_str(&format!(" & echo {PUSHD_STACK_BEGIN} >> \"{dump}\""));
    command.push_str(&format!(" & pushd >> \"{dump}\""));
    command.push_str(&format!(" & echo {PUSHD_STACK_END} >> \"{dump}\""));
    command.push('"');

    if delayed_expansion {
        format!("%COMSPEC% /V:ON /c {command}")
    } else {
        command
    }
}

/// Re-enact a pushd stack by prefixing the next command: change to the
/// bottom entry, then push the remaining entries bottom-up.
pub fn pushd_prefix(stack: &[String]) -> String {
    let Some((bottom, rest)) = stack.split_last() else {
        return String::new();
    };
    let mut parts = vec![format!("cd /d {bottom}")];
    for dir in rest.iter().rev() {
        parts.push(format!("pushd {dir}"));
    }
    format!("{} & ", parts.join(" & "))
}

/// The interpreter's final environment, captured after a command.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvSnapshot {
    pub vars: Vec<(String, String)>,
    pub pushd_stack: Vec<String>,
}

impl EnvSnapshot {
    /// Parse an env dump: `NAME=VALUE` lines up to the pushd stack markers,
    /// then one pushd stack entry per line. Pseudo-variables are stripped of
    /// their outer quotes.
    pub fn parse(text: &str) -> Self {
        let mut snapshot = Self::default();
        let mut in_pushd = false;
        for line in text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            if line.trim() == PUSHD_STACK_BEGIN {
                in_pushd = true;
                continue;
            }
            if line.trim() == PUSHD_STACK_END {
                break;
            }
            if in_pushd {
                snapshot.pushd_stack.push(line.trim().to_string());
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let mut value = value.trim_end_matches(' ').to_string();
            if PSEUDO_VARS.contains(&name) {
                value = value.trim_matches('"').to_string();
            }
            snapshot.vars.push((name.to_string(), value));
        }
        snapshot
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the snapshot holds exactly the pseudo-variables, which
    /// indicates the child crashed before dumping its environment.
    pub fn is_pseudo_only(&self) -> bool {
        let mut keys: Vec<&str> = self.vars.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        let mut pseudo = PSEUDO_VARS.to_vec();
        pseudo.sort_unstable();
        keys == pseudo
    }

    /// Impose the snapshot on the parent process: drop variables the child
    /// no longer has (unless the child crashed), set the new values, and
    /// change to the captured CWD.
    pub fn apply(&self) {
        if self.vars.is_empty() {
            return;
        }
        if !self.is_pseudo_only() {
            let current: Vec<String> = env::vars().map(|(k, _)| k).collect();
            for key in current {
                if self.get(&key).is_none() {
                    set_process_var(&key, None);
                }
            }
        }
        for (key, value) in &self.vars {
            set_process_var(key, Some(value.as_str()));
        }
        if let Some(cd) = self.get("CD") {
            if let Err(err) = env::set_current_dir(cd) {
                warn!("cannot enter the interpreter's CWD {cd}: {err}");
            }
        }
    }
}

/// Set or remove a process environment variable.
pub fn set_process_var(key: &str, value: Option<&str>) {
    // SAFETY: the environment is only mutated from the main thread, between
    // commands, while no other thread reads it.
    unsafe {
        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn sanitize_closes_quotes_and_strips_backslashes() {
        let line = sanitize_line(&toks(&["dir", "\"c:\\Program Files", "d:\\tmp\\"]));
        assert_eq!(
            line,
            Sanitized::Command("dir \"c:\\Program Files\" d:\\tmp".to_string())
        );
    }

    #[test]
    fn sanitize_keeps_root_backslashes() {
        let line = sanitize_line(&toks(&["cd", "\\"]));
        assert_eq!(line, Sanitized::Command("cd \\".to_string()));
        let line = sanitize_line(&toks(&["cd", "d:\\"]));
        assert_eq!(line, Sanitized::Command("cd d:\\".to_string()));
    }

    #[test]
    fn sanitize_drops_a_redundant_trailing_amp() {
        let line = sanitize_line(&toks(&["dir", "&"]));
        assert_eq!(line, Sanitized::Command("dir".to_string()));
    }

    #[test]
    fn sanitize_predicts_syntax_errors() {
        assert_eq!(sanitize_line(&toks(&["dir", "|"])), Sanitized::SyntaxError);
        assert_eq!(sanitize_line(&toks(&["dir", "&&"])), Sanitized::SyntaxError);
        assert_eq!(sanitize_line(&toks(&["dir", "||"])), Sanitized::SyntaxError);
        // Escaped separators are literal text.
        assert_eq!(
            sanitize_line(&toks(&["echo", "x^&"])),
            Sanitized::Command("echo x^&".to_string())
        );
    }

    #[test]
    fn pure_cd_detection() {
        assert!(is_pure_cd(&toks(&["cd", ".."])));
        assert!(is_pure_cd(&toks(&["CD"])));
        assert!(!is_pure_cd(&toks(&["cd", "..", "&&", "dir"])));
        assert!(!is_pure_cd(&toks(&["cdd"])));
    }

    #[test]
    fn errorlevel_presubstitution_ignores_case() {
        assert_eq!(
            presubstitute_errorlevel("echo %ERRORLEVEL% > OUT", "1"),
            "echo 1 > OUT"
        );
        assert_eq!(
            presubstitute_errorlevel("echo %ErrorLevel%%errorlevel%", "9009"),
            "echo 90099009"
        );
        assert_eq!(presubstitute_errorlevel("echo done", "0"), "echo done");
    }

    #[test]
    fn command_string_wraps_line_and_dump() {
        let cmd = build_command_string("dir", Path::new("C:\\t\\dump"), false);
        assert!(cmd.starts_with("\"dir & set > \"C:\\t\\dump\""));
        assert!(cmd.contains("echo CD=\"%CD%\""));
        assert!(cmd.contains("echo ERRORLEVEL=\"%ERRORLEVEL%\""));
        assert!(cmd.contains(PUSHD_STACK_BEGIN));
        assert!(cmd.ends_with('"'));
    }

    #[test]
    fn delayed_expansion_uses_bang_references() {
        let cmd = build_command_string("dir", Path::new("C:\\t\\dump"), true);
        assert!(cmd.starts_with("%COMSPEC% /V:ON /c \""));
        assert!(cmd.contains("echo ERRORLEVEL=\"!ERRORLEVEL!\""));
    }

    #[test]
    fn env_dump_parse_splits_vars_and_pushd_stack() {
        let dump = "\
PATH=C:\\Windows
PROMPT=$P$G
CD=\"C:\\Work\"
ERRORLEVEL=\"0\"
===PUSHD STACK BEGIN===
C:\\Work\\sub
C:\\Work
===PUSHD STACK END===
";
        let snapshot = EnvSnapshot::parse(dump);
        assert_eq!(snapshot.get("PATH"), Some("C:\\Windows"));
        // Pseudo-variables lose their outer quotes.
        assert_eq!(snapshot.get("CD"), Some("C:\\Work"));
        assert_eq!(snapshot.get("ERRORLEVEL"), Some("0"));
        assert_eq!(snapshot.pushd_stack, ["C:\\Work\\sub", "C:\\Work"]);
    }

    #[test]
    fn pseudo_only_snapshot_signals_a_child_crash() {
        let dump = "\
CD=\"C:\\Work\"
DATE=\"2024-05-01\"
ERRORLEVEL=\"1\"
RANDOM=\"42\"
TIME=\"12:00\"
";
        assert!(EnvSnapshot::parse(dump).is_pseudo_only());
    }

    #[test]
    fn pushd_prefix_reenacts_bottom_up() {
        let stack = vec!["C:\\top".to_string(), "C:\\mid".to_string(), "C:\\bottom".to_string()];
        assert_eq!(
            pushd_prefix(&stack),
            "cd /d C:\\bottom & pushd C:\\mid & pushd C:\\top & "
        );
        assert_eq!(pushd_prefix(&[]), "");
    }
}
