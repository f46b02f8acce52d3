//! Command-line tokenization and expansion helpers.
//!
//! The tokenizer understands just enough of the command language to split a
//! line into words, sequencing tokens (`&`, `&&`, `|`, `||`) and redirections
//! (`>`, `2>`, `>>&1`, ...) while observing double quotes and `^` escapes.
//! It deliberately does not interpret anything; execution is delegated to the
//! back-end interpreter.

use std::env;

/// Characters that split commands outside of quotes.
pub const SEP_CHARS: [char; 5] = [' ', '|', '&', '>', '<'];

/// Tokens that sequence commands.
pub const SEQ_TOKENS: [&str; 4] = ["|", "||", "&", "&&"];

/// Word-separator characters used by word-wise cursor movement and deletion.
pub const WORD_SEPARATORS: [char; 15] = [
    ' ', '\t', '\\', '-', '_', '.', '/', '$', '&', '=', '+', '@', ':', ';', '"',
];

/// Check whether `c` is a word separator.
pub fn is_word_sep(c: char) -> bool {
    WORD_SEPARATORS.contains(&c)
}

/// Check whether a token is a file redirection (`>`, `>>`, `<`, `2>`, `>&1`,
/// `0<&3`, ...).
pub fn is_redirection(token: &str) -> bool {
    let mut rest = token;
    // optional source descriptor
    if rest.len() > 1 && rest.starts_with(|c: char| c.is_ascii_digit()) {
        rest = &rest[1..];
    }
    if let Some(tail) = rest.strip_prefix("<&").or_else(|| rest.strip_prefix(">&")) {
        return tail.len() == 1 && tail.starts_with(|c: char| c.is_ascii_digit());
    }
    matches!(rest, ">" | ">>" | "<")
}

/// Check whether a token splits the command line (sequencing or redirection).
pub fn is_sep_token(token: &str) -> bool {
    SEQ_TOKENS.contains(&token) || is_redirection(token)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokState {
    Init,
    Whitespace,
    InString,
    Pipe,
    Amp,
    Gt,
    Redir,
    AwaitingAmp,
    AwaitingNr,
    Escape,
}

/// Tokenize a command line on whitespace while observing quotes, `^` escapes
/// and the separator tokens of the command language.
///
/// The split is stable: re-joining the tokens with single spaces and parsing
/// again yields the same list.
pub fn parse_line(line: &str) -> Vec<String> {
    use TokState::*;

    let mut tokens: Vec<String> = vec![String::new()];
    let mut state = Init;

    let accumulate = |tokens: &mut Vec<String>, c: char| {
        tokens.last_mut().unwrap().push(c);
    };
    let start_empty_token = |tokens: &mut Vec<String>| {
        if !tokens.last().unwrap().is_empty() {
            tokens.push(String::new());
        }
    };

    for c in line.chars() {
        // A character may be re-examined in the Init state after a state
        // declined to consume it.
        let mut pending = Some(c);
        while let Some(c) = pending.take() {
            match state {
                Init => {
                    if c.is_whitespace() {
                        start_empty_token(&mut tokens);
                        state = Whitespace;
                    } else if c == '"' {
                        accumulate(&mut tokens, c);
                        state = InString;
                    } else if c == '|' {
                        start_empty_token(&mut tokens);
                        accumulate(&mut tokens, c);
                        state = Pipe;
                    } else if c == '&' {
                        start_empty_token(&mut tokens);
                        accumulate(&mut tokens, c);
                        state = Amp;
                    } else if c == '>' {
                        start_empty_token(&mut tokens);
                        accumulate(&mut tokens, c);
                        state = Gt;
                    } else if c == '<' {
                        accumulate(&mut tokens, c);
                        state = AwaitingAmp;
                    } else if c == '^' {
                        accumulate(&mut tokens, c);
                        state = Escape;
                    } else if c.is_ascii_digit() {
                        accumulate(&mut tokens, c);
                        state = Redir;
                    } else {
                        accumulate(&mut tokens, c);
                    }
                }
                Whitespace => {
                    if c.is_whitespace() {
                        // swallow
                    } else {
                        state = Init;
                        pending = Some(c);
                    }
                }
                InString => {
                    accumulate(&mut tokens, c);
                    if c == '"' {
                        state = Init;
                    }
                }
                Pipe => {
                    if c == '|' {
                        accumulate(&mut tokens, c);
                        start_empty_token(&mut tokens);
                        state = Init;
                    } else {
                        start_empty_token(&mut tokens);
                        state = Init;
                        pending = Some(c);
                    }
                }
                Amp => {
                    if c == '&' {
                        accumulate(&mut tokens, c);
                        start_empty_token(&mut tokens);
                        state = Init;
                    } else {
                        start_empty_token(&mut tokens);
                        state = Init;
                        pending = Some(c);
                    }
                }
                Gt => {
                    if c == '>' {
                        accumulate(&mut tokens, c);
                        state = AwaitingAmp;
                    } else if c == '&' {
                        accumulate(&mut tokens, c);
                        state = AwaitingNr;
                    } else {
                        start_empty_token(&mut tokens);
                        state = Init;
                        pending = Some(c);
                    }
                }
                Redir => {
                    if c == '<' {
                        accumulate(&mut tokens, c);
                        state = AwaitingAmp;
                    } else if c == '>' {
                        accumulate(&mut tokens, c);
                        state = Gt;
                    } else {
                        state = Init;
                        pending = Some(c);
                    }
                }
                AwaitingAmp => {
                    if c == '&' {
                        accumulate(&mut tokens, c);
                        state = AwaitingNr;
                    } else {
                        start_empty_token(&mut tokens);
                        state = Init;
                        pending = Some(c);
                    }
                }
                AwaitingNr => {
                    if c.is_ascii_digit() {
                        accumulate(&mut tokens, c);
                        start_empty_token(&mut tokens);
                        state = Init;
                    } else {
                        start_empty_token(&mut tokens);
                        state = Init;
                        pending = Some(c);
                    }
                }
                Escape => {
                    accumulate(&mut tokens, c);
                    state = Init;
                }
            }
        }
    }

    if tokens.last().is_some_and(|t| t.is_empty()) {
        tokens.pop();
    }
    tokens
}

/// Undo `^` escaping. A `^` inside double quotes is left alone; an escaped
/// quote does not open or close a quoted run.
pub fn unescape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_quotes = false;
    let mut escape_next = false;
    for c in s.chars() {
        if in_quotes {
            result.push(c);
            if c == '"' {
                in_quotes = false;
            }
        } else if escape_next {
            result.push(c);
            escape_next = false;
        } else if c == '^' {
            escape_next = true;
        } else {
            result.push(c);
            if c == '"' {
                in_quotes = true;
            }
        }
    }
    result
}

/// Replace a leading tilde (`~` or `"~`) with `%HOME%` when defined,
/// `%USERPROFILE%` otherwise.
pub fn expand_tilde(s: &str) -> String {
    let home_var = if env::var_os("HOME").is_some() {
        "HOME"
    } else {
        "USERPROFILE"
    };
    if s.starts_with('~') || s.starts_with("\"~") {
        s.replacen('~', &format!("%{home_var}%"), 1)
    } else {
        s.to_string()
    }
}

/// Inline the values of `%variable%` references and expand a leading tilde.
/// The input is expected to be a single token of a command.
pub fn expand_env_vars(s: &str) -> String {
    let mut s = expand_tilde(s);

    let mut search_from = 0;
    while let Some(rel) = s[search_from..].find('%') {
        let begin = search_from + rel;
        let Some(rel_end) = s[begin + 1..].find('%') else {
            break;
        };
        let end = begin + 1 + rel_end;
        let var = s[begin + 1..end].to_string();
        match env::var(&var) {
            Ok(value) => {
                s.replace_range(begin..=end, &value);
                search_from = begin + value.len();
            }
            Err(_) => search_from = begin + 1,
        }
    }
    s
}

/// Match every whitespace-separated word of `filter`, in order, against
/// `entry`; case is ignored. Returns the matched character spans, or an empty
/// list when some word does not occur.
pub fn fuzzy_match(filter: &str, entry: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = entry.chars().collect();
    let mut spans = Vec::new();
    let mut pos = 0;
    for word in filter.split_whitespace() {
        let needle: Vec<char> = word.chars().collect();
        match find_ci(&chars, &needle, pos) {
            Some(start) => {
                spans.push((start, start + needle.len()));
                pos = start + needle.len();
            }
            None => return Vec::new(),
        }
    }
    spans
}

/// Case-insensitive character-wise substring search starting at `from`.
fn find_ci(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&start| {
        needle
            .iter()
            .zip(&haystack[start..])
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    })
}

/// Check whether the string contains a character that requires quoting.
pub fn contains_special_char(s: &str) -> bool {
    s.contains(' ') || s.contains('&')
}

/// Check whether the string starts with a character that requires quoting.
pub fn starts_with_special_char(s: &str) -> bool {
    s.starts_with(' ') || s.starts_with('&')
}

/// Check whether a file name carries an executable extension.
#[cfg(windows)]
pub fn has_exec_extension(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    [".com", ".exe", ".bat", ".cmd"].iter().any(|ext| lower.ends_with(ext))
}

/// Check whether a file name looks executable (permission bits on POSIX).
#[cfg(unix)]
pub fn is_executable_file(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Remove the extension of a file name, if present.
pub fn strip_extension(file_name: &str) -> &str {
    let dot = file_name.rfind('.');
    let sep = file_name.rfind(['\\', '/']);
    match (dot, sep) {
        (Some(d), Some(s)) if d > s => &file_name[..d],
        (Some(d), None) => &file_name[..d],
        _ => file_name,
    }
}
