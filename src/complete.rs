//! Completion of file names, wildcards and environment variables.

use std::env;
use std::fs;
use std::path::MAIN_SEPARATOR;

use regex::Regex;

use crate::parse::{
    contains_special_char, expand_env_vars, parse_line, starts_with_special_char, SEQ_TOKENS,
};

#[cfg(windows)]
use crate::parse::{has_exec_extension, strip_extension};
#[cfg(unix)]
use crate::parse::is_executable_file;

/// Command names handled by the interpreter itself; offered at a command
/// start position in addition to PATH executables.
#[cfg(windows)]
const INTERNAL_COMMANDS: &[&str] = &[
    "assoc", "call", "cd", "chdir", "cls", "color", "copy", "date", "del", "dir", "echo",
    "endlocal", "erase", "exit", "for", "ftype", "goto", "if", "md", "mkdir", "mklink", "move",
    "path", "pause", "popd", "prompt", "pushd", "rem", "ren", "rename", "rd", "rmdir", "set",
    "setlocal", "shift", "start", "time", "title", "type", "ver", "verify", "vol",
];
#[cfg(unix)]
const INTERNAL_COMMANDS: &[&str] = &[
    "alias", "bg", "bind", "cd", "echo", "eval", "exec", "exit", "export", "fg", "history",
    "jobs", "kill", "popd", "pushd", "pwd", "set", "source", "type", "ulimit", "umask",
    "unalias", "unset", "wait",
];

/// Complete names of files and/or directories.
///
/// The line is tokenized with two approaches in turn: plain whitespace-based
/// tokenization first, and when that yields nothing, the last argument is
/// re-read as a semicolon-separated list of paths optionally preceded by an
/// equals character (`PATH=`-style arguments).
///
/// Returns the updated line (with the completed suffix and quotes as needed)
/// and the list of possible subsequent completions.
pub fn complete_file(line: &str) -> (String, Vec<String>) {
    let (completed, completions) = complete_file_simple(line);
    if completed == line && completions.is_empty() {
        return complete_file_alternate(line);
    }
    (completed, completions)
}

fn complete_file_simple(line: &str) -> (String, Vec<String>) {
    let tokens = tokens_of(line);
    let last_token = tokens.last().cloned().unwrap_or_default();
    let token = last_token.replace('"', "");

    let path_sep = detect_path_sep(&expand_env_vars(&token));
    let (path_to_complete, prefix) = split_path(&token, path_sep);
    let dir_to_complete = dir_for(&path_to_complete, path_sep);
    let matcher = wildcard_to_regex(&format!("{prefix}*"));

    let mut completions = list_matching(&dir_to_complete, path_sep, &matcher);

    let at_command_start = (tokens.len() == 1
        || tokens
            .get(tokens.len().wrapping_sub(2))
            .is_some_and(|t| SEQ_TOKENS.contains(&t.as_str())))
        && path_to_complete.is_empty();
    if at_command_start {
        completions.extend(command_candidates(&matcher, &prefix, &completions));
    }

    if completions.is_empty() {
        return (line.to_string(), Vec::new());
    }

    let common_string = find_common_prefix(&prefix, &completions);
    let completed_file = join_completed(&path_to_complete, path_sep, &common_string);

    let start_quote = if needs_quotes(&completed_file, &prefix, &completions) {
        "\""
    } else {
        ""
    };

    let stem = chop_suffix_chars(line, last_token.chars().count());
    let mut result = format!("{stem}{start_quote}{completed_file}");

    if completions.len() == 1 {
        // Unique completion: close the quote; a directory keeps its trailing
        // separator after the closing quote, a file gets a space.
        let end_quote = start_quote;
        if result.ends_with(path_sep) {
            result.pop();
            result.push_str(end_quote);
            result.push(path_sep);
        } else {
            result.push_str(end_quote);
            result.push(' ');
        }
    }

    (result, completions)
}

fn complete_file_alternate(line: &str) -> (String, Vec<String>) {
    let tokens = tokens_of(line);
    let full_token = tokens.last().cloned().unwrap_or_default().replace('"', "");
    let (last_token_prefix, last_token) = match full_token.rsplit_once('=') {
        Some((head, tail)) => (format!("{head}="), tail.to_string()),
        None => (String::new(), full_token.clone()),
    };

    let token = last_token.rsplit(';').next().unwrap_or_default().to_string();

    let path_sep = detect_path_sep(&expand_env_vars(&token));
    let (path_to_complete, prefix) = split_path(&token, path_sep);
    let dir_to_complete = dir_for(&path_to_complete, path_sep);
    let matcher = wildcard_to_regex(&format!("{prefix}*"));

    let completions = list_matching(&dir_to_complete, path_sep, &matcher);
    if completions.is_empty() {
        return (line.to_string(), Vec::new());
    }

    let common_string = find_common_prefix(&prefix, &completions);
    let completed_file = join_completed(&path_to_complete, path_sep, &common_string);

    let quoted = needs_quotes(&format!("{last_token}{completed_file}"), &prefix, &completions);
    let start_quote = if quoted { "\"" } else { "" };

    let last = tokens.last().cloned().unwrap_or_default();
    let stem = chop_suffix_chars(line, last.chars().count());
    let kept: String = chop_suffix_chars(&last_token, token.chars().count());
    let result = format!("{stem}{last_token_prefix}{start_quote}{kept}{completed_file}");
    (result, completions)
}

/// Complete a wildcard pattern in the last token.
pub fn complete_wildcard(line: &str) -> (String, Vec<String>) {
    let tokens = tokens_of(line);
    let last_token = tokens.last().cloned().unwrap_or_default();
    let token = last_token.replace('"', "");

    let path_sep = if expand_env_vars(&token).contains('/') { '/' } else { '\\' };
    let (path_to_complete, prefix) = split_path(&token, path_sep);
    let dir_to_complete = dir_for(&path_to_complete, path_sep);
    let matcher = wildcard_to_regex(&format!("{prefix}*"));

    let completions = list_matching(&dir_to_complete, path_sep, &matcher);
    if completions.is_empty() {
        return (line.to_string(), Vec::new());
    }

    // What each wildcard consumed, from the last capture group.
    let completed_suffixes: Vec<String> = completions
        .iter()
        .map(|c| {
            matcher
                .captures(c)
                .and_then(|caps| caps.iter().skip(1).flatten().last().map(|m| m.as_str().to_string()))
                .unwrap_or_default()
        })
        .collect();

    let common_string = if completions.len() == 1 {
        completions[0].clone()
    } else {
        format!("{prefix}{}", find_common_prefix(&prefix, &completed_suffixes))
    };
    let completed_file = join_completed(&path_to_complete, path_sep, &common_string);

    let start_quote = if needs_quotes(&completed_file, &prefix, &completions) {
        "\""
    } else {
        ""
    };
    let stem = chop_suffix_chars(line, last_token.chars().count());
    let mut result = format!("{stem}{start_quote}{completed_file}");

    let max_suffix = completed_suffixes.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let closed = completions.len() == 1
        || (!common_string.ends_with('*')
            && max_suffix == common_string.chars().count() - prefix.chars().count());
    if closed {
        let end_quote = start_quote;
        if result.ends_with(path_sep) {
            result.pop();
            result.push_str(end_quote);
            result.push(path_sep);
        } else {
            result.push_str(end_quote);
            result.push(' ');
        }
    }

    (result, completions)
}

/// Complete the name of an environment variable in the last token.
pub fn complete_env_var(line: &str) -> (String, Vec<String>) {
    let tokens = tokens_of(line);
    let full_token = tokens.last().cloned().unwrap_or_default();

    // Account for the VAR=VALUE syntax.
    let (_token_prefix, token_orig) = match full_token.rsplit_once('=') {
        Some((head, tail)) => (format!("{head}="), tail.to_string()),
        None => (String::new(), full_token.clone()),
    };

    let stripped = token_orig.trim_matches('"');
    let percent_count = token_orig.matches('%').count();
    let (lead, prefix) = if percent_count % 2 == 0 && stripped.ends_with('%') {
        let trimmed = stripped.trim_end_matches('%');
        trimmed.rsplit_once('%').unwrap_or(("", trimmed))
    } else {
        stripped.rsplit_once('%').unwrap_or(("", stripped))
    };

    let completions: Vec<String> = if stripped.ends_with('%') && !prefix.is_empty() {
        vec![prefix.to_string()]
    } else {
        let mut vars: Vec<String> = env::vars()
            .map(|(k, _)| k)
            .filter(|k| k.to_lowercase().starts_with(&prefix.to_lowercase()))
            .collect();
        vars.sort();
        vars
    };

    if completions.is_empty() {
        return (line.to_string(), Vec::new());
    }

    let common_string = find_common_prefix(prefix, &completions);
    let quote = if completions
        .iter()
        .any(|c| env::var(c).is_ok_and(|v| contains_special_char(&v)))
    {
        "\""
    } else {
        ""
    };

    let stem = chop_suffix_chars(line, token_orig.chars().count());
    let mut result = format!("{stem}{quote}{lead}%{common_string}");
    if completions.len() == 1 {
        result.push('%');
        result.push_str(quote);
        return (result.clone(), vec![result]);
    }
    (result, completions)
}

/// The longest common prefix of the completions, matched case-insensitively
/// but spelled with the majority original casing.
pub fn find_common_prefix(original: &str, completions: &[String]) -> String {
    if completions.is_empty() {
        return String::new();
    }
    let chars: Vec<Vec<char>> = completions.iter().map(|c| c.chars().collect()).collect();
    let lower: Vec<Vec<char>> = completions
        .iter()
        .map(|c| c.to_lowercase().chars().collect())
        .collect();

    let mut common_len = 0;
    let mut mismatch = false;
    let mut perfect = true;
    while common_len < chars[0].len() && !mismatch {
        common_len += 1;
        for i in 1..chars.len() {
            if lower[i].len() < common_len || lower[i][..common_len] != lower[0][..common_len] {
                mismatch = true;
            } else if chars[i][..common_len] != chars[0][..common_len] {
                perfect = false;
            }
        }
    }
    if mismatch {
        common_len -= 1;
    }
    let mut common_string: String = chars[0][..common_len].iter().collect();

    // Take a guess at the letter casing from entries matching the typed text.
    if !perfect {
        let original_chars: Vec<char> = original.chars().collect();
        for i in 0..original_chars.len() {
            let lead: String = original_chars[..=i].iter().collect();
            match completions.iter().find(|c| c.starts_with(&lead)) {
                Some(case_match) => {
                    common_string = case_match.chars().take(common_len).collect();
                }
                None => break,
            }
        }
    }

    common_string
}

/// Transform a wildcard pattern into an anchored, case-insensitive regex;
/// `?` and `*` become capture groups.
pub fn wildcard_to_regex(pattern: &str) -> Regex {
    let translations = [
        ("\\", "\\\\"),
        ("(", "\\("),
        (")", "\\)"),
        ("[", "\\["),
        ("]", "\\]"),
        ("{", "\\{"),
        ("}", "\\}"),
        (".", "\\."),
        ("+", "\\+"),
        ("^", "\\^"),
        ("$", "\\$"),
        ("?", "(.)"),
        ("*", "(.*)"),
    ];
    let mut re_pattern = pattern.to_string();
    for (src, dest) in translations {
        re_pattern = re_pattern.replace(src, dest);
    }
    // The pattern is fully escaped at this point, compilation cannot fail.
    Regex::new(&format!("(?i)^{re_pattern}$")).unwrap()
}

/// Check whether the given pattern contains wildcards.
pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

fn tokens_of(line: &str) -> Vec<String> {
    let tokens = parse_line(line);
    if tokens.is_empty() {
        vec![String::new()]
    } else {
        tokens
    }
}

fn detect_path_sep(expanded: &str) -> char {
    let fwd = expanded.rfind('/');
    let bck = expanded.rfind('\\');
    match (fwd, bck) {
        (Some(f), Some(b)) => {
            if b >= f {
                '\\'
            } else {
                '/'
            }
        }
        (Some(_), None) => '/',
        (None, Some(_)) => '\\',
        (None, None) => MAIN_SEPARATOR,
    }
}

/// Split a token into the path part and the name prefix being completed.
fn split_path(token: &str, path_sep: char) -> (String, String) {
    match token.rfind(path_sep) {
        Some(pos) => {
            let mut path = token[..pos].to_string();
            let prefix = token[pos + path_sep.len_utf8()..].to_string();
            if path.is_empty() && token.starts_with(path_sep) {
                path = path_sep.to_string();
            }
            (path, prefix)
        }
        None => (String::new(), token.to_string()),
    }
}

fn dir_for(path_to_complete: &str, path_sep: char) -> String {
    if path_to_complete.is_empty() {
        env::current_dir()
            .map(|d| d.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else if path_to_complete == path_sep.to_string() {
        filesystem_root()
    } else {
        format!("{}{}", expand_env_vars(path_to_complete), path_sep)
    }
}

#[cfg(windows)]
fn filesystem_root() -> String {
    env::current_dir()
        .map(|d| d.to_string_lossy().chars().take(3).collect())
        .unwrap_or_else(|_| "C:\\".to_string())
}

#[cfg(unix)]
fn filesystem_root() -> String {
    "/".to_string()
}

/// List directory entries matching the wildcard; directories first with a
/// trailing separator, then files, each group in case-insensitive order.
fn list_matching(dir: &str, path_sep: char, matcher: &Regex) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&name) {
            continue;
        }
        // Follow symlinks the way a user navigating would.
        match fs::metadata(entry.path()) {
            Ok(meta) if meta.is_dir() => dirs.push(format!("{name}{path_sep}")),
            Ok(meta) if meta.is_file() => files.push(name),
            _ => {}
        }
    }
    dirs.sort_by_key(|a| a.to_lowercase());
    files.sort_by_key(|a| a.to_lowercase());
    dirs.extend(files);
    dirs
}

/// Executables from PATH plus interpreter builtins, for a command-start
/// position.
fn command_candidates(matcher: &Regex, prefix: &str, existing: &[String]) -> Vec<String> {
    let mut from_path: Vec<String> = Vec::new();
    if let Some(path) = env::var_os("PATH") {
        for dir in env::split_paths(&path) {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !matcher.is_match(&name)
                    || existing.contains(&name)
                    || from_path.contains(&name)
                {
                    continue;
                }
                #[cfg(windows)]
                let executable = entry.file_type().is_ok_and(|t| t.is_file()) && has_exec_extension(&name);
                #[cfg(unix)]
                let executable = is_executable_file(&entry.path());
                if executable {
                    from_path.push(name);
                }
            }
        }
    }

    for builtin in INTERNAL_COMMANDS {
        if matcher.is_match(builtin)
            && !existing.iter().any(|e| e == builtin)
            && !from_path.iter().any(|e| e == builtin)
        {
            from_path.push(builtin.to_string());
        }
    }
    from_path.sort_by_key(|a| a.to_lowercase());

    // Drop executable extensions when no similarly named command exists.
    #[cfg(windows)]
    let from_path = {
        let stripped: Vec<String> = from_path.iter().map(|e| strip_extension(e).to_string()).collect();
        let mut nice = Vec::with_capacity(from_path.len());
        for (i, name) in from_path.iter().enumerate() {
            let similar = stripped.iter().filter(|s| **s == stripped[i]).count()
                + existing.iter().filter(|e| strip_extension(e) == stripped[i]).count();
            if similar == 1
                && has_exec_extension(name)
                && prefix.chars().count() < name.chars().count() - 3
            {
                nice.push(stripped[i].clone());
            } else {
                nice.push(name.clone());
            }
        }
        nice
    };
    #[cfg(unix)]
    let _ = prefix;

    from_path
}

fn join_completed(path_to_complete: &str, path_sep: char, common_string: &str) -> String {
    if path_to_complete.is_empty() {
        common_string.to_string()
    } else if path_to_complete == path_sep.to_string() {
        format!("{path_sep}{common_string}")
    } else {
        format!("{path_to_complete}{path_sep}{common_string}")
    }
}

fn needs_quotes(completed_file: &str, prefix: &str, completions: &[String]) -> bool {
    expand_env_vars(completed_file).contains(' ')
        || (!prefix.is_empty() && completions.iter().any(|c| contains_special_char(c)))
        || (prefix.is_empty() && completions.iter().any(|c| starts_with_special_char(c)))
}

/// Drop the last `n` characters of a string.
fn chop_suffix_chars(s: &str, n: usize) -> String {
    let total = s.chars().count();
    s.chars().take(total.saturating_sub(n)).collect()
}
