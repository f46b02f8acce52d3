//! The default prompt: an abbreviated, still unambiguous current path.

use std::env;
use std::fs;
use std::path::MAIN_SEPARATOR;

/// Abbreviate a string by keeping uppercase and non-alphabetical characters,
/// plus the first letter of each word (CamelCase, underscores, spaces).
pub fn abbrev_string(s: &str) -> String {
    let all_upper = s.chars().all(|c| !c.is_alphabetic() || c.is_uppercase());
    let mut result = String::new();
    let mut add_next = true;
    for c in s.chars() {
        let mut add_this = add_next;
        if c == ' ' {
            add_this = false;
            add_next = true;
        } else if !c.is_alphabetic() {
            add_this = true;
            add_next = true;
        } else if c.is_uppercase() && !all_upper {
            add_this = true;
            add_next = false;
        } else {
            add_next = false;
        }
        if add_this {
            result.push(c);
        }
    }
    result
}

/// Abbreviate a full path while keeping it unambiguous: a path element keeps
/// its short form only when no sibling directory shares that abbreviation.
pub fn abbrev_path(path: &str) -> String {
    let sep = MAIN_SEPARATOR;
    let (root, rest) = split_root(path);

    let elements: Vec<&str> = rest.split(sep).collect();
    let Some((last, intermediate)) = elements.split_last() else {
        return root.to_string();
    };

    let mut current_dir = root.to_string();
    let mut path_abbrev = root.trim_end_matches(sep).to_string();

    for elem in intermediate {
        let mut elem_abbrev = abbrev_string(elem);
        if let Ok(entries) = fs::read_dir(&current_dir) {
            for entry in entries.flatten() {
                let other = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().is_ok_and(|t| t.is_dir())
                    && abbrev_string(&other).to_lowercase() == elem_abbrev.to_lowercase()
                    && other.to_lowercase() != elem.to_lowercase()
                {
                    // A sibling shares the abbreviation; keep the full name.
                    elem_abbrev = elem.to_string();
                    break;
                }
            }
        }
        current_dir = format!("{}{sep}{elem}", current_dir.trim_end_matches(sep));
        path_abbrev.push(sep);
        path_abbrev.push_str(&elem_abbrev);
    }

    path_abbrev.push(sep);
    path_abbrev.push_str(last);
    path_abbrev
}

#[cfg(windows)]
fn split_root(path: &str) -> (&str, &str) {
    // Keep the drive specification ("C:\") verbatim.
    if path.len() >= 3 && path.as_bytes()[1] == b':' {
        (&path[..3], &path[3..])
    } else {
        ("", path)
    }
}

#[cfg(unix)]
fn split_root(path: &str) -> (&str, &str) {
    match path.strip_prefix('/') {
        Some(rest) => ("/", rest),
        None => ("", path),
    }
}

/// The default prompt: the abbreviated current path followed by `> `.
pub fn prompt() -> String {
    let cwd = env::current_dir()
        .map(|d| d.to_string_lossy().into_owned())
        .unwrap_or_default();
    #[cfg(windows)]
    let cwd = {
        let mut chars = cwd.chars();
        match chars.next() {
            Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
            None => cwd,
        }
    };
    format!("{}> ", abbrev_path(&cwd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abbreviations_keep_word_initials() {
        assert_eq!(abbrev_string("Documents and Settings"), "DaS");
        assert_eq!(abbrev_string("CamelCaseName"), "CCN");
        assert_eq!(abbrev_string("snake_case_name"), "s_c_n");
        assert_eq!(abbrev_string("UPPER"), "U");
        assert_eq!(abbrev_string("x86"), "x86");
    }

    #[cfg(unix)]
    #[test]
    fn ambiguous_elements_keep_their_full_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Program Files/nested")).unwrap();
        std::fs::create_dir(dir.path().join("Python Facts")).unwrap();

        let full = format!("{}/Program Files/nested", dir.path().display());
        let abbrev = abbrev_path(&full);
        // "Program Files" and "Python Facts" share the abbreviation "PF", so
        // the element is spelled out.
        assert!(abbrev.ends_with("/Program Files/nested"), "{abbrev}");
    }

    #[cfg(unix)]
    #[test]
    fn unambiguous_elements_are_abbreviated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("Program Files/nested")).unwrap();

        let full = format!("{}/Program Files/nested", dir.path().display());
        let abbrev = abbrev_path(&full);
        assert!(abbrev.ends_with("/PF/nested"), "{abbrev}");
    }
}
