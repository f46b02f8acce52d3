//! Persisted state: data directory, history files, temp files and crash
//! reports.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::NamedTempFile;

use crate::parse::expand_env_vars;

/// Locate (and create if needed) the per-user data directory, with a `tmp/`
/// subdirectory for per-session files.
pub fn data_dir() -> io::Result<PathBuf> {
    #[cfg(windows)]
    let base = {
        // %APPDATA% is not always defined (e.g. under runas.exe).
        if std::env::var_os("APPDATA").is_some() {
            expand_env_vars("%APPDATA%\\rcmd")
        } else {
            expand_env_vars("%USERPROFILE%\\Application Data\\rcmd")
        }
    };
    #[cfg(unix)]
    let base = expand_env_vars("~/.rcmd");

    let dir = PathBuf::from(base);
    fs::create_dir_all(dir.join("tmp"))?;
    Ok(dir)
}

/// Read a history file: one entry per line, most recent last. A missing file
/// only warrants a warning.
pub fn read_history(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(text) => text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect(),
        Err(_) => {
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            eprintln!("Warning: Can't open {}!\r", name.unwrap_or_default());
            Vec::new()
        }
    }
}

/// Append a line to a history file, moving an existing occurrence to the end
/// and truncating the file to `limit` entries. The file is rewritten
/// atomically via a temp file in the same directory.
pub fn update_history(line: &str, path: &Path, limit: usize) -> io::Result<()> {
    let mut entries: Vec<String> = match fs::read_to_string(path) {
        Ok(text) => text.lines().map(|l| l.trim_end_matches('\r').to_string()).collect(),
        Err(_) => Vec::new(),
    };
    entries.retain(|l| l != line);
    entries.push(line.to_string());
    if entries.len() > limit {
        entries.drain(..entries.len() - limit);
    }

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    for entry in &entries {
        writeln!(tmp, "{entry}")?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Replace a history file wholesale (e.g. after zapping an entry).
pub fn write_history(entries: &[String], path: &Path, limit: usize) -> io::Result<()> {
    let keep = entries.len().min(limit);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    for entry in &entries[entries.len() - keep..] {
        writeln!(tmp, "{entry}")?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create the per-session temp file used for the environment dump.
pub fn session_tmpfile(data_dir: &Path) -> io::Result<NamedTempFile> {
    NamedTempFile::new_in(data_dir.join("tmp"))
}

/// Write an unhandled-error report to a timestamped crash file and return
/// its path.
pub fn write_crash_report(data_dir: &Path, report: &str) -> io::Result<PathBuf> {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = data_dir.join(format!("crash-{stamp}.log"));
    fs::write(&path, report)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_history_dedups_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        update_history("one", &path, 3).unwrap();
        update_history("two", &path, 3).unwrap();
        update_history("three", &path, 3).unwrap();
        update_history("one", &path, 3).unwrap();
        assert_eq!(read_history(&path), ["two", "three", "one"]);

        update_history("four", &path, 3).unwrap();
        assert_eq!(read_history(&path), ["three", "one", "four"]);
    }

    #[test]
    fn read_history_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_history(&dir.path().join("absent")).is_empty());
    }

    #[test]
    fn crash_reports_are_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_crash_report(dir.path(), "boom").unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("crash-"));
        assert!(name.ends_with(".log"));
        assert_eq!(fs::read_to_string(path).unwrap(), "boom");
    }
}
