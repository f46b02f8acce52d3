//! Directory history, somewhat similar to a browser history.

use std::env;
use std::path::Path;

/// A bounded, ordered set of visited directories with a current index.
///
/// The `keep` flag marks the current entry as committed (a command was
/// executed there); an uncommitted entry is overwritten by the next visit
/// instead of being preserved.
pub struct DirHistory {
    /// Visited locations; after [`visit_cwd`](Self::visit_cwd) the current
    /// directory is the last entry.
    pub locations: Vec<String>,
    /// Index of the current location.
    pub index: usize,
    /// Whether the current entry has been committed by executing a command.
    pub keep: bool,
    /// Hard cap on the history length.
    pub max_len: usize,
}

impl Default for DirHistory {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            index: 0,
            keep: false,
            max_len: 9,
        }
    }
}

impl DirHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the process CWD in the history.
    pub fn visit_cwd(&mut self) {
        if let Ok(cwd) = env::current_dir() {
            self.visit(&cwd.to_string_lossy());
        }
    }

    /// Record `cwd` as the current location.
    ///
    /// Revisiting the current entry is a no-op. Otherwise the entry is
    /// inserted after the current one when it is committed, or overwrites it
    /// when it is not; duplicates are removed, the list is rotated so the
    /// current directory is last and truncated to `max_len`.
    pub fn visit(&mut self, cwd: &str) {
        if let Some(current) = self.locations.get(self.index) {
            if eq_nocase(current, cwd) {
                return;
            }
        }

        if self.locations.is_empty() {
            self.locations.push(cwd.to_string());
            self.index = 0;
        } else if self.keep {
            self.locations.insert(self.index + 1, cwd.to_string());
            self.index += 1;
        } else {
            self.locations[self.index] = cwd.to_string();
        }

        // Drop other occurrences of the current directory.
        let current = self.locations[self.index].clone();
        let mut i = 0;
        while i < self.locations.len() {
            if i != self.index && eq_nocase(&self.locations[i], &current) {
                self.locations.remove(i);
                if i < self.index {
                    self.index -= 1;
                }
            } else {
                i += 1;
            }
        }

        // Rotate so the current directory is the last entry.
        let len = self.locations.len();
        self.locations.rotate_left((self.index + 1) % len);
        while self.locations.len() > self.max_len {
            self.locations.remove(0);
        }
        self.index = self.locations.len() - 1;
        self.keep = false;
    }

    /// Go to the previous location, wrapping around; returns whether the CWD
    /// changed.
    pub fn go_left(&mut self) -> bool {
        if self.locations.is_empty() {
            return false;
        }
        self.index = self.index.checked_sub(1).unwrap_or(self.locations.len() - 1);
        self.apply()
    }

    /// Go to the next location, wrapping around; returns whether the CWD
    /// changed.
    pub fn go_right(&mut self) -> bool {
        if self.locations.is_empty() {
            return false;
        }
        self.index += 1;
        if self.index >= self.locations.len() {
            self.index = 0;
        }
        self.apply()
    }

    /// Jump to the 1-based entry `n`; 9 selects the last entry.
    pub fn jump(&mut self, n: usize) -> bool {
        let target = if n == 9 {
            self.locations.len().saturating_sub(1)
        } else {
            n.saturating_sub(1)
        };
        if target >= self.locations.len() {
            return false;
        }
        self.index = target;
        self.apply()
    }

    /// Change to the currently selected directory; a stale entry is dropped
    /// from the history instead of aborting.
    fn apply(&mut self) -> bool {
        let target = &self.locations[self.index];
        match env::set_current_dir(Path::new(target)) {
            Ok(()) => true,
            Err(err) => {
                warn!("dir history: cannot enter {target}: {err}");
                self.locations.remove(self.index);
                self.index = match self.index.checked_sub(1) {
                    Some(i) => i,
                    None => self.locations.len().saturating_sub(1),
                };
                false
            }
        }
    }
}

fn eq_nocase(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(locations: &[&str], index: usize, keep: bool) -> DirHistory {
        DirHistory {
            locations: locations.iter().map(|s| s.to_string()).collect(),
            index,
            keep,
            max_len: 9,
        }
    }

    #[test]
    fn revisit_of_current_is_a_noop() {
        let mut h = hist(&["A", "B"], 1, true);
        h.visit("b");
        assert_eq!(h.locations, ["A", "B"]);
        assert_eq!(h.index, 1);
        assert!(h.keep);
    }

    #[test]
    fn committed_entry_survives_a_visit() {
        let mut h = hist(&["A", "B", "C"], 2, true);
        h.visit("A");
        assert_eq!(h.locations, ["B", "C", "A"]);
        assert_eq!(h.index, 2);
        assert!(!h.keep);
    }

    #[test]
    fn uncommitted_entry_is_overwritten() {
        let mut h = hist(&["B", "C", "A"], 1, false);
        h.visit("D");
        assert_eq!(h.locations, ["A", "B", "D"]);
        assert_eq!(h.index, 2);
    }

    #[test]
    fn duplicates_are_removed_modulo_case() {
        let mut h = hist(&["a", "B", "C"], 2, true);
        h.visit("A");
        assert_eq!(h.locations, ["B", "C", "A"]);
        assert_eq!(h.index, 2);
    }

    #[test]
    fn history_is_truncated_to_max_len() {
        let mut h = hist(&["A", "B", "C"], 2, true);
        h.max_len = 3;
        h.visit("D");
        assert_eq!(h.locations, ["B", "C", "D"]);
        assert_eq!(h.index, 2);
    }

    #[test]
    fn first_visit_populates_the_history() {
        let mut h = DirHistory::new();
        h.visit("A");
        assert_eq!(h.locations, ["A"]);
        assert_eq!(h.index, 0);
    }
}
