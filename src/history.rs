//! Command history with ranked fuzzy filtering.

use regex::Regex;

/// A history line together with the character spans that matched the filter.
pub type HistoryMatch = (String, Vec<(usize, usize)>);

/// Stores recent input lines and produces ranked fuzzy matches against a
/// filter.
///
/// Filtering builds a ladder of regex patterns of decreasing strictness and
/// walks the history in reverse for each of them, so that stronger and more
/// recent matches are popped first. Navigation pushes visited entries onto a
/// trail, letting the down key reverse the up key exactly.
#[derive(Default)]
pub struct CommandHistory {
    /// The stored command lines, oldest first.
    pub list: Vec<String>,
    /// The active search filter (empty when not navigating).
    pub filter: String,
    filtered_list: Vec<HistoryMatch>,
    trail: Vec<HistoryMatch>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start history navigation with the given filter line.
    pub fn start(&mut self, line: &str) {
        self.filter = line.to_string();

        // A. Split on spaces only; prefix-of-each-word matches come first so
        // acronym filters ("g c m" for "git checkout master") rank highest.
        let words: Vec<String> = line.split_whitespace().map(|w| regex::escape(w)).collect();
        let prefixes: Vec<String> = words.iter().map(|w| format!("({w})[^\\s]*")).collect();
        let mut patterns = vec![
            format!("^{}$", prefixes.join("[\\s]+")),
            prefixes.join("[\\s]+"),
        ];

        // B. Split on alphanumeric runs and allow wider separator classes.
        let words: Vec<String> = alnum_words(line).iter().map(|w| regex::escape(w)).collect();
        let boundary = "[\\s\\.\\-\\\\_]+";
        let prefixes: Vec<String> = words.iter().map(|w| format!("({w})[a-zA-Z0-9]*")).collect();
        let substrings: Vec<String> = words.iter().map(|w| format!("({w}).*")).collect();
        patterns.extend([
            format!("^{}$", prefixes.join(boundary)),
            prefixes.join(boundary),
            format!("({})", regex::escape(line)),
            substrings.join(boundary),
            substrings.concat(),
        ]);

        if words.len() <= 1 {
            // Simple filters would match most of the history under every
            // pattern; the literal-substring tier alone is enough.
            patterns = vec![patterns[4].clone()];
        }

        self.filtered_list.clear();
        for pattern in &patterns {
            let Ok(re) = Regex::new(&format!("(?i){pattern}")) else {
                continue;
            };
            for line in self.list.iter().rev() {
                if self.filtered_list.iter().any(|(l, _)| l == line) {
                    continue;
                }
                if let Some(caps) = re.captures(line) {
                    let spans = caps
                        .iter()
                        .skip(1)
                        .flatten()
                        .map(|m| byte_span_to_chars(line, m.start(), m.end()))
                        .collect();
                    self.filtered_list.insert(0, (line.clone(), spans));
                }
            }
        }

        trace!(
            "history filter {:?} matched {} of {} lines",
            self.filter,
            self.filtered_list.len(),
            self.list.len()
        );

        // Seed the trail so the filter itself is the bottom entry.
        self.trail = vec![(self.filter.clone(), vec![(0, self.filter.chars().count())])];
    }

    /// Navigate back; returns false when no further match is available.
    pub fn up(&mut self) -> bool {
        match self.filtered_list.pop() {
            Some(entry) => {
                self.trail.push(entry);
                true
            }
            None => false,
        }
    }

    /// Navigate forward; returns false when the trail is exhausted.
    pub fn down(&mut self) -> bool {
        match self.trail.pop() {
            Some(entry) => {
                self.filtered_list.push(entry);
                true
            }
            None => false,
        }
    }

    /// The entry navigation currently points at.
    pub fn current(&self) -> HistoryMatch {
        self.trail.last().cloned().unwrap_or_default()
    }

    /// Whether navigation is in progress.
    pub fn navigating(&self) -> bool {
        !self.trail.is_empty()
    }

    /// Remove a line from the history.
    pub fn zap(&mut self, line: &str) {
        self.list.retain(|l| l != line);
        self.reset();
    }

    /// Leave navigation and clear the filter state.
    pub fn reset(&mut self) {
        self.filter.clear();
        self.filtered_list.clear();
        self.trail.clear();
    }

    /// Add a new line; an existing equal line is moved to the end, empty
    /// lines are ignored.
    pub fn add(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }
        self.list.retain(|l| l != line);
        self.list.push(line.to_string());
        self.reset();
    }
}

fn alnum_words(line: &str) -> Vec<String> {
    line.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn byte_span_to_chars(s: &str, start: usize, end: usize) -> (usize, usize) {
    let first = s[..start].chars().count();
    (first, first + s[start..end].chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(lines: &[&str]) -> CommandHistory {
        let mut h = CommandHistory::new();
        for line in lines {
            h.add(line);
        }
        h
    }

    #[test]
    fn add_moves_duplicates_to_the_end() {
        let mut h = history(&["a", "b", "a"]);
        assert_eq!(h.list, ["b", "a"]);
        h.add("b");
        assert_eq!(h.list, ["a", "b"]);
        h.add("");
        assert_eq!(h.list, ["a", "b"]);
    }

    #[test]
    fn acronym_filter_ranks_word_prefixes_first() {
        let mut h = history(&["git checkout master", "git commit -m fix", "cd ~/projects"]);
        h.start("g c");
        assert!(h.up());
        assert_eq!(h.current().0, "git commit -m fix");
        assert!(h.up());
        assert_eq!(h.current().0, "git checkout master");
    }

    #[test]
    fn down_reverses_up_exactly() {
        let mut h = history(&["make test", "make all", "ls"]);
        h.start("make");
        assert!(h.up());
        let first = h.current();
        assert!(h.up());
        assert!(h.down());
        assert_eq!(h.current(), first);
        assert!(h.down());
        assert_eq!(h.current().0, "make");
        // Walking past the filter seed leaves an empty line.
        assert!(h.down());
        assert_eq!(h.current().0, "");
        assert!(!h.down());
    }

    #[test]
    fn up_without_match_fails() {
        let mut h = history(&["ls -l"]);
        h.start("zzz");
        assert!(!h.up());
        assert_eq!(h.current().0, "zzz");
    }

    #[test]
    fn match_spans_cover_the_filter_words() {
        let mut h = history(&["git checkout master"]);
        h.start("git check");
        assert!(h.up());
        let (line, spans) = h.current();
        assert_eq!(line, "git checkout master");
        assert_eq!(spans, vec![(0, 3), (4, 9)]);
    }

    #[test]
    fn zap_removes_the_entry() {
        let mut h = history(&["one", "two"]);
        h.zap("one");
        assert_eq!(h.list, ["two"]);
    }

    #[test]
    fn single_word_filter_uses_substring_tier() {
        let mut h = history(&["xclock", "clock", "documents"]);
        h.start("loc");
        assert!(h.up());
        // Reverse traversal: most recent match first.
        assert_eq!(h.current().0, "clock");
        assert!(h.up());
        assert_eq!(h.current().0, "xclock");
        assert!(!h.up());
    }
}
