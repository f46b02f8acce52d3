//! The input-line state machine.
//!
//! The line is a character buffer split at the cursor into `before_cursor`
//! and `after_cursor`. On top of that sit text selection, incremental search,
//! two independent undo histories, overwrite mode and dynamic abbreviation
//! expansion from the command history.

mod action;
mod extend;

pub use action::Action;

use indexmap::IndexSet;

use crate::history::CommandHistory;
use crate::parse::is_word_sep;

/// State of the input line and everything needed to edit it.
pub struct InputState {
    /// The prompt preceding the line on screen.
    pub prompt: String,
    /// Characters before the cursor.
    pub before_cursor: String,
    /// Characters after the cursor.
    pub after_cursor: String,

    /// Mirror of the previous state, for minimal repaint.
    pub prev_prompt: String,
    pub prev_before_cursor: String,
    pub prev_after_cursor: String,

    /// An error needs to be notified with a bell.
    pub bell: bool,
    /// Typing overwrite mode.
    pub overwrite: bool,

    /// The command history.
    pub history: CommandHistory,

    /// Anchor of the text selection, as a character index into the full line.
    pub selection_start: usize,

    /// Line, stub and candidates of an expansion in progress.
    expand_line: String,
    expand_stub: String,
    expand_matches: Vec<String>,

    /// Classic undo/redo pairs, plus the Emacs-style rotating history.
    undo: Vec<(String, String)>,
    redo: Vec<(String, String)>,
    undo_emacs: Vec<(String, String)>,
    undo_emacs_index: isize,
    last_action: Option<Action>,

    /// Frames pushed by each selection-extension step.
    selection_history: Vec<extend::ExtendFrame>,
    /// Separators the next extension step will consume.
    extend_separators: Option<Vec<char>>,

    /// The incremental-search filter; `Some` while search mode is active.
    pub search_substr: Option<String>,
    search_rev: bool,

    /// Internal clipboard for cut/copy/paste.
    clipboard: String,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            prompt: String::new(),
            before_cursor: String::new(),
            after_cursor: String::new(),
            prev_prompt: String::new(),
            prev_before_cursor: String::new(),
            prev_after_cursor: String::new(),
            bell: false,
            overwrite: false,
            history: CommandHistory::new(),
            selection_start: 0,
            expand_line: String::new(),
            expand_stub: String::new(),
            expand_matches: Vec::new(),
            undo: Vec::new(),
            redo: Vec::new(),
            undo_emacs: Vec::new(),
            undo_emacs_index: -1,
            last_action: None,
            selection_history: Vec::new(),
            extend_separators: None,
            search_substr: None,
            search_rev: false,
            clipboard: String::new(),
        }
    }

    /// Snapshot the current state before a new key event.
    pub fn step_line(&mut self) {
        self.prev_prompt = self.prompt.clone();
        self.prev_before_cursor = self.before_cursor.clone();
        self.prev_after_cursor = self.after_cursor.clone();
    }

    /// Prepare for a new input line.
    pub fn reset_line(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
        self.before_cursor.clear();
        self.after_cursor.clear();
        self.overwrite = false;
        self.reset_prev_line();
    }

    /// Reset the previous line so the current line repaints as new.
    pub fn reset_prev_line(&mut self) {
        self.prev_prompt.clear();
        self.prev_before_cursor.clear();
        self.prev_after_cursor.clear();
    }

    /// Whether a repaint-worthy change has occurred since the last snapshot.
    pub fn changed(&self) -> bool {
        self.prompt != self.prev_prompt
            || self.before_cursor != self.prev_before_cursor
            || self.after_cursor != self.prev_after_cursor
    }

    /// The full visible line.
    pub fn line(&self) -> String {
        format!("{}{}", self.before_cursor, self.after_cursor)
    }

    /// Handle a keyboard action.
    pub fn handle(&mut self, action: Action) {
        self.step_line();

        // Expansion state is only valid across consecutive Expand actions.
        if !matches!(action, Action::Expand) {
            self.expand_matches.clear();
        }

        match &action {
            Action::Left { select } => self.key_left(*select),
            Action::Right { select } => self.key_right(*select),
            Action::LeftWord { select } => self.key_left_word(*select),
            Action::RightWord { select } => self.key_right_word(*select),
            Action::Home { select } => self.key_home(*select),
            Action::End { select } => self.key_end(*select),
            Action::SearchRight => self.key_search_right(),
            Action::SearchLeft => self.key_search_left(),
            Action::SelectUp => self.key_extend_selection(),
            Action::SelectDown => self.key_shrink_selection(),
            Action::Copy => self.key_copy(),
            Action::Cut => self.key_cut(),
            Action::Paste => self.key_paste(),
            Action::Prev => self.key_up(),
            Action::Next => self.key_down(),
            Action::Insert(text) => self.key_insert(text),
            Action::Complete(completed) => self.key_complete(completed),
            Action::Delete => self.key_del(),
            Action::DeleteWord => self.key_del_word(),
            Action::Backspace => self.key_backspace(),
            Action::BackspaceWord => self.key_backspace_word(),
            Action::KillEol => self.key_kill_line(),
            Action::Escape => self.key_esc(),
            Action::Undo => self.key_undo(),
            Action::Redo => self.key_redo(),
            Action::UndoEmacs => self.key_undo_emacs(),
            Action::Expand => self.key_expand(),
            Action::ToggleOverwrite => self.overwrite = !self.overwrite,
        }

        // Record the previous state on the undo stacks when needed. Each
        // style of undo also pushes onto the other style's stack, so the two
        // histories never lose each other's changes.
        if self.changed() {
            let grouped = |last: &Option<Action>| {
                action.is_batch()
                    || ((action.is_insert() || action.is_delete())
                        && !last.as_ref().is_some_and(|l| l.same_kind(&action)))
            };
            if grouped(&self.last_action) || matches!(action, Action::UndoEmacs) {
                self.undo
                    .push((self.prev_before_cursor.clone(), self.prev_after_cursor.clone()));
                self.redo.clear();
            }
            if grouped(&self.last_action) || matches!(action, Action::Undo) {
                self.undo_emacs
                    .push((self.prev_before_cursor.clone(), self.prev_after_cursor.clone()));
                self.undo_emacs_index = -1;
            }
        }

        self.last_action = Some(action);
    }

    fn key_left(&mut self, select: bool) {
        if let Some(c) = self.before_cursor.pop() {
            self.after_cursor.insert(0, c);
        }
        if !select {
            self.reset_selection();
        }
        self.history.reset();
        self.search_substr = None;
    }

    fn key_right(&mut self, select: bool) {
        if !self.after_cursor.is_empty() {
            let c = self.after_cursor.remove(0);
            self.before_cursor.push(c);
        }
        if !select {
            self.reset_selection();
        }
        self.history.reset();
        self.search_substr = None;
    }

    fn key_home(&mut self, select: bool) {
        self.after_cursor = self.line();
        self.before_cursor.clear();
        if !select {
            self.reset_selection();
        }
        self.history.reset();
        self.search_substr = None;
    }

    fn key_end(&mut self, select: bool) {
        let line = self.line();
        self.before_cursor = line;
        self.after_cursor.clear();
        if !select {
            self.reset_selection();
        }
        self.history.reset();
        self.search_substr = None;
    }

    fn key_left_word(&mut self, select: bool) {
        while self.before_cursor.chars().next_back().is_some_and(is_word_sep) {
            self.key_left(select);
        }
        while self
            .before_cursor
            .chars()
            .next_back()
            .is_some_and(|c| !is_word_sep(c))
        {
            self.key_left(select);
        }
    }

    fn key_right_word(&mut self, select: bool) {
        while self.after_cursor.chars().next().is_some_and(is_word_sep) {
            self.key_right(select);
        }
        while self.after_cursor.chars().next().is_some_and(|c| !is_word_sep(c)) {
            self.key_right(select);
        }
    }

    fn key_backspace_word(&mut self) {
        if !self.selection().is_empty() {
            self.delete_selection();
        } else {
            while self.before_cursor.chars().next_back().is_some_and(is_word_sep) {
                self.key_backspace();
            }
            while self
                .before_cursor
                .chars()
                .next_back()
                .is_some_and(|c| !is_word_sep(c))
            {
                self.key_backspace();
            }
        }
    }

    fn key_del_word(&mut self) {
        if !self.selection().is_empty() {
            self.delete_selection();
        } else {
            while self.after_cursor.chars().next().is_some_and(is_word_sep) {
                self.key_del();
            }
            while self.after_cursor.chars().next().is_some_and(|c| !is_word_sep(c)) {
                self.key_del();
            }
        }
    }

    fn key_del(&mut self) {
        if !self.selection().is_empty() {
            self.delete_selection();
        } else {
            if !self.after_cursor.is_empty() {
                self.after_cursor.remove(0);
            }
            self.history.reset();
            self.reset_selection();
        }
    }

    fn key_backspace(&mut self) {
        if !self.selection().is_empty() {
            self.delete_selection();
        } else {
            self.before_cursor.pop();
            self.history.reset();
            self.reset_selection();
        }
    }

    fn key_kill_line(&mut self) {
        if !self.selection().is_empty() {
            self.delete_selection();
        } else {
            self.after_cursor.clear();
        }
        self.history.reset();
    }

    fn key_up(&mut self) {
        self.undo.clear();
        self.redo.clear();

        if !self.history.navigating() {
            self.history.start(&self.line());
        }
        if !self.history.up() {
            self.bell = true;
        }
        self.before_cursor = self.history.current().0;
        self.after_cursor.clear();
        self.reset_selection();
    }

    fn key_down(&mut self) {
        self.undo.clear();
        self.redo.clear();

        if self.history.down() {
            self.before_cursor = self.history.current().0;
            self.after_cursor.clear();
        } else {
            self.bell = true;
        }
        self.reset_selection();
    }

    fn key_esc(&mut self) {
        if !self.selection().is_empty() || self.search_substr.is_some() {
            self.reset_selection();
        } else if !self.history.filter.is_empty() {
            self.history.reset();
        } else {
            // Clear the line, but keep it in the history.
            let line = self.line();
            self.history.add(&line);
            self.before_cursor.clear();
            self.after_cursor.clear();
        }
    }

    fn key_copy(&mut self) {
        self.clipboard = self.selection();
        self.history.reset();
    }

    fn key_cut(&mut self) {
        self.key_copy();
        self.delete_selection();
        self.history.reset();
    }

    fn key_paste(&mut self) {
        let mut text = self.clipboard.clone();
        // Purge garbage some applications leave in the clipboard.
        if let Some(nul) = text.find('\0') {
            text.truncate(nul);
        }
        let text = text.replace('\r', "").replace('\n', " ");

        if !self.selection().is_empty() {
            self.delete_selection();
        }
        self.before_cursor.push_str(&text);
        if self.overwrite {
            chop_front(&mut self.after_cursor, text.chars().count());
        }
        self.reset_selection();
        self.history.reset();
    }

    /// Replace the clipboard contents (e.g. from the host clipboard).
    pub fn set_clipboard(&mut self, text: &str) {
        self.clipboard = text.to_string();
    }

    /// The current clipboard contents.
    pub fn clipboard(&self) -> &str {
        &self.clipboard
    }

    fn key_insert(&mut self, text: &str) {
        self.history.reset();

        if let Some(substr) = self.search_substr.as_mut() {
            substr.push_str(text);
            if starts_with_nocase(&self.after_cursor, text) {
                let moved: String = self.after_cursor.chars().take(text.chars().count()).collect();
                chop_front(&mut self.after_cursor, text.chars().count());
                self.before_cursor.push_str(&moved);
            } else {
                self.advance_search();
            }
        } else {
            if !self.selection().is_empty() {
                self.delete_selection();
            }
            self.before_cursor.push_str(text);
            if self.overwrite {
                chop_front(&mut self.after_cursor, text.chars().count());
            }
            self.reset_selection();
        }
    }

    fn key_complete(&mut self, completed: &str) {
        // Collapse separators that would otherwise appear twice when the
        // suffix after the cursor starts with them.
        if (completed.ends_with(' ') && self.after_cursor.starts_with(' '))
            || (completed.ends_with('\\') && self.after_cursor.starts_with('\\'))
        {
            chop_front(&mut self.after_cursor, 1);
        }
        if (completed.ends_with("\"\\") && self.after_cursor.starts_with("\"\\"))
            || (completed.ends_with("\" ") && self.after_cursor.starts_with("\" "))
        {
            chop_front(&mut self.after_cursor, 2);
        }
        let chars_added =
            completed.chars().count() as isize - self.before_cursor.chars().count() as isize;
        self.before_cursor = completed.to_string();
        if self.overwrite && chars_added > 0 {
            chop_front(&mut self.after_cursor, chars_added as usize);
        }
        self.reset_selection();
        self.history.reset();
    }

    fn key_undo(&mut self) {
        if let Some((before, after)) = self.undo.pop() {
            self.redo
                .push((self.before_cursor.clone(), self.after_cursor.clone()));
            self.selection_start = before.chars().count();
            self.before_cursor = before;
            self.after_cursor = after;
        }
    }

    fn key_redo(&mut self) {
        if let Some((before, after)) = self.redo.pop() {
            self.undo
                .push((self.before_cursor.clone(), self.after_cursor.clone()));
            self.selection_start = before.chars().count();
            self.before_cursor = before;
            self.after_cursor = after;
        }
    }

    fn key_undo_emacs(&mut self) {
        if self.undo_emacs.is_empty() {
            return;
        }
        if !matches!(self.last_action, Some(Action::UndoEmacs)) {
            self.undo_emacs
                .push((self.before_cursor.clone(), self.after_cursor.clone()));
            self.undo_emacs_index -= 1;
        }

        let pos = self.undo_emacs.len() as isize + self.undo_emacs_index;
        if pos >= 0 {
            let (before, after) = self.undo_emacs[pos as usize].clone();
            self.selection_start = before.chars().count();
            self.before_cursor = before;
            self.after_cursor = after;
            self.undo_emacs_index -= 1;
        }
    }

    fn key_expand(&mut self) {
        if self.expand_matches.is_empty() || !matches!(self.last_action, Some(Action::Expand)) {
            // Partition the text before the cursor into a stub (the word
            // being expanded) and its left neighbour, the context.
            self.expand_line = self.before_cursor.clone();
            let mut words: Vec<&str> = vec![""];
            words.extend(self.expand_line.split(' '));
            let stub = words[words.len() - 1].to_string();
            let context = words[words.len() - 2].to_string();
            let stub_lower = stub.to_lowercase();
            let context_lower = context.to_lowercase();

            let mut context_matches: Vec<String> = Vec::new();
            let mut other_matches: Vec<String> = Vec::new();
            for line in self.history.list.iter().rev() {
                let mut line_words: Vec<&str> = vec![""];
                line_words.extend(line.split(' '));
                for i in (1..line_words.len()).rev() {
                    let word = line_words[i];
                    let neighbour = line_words[i - 1];
                    let word_lower = word.to_lowercase();
                    if word_lower.starts_with(&stub_lower) && word_lower != stub_lower {
                        if neighbour.to_lowercase() == context_lower {
                            context_matches.push(word.to_string());
                        } else {
                            other_matches.push(word.to_string());
                        }
                    }
                }
            }

            let deduped: IndexSet<String> =
                context_matches.into_iter().chain(other_matches).collect();
            self.expand_stub = stub;
            self.expand_matches = deduped.into_iter().collect();
            self.expand_matches.push(self.expand_stub.clone());
            self.expand_matches.reverse();
        }

        // Consume one candidate per keystroke.
        let candidate = self.expand_matches.last().cloned().unwrap_or_default();
        let old_len = self.before_cursor.chars().count();
        let base = self
            .expand_line
            .strip_suffix(&self.expand_stub)
            .unwrap_or(&self.expand_line);
        self.before_cursor = format!("{base}{candidate}");
        if self.overwrite {
            let added = self.before_cursor.chars().count() as isize - old_len as isize;
            if added > 0 {
                chop_front(&mut self.after_cursor, added as usize);
            }
        }
        self.reset_selection();
        self.history.reset();
        self.expand_matches.pop();
    }

    /// Reset text selection, search and extension state.
    pub fn reset_selection(&mut self) {
        self.selection_start = self.before_cursor.chars().count();
        self.search_substr = None;
        self.extend_separators = None;
        self.selection_history.clear();
    }

    fn delete_selection(&mut self) {
        let len_before = self.before_cursor.chars().count();
        if self.selection_start < len_before {
            self.before_cursor = self.before_cursor.chars().take(self.selection_start).collect();
        } else {
            chop_front(&mut self.after_cursor, self.selection_start - len_before);
        }
        self.reset_selection();
    }

    /// The start and end character indexes of the selection.
    pub fn selection_range(&self) -> (usize, usize) {
        let len_before = self.before_cursor.chars().count();
        (
            len_before.min(self.selection_start),
            len_before.max(self.selection_start),
        )
    }

    /// The currently selected text.
    pub fn selection(&self) -> String {
        let (start, end) = self.selection_range();
        self.line().chars().skip(start).take(end - start).collect()
    }

    fn key_search_right(&mut self) {
        if self.line().trim().is_empty() {
            self.bell = true;
            return;
        }
        self.search_rev = false;
        match &self.search_substr {
            None => self.search_substr = Some(String::new()),
            Some(s) if !s.is_empty() => self.search_right_next(),
            _ => {}
        }
    }

    fn key_search_left(&mut self) {
        if self.line().trim().is_empty() {
            self.bell = true;
            return;
        }
        self.search_rev = true;
        match &self.search_substr {
            None => self.search_substr = Some(String::new()),
            Some(s) if !s.is_empty() => self.search_left_prev(),
            _ => {}
        }
    }

    fn advance_search(&mut self) {
        if self.search_rev {
            self.search_left_prev();
        } else {
            self.search_right_next();
        }
    }

    fn search_right_next(&mut self) {
        let Some(substr) = self.search_substr.clone() else {
            return;
        };
        let after: Vec<char> = self.after_cursor.chars().collect();
        let needle: Vec<char> = substr.chars().collect();
        let Some(pos) = find_chars_nocase(&after, &needle, 0, after.len()) else {
            self.bell = true;
            return;
        };
        self.selection_start = self.before_cursor.chars().count() + pos;
        let moved = pos + needle.len();
        let taken: String = after[..moved].iter().collect();
        self.before_cursor.push_str(&taken);
        self.after_cursor = after[moved..].iter().collect();
    }

    fn search_left_prev(&mut self) {
        let Some(substr) = self.search_substr.clone() else {
            return;
        };
        let before: Vec<char> = self.before_cursor.chars().collect();
        let needle: Vec<char> = substr.chars().collect();
        // The last character is excluded so repeated searches make progress.
        let limit = before.len().saturating_sub(1);
        let Some(pos) = rfind_chars_nocase(&before, &needle, limit) else {
            self.bell = true;
            return;
        };
        self.selection_start = pos;
        let split = pos + needle.len();
        let tail: String = before[split..].iter().collect();
        self.before_cursor = before[..split].iter().collect();
        self.after_cursor = format!("{tail}{}", self.after_cursor);
    }
}

fn chars_eq_nocase(a: char, b: char) -> bool {
    a.to_lowercase().eq(b.to_lowercase())
}

fn starts_with_nocase(s: &str, prefix: &str) -> bool {
    let mut sc = s.chars();
    prefix.chars().all(|p| sc.next().is_some_and(|c| chars_eq_nocase(c, p)))
}

fn find_chars_nocase(haystack: &[char], needle: &[char], from: usize, to: usize) -> Option<usize> {
    if needle.is_empty() || to < needle.len() {
        return None;
    }
    (from..=to - needle.len()).find(|&p| {
        needle
            .iter()
            .zip(&haystack[p..])
            .all(|(a, b)| chars_eq_nocase(*a, *b))
    })
}

fn rfind_chars_nocase(haystack: &[char], needle: &[char], limit: usize) -> Option<usize> {
    if needle.is_empty() || limit < needle.len() {
        return None;
    }
    (0..=limit - needle.len()).rev().find(|&p| {
        needle
            .iter()
            .zip(&haystack[p..])
            .all(|(a, b)| chars_eq_nocase(*a, *b))
    })
}

/// Remove the first `n` characters of a string in place.
fn chop_front(s: &mut String, n: usize) {
    if n == 0 {
        return;
    }
    *s = s.chars().skip(n).collect();
}
