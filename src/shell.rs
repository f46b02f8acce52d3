//! The interactive loop: reads key events, drives the input-line state
//! machine, the histories and completion, and hands accepted lines to the
//! execution bridge.

use std::env;
use std::path::PathBuf;

use color_eyre::eyre::Result;
use tempfile::NamedTempFile;

#[cfg(unix)]
use crate::bridge::posix::PosixBridge as Backend;
#[cfg(windows)]
use crate::bridge::windows::CmdBridge as Backend;
use crate::bridge::{self, BridgeError, PSEUDO_VARS, is_pure_cd};
use crate::complete::{
    complete_env_var, complete_file, complete_wildcard, find_common_prefix, has_wildcards,
    wildcard_to_regex,
};
use crate::config::Settings;
use crate::console::attr::color::{back, fore};
use crate::console::attr::visible_len;
use crate::console::{Console, CursorShape, InputQueue, Key, KeyPress};
use crate::dirs::DirHistory;
use crate::edit::{Action, InputState};
use crate::options::CliOptions;
use crate::parse::{expand_env_vars, parse_line, unescape};
use crate::prompt;
use crate::store;
use crate::window::{Outcome, Window};

const SAVE_HISTORY_LIMIT: usize = 2000;

/// What to do after a command ran.
enum Flow {
    Continue,
    Exit(String),
}

/// How one round of line editing ended.
enum ReadOutcome {
    /// A line was accepted with Enter.
    Line(String),
    /// Show a fresh prompt without executing anything.
    Reprompt,
    /// Leave the shell (Ctrl-D on an empty line, dead interpreter).
    Exit(String),
}

pub struct Shell {
    state: InputState,
    dir_hist: DirHistory,
    console: Console,
    input: InputQueue,
    settings: Settings,
    backend: Backend,
    data_dir: PathBuf,
    /// Holds the env-dump file; removed on drop.
    _tmpfile: NamedTempFile,
    title_prefix: String,
}

impl Shell {
    pub fn new(options: &CliOptions) -> Result<Self> {
        let data_dir = store::data_dir()?;

        let mut settings = Settings::default();
        settings.apply_file(&data_dir.join("settings.ron"));
        for script in &options.scripts {
            settings.apply_file(script);
        }
        settings.sanitize();
        if options.quiet {
            settings.behavior.quiet_mode = true;
        }
        if let Some(delayed) = options.delayed_expansion {
            settings.behavior.delayed_expansion = delayed;
        }

        let mut state = InputState::new();
        state.history.list = store::read_history(&data_dir.join("history"));

        let mut dir_hist = DirHistory::new();
        dir_hist.max_len = settings.behavior.max_dir_history_length;
        dir_hist.locations = store::read_history(&data_dir.join("dir_history"));
        dir_hist.index = dir_hist.locations.len().saturating_sub(1);
        // Entries restored from disk were all really visited.
        dir_hist.keep = !dir_hist.locations.is_empty();
        dir_hist.visit_cwd();

        let tmpfile = store::session_tmpfile(&data_dir)?;

        let console = Console::new()?;
        let input = InputQueue::start();

        // SIGINT becomes a synthetic Ctrl-C key event.
        let sigint_tx = input.sender();
        let _ = ctrlc::set_handler(move || {
            let _ = sigint_tx.send(KeyPress::ctrl(Key::Char('c')));
        });

        #[cfg(unix)]
        let backend = Backend::start(tmpfile.path())?;
        #[cfg(windows)]
        let backend = Backend::start(tmpfile.path(), settings.behavior.delayed_expansion)?;

        let title_prefix = options
            .title
            .as_ref()
            .map(|t| format!("{t} - "))
            .unwrap_or_default();

        Ok(Self {
            state,
            dir_hist,
            console,
            input,
            settings,
            backend,
            data_dir,
            _tmpfile: tmpfile,
            title_prefix,
        })
    }

    /// Run the shell until the user leaves.
    pub fn run(&mut self, options: &CliOptions) -> Result<()> {
        #[cfg(windows)]
        {
            // Harvest the initial environment through the bridge.
            let init = vec!["echo".to_string(), ">".to_string(), "NUL".to_string()];
            let _ = self.run_tokens(&init);
        }

        if !self.settings.behavior.quiet_mode {
            self.console.write_str(&format!(
                "\nWelcome to rcmd {}!\n\n",
                env!("CARGO_PKG_VERSION")
            ));
        }

        if let Some(command) = &options.run_and_exit {
            let tokens = parse_line(command);
            if !tokens.is_empty() {
                if let Flow::Exit(message) = self.run_tokens(&tokens) {
                    self.goodbye(&message);
                    return Ok(());
                }
            }
            return Ok(());
        }
        if let Some(command) = &options.run_and_continue {
            let tokens = parse_line(command);
            if !tokens.is_empty() {
                if let Flow::Exit(message) = self.run_tokens(&tokens) {
                    self.goodbye(&message);
                    return Ok(());
                }
                self.dir_hist.visit_cwd();
            }
        }

        loop {
            self.state.reset_line(&prompt::prompt());
            self.console.write_str("\n");

            match self.read_line() {
                ReadOutcome::Reprompt => continue,
                ReadOutcome::Exit(message) => {
                    self.goodbye(&message);
                    return Ok(());
                }
                ReadOutcome::Line(line) => {
                    let line = line.trim().to_string();
                    let tokens = parse_line(&line);
                    if tokens.is_empty() || tokens[0].is_empty() {
                        continue;
                    }
                    self.console.write_str("\n");
                    if !is_pure_cd(&tokens) {
                        self.dir_hist.keep = true;
                    }
                    let flow = self.run_tokens(&tokens);

                    self.state.history.add(&line);
                    self.persist_command_history();
                    self.dir_hist.visit_cwd();
                    self.persist_dir_history();

                    if let Flow::Exit(message) = flow {
                        self.goodbye(&message);
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Edit one input line until it is accepted or abandoned.
    fn read_line(&mut self) -> ReadOutcome {
        let mut auto_select = false;
        let mut force_repaint = true;
        let mut dir_listing_shown = false;

        loop {
            let curdir = env::current_dir()
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.console
                .set_title(&format!("{}{} - rcmd", self.title_prefix, curdir));
            bridge::set_process_var("CD", Some(curdir.as_str()));

            if self.state.changed() || force_repaint {
                self.repaint();
                force_repaint = false;
            }
            if self.state.bell {
                self.console.bell();
                self.state.bell = false;
            }

            self.state.step_line();
            let press = self.input.read();
            let select = auto_select || press.shift;
            force_repaint = true;

            if press.ctrl && !press.alt {
                match press.key {
                    Key::Char('d') => {
                        if self.state.line().is_empty() {
                            return ReadOutcome::Exit("\nBye!".to_string());
                        }
                        self.state.handle(Action::Delete);
                    }
                    Key::Char('_') | Key::Char('7') => {
                        self.state.handle(Action::UndoEmacs);
                        auto_select = false;
                    }
                    Key::Char('k') => self.state.handle(Action::KillEol),
                    Key::Char(' ') => {
                        auto_select = true;
                        self.state.reset_selection();
                    }
                    Key::Char('g') => {
                        self.escape_and_save();
                        auto_select = false;
                    }
                    Key::Char('a') => self.state.handle(Action::Home { select }),
                    Key::Char('e') => self.state.handle(Action::End { select }),
                    Key::Char('b') => self.state.handle(Action::Left { select }),
                    Key::Char('f') => self.state.handle(Action::Right { select }),
                    Key::Char('p') => self.state.handle(Action::Prev),
                    Key::Char('n') => self.state.handle(Action::Next),
                    Key::Char('r') => self.state.handle(Action::SearchLeft),
                    Key::Char('s') => self.state.handle(Action::SearchRight),
                    Key::Left => self.state.handle(Action::LeftWord { select }),
                    Key::Right => self.state.handle(Action::RightWord { select }),
                    Key::Delete => self.state.handle(Action::DeleteWord),
                    Key::Char('c') => {
                        // SIGINT lands here as a synthetic key event.
                        if !self.state.selection().is_empty() {
                            self.state.handle(Action::Copy);
                        } else {
                            self.state.handle(Action::Escape);
                        }
                        auto_select = false;
                    }
                    Key::Char('x') | Key::Char('w') => {
                        self.state.handle(Action::Cut);
                        auto_select = false;
                    }
                    Key::Char('v') | Key::Char('y') => {
                        self.state.handle(Action::Paste);
                        auto_select = false;
                    }
                    Key::Backspace => self.state.handle(Action::BackspaceWord),
                    Key::Char('z') | Key::Char('Z') => {
                        if press.shift {
                            self.state.handle(Action::Redo);
                        } else {
                            self.state.handle(Action::Undo);
                        }
                        auto_select = false;
                    }
                    _ => {}
                }
            } else if press.alt && !press.ctrl {
                match press.key {
                    Key::Left | Key::Right | Key::Char('1'..='9')
                        if self.state.line().is_empty() =>
                    {
                        self.state.reset_prev_line();
                        let changed = match press.key {
                            Key::Left => self.dir_hist.go_left(),
                            Key::Right => self.dir_hist.go_right(),
                            Key::Char(d) => self.dir_hist.jump(d as usize - '0' as usize),
                            _ => unreachable!(),
                        };
                        if changed {
                            self.state.prev_prompt = self.state.prompt.clone();
                            self.state.prompt = prompt::prompt();
                        } else {
                            self.state.bell = true;
                        }
                        self.persist_dir_history();
                        if dir_listing_shown {
                            self.display_dir_history();
                        }
                    }
                    Key::Left => self.state.handle(Action::LeftWord { select }),
                    Key::Right => self.state.handle(Action::RightWord { select }),
                    Key::Up if self.state.line().is_empty() => {
                        let _ = env::set_current_dir("..");
                        self.dir_hist.visit_cwd();
                        return ReadOutcome::Reprompt;
                    }
                    Key::Char('b') => self.state.handle(Action::LeftWord { select }),
                    Key::Char('f') => self.state.handle(Action::RightWord { select }),
                    Key::Char('p') => self.state.handle(Action::Prev),
                    Key::Char('n') => self.state.handle(Action::Next),
                    Key::Char('d') => {
                        if self.state.line().is_empty() {
                            self.display_dir_history();
                            dir_listing_shown = true;
                        } else {
                            self.state.handle(Action::DeleteWord);
                        }
                    }
                    Key::Char('w') => {
                        self.state.handle(Action::Copy);
                        self.state.reset_selection();
                        auto_select = false;
                    }
                    Key::Delete => self.state.handle(Action::DeleteWord),
                    Key::Backspace => self.state.handle(Action::BackspaceWord),
                    Key::Char('/') => self.state.handle(Action::Expand),
                    _ => {}
                }
            } else if press.shift && press.key == Key::F(3) {
                self.state.handle(Action::SearchLeft);
            } else if press.shift && press.key == Key::Up {
                self.state.handle(Action::SelectUp);
            } else if press.shift && press.key == Key::Down {
                self.state.handle(Action::SelectDown);
            } else {
                match press.key {
                    Key::Left => self.state.handle(Action::Left { select }),
                    Key::Right => self.state.handle(Action::Right { select }),
                    Key::Home => self.state.handle(Action::Home { select }),
                    Key::End => self.state.handle(Action::End { select }),
                    Key::Up => self.state.handle(Action::Prev),
                    Key::Down => self.state.handle(Action::Next),
                    Key::Delete => self.state.handle(Action::Delete),
                    Key::Insert => self.state.handle(Action::ToggleOverwrite),
                    Key::F(3) => self.state.handle(Action::SearchRight),
                    Key::F(8) | Key::PageUp => self.history_window(),
                    Key::Enter => {
                        if self.state.search_substr.is_some() {
                            self.state.search_substr = None;
                            self.state.reset_selection();
                        } else {
                            self.state.history.reset();
                            // Move the cursor past the end of the line.
                            self.console.write_str(&self.state.after_cursor.clone());
                            return ReadOutcome::Line(self.state.line());
                        }
                    }
                    Key::Esc => {
                        self.escape_and_save();
                        auto_select = false;
                    }
                    Key::Tab => self.tab_complete(),
                    Key::Backspace => self.state.handle(Action::Backspace),
                    Key::Char(c) => self.state.handle(Action::Insert(c.to_string())),
                    _ => {}
                }
            }
        }
    }

    /// Repaint the prompt and the line, diffing against the previous state.
    fn repaint(&mut self) {
        let colors = self.settings.appearance.colors.clone();
        let prev_total_len = visible_len(&self.state.prev_prompt)
            + nchars(&self.state.prev_before_cursor)
            + nchars(&self.state.prev_after_cursor);

        self.console.set_cursor_visible(false);
        self.console.cursor_backward(
            visible_len(&self.state.prev_prompt) + nchars(&self.state.prev_before_cursor),
        );
        self.console.write_str("\r");

        self.console.write_str(&format!(
            "{}{}{}{}{}{}{}",
            fore::DEFAULT,
            back::DEFAULT,
            colors.prompt,
            self.state.prompt,
            fore::DEFAULT,
            back::DEFAULT,
            colors.text,
        ));

        let line: Vec<char> = self.state.line().chars().collect();
        if self.state.history.filter.is_empty() {
            let (sel_start, sel_end) = self.state.selection_range();
            let head: String = line[..sel_start].iter().collect();
            let selected: String = line[sel_start..sel_end].iter().collect();
            let tail: String = line[sel_end..].iter().collect();
            self.console.write_str(&format!(
                "{head}{}{selected}{}{}{}{tail}",
                colors.selection,
                fore::DEFAULT,
                back::DEFAULT,
                colors.text,
            ));
        } else {
            // Highlight the spans matched by the history filter.
            let mut pos = 0;
            let mut colored = String::new();
            for (start, end) in self.state.history.current().1 {
                let start = start.min(line.len());
                let end = end.min(line.len());
                colored.push_str(&format!(
                    "{}{}{}{}{}",
                    fore::DEFAULT,
                    back::DEFAULT,
                    colors.text,
                    line[pos..start].iter().collect::<String>(),
                    colors.search_filter,
                ));
                colored.push_str(&line[start..end].iter().collect::<String>());
                pos = end;
            }
            colored.push_str(&format!(
                "{}{}{}{}",
                fore::DEFAULT,
                back::DEFAULT,
                colors.text,
                line[pos..].iter().collect::<String>()
            ));
            self.console.write_str(&colored);
        }

        // Erase leftovers from the previous, longer line.
        let total_len =
            visible_len(&self.state.prompt) + nchars(&self.state.before_cursor) + nchars(&self.state.after_cursor);
        let to_erase = prev_total_len.saturating_sub(total_len);
        if to_erase > 0 {
            self.console.write_str(&format!(
                "{}{}{}",
                fore::DEFAULT,
                back::DEFAULT,
                " ".repeat(to_erase)
            ));
            self.console.cursor_backward(to_erase);
        }

        let shape = if self.state.search_substr.is_some() {
            CursorShape::Search
        } else if self.state.overwrite {
            CursorShape::Overwrite
        } else {
            CursorShape::Normal
        };
        self.console.set_cursor_shape(shape);
        self.console.set_cursor_visible(true);
        self.console.cursor_backward(nchars(&self.state.after_cursor));
    }

    /// Esc / Ctrl-G: clear state layers in order, stashing a cleared line in
    /// the history.
    fn escape_and_save(&mut self) {
        self.state.handle(Action::Escape);
        self.persist_command_history();
    }

    /// Tab: complete the token before the cursor, showing a picker when the
    /// completion is ambiguous.
    fn tab_complete(&mut self) {
        let before = self.state.before_cursor.clone();
        let tokens = {
            let t = parse_line(&before);
            if t.is_empty() { vec![String::new()] } else { t }
        };
        let last_token = tokens.last().cloned().unwrap_or_default();

        let (completed, suggestions) = if last_token.trim_matches('"').matches('%').count() % 2 == 1
        {
            complete_env_var(&before)
        } else if has_wildcards(&last_token) {
            complete_wildcard(&before)
        } else {
            complete_file(&before)
        };

        self.state.handle(Action::Complete(completed.clone()));
        self.repaint();
        self.state.step_line();

        if suggestions.is_empty() {
            self.state.bell = true;
            return;
        }
        if suggestions.len() <= 1 {
            return;
        }

        let path_sep = if expand_env_vars(&last_token).contains('/') {
            '/'
        } else {
            '\\'
        };
        // Tokenize again in case the original line has been appended to.
        let tokens = if !last_token.is_empty() {
            let trimmed = completed
                .trim_end_matches(' ')
                .trim_end_matches(path_sep)
                .to_string();
            let t = parse_line(&trimmed);
            if t.is_empty() { vec![String::new()] } else { t }
        } else {
            tokens
        };
        let token = tokens.last().cloned().unwrap_or_default().replace('"', "");

        let prefix = if has_wildcards(&last_token) {
            // Wildcard suggestions share no literal prefix; highlight the
            // name part of the pattern.
            match token.rfind(path_sep) {
                Some(pos) => token[pos + 1..].to_string(),
                None => token.clone(),
            }
        } else {
            find_common_prefix(&self.state.before_cursor, &suggestions)
        };
        let pattern = wildcard_to_regex(&format!("{prefix}*"));

        let height = self.console.size().1 / 3;
        let mut window = Window::new(suggestions, pattern, height, &self.console);
        let outcome = window.interact(&mut self.console, &mut self.input, &self.settings.appearance);
        if let Outcome::Select(selection) = outcome {
            self.insert_selection(&selection, &prefix, &completed, path_sep);
        }
        self.state.reset_prev_line();
    }

    /// Replace the completion prefix with the picked entry, re-quoting and
    /// terminating as needed.
    fn insert_selection(&mut self, selection: &str, prefix: &str, completed: &str, path_sep: char) {
        let orig_last_token = {
            let t = parse_line(&self.state.before_cursor);
            t.last().cloned().unwrap_or_default()
        };

        let before: Vec<char> = self.state.before_cursor.chars().collect();
        let prefix_chars: Vec<char> = prefix.chars().collect();
        if let Some(pos) = rfind_ci(&before, &prefix_chars) {
            let head: String = before[..pos].iter().collect();
            let tail: String = before[pos + prefix_chars.len()..].iter().collect();
            self.state.before_cursor = format!("{head}{selection}{tail}");
        }

        if orig_last_token.matches('%').count() % 2 == 1 {
            self.state.before_cursor.push('%');
        }
        if orig_last_token.starts_with('"') {
            self.state.before_cursor.push('"');
        } else if selection.contains(' ') {
            if let Some(pos) = self.state.before_cursor.rfind(&orig_last_token) {
                self.state.before_cursor = format!(
                    "{}\"{}\"",
                    &self.state.before_cursor[..pos],
                    &self.state.before_cursor[pos..]
                );
            }
        }
        if !selection.ends_with(path_sep)
            && orig_last_token.matches('%').count() % 2 != 1
            && !completed.ends_with(' ')
        {
            self.state.before_cursor.push(' ');
        }
        self.state.reset_selection();
    }

    /// PgUp / F8: pick (or zap) a line from the command history.
    fn history_window(&mut self) {
        if self.state.history.list.is_empty() {
            self.state.bell = true;
            return;
        }
        let entries = self.state.history.list.clone();
        let pattern = wildcard_to_regex("*");
        let height = self.console.size().1 / 3;
        let mut window = Window::new(entries, pattern, height, &self.console);
        match window.interact(&mut self.console, &mut self.input, &self.settings.appearance) {
            Outcome::Select(line) => {
                self.state.before_cursor = line;
                self.state.after_cursor.clear();
                self.state.reset_selection();
            }
            Outcome::Zap(line) => {
                self.state.history.zap(&line);
                if let Err(err) = store::write_history(
                    &self.state.history.list,
                    &self.data_dir.join("history"),
                    SAVE_HISTORY_LIMIT,
                ) {
                    warn!("cannot rewrite the history file: {err}");
                }
            }
            Outcome::Cancel => {}
        }
        self.state.reset_prev_line();
    }

    /// Alt-D on an empty line: show the directory history, current entry
    /// highlighted.
    fn display_dir_history(&mut self) {
        let colors = self.settings.appearance.colors.clone();
        let locations = self.dir_hist.locations.clone();
        self.console.write_str("\n");
        for (i, location) in locations.iter().enumerate() {
            let entry = format!(" {}  {}", i + 1, location);
            if i == self.dir_hist.index {
                self.console.write_str(&format!(
                    "{}{}{}{}{}{}\n",
                    fore::DEFAULT,
                    back::DEFAULT,
                    colors.dir_history_selection,
                    entry,
                    fore::DEFAULT,
                    back::DEFAULT,
                ));
            } else {
                self.console.write_str(&format!("{entry}\n"));
            }
        }
        self.state.reset_prev_line();
    }

    /// Execute tokenized user input, treating internal commands (`exit`,
    /// pure `cd`) appropriately.
    fn run_tokens(&mut self, tokens: &[String]) -> Flow {
        debug!("executing {tokens:?}");
        for var in PSEUDO_VARS {
            bridge::set_process_var(var, None);
        }

        if tokens[0] == "exit" {
            return Flow::Exit("Bye!".to_string());
        }
        if is_pure_cd(tokens) {
            let args: Vec<String> = tokens[1..].iter().map(|t| unescape(t)).collect();
            self.internal_cd(&args);
            return Flow::Continue;
        }

        self.run_external(tokens)
    }

    #[cfg(unix)]
    fn run_external(&mut self, tokens: &[String]) -> Flow {
        let line = tokens.join(" ");
        let result = self.backend.run(&line, &mut self.input);
        self.console.reset_tracking();
        self.state.reset_prev_line();
        match result {
            Ok(()) => Flow::Continue,
            Err(BridgeError::InterpreterGone) => Flow::Exit(String::new()),
            Err(err) => {
                warn!("command bridge: {err}");
                Flow::Continue
            }
        }
    }

    #[cfg(windows)]
    fn run_external(&mut self, tokens: &[String]) -> Flow {
        self.console.suspend_raw_mode();
        let result = self.backend.run(tokens);
        self.console.resume_raw_mode();
        self.console.reset_tracking();
        self.state.reset_prev_line();
        match result {
            Ok(()) => Flow::Continue,
            Err(err) => {
                warn!("command bridge: {err}");
                Flow::Continue
            }
        }
    }

    /// The internal `cd`: tilde and `%VAR%` expansion, quote stripping and
    /// friendlier errors than the interpreter's.
    fn internal_cd(&mut self, args: &[String]) {
        let target = args.first().map(|raw| {
            let mut t = raw.clone();
            let is_drive_root = t.len() == 3 && t.ends_with(":\\");
            if t != "\\" && !is_drive_root {
                t = t.trim_end_matches('\\').to_string();
            }
            expand_env_vars(t.trim_matches('"').trim())
        });

        #[cfg(unix)]
        {
            // Route through the interpreter so its CWD stays in step; the
            // leading space keeps the command out of bash's own history.
            let command = match &target {
                Some(dir) => format!(" cd -- \"{dir}\""),
                None => " cd".to_string(),
            };
            if let Err(err) = self.backend.run(&command, &mut self.input) {
                warn!("cd: {err}");
            }
            self.console.reset_tracking();
            self.state.reset_prev_line();
        }

        #[cfg(windows)]
        {
            let target = target.unwrap_or_else(|| expand_env_vars("~"));
            match env::set_current_dir(&target) {
                Ok(()) => bridge::set_process_var("ERRORLEVEL", Some("0")),
                Err(err) => {
                    self.console.write_str(&format!("\n{err}\n"));
                    bridge::set_process_var("ERRORLEVEL", Some("1"));
                }
            }
            let cwd = env::current_dir()
                .map(|d| d.to_string_lossy().into_owned())
                .unwrap_or_default();
            bridge::set_process_var("CD", Some(cwd.as_str()));
        }
    }

    fn persist_command_history(&self) {
        if let Some(last) = self.state.history.list.last() {
            if let Err(err) = store::update_history(
                last,
                &self.data_dir.join("history"),
                SAVE_HISTORY_LIMIT,
            ) {
                warn!("cannot update the history file: {err}");
            }
        }
    }

    fn persist_dir_history(&self) {
        if let Some(last) = self.dir_hist.locations.last() {
            if let Err(err) = store::update_history(
                last,
                &self.data_dir.join("dir_history"),
                self.dir_hist.max_len,
            ) {
                warn!("cannot update the directory history file: {err}");
            }
        }
    }

    fn goodbye(&mut self, message: &str) {
        if !self.settings.behavior.quiet_mode && !message.is_empty() {
            self.console.write_str(&format!("{message}\n"));
        }
    }
}

fn nchars(s: &str) -> usize {
    s.chars().count()
}

/// Case-insensitive search for the last occurrence of `needle`, as a
/// character index.
fn rfind_ci(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&pos| {
        needle
            .iter()
            .zip(&haystack[pos..])
            .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()))
    })
}
