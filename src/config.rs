//! Settings: appearance and behavior, loaded from RON files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::console::attr::color;

/// Color settings, expressed as color escape strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Colors {
    pub text: String,
    pub prompt: String,
    pub selection: String,
    pub search_filter: String,
    pub completion_match: String,
    pub dir_history_selection: String,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            text: String::new(),
            prompt: color::fore::TOGGLE_BRIGHT.to_string(),
            selection: [
                color::fore::TOGGLE_RED,
                color::fore::TOGGLE_GREEN,
                color::fore::TOGGLE_BLUE,
                color::back::TOGGLE_RED,
                color::back::TOGGLE_GREEN,
                color::back::TOGGLE_BLUE,
            ]
            .concat(),
            search_filter: [
                color::back::TOGGLE_RED,
                color::back::TOGGLE_BLUE,
                color::fore::TOGGLE_BRIGHT,
            ]
            .concat(),
            completion_match: color::fore::TOGGLE_RED.to_string(),
            dir_history_selection: [color::fore::TOGGLE_BRIGHT, color::back::TOGGLE_BRIGHT].concat(),
        }
    }
}

/// Appearance settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    pub colors: Colors,
}

/// Behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Behavior {
    /// Skip the splash message (also the `-q` command line argument).
    pub quiet_mode: bool,
    /// Completion style; currently only `bash` is supported.
    pub completion_mode: String,
    /// Enable delayed variable expansion in the interpreter (`-V:ON`).
    pub delayed_expansion: bool,
    /// Hard cap on the directory history length.
    pub max_dir_history_length: usize,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            quiet_mode: false,
            completion_mode: "bash".to_string(),
            delayed_expansion: false,
            max_dir_history_length: 9,
        }
    }
}

/// The full settings tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub appearance: Appearance,
    pub behavior: Behavior,
}

impl Settings {
    /// Overlay a settings file onto the current values, if it exists.
    /// Errors are reported and leave the current values untouched.
    pub fn apply_file(&mut self, path: &Path) {
        if !path.exists() {
            return;
        }
        match fs::read_to_string(path) {
            Ok(text) => match ron::from_str::<Settings>(&text) {
                Ok(loaded) => *self = loaded,
                Err(err) => {
                    warn!("error in settings file {}: {err}", path.display());
                    eprintln!(
                        "Error encountered when loading {}\r\nSubsequent settings will NOT be applied!\r",
                        path.display()
                    );
                }
            },
            Err(err) => warn!("cannot read settings file {}: {err}", path.display()),
        }
    }

    /// Make sure the settings have sane values.
    pub fn sanitize(&mut self) {
        if self.behavior.completion_mode != "bash" {
            eprintln!(
                "Invalid setting \"{}\" for \"completion_mode\" -- using default \"bash\"\r",
                self.behavior.completion_mode
            );
            self.behavior.completion_mode = "bash".to_string();
        }
        if self.behavior.max_dir_history_length == 0 {
            self.behavior.max_dir_history_length = Behavior::default().max_dir_history_length;
        }
    }
}
