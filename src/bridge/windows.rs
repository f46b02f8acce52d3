//! The Windows strategy: one `cmd.exe` invocation per command.
//!
//! Each line runs via the `COMSPEC` interpreter with an appended env dump;
//! the dump file is parsed afterwards and the delta imposed on this process.
//! Simple commands that resolve to GUI executables are spawned detached so
//! the prompt returns immediately.

use std::env;
use std::fs;
use std::io::Read;
use std::os::windows::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{
    BridgeError, EnvSnapshot, Sanitized, build_command_string, is_simple_command,
    presubstitute_errorlevel, pushd_prefix, sanitize_line, set_process_var,
};
use crate::parse::{expand_env_vars, expand_tilde, has_exec_extension};

/// The PE optional-header subsystem value for GUI applications.
const IMAGE_SUBSYSTEM_WINDOWS_GUI: u16 = 2;

pub struct CmdBridge {
    dump_file: PathBuf,
    /// Pushd stack captured after the previous command, re-enacted by
    /// prefixing the next one.
    pushd_stack: Vec<String>,
    pub delayed_expansion: bool,
}

impl CmdBridge {
    pub fn start(dump_file: &Path, delayed_expansion: bool) -> Result<Self, BridgeError> {
        Ok(Self {
            dump_file: dump_file.to_path_buf(),
            pushd_stack: Vec::new(),
            delayed_expansion,
        })
    }

    /// Execute tokenized user input, dispatching GUI applications detached
    /// and everything else through `cmd.exe` with the env-dump harness.
    pub fn run(&mut self, tokens: &[String]) -> Result<(), BridgeError> {
        if is_simple_command(tokens) {
            // If the first token resolves to a GUI executable, spawn it and
            // get on with life instead of blocking the prompt.
            if let Some(executable) = resolve_executable(&tokens[0]) {
                if executable
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("exe"))
                    && is_gui_application(&executable).unwrap_or(false)
                {
                    let line: Vec<String> = tokens.iter().map(|t| expand_tilde(t)).collect();
                    let mut cmd = Command::new(comspec());
                    cmd.arg("/c").raw_arg(line.join(" "));
                    cmd.spawn()?;
                    set_process_var("ERRORLEVEL", Some("0"));
                    return Ok(());
                }
            }
        }

        self.run_in_cmd(tokens)
    }

    fn run_in_cmd(&mut self, tokens: &[String]) -> Result<(), BridgeError> {
        let line = match sanitize_line(tokens) {
            Sanitized::Command(line) => line,
            Sanitized::Empty => return Ok(()),
            Sanitized::SyntaxError => {
                // Replicate cmd's own message by running an invalid command.
                println!();
                Command::new(comspec()).arg("/c").raw_arg("echo |").status()?;
                return Ok(());
            }
        };

        let line = if self.delayed_expansion {
            let errorlevel = env::var("ERRORLEVEL").unwrap_or_else(|_| "0".to_string());
            presubstitute_errorlevel(&line, &errorlevel)
        } else {
            line
        };

        let line = format!("{}{line}", pushd_prefix(&self.pushd_stack));
        let command = build_command_string(&line, &self.dump_file, self.delayed_expansion);
        debug!("cmd harness: {command}");

        Command::new(comspec()).arg("/c").raw_arg(&command).status()?;

        let text = fs::read_to_string(&self.dump_file).unwrap_or_default();
        let snapshot = EnvSnapshot::parse(&text);
        self.pushd_stack = snapshot.pushd_stack.clone();
        snapshot.apply();
        Ok(())
    }
}

fn comspec() -> String {
    env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
}

/// Resolve the first token of a command to the executable that would run:
/// PATH search with the known extensions, or the registered handler for
/// other file types.
fn resolve_executable(token: &str) -> Option<PathBuf> {
    let cmd = expand_env_vars(token.trim_matches('"'));
    let name = Path::new(&cmd)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())?;
    let has_ext = name.contains('.');

    let app = if !has_ext || has_exec_extension(&name) {
        cmd.clone()
    } else if Path::new(&cmd).is_file() {
        let ext = format!(".{}", name.rsplit('.').next().unwrap_or_default());
        associated_application(&ext)?
    } else {
        // No application will be spawned if the file does not exist.
        return None;
    };

    which::which(app.trim_matches('"')).ok()
}

/// Look up the application registered for an extension via `assoc`/`ftype`.
fn associated_application(ext: &str) -> Option<String> {
    let assoc = cmd_query(&format!("assoc {ext}"))?;
    let file_type = assoc.split_once('=')?.1.trim().to_string();
    let ftype = cmd_query(&format!("ftype {file_type}"))?;
    let command = ftype.split_once('=')?.1.trim();

    // The handler command is either "quoted path" args or path args.
    if let Some(rest) = command.strip_prefix('"') {
        rest.split('"').next().map(|s| s.to_string())
    } else {
        command.split_whitespace().next().map(|s| s.to_string())
    }
}

fn cmd_query(query: &str) -> Option<String> {
    let output = Command::new(comspec()).arg("/c").raw_arg(query).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() { None } else { Some(text) }
}

/// Whether the PE binary's optional header declares the GUI subsystem.
fn is_gui_application(path: &Path) -> std::io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut header = vec![0u8; 0x1000];
    let read = file.read(&mut header)?;
    header.truncate(read);

    if header.len() < 0x40 || &header[..2] != b"MZ" {
        return Ok(false);
    }
    let pe_offset = u32::from_le_bytes(header[0x3c..0x40].try_into().unwrap()) as usize;
    // Signature + COFF header + the optional header up to Subsystem.
    let subsystem_offset = pe_offset + 4 + 20 + 68;
    if header.len() < subsystem_offset + 2 || &header[pe_offset..pe_offset + 4] != b"PE\0\0" {
        return Ok(false);
    }
    let subsystem =
        u16::from_le_bytes(header[subsystem_offset..subsystem_offset + 2].try_into().unwrap());
    Ok(subsystem == IMAGE_SUBSYSTEM_WINDOWS_GUI)
}
