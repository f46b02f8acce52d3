//! Command-line options.
//!
//! Switches are accepted the way the stock interpreter spells them: `/K` and
//! `-k` alike, case-insensitive, plus `/V:ON`/`-V:OFF` for delayed variable
//! expansion. A small argv normalizer maps those spellings onto the clap
//! grammar below; everything after `-c`/`-k` is the command itself.

use std::path::{Path, PathBuf};

use clap::Parser;

/// rcmd - a smarter interactive prompt for cmd.exe and bash
#[derive(Parser, Debug, Default)]
#[command(name = "rcmd", version, about)]
pub struct CliOptions {
    /// Run the command, then exit
    #[arg(short = 'c', long = "command", value_name = "CMD")]
    pub run_and_exit: Option<String>,

    /// Run the command, then continue to the prompt
    #[arg(short = 'k', long = "keep", value_name = "CMD")]
    pub run_and_continue: Option<String>,

    /// Show this title in the window caption
    #[arg(short = 't', long = "title", value_name = "TITLE")]
    pub title: Option<String>,

    /// Run additional init/config scripts
    #[arg(short = 'i', long = "init", value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,

    /// Quiet (suppress messages)
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Enable or disable delayed variable expansion
    #[arg(long = "delayed-expansion", value_name = "ON|OFF", value_parser = parse_on_off)]
    pub delayed_expansion: Option<bool>,
}

impl CliOptions {
    /// Parse the process arguments, accepting the interpreter-style switch
    /// spellings.
    pub fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args()))
    }
}

fn parse_on_off(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(format!("expected ON or OFF, got `{other}`")),
    }
}

/// Rewrite interpreter-style switches (`/K cmd`, `-V:ON`, `/?`) into the
/// clap spellings. Everything following `-c`/`-k` is collected as the
/// command; arguments naming existing paths are quoted so they survive
/// re-tokenization.
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let mut out: Vec<String> = Vec::new();
    if let Some(argv0) = iter.next() {
        out.push(argv0);
    }

    while let Some(arg) = iter.next() {
        let Some(body) = arg.strip_prefix('/').or_else(|| arg.strip_prefix('-')) else {
            out.push(arg);
            continue;
        };
        let switch = body.to_ascii_uppercase();
        match switch.as_str() {
            "C" | "K" => {
                out.push(if switch == "C" { "-c" } else { "-k" }.to_string());
                out.push(collect_command(iter.by_ref()));
                break;
            }
            "T" => out.push("--title".to_string()),
            "I" => out.push("--init".to_string()),
            "Q" => out.push("--quiet".to_string()),
            "H" | "?" => out.push("--help".to_string()),
            _ if switch.starts_with("V:") => {
                out.push(format!("--delayed-expansion={}", &switch[2..]));
            }
            // Left for clap to reject with a usage message.
            _ => out.push(arg),
        }
    }
    out
}

fn collect_command<I>(rest: I) -> String
where
    I: Iterator<Item = String>,
{
    rest.map(|t| {
        if Path::new(&t).exists() {
            format!("\"{t}\"")
        } else {
            t
        }
    })
    .collect::<Vec<_>>()
    .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(args: &[&str]) -> Vec<String> {
        normalize_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn slash_switches_are_rewritten() {
        assert_eq!(norm(&["rcmd", "/Q"]), ["rcmd", "--quiet"]);
        assert_eq!(norm(&["rcmd", "/?"]), ["rcmd", "--help"]);
        assert_eq!(norm(&["rcmd", "/T", "build"]), ["rcmd", "--title", "build"]);
    }

    #[test]
    fn case_is_ignored() {
        assert_eq!(norm(&["rcmd", "-q"]), ["rcmd", "--quiet"]);
        assert_eq!(norm(&["rcmd", "-Q"]), ["rcmd", "--quiet"]);
    }

    #[test]
    fn the_rest_after_k_is_the_command() {
        assert_eq!(
            norm(&["rcmd", "/K", "echo", "hi", "-q"]),
            ["rcmd", "-k", "echo hi -q"]
        );
    }

    #[test]
    fn delayed_expansion_switch() {
        assert_eq!(norm(&["rcmd", "-V:ON"]), ["rcmd", "--delayed-expansion=ON"]);
        let opts = CliOptions::parse_from(norm(&["rcmd", "/V:off"]));
        assert_eq!(opts.delayed_expansion, Some(false));
    }

    #[test]
    fn parsed_options_land_in_the_right_fields() {
        let opts = CliOptions::parse_from(norm(&["rcmd", "/T", "dev", "/Q", "/C", "dir"]));
        assert_eq!(opts.title.as_deref(), Some("dev"));
        assert!(opts.quiet);
        assert_eq!(opts.run_and_exit.as_deref(), Some("dir"));
    }
}
