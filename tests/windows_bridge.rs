//! End-to-end tests of the cmd.exe strategy. These run the real interpreter
//! and mutate the process environment and CWD.

#![cfg(windows)]

use std::env;

use serial_test::serial;

use rcmd::bridge::windows::CmdBridge;

fn toks(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

fn bridge(delayed: bool) -> (CmdBridge, tempfile::NamedTempFile) {
    let dump = tempfile::NamedTempFile::new().expect("temp file");
    let bridge = CmdBridge::start(dump.path(), delayed).unwrap();
    (bridge, dump)
}

#[test]
#[serial]
fn internal_commands_report_success() {
    let (mut bridge, _dump) = bridge(true);
    bridge.run(&toks(&["dir", ">NUL"])).unwrap();
    assert_eq!(env::var("ERRORLEVEL").as_deref(), Ok("0"));
}

#[test]
#[serial]
fn missing_commands_report_9009() {
    let (mut bridge, _dump) = bridge(true);
    bridge.run(&toks(&["inexistent_command.exe", "2>NUL"])).unwrap();
    assert_eq!(env::var("ERRORLEVEL").as_deref(), Ok("9009"));
}

#[test]
#[serial]
fn cd_inside_a_compound_command_is_followed() {
    let (mut bridge, _dump) = bridge(false);
    let original = env::current_dir().unwrap();
    let parent = original.parent().unwrap().to_path_buf();

    bridge.run(&toks(&["cd", "..", "&&", "echo Hi", ">NUL"])).unwrap();
    assert_eq!(env::current_dir().unwrap(), parent);
    env::set_current_dir(&original).unwrap();
}

#[test]
#[serial]
fn errorlevel_references_see_the_previous_command() {
    let (mut bridge, _dump) = bridge(true);
    let out = env::temp_dir().join("rcmd_errorlevel_probe.txt");
    let _ = std::fs::remove_file(&out);

    bridge.run(&toks(&["dir", "nul", ">NUL", "2>&1"])).unwrap();
    bridge
        .run(&toks(&[
            "echo",
            "%ERRORLEVEL%",
            ">",
            &out.display().to_string(),
        ]))
        .unwrap();

    let contents = std::fs::read_to_string(&out).unwrap();
    assert_eq!(contents.trim(), "1");
    let _ = std::fs::remove_file(&out);
}
