//! End-to-end tests of the PTY bridge against a real bash child.
//!
//! Each test spawns its own interpreter and mutates the process environment
//! and CWD, so they are serialized.

#![cfg(unix)]

use std::env;

use serial_test::serial;

use rcmd::bridge::posix::PosixBridge;
use rcmd::console::InputQueue;

fn bridge() -> (PosixBridge, InputQueue, tempfile::NamedTempFile) {
    let dump = tempfile::NamedTempFile::new().expect("temp file");
    let bridge = PosixBridge::start(dump.path()).expect("bash should start");
    (bridge, InputQueue::start(), dump)
}

#[test]
#[serial]
fn the_exit_code_is_reimported_as_errorlevel() {
    let (mut bridge, mut input, _dump) = bridge();

    bridge.run("true", &mut input).unwrap();
    assert_eq!(env::var("ERRORLEVEL").as_deref(), Ok("0"));

    bridge.run("false", &mut input).unwrap();
    assert_eq!(env::var("ERRORLEVEL").as_deref(), Ok("1"));
}

#[test]
#[serial]
fn exported_variables_reach_the_parent() {
    let (mut bridge, mut input, _dump) = bridge();

    bridge
        .run("export RCMD_BRIDGE_PROBE=captured", &mut input)
        .unwrap();
    assert_eq!(env::var("RCMD_BRIDGE_PROBE").as_deref(), Ok("captured"));

    bridge.run("unset RCMD_BRIDGE_PROBE", &mut input).unwrap();
    assert!(env::var("RCMD_BRIDGE_PROBE").is_err());
}

#[test]
#[serial]
fn the_interpreter_cwd_is_followed() {
    let (mut bridge, mut input, _dump) = bridge();
    let original = env::current_dir().unwrap();

    let target = tempfile::tempdir().unwrap();
    let target_path = target.path().canonicalize().unwrap();
    bridge
        .run(&format!("cd \"{}\"", target_path.display()), &mut input)
        .unwrap();
    assert_eq!(env::current_dir().unwrap(), target_path);
    assert_eq!(env::var("CD").as_deref().ok(), target_path.to_str());

    bridge
        .run(&format!("cd \"{}\"", original.display()), &mut input)
        .unwrap();
    assert_eq!(env::current_dir().unwrap(), original);
}

#[test]
#[serial]
fn a_dead_interpreter_is_reported() {
    let (mut bridge, mut input, _dump) = bridge();
    assert!(bridge.run("exit 0", &mut input).is_err());
    assert!(!bridge.is_alive());
}
