//! The rcmd binary: option parsing, logging, crash reporting and the shell
//! loop.

use color_eyre::eyre::Result;

use rcmd::{CliOptions, Shell};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    color_eyre::install()?;

    let options = CliOptions::from_env();

    let mut shell = Shell::new(&options)?;
    if let Err(err) = shell.run(&options) {
        drop(shell);
        report_crash(&err);
        return Err(err);
    }
    Ok(())
}

/// Errors never cross the interactive boundary while the loop runs; anything
/// that does reach this point is written to a timestamped crash file.
fn report_crash(err: &color_eyre::eyre::Report) {
    eprintln!();
    eprintln!("************************************");
    eprintln!("rcmd has encountered a fatal error!");
    eprintln!();
    let report = format!("{err:?}\n");
    match rcmd::store::data_dir().and_then(|dir| rcmd::store::write_crash_report(&dir, &report)) {
        Ok(path) => eprintln!("Crash report written to:\n  {}", path.display()),
        Err(io_err) => eprintln!("Could not write a crash report: {io_err}"),
    }
    eprintln!("************************************");
}
