//! Interactive command console
//!
//! Reads one console command per line with line editing and history,
//! executes it and prints the result. Errors are reported and the console
//! keeps going. Ctrl-C at the prompt or end of input leaves the shell;
//! Ctrl-C while a command runs cancels a scan.

use directories::ProjectDirs;
use radc_core::bus::CancelToken;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

use super::{format_sample, print_outcome, DynSession};

const PROMPT: &str = "radc> ";

/// Lines that end the shell
const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

/// Get the history file path
fn get_history_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "radc") {
        let mut path = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&path).ok();
        path.push("shell_history");
        path
    } else {
        PathBuf::from(".radc_history")
    }
}

/// Run the console until end of input, Ctrl-C or `exit`
///
/// `readline` yields one line per call. Returns the number of commands
/// that failed.
pub fn run_shell<F>(session: &mut DynSession, cancel: &CancelToken, mut readline: F) -> rustyline::Result<usize>
where
    F: FnMut() -> rustyline::Result<String>,
{
    let mut failures = 0;

    loop {
        let line = match readline() {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        };
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if EXIT_COMMANDS.iter().any(|c| c.eq_ignore_ascii_case(line)) {
            break;
        }

        if let Err(e) = execute_and_print(session, cancel, line) {
            eprintln!("Error: {}", e);
            failures += 1;
        }
    }

    Ok(failures)
}

fn execute_and_print(
    session: &mut DynSession,
    cancel: &CancelToken,
    line: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let digits = session.digits();
    cancel.reset();
    let outcome = session.execute_line(line, Some(cancel), |sample| match format_sample(&sample, digits) {
        Ok(text) => println!("{}", text),
        Err(e) => log::warn!("cannot display sample {}: {}", sample.raw_code, e),
    })?;
    print_outcome(session, &outcome)
}

/// Run the console on the terminal
pub fn cmd_shell(session: &mut DynSession, cancel: &CancelToken) -> Result<(), Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;

    let history_path = get_history_path();
    if rl.load_history(&history_path).is_err() {
        log::debug!("no shell history at {}", history_path.display());
    }

    println!("Type 'ADC' for the command list, 'exit' to quit");

    let failures = run_shell(session, cancel, || {
        let line = rl.readline(PROMPT)?;
        if !line.trim().is_empty() {
            let _ = rl.add_history_entry(line.as_str());
        }
        Ok(line)
    })?;

    if let Err(e) = rl.save_history(&history_path) {
        log::warn!("Failed to save history: {}", e);
    }
    if failures > 0 {
        log::warn!("{} command(s) failed", failures);
    }
    Ok(())
}
