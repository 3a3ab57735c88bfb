use std::{
    env, fs,
    io::{self, Write as _},
    process::ExitCode,
};

use lox::{Repl, ReplOutcome, RunOutcome};

const TEST_MODE: bool = false;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    match args.len() {
        1 => repl(),
        2 => run_file(&args[1]),
        _ => {
            eprintln!("Usage: lox [script]");
            ExitCode::from(64)
        }
    }
}

/// `prog <file>` — execute the whole file, exiting `65` on a pre-execution diagnostic
/// or `70` on a runtime error, per the CLI surface's exit-code contract.
fn run_file(path: &str) -> ExitCode {
    let source = match read_file(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(64);
        }
    };

    match lox::run(&source, Box::new(io::stdout()), TEST_MODE) {
        RunOutcome::Ok(warnings) => {
            for warning in &warnings {
                eprintln!("{warning}");
            }
            ExitCode::SUCCESS
        }
        RunOutcome::PreExecution(diagnostics) => {
            for diagnostic in &diagnostics {
                eprintln!("{diagnostic}");
            }
            ExitCode::from(65)
        }
        RunOutcome::Runtime(err) => {
            eprintln!("{err}");
            ExitCode::from(70)
        }
    }
}

/// `prog` (no args) — a line-oriented REPL. Each line first tries as a bare expression
/// (echoing its value); if that doesn't parse, it's re-read as a statement sequence and
/// run for side effects. Diagnostics and runtime errors are reported but never end the
/// session — only EOF on stdin does.
fn repl() -> ExitCode {
    let mut session = Repl::new(Box::new(io::stdout()), TEST_MODE);
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::SUCCESS;
        }

        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(err) => {
                eprintln!("error reading stdin: {err}");
                return ExitCode::SUCCESS;
            }
        }

        match session.eval_line(&line) {
            ReplOutcome::Value(rendered, warnings) => {
                for warning in &warnings {
                    eprintln!("{warning}");
                }
                println!("{rendered}");
            }
            ReplOutcome::Ran(warnings) => {
                for warning in &warnings {
                    eprintln!("{warning}");
                }
            }
            ReplOutcome::PreExecution(diagnostics) => {
                for diagnostic in &diagnostics {
                    eprintln!("{diagnostic}");
                }
            }
            ReplOutcome::Runtime(err) => eprintln!("{err}"),
        }
    }
}

fn read_file(path: &str) -> Result<String, String> {
    match fs::metadata(path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{path} is not a file"));
            }
        }
        Err(err) => return Err(format!("reading {path}: {err}")),
    }
    fs::read_to_string(path).map_err(|err| format!("reading {path}: {err}"))
}
