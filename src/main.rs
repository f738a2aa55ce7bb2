//! shifts - shift scheduling with an approval workflow

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = shift_board::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
