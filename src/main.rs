use clap::Parser;
use gitstack::cli::output::Output;
use gitstack::cli::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            Output::error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}
