use std::process::ExitCode;

fn main() -> ExitCode {
    lapsight_cli::run()
}
