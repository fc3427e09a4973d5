use std::process::ExitCode;

fn main() -> ExitCode {
    forcelink_cli::run()
}
