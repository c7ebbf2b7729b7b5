use std::process::ExitCode;

fn main() -> ExitCode {
    flagsource_cli::run()
}
