use std::process::ExitCode;

fn main() -> ExitCode {
    banter_cli::run()
}
