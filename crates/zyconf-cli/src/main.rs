use std::process::ExitCode;

fn main() -> ExitCode {
    zyconf_cli::run()
}
