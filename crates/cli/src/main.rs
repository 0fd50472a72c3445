use std::process::ExitCode;

fn main() -> ExitCode {
    kingscribe_cli::run()
}
