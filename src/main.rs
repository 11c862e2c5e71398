//! Binary entrypoint for the Conversafina chat server.

use std::process::ExitCode;

use conversafina::start_conversafina;

/// Load configuration from the environment and serve until Ctrl-C.
fn main() -> ExitCode {
    start_conversafina::run()
}
