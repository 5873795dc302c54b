//! Entry point for the headless `tach` language-server supervisor.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = io::stderr().lock();
    tach_lspd::run(&mut stderr)
}
