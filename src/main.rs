//! Kryon compiler binary: a thin wrapper that installs logging and
//! delegates straight to [`kryc::cli::run`].

use std::process;

fn main() {
    if let Err(e) = kryc::cli::run() {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
