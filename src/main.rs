//! tenantdb CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; errors go to
//! stderr with a non-zero exit.

use tenantdb::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
