//! codex-forge CLI binary
//!
//! This is the minimal entrypoint for the codex-forge CLI.
//! All logic is in the library; main.rs only invokes cli::run().

fn main() {
    if let Err(code) = codex_forge::cli::run() {
        std::process::exit(code.as_i32());
    }
}
