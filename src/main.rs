//! controltower CLI entry point
//!
//! main.rs only parses args and dispatches; subsystems are assembled inside
//! the command layer.

use std::process;

use controltower::cli::{run_command, Cli};

fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = run_command(cli.data_dir, cli.command) {
        // Print error JSON and exit non-zero
        let error_json = serde_json::json!({
            "status": "error",
            "code": e.code_str(),
            "message": e.message()
        });

        eprintln!("{}", error_json);
        process::exit(1);
    }
}
