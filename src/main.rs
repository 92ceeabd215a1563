use dothething::filesystem::OsFs;
use dothething::output::Console;
use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

/// Logging is off unless `DTT_LOG` asks for it, e.g. `DTT_LOG=debug`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("DTT_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();

    let mut console = Console::stdio();
    dothething::run(std::env::args_os(), &OsFs, &mut console);
}
