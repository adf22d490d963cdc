//! Logging setup. Everything goes to stderr so stdout stays clean for the
//! JSON event stream.

use colored::Colorize;
use env_logger::{Builder, Target};
use log::Level;
use std::io::Write;

/// Install the stderr logger: Debug for this crate under `verbose`, Info
/// otherwise, warnings only from dependencies. `RUST_LOG` overrides all of
/// it. Calling again (or after an embedding caller installed a logger)
/// leaves the existing logger in place.
pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let result = Builder::from_default_env()
        .target(Target::Stderr) // stdout is the event protocol, never logs
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
    if result.is_err() {
        log::debug!("logger already installed, keeping it");
    }
}
