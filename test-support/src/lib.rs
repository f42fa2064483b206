pub mod fake_smtp;
pub mod fake_webhook;

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Routes `log` records (and `tracing` events, through its `log` feature) to the terminal.
///
/// Safe to call from every test; only the first call installs the logger.
pub fn setup_logging() {
    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}
