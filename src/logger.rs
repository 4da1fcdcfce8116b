use env_logger::{Builder, Target};
use log::{Level, LevelFilter};
use std::env;
use std::io::Write;

/// Install the process logger. `--verbose` wins over the configured level,
/// and `RUST_LOG` wins over both.
pub fn setup_logger(verbose: bool, configured_level: &str) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        configured_level.parse().unwrap_or(LevelFilter::Info)
    };

    let mut builder = Builder::new();
    builder.filter(None, level);
    // Result sets go to stdout.
    builder.target(Target::Stderr);

    builder.format(|buf, record| {
        let emoji = match record.level() {
            Level::Error => "❌ ",
            Level::Warn => "⚠️  ",
            Level::Info => "",
            Level::Debug => "",
            Level::Trace => "",
        };
        writeln!(buf, "{}{}", emoji, record.args())
    });

    if env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    }

    // A second call (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}
