use colored::{ColoredString, Colorize};
use env_logger::Builder;
use log::Level;
use std::io::Write;

pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level)
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error => tagged_line(name, "ERROR".red(), record),
                Level::Warn => tagged_line(name, "WARN".yellow(), record),
                Level::Debug | Level::Trace => {
                    let thread = std::thread::current();
                    let stage = thread.name().unwrap_or("main").dimmed();
                    format!("[{} {}] {}", name.cyan(), stage, record.args())
                }
                Level::Info => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}

/// Warnings and errors carry the level tag and the emitting module.
fn tagged_line(name: &str, tag: ColoredString, record: &log::Record) -> String {
    format!(
        "[{} {} {}] {}",
        name.cyan(),
        tag,
        record.target().white(),
        record.args()
    )
}
