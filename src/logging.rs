use log::LevelFilter;

pub use log::LevelFilter::*;

/// Installs the global logger. Returns false if a logger was already installed.
pub fn setup_logging(verbosity: LevelFilter) -> bool {
    fern::Dispatch::new()
        .level(verbosity)
        .format(|out, message, record| out.finish(format_args!("({}) {}: {}", record.level(), record.target(), message)))
        .chain(std::io::stderr())
        .apply()
        .is_ok()
}
