/// Initialized once at process start (§6.1): leveled output via `log` +
/// `fern`, enabled by `-v`/`-vv` or `RUST_LOG`, always writing to stderr so
/// stdout stays reserved for command payloads.
pub(crate) fn init(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(match verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        });

    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(level)
        .chain(std::io::stderr())
        .apply()
}
