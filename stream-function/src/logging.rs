use log::LevelFilter;
use std::io::Write;

/// Install the global logger. An explicit level wins over `RUST_LOG`; the
/// fallback is `info`.
pub fn init_logging(level: Option<&str>) {
    let log_level = resolve_level(level, std::env::var("RUST_LOG").ok().as_deref());
    let result = env_logger::Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {:5}] {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        })
        .try_init();

    if result.is_ok() {
        log::debug!("Logger initialized (level: {})", log_level);
    }
}

fn resolve_level(explicit: Option<&str>, env: Option<&str>) -> LevelFilter {
    explicit
        .and_then(|l| l.parse::<LevelFilter>().ok())
        .or_else(|| env.and_then(|v| v.parse().ok()))
        .unwrap_or(LevelFilter::Info)
}
