use std::io::Write;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use log::LevelFilter;

/// Narration is chatty in debug builds and quiet in release builds.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    }
}

/// Install the process-wide logger; `RUST_LOG` overrides the default level.
pub fn init() {
    let _ = env_logger::Builder::new()
        .filter_level(default_level())
        .parse_default_env()
        .format(|buf, record| {
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0);
            let current = thread::current();
            let thread_name = current.name().unwrap_or("unnamed");
            writeln!(
                buf,
                "[{ts}ms][{thread_name}] {:<5} {}",
                record.level(),
                record.args()
            )
        })
        .try_init();
}
