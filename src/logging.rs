use log::LevelFilter;
use std::io::Write;

/// Installs an `env_logger` backend printing `timestamp [LEVEL] message`.
/// `RUST_LOG` overrides `level`. Calling it again is a no-op, so tests and
/// binaries may both call it.
pub fn init_logging(level: LevelFilter) {
    let _ = env_logger::builder()
        .filter_level(level)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.args()
            )
        })
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LevelFilter::Debug);
        init_logging(LevelFilter::Info);
        log::info!("logger installed");
    }
}
