//! Logging utilities and structured logging support

pub use log::{debug, info, warn, error, trace};

/// Default filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "info";

/// Initialize the logging system
///
/// Honors `RUST_LOG` and falls back to [`DEFAULT_FILTER`].
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
        .init();
}

/// Test logger that records every message on the emitting thread
///
/// Records are also forwarded to an `env_logger` test logger, so `RUST_LOG`
/// still controls what shows up in test output.
#[cfg(test)]
pub(crate) mod capture {
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use std::cell::RefCell;
    use std::sync::OnceLock;

    thread_local! {
        static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    struct CaptureLogger {
        inner: env_logger::Logger,
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            RECORDS.with(|records| {
                records
                    .borrow_mut()
                    .push((record.level(), record.args().to_string()));
            });
            self.inner.log(record);
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }

    static LOGGER: OnceLock<CaptureLogger> = OnceLock::new();

    /// Install the capture logger once per test binary
    pub(crate) fn install() {
        let logger = LOGGER.get_or_init(|| CaptureLogger {
            inner: env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
                .is_test(true)
                .build(),
        });
        if log::set_logger(logger).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    }

    /// Drain the records emitted on this thread so far
    pub(crate) fn take() -> Vec<(Level, String)> {
        RECORDS.with(RefCell::take)
    }

    /// Drained records at exactly `level`
    pub(crate) fn take_at(level: Level) -> Vec<String> {
        take()
            .into_iter()
            .filter(|(record_level, _)| *record_level == level)
            .map(|(_, message)| message)
            .collect()
    }
}
