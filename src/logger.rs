use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

static QUIET_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_quiet_mode(quiet: bool) {
    QUIET_MODE.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET_MODE.load(Ordering::Relaxed)
}

/// Default filter when `RUST_LOG` is not set.
pub fn filter_directive(quiet: bool, verbose: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Installs the global `tracing` subscriber. Events go to stderr so stdout
/// stays free for command output.
pub fn init(quiet: bool, verbose: bool) {
    set_quiet_mode(quiet);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(quiet, verbose)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Command output on stdout, suppressed in quiet mode.
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        if !$crate::logger::is_quiet() {
            println!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(false, false), "info");
        assert_eq!(filter_directive(false, true), "debug");
        assert_eq!(filter_directive(true, false), "warn");
        assert_eq!(filter_directive(true, true), "warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false, false);
        init(false, true);
        assert!(!is_quiet());
    }
}
