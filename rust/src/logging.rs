//! Diagnostic output of the analysis, written to stderr.
//!
//! Every entry point takes a `u8` verbosity (normally
//! [`AnalysisConfig::verbosity`](crate::AnalysisConfig)) and each macro
//! prints only when that value reaches its threshold:
//!
//! | Level | Macro | Reports |
//! |---|---|---|
//! | 0 | none | nothing |
//! | 1 | [`log_summary!`] | root start/finish times, resolved and unresolved task names, table sizes |
//! | 2 | [`log_checks!`] | the parallel/ordered verdict of every task pair |
//! | 3 | [`log_debug!`] | per-node EST/EFT, rank raises, name bindings, detached edges |

pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_SUMMARY: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

#[doc(hidden)]
#[macro_export]
macro_rules! log_at {
    ($threshold:expr, $verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $threshold {
            eprintln!($($arg)*);
        }
    };
}

/// Print when verbosity is at least [`VERBOSITY_SUMMARY`].
#[macro_export]
macro_rules! log_summary {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_SUMMARY, $verbosity, $($arg)*)
    };
}

/// Print when verbosity is at least [`VERBOSITY_CHECKS`].
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_CHECKS, $verbosity, $($arg)*)
    };
}

/// Print when verbosity is at least [`VERBOSITY_DEBUG`].
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        $crate::log_at!($crate::logging::VERBOSITY_DEBUG, $verbosity, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels_are_ordered() {
        assert!(VERBOSITY_SILENT < VERBOSITY_SUMMARY);
        assert!(VERBOSITY_SUMMARY < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_compile() {
        let verbosity = VERBOSITY_SILENT;
        log_summary!(verbosity, "roots {}", 1);
        log_checks!(verbosity, "pair {} {}", "a", "b");
        log_debug!(verbosity, "est {:.1}", 2.0);
    }
}
