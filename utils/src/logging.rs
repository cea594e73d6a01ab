// A small dependency-free logger in the style the rest of this codebase
// expects: level-gated macros backed by an env var, rather than a
// pluggable `log` facade.

#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Clone, Copy)]
pub enum LogLevel {
    Error = 0,
    Info = 1,
    Debug = 2,
    Profiling = 3,
    Verbose = 4,
}

lazy_static::lazy_static! {
    /// The level threshold, read once from `WM_LOG` at first use.
    /// Defaults to Info so a release build isn't silent.
    pub static ref WM_LOG_LEVEL: LogLevel = {
        match std::env::var("WM_LOG") {
            Ok(val) => match val.as_str() {
                "error" => LogLevel::Error,
                "debug" => LogLevel::Debug,
                "profiling" => LogLevel::Profiling,
                "verbose" => LogLevel::Verbose,
                _ => LogLevel::Info,
            },
            Err(_) => LogLevel::Info,
        }
    };
    /// Optional substring filter on the target module/file, read from
    /// `WM_LOG_MATCH`. Empty means no filtering.
    pub static ref WM_LOG_MATCH: String = std::env::var("WM_LOG_MATCH").unwrap_or_default();
}

#[macro_export]
macro_rules! log_internal {
    ($lvl:expr, $($arg:tt)*) => {
        if $lvl <= *$crate::logging::WM_LOG_LEVEL {
            let target = format!("{}:{}", file!(), line!());
            if $crate::logging::WM_LOG_MATCH.is_empty()
                || target.contains($crate::logging::WM_LOG_MATCH.as_str())
            {
                println!(
                    "[{}]<{:?}> {} - {}",
                    $crate::timing::get_current_millis(),
                    $lvl,
                    target,
                    format!($($arg)*)
                );
            }
        }
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log_internal!($crate::logging::LogLevel::Error, $($arg)*) };
}
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::log_internal!($crate::logging::LogLevel::Info, $($arg)*) };
}
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log_internal!($crate::logging::LogLevel::Debug, $($arg)*) };
}
#[macro_export]
macro_rules! profiling {
    ($($arg:tt)*) => { $crate::log_internal!($crate::logging::LogLevel::Profiling, $($arg)*) };
}
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => { $crate::log_internal!($crate::logging::LogLevel::Verbose, $($arg)*) };
}
