#![deny(missing_docs)]
//! Shared logging utilities for the BLAST client workspace.
//!
//! This crate provides the `blast_*` logging macros used across the codebase,
//! a per-thread job context that every macro prefixes to its message, and a
//! minimal test initializer for the global logger.

use std::cell::RefCell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Identifier of the remote job the current thread is working on.
    static JOB_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Sets the job identifier attached to log lines emitted from this thread.
///
/// The pipeline runs on a current-thread runtime, so setting the context once
/// after submission covers every log line of that run.
pub fn set_job_context(job_id: &str) {
    JOB_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(job_id.to_string()));
}

/// Clears the job identifier for the current thread.
pub fn clear_job_context() {
    JOB_CONTEXT.with(|ctx| *ctx.borrow_mut() = None);
}

/// Returns the job identifier for the current thread, or `-` if none is set.
pub fn job_context() -> String {
    JOB_CONTEXT.with(|ctx| ctx.borrow().clone().unwrap_or_else(|| "-".to_string()))
}

/// Logs a trace-level message tagged with the current job.
#[macro_export]
macro_rules! blast_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[job {}] {}", $crate::job_context(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current job.
#[macro_export]
macro_rules! blast_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[job {}] {}", $crate::job_context(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current job.
#[macro_export]
macro_rules! blast_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[job {}] {}", $crate::job_context(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current job.
#[macro_export]
macro_rules! blast_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[job {}] {}", $crate::job_context(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current job.
#[macro_export]
macro_rules! blast_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[job {}] {}", $crate::job_context(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Another test may have installed the logger already.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
