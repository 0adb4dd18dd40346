//! Default configuration constants for kitchen-timer.
//!
//! Shared between the config file types and the components that consume them.

/// Restart the recognition session when the engine ends on its own.
///
/// Platform engines end sessions after a stretch of silence even in
/// continuous mode; listening continues until the caller asks to stop.
pub const RESTART_ON_END: bool = true;

/// Maximum ranked alternatives kept per phrase.
///
/// 0 keeps every alternative the engine reports.
pub const MAX_ALTERNATIVES: usize = 5;

/// Seconds contributed by "and a half" in a minutes clause.
pub const HALF_MINUTE_SECS: u32 = 30;

/// Seconds per minute.
pub const SECS_PER_MINUTE: u32 = 60;

/// Separator between ranked alternatives on one typed input line.
pub const ALTERNATIVE_SEPARATOR: char = '|';

/// Default log filter for the command-line binary.
pub const LOG_LEVEL: &str = "warn";
