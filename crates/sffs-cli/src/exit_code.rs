//! Exit codes for the CLI.
//!
//! These follow common Unix conventions and give scripts a way to tell
//! failures apart without parsing messages. Usage errors exit with 2 from
//! clap itself.

/// Successful execution
pub const SUCCESS: u8 = 0;

/// General/unspecified error
pub const GENERAL_ERROR: u8 = 1;

/// Host folder missing or not a directory
pub const HOST_UNAVAILABLE: u8 = 3;

/// Configuration file unreadable or invalid
pub const CONFIG_INVALID: u8 = 4;

/// Permission denied or read-only refusal
pub const PERMISSION_DENIED: u8 = 5;

/// Operation not supported by the shared folder
pub const NOT_SUPPORTED: u8 = 6;

/// File or directory not found (within the shared folder)
pub const NOT_FOUND: u8 = 7;

/// Operation interrupted
pub const CANCELLED: u8 = 8;
