//! CLI Exit Code Registry
//!
//! Single source of truth for `tmerge` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unexpected response shape, ...)    |
//! | 2    | Usage error (bad arguments)                       |
//! | 60   | Invalid or missing merge configuration            |
//! | 61   | No API token                                      |
//! | 62   | Access verification failed                        |
//! | 63   | Remote rejected a request (4xx)                   |
//! | 64   | Retries exhausted (rate limited or 5xx)           |
//! | 65   | Timeout or network failure                        |

// =============================================================================
// Universal (0-2)
// =============================================================================

pub const EXIT_SUCCESS: u8 = 0;

/// General error. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments. clap uses the same code for its own parse errors.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (60-69)
// =============================================================================

/// Config file unreadable, unparseable or invalid; or no config given.
pub const EXIT_MERGE_CONFIG: u8 = 60;

/// Neither `--token` nor `CODA_API_TOKEN` is set (or it is blank).
pub const EXIT_MERGE_MISSING_TOKEN: u8 = 61;

/// Token, destination or a source document could not be reached.
/// Nothing was written.
pub const EXIT_MERGE_ACCESS: u8 = 62;

/// The service rejected a request after verification. Earlier write
/// batches may already be applied.
pub const EXIT_MERGE_REMOTE: u8 = 63;

/// 429/5xx on every attempt.
pub const EXIT_MERGE_RETRY_EXHAUSTED: u8 = 64;

/// Request timed out, or the connection failed.
pub const EXIT_MERGE_NETWORK: u8 = 65;
