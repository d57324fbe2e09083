// =============================================================================
// ACTOR CONSTANTS
// =============================================================================

/// Actor recorded on updates made by the expiry sweeper. Reserved; requests
/// may not claim it.
pub const SYSTEM_CLEANUP_ACTOR: &str = "system-cleanup";

/// Actor recorded when a request does not name one
pub const DEFAULT_ACTOR: &str = "web-user";

// =============================================================================
// LISTING LIMITS
// =============================================================================

/// Default number of rows returned by the debug contents endpoint
pub const DEFAULT_DEBUG_LIMIT: i64 = 10;

/// Maximum number of rows returned by the debug contents endpoint
pub const MAX_DEBUG_LIMIT: i64 = 100;
