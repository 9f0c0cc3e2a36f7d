//! Constants used throughout the console core crate.

/// Number of generated ids the store tries before giving up on a collision-free id.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Upper bound for the bounded-parallel worker count.
pub const MAX_WORKERS_LIMIT: usize = 64;

/// Environment variable the host reads at startup to pick the execution mode.
pub const MAX_WORKERS_ENV: &str = "CONSOLE_MAX_WORKERS";

/// Prefix used by the host when it asks for deterministic, counter-based ids.
pub const SEQUENTIAL_ID_PREFIX: &str = "sum";

/// Environment variable selecting `uuid` or `sequential` id generation.
pub const ID_STRATEGY_ENV: &str = "CONSOLE_ID_STRATEGY";
