// Constants for the datagate modules
// This file contains global constants used across the workspace

/// The default configuration file name for the platform.
/// This constant is used to specify the default configuration file
/// that embedding applications will attempt to load at startup.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "datagate.toml";

/// Prefix for environment variable configuration overrides
/// (e.g. `DG__DB__POSTGRES__HOST=10.0.0.5`).
pub const ENV_PREFIX: &str = "DG";

/// Current wire envelope schema version.
pub const WIRE_SCHEMA_VERSION: u32 = 1;

/// Default command timeout applied when a command does not set one.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Upper bound any single command timeout is clamped against.
pub const MAX_COMMAND_TIMEOUT_MS: u64 = 600_000;

/// PostgreSQL identifier length limit (NAMEDATALEN - 1).
pub const MAX_IDENT_LEN: usize = 63;

/// Grace added on top of the command timeout for the client-side watchdog,
/// so the server-side `statement_timeout` is the one that normally fires.
pub const CLIENT_TIMEOUT_GRACE_MS: u64 = 2_000;
