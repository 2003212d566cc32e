// src/constants.rs

/// The leading process argument that routes a run into command dispatch
/// instead of the normal long-lived service.
pub const DEFAULT_CLI_SENTINEL: &str = "cli";

/// The separator between the bag prefix and the command name in an entry
/// token (`users:create-admin`).
pub const ENTRY_TOKEN_SEPARATOR: char = ':';
