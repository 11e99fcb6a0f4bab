//! Shared constants for the account execution and sync relay core.

// =============================================================================
// External executable invocation
// =============================================================================

/// Fixed leading arguments passed to every task invocation.
pub const TASK_ARG_PREFIX: [&str; 2] = ["rc.color=off", "rc.verbose=nothing"];

/// Environment variable pointing the task binary at the account config file.
pub const ENV_TASKRC: &str = "TASKRC";

/// Environment variable pointing the task binary at the account data directory.
pub const ENV_TASKDATA: &str = "TASKDATA";

/// Per-account taskwarrior config file name (inside the account directory).
pub const TASKRC_FILE: &str = ".taskrc";

/// Per-account task data directory name (inside the account directory).
pub const DATA_DIR: &str = "data";

// =============================================================================
// Sync settings keys
// =============================================================================

/// Settings key for the CA certificate path.
pub const TASKD_CA: &str = "taskd.ca";

/// Settings key for the client certificate path.
pub const TASKD_CERTIFICATE: &str = "taskd.certificate";

/// Settings key for the client key path.
pub const TASKD_KEY: &str = "taskd.key";

/// Settings key for the remote sync endpoint (`host:port`).
pub const TASKD_SERVER: &str = "taskd.server";

// =============================================================================
// Relay wire format
// =============================================================================

/// Prefix for the per-account sync socket name.
pub const SYNC_SOCKET_PREFIX: &str = "taskwarrior.sync.";

/// Length of the sync frame header: a big-endian u32 total message length
/// that counts itself.
pub const FRAME_HEADER_LEN: usize = 4;

/// Chunk size for relayed frame payloads.
pub const RELAY_CHUNK_SIZE: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_prefix_disables_decoration() {
        assert!(TASK_ARG_PREFIX.contains(&"rc.color=off"));
        assert!(TASK_ARG_PREFIX.contains(&"rc.verbose=nothing"));
    }

    #[test]
    fn frame_header_is_u32() {
        assert_eq!(FRAME_HEADER_LEN, std::mem::size_of::<u32>());
    }

    #[test]
    fn chunk_size_exceeds_header() {
        assert!(RELAY_CHUNK_SIZE > FRAME_HEADER_LEN);
    }
}
