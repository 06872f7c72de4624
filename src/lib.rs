//! iFunny Bot - Main Library
//!
//! Re-exports the workspace libraries plus the helpers shared by the
//! binaries.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **ifunny**: Client, events, pagination (re-exported from workspace)
//! - **chatsockets**: Chat transport (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use ifunny_bot::bin_common::{load_client_config, ConfigType};
//! use ifunny_bot::ifunny::Client;
//! ```

// Re-export workspace libraries for convenience
pub use chatsockets;
pub use ifunny;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_client_config, load_config_from_env, parse_args, ConfigType};
    pub use runner::{shutdown_signal, BinaryRunner, RunConfig};
}
