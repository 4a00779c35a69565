//! # Shiori Core Kernel
//!
//! Fundamental pieces shared by every subsystem of `shiori-core`:
//!
//! - **Core Constants**: system-wide constants via the `constants` submodule
//!   (directory names, persisted-state file names, the hook time budget).
//! - **Error Handling**: the top-level [`Error`](error::Error) type and a
//!   `Result` alias in the `error` submodule, wrapping the typed subsystem
//!   errors from the plugin system and storage.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
