//! Structured logging facility
//!
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! # Usage
//!
//! ```rust
//! use wallaby_core::logging_facility::{init, Profile};
//!
//! init(Profile::from_debug(false));
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};

// Used by the exported macros.
#[doc(hidden)]
pub use tracing as __tracing;
#[doc(hidden)]
pub use wallaby_core_types::schema as __fields;

pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
