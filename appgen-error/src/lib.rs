//! # appgen-error
//!
//! Unified error handling for appgen.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., PlannerFailed, ToolAgentFailed)
//! - **ErrorStatus**: Decide how to treat it (Permanent, Temporary, Persistent)
//! - **Error Context**: Key-value pairs that locate the cause
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use appgen_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::PlannerFailed, "model returned no plan")
//!         .with_operation("planner::run")
//!         .with_context("model", "openai/gpt-oss-120b"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All library functions return `Result<T, appgen_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, callers further up only append context
//! - No blanket `From<OtherError>` impls besides `std::io::Error`

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using appgen Error
pub type Result<T> = std::result::Result<T, Error>;
