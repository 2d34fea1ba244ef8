//! # aptkit
//!
//! Pure Rust library for driving the Debian package manager.
//!
//! This crate provides functionality for:
//! - Reading the dpkg package database
//! - Installing, purging and cleaning packages through `apt-get`
//! - Classifying apt diagnostics into actionable error categories
//! - Waiting (bounded) for another process to release the package lock
//!
//! ## Example
//!
//! ```no_run
//! use aptkit::backend::{Backend, default_backend};
//! use regex::Regex;
//!
//! let apt = default_backend();
//! let installed = apt.list_selections().expect("dpkg-query failed");
//!
//! let llvm = Regex::new(r"^(clang|lld|lldb|llvm)-\d+").unwrap();
//! let leftovers = aptkit::matching_names(&installed, &[llvm]);
//! if !leftovers.is_empty() {
//!     apt.purge(&leftovers).expect("purge failed");
//! }
//! ```
//!
//! ## Error classification
//!
//! ```
//! use aptkit::{Error, ErrorCategory};
//!
//! let err = Error::from_apt_output(
//!     "apt-get install -y lldb-19",
//!     Some(100),
//!     "E: Unable to locate package lldb-19",
//! );
//! assert_eq!(err.category(), ErrorCategory::NotFound);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::{Backend, Invocation, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use types::{PackageState, Selection, matching_names, parse_selections};
