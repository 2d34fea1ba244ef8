//! # toolchain
//!
//! Pure Rust library for choosing and building compiler toolchains.
//!
//! This crate provides functionality for:
//! - Matching versioned components (e.g. an interpreter and the compilers it supports)
//! - Fetching remote artifacts with curl-compatible failure codes
//! - Extracting `.tar.gz` source archives
//! - Running configure/make builds against a chosen compiler
//!
//! ## Version matching
//!
//! ```
//! use toolchain::{VersionSet, highest_common};
//!
//! let available = VersionSet::from_package_names(["gcc-11", "gcc-12", "gcc-13"], "gcc-");
//! let supported = VersionSet::new(vec![10, 11, 12]);
//!
//! assert_eq!(highest_common(&available, &supported), Ok(12));
//! ```
//!
//! ## Building from source
//!
//! ```no_run
//! use toolchain::archive::extract_targz;
//! use toolchain::build::{BuildDriver, BuildRecipe, Compiler, MakeBuild};
//! use toolchain::transport::{HttpTransport, Transport};
//! use std::path::Path;
//!
//! let bytes = HttpTransport::default()
//!     .fetch("https://www.python.org/ftp/python/3.12.1/Python-3.12.1.tgz")
//!     .unwrap();
//! let dest = Path::new("/usr/local/src");
//! extract_targz(&bytes, dest).unwrap();
//!
//! let recipe = BuildRecipe {
//!     source_dir: dest.join("Python-3.12.1"),
//!     prefix: "/opt/python/3.12.1".into(),
//!     compiler: Compiler::gcc(12),
//!     configure_flags: vec![],
//!     jobs: 8,
//!     run_tests: false,
//! };
//! MakeBuild.build(&recipe).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod build;
pub mod error;
pub mod transport;
pub mod version;

pub use build::{BuildDriver, BuildRecipe, Compiler, MakeBuild, MockBuild};
pub use error::{Error, NoCompatibleVersion, Result, TransportError};
pub use transport::{HttpTransport, MockTransport, Transport};
pub use version::{VersionSet, contains_sorted, highest_common};
