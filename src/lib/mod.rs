//! Example env file generation library.
//!
//! This library reads `.env` files and produces a sanitized template that keeps
//! comments, blank lines and key order while stripping or replacing the values.
//! The result is meant to be committed next to the real, git-ignored file.
//!
//! # Features
//!
//! - **Quote-aware parsing**: `=` and `#` inside quotes are not treated as separators
//! - **Structure preservation**: comments and unrecognised lines pass through verbatim
//! - **Multi-file merge**: inputs are merged in order, first definition of a key wins
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use env_example::example::{EnvExample, EnvExampleOptions};
//! use std::path::PathBuf;
//!
//! let options = EnvExampleOptions {
//!     inputs: vec![PathBuf::from(".env"), PathBuf::from(".env.local")],
//!     force: true,
//!     ..EnvExampleOptions::default()
//! };
//!
//! EnvExample::generate(&options).unwrap();
//! ```

pub mod cli;
pub mod example;
pub mod parse;
