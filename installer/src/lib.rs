//! Boost header generation library.
//!
//! This crate downloads a Boost source release, builds the headers of a
//! single library with Boost's own toolchain, and installs them into a
//! repository together with the release's license and readme, finally
//! applying local patches. It is used by the `boost-make-headers` binary and
//! can be driven programmatically with substitute collaborators.
//!
//! # Modules
//!
//! - [`builder`] - Bootstrap and `b2` orchestration
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - External command execution
//! - [`config`] - Resolved run configuration
//! - [`digest`] - SHA-256 digests of downloaded bytes
//! - [`download`] - Release tarball download and decompression
//! - [`error`] - Semantic error types
//! - [`extraction`] - Tarball extraction with traversal protection
//! - [`install`] - Replacing the repository's header tree
//! - [`output`] - Progress reporting and message formatting
//! - [`patches`] - Patch discovery and `git apply`
//! - [`pipeline`] - End-to-end pipeline orchestration
//! - [`version`] - Boost version parsing and derived names

pub mod builder;
pub mod cli;
pub mod command;
pub mod config;
pub mod digest;
pub mod download;
pub mod error;
pub mod extraction;
pub mod install;
pub mod output;
pub mod patches;
pub mod pipeline;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
