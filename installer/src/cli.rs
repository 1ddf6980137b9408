//! CLI argument definitions for `boost-make-headers`.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::digest::Sha256Digest;
use crate::version::BoostVersion;
use camino::Utf8PathBuf;
use clap::Parser;

/// Default Boost library whose headers are generated.
pub const DEFAULT_LIBRARY: &str = "math";

/// Generate Boost headers for a single library and install them into a repository.
#[derive(Parser, Debug, Clone)]
#[command(name = "boost-make-headers")]
#[command(version, about)]
#[command(long_about = concat!(
    "Generate Boost headers for a single library and install them into a repository.\n\n",
    "The requested Boost release is downloaded, unpacked into a temporary directory ",
    "and built with Boost's own bootstrap script and b2 for one library only. The ",
    "resulting header tree replaces <output>/boost, and the release's license and ",
    "readme are copied next to it. Finally every *.patch file in the patches ",
    "directory is applied with `git apply`.\n\n",
    "A patch that fails to apply is reported but does not fail the run. Any other ",
    "failure stops the run immediately.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Regenerate the math headers for Boost 1.82.0 in the current repository:\n",
    "    $ boost-make-headers --boost-version 1.82.0 -v\n\n",
    "  Verify the download and build with four jobs:\n",
    "    $ boost-make-headers --boost-version 1.84.0 --sha256 <HEX> -j 4\n\n",
    "  Preview the URL and paths without touching anything:\n",
    "    $ boost-make-headers --boost-version 1.82.0 --dry-run\n\n",
    "Build output is written to bootstrap.log and b2.log in the log directory.",
))]
pub struct Cli {
    /// Boost release to fetch, for example 1.82.0.
    #[arg(long, value_name = "X.Y.Z")]
    pub boost_version: BoostVersion,

    /// Show progress and timings.
    #[arg(short, long)]
    pub verbose: bool,

    /// Boost library to build.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_LIBRARY)]
    pub library: String,

    /// Base URL of the release mirror [default: archives.boost.io].
    #[arg(long, value_name = "URL")]
    pub mirror: Option<String>,

    /// Repository directory receiving the headers [default: current directory].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Directory holding the .patch files [default: patches in the output directory].
    #[arg(long, value_name = "DIR")]
    pub patches_dir: Option<Utf8PathBuf>,

    /// Directory for bootstrap.log and b2.log [default: output directory].
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<Utf8PathBuf>,

    /// Parent directory for the downloaded tarball and build tree [default: system temp].
    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<Utf8PathBuf>,

    /// Number of parallel b2 jobs.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Expected SHA-256 of the downloaded .tar.gz.
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<Sha256Digest>,

    /// Install headers without applying patches.
    #[arg(long)]
    pub skip_patches: bool,

    /// Show configuration and exit without downloading or building.
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
