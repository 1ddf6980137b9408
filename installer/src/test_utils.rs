//! Shared test utilities for the crate and its integration tests.
//!
//! Available under `cfg(test)` and with the `test-support` feature.

use crate::builder::{bootstrap_program, build_program};
use crate::command::{CommandRunner, Invocation};
use crate::digest::Sha256Digest;
use crate::download::{ArchiveDownloader, DownloadError, DownloadSummary};
use crate::error::{HeadersError, Result};
use crate::version::BoostVersion;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Output};

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a command `Output` with the given exit code and empty streams.
#[must_use]
pub fn output_with_code(code: i32) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// A side effect a stubbed command performs before "exiting".
pub type StubEffect = fn(&Invocation) -> std::io::Result<()>;

/// Represents an expected command invocation for testing.
#[derive(Debug, Clone)]
pub struct ExpectedCall {
    /// The program the pipeline is expected to run.
    pub program: String,
    /// The exit code to report.
    pub exit_code: i32,
    /// Optional filesystem side effect, run before returning.
    pub effect: Option<StubEffect>,
}

impl ExpectedCall {
    /// Expect `program` and report `exit_code`.
    #[must_use]
    pub fn new(program: impl Into<String>, exit_code: i32) -> Self {
        Self {
            program: program.into(),
            exit_code,
            effect: None,
        }
    }

    /// Expect the platform bootstrap script.
    #[must_use]
    pub fn bootstrap(exit_code: i32) -> Self {
        Self::new(bootstrap_program(), exit_code)
    }

    /// Expect the platform build tool; on success it lays out an install tree
    /// under the invocation's `--prefix`.
    #[must_use]
    pub fn b2_install(exit_code: i32) -> Self {
        let call = Self::new(build_program(), exit_code);
        if exit_code == 0 {
            call.with_effect(fake_b2_install)
        } else {
            call
        }
    }

    /// Expect `git apply` and report `exit_code`.
    #[must_use]
    pub fn git_apply(exit_code: i32) -> Self {
        Self::new("git", exit_code)
    }

    /// Attach a side effect.
    #[must_use]
    pub fn with_effect(mut self, effect: StubEffect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Writes the header tree a successful `b2 install` would produce.
///
/// # Errors
///
/// Returns an error when the invocation carries no `--prefix` or the files
/// cannot be written.
pub fn fake_b2_install(invocation: &Invocation) -> std::io::Result<()> {
    let prefix = invocation
        .option_value("prefix")
        .ok_or_else(|| std::io::Error::other("b2 invoked without --prefix"))?;
    let math = Path::new(prefix).join("include/boost/math");
    std::fs::create_dir_all(&math)?;
    std::fs::write(math.join("constants.hpp"), "// generated\n")?;
    std::fs::write(
        Path::new(prefix).join("include/boost/version.hpp"),
        "#define BOOST_VERSION 0\n",
    )
}

/// A stub implementation of `CommandRunner` for testing.
///
/// Returns scripted results in order and records every invocation it
/// receives, allowing tests to verify ordering and arguments without
/// spawning processes.
#[derive(Debug, Default)]
pub struct StubRunner {
    expected: RefCell<VecDeque<ExpectedCall>>,
    received: RefCell<Vec<Invocation>>,
}

impl StubRunner {
    /// Creates a new `StubRunner` with the given expected calls.
    #[must_use]
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            received: RefCell::new(Vec::new()),
        }
    }

    /// Returns every invocation received so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<Invocation> {
        self.received.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        let remaining = self.expected.borrow();
        assert!(
            remaining.is_empty(),
            "expected no further command invocations, {} remaining: {:?}",
            remaining.len(),
            remaining.iter().map(|c| &c.program).collect::<Vec<_>>()
        );
    }
}

impl CommandRunner for StubRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output> {
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| HeadersError::StubMismatch {
                message: format!("unexpected invocation `{}`", invocation.command_line()),
            })?;

        if call.program != invocation.program {
            return Err(HeadersError::StubMismatch {
                message: format!(
                    "expected `{}`, got `{}`",
                    call.program,
                    invocation.command_line()
                ),
            });
        }

        self.received.borrow_mut().push(invocation.clone());
        if let Some(effect) = call.effect {
            effect(invocation)?;
        }
        Ok(output_with_code(call.exit_code))
    }
}

/// Builds an uncompressed tarball shaped like a Boost source release.
///
/// # Panics
///
/// Panics if the in-memory archive cannot be assembled.
#[must_use]
#[expect(clippy::expect_used, reason = "test fixture construction")]
pub fn fake_release_tar(version: &BoostVersion) -> Vec<u8> {
    let root = version.archive_stem();
    let readme = format!("# Boost {version}\n");
    let entries: [(String, &[u8], u32); 4] = [
        (format!("{root}/bootstrap.sh"), b"#!/bin/sh\nexit 0\n", 0o755),
        (
            format!("{root}/LICENSE_1_0.txt"),
            b"Boost Software License - Version 1.0\n",
            0o644,
        ),
        (format!("{root}/README.md"), readme.as_bytes(), 0o644),
        (format!("{root}/boost/math/constants.hpp"), b"// source\n", 0o644),
    ];

    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(mode);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents)
            .expect("append fixture entry");
    }
    builder.into_inner().expect("finish fixture tarball")
}

/// An `ArchiveDownloader` that serves a fixed tarball from memory.
#[derive(Debug, Clone)]
pub struct FakeDownloader {
    tar: Vec<u8>,
}

impl FakeDownloader {
    /// Serve `tar` for every request.
    #[must_use]
    pub const fn new(tar: Vec<u8>) -> Self {
        Self { tar }
    }

    /// Serve a fake release for `version`.
    #[must_use]
    pub fn for_release(version: &BoostVersion) -> Self {
        Self::new(fake_release_tar(version))
    }
}

impl ArchiveDownloader for FakeDownloader {
    fn download(
        &self,
        url: &str,
        sink: &mut File,
    ) -> std::result::Result<DownloadSummary, DownloadError> {
        sink.write_all(&self.tar)
            .and_then(|()| sink.flush())
            .map_err(|source| DownloadError::Stream {
                url: url.to_owned(),
                source,
            })?;
        Ok(DownloadSummary {
            bytes_received: self.tar.len() as u64,
            bytes_written: self.tar.len() as u64,
            sha256: Sha256Digest::of_bytes(&self.tar),
        })
    }
}
