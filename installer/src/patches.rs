//! Local patch discovery and application.
//!
//! Patches are unified diffs kept in the repository and applied with
//! `git apply` after fresh headers are installed. A patch that fails is
//! reported and skipped; it never aborts the run.

use crate::command::{CommandRunner, Invocation};
use crate::error::{HeadersError, Result, describe_status};
use crate::output::Reporter;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::time::Duration;

/// File extension identifying patch files.
pub const PATCH_EXTENSION: &str = "patch";

/// Upper bound on a single `git apply`.
pub const PATCH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Message written when the patch directory holds no patches.
pub const NO_PATCHES_MESSAGE: &str = "Found no patches to apply!";

/// A patch that did not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFailure {
    /// The patch file.
    pub patch: Utf8PathBuf,
    /// Exit status, spawn error, or timeout description.
    pub reason: String,
}

/// Outcome of applying a patch set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// Patches that applied cleanly, in application order.
    pub applied: Vec<Utf8PathBuf>,
    /// Patches that failed, in application order.
    pub failed: Vec<PatchFailure>,
}

impl PatchReport {
    /// Number of patches attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.applied.len() + self.failed.len()
    }

    /// True when every attempted patch applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// List the `*.patch` files in `dir`, sorted by file name.
///
/// A directory that does not exist yields no patches.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read, or
/// [`HeadersError::NonUtf8Path`] for a non-UTF-8 entry.
pub fn discover_patches(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        log::debug!("patch directory {dir} does not exist");
        return Ok(Vec::new());
    }

    let mut patches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let path = Utf8PathBuf::try_from(path)
            .map_err(|e| HeadersError::NonUtf8Path { path: e.into_path_buf() })?;
        if path.is_file() && path.extension() == Some(PATCH_EXTENSION) {
            patches.push(path);
        }
    }
    patches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(patches)
}

/// Applies patches to a repository with `git apply`.
pub struct PatchApplier<'a> {
    repo_dir: Utf8PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> PatchApplier<'a> {
    /// Create an applier that runs `git apply` inside `repo_dir`.
    #[must_use]
    pub fn new(repo_dir: &Utf8Path, runner: &'a dyn CommandRunner) -> Self {
        Self {
            repo_dir: repo_dir.to_owned(),
            runner,
        }
    }

    /// The command applying `patch`.
    #[must_use]
    pub fn invocation(&self, patch: &Utf8Path) -> Invocation {
        Invocation::new("git", &self.repo_dir)
            .arg("apply")
            .arg(patch.as_str())
            .with_timeout(PATCH_TIMEOUT)
    }

    /// Apply every patch in order, continuing past failures.
    ///
    /// Each failure is written to `reporter` as an error. When `patches` is
    /// empty, [`NO_PATCHES_MESSAGE`] is reported instead.
    pub fn apply_all(&self, patches: &[Utf8PathBuf], reporter: &mut Reporter<'_>) -> PatchReport {
        let mut report = PatchReport::default();

        for patch in patches {
            reporter.info(format!("Applying patch {patch}"));
            match self.apply(patch) {
                Ok(()) => report.applied.push(patch.clone()),
                Err(reason) => {
                    reporter.error(format!("Failed to apply patch {patch}: {reason}"));
                    report.failed.push(PatchFailure {
                        patch: patch.clone(),
                        reason,
                    });
                }
            }
        }

        if report.attempted() == 0 {
            reporter.info(NO_PATCHES_MESSAGE);
        }
        report
    }

    fn apply(&self, patch: &Utf8Path) -> std::result::Result<(), String> {
        match self.runner.run(&self.invocation(patch)) {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stderr = stderr.trim();
                let status = describe_status(output.status);
                if stderr.is_empty() {
                    Err(format!("git apply exited with status {status}"))
                } else {
                    Err(format!("git apply exited with status {status}: {stderr}"))
                }
            }
            Err(err) => Err(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::test_utils::{ExpectedCall, StubRunner, output_with_code};
    use rstest::{fixture, rstest};

    struct Repo {
        _temp: tempfile::TempDir,
        root: Utf8PathBuf,
    }

    impl Repo {
        fn patches_dir(&self) -> Utf8PathBuf {
            self.root.join("patches")
        }

        fn add_patch(&self, name: &str) -> Utf8PathBuf {
            let dir = self.patches_dir();
            fs::create_dir_all(&dir).expect("patch dir");
            let path = dir.join(name);
            fs::write(&path, "--- a/x\n+++ b/x\n").expect("write patch");
            path
        }
    }

    #[fixture]
    fn repo() -> Repo {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        Repo { _temp: temp, root }
    }

    fn git_calls(count: usize, failing: &[usize]) -> Vec<ExpectedCall> {
        (0..count)
            .map(|i| ExpectedCall::git_apply(i32::from(failing.contains(&i))))
            .collect()
    }

    #[rstest]
    fn missing_directory_has_no_patches(repo: Repo) {
        let patches = discover_patches(&repo.patches_dir()).expect("discover");
        assert!(patches.is_empty());
    }

    #[rstest]
    fn discovery_filters_and_sorts(repo: Repo) {
        let second = repo.add_patch("20-tools.patch");
        let first = repo.add_patch("10-constants.patch");
        fs::write(repo.patches_dir().join("notes.txt"), "").expect("other file");
        fs::create_dir_all(repo.patches_dir().join("dir.patch")).expect("dir");

        let patches = discover_patches(&repo.patches_dir()).expect("discover");

        assert_eq!(patches, vec![first, second]);
    }

    #[rstest]
    fn invocation_runs_git_apply_in_repo(repo: Repo) {
        let runner = MockCommandRunner::new();
        let applier = PatchApplier::new(&repo.root, &runner);
        let patch = repo.patches_dir().join("fix.patch");

        let invocation = applier.invocation(&patch);

        assert_eq!(invocation.program, "git");
        assert_eq!(invocation.args, vec!["apply".to_owned(), patch.to_string()]);
        assert_eq!(invocation.working_dir, repo.root);
        assert_eq!(invocation.timeout, Some(PATCH_TIMEOUT));
        assert_eq!(invocation.log_file, None);
    }

    #[rstest]
    #[case::all_apply(3, &[][..])]
    #[case::middle_fails(3, &[1][..])]
    #[case::all_fail(2, &[0, 1][..])]
    fn failures_do_not_stop_later_patches(
        repo: Repo,
        #[case] count: usize,
        #[case] failing: &[usize],
    ) {
        let patches: Vec<_> = (0..count)
            .map(|i| repo.add_patch(&format!("{i:02}.patch")))
            .collect();
        let runner = StubRunner::new(git_calls(count, failing));
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, false);

        let report = PatchApplier::new(&repo.root, &runner).apply_all(&patches, &mut reporter);

        runner.assert_finished();
        assert_eq!(report.attempted(), count);
        assert_eq!(report.failed.len(), failing.len());
        for index in failing {
            assert_eq!(report.failed.iter().filter(|f| f.patch == patches[*index]).count(), 1);
        }
        let errors = String::from_utf8(sink).expect("UTF-8 output");
        assert_eq!(errors.lines().count(), failing.len());
    }

    #[rstest]
    fn spawn_failure_counts_as_failed_patch(repo: Repo) {
        let patch = repo.add_patch("fix.patch");
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Err(HeadersError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "git not found",
            )))
        });
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, false);

        let report = PatchApplier::new(&repo.root, &runner).apply_all(&[patch], &mut reporter);

        assert!(!report.is_clean());
        assert!(report.failed[0].reason.contains("git not found"));
    }

    #[rstest]
    fn timeout_counts_as_failed_patch(repo: Repo) {
        let patch = repo.add_patch("slow.patch");
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|invocation| {
            Err(HeadersError::CommandTimedOut {
                program: invocation.program.clone(),
                seconds: 300,
            })
        });
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, false);

        let report = PatchApplier::new(&repo.root, &runner).apply_all(&[patch], &mut reporter);

        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("timed out"));
    }

    #[rstest]
    fn failure_reason_includes_git_stderr(repo: Repo) {
        let patch = repo.add_patch("bad.patch");
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            let mut output = output_with_code(1);
            output.stderr = b"error: patch failed: boost/math/x.hpp:3\n".to_vec();
            Ok(output)
        });
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, false);

        let report = PatchApplier::new(&repo.root, &runner).apply_all(&[patch], &mut reporter);

        assert_eq!(
            report.failed[0].reason,
            "git apply exited with status 1: error: patch failed: boost/math/x.hpp:3"
        );
    }

    #[rstest]
    #[case::verbose(true, "Found no patches to apply!\n")]
    #[case::quiet(false, "")]
    fn empty_patch_set_reports_once(repo: Repo, #[case] verbose: bool, #[case] expected: &str) {
        let runner = MockCommandRunner::new();
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, verbose);

        let report = PatchApplier::new(&repo.root, &runner).apply_all(&[], &mut reporter);

        assert_eq!(report, PatchReport::default());
        assert_eq!(String::from_utf8_lossy(&sink), expected);
    }

    #[cfg(unix)]
    #[rstest]
    fn real_git_applies_good_patches_around_a_bad_one(repo: Repo) {
        use crate::command::SystemCommandRunner;

        let status = std::process::Command::new("git")
            .args(["init", "-q"])
            .current_dir(&repo.root)
            .status()
            .expect("run git init");
        assert!(status.success());
        let headers = repo.root.join("boost/math");
        fs::create_dir_all(&headers).expect("header dir");
        for name in ["a", "b", "c"] {
            fs::write(headers.join(format!("{name}.hpp")), format!("int {name} = 1;\n"))
                .expect("write header");
        }

        let edit = |name: &str, from: u32, to: u32| {
            format!(
                "--- a/boost/math/{name}.hpp\n+++ b/boost/math/{name}.hpp\n@@ -1 +1 @@\n-int {name} = {from};\n+int {name} = {to};\n"
            )
        };
        fs::create_dir_all(repo.patches_dir()).expect("patch dir");
        fs::write(repo.patches_dir().join("01-a.patch"), edit("a", 1, 2)).expect("patch 01");
        fs::write(repo.patches_dir().join("02-b.patch"), edit("b", 99, 2)).expect("patch 02");
        fs::write(repo.patches_dir().join("03-c.patch"), edit("c", 1, 2)).expect("patch 03");

        let patches = discover_patches(&repo.patches_dir()).expect("discover");
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, false);
        let report =
            PatchApplier::new(&repo.root, &SystemCommandRunner).apply_all(&patches, &mut reporter);

        let read = |name: &str| fs::read_to_string(headers.join(name)).expect("read header");
        assert_eq!(read("a.hpp"), "int a = 2;\n");
        assert_eq!(read("b.hpp"), "int b = 1;\n");
        assert_eq!(read("c.hpp"), "int c = 2;\n");
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].patch.file_name(), Some("02-b.patch"));
    }
}
