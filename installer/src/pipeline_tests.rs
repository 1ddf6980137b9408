//! Unit tests for pipeline orchestration.
//!
//! The downloader serves an in-memory release, extraction is real, and
//! every external command is scripted through `StubRunner`, so these tests
//! exercise the full stage ordering inside a temporary directory.

use super::*;
use crate::builder::{BOOTSTRAP_LOG, BUILD_LOG, bootstrap_program, build_program};
use crate::download::{DownloadError, MockArchiveDownloader};
use crate::test_utils::{ExpectedCall, FakeDownloader, StubRunner, fake_release_tar};
use crate::version::BoostVersion;
use rstest::{fixture, rstest};
use std::fs;

const VERSION: BoostVersion = BoostVersion::new(1, 82, 0);

struct Sandbox {
    _temp: tempfile::TempDir,
    config: HeadersConfig,
    scratch: Utf8PathBuf,
}

impl Sandbox {
    fn output(&self) -> &Utf8Path {
        &self.config.output_dir
    }

    fn seed_previous_release(&self) {
        let old = self.output().join("boost/math");
        fs::create_dir_all(&old).expect("old headers");
        fs::write(old.join("old.hpp"), "// 1.80\n").expect("old header");
        fs::write(self.output().join("Boost_1_80_0_README.md"), "old").expect("old readme");
    }

    fn add_patch(&self, name: &str) {
        fs::create_dir_all(&self.config.patches_dir).expect("patch dir");
        fs::write(self.config.patches_dir.join(name), "diff").expect("patch");
    }

    fn scratch_is_empty(&self) -> bool {
        fs::read_dir(&self.scratch)
            .expect("read scratch")
            .next()
            .is_none()
    }

    fn run(
        &self,
        downloader: &dyn ArchiveDownloader,
        runner: &StubRunner,
    ) -> Result<GenerationOutcome> {
        let tools = Toolset {
            downloader,
            extractor: &TarExtractor,
            runner,
        };
        let mut sink = Vec::new();
        let mut reporter = Reporter::new(&mut sink, true);
        generate_headers_with(&self.config, tools, &mut reporter)
    }
}

#[fixture]
fn sandbox() -> Sandbox {
    let temp = tempfile::tempdir().expect("temp dir");
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
    let output = root.join("repo");
    let scratch = root.join("scratch");
    fs::create_dir_all(&output).expect("repo dir");
    fs::create_dir_all(&scratch).expect("scratch dir");

    let config = HeadersConfig {
        scratch_dir: Some(scratch.clone()),
        log_dir: root.join("logs"),
        ..HeadersConfig::new(VERSION, output)
    };
    Sandbox {
        _temp: temp,
        config,
        scratch,
    }
}

fn build_calls() -> Vec<ExpectedCall> {
    vec![ExpectedCall::bootstrap(0), ExpectedCall::b2_install(0)]
}

#[rstest]
fn successful_run_installs_release(sandbox: Sandbox) {
    let runner = StubRunner::new(build_calls());

    let outcome = sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect("pipeline succeeds");

    runner.assert_finished();
    let output = sandbox.output();
    assert!(output.join("boost/math/constants.hpp").is_file());
    assert!(output.join("LICENSE_1_0.txt").is_file());
    assert_eq!(
        fs::read_to_string(output.join("Boost_1_82_0_README.md")).expect("readme"),
        "# Boost 1.82.0\n"
    );
    assert_eq!(outcome.patches, Some(PatchReport::default()));
    assert!(sandbox.scratch_is_empty(), "tarball and build tree are removed");
}

#[rstest]
fn commands_run_in_source_tree_and_log_to_log_dir(sandbox: Sandbox) {
    let runner = StubRunner::new(build_calls());

    sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect("pipeline succeeds");

    let calls = runner.invocations();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].program, bootstrap_program());
    assert_eq!(calls[1].program, build_program());
    assert!(calls.iter().all(|c| c.working_dir.ends_with("boost_1_82_0")));
    assert_eq!(
        calls[0].log_file,
        Some(sandbox.config.log_dir.join(BOOTSTRAP_LOG))
    );
    assert_eq!(calls[1].log_file, Some(sandbox.config.log_dir.join(BUILD_LOG)));
}

#[rstest]
fn previous_release_is_replaced(sandbox: Sandbox) {
    sandbox.seed_previous_release();
    let runner = StubRunner::new(build_calls());

    sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect("pipeline succeeds");

    let output = sandbox.output();
    assert!(!output.join("boost/math/old.hpp").exists());
    assert!(!output.join("Boost_1_80_0_README.md").exists());
    assert!(output.join("Boost_1_82_0_README.md").is_file());
}

#[rstest]
#[case::bootstrap_fails(vec![ExpectedCall::bootstrap(1)])]
#[case::build_fails(vec![ExpectedCall::bootstrap(0), ExpectedCall::b2_install(2)])]
#[case::build_leaves_no_headers(vec![
    ExpectedCall::bootstrap(0),
    ExpectedCall::new(build_program(), 0),
])]
fn build_failures_leave_existing_headers(sandbox: Sandbox, #[case] calls: Vec<ExpectedCall>) {
    sandbox.seed_previous_release();
    let runner = StubRunner::new(calls);

    let err = sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect_err("pipeline fails");

    runner.assert_finished();
    assert!(
        matches!(
            err,
            HeadersError::BootstrapFailed { .. }
                | HeadersError::BuildFailed { .. }
                | HeadersError::HeadersNotGenerated { .. }
        ),
        "unexpected error: {err:?}"
    );
    assert!(sandbox.output().join("boost/math/old.hpp").is_file());
    assert!(sandbox.output().join("Boost_1_80_0_README.md").is_file());
    assert!(sandbox.scratch_is_empty(), "tarball is removed after failure");
}

#[rstest]
fn download_failure_removes_tarball(sandbox: Sandbox) {
    let mut downloader = MockArchiveDownloader::new();
    downloader.expect_download().times(1).returning(|url, _| {
        Err(DownloadError::NotFound {
            url: url.to_owned(),
        })
    });
    let runner = StubRunner::new(Vec::new());

    let err = sandbox.run(&downloader, &runner).expect_err("404 is fatal");

    assert!(matches!(
        err,
        HeadersError::Download(DownloadError::NotFound { .. })
    ));
    assert!(runner.invocations().is_empty());
    assert!(sandbox.scratch_is_empty());
}

#[rstest]
fn checksum_mismatch_stops_before_extraction(sandbox: Sandbox) {
    let config = HeadersConfig {
        expected_sha256: Some(Sha256Digest::of_bytes(b"some other tarball")),
        ..sandbox.config.clone()
    };
    let sandbox = Sandbox { config, ..sandbox };
    let runner = StubRunner::new(Vec::new());

    let err = sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect_err("mismatch is fatal");

    assert!(matches!(err, HeadersError::ChecksumMismatch { .. }));
    assert!(runner.invocations().is_empty());
    assert!(sandbox.scratch_is_empty());
}

#[rstest]
fn matching_checksum_is_accepted(sandbox: Sandbox) {
    let tar = fake_release_tar(&VERSION);
    let config = HeadersConfig {
        expected_sha256: Some(Sha256Digest::of_bytes(&tar)),
        ..sandbox.config.clone()
    };
    let sandbox = Sandbox { config, ..sandbox };
    let runner = StubRunner::new(build_calls());

    let outcome = sandbox
        .run(&FakeDownloader::new(tar), &runner)
        .expect("pipeline succeeds");

    assert_eq!(
        Some(&outcome.download.sha256),
        sandbox.config.expected_sha256.as_ref()
    );
}

#[rstest]
fn wrong_release_root_is_reported(sandbox: Sandbox) {
    let other = BoostVersion::new(1, 81, 0);
    let runner = StubRunner::new(Vec::new());

    let err = sandbox
        .run(&FakeDownloader::for_release(&other), &runner)
        .expect_err("source tree missing");

    assert!(
        matches!(err, HeadersError::SourceTreeMissing { ref path } if path.ends_with("boost_1_82_0"))
    );
    assert!(sandbox.scratch_is_empty());
}

#[rstest]
fn one_bad_patch_does_not_stop_the_rest(sandbox: Sandbox) {
    for name in ["01-a.patch", "02-b.patch", "03-c.patch"] {
        sandbox.add_patch(name);
    }
    let mut calls = build_calls();
    calls.extend([
        ExpectedCall::git_apply(0),
        ExpectedCall::git_apply(1),
        ExpectedCall::git_apply(0),
    ]);
    let runner = StubRunner::new(calls);

    let outcome = sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect("patch failures are not fatal");

    runner.assert_finished();
    let report = outcome.patches.expect("patches ran");
    assert_eq!(report.applied.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].patch.ends_with("02-b.patch"));
    let git_calls: Vec<_> = runner
        .invocations()
        .into_iter()
        .filter(|c| c.program == "git")
        .collect();
    assert!(git_calls.iter().all(|c| c.working_dir == sandbox.config.output_dir));
}

#[rstest]
fn skip_patches_runs_no_git(sandbox: Sandbox) {
    sandbox.add_patch("01-a.patch");
    let config = HeadersConfig {
        skip_patches: true,
        ..sandbox.config.clone()
    };
    let sandbox = Sandbox { config, ..sandbox };
    let runner = StubRunner::new(build_calls());

    let outcome = sandbox
        .run(&FakeDownloader::for_release(&VERSION), &runner)
        .expect("pipeline succeeds");

    runner.assert_finished();
    assert_eq!(outcome.patches, None);
}

#[rstest]
fn verbose_run_reports_timings(sandbox: Sandbox) {
    let runner = StubRunner::new(build_calls());
    let tools = Toolset {
        downloader: &FakeDownloader::for_release(&VERSION),
        extractor: &TarExtractor,
        runner: &runner,
    };
    let mut sink = Vec::new();
    let mut reporter = Reporter::new(&mut sink, true);

    generate_headers_with(&sandbox.config, tools, &mut reporter).expect("pipeline succeeds");

    let text = String::from_utf8(sink).expect("UTF-8 output");
    for stage in ["Download", "Extraction", "Bootstrap", "Build", "Install", "Patching"] {
        assert!(text.contains(&format!("{stage} took ")), "missing {stage} timing");
    }
    assert!(text.contains("Found no patches to apply!"));
}

#[test]
fn tarball_close_deletes_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let scratch = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("UTF-8 path");
    let tarball = Tarball::create(Some(&scratch)).expect("create");
    let path = tarball.path().to_path_buf();
    assert!(path.exists());
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("tar"));

    tarball.close().expect("close");

    assert!(!path.exists());
}

fn close_error() -> HeadersError {
    HeadersError::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "close"))
}

fn stage_error() -> HeadersError {
    HeadersError::SourceTreeMissing {
        path: Utf8PathBuf::from("/scratch/boost_1_82_0"),
    }
}

#[test]
fn stage_error_wins_over_close_error() {
    let result = settle_release::<()>(Err(stage_error()), Err(close_error()));
    assert!(matches!(result, Err(HeadersError::SourceTreeMissing { .. })));
}

#[test]
fn close_error_fails_an_otherwise_good_run() {
    let result = settle_release(Ok(1), Err(close_error()));
    assert!(matches!(result, Err(HeadersError::Io(_))));
}

#[test]
fn clean_release_keeps_the_outcome() {
    assert_eq!(settle_release(Ok(7), Ok(())).expect("settled"), 7);
}

#[rstest]
#[case::no_expectation(None, true)]
#[case::matching(Some(Sha256Digest::of_bytes(b"abc")), true)]
#[case::different(Some(Sha256Digest::of_bytes(b"xyz")), false)]
fn verify_checksum_compares_digests(#[case] expected: Option<Sha256Digest>, #[case] ok: bool) {
    let actual = Sha256Digest::of_bytes(b"abc");
    let result = verify_checksum("https://mirror.test/boost.tar.gz", expected.as_ref(), &actual);
    assert_eq!(result.is_ok(), ok);
}
