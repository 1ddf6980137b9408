//! Progress reporting and user-facing message formatting.
//!
//! The pipeline never prints directly. It receives a [`Reporter`] wrapping
//! whatever sink the caller chose (stderr for the binary, a `Vec<u8>` in
//! tests), so output can be asserted on without capturing process streams.

use crate::config::HeadersConfig;
use crate::patches::PatchReport;
use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;
use std::time::Duration;

/// Writes progress and error lines to a sink.
///
/// Informational lines are only written in verbose mode; errors are always
/// written. Write failures are ignored.
///
/// # Example
///
/// ```
/// use boost_headers::output::Reporter;
///
/// let mut sink = Vec::new();
/// let mut reporter = Reporter::new(&mut sink, false);
/// reporter.info("Downloading");
/// reporter.error("Failed to apply patch");
///
/// let text = String::from_utf8(sink).expect("UTF-8 output");
/// assert_eq!(text, "Failed to apply patch\n");
/// ```
pub struct Reporter<'w> {
    sink: &'w mut dyn Write,
    verbose: bool,
}

impl<'w> Reporter<'w> {
    /// Create a reporter writing to `sink`.
    #[must_use]
    pub fn new(sink: &'w mut dyn Write, verbose: bool) -> Self {
        Self { sink, verbose }
    }

    /// Write an informational line when verbose.
    pub fn info(&mut self, message: impl Display) {
        if self.verbose {
            write_line(self.sink, message);
        }
    }

    /// Write an error line unconditionally.
    pub fn error(&mut self, message: impl Display) {
        write_line(self.sink, message);
    }

    /// Report how long `stage` took.
    pub fn elapsed(&mut self, stage: &str, duration: Duration) {
        self.info(elapsed_message(stage, duration));
    }
}

/// Write one line to `sink`, ignoring failures.
pub fn write_line(sink: &mut dyn Write, message: impl Display) {
    if writeln!(sink, "{message}").is_err() {
        // Best-effort output; nothing sensible to do on failure.
    }
}

/// Format a stage timing with two decimal places.
///
/// ```
/// use boost_headers::output::elapsed_message;
/// use std::time::Duration;
///
/// assert_eq!(
///     elapsed_message("Download", Duration::from_millis(1234)),
///     "Download took 1.23 seconds"
/// );
/// ```
#[must_use]
pub fn elapsed_message(stage: &str, duration: Duration) -> String {
    format!("{stage} took {:.2} seconds", duration.as_secs_f64())
}

/// Format the final summary after a successful run.
#[must_use]
pub fn success_message(output_dir: &Utf8Path, report: &PatchReport) -> String {
    let headline = format!("Installed Boost headers into {output_dir}");
    match (report.applied.len(), report.failed.len()) {
        (0, 0) => headline,
        (applied, 0) => format!("{headline}; applied {applied} {}", patch_noun(applied)),
        (applied, failed) => format!(
            "{headline}; applied {applied} {}, {failed} failed",
            patch_noun(applied)
        ),
    }
}

const fn patch_noun(count: usize) -> &'static str {
    if count == 1 { "patch" } else { "patches" }
}

/// Resolved settings shown by `--dry-run`.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The configuration that would be used.
    pub config: &'a HeadersConfig,
}

impl DryRunInfo<'_> {
    /// Format the dry-run information for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let config = self.config;
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Boost version: {}", config.version),
            format!("Library: {}", config.library),
            format!("Download URL: {}", config.url()),
            format!("Output directory: {}", config.output_dir),
            format!("Header directory: {}", config.output_dir.join("boost")),
            format!("Readme: {}", config.output_dir.join(config.version.readme_name())),
            format!("Log directory: {}", config.log_dir),
        ];

        if let Some(scratch) = &config.scratch_dir {
            lines.push(format!("Temporary directory: {scratch}"));
        }
        if let Some(jobs) = config.jobs {
            lines.push(format!("Parallel jobs: {jobs}"));
        }
        if let Some(digest) = &config.expected_sha256 {
            lines.push(format!("Expected SHA-256: {digest}"));
        }

        if config.skip_patches {
            lines.push("Patches: skipped".to_owned());
        } else {
            lines.push(format!("Patches directory: {}", config.patches_dir));
        }

        lines.join("\n")
    }
}
