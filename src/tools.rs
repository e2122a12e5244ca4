use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::model::PageRange;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Page-level operations delegated to external PDF tooling.
pub trait PdfTools {
    fn page_count(&self, pdf_path: &Path) -> Result<usize>;

    /// Plain text of exactly one 1-based page, layout spacing preserved.
    fn page_text(&self, pdf_path: &Path, page: usize) -> Result<String>;

    /// Writes a new document holding `ranges` in order to `output_path`.
    fn materialize(&self, pdf_path: &Path, ranges: &[PageRange], output_path: &Path) -> Result<()>;
}

/// `pdfinfo` and `pdftotext` from poppler-utils plus `pdftk`, each run under a
/// bounded timeout.
#[derive(Debug, Clone)]
pub struct CommandLineTools {
    timeout: Duration,
}

impl CommandLineTools {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn ensure_available(&self, programs: &[&str]) -> Result<()> {
        let missing = programs
            .iter()
            .copied()
            .filter(|program| !command_available(program))
            .collect::<Vec<&str>>();

        if !missing.is_empty() {
            bail!("required tools not found on PATH: {}", missing.join(", "));
        }
        Ok(())
    }

    fn run(&self, command: Command) -> Result<Output> {
        run_with_timeout(command, self.timeout)
    }
}

impl PdfTools for CommandLineTools {
    fn page_count(&self, pdf_path: &Path) -> Result<usize> {
        let mut command = Command::new("pdfinfo");
        command.arg(pdf_path);

        let output = self
            .run(command)
            .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;
        ensure_success("pdfinfo", pdf_path, &output)?;

        let page_count = parse_page_count(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("failed to read page count of {}", pdf_path.display()))?;
        debug!(path = %pdf_path.display(), page_count, "queried page count");
        Ok(page_count)
    }

    fn page_text(&self, pdf_path: &Path, page: usize) -> Result<String> {
        let mut command = Command::new("pdftotext");
        command
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg(pdf_path)
            .arg("-");

        let output = self.run(command).with_context(|| {
            format!(
                "failed to execute pdftotext for {} page {}",
                pdf_path.display(),
                page
            )
        })?;
        ensure_success("pdftotext", pdf_path, &output)?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace(['\u{0000}', '\u{000C}'], ""))
    }

    fn materialize(&self, pdf_path: &Path, ranges: &[PageRange], output_path: &Path) -> Result<()> {
        if ranges.is_empty() {
            bail!("no page ranges to write for {}", pdf_path.display());
        }

        let mut command = Command::new("pdftk");
        command.arg(pdf_path).arg("cat");
        for range in ranges {
            command.arg(range.to_string());
        }
        command.arg("output").arg(output_path);

        let output = self
            .run(command)
            .with_context(|| format!("failed to execute pdftk for {}", pdf_path.display()))?;
        ensure_success("pdftk", pdf_path, &output)
    }
}

/// Rewrites `pdf_path` so it holds only `keep`. The new document is written to
/// a sibling temporary file first and renamed over the original on success.
pub fn replace_with_pages(tools: &dyn PdfTools, pdf_path: &Path, keep: &[PageRange]) -> Result<()> {
    let temp_path = sibling_temp_path(pdf_path)?;

    if let Err(error) = tools.materialize(pdf_path, keep, &temp_path) {
        remove_temp_file(&temp_path);
        return Err(error);
    }

    if let Err(error) = fs::rename(&temp_path, pdf_path) {
        remove_temp_file(&temp_path);
        return Err(error).with_context(|| {
            format!("failed to replace {} with rewritten pages", pdf_path.display())
        });
    }

    info!(path = %pdf_path.display(), ranges = keep.len(), "rewrote document pages");
    Ok(())
}

fn sibling_temp_path(pdf_path: &Path) -> Result<PathBuf> {
    let file_name = pdf_path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid UTF-8 filename: {}", pdf_path.display()))?;
    let temp_name = format!(".{}.pdfsplit-{}.tmp", file_name, std::process::id());

    Ok(match pdf_path.parent() {
        Some(parent) => parent.join(temp_name),
        None => PathBuf::from(temp_name),
    })
}

fn remove_temp_file(path: &Path) {
    if path.exists() {
        if let Err(error) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %error, "failed to remove temporary file");
        }
    }
}

fn ensure_success(program: &str, pdf_path: &Path, output: &Output) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} returned non-zero exit status for {}: {}",
            program,
            pdf_path.display(),
            stderr.trim()
        );
    }
    Ok(())
}

pub fn parse_page_count(pdfinfo_stdout: &str) -> Result<usize> {
    let line = pdfinfo_stdout
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .context("pdfinfo output has no 'Pages:' line")?;

    let value = line.trim_start_matches("Pages:").trim();
    value
        .parse::<usize>()
        .with_context(|| format!("invalid page count: {value}"))
}

fn command_available(program: &str) -> bool {
    Command::new(program)
        .arg("-v")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Runs `command` to completion, killing it once `timeout` has elapsed.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {program}"))?;

    // Pipes are drained on their own threads so a chatty child cannot block
    // on a full pipe while we poll for its exit.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                kill_and_reap(&mut child);
                bail!("{program} timed out after {:?}", timeout);
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(error) => {
                kill_and_reap(&mut child);
                return Err(error).with_context(|| format!("failed to wait for {program}"));
            }
        }
    };

    Ok(Output {
        status,
        stdout: join_pipe_reader(stdout_reader),
        stderr: join_pipe_reader(stderr_reader),
    })
}

fn kill_and_reap(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(error = %error, "kill failed; child may have exited");
    }
    let _ = child.wait();
}

fn spawn_pipe_reader<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn join_pipe_reader(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod fake {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::fs;
    use std::path::{Path, PathBuf};

    use anyhow::{Result, bail};

    use super::PdfTools;
    use crate::model::PageRange;

    /// In-memory document: page text by position, materialize writes the
    /// selected page texts joined by form feeds.
    #[derive(Debug, Default)]
    pub struct FakePdfTools {
        pub pages: Vec<String>,
        pub failing_pages: HashSet<usize>,
        pub fail_materialize_for: HashSet<PathBuf>,
        pub materialized: RefCell<Vec<(PathBuf, Vec<PageRange>)>>,
    }

    impl FakePdfTools {
        pub fn with_pages<S: AsRef<str>>(pages: &[S]) -> Self {
            Self {
                pages: pages.iter().map(|page| page.as_ref().to_string()).collect(),
                ..Self::default()
            }
        }
    }

    impl PdfTools for FakePdfTools {
        fn page_count(&self, _pdf_path: &Path) -> Result<usize> {
            Ok(self.pages.len())
        }

        fn page_text(&self, _pdf_path: &Path, page: usize) -> Result<String> {
            if self.failing_pages.contains(&page) {
                bail!("simulated extraction failure on page {page}");
            }
            match self.pages.get(page.wrapping_sub(1)) {
                Some(text) => Ok(text.clone()),
                None => bail!("page {page} out of range"),
            }
        }

        fn materialize(
            &self,
            _pdf_path: &Path,
            ranges: &[PageRange],
            output_path: &Path,
        ) -> Result<()> {
            let file_name = output_path.file_name().map(PathBuf::from).unwrap_or_default();
            if self.fail_materialize_for.contains(&file_name) {
                bail!("simulated materialize failure for {}", output_path.display());
            }

            let mut selected = Vec::new();
            for range in ranges {
                for page in range.start_page..=range.end_page {
                    match self.pages.get(page - 1) {
                        Some(text) => selected.push(text.clone()),
                        None => bail!("page {page} out of range"),
                    }
                }
            }
            fs::write(output_path, selected.join("\u{000C}"))?;
            self.materialized
                .borrow_mut()
                .push((output_path.to_path_buf(), ranges.to_vec()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::FakePdfTools;
    use super::*;

    #[test]
    fn parse_page_count_reads_pages_line() {
        let stdout = "Title:          Sample\nProducer:       test\nPages:          42\nEncrypted:      no\n";
        assert_eq!(parse_page_count(stdout).expect("page count"), 42);
    }

    #[test]
    fn parse_page_count_rejects_missing_line() {
        assert!(parse_page_count("Title: x\n").is_err());
        assert!(parse_page_count("Pages: many\n").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_captures_output() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("printf hello; printf oops >&2");

        let output = run_with_timeout(command, Duration::from_secs(10)).expect("run");
        assert!(output.status.success());
        assert_eq!(output.stdout, b"hello");
        assert_eq!(output.stderr, b"oops");
    }

    #[cfg(unix)]
    #[test]
    fn run_with_timeout_kills_slow_commands() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let started = Instant::now();
        let error = run_with_timeout(command, Duration::from_millis(200)).expect_err("timeout");
        assert!(error.to_string().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn kill_and_reap_leaves_no_running_child() {
        let mut child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::null())
            .spawn()
            .expect("spawn sleep");

        kill_and_reap(&mut child);

        let status = child.try_wait().expect("poll child");
        assert!(status.is_some());
        assert!(!status.expect("exit status").success());
    }

    #[test]
    fn replace_with_pages_swaps_in_new_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("issue.pdf");
        fs::write(&pdf_path, "original").expect("write fixture");

        let tools = FakePdfTools::with_pages(&["one", "two", "three"]);
        replace_with_pages(&tools, &pdf_path, &[PageRange::new(1, 1), PageRange::new(3, 3)])
            .expect("replace");

        assert_eq!(
            fs::read_to_string(&pdf_path).expect("read"),
            "one\u{000C}three"
        );
        let leftovers = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn replace_with_pages_leaves_original_on_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let pdf_path = dir.path().join("issue.pdf");
        fs::write(&pdf_path, "original").expect("write fixture");

        let tools = FakePdfTools::with_pages(&["one"]);
        let result = replace_with_pages(&tools, &pdf_path, &[PageRange::new(1, 3)]);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&pdf_path).expect("read"), "original");
        let leftovers = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(leftovers, 1);
    }
}
