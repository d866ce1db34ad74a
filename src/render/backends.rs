//! Concrete renderers. Each job runs one external process with a deadline.

use crossbeam_channel::bounded;
use log::{debug, trace, warn};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;

use super::error::RenderError;
use super::resource::RenderBackend;
use crate::utils::config::{PROCESS_POLL_INTERVAL, PackagePaths, RenderTimeouts};
use crate::{OutputFormat, RenderJob};

/// Run `cmd` to completion or until `timeout`, then check the artifact exists.
///
/// The renderer leads its own process group so helpers it leaves behind die with it. stderr is
/// drained on a side thread and collected no later than the deadline.
pub fn run_process(
    backend: &'static str,
    mut cmd: Command,
    job: &RenderJob,
    timeout: Duration,
) -> Result<(), RenderError> {
    let spawn_err = |source| RenderError::Spawn {
        backend,
        source_path: job.source_document_path.clone(),
        source,
    };
    trace!("{}: {:?}", backend, cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let mut child = cmd.spawn().map_err(spawn_err)?;

    let stderr_rx = {
        let (tx, rx) = bounded::<String>(1);
        if let Some(mut pipe) = child.stderr.take() {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
        }
        rx
    };

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                kill_process_group(&mut child);
                let _ = child.wait();
                return Err(RenderError::Timeout {
                    source_path: job.source_document_path.clone(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(PROCESS_POLL_INTERVAL),
            Err(e) => {
                kill_process_group(&mut child);
                let _ = child.wait();
                return Err(spawn_err(e));
            }
        }
    };
    // Leftover helpers would keep the stderr pipe open.
    kill_process_group(&mut child);
    let stderr = stderr_rx
        .recv_timeout(deadline.saturating_duration_since(Instant::now()))
        .unwrap_or_default();

    if !status.success() {
        return Err(RenderError::Exit {
            backend,
            source_path: job.source_document_path.clone(),
            status: status.to_string(),
            stderr,
        });
    }
    if !stderr.trim().is_empty() {
        debug!("{} stderr: {}", backend, stderr.trim());
    }
    let produced = std::fs::metadata(&job.target_artifact_path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !produced {
        return Err(RenderError::MissingOutput {
            source_path: job.source_document_path.clone(),
            target_path: job.target_artifact_path.clone(),
        });
    }
    Ok(())
}

/// SIGKILL the group led by `child`, then the child itself.
fn kill_process_group(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // The child was spawned with `process_group(0)`, so its pid is the group id.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    let _ = child.kill();
}

/// Resolve a renderer binary: the configured path (file or PATH name) or the first candidate on PATH.
fn locate_binary(
    backend: &'static str,
    configured: Option<&Path>,
    candidates: &[&str],
) -> Result<PathBuf, RenderError> {
    if let Some(path) = configured {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return which::which(path).map_err(|e| RenderError::Launch {
            backend,
            message: format!("{}: {}", path.display(), e),
        });
    }
    candidates
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| RenderError::Launch {
            backend,
            message: format!("none of {} found on PATH", candidates.join(", ")),
        })
}

/// `file://` URL for a local path, made absolute against the working directory.
pub fn file_url(path: &Path) -> Result<String, RenderError> {
    let invalid = || RenderError::InvalidSource {
        source_path: path.to_path_buf(),
    };
    let absolute = std::path::absolute(path).map_err(|_| invalid())?;
    Url::from_file_path(&absolute)
        .map(|url| url.as_str().to_owned())
        .map_err(|()| invalid())
}

fn prefixed_arg(prefix: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(prefix);
    arg.push(path.as_os_str());
    arg
}

// ---- Headless browser ----

const CHROME_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "microsoft-edge",
];

/// Headless Chrome/Chromium printing to PDF. Only produces [`OutputFormat::Pdf`].
pub struct ChromeBackend {
    binary: Option<PathBuf>,
    outline: bool,
}

/// Located browser plus a profile root; each job gets its own sub-profile.
pub struct ChromeResource {
    binary: PathBuf,
    profile: Mutex<Option<TempDir>>,
    profile_root: PathBuf,
    sessions: AtomicUsize,
}

impl ChromeBackend {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary,
            outline: true,
        }
    }

    /// Toggle the PDF document outline built from the page headings.
    pub fn with_outline(mut self, outline: bool) -> Self {
        self.outline = outline;
        self
    }

    /// Print-to-PDF invocation for one job, using `profile` as its user data dir.
    fn command(
        &self,
        binary: &Path,
        profile: &Path,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<Command, RenderError> {
        let mut cmd = Command::new(binary);
        cmd.arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--blink-settings=scriptEnabled=false")
            .arg("--no-pdf-header-footer")
            .arg(format!("--timeout={}", timeouts.page_load.as_millis()));
        if self.outline {
            cmd.arg("--generate-pdf-document-outline");
        }
        cmd.arg(prefixed_arg("--user-data-dir=", profile))
            .arg(prefixed_arg("--print-to-pdf=", &job.target_artifact_path))
            .arg(file_url(&job.source_document_path)?);
        Ok(cmd)
    }
}

impl RenderBackend for ChromeBackend {
    type Resource = ChromeResource;

    fn name(&self) -> &'static str {
        "chrome"
    }

    fn launch(&self) -> Result<ChromeResource, RenderError> {
        let binary = locate_binary(self.name(), self.binary.as_deref(), CHROME_CANDIDATES)?;
        let profile = tempfile::Builder::new()
            .prefix(PackagePaths::get().profile_dir_prefix())
            .tempdir()
            .map_err(|e| RenderError::Launch {
                backend: self.name(),
                message: format!("browser profile: {e}"),
            })?;
        debug!(
            "chrome: {} with profile {}",
            binary.display(),
            profile.path().display()
        );
        Ok(ChromeResource {
            binary,
            profile_root: profile.path().to_path_buf(),
            profile: Mutex::new(Some(profile)),
            sessions: AtomicUsize::new(0),
        })
    }

    fn render(
        &self,
        resource: &ChromeResource,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<(), RenderError> {
        // A browser profile is locked by the process using it.
        let session = resource.sessions.fetch_add(1, Ordering::SeqCst);
        let profile = resource.profile_root.join(format!("session-{session}"));

        let cmd = self.command(&resource.binary, &profile, job, timeouts)?;
        run_process(self.name(), cmd, job, timeouts.artifact)
    }

    fn teardown(&self, resource: &ChromeResource) -> Result<(), RenderError> {
        let taken = resource
            .profile
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        match taken {
            Some(dir) => dir.close().map_err(|source| RenderError::Teardown {
                backend: self.name(),
                source,
            }),
            None => Ok(()),
        }
    }
}

// ---- Calibre ----

const CALIBRE_CANDIDATES: &[&str] = &["ebook-convert"];

/// Calibre's `ebook-convert`: PDF, EPUB and MOBI.
pub struct CalibreBackend {
    binary: Option<PathBuf>,
    format: OutputFormat,
}

impl CalibreBackend {
    pub fn new(binary: Option<PathBuf>, format: OutputFormat) -> Self {
        Self { binary, format }
    }

    /// Conversion flags for the target format.
    pub fn format_args(format: OutputFormat) -> Option<&'static [&'static str]> {
        match format {
            OutputFormat::Pdf => Some(&[
                "--pdf-add-toc",
                "--paper-size",
                "a4",
                "--pdf-default-font-size",
                "12",
                "--pdf-mono-font-size",
                "12",
                "--pdf-page-margin-left",
                "2",
                "--pdf-page-margin-right",
                "2",
                "--pdf-page-margin-top",
                "2",
                "--pdf-page-margin-bottom",
                "2",
                "--page-breaks-before",
                "/",
            ]),
            OutputFormat::Mobi => Some(&["--mobi-toc-at-start", "--output-profile", "kindle_dx"]),
            OutputFormat::Epub => Some(&[
                "--epub-inline-toc",
                "--output-profile",
                "ipad3",
                "--flow-size",
                "1000",
            ]),
            OutputFormat::Html => None,
        }
    }
}

impl RenderBackend for CalibreBackend {
    type Resource = PathBuf;

    fn name(&self) -> &'static str {
        "calibre"
    }

    fn launch(&self) -> Result<PathBuf, RenderError> {
        if Self::format_args(self.format).is_none() {
            return Err(RenderError::Launch {
                backend: self.name(),
                message: RenderError::Unsupported {
                    backend: self.name(),
                    format: self.format.to_string(),
                }
                .to_string(),
            });
        }
        locate_binary(self.name(), self.binary.as_deref(), CALIBRE_CANDIDATES)
    }

    fn render(
        &self,
        binary: &PathBuf,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<(), RenderError> {
        let args = Self::format_args(self.format).ok_or_else(|| RenderError::Unsupported {
            backend: self.name(),
            format: self.format.to_string(),
        })?;
        let mut cmd = Command::new(binary);
        cmd.arg(&job.source_document_path)
            .arg(&job.target_artifact_path)
            .args(args);
        run_process(self.name(), cmd, job, timeouts.artifact)
    }

    fn teardown(&self, _binary: &PathBuf) -> Result<(), RenderError> {
        Ok(())
    }
}

// ---- wkhtmltopdf ----

const WKHTMLTOPDF_CANDIDATES: &[&str] = &["wkhtmltopdf"];

/// `wkhtmltopdf`, PDF only.
pub struct WkhtmltopdfBackend {
    binary: Option<PathBuf>,
}

impl WkhtmltopdfBackend {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }
}

impl RenderBackend for WkhtmltopdfBackend {
    type Resource = PathBuf;

    fn name(&self) -> &'static str {
        "wkhtmltopdf"
    }

    fn launch(&self) -> Result<PathBuf, RenderError> {
        locate_binary(self.name(), self.binary.as_deref(), WKHTMLTOPDF_CANDIDATES)
    }

    fn render(
        &self,
        binary: &PathBuf,
        job: &RenderJob,
        timeouts: &RenderTimeouts,
    ) -> Result<(), RenderError> {
        let mut cmd = Command::new(binary);
        cmd.arg("--quiet")
            .arg("--disable-javascript")
            .arg("--default-header")
            .args(["--margin-top", "0", "--margin-bottom", "0"])
            .arg("--load-error-handling")
            .arg("ignore");
        if let Some(dir) = job.source_document_path.parent() {
            cmd.arg("--allow").arg(dir);
        }
        cmd.arg(&job.source_document_path)
            .arg(&job.target_artifact_path);
        run_process(self.name(), cmd, job, timeouts.artifact)
    }

    fn teardown(&self, _binary: &PathBuf) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Warn early when a configured binary path does not exist; launch still decides.
pub fn check_configured_binary(path: Option<&Path>) {
    if let Some(p) = path
        && !p.exists()
        && which::which(p).is_err()
    {
        warn!("renderer binary {} not found", p.display());
    }
}
