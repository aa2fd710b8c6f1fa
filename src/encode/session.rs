use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, ExitStatus},
};

use crate::encode::format::OutputSpec;
use crate::encode::launcher::{CommandLauncher, EncoderLauncher};
use crate::foundation::core::Resolution;
use crate::foundation::error::{FramepipeError, FramepipeResult};

/// One running encoding pipeline: the encoder process and the write end of its input pipe.
///
/// A session is created by [`EncoderSession::start`] and closed by [`EncoderSession::end`], which
/// consumes it. Frames go in through [`EncoderSession::send_frame`] and
/// [`EncoderSession::send_frame_flipped`].
///
/// Dropping a session without calling `end` closes the pipe and waits for the encoder so no
/// zombie is left behind; errors from that path are only logged.
///
/// Not meant to be shared between threads: every streaming call takes `&mut self`.
#[derive(Debug)]
pub struct EncoderSession {
    pub(super) resolution: Resolution,
    pub(super) frame_len: usize,
    pub(super) row_len: usize,
    output: PathBuf,
    child: Option<Child>,
    pub(super) stdin: Option<ChildStdin>,
    pub(super) frames_sent: u64,
    pub(super) bytes_sent: u64,
    pub(super) desynced: bool,
}

/// Summary returned by a successful [`EncoderSession::end`].
#[derive(Clone, Debug)]
pub struct EncoderReport {
    /// Frames fully written to the pipe.
    pub frames: u64,
    /// Bytes fully written to the pipe.
    pub bytes: u64,
    /// Encoder exit status.
    pub status: ExitStatus,
    /// File the encoder was asked to write.
    pub output: PathBuf,
}

impl EncoderSession {
    /// Launch the system `ffmpeg` for `spec`.
    pub fn start(spec: OutputSpec) -> FramepipeResult<Self> {
        Self::start_with(spec, &CommandLauncher::ffmpeg())
    }

    /// Launch the encoder for `spec` through `launcher`.
    ///
    /// Nothing is left running or open when this returns an error.
    #[tracing::instrument(
        skip(spec, launcher),
        fields(format = %spec.format, resolution = %spec.resolution(), fps = %spec.fps)
    )]
    pub fn start_with<L>(spec: OutputSpec, launcher: &L) -> FramepipeResult<Self>
    where
        L: EncoderLauncher + ?Sized,
    {
        let invocation = spec.invocation(launcher.program())?;
        let resolution = spec.resolution();
        let frame_len = resolution.frame_len()?;
        let row_len = resolution.row_len()?;

        let output = spec.output_path();
        if !spec.overwrite && output.exists() {
            return Err(FramepipeError::validation(format!(
                "output file '{}' already exists",
                output.display()
            )));
        }
        let created = create_parent_dirs(&output)?;

        tracing::debug!(%invocation, "launching encoder");
        let mut child = launcher.launch(&invocation).map_err(|e| {
            remove_created_dirs(&created);
            let program = invocation.program.to_string_lossy();
            if e.kind() == ErrorKind::NotFound {
                FramepipeError::setup(format!("encoder '{program}' was not found on PATH"))
            } else {
                FramepipeError::setup(format!("failed to launch encoder '{program}': {e}"))
            }
        })?;

        let Some(stdin) = child.stdin.take() else {
            // Launcher broke its contract; don't leave the process behind.
            let _ = child.kill();
            let _ = child.wait();
            remove_created_dirs(&created);
            return Err(FramepipeError::setup(
                "encoder was launched without a stdin pipe",
            ));
        };

        tracing::info!(pid = child.id(), output = %output.display(), "encoder started");
        Ok(Self {
            resolution,
            frame_len,
            row_len,
            output,
            child: Some(child),
            stdin: Some(stdin),
            frames_sent: 0,
            bytes_sent: 0,
            desynced: false,
        })
    }

    /// Close the pipe and block until the encoder exits.
    ///
    /// On return the output file is as complete as the encoder made it. A failed wait or a
    /// non-zero exit status is reported as [`FramepipeError::Shutdown`].
    #[tracing::instrument(skip(self), fields(frames = self.frames_sent, bytes = self.bytes_sent))]
    pub fn end(mut self) -> FramepipeResult<EncoderReport> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| FramepipeError::shutdown("encoder was already reaped", None))?;

        let status = child.wait().map_err(|e| {
            FramepipeError::shutdown(format!("failed to wait for encoder to finish: {e}"), None)
        })?;

        if !status.success() {
            tracing::warn!(%status, "encoder exited unsuccessfully");
            return Err(FramepipeError::shutdown(
                format!(
                    "encoder exited with {status} after {} frames; '{}' may be incomplete",
                    self.frames_sent,
                    self.output.display()
                ),
                status.code(),
            ));
        }

        tracing::info!(%status, "encoder finished");
        Ok(EncoderReport {
            frames: self.frames_sent,
            bytes: self.bytes_sent,
            status,
            output: self.output.clone(),
        })
    }

    /// Poll whether the encoder process is still alive without blocking.
    ///
    /// A dead encoder is otherwise only noticed when the next frame write fails.
    pub fn is_running(&mut self) -> FramepipeResult<bool> {
        let Some(child) = self.child.as_mut() else {
            return Ok(false);
        };
        child
            .try_wait()
            .map(|status| status.is_none())
            .map_err(|e| FramepipeError::Other(anyhow::Error::new(e).context("poll encoder")))
    }

    /// OS process id of the encoder.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Resolution every frame must match.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Frames fully written so far.
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Bytes fully written so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// File the encoder writes.
    pub fn output_path(&self) -> &Path {
        &self.output
    }
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            tracing::warn!(
                pid = child.id(),
                "encoder session dropped without end(); closing pipe and reaping encoder"
            );
            if let Err(e) = child.wait() {
                tracing::error!(error = %e, "failed to reap encoder");
            }
        }
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FramepipeResult<()> {
    create_parent_dirs(path).map(|_| ())
}

/// Create the missing parent directories of `path`, returning them deepest first.
fn create_parent_dirs(path: &Path) -> FramepipeResult<Vec<PathBuf>> {
    use anyhow::Context as _;

    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(Vec::new());
    };
    let missing: Vec<PathBuf> = parent
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect();
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    Ok(missing)
}

/// Undo [`create_parent_dirs`] after a failed start. Directories that gained entries are kept.
fn remove_created_dirs(created: &[PathBuf]) {
    for dir in created {
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        tracing::debug!(dir = %dir.display(), "removed output directory after failed start");
    }
}
