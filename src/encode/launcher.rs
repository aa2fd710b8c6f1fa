use std::{
    ffi::{OsStr, OsString},
    process::{Child, Command, Stdio},
};

use crate::encode::format::EncoderInvocation;

/// Starts the encoder process for a session.
///
/// Implementations must return a child whose stdin is piped; the session takes ownership of the
/// write end and the child keeps the read end. Tests substitute their own launcher to run a
/// stand-in consumer instead of `ffmpeg`.
pub trait EncoderLauncher {
    /// Program name used when building the invocation.
    fn program(&self) -> &OsStr;

    /// Spawn `invocation` with stdin connected to a fresh pipe.
    fn launch(&self, invocation: &EncoderInvocation) -> std::io::Result<Child>;
}

/// Where the encoder's diagnostic output goes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StderrMode {
    /// Share the caller's stderr.
    #[default]
    Inherit,
    /// Discard it.
    Null,
}

/// Launches the invocation as-is through the OS process API, resolving the program via `PATH`.
#[derive(Clone, Debug)]
pub struct CommandLauncher {
    program: OsString,
    stderr: StderrMode,
}

impl CommandLauncher {
    /// Launcher for an arbitrary encoder binary.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            stderr: StderrMode::default(),
        }
    }

    /// Launcher for the system `ffmpeg`.
    pub fn ffmpeg() -> Self {
        Self::new("ffmpeg")
    }

    /// Choose where encoder diagnostics go.
    pub fn with_stderr(mut self, stderr: StderrMode) -> Self {
        self.stderr = stderr;
        self
    }
}

impl Default for CommandLauncher {
    fn default() -> Self {
        Self::ffmpeg()
    }
}

impl EncoderLauncher for CommandLauncher {
    fn program(&self) -> &OsStr {
        &self.program
    }

    fn launch(&self, invocation: &EncoderInvocation) -> std::io::Result<Child> {
        let mut cmd = invocation.to_command();
        cmd.stdin(Stdio::piped()).stdout(Stdio::null());
        match self.stderr {
            StderrMode::Inherit => cmd.stderr(Stdio::inherit()),
            StderrMode::Null => cmd.stderr(Stdio::null()),
        };
        cmd.spawn()
    }
}

/// Return `true` when `program -version` can be run from `PATH`.
pub fn is_encoder_on_path(program: impl AsRef<OsStr>) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_encoder_on_path("ffmpeg")
}
