use std::{
    ffi::OsString,
    fmt,
    io::Read,
    path::{Path, PathBuf},
    process::Command,
};

use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{FramepipeError, FramepipeResult};

/// Filter graph that builds an optimal palette from the stream and applies it in one pass.
pub const GIF_PALETTE_FILTER: &str = "[0:v]split[a][b];[a]palettegen[p];[b][p]paletteuse";

/// Output container/codec combinations the encoder can be driven with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Palette-optimized animated GIF.
    Gif,
    /// H.264 video in an MP4 container.
    Mp4,
}

impl OutputFormat {
    /// Look up the fixed argument template for this format.
    pub fn profile(self) -> FormatProfile {
        match self {
            Self::Gif => FormatProfile {
                format: self,
                name: "gif",
                default_output: "output.gif",
            },
            Self::Mp4 => FormatProfile {
                format: self,
                name: "mp4",
                default_output: "output.mp4",
            },
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.profile().name)
    }
}

/// Named argument template for one [`OutputFormat`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FormatProfile {
    /// Format this profile encodes.
    pub format: OutputFormat,
    /// Short name, also used as file extension.
    pub name: &'static str,
    /// Output file used when the request does not name one.
    pub default_output: &'static str,
}

impl FormatProfile {
    /// Arguments following the raw-video input description, output path included.
    fn output_args(&self, spec: &OutputSpec, out: &Path) -> Vec<OsString> {
        let fps = spec.fps.to_string();
        let mut args: Vec<OsString> = match self.format {
            OutputFormat::Gif => vec!["-filter_complex".into(), GIF_PALETTE_FILTER.into()],
            OutputFormat::Mp4 => vec![
                "-c:v".into(),
                "libx264".into(),
                "-vb".into(),
                spec.bitrates.video.as_str().into(),
                "-c:a".into(),
                "aac".into(),
                "-ab".into(),
                spec.bitrates.audio.as_str().into(),
                "-pix_fmt".into(),
                "yuv420p".into(),
            ],
        };
        args.extend(["-r".into(), fps.into(), out.as_os_str().to_owned()]);
        args
    }
}

/// Value of the encoder's `-loglevel` flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderLogLevel {
    /// Print nothing.
    Quiet,
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warning,
    /// Standard ffmpeg output.
    Info,
    /// Extra stream details.
    #[default]
    Verbose,
    /// Everything, including debug output.
    Debug,
}

impl EncoderLogLevel {
    /// The literal passed on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quiet => "quiet",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }
}

/// Target bitrates used by the MP4 profile, in ffmpeg notation (`2500k`).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Mp4Bitrates {
    /// Video bitrate (`-vb`).
    pub video: String,
    /// Audio bitrate (`-ab`). Passed even though no audio stream is supplied.
    pub audio: String,
}

impl Default for Mp4Bitrates {
    fn default() -> Self {
        Self {
            video: "2500k".to_string(),
            audio: "200k".to_string(),
        }
    }
}

fn default_overwrite() -> bool {
    true
}

/// One encoding request: resolution, frame rate, format and output options.
///
/// Consumed once by [`crate::EncoderSession::start`]; a running session never looks at it again
/// except to check frame dimensions.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutputSpec {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Input and output frame rate.
    pub fps: Fps,
    /// Selected output profile.
    pub format: OutputFormat,
    /// Output file. `None` selects the profile default (`output.gif` / `output.mp4`).
    #[serde(default)]
    pub out_path: Option<PathBuf>,
    /// Overwrite an existing output file (`-y`) or refuse (`-n`).
    #[serde(default = "default_overwrite")]
    pub overwrite: bool,
    /// Encoder log level.
    #[serde(default)]
    pub log_level: EncoderLogLevel,
    /// MP4 bitrates; ignored by the GIF profile.
    #[serde(default)]
    pub bitrates: Mp4Bitrates,
}

impl OutputSpec {
    /// Request with default output options.
    pub fn new(width: u32, height: u32, fps: Fps, format: OutputFormat) -> Self {
        Self {
            width,
            height,
            fps,
            format,
            out_path: None,
            overwrite: true,
            log_level: EncoderLogLevel::default(),
            bitrates: Mp4Bitrates::default(),
        }
    }

    /// Parse a request from JSON.
    pub fn from_json_reader(reader: impl Read) -> FramepipeResult<Self> {
        serde_json::from_reader(reader)
            .map_err(|e| FramepipeError::config(format!("invalid output spec JSON: {e}")))
    }

    /// Set the output file.
    pub fn with_out_path(mut self, out_path: impl Into<PathBuf>) -> Self {
        self.out_path = Some(out_path.into());
        self
    }

    /// Set the overwrite policy.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the encoder log level.
    pub fn with_log_level(mut self, log_level: EncoderLogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    /// Frame dimensions.
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// The file the encoder will write.
    pub fn output_path(&self) -> PathBuf {
        self.out_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.format.profile().default_output))
    }

    /// Reject requests the encoder cannot honor.
    pub fn validate(&self) -> FramepipeResult<()> {
        let res = Resolution::new(self.width, self.height)?;
        res.frame_len()?;
        self.fps.check()?;

        match self.format {
            OutputFormat::Gif => {}
            OutputFormat::Mp4 => {
                if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
                    return Err(FramepipeError::validation(
                        "mp4 width/height must be even (required for yuv420p output)",
                    ));
                }
                if self.bitrates.video.trim().is_empty() || self.bitrates.audio.trim().is_empty()
                {
                    return Err(FramepipeError::validation("mp4 bitrates must not be empty"));
                }
            }
        }

        let out = self.output_path();
        if out.as_os_str().is_empty() {
            return Err(FramepipeError::validation("output path must not be empty"));
        }
        // The path is the last positional argument; the encoder would read a leading '-' as an
        // option or as stdout.
        if out.as_os_str().as_encoded_bytes().starts_with(b"-") {
            return Err(FramepipeError::validation(format!(
                "output path '{}' must not start with '-' (use './{}')",
                out.display(),
                out.display()
            )));
        }
        Ok(())
    }

    /// Build the full encoder invocation for `program`.
    pub fn invocation(&self, program: impl Into<OsString>) -> FramepipeResult<EncoderInvocation> {
        self.validate()?;

        let mut args: Vec<OsString> = vec![
            "-loglevel".into(),
            self.log_level.as_str().into(),
            (if self.overwrite { "-y" } else { "-n" }).into(),
            "-f".into(),
            "rawvideo".into(),
            "-pix_fmt".into(),
            "rgba".into(),
            "-s".into(),
            self.resolution().to_string().into(),
            "-r".into(),
            self.fps.to_string().into(),
            "-i".into(),
            "-".into(),
        ];
        args.extend(
            self.format
                .profile()
                .output_args(self, &self.output_path()),
        );

        Ok(EncoderInvocation {
            program: program.into(),
            args,
        })
    }
}

/// Program plus ordered argument vector for launching the encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderInvocation {
    /// Binary name, resolved through `PATH`.
    pub program: OsString,
    /// Arguments, excluding the program name.
    pub args: Vec<OsString>,
}

impl EncoderInvocation {
    /// A [`Command`] with program and arguments applied; stdio is left to the caller.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }

    /// Arguments as UTF-8 strings, replacing invalid sequences.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for EncoderInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/format.rs"]
mod tests;
