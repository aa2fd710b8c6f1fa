//! framepipe streams raw RGBA frames into an external `ffmpeg` process to produce GIF or MP4
//! files.
//!
//! - Describe the output with an [`OutputSpec`]
//! - Start an [`EncoderSession`]
//! - Push frames with [`EncoderSession::send_frame`] or [`EncoderSession::send_frame_flipped`]
//! - Finish with [`EncoderSession::end`], which returns once the output file is complete
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Encoder pipeline.
pub mod encode;
pub mod pattern;

pub use crate::foundation::core::{BYTES_PER_PIXEL, Fps, Resolution};
pub use crate::foundation::error::{FramepipeError, FramepipeResult};

pub use crate::encode::format::{
    EncoderInvocation, EncoderLogLevel, FormatProfile, GIF_PALETTE_FILTER, Mp4Bitrates,
    OutputFormat, OutputSpec,
};
pub use crate::encode::launcher::{
    CommandLauncher, EncoderLauncher, StderrMode, is_encoder_on_path, is_ffmpeg_on_path,
};
pub use crate::encode::session::{EncoderReport, EncoderSession, ensure_parent_dir};
pub use crate::encode::sink::{EncoderSink, FrameSink, InMemorySink};
pub use crate::encode::transport::{FrameBuffer, RowOrder, write_frame};
pub use crate::pattern::{Pattern, render_pattern, stream_pattern};
