use crate::encode::format::OutputSpec;
use crate::encode::launcher::{CommandLauncher, EncoderLauncher};
use crate::encode::session::{EncoderReport, EncoderSession};
use crate::encode::transport::{FrameBuffer, RowOrder, write_frame};
use crate::foundation::core::Resolution;
use crate::foundation::error::{FramepipeError, FramepipeResult};

/// Consumer of captured frames, driven by a render loop.
///
/// Ordering contract: `push_frame` is called between one `begin` and one `end`, in capture
/// order.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, spec: OutputSpec) -> FramepipeResult<()>;
    /// Push one frame, stored in `order` in memory.
    fn push_frame(&mut self, frame: &FrameBuffer<'_>, order: RowOrder) -> FramepipeResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> FramepipeResult<()>;
}

/// Sink that streams into an [`EncoderSession`].
#[derive(Debug)]
pub struct EncoderSink<L = CommandLauncher> {
    launcher: L,
    session: Option<EncoderSession>,
    report: Option<EncoderReport>,
}

impl EncoderSink<CommandLauncher> {
    /// Sink that launches the system `ffmpeg`.
    pub fn ffmpeg() -> Self {
        Self::new(CommandLauncher::ffmpeg())
    }
}

impl<L: EncoderLauncher> EncoderSink<L> {
    /// Sink that launches encoders through `launcher`.
    pub fn new(launcher: L) -> Self {
        Self {
            launcher,
            session: None,
            report: None,
        }
    }

    /// Report of the last finished session.
    pub fn report(&self) -> Option<&EncoderReport> {
        self.report.as_ref()
    }
}

impl<L: EncoderLauncher + Send> FrameSink for EncoderSink<L> {
    fn begin(&mut self, spec: OutputSpec) -> FramepipeResult<()> {
        if self.session.is_some() {
            return Err(FramepipeError::validation("encoder sink already started"));
        }
        self.report = None;
        self.session = Some(EncoderSession::start_with(spec, &self.launcher)?);
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer<'_>, order: RowOrder) -> FramepipeResult<()> {
        self.session
            .as_mut()
            .ok_or_else(|| FramepipeError::validation("encoder sink not started"))?
            .send(frame, order)
    }

    fn end(&mut self) -> FramepipeResult<()> {
        let session = self
            .session
            .take()
            .ok_or_else(|| FramepipeError::validation("encoder sink not started"))?;
        self.report = Some(session.end()?);
        Ok(())
    }
}

/// In-memory sink for tests and debugging.
///
/// Stores each frame exactly as it would have been written to the encoder pipe.
#[derive(Debug, Default)]
pub struct InMemorySink {
    spec: Option<OutputSpec>,
    resolution: Option<Resolution>,
    frames: Vec<Vec<u8>>,
    finished: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request captured in `begin`, if any.
    pub fn spec(&self) -> Option<&OutputSpec> {
        self.spec.as_ref()
    }

    /// Serialized frames in push order.
    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }

    /// Concatenation of all serialized frames, i.e. the full pipe byte stream.
    pub fn stream(&self) -> Vec<u8> {
        self.frames.concat()
    }

    /// Whether `end` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, spec: OutputSpec) -> FramepipeResult<()> {
        spec.validate()?;
        self.resolution = Some(spec.resolution());
        self.spec = Some(spec);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &FrameBuffer<'_>, order: RowOrder) -> FramepipeResult<()> {
        let expected = self
            .resolution
            .ok_or_else(|| FramepipeError::validation("in-memory sink not started"))?;
        if frame.resolution() != expected {
            return Err(FramepipeError::validation(format!(
                "frame size mismatch: got {}, expected {expected}",
                frame.resolution()
            )));
        }
        let mut bytes = Vec::with_capacity(frame.data().len());
        write_frame(&mut bytes, frame, order)
            .map_err(|e| FramepipeError::transport("in-memory write", e))?;
        self.frames.push(bytes);
        Ok(())
    }

    fn end(&mut self) -> FramepipeResult<()> {
        self.finished = true;
        Ok(())
    }
}
