use std::io::{self, Write};

use crate::encode::session::EncoderSession;
use crate::foundation::core::{BYTES_PER_PIXEL, Resolution};
use crate::foundation::error::{FramepipeError, FramepipeResult};

/// Scanline order used when streaming a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RowOrder {
    /// Rows are sent as stored: first row of memory first, in one write.
    #[default]
    TopDown,
    /// Rows are sent last-to-first, one scanline per write. Undoes a bottom-up memory layout.
    BottomUp,
}

/// Borrowed RGBA8 pixels, tightly packed, row-major.
#[derive(Clone, Copy, Debug)]
pub struct FrameBuffer<'a> {
    width: u32,
    height: u32,
    data: &'a [u8],
}

impl<'a> FrameBuffer<'a> {
    /// Wrap `data`; its length must be exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> FramepipeResult<Self> {
        let expected = Resolution::new(width, height)?.frame_len()?;
        if data.len() != expected {
            return Err(FramepipeError::validation(format!(
                "frame buffer is {} bytes, expected {expected} for {width}x{height} rgba",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame dimensions.
    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    /// Raw bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Scanlines in memory order.
    pub fn rows(&self) -> std::slice::ChunksExact<'a, u8> {
        self.data.chunks_exact(self.width as usize * BYTES_PER_PIXEL)
    }
}

/// Serialize `frame` into `out` in the requested row order.
///
/// `TopDown` is one `write_all` of the whole buffer; `BottomUp` is one `write_all` per row from
/// the last row to the first.
pub fn write_frame<W>(out: &mut W, frame: &FrameBuffer<'_>, order: RowOrder) -> io::Result<()>
where
    W: Write + ?Sized,
{
    match order {
        RowOrder::TopDown => out.write_all(frame.data),
        RowOrder::BottomUp => frame.rows().rev().try_for_each(|row| out.write_all(row)),
    }
}

impl EncoderSession {
    /// Stream one frame in top-to-bottom row order.
    pub fn send_frame(&mut self, frame: &FrameBuffer<'_>) -> FramepipeResult<()> {
        self.send(frame, RowOrder::TopDown)
    }

    /// Stream one frame with its rows reversed (last row of memory first).
    pub fn send_frame_flipped(&mut self, frame: &FrameBuffer<'_>) -> FramepipeResult<()> {
        self.send(frame, RowOrder::BottomUp)
    }

    /// Stream one frame in `order`, blocking while the encoder's input is full.
    ///
    /// A failed or short write leaves a partial frame in the pipe. The session refuses further
    /// frames after that; call [`EncoderSession::end`] to reap the encoder.
    pub fn send(&mut self, frame: &FrameBuffer<'_>, order: RowOrder) -> FramepipeResult<()> {
        if frame.resolution() != self.resolution {
            return Err(FramepipeError::validation(format!(
                "frame size mismatch: got {}, expected {}",
                frame.resolution(),
                self.resolution
            )));
        }
        debug_assert_eq!(frame.data.len(), self.frame_len);
        debug_assert_eq!(frame.rows().len(), self.frame_len / self.row_len);

        if self.desynced {
            return Err(FramepipeError::transport(
                "encoder input is out of sync after an earlier failed write",
                io::Error::other("session desynchronized"),
            ));
        }
        let Some(pipe) = self.stdin.as_mut() else {
            return Err(FramepipeError::transport(
                "encoder input is closed",
                io::Error::from(io::ErrorKind::BrokenPipe),
            ));
        };

        if let Err(e) = write_frame(pipe, frame, order) {
            self.desynced = true;
            tracing::warn!(frame = self.frames_sent, ?order, error = %e, "frame write failed");
            return Err(FramepipeError::transport(
                format!("failed to write frame {} to encoder", self.frames_sent),
                e,
            ));
        }

        self.frames_sent += 1;
        self.bytes_sent += self.frame_len as u64;
        Ok(())
    }
}
