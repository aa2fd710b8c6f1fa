//! Synthetic animated frames.
//!
//! Stands in for a real renderer in the CLI and tests: every frame is a pure function of its
//! index, so a test can regenerate what the encoder should have received.

use crate::encode::format::OutputSpec;
use crate::encode::sink::FrameSink;
use crate::encode::transport::{FrameBuffer, RowOrder};
use crate::foundation::core::{BYTES_PER_PIXEL, Resolution};
use crate::foundation::error::FramepipeResult;

/// Opaque colors cycled by [`Pattern::ColorCycle`].
pub const PALETTE: [[u8; 4]; 6] = [
    [230, 57, 70, 255],
    [42, 157, 143, 255],
    [38, 70, 83, 255],
    [233, 196, 106, 255],
    [244, 162, 97, 255],
    [168, 218, 220, 255],
];

/// Which animation to draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pattern {
    /// Whole frame filled with one [`PALETTE`] color per frame.
    #[default]
    ColorCycle,
    /// Vertical gradient with a white bar sliding downwards; shows if rows arrive flipped.
    Bars,
}

impl Pattern {
    /// Color at `(x, y)` of frame `index`, `y` counted from the top of the image.
    pub fn pixel(self, x: u32, y: u32, index: u64, res: Resolution) -> [u8; 4] {
        match self {
            Self::ColorCycle => PALETTE[(index % PALETTE.len() as u64) as usize],
            Self::Bars => {
                let bar = (res.height / 8).max(1);
                let height = u64::from(res.height);
                let top = ((index % height) * u64::from(bar) % height) as u32;
                if y >= top && y < top + bar {
                    return [255, 255, 255, 255];
                }
                let shade = |v: u32, max: u32| (u64::from(v) * 255 / u64::from(max.max(1))) as u8;
                [shade(y, res.height - 1), 64, shade(x, res.width - 1), 255]
            }
        }
    }
}

/// Draw frame `index` into `buf`, storing rows in `layout` order.
///
/// With [`RowOrder::BottomUp`] the last image row is the first row in memory, which is the layout
/// GPU readbacks usually produce.
pub fn render_pattern(
    pattern: Pattern,
    res: Resolution,
    index: u64,
    layout: RowOrder,
    buf: &mut Vec<u8>,
) -> FramepipeResult<()> {
    let frame_len = res.frame_len()?;
    let row_len = res.row_len()?;
    buf.clear();
    buf.resize(frame_len, 0);

    for (mem_row, row) in buf.chunks_exact_mut(row_len).enumerate() {
        let mem_row = mem_row as u32;
        let y = match layout {
            RowOrder::TopDown => mem_row,
            RowOrder::BottomUp => res.height - 1 - mem_row,
        };
        for (x, px) in row.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
            px.copy_from_slice(&pattern.pixel(x as u32, y, index, res));
        }
    }
    Ok(())
}

/// Render `frames` frames of `pattern` into `sink` and finish it.
///
/// `end` is called even when a frame fails so the encoder is always reaped; the first error wins.
#[tracing::instrument(skip(sink, spec), fields(format = %spec.format))]
pub fn stream_pattern<S>(
    sink: &mut S,
    spec: OutputSpec,
    pattern: Pattern,
    frames: u64,
    layout: RowOrder,
) -> FramepipeResult<u64>
where
    S: FrameSink + ?Sized,
{
    let res = spec.resolution();
    sink.begin(spec)?;

    let mut buf = Vec::new();
    let pushed = (0..frames).try_for_each(|i| {
        render_pattern(pattern, res, i, layout, &mut buf)?;
        let frame = FrameBuffer::new(res.width, res.height, &buf)?;
        sink.push_frame(&frame, layout)
    });
    let ended = sink.end();

    pushed?;
    ended?;
    tracing::debug!(frames, "pattern streamed");
    Ok(frames)
}
