use std::{fmt, str::FromStr};

use crate::foundation::error::{FramepipeError, FramepipeResult};

/// Bytes per pixel of every frame handed to the encoder (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> FramepipeResult<Self> {
        if den == 0 {
            return Err(FramepipeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(FramepipeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate, e.g. `Fps::integer(25)`.
    pub fn integer(num: u32) -> FramepipeResult<Self> {
        Self::new(num, 1)
    }

    pub(crate) fn check(self) -> FramepipeResult<()> {
        Self::new(self.num, self.den).map(|_| ())
    }
}

/// Formats as the encoder expects it: `25` for whole rates, `30000/1001` otherwise.
impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for Fps {
    type Err = FramepipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |part: &str| {
            part.trim()
                .parse::<u32>()
                .map_err(|e| FramepipeError::validation(format!("invalid fps '{s}': {e}")))
        };
        match s.split_once('/') {
            Some((num, den)) => Self::new(parse(num)?, parse(den)?),
            None => Self::new(parse(s)?, 1),
        }
    }
}

/// Frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a resolution; both sides must be non-zero.
    pub fn new(width: u32, height: u32) -> FramepipeResult<Self> {
        if width == 0 || height == 0 {
            return Err(FramepipeError::validation(
                "resolution width/height must be non-zero",
            ));
        }
        Ok(Self { width, height })
    }

    /// Bytes in one scanline.
    pub fn row_len(self) -> FramepipeResult<usize> {
        usize::try_from(self.width)
            .ok()
            .and_then(|w| w.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| FramepipeError::validation(format!("row size overflow for {self}")))
    }

    /// Bytes in one full frame (`width * height * 4`).
    pub fn frame_len(self) -> FramepipeResult<usize> {
        let row = self.row_len()?;
        usize::try_from(self.height)
            .ok()
            .and_then(|h| h.checked_mul(row))
            .ok_or_else(|| FramepipeError::validation(format!("frame size overflow for {self}")))
    }
}

/// Formats as `<width>x<height>`.
impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
