//! Encoder pipeline.
//!
//! [`format`] turns a request into an encoder invocation, [`launcher`] and [`session`] own the
//! encoder process and its input pipe, [`transport`] writes frames into that pipe and [`sink`]
//! wraps the whole thing for render loops.

/// Output profiles and encoder argument construction.
pub mod format;
/// Process launching seam.
pub mod launcher;
/// Encoder process lifecycle.
pub mod session;
/// Frame sinks for render loops.
pub mod sink;
/// Frame serialization into the encoder pipe.
pub mod transport;
