//! Per-connection scratch buffers.
//!
//! Deliberately not pooled across connections: the engine never shares a
//! buffer between two `Connection`s.

/// A reusable write-side scratch buffer.
///
/// Requests that fit within `CAPACITY` bytes are assembled in place;
/// larger requests fall back to a freshly allocated `Vec`.
pub struct WriteBuffer {
    scratch: Vec<u8>,
}

const CAPACITY: usize = 8192;

impl WriteBuffer {
    pub fn new() -> Self {
        Self { scratch: Vec::with_capacity(CAPACITY) }
    }

    /// Borrow the scratch buffer, cleared and ready to be written into.
    ///
    /// Callers that produce more than `CAPACITY` bytes may let the `Vec`
    /// grow past its initial allocation; the buffer is not shrunk back,
    /// matching the "reusable buffer with fallback" design for oversized
    /// messages.
    pub fn borrow(&mut self) -> &mut Vec<u8> {
        self.scratch.clear();
        &mut self.scratch
    }
}

impl Default for WriteBuffer {
    fn default() -> Self {
        Self::new()
    }
}
