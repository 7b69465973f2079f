//! # OutputBuf - Reusable Output Buffer
//!
//! A growable owned byte buffer used for assembling escaped output strings
//! and for holding raw row data handed back by a connection. The cursor owns
//! one `OutputBuf` and resets it at the start of every rendered step; the
//! escape and pair-assembly routines append into it rather than building
//! intermediate strings per token.

/// Growable owned byte sequence with explicit reuse.
#[derive(Debug, Default)]
pub struct OutputBuf {
    data: Vec<u8>,
}

impl OutputBuf {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Clears the contents while keeping the allocation.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn append_byte(&mut self, byte: u8) {
        self.data.push(byte);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Takes the accumulated bytes as a `String`, leaving the buffer empty.
    pub fn take_string(&mut self) -> String {
        let bytes = std::mem::take(&mut self.data);
        // INVARIANT: rendering only ever appends ASCII (escaped) output.
        String::from_utf8(bytes).expect("output buffer holds non-UTF-8 bytes")
    }
}
