//! Preallocated frame storage shared between the relay directions.

/// A fixed-capacity frame buffer whose length doubles as an occupancy flag.
///
/// A length greater than zero means the buffer holds a frame that the relay
/// pipeline has not drained yet; zero means the buffer is free. There is no
/// queueing behind a buffer, an undrained frame blocks further delivery in
/// its direction.
pub struct FrameBuffer {
    buffer: Vec<u8>,
    len: usize,
}

impl FrameBuffer {
    /// Creates an empty buffer with the given fixed capacity.
    pub fn new(capacity: usize) -> FrameBuffer {
        FrameBuffer {
            buffer: vec![0; capacity],
            len: 0,
        }
    }

    /// Checks if the buffer holds an undrained frame.
    pub fn is_occupied(&self) -> bool {
        self.len > 0
    }

    /// Returns the length of the staged frame, zero when free.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Marks `len` bytes of the buffer as an undrained frame.
    ///
    /// # Panics
    ///
    /// Causes a panic if `len` exceeds the buffer capacity.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.buffer.len());
        self.len = len;
    }

    /// Releases the staged frame, marking the buffer free.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Returns the staged frame.
    pub fn frame(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

impl AsRef<[u8]> for FrameBuffer {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_ref()
    }
}

impl AsMut<[u8]> for FrameBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy() {
        let mut buffer = FrameBuffer::new(64);
        assert!(!buffer.is_occupied());

        buffer.set_len(42);
        assert!(buffer.is_occupied());
        assert_eq!(buffer.frame().len(), 42);

        buffer.clear();
        assert!(!buffer.is_occupied());
        assert_eq!(buffer.frame().len(), 0);
    }

    #[test]
    #[should_panic]
    fn test_len_beyond_capacity() {
        let mut buffer = FrameBuffer::new(64);
        buffer.set_len(65);
    }
}
