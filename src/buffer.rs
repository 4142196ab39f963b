/// A fixed-capacity ring holding the most recently pushed bytes.
///
/// Only used to ask whether the stream seen so far ends with a given pattern,
/// so a boundary split across two reads is still recognized. Memory use is
/// fixed at construction.
pub struct PatternRingBuffer {
    buf: Box<[u8]>,
    head: usize,
    len: usize,
}

impl PatternRingBuffer {
    /// Creates an empty ring holding at most `capacity` bytes.
    ///
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> PatternRingBuffer {
        PatternRingBuffer {
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    /// Creates a ring twice as large as the longest of `patterns`.
    pub fn for_patterns(patterns: &[&[u8]]) -> PatternRingBuffer {
        let longest = patterns.iter().map(|p| p.len()).max().unwrap_or(0);
        PatternRingBuffer::new(longest * 2)
    }

    pub fn push(&mut self, byte: u8) {
        let cap = self.buf.len();
        self.buf[(self.head + self.len) % cap] = byte;

        if self.len < cap {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % cap;
        }
    }

    /// Returns `true` if the last `pattern.len()` pushed bytes equal `pattern`.
    pub fn ends_with(&self, pattern: &[u8]) -> bool {
        if pattern.len() > self.len {
            return false;
        }

        let cap = self.buf.len();
        let start = self.head + self.len - pattern.len();

        pattern
            .iter()
            .enumerate()
            .all(|(i, b)| self.buf[(start + i) % cap] == *b)
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}
