//! # EVM Memory
//!
//! Byte-addressable, word-aligned linear memory. Memory only grows; its size
//! is always a multiple of 32 and growth is priced quadratically. The frame
//! charges [`Memory::expansion_cost`] before calling [`Memory::resize`], so no
//! write is observable before it is paid for.

/// Word size in bytes (32 bytes = 256 bits).
pub const WORD_SIZE: usize = 32;

/// Largest byte offset the interpreter will address. Expanding to it would
/// cost more gas than a `u64` holds, so anything beyond is out of gas.
pub const MAX_MEMORY_OFFSET: usize = u32::MAX as usize;

/// EVM memory implementation.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
    last_write: Option<(usize, usize)>,
}

impl Memory {
    /// Creates a new empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current size in bytes (always a multiple of 32).
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Current size in 32-byte words.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    /// Gas to grow memory so that byte `new_end - 1` is addressable.
    /// Zero when no growth is needed.
    #[must_use]
    pub fn expansion_cost(&self, new_end: usize) -> u64 {
        if new_end <= self.data.len() {
            return 0;
        }
        memory_expansion_cost(self.word_count(), new_end.div_ceil(WORD_SIZE))
    }

    /// Grows memory to cover `new_end` bytes, rounded up to a word boundary.
    pub fn resize(&mut self, new_end: usize) {
        if new_end > self.data.len() {
            self.data.resize(new_end.div_ceil(WORD_SIZE) * WORD_SIZE, 0);
        }
    }

    /// Reads `len` bytes; bytes never written read as zero.
    #[must_use]
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut result = vec![0u8; len];
        if offset < self.data.len() {
            let end = offset.saturating_add(len).min(self.data.len());
            result[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        result
    }

    /// Reads a 32-byte word.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> [u8; 32] {
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.read(offset, WORD_SIZE));
        word
    }

    /// Writes `bytes` at `offset`, growing memory if needed.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let end = offset + bytes.len();
        self.resize(end);
        self.data[offset..end].copy_from_slice(bytes);
        self.last_write = Some((offset, bytes.len()));
    }

    /// Writes a 32-byte word.
    pub fn write_word(&mut self, offset: usize, word: &[u8; 32]) {
        self.write(offset, word);
    }

    /// Writes a single byte (MSTORE8).
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.write(offset, &[value]);
    }

    /// Copies `len` bytes of `source` starting at `source_offset` into memory
    /// at `dest`, zero-padding past the end of `source`.
    ///
    /// Used by CALLDATACOPY, CODECOPY, EXTCODECOPY and RETURNDATACOPY.
    pub fn write_padded(&mut self, dest: usize, source: &[u8], source_offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let mut chunk = vec![0u8; len];
        if source_offset < source.len() {
            let end = source_offset.saturating_add(len).min(source.len());
            chunk[..end - source_offset].copy_from_slice(&source[source_offset..end]);
        }
        self.write(dest, &chunk);
    }

    /// MCOPY (EIP-5656): copy within memory, overlap-safe.
    pub fn copy_within(&mut self, dest: usize, src: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.resize(dest.max(src) + len);
        self.data.copy_within(src..src + len, dest);
        self.last_write = Some((dest, len));
    }

    /// Region written since the last call, for tracing.
    pub fn take_last_write(&mut self) -> Option<(usize, usize)> {
        self.last_write.take()
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Calculate memory gas cost.
///
/// Cost = (`word_size^2` / 512) + (3 * `word_size`)
#[must_use]
pub fn memory_gas_cost(word_size: usize) -> u64 {
    let word_size = word_size as u64;
    (word_size.saturating_mul(word_size) / 512).saturating_add(3 * word_size)
}

/// Calculate incremental gas cost for memory expansion.
#[must_use]
pub fn memory_expansion_cost(old_word_size: usize, new_word_size: usize) -> u64 {
    if new_word_size <= old_word_size {
        return 0;
    }
    memory_gas_cost(new_word_size) - memory_gas_cost(old_word_size)
}

// =============================================================================
// TESTS
// =============================================================================
