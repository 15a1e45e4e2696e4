//! In-memory backing stores for stream-backed buffers.
//!
//! Two strategies are available: a plain contiguous store, and a
//! segmented store which keeps the contents in a series of smaller
//! blocks. The segmented store is meant for large contents, where a
//! single contiguous allocation would be costly or would fragment the
//! heap; the first blocks grow geometrically so that small streams do
//! not pay for a full-size block.

/// Maximum size of a single block in the segmented store.
const MAX_BLOCK_SIZE: usize = 64 * 1024;

/// Size of the first block in the segmented store.
const FIRST_BLOCK_SIZE: usize = 1024;

/// Number of geometrically growing blocks before the block size
/// settles at [`MAX_BLOCK_SIZE`].
const SMALL_BLOCK_COUNT: usize = 7;

/// Total capacity of the geometrically growing prefix
/// (1 + 2 + 4 + ... + 64 KiB).
const SMALL_BLOCKS_TOTAL: usize = FIRST_BLOCK_SIZE * ((1 << SMALL_BLOCK_COUNT) - 1);

/// A seekable in-memory store, in one of the two backing strategies.
///
/// All operations are infallible: the store lives entirely in memory
/// and growing writes allocate as needed. Reads past the end simply
/// return fewer bytes.
#[derive(Debug)]
pub(crate) enum MemStream {
    Plain(PlainStream),
    Segmented(SegmentedStream),
}

impl MemStream {
    pub(crate) fn with_capacity(capacity: usize, high_capacity: bool) -> Self {
        if high_capacity {
            MemStream::Segmented(SegmentedStream::new())
        } else {
            MemStream::Plain(PlainStream {
                data: Vec::with_capacity(capacity),
                position: 0,
            })
        }
    }

    pub(crate) fn from_vec(data: Vec<u8>, high_capacity: bool) -> Self {
        if high_capacity {
            MemStream::Segmented(SegmentedStream::from_slice(&data))
        } else {
            MemStream::Plain(PlainStream { data, position: 0 })
        }
    }

    pub(crate) fn is_segmented(&self) -> bool {
        matches!(self, MemStream::Segmented(_))
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            MemStream::Plain(s) => s.data.len(),
            MemStream::Segmented(s) => s.len,
        }
    }

    pub(crate) fn position(&self) -> usize {
        match self {
            MemStream::Plain(s) => s.position,
            MemStream::Segmented(s) => s.position,
        }
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        match self {
            MemStream::Plain(s) => s.position = position,
            MemStream::Segmented(s) => s.position = position,
        }
    }

    /// Read bytes from the current position, advancing it.
    ///
    /// Fills as much of `buf` as the remaining contents allow and
    /// returns the number of bytes read (0 only at end of stream).
    pub(crate) fn read(&mut self, buf: &mut [u8]) -> usize {
        match self {
            MemStream::Plain(s) => s.read(buf),
            MemStream::Segmented(s) => s.read(buf),
        }
    }

    /// Write all of `buf` at the current position, advancing it and
    /// growing the stream as needed. Writing past the end zero-fills
    /// any gap left by a previous seek.
    pub(crate) fn write(&mut self, buf: &[u8]) {
        match self {
            MemStream::Plain(s) => s.write(buf),
            MemStream::Segmented(s) => s.write(buf),
        }
    }

    /// Shrink the stream to `len` bytes. No effect if already smaller.
    pub(crate) fn truncate(&mut self, len: usize) {
        match self {
            MemStream::Plain(s) => s.truncate(len),
            MemStream::Segmented(s) => s.truncate(len),
        }
    }

    /// Dump the whole contents into a contiguous array.
    pub(crate) fn into_vec(self) -> Vec<u8> {
        match self {
            MemStream::Plain(s) => s.data,
            MemStream::Segmented(s) => s.to_vec(),
        }
    }
}

/// Contiguous in-memory store with a read/write position.
#[derive(Debug)]
pub(crate) struct PlainStream {
    data: Vec<u8>,
    position: usize,
}

impl PlainStream {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = self.data.len().saturating_sub(self.position).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        n
    }

    fn write(&mut self, buf: &[u8]) {
        if self.position > self.data.len() {
            self.data.resize(self.position, 0);
        }
        let overwrite = (self.data.len() - self.position).min(buf.len());
        self.data[self.position..self.position + overwrite].copy_from_slice(&buf[..overwrite]);
        self.data.extend_from_slice(&buf[overwrite..]);
        self.position += buf.len();
    }

    fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.position = self.position.min(self.data.len());
    }
}

/// Block-structured in-memory store for large contents.
///
/// The contents are spread over zero-initialized blocks of at most
/// [`MAX_BLOCK_SIZE`] bytes; the first few blocks are smaller so that
/// small streams waste little memory.
#[derive(Debug, Default)]
pub(crate) struct SegmentedStream {
    blocks: Vec<Vec<u8>>,
    len: usize,
    position: usize,
}

fn block_size(index: usize) -> usize {
    if index < SMALL_BLOCK_COUNT {
        FIRST_BLOCK_SIZE << index
    } else {
        MAX_BLOCK_SIZE
    }
}

/// Map a stream position to (block index, offset within the block).
fn locate(position: usize) -> (usize, usize) {
    if position >= SMALL_BLOCKS_TOTAL {
        let beyond = position - SMALL_BLOCKS_TOTAL;
        (SMALL_BLOCK_COUNT + beyond / MAX_BLOCK_SIZE, beyond % MAX_BLOCK_SIZE)
    } else {
        let mut index = 0;
        let mut start = 0;
        while position >= start + block_size(index) {
            start += block_size(index);
            index += 1;
        }
        (index, position - start)
    }
}

impl SegmentedStream {
    pub(crate) fn new() -> Self {
        SegmentedStream::default()
    }

    pub(crate) fn from_slice(data: &[u8]) -> Self {
        let mut stream = SegmentedStream::new();
        if !data.is_empty() {
            stream.write(data);
            stream.position = 0;
        }
        stream
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let total = self.len.saturating_sub(self.position).min(buf.len());
        let mut filled = 0;
        while filled < total {
            let (index, offset) = locate(self.position);
            let block = &self.blocks[index];
            let n = (block.len() - offset).min(total - filled);
            buf[filled..filled + n].copy_from_slice(&block[offset..offset + n]);
            filled += n;
            self.position += n;
        }
        total
    }

    fn write(&mut self, buf: &[u8]) {
        let mut written = 0;
        while written < buf.len() {
            let (index, offset) = locate(self.position);
            while self.blocks.len() <= index {
                let next = self.blocks.len();
                self.blocks.push(vec![0; block_size(next)]);
            }
            let block = &mut self.blocks[index];
            let n = (block.len() - offset).min(buf.len() - written);
            block[offset..offset + n].copy_from_slice(&buf[written..written + n]);
            written += n;
            self.position += n;
        }
        if self.position > self.len {
            self.len = self.position;
        }
    }

    fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        // zero the dropped tail so that growing the stream again does
        // not resurrect stale bytes
        let (index, offset) = locate(len);
        if index < self.blocks.len() {
            for byte in &mut self.blocks[index][offset..] {
                *byte = 0;
            }
            self.blocks.truncate(index + 1);
        }
        self.len = len;
        self.position = self.position.min(len);
    }

    fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        let mut remaining = self.len;
        for block in &self.blocks {
            let n = remaining.min(block.len());
            out.extend_from_slice(&block[..n]);
            remaining -= n;
            if remaining == 0 {
                break;
            }
        }
        out
    }
}
