//! Dual-mode byte container for DICOM element values and pixel data.
//!
//! A [`BinaryBuffer`] starts out as a plain byte array and switches to a
//! seekable in-memory stream only when an operation requires one, such
//! as [`append`](BinaryBuffer::append) or
//! [`copy_from`](BinaryBuffer::copy_from). Every operation behaves the
//! same in both modes; callers never need to know which mode the buffer
//! is in, except for performance tuning through [`CapacityMode`].

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use snafu::{ensure, Backtrace, Snafu};
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::mem::MemStream;
use crate::text::{DecodeTextError, EncodeTextError, SpecificCharacterSet, TextCodec};

/// Size of the scratch buffer used by stream-mode copy and shift loops.
const COPY_BUFFER_SIZE: usize = 4096;

/// Contents larger than this are placed in segmented storage when the
/// capacity mode is [`CapacityMode::Automatic`].
const HIGH_CAPACITY_THRESHOLD: usize = 84_000;

/// Largest single write issued to an output sink by
/// [`BinaryBuffer::copy_to`].
const MAX_WRITE_SIZE: usize = 4 * 1024 * 1024;

/// An error raised when a byte swap is requested with a group size
/// of zero.
#[derive(Debug, Snafu)]
#[snafu(display("swap group size must be a positive integer, got {}", size))]
pub struct SwapSizeError {
    size: usize,
    backtrace: Backtrace,
}

/// Storage strategy for stream-backed contents.
///
/// The mode only matters once the buffer materializes a stream; while
/// the contents live in a plain array, the mode is dormant.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CapacityMode {
    /// Use segmented storage when the contents exceed an internal
    /// threshold, and a contiguous allocation otherwise.
    Automatic,
    /// Always use a single contiguous allocation.
    Standard,
    /// Always use segmented storage,
    /// trading locality for cheaper growth of large contents.
    HighCapacity,
}

impl Default for CapacityMode {
    fn default() -> Self {
        CapacityMode::Automatic
    }
}

impl CapacityMode {
    fn wants_high_capacity(self, len: usize) -> bool {
        match self {
            CapacityMode::Automatic => len > HIGH_CAPACITY_THRESHOLD,
            CapacityMode::Standard => false,
            CapacityMode::HighCapacity => true,
        }
    }
}

#[derive(Debug)]
enum Backing {
    Array(Vec<u8>),
    Stream(MemStream),
}

/// A byte container which transparently keeps its contents either in a
/// plain array or in a lazily materialized in-memory stream.
///
/// The buffer carries an [`Endianness`] and an optional
/// [`SpecificCharacterSet`] used by the numeric and string views of
/// the contents. Both default to little endian and the default DICOM
/// character repertoire.
///
/// # Example
///
/// ```
/// use dicombin_core::BinaryBuffer;
///
/// let mut buffer = BinaryBuffer::new();
/// buffer.append(b"OVERLAY");
/// buffer.chop(4);
/// assert_eq!(buffer.to_bytes(), b"LAY");
/// ```
#[derive(Debug)]
pub struct BinaryBuffer {
    backing: Backing,
    endianness: Endianness,
    character_set: Option<SpecificCharacterSet>,
    capacity_mode: CapacityMode,
}

impl Default for BinaryBuffer {
    fn default() -> Self {
        BinaryBuffer::new()
    }
}

impl BinaryBuffer {
    /// Create an empty little endian buffer.
    pub fn new() -> Self {
        BinaryBuffer::with_endianness(Endianness::Little)
    }

    /// Create an empty buffer with the given endianness.
    pub fn with_endianness(endianness: Endianness) -> Self {
        BinaryBuffer {
            backing: Backing::Array(Vec::new()),
            endianness,
            character_set: None,
            capacity_mode: CapacityMode::default(),
        }
    }

    /// Create an empty buffer with the given capacity mode.
    pub fn with_capacity_mode(capacity_mode: CapacityMode) -> Self {
        BinaryBuffer {
            backing: Backing::Array(Vec::new()),
            endianness: Endianness::Little,
            character_set: None,
            capacity_mode,
        }
    }

    /// Create a little endian buffer in array mode over the given bytes.
    pub fn from_vec(data: Vec<u8>) -> Self {
        BinaryBuffer::from_vec_with(data, Endianness::Little, CapacityMode::default())
    }

    /// Create a buffer in array mode over the given bytes,
    /// with explicit endianness and capacity mode.
    pub fn from_vec_with(data: Vec<u8>, endianness: Endianness, capacity_mode: CapacityMode) -> Self {
        BinaryBuffer {
            backing: Backing::Array(data),
            endianness,
            character_set: None,
            capacity_mode,
        }
    }

    /// The endianness used by the numeric views of the contents.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Change the endianness used by the numeric views of the contents.
    /// The bytes themselves are not touched.
    pub fn set_endianness(&mut self, endianness: Endianness) {
        self.endianness = endianness;
    }

    /// The character set used by the string views of the contents,
    /// if one was assigned.
    pub fn character_set(&self) -> Option<SpecificCharacterSet> {
        self.character_set
    }

    /// Assign the character set used by the string views of the
    /// contents. `None` selects the default DICOM repertoire.
    pub fn set_character_set(&mut self, character_set: Option<SpecificCharacterSet>) {
        self.character_set = character_set;
    }

    /// The number of bytes in the buffer.
    pub fn len(&self) -> usize {
        match &self.backing {
            Backing::Array(data) => data.len(),
            Backing::Stream(stream) => stream.len(),
        }
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the contents currently live in a materialized stream.
    pub fn is_stream_backed(&self) -> bool {
        matches!(&self.backing, Backing::Stream(_))
    }

    /// The read position of the materialized stream,
    /// or `None` while in array mode.
    pub fn stream_position(&self) -> Option<usize> {
        match &self.backing {
            Backing::Array(_) => None,
            Backing::Stream(stream) => Some(stream.position()),
        }
    }

    /// Discard all contents and return to array mode.
    pub fn clear(&mut self) {
        self.backing = Backing::Array(Vec::new());
    }

    /// Remove the first `count` bytes, shifting the remainder to the
    /// front. Removing at least as many bytes as the buffer holds is
    /// equivalent to [`clear`](BinaryBuffer::clear). In stream mode the
    /// read position is reset to the start.
    pub fn chop(&mut self, count: usize) {
        if self.len() <= count {
            self.clear();
            return;
        }
        match &mut self.backing {
            Backing::Array(data) => {
                data.drain(..count);
            }
            Backing::Stream(stream) => {
                let mut scratch = [0u8; COPY_BUFFER_SIZE];
                let mut read_pos = count;
                let mut write_pos = 0;
                loop {
                    stream.set_position(read_pos);
                    let n = stream.read(&mut scratch);
                    if n == 0 {
                        break;
                    }
                    read_pos += n;
                    stream.set_position(write_pos);
                    stream.write(&scratch[..n]);
                    write_pos += n;
                }
                stream.truncate(write_pos);
                stream.set_position(0);
            }
        }
    }

    /// Append bytes at the end of the buffer.
    ///
    /// This materializes the stream; the read position is preserved.
    pub fn append(&mut self, data: &[u8]) {
        let stream = self.stream_mut();
        let position = stream.position();
        let len = stream.len();
        stream.set_position(len);
        stream.write(data);
        stream.set_position(position);
    }

    /// Replace the contents with up to `count` bytes read from `source`.
    ///
    /// The source is drained until `count` bytes were obtained or it
    /// reports end of input; in the latter case the remainder of the
    /// requested range is zero filled, so that the buffer length is
    /// always `count`. Returns the number of bytes actually read.
    ///
    /// On I/O error the buffer is left unchanged.
    pub fn copy_from<R: Read + ?Sized>(&mut self, source: &mut R, count: usize) -> io::Result<usize> {
        let high_capacity = self.capacity_mode.wants_high_capacity(count);
        let mut stream = MemStream::with_capacity(count, high_capacity);
        let mut scratch = [0u8; COPY_BUFFER_SIZE];
        let mut copied = 0;
        while copied < count {
            let want = (count - copied).min(COPY_BUFFER_SIZE);
            let n = source.read(&mut scratch[..want])?;
            if n == 0 {
                break;
            }
            stream.write(&scratch[..n]);
            copied += n;
        }
        if copied < count {
            // short reads still yield a buffer of the requested length
            let zeros = [0u8; COPY_BUFFER_SIZE];
            let mut remaining = count - copied;
            while remaining > 0 {
                let n = remaining.min(COPY_BUFFER_SIZE);
                stream.write(&zeros[..n]);
                remaining -= n;
            }
        }
        stream.set_position(0);
        self.backing = Backing::Stream(stream);
        Ok(copied)
    }

    /// Write the entire contents to `writer`, in chunks of at most
    /// 4 MiB. In stream mode the read position is restored afterwards,
    /// including on error.
    pub fn copy_to<W: Write + ?Sized>(&mut self, writer: &mut W) -> io::Result<()> {
        match &mut self.backing {
            Backing::Array(data) => {
                for chunk in data.chunks(MAX_WRITE_SIZE) {
                    writer.write_all(chunk)?;
                }
                Ok(())
            }
            Backing::Stream(stream) => {
                let position = stream.position();
                stream.set_position(0);
                let mut scratch = [0u8; COPY_BUFFER_SIZE];
                let mut outcome = Ok(());
                loop {
                    let n = stream.read(&mut scratch);
                    if n == 0 {
                        break;
                    }
                    if let Err(e) = writer.write_all(&scratch[..n]) {
                        outcome = Err(e);
                        break;
                    }
                }
                stream.set_position(position);
                outcome
            }
        }
    }

    /// Write `count` bytes starting at `offset` to `writer`.
    ///
    /// If the range extends past the end of the contents, the shortfall
    /// is written as zeros. In stream mode the read position is
    /// restored afterwards, including on error.
    pub fn copy_to_range<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        offset: usize,
        count: usize,
    ) -> io::Result<()> {
        match &mut self.backing {
            Backing::Array(data) => {
                let available = data.len().saturating_sub(offset).min(count);
                if available > 0 {
                    writer.write_all(&data[offset..offset + available])?;
                }
                zero_fill(writer, count - available)
            }
            Backing::Stream(stream) => {
                let position = stream.position();
                stream.set_position(offset);
                let mut scratch = [0u8; COPY_BUFFER_SIZE];
                let mut written = 0;
                let mut outcome = Ok(());
                while written < count {
                    let want = (count - written).min(COPY_BUFFER_SIZE);
                    let n = stream.read(&mut scratch[..want]);
                    if n == 0 {
                        break;
                    }
                    if let Err(e) = writer.write_all(&scratch[..n]) {
                        outcome = Err(e);
                        break;
                    }
                    written += n;
                }
                if outcome.is_ok() {
                    outcome = zero_fill(writer, count - written);
                }
                stream.set_position(position);
                outcome
            }
        }
    }

    /// Copy up to `count` bytes starting at `src_offset` into the start
    /// of `dst`. Bytes past the end of the contents leave the
    /// destination untouched.
    ///
    /// # Panics
    ///
    /// Panics if `dst` is shorter than `count`.
    pub fn copy_to_slice(&mut self, dst: &mut [u8], src_offset: usize, count: usize) {
        self.copy_to_slice_at(dst, src_offset, 0, count)
    }

    /// Copy up to `count` bytes starting at `src_offset` into `dst`
    /// starting at `dst_offset`. Bytes past the end of the contents
    /// leave the destination untouched.
    ///
    /// # Panics
    ///
    /// Panics if the destination range exceeds the bounds of `dst`.
    pub fn copy_to_slice_at(
        &mut self,
        dst: &mut [u8],
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) {
        let window = &mut dst[dst_offset..dst_offset + count];
        match &mut self.backing {
            Backing::Array(data) => {
                let available = data.len().saturating_sub(src_offset).min(count);
                window[..available].copy_from_slice(&data[src_offset..src_offset + available]);
            }
            Backing::Stream(stream) => {
                let position = stream.position();
                stream.set_position(src_offset);
                stream.read(window);
                stream.set_position(position);
            }
        }
    }

    /// Obtain a copy of `count` bytes starting at `offset`.
    /// Bytes past the end of the contents come out as zeros.
    pub fn get_chunk(&mut self, offset: usize, count: usize) -> Vec<u8> {
        let mut chunk = vec![0; count];
        self.copy_to_slice(&mut chunk, offset, count);
        chunk
    }

    /// Replace the contents with the given bytes, in array mode.
    pub fn from_bytes(&mut self, data: Vec<u8>) {
        self.backing = Backing::Array(data);
    }

    /// Obtain a copy of the whole contents as a contiguous array.
    ///
    /// In stream mode, the contents are first folded back into array
    /// mode, so repeated calls do not pay the stream traversal twice.
    pub fn to_bytes(&mut self) -> Vec<u8> {
        self.fold_to_array();
        match &self.backing {
            Backing::Array(data) => data.clone(),
            // fold_to_array always leaves the buffer in array mode
            Backing::Stream(_) => unreachable!(),
        }
    }

    /// Obtain a copy of `count` bytes starting at `offset`,
    /// zero filled past the end of the contents.
    /// In stream mode the read position is reset to the start.
    pub fn to_bytes_range(&mut self, offset: usize, count: usize) -> Vec<u8> {
        let chunk = self.get_chunk(offset, count);
        if let Backing::Stream(stream) = &mut self.backing {
            stream.set_position(0);
        }
        chunk
    }

    /// Decode the whole contents as text through the buffer's character
    /// set (or the default repertoire when none is assigned).
    pub fn get_string(&mut self) -> Result<String, DecodeTextError> {
        let bytes = self.to_bytes();
        self.character_set.unwrap_or_default().decode(&bytes)
    }

    /// Replace the contents with the encoding of `text` through the
    /// buffer's character set. An empty string clears the buffer.
    ///
    /// On encoding error the buffer is left unchanged.
    pub fn set_string(&mut self, text: &str) -> Result<(), EncodeTextError> {
        if text.is_empty() {
            self.clear();
            return Ok(());
        }
        let encoded = self.encode_with_charset(text)?;
        self.backing = Backing::Array(encoded);
        Ok(())
    }

    /// Replace the contents with the encoding of `text`, appending the
    /// pad byte if needed to reach an even length. An empty string
    /// clears the buffer.
    ///
    /// On encoding error the buffer is left unchanged.
    pub fn set_string_padded(&mut self, text: &str, pad: u8) -> Result<(), EncodeTextError> {
        if text.is_empty() {
            self.clear();
            return Ok(());
        }
        let mut encoded = self.encode_with_charset(text)?;
        // the even length rule applies to the encoded byte count,
        // not the character count
        if encoded.len() % 2 != 0 {
            encoded.push(pad);
        }
        self.backing = Backing::Array(encoded);
        Ok(())
    }

    fn encode_with_charset(&self, text: &str) -> Result<Vec<u8>, EncodeTextError> {
        self.character_set.unwrap_or_default().encode(text)
    }

    /// Reverse the contents in groups of `group_size` bytes.
    ///
    /// A trailing partial group is left untouched. Group sizes 1, 2,
    /// 4 and 8 take fast paths; a group size of 0 is rejected.
    pub fn swap(&mut self, group_size: usize) -> Result<(), SwapSizeError> {
        ensure!(group_size > 0, SwapSizeSnafu { size: group_size });
        match group_size {
            1 => {}
            2 => self.swap2(),
            4 => self.swap4(),
            8 => self.swap8(),
            n => self.apply_swap(|data| swap_slice_by(data, n), n),
        }
        Ok(())
    }

    /// Reverse the contents in groups of 2 bytes.
    /// A trailing odd byte is left untouched.
    pub fn swap2(&mut self) {
        self.apply_swap(swap2_slice, 2);
    }

    /// Reverse the contents in groups of 4 bytes.
    /// A trailing partial group is left untouched.
    pub fn swap4(&mut self) {
        self.apply_swap(swap4_slice, 4);
    }

    /// Reverse the contents in groups of 8 bytes.
    /// A trailing partial group is left untouched.
    pub fn swap8(&mut self) {
        self.apply_swap(|data| swap_slice_by(data, 8), 8);
    }

    fn apply_swap<F: Fn(&mut [u8])>(&mut self, swap_fn: F, group_size: usize) {
        // a plain stream is cheaper to fold and swap in place
        self.fold_plain_stream();
        match &mut self.backing {
            Backing::Array(data) => swap_fn(data),
            Backing::Stream(stream) => {
                // window covering a whole number of groups
                let window_len =
                    (COPY_BUFFER_SIZE / group_size + usize::from(COPY_BUFFER_SIZE % group_size != 0))
                        * group_size;
                let mut window = vec![0u8; window_len];
                let position = stream.position();
                let mut offset = 0;
                let len = stream.len();
                while offset < len {
                    stream.set_position(offset);
                    let n = stream.read(&mut window);
                    // a trailing partial group stays as it is
                    let whole = n / group_size * group_size;
                    swap_fn(&mut window[..whole]);
                    stream.set_position(offset);
                    stream.write(&window[..whole]);
                    offset += n;
                    if n < window.len() {
                        break;
                    }
                }
                stream.set_position(position);
            }
        }
    }

    fn fold_plain_stream(&mut self) {
        let plain = matches!(&self.backing, Backing::Stream(stream) if !stream.is_segmented());
        if plain {
            self.fold_to_array();
        }
    }

    fn fold_to_array(&mut self) {
        if let Backing::Stream(_) = &self.backing {
            let backing = std::mem::replace(&mut self.backing, Backing::Array(Vec::new()));
            match backing {
                Backing::Stream(stream) => {
                    self.backing = Backing::Array(stream.into_vec());
                }
                // checked above
                Backing::Array(_) => unreachable!(),
            }
        }
    }

    /// Exchange the contents, endianness, character set and capacity
    /// mode with another buffer.
    pub fn swap_with(&mut self, other: &mut BinaryBuffer) {
        std::mem::swap(self, other);
    }

    fn stream_mut(&mut self) -> &mut MemStream {
        if let Backing::Array(_) = &self.backing {
            let backing = std::mem::replace(&mut self.backing, Backing::Array(Vec::new()));
            match backing {
                Backing::Array(data) => {
                    let high_capacity = self.capacity_mode.wants_high_capacity(data.len());
                    self.backing = Backing::Stream(MemStream::from_vec(data, high_capacity));
                }
                Backing::Stream(_) => unreachable!(),
            }
        }
        match &mut self.backing {
            Backing::Stream(stream) => stream,
            // materialized above
            Backing::Array(_) => unreachable!(),
        }
    }
}

fn zero_fill<W: Write + ?Sized>(writer: &mut W, count: usize) -> io::Result<()> {
    let zeros = [0u8; COPY_BUFFER_SIZE];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(COPY_BUFFER_SIZE);
        writer.write_all(&zeros[..n])?;
        remaining -= n;
    }
    Ok(())
}

fn swap2_slice(data: &mut [u8]) {
    let mut i = 0;
    while i + 2 <= data.len() {
        data.swap(i, i + 1);
        i += 2;
    }
}

fn swap4_slice(data: &mut [u8]) {
    let mut i = 0;
    while i + 4 <= data.len() {
        data.swap(i, i + 3);
        data.swap(i + 1, i + 2);
        i += 4;
    }
}

fn swap_slice_by(data: &mut [u8], group_size: usize) {
    for group in data.chunks_exact_mut(group_size) {
        group.reverse();
    }
}

macro_rules! impl_reinterpret {
    ($(#[$outer:meta])* $name: ident, $t: ty, $size: literal, $read_into: ident) => {
        $(#[$outer])*
        pub fn $name(&mut self) -> Vec<$t> {
            let bytes = self.to_bytes();
            let n = bytes.len() / $size;
            let mut values = vec![Default::default(); n];
            match self.endianness {
                Endianness::Little => LittleEndian::$read_into(&bytes[..n * $size], &mut values),
                Endianness::Big => BigEndian::$read_into(&bytes[..n * $size], &mut values),
            }
            values
        }
    };
}

impl BinaryBuffer {
    impl_reinterpret! {
        /// Reinterpret the contents as unsigned 16-bit integers in the
        /// buffer's endianness. Trailing bytes short of a whole value
        /// are ignored.
        to_u16s, u16, 2, read_u16_into
    }
    impl_reinterpret! {
        /// Reinterpret the contents as signed 16-bit integers in the
        /// buffer's endianness. Trailing bytes short of a whole value
        /// are ignored.
        to_i16s, i16, 2, read_i16_into
    }
    impl_reinterpret! {
        /// Reinterpret the contents as unsigned 32-bit integers in the
        /// buffer's endianness. Trailing bytes short of a whole value
        /// are ignored.
        to_u32s, u32, 4, read_u32_into
    }
    impl_reinterpret! {
        /// Reinterpret the contents as signed 32-bit integers in the
        /// buffer's endianness. Trailing bytes short of a whole value
        /// are ignored.
        to_i32s, i32, 4, read_i32_into
    }
    impl_reinterpret! {
        /// Reinterpret the contents as 32-bit floats in the buffer's
        /// endianness. Trailing bytes short of a whole value are
        /// ignored.
        to_f32s, f32, 4, read_f32_into
    }
    impl_reinterpret! {
        /// Reinterpret the contents as 64-bit floats in the buffer's
        /// endianness. Trailing bytes short of a whole value are
        /// ignored.
        to_f64s, f64, 8, read_f64_into
    }
}

impl Read for BinaryBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.stream_mut().read(buf))
    }
}

impl Seek for BinaryBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let stream = self.stream_mut();
        let target = match pos {
            SeekFrom::Start(offset) => offset as i128,
            SeekFrom::End(offset) => stream.len() as i128 + offset as i128,
            SeekFrom::Current(offset) => stream.position() as i128 + offset as i128,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            ));
        }
        stream.set_position(target as usize);
        Ok(target as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn random_bytes(len: usize, mut seed: u32) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed >> 24) as u8
            })
            .collect()
    }

    /// Materialize the stream and leave the position at `position`.
    fn stream_backed(data: Vec<u8>, position: u64) -> BinaryBuffer {
        let mut buffer = BinaryBuffer::from_vec(data);
        buffer.seek(SeekFrom::Start(position)).unwrap();
        assert!(buffer.is_stream_backed());
        buffer
    }

    #[test]
    fn chop_in_array_mode() {
        let data = random_bytes(6000, 7);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        buffer.chop(401);
        assert_eq!(buffer.len(), 6000 - 401);
        assert_eq!(buffer.to_bytes(), &data[401..]);
    }

    #[test]
    fn chop_in_stream_mode() {
        let data = random_bytes(6000, 7);
        let mut buffer = stream_backed(data.clone(), 42);
        buffer.chop(401);
        assert_eq!(buffer.len(), 6000 - 401);
        assert_eq!(buffer.stream_position(), Some(0));
        assert_eq!(buffer.to_bytes(), &data[401..]);
    }

    #[test]
    fn chop_whole_buffer_clears() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3]);
        buffer.chop(3);
        assert!(buffer.is_empty());
        assert!(!buffer.is_stream_backed());

        let mut buffer = stream_backed(vec![1, 2, 3], 1);
        buffer.chop(10);
        assert!(buffer.is_empty());
        assert!(!buffer.is_stream_backed());
    }

    #[test]
    fn chop_in_high_capacity_mode() {
        let data = random_bytes(200_000, 11);
        let mut buffer =
            BinaryBuffer::from_vec_with(data.clone(), Endianness::Little, CapacityMode::Automatic);
        buffer.append(&[]);
        assert!(buffer.is_stream_backed());
        buffer.chop(90_001);
        assert_eq!(buffer.to_bytes(), &data[90_001..]);
    }

    #[test]
    fn append_preserves_contents_and_position() {
        let data = random_bytes(100, 3);
        let mut buffer = stream_backed(data.clone(), 42);
        buffer.append(&[0xAB, 0xCD]);
        assert_eq!(buffer.len(), 102);
        assert_eq!(buffer.stream_position(), Some(42));

        let mut expected = data;
        expected.extend_from_slice(&[0xAB, 0xCD]);
        assert_eq!(buffer.to_bytes(), expected);
    }

    #[test]
    fn append_materializes_stream() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2]);
        assert!(!buffer.is_stream_backed());
        buffer.append(&[3]);
        assert!(buffer.is_stream_backed());
        assert_eq!(buffer.to_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn copy_from_pads_short_sources() {
        let data = random_bytes(4195, 5);
        let mut buffer = BinaryBuffer::new();
        let read = buffer.copy_from(&mut Cursor::new(&data), 9000).unwrap();
        // one full scratch buffer plus the remainder of a second read
        assert_eq!(read, 4195);
        assert_eq!(buffer.len(), 9000);

        let out = buffer.to_bytes();
        assert_eq!(&out[..4195], &data[..]);
        assert!(out[4195..].iter().all(|&b| b == 0));
    }

    #[test]
    fn copy_from_reads_exact_count() {
        let data = random_bytes(9000, 5);
        let mut buffer = BinaryBuffer::new();
        let read = buffer.copy_from(&mut Cursor::new(&data), 4195).unwrap();
        assert_eq!(read, 4195);
        assert_eq!(buffer.len(), 4195);
        assert_eq!(buffer.stream_position(), Some(0));
        assert_eq!(buffer.to_bytes(), &data[..4195]);
    }

    #[test]
    fn copy_from_error_leaves_buffer_unchanged() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::Other, "boom"))
            }
        }

        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3]);
        assert!(buffer.copy_from(&mut FailingReader, 10).is_err());
        assert_eq!(buffer.to_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn copy_to_writes_everything() {
        let data = random_bytes(10_000, 9);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        let mut out = Vec::new();
        buffer.copy_to(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn copy_to_restores_stream_position() {
        let data = random_bytes(10_000, 9);
        let mut buffer = stream_backed(data.clone(), 42);
        let mut out = Vec::new();
        buffer.copy_to(&mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(buffer.stream_position(), Some(42));
    }

    #[test]
    fn copy_to_file_in_chunks() {
        let data = random_bytes(6_001_001, 13);
        let mut buffer = BinaryBuffer::from_vec(data.clone());

        let mut file = tempfile::tempfile().unwrap();
        buffer.copy_to(&mut file).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut out = Vec::new();
        file.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn copy_to_range_zero_pads() {
        let data = random_bytes(100, 17);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        let mut out = Vec::new();
        buffer.copy_to_range(&mut out, 90, 20).unwrap();
        assert_eq!(&out[..10], &data[90..]);
        assert_eq!(&out[10..], &[0; 10]);

        let mut buffer = stream_backed(data.clone(), 5);
        let mut out = Vec::new();
        buffer.copy_to_range(&mut out, 90, 20).unwrap();
        assert_eq!(&out[..10], &data[90..]);
        assert_eq!(&out[10..], &[0; 10]);
        assert_eq!(buffer.stream_position(), Some(5));
    }

    #[test]
    fn copy_to_slice_leaves_missing_bytes_untouched() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3, 4]);
        let mut dst = [0xEE; 6];
        buffer.copy_to_slice(&mut dst, 2, 4);
        assert_eq!(dst, [3, 4, 0xEE, 0xEE, 0xEE, 0xEE]);

        let mut buffer = stream_backed(vec![1, 2, 3, 4], 1);
        let mut dst = [0xEE; 6];
        buffer.copy_to_slice_at(&mut dst, 2, 1, 4);
        assert_eq!(dst, [0xEE, 3, 4, 0xEE, 0xEE, 0xEE]);
        assert_eq!(buffer.stream_position(), Some(1));
    }

    #[test]
    fn get_chunk_in_both_modes() {
        let data = random_bytes(5000, 23);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        assert_eq!(buffer.get_chunk(1000, 128), &data[1000..1128]);

        let mut buffer = stream_backed(data.clone(), 7);
        assert_eq!(buffer.get_chunk(1000, 128), &data[1000..1128]);
        assert_eq!(buffer.stream_position(), Some(7));
    }

    #[test]
    fn from_bytes_resets_to_array_mode() {
        let mut buffer = stream_backed(vec![1, 2, 3], 2);
        buffer.from_bytes(vec![9, 8]);
        assert!(!buffer.is_stream_backed());
        assert_eq!(buffer.to_bytes(), vec![9, 8]);
    }

    #[test]
    fn to_bytes_folds_stream_into_array() {
        let data = random_bytes(3000, 29);
        let mut buffer = stream_backed(data.clone(), 11);
        assert_eq!(buffer.to_bytes(), data);
        assert!(!buffer.is_stream_backed());
        assert_eq!(buffer.to_bytes(), data);
    }

    #[test]
    fn to_bytes_range_resets_stream_position() {
        let data = random_bytes(300, 31);
        let mut buffer = stream_backed(data.clone(), 100);
        let chunk = buffer.to_bytes_range(290, 20);
        assert_eq!(&chunk[..10], &data[290..]);
        assert_eq!(&chunk[10..], &[0; 10]);
        assert_eq!(buffer.stream_position(), Some(0));
    }

    #[test]
    fn swap2_whole_groups() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3, 4, 5, 6]);
        buffer.swap2();
        assert_eq!(buffer.to_bytes(), vec![2, 1, 4, 3, 6, 5]);
    }

    #[test]
    fn swap2_leaves_trailing_byte() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3, 4, 5]);
        buffer.swap2();
        assert_eq!(buffer.to_bytes(), vec![2, 1, 4, 3, 5]);
    }

    #[test]
    fn swap4_leaves_trailing_group() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3, 4, 5, 6]);
        buffer.swap4();
        assert_eq!(buffer.to_bytes(), vec![4, 3, 2, 1, 5, 6]);
    }

    #[test]
    fn swap8_reverses_groups() {
        let mut buffer = BinaryBuffer::from_vec((1..=16).collect());
        buffer.swap8();
        assert_eq!(
            buffer.to_bytes(),
            vec![8, 7, 6, 5, 4, 3, 2, 1, 16, 15, 14, 13, 12, 11, 10, 9]
        );
    }

    #[test]
    fn swap_by_eight_matches_swap8() {
        let data = random_bytes(100, 67);
        let mut by_size = BinaryBuffer::from_vec(data.clone());
        by_size.swap(8).unwrap();
        let mut fast = BinaryBuffer::from_vec(data);
        fast.swap8();
        assert_eq!(by_size.to_bytes(), fast.to_bytes());
    }

    #[test]
    fn swap_rejects_zero_group_size() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2]);
        assert!(buffer.swap(0).is_err());
        assert_eq!(buffer.to_bytes(), vec![1, 2]);
    }

    #[test]
    fn swap_of_one_is_identity() {
        let data = random_bytes(100, 37);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        buffer.swap(1).unwrap();
        assert_eq!(buffer.to_bytes(), data);
    }

    #[test]
    fn double_swap_is_identity() {
        for &group in &[2usize, 4, 8] {
            let data = random_bytes(4096, 41);
            let mut buffer = BinaryBuffer::from_vec(data.clone());
            buffer.swap(group).unwrap();
            buffer.swap(group).unwrap();
            assert_eq!(buffer.to_bytes(), data, "group size {}", group);
        }
    }

    #[test]
    fn swap_in_high_capacity_mode_matches_array_mode() {
        for &group in &[2usize, 4, 8] {
            // length not a multiple of the window so the last window is partial
            let data = random_bytes(150_003, 43);

            let mut plain = BinaryBuffer::from_vec(data.clone());
            plain.swap(group).unwrap();

            let mut high =
                BinaryBuffer::from_vec_with(data, Endianness::Little, CapacityMode::HighCapacity);
            high.append(&[]);
            assert!(high.is_stream_backed());
            high.swap(group).unwrap();

            assert_eq!(plain.to_bytes(), high.to_bytes(), "group size {}", group);
        }
    }

    #[test]
    fn set_string_encodes_ascii() {
        let mut buffer = BinaryBuffer::new();
        buffer.set_string("MONOCHROME2").unwrap();
        assert_eq!(buffer.to_bytes(), b"MONOCHROME2");
    }

    #[test]
    fn set_string_empty_clears() {
        let mut buffer = BinaryBuffer::from_vec(vec![1, 2, 3]);
        buffer.set_string("").unwrap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn set_string_padded_pads_encoded_length() {
        let mut buffer = BinaryBuffer::new();
        buffer.set_string_padded("ABC", b' ').unwrap();
        assert_eq!(buffer.to_bytes(), b"ABC ");

        buffer.set_string_padded("ABCD", b' ').unwrap();
        assert_eq!(buffer.to_bytes(), b"ABCD");
    }

    #[test]
    fn set_string_padded_counts_encoded_bytes() {
        let mut buffer = BinaryBuffer::new();
        buffer.set_character_set(Some(SpecificCharacterSet::IsoIr100));
        // 11 characters encode to 11 bytes in ISO-IR 100
        buffer.set_string_padded("Simões^João", 0).unwrap();
        assert_eq!(buffer.to_bytes(), b"Sim\xF5es^Jo\xE3o\x00");
    }

    #[test]
    fn get_string_uses_character_set() {
        let mut buffer = BinaryBuffer::from_vec(b"Sim\xF5es^Jo\xE3o".to_vec());
        buffer.set_character_set(Some(SpecificCharacterSet::IsoIr100));
        assert_eq!(buffer.get_string().unwrap(), "Simões^João");
    }

    #[test]
    fn to_u16s_little_and_big_endian() {
        let mut buffer = BinaryBuffer::from_vec(vec![0x34, 0x12, 0x78, 0x56, 0xFF]);
        assert_eq!(buffer.to_u16s(), vec![0x1234, 0x5678]);

        buffer.set_endianness(Endianness::Big);
        assert_eq!(buffer.to_u16s(), vec![0x3412, 0x7856]);
    }

    #[test]
    fn to_f32s_reads_values() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f32).to_le_bytes());
        let mut buffer = BinaryBuffer::from_vec(bytes);
        assert_eq!(buffer.to_f32s(), vec![1.5, -0.25]);
    }

    #[test]
    fn swap_with_exchanges_everything() {
        let mut a = BinaryBuffer::from_vec(vec![1, 2]);
        let mut b = BinaryBuffer::from_vec(vec![3, 4, 5]);
        b.set_endianness(Endianness::Big);
        a.swap_with(&mut b);
        assert_eq!(a.to_bytes(), vec![3, 4, 5]);
        assert_eq!(a.endianness(), Endianness::Big);
        assert_eq!(b.to_bytes(), vec![1, 2]);
    }

    #[test]
    fn read_and_seek_through_contents() {
        let data = random_bytes(300, 47);
        let mut buffer = BinaryBuffer::from_vec(data.clone());
        buffer.seek(SeekFrom::Start(100)).unwrap();
        let mut out = [0u8; 50];
        buffer.read_exact(&mut out).unwrap();
        assert_eq!(&out[..], &data[100..150]);

        let pos = buffer.seek(SeekFrom::Current(-10)).unwrap();
        assert_eq!(pos, 140);
        let pos = buffer.seek(SeekFrom::End(-5)).unwrap();
        assert_eq!(pos, 295);
        assert!(buffer.seek(SeekFrom::Current(-1000)).is_err());
    }

    /// Run the same editing sequence in all three capacity modes and
    /// check that the observable contents agree.
    #[test]
    fn cross_mode_parity() {
        let data = random_bytes(100_000, 53);
        let modes = [
            CapacityMode::Automatic,
            CapacityMode::Standard,
            CapacityMode::HighCapacity,
        ];
        let mut results = Vec::new();
        for &mode in &modes {
            let mut buffer = BinaryBuffer::from_vec_with(data.clone(), Endianness::Little, mode);
            buffer.append(&random_bytes(1000, 59));
            buffer.chop(12_345);
            buffer.swap2();
            let mut extra = Cursor::new(random_bytes(100, 61));
            let mut side = BinaryBuffer::with_capacity_mode(mode);
            side.copy_from(&mut extra, 200).unwrap();
            buffer.append(&side.to_bytes());
            results.push((buffer.len(), buffer.to_bytes()));
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);
    }
}
