//! Splitting frame buffers into datagram-sized chunks.

/// One slice of a frame buffer and its position within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Byte offset of `bytes` within the frame buffer.
    pub offset: usize,
    /// At most `chunk_size` bytes; only the last chunk may be shorter.
    pub bytes: &'a [u8],
}

/// Iterates over `data` in `chunk_size` pieces with monotonically
/// increasing offsets `0, chunk_size, 2 × chunk_size, …`.
///
/// # Panics
///
/// Panics if `chunk_size` is zero.
pub fn chunks(data: &[u8], chunk_size: usize) -> impl Iterator<Item = Chunk<'_>> + '_ {
    data.chunks(chunk_size)
        .enumerate()
        .map(move |(i, bytes)| Chunk {
            offset: i * chunk_size,
            bytes,
        })
}

/// Number of chunks [`chunks`] yields for `len` bytes: `ceil(len / chunk_size)`.
pub fn chunk_count(len: usize, chunk_size: usize) -> usize {
    len.div_ceil(chunk_size)
}
