use core::cmp::min;

/// One USB bulk packet
pub(crate) const BUF_SIZE: usize = 512;

/// Page-aligned packet scratch with a drain cursor.
///
/// The USB DMA engine requires page-aligned transfer buffers, so the byte
/// array is pinned to a 4 KiB boundary. One instance backs each direction:
/// the OUT side refills from the transport and is drained a few bytes at a
/// time, the IN side stages outbound bytes for a single send.
#[repr(C, align(4096))]
pub(crate) struct Scratch {
    bytes: [u8; BUF_SIZE],
    len: usize,
    pos: usize,
}

impl Scratch {
    pub fn new() -> Self {
        Scratch {
            bytes: [0u8; BUF_SIZE],
            len: 0,
            pos: 0,
        }
    }

    /// Whether the last transfer has been fully consumed.
    pub fn is_drained(&self) -> bool {
        self.pos >= self.len
    }

    /// Refill from one transfer; `xfer` writes into the whole scratch and
    /// returns the byte count it produced.
    pub fn fill<E>(&mut self, xfer: impl FnOnce(&mut [u8]) -> Result<usize, E>) -> Result<(), E> {
        self.len = 0;
        self.pos = 0;
        self.len = min(xfer(&mut self.bytes)?, BUF_SIZE);
        Ok(())
    }

    /// Copy out up to `dst.len()` bytes of the current transfer, returning
    /// the count actually copied. A short transfer leaves the tail of `dst`
    /// untouched.
    pub fn drain(&mut self, dst: &mut [u8]) -> usize {
        let take = min(dst.len(), self.len - self.pos);
        dst[..take].copy_from_slice(&self.bytes[self.pos..self.pos + take]);
        self.pos += take;
        take
    }

    /// Stage outbound bytes, returning the slice to hand to the transport.
    pub fn stage(&mut self, src: &[u8]) -> &[u8] {
        let count = min(src.len(), BUF_SIZE);
        self.bytes[..count].copy_from_slice(&src[..count]);
        &self.bytes[..count]
    }
}
