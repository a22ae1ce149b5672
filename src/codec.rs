//! Typed reader/writer for MTP wire values
//!
//! Everything on the wire is little-endian. Strings are one count byte (the
//! number of UTF-16 code units including the terminating null; zero for the
//! empty string, which carries no units at all) followed by the units.
//! Arrays are a u32 element count followed by the elements.

use alloc::string::String;
use alloc::vec::Vec;

/// Appends MTP-typed values to a growable byte buffer.
pub(crate) struct Writer<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> Writer<'a> {
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Writer { buf }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn string(&mut self, s: &str) {
        if s.is_empty() {
            self.u8(0);
            return;
        }
        let units = s.encode_utf16().count();
        self.u8((units + 1) as u8);
        for unit in s.encode_utf16() {
            self.u16(unit);
        }
        self.u16(0);
    }

    pub fn array_u16(&mut self, elems: &[u16]) {
        self.u32(elems.len() as u32);
        for &e in elems {
            self.u16(e);
        }
    }

    pub fn array_u32(&mut self, elems: &[u32]) {
        self.u32(elems.len() as u32);
        for &e in elems {
            self.u32(e);
        }
    }
}

/// Extracts MTP-typed values from a byte slice.
///
/// Reads past the end of the slice yield zeroes instead of failing; a
/// Command container carrying fewer than five parameters decodes the
/// missing ones as zero.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Reader { buf, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let end = core::cmp::min(self.pos.saturating_add(N), self.buf.len());
        if self.pos < end {
            out[..end - self.pos].copy_from_slice(&self.buf[self.pos..end]);
        }
        self.pos = self.pos.saturating_add(N);
        out
    }

    pub fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }

    pub fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take::<2>())
    }

    pub fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take::<4>())
    }

    pub fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    pub fn string(&mut self) -> String {
        let count = self.u8() as usize;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            units.push(self.u16());
        }
        while units.last() == Some(&0) {
            units.pop();
        }
        String::from_utf16_lossy(&units)
    }
}
