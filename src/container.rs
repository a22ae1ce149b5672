//! PTP container framing
//!
//! Every exchange on the bulk pipes is framed as a container: a 12-byte
//! little-endian header followed by a payload of `length - 12` bytes.
//! Command and Response payloads are at most five u32 parameters; Data
//! payloads are operation specific and may span many USB packets.

use crate::codec::{Reader, Writer};
use crate::codes::{OperationCode, ResponseCode};
use alloc::vec::Vec;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Container header size on the wire
pub const HEADER_LEN: usize = 12;

/// Container flavors, as carried in [ContainerHeader::kind]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContainerType {
    Undefined = 0,
    Command = 1,
    Data = 2,
    Response = 3,
    Event = 4,
}

/// The 12-byte container header
///
/// `length` counts the whole container, header included.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContainerHeader {
    pub length: u32,
    pub kind: u16,
    pub code: u16,
    pub transaction_id: u32,
}

impl ContainerHeader {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut raw = [0u8; HEADER_LEN];
        raw[0..4].copy_from_slice(&self.length.to_le_bytes());
        raw[4..6].copy_from_slice(&self.kind.to_le_bytes());
        raw[6..8].copy_from_slice(&self.code.to_le_bytes());
        raw[8..12].copy_from_slice(&self.transaction_id.to_le_bytes());
        raw
    }

    pub fn from_bytes(raw: &[u8; HEADER_LEN]) -> Self {
        let mut r = Reader::new(raw);
        ContainerHeader {
            length: r.u32(),
            kind: r.u16(),
            code: r.u16(),
            transaction_id: r.u32(),
        }
    }
}

/// A response record: code, transaction id and up to five parameters
#[derive(Clone, Debug)]
pub struct Response {
    pub code: ResponseCode,
    pub transaction_id: u32,
    pub params: Vec<u32>,
}

impl Response {
    pub fn new(code: ResponseCode, transaction_id: u32) -> Self {
        Response {
            code,
            transaction_id,
            params: Vec::new(),
        }
    }
}

/// A container with its owned payload and a read cursor
///
/// Typed appends keep `header.length == 12 + payload.len()`. The one
/// exception is a streamed `GetObject` Data container, whose declared
/// length covers file bytes that are pumped through the transport without
/// ever living in the payload buffer.
#[derive(Debug)]
pub struct Container {
    pub header: ContainerHeader,
    pub(crate) payload: Vec<u8>,
    cursor: usize,
}

impl Container {
    /// An inbound container; the transport fills the payload afterwards.
    pub(crate) fn new(header: ContainerHeader) -> Self {
        Container {
            header,
            payload: Vec::new(),
            cursor: 0,
        }
    }

    /// An empty Data container for the operation's reply.
    pub fn make_data(code: OperationCode, transaction_id: u32) -> Self {
        Container::new(ContainerHeader {
            length: HEADER_LEN as u32,
            kind: ContainerType::Data.into(),
            code: code.into(),
            transaction_id,
        })
    }

    /// A Response container with the record's parameters appended.
    pub fn make_response(resp: &Response) -> Self {
        let mut cont = Container::new(ContainerHeader {
            length: HEADER_LEN as u32,
            kind: ContainerType::Response.into(),
            code: resp.code.into(),
            transaction_id: resp.transaction_id,
        });
        for &param in &resp.params {
            cont.put_u32(param);
        }
        cont
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn sync_length(&mut self) {
        self.header.length = (HEADER_LEN + self.payload.len()) as u32;
    }

    pub fn put_u8(&mut self, v: u8) {
        Writer::new(&mut self.payload).u8(v);
        self.sync_length();
    }

    pub fn put_u16(&mut self, v: u16) {
        Writer::new(&mut self.payload).u16(v);
        self.sync_length();
    }

    pub fn put_u32(&mut self, v: u32) {
        Writer::new(&mut self.payload).u32(v);
        self.sync_length();
    }

    pub fn put_u64(&mut self, v: u64) {
        Writer::new(&mut self.payload).u64(v);
        self.sync_length();
    }

    pub fn put_string(&mut self, s: &str) {
        Writer::new(&mut self.payload).string(s);
        self.sync_length();
    }

    pub fn put_u16_array(&mut self, elems: &[u16]) {
        Writer::new(&mut self.payload).array_u16(elems);
        self.sync_length();
    }

    pub fn put_u32_array(&mut self, elems: &[u32]) {
        Writer::new(&mut self.payload).array_u32(elems);
        self.sync_length();
    }

    pub fn take_u32(&mut self) -> u32 {
        let mut r = Reader::at(&self.payload, self.cursor);
        let v = r.u32();
        self.cursor = r.pos();
        v
    }

    /// The five command parameter words; absent ones read as zero.
    pub fn params(&mut self) -> [u32; 5] {
        let mut params = [0u32; 5];
        for p in params.iter_mut() {
            *p = self.take_u32();
        }
        params
    }
}
