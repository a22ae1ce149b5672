use mtp_responder::{MtpResponder, VolumeProvider};

pub mod bus;
pub mod volume;

use self::bus::TestBus;

pub const HEADER_LEN: usize = 12;
pub const PACKET_SIZE: usize = 512;

pub const TYPE_DATA: u16 = 2;
pub const TYPE_RESPONSE: u16 = 3;

pub const OK: u16 = 0x2001;

/// Encode a Command container the way an initiator would.
pub fn command(code: u16, transaction_id: u32, params: &[u32]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&((HEADER_LEN + 4 * params.len()) as u32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&code.to_le_bytes());
    bytes.extend_from_slice(&transaction_id.to_le_bytes());
    for &param in params {
        bytes.extend_from_slice(&param.to_le_bytes());
    }
    bytes
}

/// A container as seen in one device-to-host packet. `length` is the
/// declared total; `payload` holds only the bytes this packet carried.
#[derive(Debug, PartialEq)]
pub struct WireContainer {
    pub length: u32,
    pub kind: u16,
    pub code: u16,
    pub transaction_id: u32,
    pub payload: Vec<u8>,
}

pub fn parse_packet(packet: &[u8]) -> WireContainer {
    assert!(packet.len() >= HEADER_LEN, "runt container packet");
    WireContainer {
        length: u32::from_le_bytes(packet[0..4].try_into().unwrap()),
        kind: u16::from_le_bytes(packet[4..6].try_into().unwrap()),
        code: u16::from_le_bytes(packet[6..8].try_into().unwrap()),
        transaction_id: u32::from_le_bytes(packet[8..12].try_into().unwrap()),
        payload: packet[HEADER_LEN..].to_vec(),
    }
}

pub fn read_u16(payload: &[u8], at: usize) -> u16 {
    u16::from_le_bytes(payload[at..at + 2].try_into().unwrap())
}

pub fn read_u32(payload: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(payload[at..at + 4].try_into().unwrap())
}

pub fn read_u64(payload: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(payload[at..at + 8].try_into().unwrap())
}

/// Decode a wire string, returning it with the offset just past it.
pub fn read_string(payload: &[u8], at: usize) -> (String, usize) {
    let count = payload[at] as usize;
    let mut units = Vec::with_capacity(count);
    for i in 0..count {
        units.push(read_u16(payload, at + 1 + 2 * i));
    }
    while units.last() == Some(&0) {
        units.pop();
    }
    (String::from_utf16(&units).unwrap(), at + 1 + 2 * count)
}

/// Feed one command through the responder and collect everything it sent.
pub fn exchange<V: VolumeProvider>(
    bus: &TestBus,
    responder: &mut MtpResponder<TestBus, V>,
    cmd: Vec<u8>,
) -> Vec<Vec<u8>> {
    bus.push_packet(cmd);
    responder.poll().expect("transaction failed");
    bus.take_sent()
}

/// As [exchange], but keep only the trailing Response container.
pub fn response_of<V: VolumeProvider>(
    bus: &TestBus,
    responder: &mut MtpResponder<TestBus, V>,
    cmd: Vec<u8>,
) -> WireContainer {
    let packets = exchange(bus, responder, cmd);
    let last = packets.last().expect("no response sent");
    let resp = parse_packet(last);
    assert_eq!(TYPE_RESPONSE, resp.kind);
    resp
}
