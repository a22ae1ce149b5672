use mtp_responder::BulkTransport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory bulk pipe pair, driven from the host side of the tests.
///
/// Clones share the queues, so a clone handed to the responder stays
/// observable from the test body.
#[derive(Clone)]
pub struct TestBus {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    /// host -> device, one entry per OUT transfer
    out_packets: VecDeque<Vec<u8>>,
    /// device -> host, one entry per IN transfer
    in_packets: VecDeque<Vec<u8>>,
}

/// `receive` with no pending OUT transfer; a real bus would block forever.
#[derive(Debug, PartialEq)]
pub struct HostIdle;

impl TestBus {
    pub fn new() -> Self {
        TestBus {
            inner: Arc::new(Mutex::new(Inner {
                out_packets: VecDeque::new(),
                in_packets: VecDeque::new(),
            })),
        }
    }

    /// Queue one OUT packet as if the host had written it.
    pub fn push_packet(&self, packet: Vec<u8>) {
        self.inner.lock().unwrap().out_packets.push_back(packet);
    }

    /// Drain every IN packet the device has sent so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().in_packets.drain(..).collect()
    }
}

impl BulkTransport for TestBus {
    type Error = HostIdle;

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, HostIdle> {
        let packet = self
            .inner
            .lock()
            .unwrap()
            .out_packets
            .pop_front()
            .ok_or(HostIdle)?;
        assert!(packet.len() <= buf.len(), "OUT transfer exceeds buffer");
        buf[..packet.len()].copy_from_slice(&packet);
        Ok(packet.len())
    }

    fn send(&mut self, buf: &[u8]) -> Result<(), HostIdle> {
        self.inner.lock().unwrap().in_packets.push_back(buf.to_vec());
        Ok(())
    }
}
