//! Byte-stream adapter over the bulk pipe pair
//!
//! Presents container-sized reads and writes on top of packet-sized
//! transfers. The OUT side keeps one packet of read-ahead in a scratch
//! buffer; the IN side stages and sends one packet per call. Data phases
//! longer than a packet are pumped by the operation handler through
//! [BulkPipe::write] after the leading packet goes out.

use crate::buffer::{Scratch, BUF_SIZE};
use crate::container::{Container, ContainerHeader, HEADER_LEN};
use crate::fmt::trace;
use crate::transport::BulkTransport;
use alloc::boxed::Box;
use alloc::vec;
use core::cmp::min;

pub(crate) struct BulkPipe<T: BulkTransport> {
    transport: T,
    read_buf: Box<Scratch>,
    write_buf: Box<Scratch>,
}

impl<T: BulkTransport> BulkPipe<T> {
    pub fn new(transport: T) -> Self {
        BulkPipe {
            transport,
            read_buf: Box::new(Scratch::new()),
            write_buf: Box::new(Scratch::new()),
        }
    }

    /// Deliver up to `dst.len()` bytes, pulling one fresh packet when the
    /// read-ahead is exhausted. A single call never spans two packets;
    /// container framing keeps Commands inside one packet, so the split
    /// between header and payload reads is the only boundary crossed.
    pub fn read(&mut self, dst: &mut [u8]) -> Result<(), T::Error> {
        if dst.is_empty() {
            return Ok(());
        }
        if self.read_buf.is_drained() {
            let transport = &mut self.transport;
            self.read_buf.fill(|buf| transport.receive(buf))?;
        }
        let count = self.read_buf.drain(dst);
        trace!("mtp: bulk: read {} of {}", count, dst.len());
        Ok(())
    }

    /// Send `src` as one packet.
    pub fn write(&mut self, src: &[u8]) -> Result<(), T::Error> {
        if src.is_empty() {
            return Ok(());
        }
        trace!("mtp: bulk: write {}", src.len());
        let staged = self.write_buf.stage(src);
        self.transport.send(staged)
    }

    /// Read one container: header, then the declared payload.
    ///
    /// An inbound payload cannot outgrow the packet it arrived in (no
    /// supported operation has a host-to-device Data phase), so the
    /// declared length is clamped to one packet's worth.
    pub fn read_container(&mut self) -> Result<Container, T::Error> {
        let mut raw = [0u8; HEADER_LEN];
        self.read(&mut raw)?;
        let mut header = ContainerHeader::from_bytes(&raw);

        let declared = (header.length as usize).saturating_sub(HEADER_LEN);
        let len = min(declared, BUF_SIZE - HEADER_LEN);
        header.length = (HEADER_LEN + len) as u32;

        let mut cont = Container::new(header);
        cont.payload = vec![0u8; len];
        self.read(&mut cont.payload)?;
        Ok(cont)
    }

    /// Send a container's leading packet: header plus as much payload as
    /// fits. A streamed Data container declares more than it holds; the
    /// handler pumps the rest through [BulkPipe::write].
    pub fn write_container(&mut self, cont: &Container) -> Result<(), T::Error> {
        trace!(
            "mtp: bulk: container out, len {} code {}",
            cont.header.length,
            cont.header.code
        );
        let total = min(cont.header.length as usize, BUF_SIZE);
        let body = min(total.saturating_sub(HEADER_LEN), cont.payload().len());

        let mut packet = [0u8; BUF_SIZE];
        packet[..HEADER_LEN].copy_from_slice(&cont.header.to_bytes());
        packet[HEADER_LEN..HEADER_LEN + body].copy_from_slice(&cont.payload()[..body]);
        self.write(&packet[..HEADER_LEN + body])
    }
}
