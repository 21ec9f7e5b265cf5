use crate::constants::primary::{STS_INDIRECT, STS_QUEUED, STS_TRANSFER_OUT};
use crate::constants::{delays, PACKET_WORDS};
use crate::link::{DteLink, ProtocolOffsets};
use crate::mailbox::{Mailbox, MailboxResult};
use crate::packet::{Direction, Packet};
use crate::scheduler::Unit;
use crate::status::LinkStatus;
use dte_protocol::bytes;
use dte_protocol::primary::HEADER_BYTES;
use dte_protocol::Device;

use log::{debug, error, warn};

impl<M: Mailbox> DteLink<M> {
    /// Primary protocol, TO11 direction: frames one doorbell's worth of data into the inbound queue
    pub(crate) fn receive(&mut self) {
        if self.inbound.is_full() {
            self.sched.activate(Unit::Transfer, delays::INBOUND_FULL);
            return;
        }
        self.status.remove(LinkStatus::ELEVEN_DOORBELL);
        self.clear_interrupt();

        let offsets = match self.offsets {
            Some(offsets) => offsets,
            None => return self.fall_back_to_secondary(),
        };
        let word = match self.mem.examine(offsets.status_examine()) {
            Ok(word) => word,
            Err(err) => {
                warn!("DTE status examine failed: {}", err);
                return self.fall_back_to_secondary();
            }
        };
        debug!("DTE receive status {:012o}", word);
        if word & STS_QUEUED == 0 {
            return self.fall_back_to_secondary();
        }

        let framed = if word & STS_INDIRECT != 0 {
            if !self.status.contains(LinkStatus::INDIRECT_NEXT) {
                error!("DTE out of sync");
                return self.handle_desync();
            }
            self.receive_indirect(&offsets).map(|_| false)
        } else {
            self.receive_direct()
        };

        let outstanding = match framed {
            Ok(outstanding) => outstanding,
            Err(err) => {
                warn!("DTE receive failed: {}", err);
                return self.fall_back_to_secondary();
            }
        };
        let status = if outstanding {
            word | STS_TRANSFER_OUT
        } else {
            word & !STS_TRANSFER_OUT
        };
        if let Err(err) = self.mem.deposit(offsets.status_deposit(), status) {
            warn!("DTE status deposit failed: {}", err);
            return self.fall_back_to_secondary();
        }
        self.status |= LinkStatus::ELEVEN_DONE;
        self.raise_interrupt();
    }

    /// Continuation of an indirect frame: payload only, into the slot the header left open
    fn receive_indirect(&mut self, offsets: &ProtocolOffsets) -> MailboxResult<()> {
        let count = (self.mem.examine(offsets.count_examine())? & 0o177777) as usize;
        let count = count.min(PACKET_WORDS * 2);
        let packet = match self.inbound.vacant_mut() {
            Some(packet) => packet,
            None => return Ok(()),
        };
        for word in packet.data[..bytes::words_for(count)].iter_mut() {
            *word = self.mem.read_byte()?;
        }
        packet.payload_bytes = count as u16;
        packet.cursor = 0;
        debug!("DTE indirect data {} bytes", count);

        self.status.remove(LinkStatus::INDIRECT_NEXT);
        self.inbound.commit();
        Ok(())
    }

    /// Direct frame: header and payload; true if the header announces an indirect continuation
    fn receive_direct(&mut self) -> MailboxResult<bool> {
        let packet = match self.inbound.vacant_mut() {
            Some(packet) => packet,
            None => return Ok(false),
        };
        let indirect = read_frame(&mut self.mem, packet)?;
        if indirect {
            packet.indirect_length = packet.data[0];
            packet.payload_bytes = 0;
            self.status |= LinkStatus::INDIRECT_NEXT;
        } else {
            self.inbound.commit();
        }
        Ok(indirect)
    }
}

/// Reads a header and its payload words into `packet`
fn read_frame<M: Mailbox>(mem: &mut M, packet: &mut Packet) -> MailboxResult<bool> {
    packet.direction = Direction::ToEleven;
    packet.cursor = 0;
    packet.length = mem.read_byte()?;
    packet.function = mem.read_byte()?;
    packet.device = mem.read_byte()?;
    packet.spare = mem.read_byte()?;

    let count = (packet.length.saturating_sub(HEADER_BYTES) as usize).min(PACKET_WORDS * 2);
    for word in packet.data[..bytes::words_for(count)].iter_mut() {
        *word = mem.read_byte()?;
    }
    packet.payload_bytes = count as u16;
    // Multiplexer traffic leads with the line selector word, which is not payload
    packet.secondary_device = 0;
    if packet.dev() == Device::AllLines && count >= 2 {
        packet.secondary_device = packet.data[0];
        packet.cursor = 2;
    }
    debug!(
        "DTE frame {:o} {:o} {:o} ({} bytes)",
        packet.length, packet.function, packet.device, count
    );
    Ok(packet.is_indirect())
}

#[cfg(test)]
pub(crate) mod primary_tests {
    use crate::config::{DesyncPolicy, LinkConfig};
    use crate::constants::cono;
    use crate::constants::primary::{STS_INDIRECT, STS_QUEUED, STS_TRANSFER_OUT};
    use crate::link::testing::{link_with, COMM_BASE};
    use crate::link::DteLink;
    use crate::mailbox::CoreMemory;
    use crate::scheduler::Unit;
    use crate::status::LinkStatus;
    use dte_protocol::primary::INDIRECT;
    use dte_protocol::{Device, Function};

    pub(crate) const STATUS_EXAMINE: u32 = 22;
    pub(crate) const STATUS_DEPOSIT: u32 = 18;
    pub(crate) const COUNT_EXAMINE: u32 = 23;
    pub(crate) const COUNT_DEPOSIT: u32 = 19;

    /// Link already switched to the primary protocol as processor 3
    pub(crate) fn primed_with(config: LinkConfig) -> DteLink<CoreMemory> {
        let mut link = link_with(config);
        link.mailbox_mut().poke_relative(0, (3 << 24) | 0o10);
        link.prime().unwrap();
        link.mailbox_mut().poke_relative(STATUS_EXAMINE, STS_QUEUED);
        link
    }

    pub(crate) fn primed() -> DteLink<CoreMemory> {
        primed_with(LinkConfig::default())
    }

    fn doorbell(link: &mut DteLink<CoreMemory>) {
        link.write_control(cono::RING_ELEVEN as u64);
        link.sched.cancel(Unit::Transfer);
        link.service_transfer();
    }

    #[test]
    fn test_direct_frame() {
        let mut link = primed();
        link.mailbox_mut().queue_to_eleven(&[
            12,
            Function::StringData.code(),
            Device::Console.code(),
            0,
            0x6869,
            0x2100,
        ]);
        doorbell(&mut link);

        assert_eq!(link.inbound().len(), 1);
        let packet = link.inbound().front().unwrap();
        assert_eq!(packet.func(), Function::StringData);
        assert_eq!(packet.dev(), Device::Console);
        assert_eq!(packet.payload_bytes, 4);
        assert_eq!(packet.payload(), &[0x6869, 0x2100]);
        assert_eq!(packet.line(), None);

        assert!(link.status().contains(LinkStatus::ELEVEN_DONE));
        assert!(!link.status().contains(LinkStatus::ELEVEN_DOORBELL));
        assert_eq!(
            link.mailbox().peek_relative(STATUS_DEPOSIT) & STS_TRANSFER_OUT,
            0
        );
        assert_eq!(link.mailbox().pending_to_eleven(), 0);
    }

    #[test]
    fn test_line_selector_not_delivered_as_text() {
        let mut link = primed();
        link.mailbox_mut().queue_to_eleven(&[
            12,
            Function::StringData.code(),
            Device::AllLines.code(),
            0,
            0o1000,
            0x6869,
        ]);
        doorbell(&mut link);
        assert_eq!(link.inbound().front().unwrap().line(), Some(1));

        link.dispatch();
        assert!(link.inbound().is_empty());
        let output = &mut link.lines_mut().get_mut(1).unwrap().output;
        let text: std::vec::Vec<u8> = core::iter::from_fn(|| output.pop()).collect();
        assert_eq!(text, b"hi");
    }

    #[test]
    fn test_indirect_header_then_continuation() {
        let mut link = primed();
        link.write_control((cono::LOAD_PI | 0o15) as u64);
        link.mailbox_mut().queue_to_eleven(&[
            10,
            INDIRECT | Function::StringData.code(),
            Device::AllLines.code(),
            0,
            0o1005,
        ]);
        doorbell(&mut link);

        assert!(link.inbound().is_empty());
        assert!(link.status().contains(LinkStatus::INDIRECT_NEXT));
        assert!(link.status().contains(LinkStatus::ELEVEN_DONE));
        assert_eq!(link.interrupt_request(), Some(5));
        assert_ne!(
            link.mailbox().peek_relative(STATUS_DEPOSIT) & STS_TRANSFER_OUT,
            0
        );

        link.write_control(cono::CLEAR_ELEVEN_DONE as u64);
        link.mailbox_mut()
            .poke_relative(STATUS_EXAMINE, STS_QUEUED | STS_INDIRECT);
        link.mailbox_mut().poke_relative(COUNT_EXAMINE, 5);
        link.mailbox_mut()
            .queue_to_eleven(&[0x6162, 0x6364, 0x6500]);
        doorbell(&mut link);

        assert!(!link.status().contains(LinkStatus::INDIRECT_NEXT));
        assert_eq!(link.inbound().len(), 1);
        let packet = link.inbound().front().unwrap();
        assert_eq!(packet.indirect_length, 0o1005);
        assert_eq!(packet.line(), Some(1));
        assert_eq!(packet.payload_bytes, 5);
        assert_eq!(packet.cursor, 0);
        assert_eq!(packet.char_at(4), b'e');
        assert_eq!(
            link.mailbox().peek_relative(STATUS_DEPOSIT) & STS_TRANSFER_OUT,
            0
        );
    }

    #[test]
    fn test_unexpected_indirect_abandoned() {
        let mut link = primed();
        link.mailbox_mut()
            .poke_relative(STATUS_EXAMINE, STS_QUEUED | STS_INDIRECT);
        doorbell(&mut link);
        assert!(link.inbound().is_empty());
        assert!(!link.status().contains(LinkStatus::SECONDARY));
        assert!(!link.status().contains(LinkStatus::ELEVEN_DONE));
        assert!(link.offsets().is_some());
    }

    #[test]
    fn test_unexpected_indirect_falls_back_when_configured() {
        let mut link = primed_with(LinkConfig {
            desync_policy: DesyncPolicy::FallBackToSecondary,
            ..LinkConfig::default()
        });
        link.mailbox_mut()
            .poke_relative(STATUS_EXAMINE, STS_QUEUED | STS_INDIRECT);
        doorbell(&mut link);
        assert!(link.status().contains(LinkStatus::SECONDARY));
        assert!(link.offsets().is_none());
    }

    #[test]
    fn test_missing_queued_flag_falls_back() {
        let mut link = primed();
        link.mailbox_mut().poke_relative(STATUS_EXAMINE, 0);
        link.mailbox_mut().queue_to_eleven(&[8, 3, 1, 0]);
        doorbell(&mut link);
        assert!(link.status().contains(LinkStatus::SECONDARY));
        assert!(link.inbound().is_empty());
        assert_eq!(link.mailbox().pending_to_eleven(), 4);
    }

    #[test]
    fn test_examine_failure_falls_back() {
        let mut link = primed();
        link.mailbox_mut().set_fail_examine(true);
        doorbell(&mut link);
        assert!(link.status().contains(LinkStatus::SECONDARY));
        assert!(!link.status().contains(LinkStatus::ELEVEN_DONE));
    }

    #[test]
    fn test_short_transfer_falls_back_without_commit() {
        let mut link = primed();
        link.mailbox_mut().queue_to_eleven(&[12, 3, 1, 0, 0x4142]);
        doorbell(&mut link);
        assert!(link.inbound().is_empty());
        assert!(link.status().contains(LinkStatus::SECONDARY));
    }

    #[test]
    fn test_full_inbound_queue_defers() {
        let mut link = primed();
        while link.inbound.push(Default::default()).is_ok() {}
        link.write_control(cono::RING_ELEVEN as u64);
        link.sched.cancel(Unit::Transfer);
        link.service_transfer();
        assert!(link.status().contains(LinkStatus::ELEVEN_DOORBELL));
        assert_eq!(link.scheduler().remaining(Unit::Transfer), Some(100));

        link.inbound.retire();
        link.mailbox_mut().queue_to_eleven(&[8, 1, 1, 0]);
        link.sched.cancel(Unit::Transfer);
        link.service_transfer();
        assert!(!link.status().contains(LinkStatus::ELEVEN_DOORBELL));
        assert_eq!(link.inbound().len(), 31);
    }

    #[test]
    fn test_comm_base_is_relative() {
        let link = primed();
        assert_eq!(link.mailbox().peek(COMM_BASE + STATUS_EXAMINE), STS_QUEUED);
        assert_eq!(link.offsets().unwrap().status_examine(), STATUS_EXAMINE);
        assert_eq!(link.offsets().unwrap().count_deposit(), COUNT_DEPOSIT);
    }
}
