use crate::constants::primary::{STS_INDIRECT, STS_TEN_COUNT, STS_TRANSFER_OUT};
use crate::constants::{datao, delays, INPUT_BATCH, PACKET_WORDS};
use crate::link::{DteLink, ProtocolOffsets};
use crate::mailbox::{Mailbox, MailboxResult};
use crate::packet::Direction;
use crate::scheduler::Unit;
use crate::status::LinkStatus;
use dte_protocol::bytes;
use dte_protocol::primary::{HEADER_BYTES, INDIRECT};
use dte_protocol::{Device, Function};

use core::fmt;
use log::{debug, warn};

/// Reasons a packet could not be queued for the 10-side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    QueueFull,
    PayloadTooLarge { words: usize },
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::QueueFull => write!(f, "outbound packet queue full"),
            EnqueueError::PayloadTooLarge { words } => {
                write!(f, "payload of {} words exceeds {}", words, PACKET_WORDS)
            }
        }
    }
}

impl<M: Mailbox> DteLink<M> {
    /// Queues a packet for the 10-side; nothing changes on failure
    pub fn enqueue(&mut self, func: Function, dev: Device, data: &[u16]) -> Result<(), EnqueueError> {
        if data.len() > PACKET_WORDS {
            return Err(EnqueueError::PayloadTooLarge { words: data.len() });
        }
        let packet = self.outbound.vacant_mut().ok_or(EnqueueError::QueueFull)?;
        let bytes = (data.len() * 2) as u16;
        packet.direction = Direction::ToTen;
        packet.length = HEADER_BYTES + bytes;
        packet.function = func.code();
        packet.device = dev.code();
        packet.spare = 0;
        packet.indirect_length = 0;
        packet.secondary_device = 0;
        packet.payload_bytes = bytes;
        packet.cursor = 0;
        packet.data[..data.len()].copy_from_slice(data);
        debug!("DTE queue {:?} {:?} {} bytes", func, dev, packet.length);
        self.outbound.commit();
        Ok(())
    }

    /// Primary protocol, TO10 direction: sends the head packet within the byte count of the last DATAO
    pub(crate) fn transfer(&mut self) {
        if self.outbound.is_empty() {
            return;
        }
        self.status.remove(LinkStatus::TRANSFER_TO_ELEVEN);
        self.clear_interrupt();

        let budget = ((self.requested ^ datao::BYTE_COUNT) + 1) & datao::BYTE_COUNT;
        let sent = if self.status.contains(LinkStatus::SEND_INDIRECT_NEXT) {
            self.send_indirect(budget as u16)
        } else {
            self.send_direct(budget as u16)
        };
        match sent {
            Ok(()) => {
                self.status |= LinkStatus::TEN_DONE;
                self.raise_interrupt();
            }
            Err(err) => debug!("DTE transfer abandoned: {}", err),
        }
    }

    fn send_direct(&mut self, budget: u16) -> MailboxResult<()> {
        let packet = match self.outbound.front() {
            Some(packet) => packet,
            None => return Ok(()),
        };
        debug!(
            "DTE send {:o} {:o} {:o} budget {}",
            packet.length, packet.function, packet.device, budget
        );

        if packet.length > budget {
            self.mem.write_byte(budget)?;
            self.mem.write_byte(packet.function | INDIRECT)?;
            self.mem.write_byte(packet.device)?;
            self.mem.write_byte(packet.spare)?;
            self.mem.write_byte(packet.payload_bytes)?;
            self.status |= LinkStatus::SEND_INDIRECT_NEXT;
            return Ok(());
        }

        for word in [packet.length, packet.function, packet.device, packet.spare] {
            self.mem.write_byte(word)?;
        }
        for word in packet.payload() {
            self.mem.write_byte(*word)?;
        }
        self.outbound.retire();
        Ok(())
    }

    fn send_indirect(&mut self, budget: u16) -> MailboxResult<()> {
        let packet = match self.outbound.front() {
            Some(packet) => packet,
            None => return Ok(()),
        };
        let count = packet.payload_bytes.min(budget) as usize;
        let words = bytes::words_for(count).min(PACKET_WORDS);
        for word in &packet.data[..words] {
            self.mem.write_byte(*word)?;
        }
        debug!("DTE send indirect {} bytes", count);
        self.status.remove(LinkStatus::SEND_INDIRECT_NEXT);
        self.outbound.retire();
        Ok(())
    }

    /// Announces the head packet to the 10-side unless a transfer is already in flight
    pub(crate) fn start_transfer(&mut self) {
        let length = match self.outbound.front() {
            Some(packet) => packet.length,
            None => return,
        };
        if self.status.intersects(
            LinkStatus::INDIRECT_NEXT | LinkStatus::TEN_DOORBELL | LinkStatus::ELEVEN_DOORBELL,
        ) {
            return;
        }
        let offsets = match self.offsets {
            Some(offsets) => offsets,
            None => return,
        };
        if let Err(err) = self.announce(&offsets, length) {
            warn!("DTE cannot announce packet: {}", err);
            self.fall_back_to_secondary();
            self.status |= LinkStatus::TEN_ERROR;
            self.raise_interrupt();
        }
    }

    fn announce(&mut self, offsets: &ProtocolOffsets, length: u16) -> MailboxResult<()> {
        let word = self.mem.examine(offsets.status_examine())?;
        if word & STS_TRANSFER_OUT != 0 {
            return Ok(());
        }
        // Bump the TO10 message count
        let word = (word & !(STS_TEN_COUNT | STS_INDIRECT)) | ((word + 0o400) & STS_TEN_COUNT);
        self.mem.deposit(offsets.status_deposit(), word)?;
        self.mem.deposit(offsets.count_deposit(), length as u64)?;
        self.status |= LinkStatus::TEN_DOORBELL;
        self.raise_interrupt();
        Ok(())
    }

    /// Acknowledges drained console output and packs keyboard input for the 10-side
    ///
    /// Keyboard bytes travel as line-character pairs, line zero being the console.
    pub(crate) fn queue_console_input(&mut self) {
        if self.console_ack && self.console_out.is_empty() {
            if self
                .enqueue(Function::AcknowledgeLine, Device::Console, &[0])
                .is_err()
            {
                return;
            }
            self.console_ack = false;
        }
        if self.console_in.is_empty() || self.outbound.is_full() {
            return;
        }

        let mut batch = [0u16; INPUT_BATCH];
        let mut count = 0;
        while count < INPUT_BATCH {
            match self.console_in.pop() {
                Some(ch) => batch[count] = ch as u16,
                None => break,
            }
            count += 1;
        }
        if let Err(err) = self.enqueue(Function::LineCharacter, Device::Console, &batch[..count]) {
            warn!("CTY input lost: {}", err);
        }
    }

    /// Printer unit: acknowledges printer output once the host has drained it
    pub(crate) fn service_printer(&mut self) {
        if !self.printer.is_empty() {
            self.sched.activate(Unit::Printer, delays::PRINTER);
            return;
        }
        if self
            .enqueue(Function::AcknowledgeLine, Device::Printer, &[0])
            .is_err()
        {
            self.sched.activate(Unit::Printer, delays::PRINTER);
        }
    }
}
