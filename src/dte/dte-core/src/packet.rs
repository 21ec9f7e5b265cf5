use crate::constants::{PACKET_QUEUE_SIZE, PACKET_WORDS};
use crate::ring::Ring;
use dte_protocol::bytes;
use dte_protocol::primary::INDIRECT;
use dte_protocol::{Device, Function};

/// Which way a queued packet travels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToEleven, // Framed off the mailbox, waiting for dispatch
    ToTen,    // Queued by a device handler, waiting for transmit
}

/// One unit of primary protocol traffic
#[derive(Clone, Copy)]
pub struct Packet {
    pub direction: Direction,
    pub length: u16,              // Declared frame length in bytes, header included
    pub function: u16,            // Function code, indirect flag included
    pub device: u16,              // Device code
    pub spare: u16,               // Spare header word
    pub indirect_length: u16,     // Payload bytes announced for an indirect transfer
    pub secondary_device: u16,    // Line number in the high byte for multiplexer traffic
    pub payload_bytes: u16,       // Valid payload bytes in `data`
    pub data: [u16; PACKET_WORDS], // Payload, two bytes per word, high byte first
    pub cursor: u16,              // Next payload byte to dispatch
}

/// Fixed 32-slot queue of packets
pub type PacketQueue = Ring<Packet, PACKET_QUEUE_SIZE>;

impl Default for Packet {
    fn default() -> Self {
        Self {
            direction: Direction::ToEleven,
            length: 0,
            function: 0,
            device: 0,
            spare: 0,
            indirect_length: 0,
            secondary_device: 0,
            payload_bytes: 0,
            data: [0; PACKET_WORDS],
            cursor: 0,
        }
    }
}

impl Packet {
    pub fn func(&self) -> Function {
        Function::from_code(self.function)
    }

    pub fn dev(&self) -> Device {
        Device::from_code(self.device)
    }

    pub fn is_indirect(&self) -> bool {
        self.function & INDIRECT != 0
    }

    /// Payload words holding the valid payload bytes
    pub fn payload(&self) -> &[u16] {
        let words = bytes::words_for(self.payload_bytes as usize).min(PACKET_WORDS);
        &self.data[..words]
    }

    /// Character at payload byte `index`, masked to 7 bits
    pub fn char_at(&self, index: u16) -> u8 {
        bytes::char_at(&self.data, index as usize)
    }

    /// Whether every payload byte has been dispatched
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.payload_bytes
    }

    /// Terminal line addressed by the secondary device field; `None` selects the console
    pub fn line(&self) -> Option<usize> {
        match (self.secondary_device >> 8) & 0o377 {
            0 => None,
            line => Some(line as usize - 1),
        }
    }

    /// Resets the slot once the packet has been consumed
    pub fn consume(&mut self) {
        self.length = 0;
        self.payload_bytes = 0;
        self.cursor = 0;
    }
}
