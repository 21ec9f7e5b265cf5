extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use super::{Mailbox, MailboxError, MailboxResult};
use crate::constants::FMASK;

/// Flat in-memory 10-side memory with scripted byte transfers
///
/// Relative accesses are resolved against `comm_base`. Each kind of access can be made to
/// fail so that the recovery paths of the engine can be exercised.
pub struct CoreMemory {
    words: Vec<u64>,              // 36-bit words
    comm_base: u32,               // Start of the communication area
    to_eleven: VecDeque<u16>,     // Bytes the 10-side has queued for us
    to_ten: Vec<u16>,             // Bytes we have sent to the 10-side
    fail_examine: bool,
    fail_deposit: bool,
    fail_transfer: bool,
}

impl CoreMemory {
    pub fn new(size: usize, comm_base: u32) -> Self {
        Self {
            words: std::vec![0; size],
            comm_base,
            to_eleven: VecDeque::new(),
            to_ten: Vec::new(),
            fail_examine: false,
            fail_deposit: false,
            fail_transfer: false,
        }
    }

    pub fn comm_base(&self) -> u32 {
        self.comm_base
    }

    /// Reads a word without going through the fallible interface
    pub fn peek(&self, addr: u32) -> u64 {
        self.words.get(addr as usize).copied().unwrap_or(0)
    }

    pub fn poke(&mut self, addr: u32, word: u64) {
        if let Some(slot) = self.words.get_mut(addr as usize) {
            *slot = word & FMASK;
        }
    }

    pub fn peek_relative(&self, offset: u32) -> u64 {
        self.peek(self.comm_base + offset)
    }

    pub fn poke_relative(&mut self, offset: u32, word: u64) {
        self.poke(self.comm_base + offset, word)
    }

    /// Queues bytes for the next to-eleven transfers
    pub fn queue_to_eleven(&mut self, bytes: &[u16]) {
        self.to_eleven.extend(bytes.iter().copied());
    }

    pub fn pending_to_eleven(&self) -> usize {
        self.to_eleven.len()
    }

    pub fn to_ten(&self) -> &[u16] {
        &self.to_ten
    }

    /// Drains everything sent to the 10-side so far
    pub fn take_to_ten(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.to_ten)
    }

    pub fn set_fail_examine(&mut self, fail: bool) {
        self.fail_examine = fail;
    }

    pub fn set_fail_deposit(&mut self, fail: bool) {
        self.fail_deposit = fail;
    }

    pub fn set_fail_transfer(&mut self, fail: bool) {
        self.fail_transfer = fail;
    }

    fn index(&self, addr: u32) -> MailboxResult<usize> {
        let idx = addr as usize;
        if idx < self.words.len() {
            Ok(idx)
        } else {
            Err(MailboxError::OutOfRange { addr })
        }
    }
}

impl Mailbox for CoreMemory {
    fn read_word(&self, addr: u32) -> MailboxResult<u64> {
        let idx = self.index(addr)?;
        Ok(self.words[idx])
    }

    fn write_word(&mut self, addr: u32, word: u64) -> MailboxResult<()> {
        let idx = self.index(addr)?;
        self.words[idx] = word & FMASK;
        Ok(())
    }

    fn examine(&self, offset: u32) -> MailboxResult<u64> {
        let addr = self.comm_base + offset;
        if self.fail_examine {
            return Err(MailboxError::Refused { addr });
        }
        self.read_word(addr)
    }

    fn deposit(&mut self, offset: u32, word: u64) -> MailboxResult<()> {
        let addr = self.comm_base + offset;
        if self.fail_deposit {
            return Err(MailboxError::Refused { addr });
        }
        self.write_word(addr, word)
    }

    fn read_byte(&mut self) -> MailboxResult<u16> {
        if self.fail_transfer {
            return Err(MailboxError::TransferEmpty);
        }
        self.to_eleven.pop_front().ok_or(MailboxError::TransferEmpty)
    }

    fn write_byte(&mut self, byte: u16) -> MailboxResult<()> {
        if self.fail_transfer {
            return Err(MailboxError::TransferStopped);
        }
        self.to_ten.push(byte);
        Ok(())
    }
}
