// Scripted stand-ins for the 10-side operating system

use dte_core::constants::primary::{EPT_COMM_POINTER, STS_QUEUED};
use dte_core::constants::{cono, secondary};
use dte_core::{CoreMemory, DteLink, LinkStatus};
use dte_protocol::bytes::pack_chars;
use dte_protocol::primary::INDIRECT;
use dte_protocol::secondary::type_out;
use dte_protocol::{Device, Function};

use heapless::spsc::Queue;
use log::{debug, info, warn};

pub const MEMORY_WORDS: usize = 0o10000;
pub const COMM_BASE: u32 = 0o2000;

const BANNER: &[u8] = b"\r\nDTE20 front end ready\r\n";

/// One step of the 10-side program, run between slices of the virtual clock
pub trait TenSide {
    fn step(&mut self, link: &mut DteLink<CoreMemory>);
}

/// Echoes the console through the secondary protocol, like a monitor before it goes primary
pub struct SecondaryTen {
    commands: Queue<u64, 128>,
    busy: bool, // A command is waiting for its completion flag
}

impl SecondaryTen {
    pub fn new() -> Self {
        let mut ten = SecondaryTen {
            commands: Queue::new(),
            busy: false,
        };
        for &ch in BANNER {
            ten.queue(type_out(ch));
        }
        ten.queue(0o4400); // Monitor TTY input on
        ten
    }

    fn queue(&mut self, command: u64) {
        if self.commands.enqueue(command).is_err() {
            warn!("10 secondary command dropped: {:o}", command);
        }
    }
}

impl TenSide for SecondaryTen {
    fn step(&mut self, link: &mut DteLink<CoreMemory>) {
        if link.read_status() & LinkStatus::TEN_DOORBELL.bits() as u64 != 0 {
            link.write_control(cono::CLEAR_TEN_DOORBELL as u64);
        }

        let mem = link.mailbox_mut();
        if mem.peek(secondary::DTMTI) != 0 {
            let ch = (mem.peek(secondary::DTF11) & 0o177) as u8;
            mem.poke(secondary::DTMTI, 0);
            debug!("10 monitor input {:03o}", ch);
            self.queue(type_out(ch));
            if ch == b'\r' {
                self.queue(type_out(b'\n'));
            }
        }
        if self.busy && mem.peek(secondary::DTFLG) != 0 {
            mem.poke(secondary::DTFLG, 0);
            self.busy = false;
        }

        if !self.busy {
            if let Some(command) = self.commands.dequeue() {
                link.mailbox_mut().poke(secondary::DTCMD, command);
                link.write_control(cono::RING_ELEVEN as u64);
                self.busy = true;
            }
        }
    }
}

/// Where the primary 10-side is in its conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Priming,
    Running,
}

/// Brings the link up in the primary protocol and echoes console input as string data
pub struct PrimaryTen {
    phase: Phase,
    frames: Queue<[u16; 32], 16>, // Frames to send, length word first
    sending: bool,                // Waiting for TO11 done
    continuation: Option<u16>,    // Payload bytes of an announced indirect frame
}

impl PrimaryTen {
    pub fn new(link: &mut DteLink<CoreMemory>) -> Self {
        let mem = link.mailbox_mut();
        mem.poke_relative(0, (3 << 24) | 0o10); // Processor 3
        mem.poke(EPT_COMM_POINTER, COMM_BASE as u64 + 0o100);
        mem.poke(secondary::DTCMD, 0o5000); // Enter primary protocol
        link.write_control(cono::RING_ELEVEN as u64);

        PrimaryTen {
            phase: Phase::Priming,
            frames: Queue::new(),
            sending: false,
            continuation: None,
        }
    }

    fn frame(&mut self, func: Function, dev: Device, text: &[u8]) {
        let mut frame = [0u16; 32];
        let text = &text[..text.len().min(2 * (frame.len() - 4))];
        frame[0] = 8 + text.len() as u16;
        frame[1] = func.code();
        frame[2] = dev.code();
        for (slot, word) in frame[4..].iter_mut().zip(pack_chars(text)) {
            *slot = word;
        }
        if self.frames.enqueue(frame).is_err() {
            warn!("10 frame dropped: {:?}", func);
        }
    }

    /// Handles one frame the front end sent us
    fn received(&mut self, words: &[u16]) {
        let (function, device) = (words[1], words[2]);
        if function & INDIRECT != 0 {
            self.continuation = words.get(4).copied();
            return;
        }
        let data = &words[4.min(words.len())..];
        match (Function::from_code(function), Device::from_code(device)) {
            (Function::InitialReply, _) => {
                info!("10 primary protocol up");
                self.frame(Function::StringData, Device::Console, BANNER);
            }
            (Function::LineCharacter, Device::Console) => {
                let mut echo = heapless::Vec::<u8, 64>::new();
                for word in data {
                    let ch = (*word & 0o177) as u8;
                    let _ = echo.push(ch);
                    if ch == b'\r' {
                        let _ = echo.push(b'\n');
                    }
                }
                self.frame(Function::StringData, Device::Console, &echo);
            }
            (func, dev) => debug!("10 received {:?} {:?}", func, dev),
        }
    }
}

impl TenSide for PrimaryTen {
    fn step(&mut self, link: &mut DteLink<CoreMemory>) {
        if self.phase == Phase::Priming {
            if link.offsets().is_none() {
                return;
            }
            self.phase = Phase::Running;
            if let Some(offsets) = link.offsets() {
                link.mailbox_mut()
                    .poke_relative(offsets.status_examine(), STS_QUEUED);
            }
            self.frame(Function::InitialMessage, Device::Console, &[]);
            // Completion of the enter-primary command
            link.write_control(cono::CLEAR_TEN_DOORBELL as u64);
            return;
        }

        let status = link.status();
        let offsets = match link.offsets() {
            Some(offsets) => offsets,
            None => return,
        };

        // TO10: the front end announced a packet or finished sending one
        if status.contains(LinkStatus::TEN_DOORBELL) {
            link.write_control(cono::CLEAR_TEN_DOORBELL as u64);
            let length = link.mailbox().peek_relative(offsets.count_deposit()) & 0o7777;
            if length != 0 {
                link.write_data(length.wrapping_neg() & 0o7777);
            }
        }
        if status.contains(LinkStatus::TEN_DONE) {
            link.write_control(cono::CLEAR_TEN_DONE as u64);
            let words = link.mailbox_mut().take_to_ten();
            match self.continuation.take() {
                Some(bytes) => debug!("10 indirect data {} bytes", bytes),
                None if words.len() >= 4 => {
                    self.received(&words);
                    if let Some(bytes) = self.continuation {
                        link.write_data((bytes as u64).wrapping_neg() & 0o7777);
                    }
                }
                None => {}
            }
        }

        // TO11: one frame per doorbell
        if status.contains(LinkStatus::ELEVEN_DONE) {
            link.write_control(cono::CLEAR_ELEVEN_DONE as u64);
            self.sending = false;
        }
        if !self.sending && !status.contains(LinkStatus::ELEVEN_DOORBELL) {
            if let Some(frame) = self.frames.dequeue() {
                let words = 4 + (frame[0] as usize - 8 + 1) / 2;
                link.mailbox_mut().queue_to_eleven(&frame[..words]);
                link.write_control(cono::RING_ELEVEN as u64);
                self.sending = true;
            }
        }

        if link.status().contains(LinkStatus::SECONDARY) {
            warn!("10 sees the front end back in secondary protocol");
            self.phase = Phase::Priming;
            link.mailbox_mut().poke(secondary::DTCMD, 0o5000);
            link.write_control(cono::RING_ELEVEN as u64);
        }
    }
}

/// Cleared 10-side memory with the communication area at `COMM_BASE`
pub fn memory() -> CoreMemory {
    CoreMemory::new(MEMORY_WORDS, COMM_BASE)
}

#[cfg(test)]
mod ten_tests {
    use super::*;
    use dte_core::LinkConfig;

    fn run(link: &mut DteLink<CoreMemory>, ten: &mut dyn TenSide, ticks: u64) {
        for _ in 0..ticks / 50 {
            link.run(50);
            ten.step(link);
        }
    }

    fn typed(link: &mut DteLink<CoreMemory>) -> Vec<u8> {
        core::iter::from_fn(|| link.pop_console_output()).collect()
    }

    #[test]
    fn test_secondary_banner_and_echo() {
        let mut link = DteLink::new(memory(), LinkConfig::default());
        let mut ten = SecondaryTen::new();
        run(&mut link, &mut ten, 200_000);
        assert_eq!(typed(&mut link), BANNER);

        link.type_console(b'x');
        run(&mut link, &mut ten, 20_000);
        assert_eq!(typed(&mut link), b"x");
    }

    #[test]
    fn test_primary_banner_and_echo() {
        let mut link = DteLink::new(memory(), LinkConfig::default());
        let mut ten = PrimaryTen::new(&mut link);
        run(&mut link, &mut ten, 100_000);
        assert!(!link.status().contains(LinkStatus::SECONDARY));
        assert_eq!(typed(&mut link), BANNER);

        link.type_console(b'o');
        link.type_console(b'k');
        run(&mut link, &mut ten, 100_000);
        assert_eq!(typed(&mut link), b"ok");
    }
}
