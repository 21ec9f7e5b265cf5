use crate::config::{DesyncPolicy, LinkConfig};
use crate::constants::{cono, datao, delays, primary, IRQ_VECTOR, RMASK};
use crate::lines::Lines;
use crate::mailbox::Mailbox;
use crate::packet::PacketQueue;
use crate::ring::Channel;
use crate::scheduler::{Scheduler, Unit};
use crate::status::{LinkStatus, ServiceFlags};

use log::{debug, warn};

/// Location of the primary protocol communication area, fixed when the link is primed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOffsets {
    pub processor: u32,         // Our processor number
    pub base: u32,              // Base of our communication region
    pub io_offset: u32,         // Our offset within the region
    pub to_ten_deposit: u32,    // Region the 11 deposits into
    pub to_ten_examine: u32,    // Region the 10 examines
    pub to_eleven_examine: u32, // Region the 11 examines
}

impl ProtocolOffsets {
    /// Decodes word 0 of the communication area
    pub fn from_word(word: u64) -> Self {
        let processor = ((word >> 24) & 0o37) as u32;
        let base = processor + 1;
        Self {
            processor,
            base,
            io_offset: base + (word & 0o177777) as u32,
            to_ten_deposit: primary::TO_TEN_DEPOSIT,
            to_ten_examine: primary::TO_TEN_EXAMINE,
            to_eleven_examine: base + 16,
        }
    }

    pub fn status_examine(&self) -> u32 {
        self.to_eleven_examine + primary::CMTW_STS
    }

    pub fn status_deposit(&self) -> u32 {
        self.to_ten_deposit + primary::CMTW_STS
    }

    pub fn count_examine(&self) -> u32 {
        self.to_eleven_examine + primary::CMTW_CNT
    }

    pub fn count_deposit(&self) -> u32 {
        self.to_ten_deposit + primary::CMTW_CNT
    }
}

/// ITS bulk output paused by a full destination
#[cfg(feature = "its")]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ItsOutput {
    pub line: Option<usize>, // Destination line, `None` for the console
    pub remaining: u16,      // Bytes still to move
    pub held: Option<u8>,    // Low byte of a word already read
}

/// One DTE20 link: the front end's half of the 10/11 mailbox protocol
///
/// Every piece of mutable protocol state lives here; the 10-side reaches it through the
/// register interface and the mailbox, and the host reaches it through the character
/// channels. Work is done by the unit services, driven from [`DteLink::run`].
pub struct DteLink<M: Mailbox> {
    pub(crate) mem: M,
    pub(crate) config: LinkConfig,
    pub(crate) sched: Scheduler,

    pub(crate) status: LinkStatus,
    pub(crate) flags: ServiceFlags,
    pub(crate) interrupt: bool, // Interrupt request towards the 10
    pub(crate) requested: u32,  // Byte count and flags from the last DATAO

    pub(crate) offsets: Option<ProtocolOffsets>,
    pub(crate) inbound: PacketQueue,  // 10 to 11 packets
    pub(crate) outbound: PacketQueue, // 11 to 10 packets

    pub(crate) console_in: Channel,
    pub(crate) console_out: Channel,
    pub(crate) console_ack: bool, // Console output must be acknowledged once drained
    pub(crate) printer: Channel,
    pub(crate) lines: Lines,

    pub(crate) switches: u64,
    pub(crate) clock_ticks: u16,
    pub(crate) clock_wait: u16,

    #[cfg(feature = "its")]
    pub(crate) its_output: Option<ItsOutput>,
    #[cfg(feature = "its")]
    pub(crate) its_pending: bool, // An ITS cell is waiting for room
}

impl<M: Mailbox> DteLink<M> {
    pub fn new(mem: M, config: LinkConfig) -> Self {
        let config = config.sanitized();
        let mut link = Self {
            mem,
            config,
            sched: Scheduler::new(),
            status: LinkStatus::SECONDARY,
            flags: ServiceFlags::empty(),
            interrupt: false,
            requested: 0,
            offsets: None,
            inbound: PacketQueue::new(),
            outbound: PacketQueue::new(),
            console_in: Channel::new(),
            console_out: Channel::new(),
            console_ack: false,
            printer: Channel::new(),
            lines: Lines::new(config.tty_lines),
            switches: 0,
            clock_ticks: 0,
            clock_wait: 0,
            #[cfg(feature = "its")]
            its_output: None,
            #[cfg(feature = "its")]
            its_pending: false,
        };
        link.reset();
        link
    }

    /// Power-on / device reset
    ///
    /// Character channels keep their contents; packet queues, the primed offsets and any
    /// partial transfer are discarded.
    pub fn reset(&mut self) {
        self.status = LinkStatus::SECONDARY;
        self.flags = ServiceFlags::empty();
        self.interrupt = false;
        self.requested = 0;
        self.offsets = None;
        self.inbound.clear();
        self.outbound.clear();
        self.console_ack = false;
        self.clock_ticks = 0;
        self.clock_wait = 0;
        #[cfg(feature = "its")]
        {
            self.its_output = None;
            self.its_pending = false;
        }
        self.sched.cancel(Unit::Transfer);
        self.sched.reactivate(Unit::Poll, delays::STARTUP);
        self.sched.reactivate(Unit::Clock, delays::STARTUP);
    }

    // CPU-side register interface

    /// CONI: current status, low half word only
    pub fn read_status(&self) -> u64 {
        let data = self.status.coni();
        debug!("DTE CONI {:06o}", data);
        data
    }

    /// CONO: interrupt setup, done/error clears, reload button and the TO11 doorbell
    pub fn write_control(&mut self, data: u64) {
        let bits = (data & RMASK) as u32;
        self.clear_interrupt();
        if bits & cono::LOAD_PI != 0 {
            self.status.remove(LinkStatus::PI_CHANNEL | LinkStatus::PI_ENABLE);
            self.status |= LinkStatus::from_bits_truncate(bits)
                & (LinkStatus::PI_CHANNEL | LinkStatus::PI_ENABLE);
        }
        if bits & cono::CLEAR_ELEVEN_DONE != 0 {
            self.status.remove(LinkStatus::ELEVEN_DONE | LinkStatus::ELEVEN_ERROR);
        }
        if bits & cono::CLEAR_TEN_DONE != 0 {
            self.status.remove(LinkStatus::TEN_DONE | LinkStatus::TEN_ERROR);
        }
        if bits & cono::CLEAR_TEN_DOORBELL != 0 {
            self.status.remove(LinkStatus::TEN_DOORBELL);
        }
        if bits & cono::CLEAR_RELOAD != 0 {
            self.status.remove(LinkStatus::RELOAD_ELEVEN);
        }
        if bits & cono::SET_RELOAD != 0 {
            self.status |= LinkStatus::RELOAD_ELEVEN;
        }
        if bits & cono::RING_ELEVEN != 0 {
            debug!("DTE ring 11 doorbell");
            self.status |= LinkStatus::ELEVEN_DOORBELL;
            self.sched.activate(Unit::Transfer, delays::DOORBELL);
        }
        self.raise_interrupt();
        debug!("DTE CONO {:06o} status {:08o}", bits, self.status.bits());
    }

    /// DATAI: diagnostic only
    pub fn read_data(&self) -> u64 {
        debug!("DTE DATAI");
        0
    }

    /// DATAO: byte count the 10 will accept, arms a TO10 transfer
    pub fn write_data(&mut self, data: u64) {
        self.requested = (data as u32) & (datao::INTERRUPT_AFTER | datao::BYTE_COUNT);
        self.status |= LinkStatus::TRANSFER_TO_ELEVEN;
        self.sched.activate(Unit::Transfer, delays::DATAO);
        debug!("DTE DATAO {:06o}", self.requested);
    }

    pub fn irq_vector(&self) -> u32 {
        IRQ_VECTOR
    }

    /// PI channel of a pending interrupt request
    pub fn interrupt_request(&self) -> Option<u8> {
        match self.status.pi_channel() {
            0 => None,
            level if self.interrupt => Some(level),
            _ => None,
        }
    }

    /// Raises the interrupt line if enabled and something needs attention
    pub(crate) fn raise_interrupt(&mut self) {
        if self.status.wants_interrupt() {
            self.interrupt = true;
        }
    }

    pub(crate) fn clear_interrupt(&mut self) {
        self.interrupt = false;
    }

    /// Drops back to the secondary protocol, forgetting the primed offsets
    pub(crate) fn fall_back_to_secondary(&mut self) {
        if !self.status.contains(LinkStatus::SECONDARY) {
            warn!("DTE falling back to secondary protocol");
        }
        self.status |= LinkStatus::SECONDARY;
        self.offsets = None;
    }

    pub(crate) fn handle_desync(&mut self) {
        if self.config.desync_policy == DesyncPolicy::FallBackToSecondary {
            self.fall_back_to_secondary();
        }
    }

    pub(crate) fn its_alive(&self) -> bool {
        cfg!(feature = "its") && self.flags.contains(ServiceFlags::ITS_ALIVE)
    }

    /// Absolute address of a fixed secondary cell; the ITS pager does not relocate them
    pub(crate) fn cell(&self, offset: u32) -> u32 {
        if self.config.its_paging {
            offset
        } else {
            self.config.exec_base + offset
        }
    }

    // Unit services

    /// Runs the virtual clock forward, servicing every unit that falls due
    pub fn run(&mut self, ticks: u64) {
        let limit = self.sched.now() + ticks;
        while let Some(due) = self.sched.next_due(limit) {
            for unit in self.sched.expire(due) {
                self.service(unit);
            }
        }
        self.sched.advance_to(limit);
    }

    pub fn service(&mut self, unit: Unit) {
        match unit {
            Unit::Transfer => self.service_transfer(),
            Unit::Poll => self.service_poll(),
            Unit::Clock => self.service_clock(),
            Unit::Printer => self.service_printer(),
        }
    }

    /// Doorbell and TO10 transfer unit
    pub fn service_transfer(&mut self) {
        if self.status.contains(LinkStatus::ELEVEN_DOORBELL) {
            if self.status.contains(LinkStatus::SECONDARY) {
                self.secondary();
            } else {
                self.receive();
            }
            // A DATAO that arrived while the doorbell was pending still needs its turn
            if self.status.contains(LinkStatus::TRANSFER_TO_ELEVEN) && !self.outbound.is_empty() {
                self.sched.activate(Unit::Transfer, delays::DATAO);
            }
            return;
        }
        if self.status.contains(LinkStatus::TRANSFER_TO_ELEVEN) {
            self.transfer();
        }
        #[cfg(feature = "its")]
        {
            if self.its_pending && self.its_alive() {
                self.its();
            }
        }
    }

    /// Poll unit: packet dispatch, console input and queue kick, then monitor-mode input
    pub fn service_poll(&mut self) {
        self.sched.activate(Unit::Poll, self.config.poll_interval);
        if !self.status.contains(LinkStatus::SECONDARY) && !self.its_alive() {
            self.dispatch();
            self.queue_console_input();
            self.start_transfer();
        }
        self.monitor_input();
        #[cfg(feature = "its")]
        {
            if self.config.its_paging && self.its_alive() {
                self.its_type_in();
            }
        }
    }

    // Host side of the character channels

    /// Keyboard byte from the console; false if the channel is full
    pub fn type_console(&mut self, ch: u8) -> bool {
        self.console_in.push(ch & 0o177).is_ok()
    }

    pub fn pop_console_output(&mut self) -> Option<u8> {
        self.console_out.pop()
    }

    pub fn console_output(&self) -> &Channel {
        &self.console_out
    }

    pub fn console_input(&self) -> &Channel {
        &self.console_in
    }

    pub fn pop_printer(&mut self) -> Option<u8> {
        self.printer.pop()
    }

    pub fn printer_queue(&self) -> &Channel {
        &self.printer
    }

    pub fn lines(&self) -> &Lines {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut Lines {
        &mut self.lines
    }

    pub fn set_switches(&mut self, switches: u64) {
        self.switches = switches;
    }

    // Inspection

    pub fn mailbox(&self) -> &M {
        &self.mem
    }

    pub fn mailbox_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn flags(&self) -> ServiceFlags {
        self.flags
    }

    pub fn offsets(&self) -> Option<ProtocolOffsets> {
        self.offsets
    }

    pub fn inbound(&self) -> &PacketQueue {
        &self.inbound
    }

    pub fn outbound(&self) -> &PacketQueue {
        &self.outbound
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.sched
    }

    pub fn clock_ticks(&self) -> u16 {
        self.clock_ticks
    }

    pub fn now(&self) -> u64 {
        self.sched.now()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::mailbox::CoreMemory;

    pub const MEMORY_WORDS: usize = 0o4000;
    pub const COMM_BASE: u32 = 0o2000;

    pub fn link() -> DteLink<CoreMemory> {
        link_with(LinkConfig::default())
    }

    pub fn link_with(config: LinkConfig) -> DteLink<CoreMemory> {
        DteLink::new(CoreMemory::new(MEMORY_WORDS, COMM_BASE), config)
    }
}
