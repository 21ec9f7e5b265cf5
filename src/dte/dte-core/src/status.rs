use crate::constants::RMASK;
use bitflags::bitflags;

bitflags! {
    /// DTE status as seen through CONI, plus engine-internal flags above bit 17
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkStatus: u32 {
        const RESTRICTED = 0o100000;          // Restricted mode
        const DEAD_ELEVEN = 0o040000;         // Dead 11
        const ELEVEN_DOORBELL = 0o020000;     // TO11 doorbell request
        const TEN_DOORBELL = 0o001000;        // TO10 doorbell request
        const ELEVEN_ERROR = 0o000400;        // Error during TO11 transfer
        const ELEVEN_DONE = 0o000100;         // TO11 transfer done
        const TEN_DONE = 0o000040;            // TO10 transfer done
        const TEN_ERROR = 0o000020;           // Error during TO10 transfer
        const PI_ENABLE = 0o000010;           // Interrupts enabled
        const PI_CHANNEL = 0o000007;          // PI channel assignment

        const RELOAD_ELEVEN = 0o01000000;     // Reload 11 button
        const TRANSFER_TO_ELEVEN = 0o02000000; // 10 asked for a TO10 transfer
        const SECONDARY = 0o04000000;         // Running the secondary protocol
        const INDIRECT_NEXT = 0o10000000;     // Next TO11 transfer is indirect
        const SEND_INDIRECT_NEXT = 0o20000000; // Next TO10 transfer is indirect
    }
}

bitflags! {
    /// Service-level modes that are not part of the DTE status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ServiceFlags: u8 {
        const MONITOR_INPUT = 0o1; // Monitor TTY input mode (secondary)
        const CLOCK = 0o2;         // Secondary clock armed
        const ITS_ALIVE = 0o4;     // ITS heartbeat seen
    }
}

impl LinkStatus {
    /// Bits that make the DTE request an interrupt
    pub const ATTENTION: LinkStatus = LinkStatus::TEN_DOORBELL
        .union(LinkStatus::ELEVEN_DONE)
        .union(LinkStatus::TEN_DONE)
        .union(LinkStatus::ELEVEN_ERROR)
        .union(LinkStatus::TEN_ERROR);

    /// Low-order half word returned by CONI
    pub fn coni(self) -> u64 {
        self.bits() as u64 & RMASK
    }

    pub fn pi_channel(self) -> u8 {
        (self.bits() & LinkStatus::PI_CHANNEL.bits()) as u8
    }

    pub fn wants_interrupt(self) -> bool {
        self.contains(LinkStatus::PI_ENABLE) && self.intersects(LinkStatus::ATTENTION)
    }
}
