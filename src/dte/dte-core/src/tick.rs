use crate::constants::{primary, secondary, FMASK, RMASK};
use crate::link::DteLink;
use crate::mailbox::{Mailbox, MailboxResult};
use crate::scheduler::Unit;
use crate::status::{LinkStatus, ServiceFlags};

#[cfg(feature = "its")]
use crate::constants::its;
#[cfg(feature = "its")]
use log::debug;
use log::warn;

impl<M: Mailbox> DteLink<M> {
    /// Clock unit: secondary clock, ITS heartbeat and primary keepalive
    pub(crate) fn service_clock(&mut self) {
        self.sched.activate(Unit::Clock, self.config.clock_interval);

        if self.flags.contains(ServiceFlags::CLOCK) {
            self.clock_ticks = self.clock_ticks.wrapping_add(1);
            if self.clock_wait != 0 {
                self.clock_wait -= 1;
            } else {
                match self.mem.write_word(self.cell(secondary::DTCLK), FMASK) {
                    Ok(()) => {
                        self.status |= LinkStatus::TEN_DOORBELL;
                        self.raise_interrupt();
                    }
                    Err(err) => warn!("DTE clock flag: {}", err),
                }
            }
        }

        #[cfg(feature = "its")]
        {
            if self.config.its_paging {
                if let Err(err) = self.its_heartbeat() {
                    warn!("DTE ITS heartbeat: {}", err);
                }
                return;
            }
        }

        if !self.status.contains(LinkStatus::SECONDARY) {
            if let Err(err) = self.keepalive() {
                warn!("DTE keepalive: {}", err);
            }
        }
    }

    /// Counts up the heartbeat cell ITS keeps resetting to -1
    #[cfg(feature = "its")]
    fn its_heartbeat(&mut self) -> MailboxResult<()> {
        let mut word = (self.mem.read_word(its::DTECHK)? + 1) & FMASK;
        if word == 0 {
            if !self.flags.contains(ServiceFlags::ITS_ALIVE) {
                debug!("CTY ITS on");
            }
            self.flags.insert(ServiceFlags::ITS_ALIVE);
        } else if word >= its::HEARTBEAT_LIMIT {
            if self.flags.contains(ServiceFlags::ITS_ALIVE) {
                debug!("CTY ITS off");
            }
            self.flags.remove(ServiceFlags::ITS_ALIVE);
            word = its::HEARTBEAT_LIMIT;
        }
        self.mem.write_word(its::DTECHK, word)
    }

    fn keepalive(&mut self) -> MailboxResult<()> {
        let offsets = match self.offsets {
            Some(offsets) => offsets,
            None => return Ok(()),
        };
        let area = self.mem.read_word(self.cell(primary::EPT_COMM_POINTER))?;
        let addr = ((area + (offsets.io_offset + primary::CMTW_KAC) as u64) & RMASK) as u32;
        let word = (self.mem.read_word(addr)? + 1) & FMASK;
        self.mem.write_word(addr, word)
    }
}
