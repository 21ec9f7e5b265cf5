use crate::constants::{delays, secondary, FMASK};
use crate::link::{DteLink, ProtocolOffsets};
use crate::mailbox::{Mailbox, MailboxError, MailboxResult};
use crate::scheduler::Unit;
use crate::status::{LinkStatus, ServiceFlags};
use dte_protocol::{ClockCommand, ProgramCommand, SecondaryCommand};

use log::{debug, warn};

/// Outcome of one secondary command
enum Step {
    Done,       // Acknowledge the command
    Retry(u64), // Leave the command in place and look again later
}

impl<M: Mailbox> DteLink<M> {
    /// Secondary protocol: one command word per doorbell
    pub(crate) fn secondary(&mut self) {
        let word = match self.mem.read_word(self.cell(secondary::DTCMD)) {
            Ok(word) => word,
            Err(err) => return self.secondary_failed(err),
        };

        #[cfg(feature = "its")]
        {
            if word == 0 && self.config.its_paging && self.its_alive() {
                self.its();
                self.status.remove(LinkStatus::ELEVEN_DOORBELL);
                return;
            }
        }

        debug!("DTE secondary {:012o}", word);
        match self.execute_secondary(SecondaryCommand::from_word(word)) {
            Ok(Step::Done) => {
                if let Err(err) = self.acknowledge_secondary() {
                    self.secondary_failed(err);
                }
            }
            Ok(Step::Retry(delay)) => self.sched.activate(Unit::Transfer, delay),
            Err(err) => self.secondary_failed(err),
        }
    }

    fn execute_secondary(&mut self, cmd: SecondaryCommand) -> MailboxResult<Step> {
        match cmd {
            SecondaryCommand::TypeOut(ch) => {
                if self.console_out.push(ch).is_err() {
                    return Ok(Step::Retry(delays::OUTPUT_FULL));
                }
                self.mem.write_word(self.cell(secondary::DTCHR), ch as u64)?;
                self.mem.write_word(self.cell(secondary::DTMTD), FMASK)?;
                self.mem.write_word(self.cell(secondary::DTF11), 0)?;
            }
            SecondaryCommand::EnterPrimary
            | SecondaryCommand::ProgramControl(ProgramCommand::Esec) => self.prime()?,
            SecondaryCommand::ReadCharacter => {
                let ch = match self.console_in.peek() {
                    Some(ch) => ch,
                    None => return Ok(Step::Retry(delays::INPUT_EMPTY)),
                };
                self.mem.write_word(self.cell(secondary::DTF11), (ch & 0o177) as u64)?;
                self.mem.write_word(self.cell(secondary::DTMTI), FMASK)?;
                self.console_in.retire();
            }
            SecondaryCommand::MonitorInputOff => self.flags.remove(ServiceFlags::MONITOR_INPUT),
            SecondaryCommand::MonitorInputOn => self.flags.insert(ServiceFlags::MONITOR_INPUT),
            SecondaryCommand::ReadSwitches => {
                self.mem.write_word(self.cell(secondary::DTSWR), self.switches)?;
                self.mem.write_word(self.cell(secondary::DTF11), self.switches)?;
            }
            SecondaryCommand::ProgramControl(sub) => debug!("DTE program control {:?}", sub),
            SecondaryCommand::Clock(ClockCommand::Off) => self.flags.remove(ServiceFlags::CLOCK),
            SecondaryCommand::Clock(ClockCommand::Wait) => {
                let wait = self.mem.read_word(self.cell(secondary::DTT11))?;
                self.clock_wait = (wait & 0o177777) as u16;
                self.start_clock();
            }
            SecondaryCommand::Clock(ClockCommand::On) => self.start_clock(),
            SecondaryCommand::Clock(ClockCommand::Read) => {
                self.mem
                    .write_word(self.cell(secondary::DTF11), self.clock_ticks as u64)?;
            }
            SecondaryCommand::Clock(ClockCommand::Unknown(word))
            | SecondaryCommand::Unknown(word) => {
                debug!("DTE ignoring secondary command {:012o}", word)
            }
        }
        Ok(Step::Done)
    }

    fn start_clock(&mut self) {
        self.flags.insert(ServiceFlags::CLOCK);
        self.clock_ticks = 0;
    }

    fn acknowledge_secondary(&mut self) -> MailboxResult<()> {
        self.mem.write_word(self.cell(secondary::DTCMD), 0)?;
        self.mem.write_word(self.cell(secondary::DTFLG), FMASK)?;
        self.status |= LinkStatus::TEN_DOORBELL;
        self.status.remove(LinkStatus::ELEVEN_DOORBELL);
        self.raise_interrupt();
        Ok(())
    }

    fn secondary_failed(&mut self, err: MailboxError) {
        warn!("DTE secondary command dropped: {}", err);
        self.status.remove(LinkStatus::ELEVEN_DOORBELL);
        self.status |= LinkStatus::ELEVEN_ERROR;
        self.raise_interrupt();
    }

    /// Switches to the primary protocol using the communication area the 10 set up
    pub(crate) fn prime(&mut self) -> MailboxResult<()> {
        let word = self.mem.examine(0)?;
        let offsets = ProtocolOffsets::from_word(word);
        debug!(
            "DTE primed: processor {} base {} offset {}",
            offsets.processor, offsets.base, offsets.io_offset
        );
        self.offsets = Some(offsets);
        self.status
            .remove(LinkStatus::SECONDARY | LinkStatus::INDIRECT_NEXT | LinkStatus::SEND_INDIRECT_NEXT);
        self.inbound.clear();
        self.outbound.clear();
        Ok(())
    }

    /// Monitor TTY input: hand the next keyboard byte to the 10 once it took the last one
    pub(crate) fn monitor_input(&mut self) {
        if !self.status.contains(LinkStatus::SECONDARY)
            || self.its_alive()
            || !self.flags.contains(ServiceFlags::MONITOR_INPUT)
        {
            return;
        }
        let ch = match self.console_in.peek() {
            Some(ch) => ch,
            None => return,
        };
        let posted = self
            .mem
            .read_word(self.cell(secondary::DTMTI))
            .and_then(|flag| {
                if flag != 0 {
                    return Ok(false);
                }
                self.mem.write_word(self.cell(secondary::DTF11), ch as u64)?;
                self.mem.write_word(self.cell(secondary::DTMTI), FMASK)?;
                Ok(true)
            });
        match posted {
            Ok(true) => {
                self.console_in.retire();
                self.status |= LinkStatus::TEN_DOORBELL;
                self.raise_interrupt();
            }
            Ok(false) => {}
            Err(err) => warn!("DTE monitor input: {}", err),
        }
    }
}
