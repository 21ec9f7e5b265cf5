use crate::constants::{delays, its, FMASK, SMASK};
use crate::link::{DteLink, ItsOutput};
use crate::mailbox::{Mailbox, MailboxResult};
use crate::scheduler::Unit;
use crate::status::LinkStatus;

use log::{debug, warn};

// Every ITS cell is armed by the side that has to act on it: the 10 clears the sign bit to hand
// us work and we set the word to all ones when done, the reverse for type-in and output-done.

impl<M: Mailbox> DteLink<M> {
    /// One pass over the ITS cells
    pub(crate) fn its(&mut self) {
        self.its_pending = false;
        if let Err(err) = self.its_poll() {
            warn!("DTE ITS cell access failed: {}", err);
        }
        // Blocked cells are looked at again without waiting for another doorbell
        if self.its_pending {
            self.sched.activate(Unit::Transfer, delays::OUTPUT_FULL);
        }
    }

    fn its_poll(&mut self) -> MailboxResult<()> {
        // Output start: tell the 10 the line can take output
        let word = self.mem.read_word(its::DTEOST)?;
        if word & SMASK == 0 {
            if self.lines.done.push((word & 0o377) as u8).is_ok() {
                self.mem.write_word(its::DTEOST, FMASK)?;
                debug!("CTY ITS DTEOST = {:012o}", word);
            } else {
                self.its_pending = true;
            }
        }

        let word = self.mem.read_word(its::DTEINP)?;
        if word & SMASK == 0 {
            self.mem.write_word(its::DTEINP, FMASK)?;
            debug!("CTY ITS DTEINP = {:012o}", word);
        }

        self.its_output()?;

        let word = self.mem.read_word(its::DTELSP)?;
        if word & SMASK == 0 {
            self.mem.write_word(its::DTELSP, FMASK)?;
            debug!(
                "CTY ITS DTELSP = {:012o} {:012o}",
                word,
                self.mem.read_word(its::DTELPR)?
            );
        }

        self.its_type_in_cell()?;

        let word = self.mem.read_word(its::DTEODN)?;
        if word & SMASK != 0 {
            if let Some(line) = self.lines.done.pop() {
                let word = ((line as u64) << 18) | 1;
                self.mem.write_word(its::DTEODN, word)?;
                debug!("CTY ITS DTEODN = {:012o}", word);
                self.status |= LinkStatus::TEN_DOORBELL;
                self.raise_interrupt();
            }
        }

        let word = self.mem.read_word(its::DTEHNG)?;
        if word & SMASK == 0 {
            debug!("CTY ITS DTEHNG = {:012o}", word);
        }
        Ok(())
    }

    /// Bulk output: `count` bytes for a line, two per transfer word, resumable across passes
    fn its_output(&mut self) -> MailboxResult<()> {
        let mut output = match self.its_output.take() {
            Some(output) => output,
            None => {
                let word = self.mem.read_word(its::DTEOUT)?;
                if word & SMASK != 0 {
                    return Ok(());
                }
                debug!("CTY ITS DTEOUT = {:012o}", word);
                ItsOutput {
                    line: match (word >> 18) & 0o77 {
                        0 => None,
                        line => Some(line as usize - 1),
                    },
                    remaining: (word & 0o17777) as u16,
                    held: None,
                }
            }
        };

        while output.remaining > 0 {
            if self.its_sink_full(output.line) {
                self.its_output = Some(output);
                self.its_pending = true;
                return Ok(());
            }
            let ch = match output.held.take() {
                Some(ch) => ch,
                None => match self.mem.read_byte() {
                    Ok(data) => {
                        if output.remaining > 1 {
                            output.held = Some((data & 0o177) as u8);
                        }
                        ((data >> 8) & 0o177) as u8
                    }
                    Err(err) => {
                        // Give the cell back so the 10 is not left waiting forever
                        self.mem.write_word(its::DTEOUT, FMASK)?;
                        self.status |= LinkStatus::ELEVEN_ERROR;
                        self.raise_interrupt();
                        return Err(err);
                    }
                },
            };
            match output.line {
                None => {
                    let _ = self.console_out.push(ch);
                }
                Some(line) => match self.lines.get_mut(line) {
                    Some(state) => {
                        let _ = state.output.push(ch);
                    }
                    None => warn!("TTY ITS output for line {} out of range", line),
                },
            }
            output.remaining -= 1;
        }

        if output.line.is_none() {
            let _ = self.lines.done.push(0);
        }
        self.mem.write_word(its::DTEOUT, FMASK)?;
        self.status |= LinkStatus::ELEVEN_DONE;
        self.raise_interrupt();
        Ok(())
    }

    fn its_sink_full(&self, line: Option<usize>) -> bool {
        match line {
            None => self.console_out.is_full(),
            Some(line) => self
                .lines
                .get(line)
                .map_or(false, |state| state.output.is_full()),
        }
    }

    /// Hands the next console keyboard byte to ITS once it took the previous one
    pub(crate) fn its_type_in(&mut self) {
        if let Err(err) = self.its_type_in_cell() {
            warn!("DTE ITS type-in failed: {}", err);
        }
    }

    fn its_type_in_cell(&mut self) -> MailboxResult<()> {
        if !self.its_alive() {
            return Ok(());
        }
        let word = self.mem.read_word(its::DTETYI)?;
        if word & SMASK == 0 {
            return Ok(());
        }
        if let Some(ch) = self.console_in.peek() {
            self.mem.write_word(its::DTETYI, ch as u64)?;
            self.console_in.retire();
            debug!("CTY ITS DTETYI = {:012o}", ch);
            self.status |= LinkStatus::TEN_DOORBELL;
            self.raise_interrupt();
        }
        Ok(())
    }
}

#[cfg(test)]
mod its_tests {
    use crate::config::LinkConfig;
    use crate::constants::{cono, delays, its, secondary, FMASK, SMASK};
    use crate::link::testing::link_with;
    use crate::link::DteLink;
    use crate::mailbox::CoreMemory;
    use crate::scheduler::Unit;
    use crate::status::{LinkStatus, ServiceFlags};

    /// Link with ITS running and every cell idle
    fn its_link() -> DteLink<CoreMemory> {
        let mut link = link_with(LinkConfig {
            its_paging: true,
            ..LinkConfig::default()
        });
        link.flags |= ServiceFlags::ITS_ALIVE;
        let mem = link.mailbox_mut();
        for cell in [its::DTEOST, its::DTEINP, its::DTEOUT, its::DTELSP, its::DTEHNG] {
            mem.poke(cell, FMASK);
        }
        mem.poke(its::DTETYI, 0);
        mem.poke(its::DTEODN, 0);
        link
    }

    #[test]
    fn test_zero_command_enters_fast_path() {
        let mut link = its_link();
        link.mailbox_mut().poke(its::DTEINP, 0o3);
        link.write_control(cono::RING_ELEVEN as u64);
        link.sched.cancel(Unit::Transfer);
        link.service_transfer();

        assert_eq!(link.mailbox().peek(its::DTEINP), FMASK);
        assert!(!link.status().contains(LinkStatus::ELEVEN_DOORBELL));
        assert_eq!(link.mailbox().peek(secondary::DTFLG), 0);
    }

    #[test]
    fn test_bulk_output_to_console() {
        let mut link = its_link();
        link.mailbox_mut().poke(its::DTEOUT, 5);
        link.mailbox_mut().queue_to_eleven(&[0x6865, 0x6c6c, 0x6f00]);
        link.its();

        let typed: std::vec::Vec<u8> = core::iter::from_fn(|| link.pop_console_output()).collect();
        assert_eq!(typed, b"hello");
        assert_eq!(link.lines().done.peek(), Some(0));
        assert_eq!(link.mailbox().peek(its::DTEOUT), FMASK);
        assert!(link.status().contains(LinkStatus::ELEVEN_DONE));
    }

    #[test]
    fn test_bulk_output_pauses_on_full_line() {
        let mut link = its_link();
        {
            let line = link.lines_mut().get_mut(2).unwrap();
            while line.output.room() > 1 {
                line.output.push(b'.').ok();
            }
        }
        link.mailbox_mut().poke(its::DTEOUT, (3 << 18) | 4);
        link.mailbox_mut().queue_to_eleven(&[0x4142, 0x4344]);
        link.its();

        assert!(link.its_output.is_some());
        assert!(!link.status().contains(LinkStatus::ELEVEN_DONE));
        assert_eq!(link.mailbox().peek(its::DTEOUT), (3 << 18) | 4);
        link.lines_mut().get_mut(2).unwrap().output.clear();

        link.its();
        let output = &link.lines().get(2).unwrap().output;
        assert_eq!(output.len(), 3);
        assert_eq!(output.peek(), Some(b'B'));
        assert!(link.its_output.is_none());
        assert_eq!(link.mailbox().peek(its::DTEOUT), FMASK);
        assert!(link.lines().done.is_empty());

        link.lines_mut().get_mut(2).unwrap().output.clear();
        link.its();
        assert!(link.lines().get(2).unwrap().output.is_empty());
    }

    #[test]
    fn test_output_start_posts_completion() {
        let mut link = its_link();
        link.mailbox_mut().poke(its::DTEOST, 0o4);
        link.its();
        assert_eq!(link.mailbox().peek(its::DTEOST), FMASK);

        link.mailbox_mut().poke(its::DTEODN, SMASK);
        link.its();
        assert_eq!(link.mailbox().peek(its::DTEODN), (4 << 18) | 1);
        assert!(link.status().contains(LinkStatus::TEN_DOORBELL));
        assert!(link.lines().done.is_empty());
    }

    #[test]
    fn test_output_start_waits_for_room() {
        let mut link = its_link();
        while link.lines_mut().done.push(1).is_ok() {}
        link.mailbox_mut().poke(its::DTEOST, 0o2);
        link.its();
        assert_eq!(link.mailbox().peek(its::DTEOST), 0o2);
        assert!(link.scheduler().is_active(Unit::Transfer));

        link.lines_mut().done.pop();
        link.run(delays::OUTPUT_FULL);
        assert_eq!(link.mailbox().peek(its::DTEOST), FMASK);
        assert!(!link.scheduler().is_active(Unit::Transfer));
    }

    #[test]
    fn test_paused_output_resumes_without_doorbell() {
        let mut link = its_link();
        {
            let line = link.lines_mut().get_mut(2).unwrap();
            while line.output.push(b'.').is_ok() {}
        }
        link.mailbox_mut().poke(its::DTEOUT, (3 << 18) | 4);
        link.mailbox_mut().queue_to_eleven(&[0x4142, 0x4344]);
        link.write_control(cono::RING_ELEVEN as u64);
        link.run(delays::DOORBELL);

        assert!(!link.status().contains(LinkStatus::ELEVEN_DOORBELL));
        assert!(link.its_output.is_some());
        assert_eq!(link.mailbox().peek(its::DTEOUT), (3 << 18) | 4);
        assert!(link.scheduler().is_active(Unit::Transfer));

        link.lines_mut().get_mut(2).unwrap().output.clear();
        link.run(delays::OUTPUT_FULL);
        let output = &link.lines().get(2).unwrap().output;
        assert_eq!(output.len(), 4);
        assert_eq!(output.peek(), Some(b'A'));
        assert!(link.its_output.is_none());
        assert_eq!(link.mailbox().peek(its::DTEOUT), FMASK);
        assert!(link.status().contains(LinkStatus::ELEVEN_DONE));
    }

    #[test]
    fn test_output_read_failure_releases_cell() {
        let mut link = its_link();
        link.write_control((cono::LOAD_PI | 0o14) as u64);
        link.mailbox_mut().poke(its::DTEOUT, 3);
        link.its();

        assert_eq!(link.mailbox().peek(its::DTEOUT), FMASK);
        assert!(link.status().contains(LinkStatus::ELEVEN_ERROR));
        assert!(link.its_output.is_none());
        assert_eq!(link.interrupt_request(), Some(4));
        assert!(link.console_output().is_empty());
    }

    #[test]
    fn test_type_in_from_poll() {
        let mut link = its_link();
        link.type_console(b'g');
        link.service_poll();
        assert_eq!(link.console_input().len(), 1);

        link.mailbox_mut().poke(its::DTETYI, SMASK);
        link.service_poll();
        assert_eq!(link.mailbox().peek(its::DTETYI), b'g' as u64);
        assert!(link.console_input().is_empty());
        assert!(link.status().contains(LinkStatus::TEN_DOORBELL));
    }

    #[test]
    fn test_line_speed_acknowledged() {
        let mut link = its_link();
        link.mailbox_mut().poke(its::DTELSP, 0o1);
        link.mailbox_mut().poke(its::DTELPR, 0o1200);
        link.its();
        assert_eq!(link.mailbox().peek(its::DTELSP), FMASK);
    }
}
