use crate::constants::delays;
use crate::link::DteLink;
use crate::mailbox::Mailbox;
use crate::packet::Packet;
use crate::ring::Channel;
use crate::scheduler::Unit;
use dte_protocol::{Device, Function};

use log::{debug, warn};

impl<M: Mailbox> DteLink<M> {
    /// Routes inbound packets to their devices, oldest first, while replies still fit
    pub(crate) fn dispatch(&mut self) {
        while let Some(packet) = self.inbound.front() {
            if self.outbound.is_full() {
                debug!("DTE dispatch held, outbound queue full");
                return;
            }
            let (func, dev, line) = (packet.func(), packet.dev(), packet.line());
            let first = packet.data[0];
            debug!(
                "DTE dispatch {:?} {:?} {}/{}",
                func, dev, packet.cursor, packet.payload_bytes
            );

            let finished = match func {
                Function::InitialMessage => {
                    self.enqueue(Function::InitialReply, Device::Console, &[0]).is_ok()
                }
                Function::StringData if dev == Device::Printer => self.print(),
                Function::StringData if dev == Device::AllLines => match line {
                    None => self.type_out(),
                    Some(line) => self.line_out(line),
                },
                Function::StringData | Function::SendAll if dev == Device::Console => {
                    self.type_out()
                }
                Function::FlushOutput
                | Function::HangUpDataset
                | Function::Xoff
                | Function::Xon
                    if dev == Device::AllLines =>
                {
                    if let Some(line) = line {
                        self.line_control(func, line);
                    }
                    true
                }
                Function::EnableDisableLine if dev == Device::Multiplexer => {
                    self.lines.enabled = first == 0;
                    debug!("TTY multiplexer enabled {}", self.lines.enabled);
                    true
                }
                _ => true,
            };
            if !finished {
                return;
            }
            if let Some(packet) = self.inbound.front_mut() {
                packet.consume();
            }
            self.inbound.retire();
        }
    }

    fn print(&mut self) -> bool {
        if !self.sched.is_active(Unit::Printer) {
            self.sched.activate(Unit::Printer, delays::PRINTER);
        }
        match self.inbound.front_mut() {
            Some(packet) => drain(packet, &mut self.printer),
            None => true,
        }
    }

    fn type_out(&mut self) -> bool {
        match self.inbound.front_mut() {
            Some(packet) => {
                if !packet.is_drained() {
                    self.console_ack = true;
                }
                drain(packet, &mut self.console_out)
            }
            None => true,
        }
    }

    fn line_out(&mut self, line: usize) -> bool {
        let state = match self.lines.get_mut(line) {
            Some(state) => state,
            None => {
                warn!("TTY output for line {} out of range", line);
                return true;
            }
        };
        match self.inbound.front_mut() {
            Some(packet) => drain(packet, &mut state.output),
            None => true,
        }
    }

    fn line_control(&mut self, func: Function, line: usize) {
        if line >= self.lines.count() {
            warn!("TTY {:?} for line {} out of range", func, line);
            return;
        }
        match func {
            Function::HangUpDataset => self.lines.hang_up(line),
            _ => {
                if let Some(state) = self.lines.get_mut(line) {
                    match func {
                        Function::FlushOutput => state.output.clear(),
                        Function::Xoff => state.receive_enabled = false,
                        Function::Xon => state.receive_enabled = true,
                        _ => {}
                    }
                }
            }
        }
        debug!("TTY {:?} line {}", func, line);
    }
}

/// Moves payload characters from the packet cursor into `channel`; true once the packet is drained
fn drain(packet: &mut Packet, channel: &mut Channel) -> bool {
    while !packet.is_drained() {
        if channel.push(packet.char_at(packet.cursor)).is_err() {
            return false;
        }
        packet.cursor += 1;
    }
    true
}

#[cfg(test)]
mod dispatch_tests {
    use crate::link::DteLink;
    use crate::mailbox::CoreMemory;
    use crate::packet::Packet;
    use crate::primary::primary_tests::primed;
    use crate::scheduler::Unit;
    use dte_protocol::bytes::pack_chars;
    use dte_protocol::{Device, Function};

    fn packet(func: Function, dev: Device, text: &[u8]) -> Packet {
        let mut packet = Packet::default();
        packet.function = func.code();
        packet.device = dev.code();
        packet.length = 8 + text.len() as u16;
        for (slot, word) in packet.data.iter_mut().zip(pack_chars(text)) {
            *slot = word;
        }
        packet.payload_bytes = text.len() as u16;
        packet
    }

    fn line_packet(func: Function, line: u8, text: &[u8]) -> Packet {
        let mut packet = packet(func, Device::AllLines, text);
        packet.secondary_device = (line as u16 + 1) << 8;
        packet
    }

    fn drain_console(link: &mut DteLink<CoreMemory>) -> std::vec::Vec<u8> {
        core::iter::from_fn(|| link.pop_console_output()).collect()
    }

    #[test]
    fn test_console_string() {
        let mut link = primed();
        link.inbound
            .push(packet(Function::StringData, Device::Console, b"hi!"))
            .ok();
        link.dispatch();
        assert_eq!(drain_console(&mut link), b"hi!");
        assert!(link.console_ack);
        assert!(link.inbound().is_empty());
    }

    #[test]
    fn test_partial_dispatch_resumes_without_duplicates() {
        let mut link = primed();
        while link.console_out.room() > 2 {
            link.console_out.push(b'.').ok();
        }
        link.inbound
            .push(packet(Function::SendAll, Device::Console, b"hello"))
            .ok();
        link.dispatch();

        assert_eq!(link.inbound().len(), 1);
        assert_eq!(link.inbound().front().unwrap().cursor, 2);
        let first = drain_console(&mut link);
        assert!(first.ends_with(b".he"));

        link.dispatch();
        assert!(link.inbound().is_empty());
        assert_eq!(drain_console(&mut link), b"llo");
    }

    #[test]
    fn test_printer_data_starts_drain_cycle() {
        let mut link = primed();
        link.inbound
            .push(packet(Function::StringData, Device::Printer, b"LPT"))
            .ok();
        link.dispatch();
        assert!(link.scheduler().is_active(Unit::Printer));
        assert_eq!(link.pop_printer(), Some(b'L'));
        assert_eq!(link.printer_queue().len(), 2);
        assert!(!link.console_ack);
    }

    #[test]
    fn test_line_output_and_range_check() {
        let mut link = primed();
        link.inbound
            .push(line_packet(Function::StringData, 1, b"ok"))
            .ok();
        link.inbound
            .push(line_packet(Function::StringData, 40, b"lost"))
            .ok();
        link.inbound
            .push(packet(Function::StringData, Device::AllLines, b"cty"))
            .ok();
        link.dispatch();

        assert!(link.inbound().is_empty());
        let line = link.lines().get(1).unwrap();
        assert_eq!(line.output.len(), 2);
        assert_eq!(line.output.peek(), Some(b'o'));
        assert_eq!(drain_console(&mut link), b"cty");
    }

    #[test]
    fn test_initial_message_answered() {
        let mut link = primed();
        link.inbound
            .push(packet(Function::InitialMessage, Device::Console, b""))
            .ok();
        link.dispatch();
        assert!(link.inbound().is_empty());
        let reply = link.outbound().front().unwrap();
        assert_eq!(reply.func(), Function::InitialReply);
        assert_eq!(reply.dev(), Device::Console);
        assert_eq!(reply.payload(), &[0]);
    }

    #[test]
    fn test_full_outbound_queue_holds_dispatch() {
        let mut link = primed();
        while link.outbound.push(Packet::default()).is_ok() {}
        link.inbound
            .push(packet(Function::StringData, Device::Console, b"x"))
            .ok();
        link.dispatch();
        assert_eq!(link.inbound().len(), 1);
        assert!(link.console_output().is_empty());
    }

    #[test]
    fn test_line_control() {
        let mut link = primed();
        link.lines_mut().get_mut(2).unwrap().output.push(b'z').ok();
        link.lines_mut().connect(3);
        link.inbound.push(line_packet(Function::Xoff, 0, b"")).ok();
        link.inbound
            .push(line_packet(Function::FlushOutput, 2, b""))
            .ok();
        link.inbound
            .push(line_packet(Function::HangUpDataset, 3, b""))
            .ok();
        link.dispatch();

        assert!(!link.lines().get(0).unwrap().receive_enabled);
        assert!(link.lines().get(2).unwrap().output.is_empty());
        assert!(!link.lines().get(3).unwrap().connected);

        link.inbound.push(line_packet(Function::Xon, 0, b"")).ok();
        link.dispatch();
        assert!(link.lines().get(0).unwrap().receive_enabled);
    }

    #[test]
    fn test_multiplexer_enable() {
        let mut link = primed();
        let mut enable = packet(Function::EnableDisableLine, Device::Multiplexer, b"");
        enable.data[0] = 0;
        link.inbound.push(enable).ok();
        link.dispatch();
        assert!(link.lines().enabled);

        let mut disable = enable;
        disable.data[0] = 1;
        link.inbound.push(disable).ok();
        link.dispatch();
        assert!(!link.lines().enabled);
    }

    #[test]
    fn test_unknown_codes_consumed() {
        let mut link = primed();
        link.inbound
            .push(packet(Function::Unknown(0o77), Device::Clock, b"ab"))
            .ok();
        link.inbound
            .push(packet(Function::DateTime, Device::Clock, b"ab"))
            .ok();
        link.dispatch();
        assert!(link.inbound().is_empty());
        assert!(link.outbound().is_empty());
    }
}
