use super::HostDevice;
use crate::utils::TtyMode;

use crossbeam_channel::{unbounded, Receiver, TryRecvError};
use dte_core::{DteLink, Mailbox};
use log::{debug, warn};
use std::io::{self, Read, Stdout, Write};

/// Console terminal: keyboard bytes in from a channel, typed output to a writer
pub struct ConsoleBridge<W: Write> {
    rx: Receiver<u8>,
    out: W,
    mode: TtyMode,
    pending: Option<u8>, // Converted byte the link had no room for
    closed: bool,        // Keyboard side hung up
}

// Thread feeding stdin to the console, one byte at a time
fn keyboard_thread(tx: crossbeam_channel::Sender<u8>) {
    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut buf = [0u8; 64];
    loop {
        let count = match stdin.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(count) => count,
        };
        for &ch in &buf[..count] {
            // Line-buffered terminals deliver LF where the 10 expects CR
            let ch = if ch == b'\n' { b'\r' } else { ch };
            if tx.send(ch).is_err() {
                return;
            }
        }
    }
}

impl ConsoleBridge<Stdout> {
    /// Console on the process' own terminal
    pub fn stdio(mode: TtyMode) -> Self {
        let (tx, rx) = unbounded();
        std::thread::spawn(move || keyboard_thread(tx));
        ConsoleBridge::new(rx, io::stdout(), mode)
    }
}

impl<W: Write> ConsoleBridge<W> {
    pub fn new(rx: Receiver<u8>, out: W, mode: TtyMode) -> Self {
        ConsoleBridge {
            rx,
            out,
            mode,
            pending: None,
            closed: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// True once the keyboard source is gone and every byte has been handed over
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_none()
    }

    fn feed<M: Mailbox>(&mut self, link: &mut DteLink<M>) {
        loop {
            let ch = match self.pending.take() {
                Some(ch) => ch,
                None => match self.rx.try_recv() {
                    Ok(raw) => match self.mode.input(raw) {
                        Some(ch) => ch,
                        None => continue,
                    },
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if !self.closed {
                            debug!("CTY keyboard closed");
                        }
                        self.closed = true;
                        break;
                    }
                },
            };
            if !link.type_console(ch) {
                self.pending = Some(ch);
                break;
            }
        }
    }

    fn flush<M: Mailbox>(&mut self, link: &mut DteLink<M>) -> io::Result<()> {
        let mut wrote = false;
        while let Some(ch) = link.pop_console_output() {
            if let Some(ch) = self.mode.output(ch) {
                self.out.write_all(&[ch])?;
                wrote = true;
            }
        }
        if wrote {
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<M: Mailbox, W: Write> HostDevice<M> for ConsoleBridge<W> {
    fn service(&mut self, link: &mut DteLink<M>) -> io::Result<()> {
        self.feed(link);
        if let Err(err) = self.flush(link) {
            warn!("CTY output failed: {}", err);
            return Err(err);
        }
        Ok(())
    }
}
