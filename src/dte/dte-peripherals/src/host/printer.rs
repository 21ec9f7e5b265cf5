use super::HostDevice;

use dte_core::{DteLink, Mailbox};
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Line printer spool: whatever the 10 prints is appended to a writer
pub struct PrinterSpool<W: Write> {
    out: W,
    printed: usize, // Characters spooled so far
}

impl PrinterSpool<BufWriter<File>> {
    /// Spools to `path`, truncating it
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Ok(PrinterSpool::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> PrinterSpool<W> {
    pub fn new(out: W) -> Self {
        PrinterSpool { out, printed: 0 }
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    pub fn writer(&self) -> &W {
        &self.out
    }
}

impl<M: Mailbox, W: Write> HostDevice<M> for PrinterSpool<W> {
    fn service(&mut self, link: &mut DteLink<M>) -> io::Result<()> {
        let before = self.printed;
        while let Some(ch) = link.pop_printer() {
            self.out.write_all(&[ch & 0o177])?;
            self.printed += 1;
        }
        if self.printed != before {
            debug!("LPT spooled {} characters", self.printed - before);
            self.out.flush()?;
        }
        Ok(())
    }
}
