mod console;
mod printer;

pub use console::ConsoleBridge;
pub use printer::PrinterSpool;

use dte_core::{DteLink, Mailbox};
use std::io;

/// A host device that trades characters with a link between clock slices
pub trait HostDevice<M: Mailbox> {
    fn service(&mut self, link: &mut DteLink<M>) -> io::Result<()>;
}
