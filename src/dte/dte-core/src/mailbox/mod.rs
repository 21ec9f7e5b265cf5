#[cfg(any(test, feature = "std"))]
mod core_memory;

#[cfg(any(test, feature = "std"))]
pub use core_memory::CoreMemory;

use core::fmt;

/// Errors reported by the 10-side memory behind the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// The address lies outside the 10-side memory
    OutOfRange { addr: u32 },
    /// The 10-side refused the access (non-existent memory, page fail)
    Refused { addr: u32 },
    /// The to-eleven byte transfer ran out of data
    TransferEmpty,
    /// The to-ten byte transfer was stopped by the 10-side
    TransferStopped,
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxError::OutOfRange { addr } => {
                write!(f, "mailbox address out of range: 0o{:o}", addr)
            }
            MailboxError::Refused { addr } => write!(f, "mailbox access refused at 0o{:o}", addr),
            MailboxError::TransferEmpty => write!(f, "to-eleven byte transfer exhausted"),
            MailboxError::TransferStopped => write!(f, "to-ten byte transfer stopped"),
        }
    }
}

pub type MailboxResult<T> = Result<T, MailboxError>;

/// Addressable-word access to the memory shared with the 10-side
///
/// Absolute accesses reach the fixed secondary and ITS cells, relative ones (`examine` and
/// `deposit`) reach the communication area negotiated when the link is primed, and the byte
/// calls move 16-bit DTE bytes through the byte pointers the 10-side has set up.
pub trait Mailbox {
    fn read_word(&self, addr: u32) -> MailboxResult<u64>;
    fn write_word(&mut self, addr: u32, word: u64) -> MailboxResult<()>;

    fn examine(&self, offset: u32) -> MailboxResult<u64>;
    fn deposit(&mut self, offset: u32, word: u64) -> MailboxResult<()>;

    /// Next byte of the to-eleven transfer
    fn read_byte(&mut self) -> MailboxResult<u16>;
    /// Appends a byte to the to-ten transfer
    fn write_byte(&mut self, byte: u16) -> MailboxResult<()>;
}
