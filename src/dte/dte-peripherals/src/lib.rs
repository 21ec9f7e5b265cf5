//! Host-side collaborators of a DTE link: terminal conversion, console and printer.

#[cfg(feature = "host-peripherals")]
pub mod host;
pub mod utils;
