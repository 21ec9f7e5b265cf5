#![no_std]

//! Wire vocabulary shared by the DTE20 front end and anything that talks to it.

pub mod bytes;
pub mod primary;
pub mod secondary;

pub use primary::{Device, Function};
pub use secondary::{ClockCommand, ProgramCommand, SecondaryCommand};
