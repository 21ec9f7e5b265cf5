#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Protocol engine of an emulated DTE20, the link between a KL10 and its PDP-11 front end.

pub mod config;
pub mod constants;
mod dispatch;
#[cfg(feature = "its")]
mod its;
pub mod lines;
pub mod link;
pub mod mailbox;
pub mod packet;
mod primary;
pub mod ring;
pub mod scheduler;
mod secondary;
pub mod status;
mod tick;
mod transmit;

pub use config::{DesyncPolicy, LinkConfig};
pub use link::{DteLink, ProtocolOffsets};
pub use mailbox::{Mailbox, MailboxError, MailboxResult};
pub use packet::{Direction, Packet, PacketQueue};
pub use ring::{Channel, Ring};
pub use scheduler::Unit;
pub use status::{LinkStatus, ServiceFlags};
pub use transmit::EnqueueError;

#[cfg(any(test, feature = "std"))]
pub use mailbox::CoreMemory;
