//! Buffer-access core of the pseudo character devices.
//!
//! A [`DeviceRecord`] owns a fixed-capacity byte buffer with a permission and a serial.
//! Records live in a [`DeviceArena`] and are named by [`DeviceId`]. Opening a record checks
//! the requested access mode once and yields a [`Session`] holding the file position;
//! [`io`] then reads, writes and seeks within the record's capacity.
//!
//! [`PcdevFile`] plugs all of this into the char device layer, and [`platform`] holds what
//! the platform drivers share.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod access;
mod arena;
mod fops;
pub mod io;
pub mod platform;
mod record;
mod session;

pub use access::check_permission;
pub use arena::{DeviceArena, DeviceId};
pub use fops::{PcdevCdev, PcdevFile};
pub use record::{DeviceRecord, Permission, MAX_CAPACITY, RDONLY, RDWR, WRONLY};
pub use session::Session;
