//! Kernel-side abstractions the pseudo character device drivers are written against.
//!
//! Every facility here is self-contained: char-device regions, the `struct device` model
//! with its sysfs attributes, device-tree nodes and the platform bus are kept in memory,
//! so drivers can be loaded, probed and driven from ordinary host code.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod buf;
pub mod chrdev;
pub mod device;
pub mod error;
pub mod fs;
pub mod gpio;
pub mod logger;
pub mod module;
pub mod of;
pub mod platform;
pub mod print;
pub mod sync;
pub mod sysfs;

pub use error::linux_err as code;
pub use module::{Host, Module, ThisModule};

/// Size of the buffer handed to a sysfs `show` callback.
pub const PAGE_SIZE: usize = 4096;
