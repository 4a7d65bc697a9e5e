//! Console output: `printk` and the `pr_*` family.
//!
//! Lines are formatted into a fixed-size buffer and handed to the console installed with
//! [`init_console`]. Until a console is installed, output is dropped.

use core::{cmp, fmt};

use spin::Once;

pub const KERN_EMERG: &[u8] = b"<0>";
pub const KERN_ALERT: &[u8] = b"<1>";
pub const KERN_CRIT: &[u8] = b"<2>";
pub const KERN_ERR: &[u8] = b"<3>";
pub const KERN_WARNING: &[u8] = b"<4>";
pub const KERN_NOTICE: &[u8] = b"<5>";
pub const KERN_INFO: &[u8] = b"<6>";
pub const KERN_DEBUG: &[u8] = b"<7>";
pub const KERN_CONT: &[u8] = b"<c>";

/// Sink for finished log lines. Each line starts with its `KERN_*` prefix.
pub trait Console: Send + Sync {
    fn put_line(&self, line: &[u8]);
}

static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Installs the console. Only the first call has an effect.
pub fn init_console(console: &'static dyn Console) {
    CONSOLE.call_once(|| console);
}

#[doc(hidden)]
pub fn printk(klevel: &[u8], args: fmt::Arguments<'_>) {
    let Some(console) = CONSOLE.get() else {
        return;
    };
    let mut writer = LogLineWriter::new();
    writer.push_bytes(klevel);
    let _ = fmt::write(&mut writer, args);
    console.put_line(writer.as_bytes());
}

// From kernel/printk/printk.c
const LOG_LINE_MAX: usize = 1024 - 32;

#[doc(hidden)]
pub struct LogLineWriter {
    data: [u8; LOG_LINE_MAX],
    pos: usize,
}

#[allow(clippy::new_without_default)]
impl LogLineWriter {
    pub fn new() -> LogLineWriter {
        LogLineWriter {
            data: [0u8; LOG_LINE_MAX],
            pos: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        let copy_len = cmp::min(LOG_LINE_MAX - self.pos, bytes.len());
        self.data[self.pos..self.pos + copy_len].copy_from_slice(&bytes[..copy_len]);
        self.pos += copy_len;
    }
}

impl fmt::Write for LogLineWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // Never split a character when the line overflows.
        let mut copy_len = cmp::min(LOG_LINE_MAX - self.pos, s.len());
        while !s.is_char_boundary(copy_len) {
            copy_len -= 1;
        }
        self.push_bytes(&s.as_bytes()[..copy_len]);
        Ok(())
    }
}

/// [`println!`] functions the same as it does in `std`, except instead of
/// printing to `stdout`, it writes to the kernel console at the `KERN_INFO`
/// level.
///
/// [`println!`]: https://doc.rust-lang.org/stable/std/macro.println.html
#[macro_export]
macro_rules! println {
    () => ({
        $crate::print::printk($crate::print::KERN_INFO, format_args!(""));
    });
    ($($arg:tt)*) => ({
        $crate::print::printk($crate::print::KERN_INFO, format_args!($($arg)*));
    });
}

#[macro_export]
macro_rules! pr_emerg {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_EMERG, format_args!($($arg)*)));
}

#[macro_export]
macro_rules! pr_err {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_ERR, format_args!($($arg)*)));
}

#[macro_export]
macro_rules! pr_warn {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_WARNING, format_args!($($arg)*)));
}

#[macro_export]
macro_rules! pr_notice {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_NOTICE, format_args!($($arg)*)));
}

#[macro_export]
macro_rules! pr_info {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_INFO, format_args!($($arg)*)));
}

/// Debug output is compiled in only for debug builds, like `pr_debug` without
/// `DEBUG` defined.
#[macro_export]
macro_rules! pr_debug {
    ($($arg:tt)*) => (
        if cfg!(debug_assertions) {
            $crate::print::printk($crate::print::KERN_DEBUG, format_args!($($arg)*))
        }
    );
}

#[macro_export]
macro_rules! pr_cont {
    ($($arg:tt)*) => ($crate::print::printk($crate::print::KERN_CONT, format_args!($($arg)*)));
}
