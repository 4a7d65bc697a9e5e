use alloc::collections::TryReserveError;
use core::{
    ffi::c_int,
    fmt,
    fmt::Debug,
    num::{ParseIntError, TryFromIntError},
    str::Utf8Error,
};

use log::warn;

/// Mirrors `MAX_ERRNO` from `include/linux/err.h`.
pub const MAX_ERRNO: u32 = 4095;

pub type KernelResult<T = (), E = Error> = Result<T, E>;

/// A negative errno value.
///
/// # Invariants
///
/// The inner value is within `-MAX_ERRNO..0`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Error(c_int);

impl Error {
    pub fn from_errno(errno: c_int) -> Error {
        if errno < -(MAX_ERRNO as i32) || errno >= 0 {
            warn!(
                "attempted to create `Error` with out of range `errno`: {}",
                errno
            );
            return linux_err::EINVAL;
        }
        // INVARIANT: The check above ensures the type invariant
        // will hold.
        Error(errno)
    }

    pub fn to_errno(&self) -> c_int {
        self.0
    }

    /// Returns a string representing the error, if one exists.
    pub fn name(&self) -> Option<&'static str> {
        linux_err::name(self.0)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            // Print out number if no name can be found.
            None => f.debug_tuple("Error").field(&-self.0).finish(),
            Some(name) => f.debug_tuple(name).finish(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            None => write!(f, "errno {}", -self.0),
            Some(name) => f.write_str(name),
        }
    }
}

/// Contains the C-compatible error codes.
#[rustfmt::skip]
pub mod linux_err {
    use core::ffi::c_int;

    macro_rules! declare_err {
        ($($err:ident = $num:literal, $doc:expr;)+) => {
            $(
                #[doc = $doc]
                pub const $err: super::Error = super::Error(-$num);
            )+

            pub(super) fn name(errno: c_int) -> Option<&'static str> {
                match -errno {
                    $($num => Some(stringify!($err)),)+
                    _ => None,
                }
            }
        };
    }

    declare_err! {
        EPERM = 1, "Operation not permitted.";
        ENOENT = 2, "No such file or directory.";
        EINTR = 4, "Interrupted system call.";
        EIO = 5, "I/O error.";
        ENXIO = 6, "No such device or address.";
        EBADF = 9, "Bad file number.";
        EAGAIN = 11, "Try again.";
        ENOMEM = 12, "Out of memory.";
        EACCES = 13, "Permission denied.";
        EFAULT = 14, "Bad address.";
        EBUSY = 16, "Device or resource busy.";
        EEXIST = 17, "File exists.";
        ENODEV = 19, "No such device.";
        EINVAL = 22, "Invalid argument.";
        ENOTTY = 25, "Not a typewriter.";
        EFBIG = 27, "File too large.";
        ENOSPC = 28, "No space left on device.";
        ESPIPE = 29, "Illegal seek.";
        EROFS = 30, "Read-only file system.";
        ERANGE = 34, "Math result not representable.";
        ENOSYS = 38, "Function not implemented.";
        ENODATA = 61, "No data available.";
        EPROBE_DEFER = 517, "Driver requests probe retry.";
        ENOTSUPP = 524, "Operation is not supported.";
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Error {
        linux_err::ENOMEM
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Error {
        linux_err::EINVAL
    }
}

impl From<ParseIntError> for Error {
    fn from(_: ParseIntError) -> Error {
        linux_err::EINVAL
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<core::convert::Infallible> for Error {
    fn from(e: core::convert::Infallible) -> Error {
        match e {}
    }
}
