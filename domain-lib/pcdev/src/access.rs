use kernel::{code::EPERM, error::KernelResult as Result, fs::FileMode};
use log::debug;

use crate::Permission;

/// Decides whether a file opened with `mode` may use a device with `permission`.
///
/// Read-write devices accept every mode. A read-only device accepts reading without
/// writing, a write-only device writing without reading. Everything else is `EPERM`.
pub fn check_permission(permission: Permission, mode: FileMode) -> Result {
    let read = mode.contains(FileMode::READ);
    let write = mode.contains(FileMode::WRITE);
    let allowed = match permission {
        Permission::ReadWrite => true,
        Permission::ReadOnly => read && !write,
        Permission::WriteOnly => write && !read,
    };
    if allowed {
        Ok(())
    } else {
        debug!("{:?} device refused open with mode {:?}", permission, mode);
        Err(EPERM)
    }
}
