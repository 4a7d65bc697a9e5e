use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use kernel::{
    code::EINVAL,
    error::{Error, KernelResult as Result},
    sync::RwLock,
    sysfs::kstrtol,
};
use log::info;

pub const RDONLY: u32 = 0x01;
pub const WRONLY: u32 = 0x10;
pub const RDWR: u32 = 0x11;

/// Largest capacity accepted through [`DeviceRecord::store_capacity`], the biggest block
/// `kmalloc` hands out with 4K pages.
pub const MAX_CAPACITY: usize = 1 << 22;

/// Which accesses a device accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Permission {
    ReadOnly = RDONLY,
    WriteOnly = WRONLY,
    ReadWrite = RDWR,
}

impl Permission {
    /// The raw encoding used by platform data and device tree properties.
    pub const fn raw(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for Permission {
    type Error = Error;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            RDONLY => Ok(Permission::ReadOnly),
            WRONLY => Ok(Permission::WriteOnly),
            RDWR => Ok(Permission::ReadWrite),
            _ => Err(EINVAL),
        }
    }
}

/// State of one pseudo device: its memory, permission and serial number.
///
/// The buffer length is the capacity. Readers of the buffer hold the lock shared;
/// writes and resizes hold it exclusively, so nobody sees a buffer mid-reallocation.
pub struct DeviceRecord {
    permission: Permission,
    serial: RwLock<String>,
    buffer: RwLock<Vec<u8>>,
}

impl DeviceRecord {
    /// A zero-filled record of `capacity` bytes. `ENOMEM` if the buffer cannot be allocated.
    pub fn new(capacity: usize, permission: Permission, serial: &str) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity)?;
        buffer.resize(capacity, 0);
        Ok(Self {
            permission,
            serial: RwLock::new(serial.to_string()),
            buffer: RwLock::new(buffer),
        })
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn capacity(&self) -> usize {
        self.buffer.read().len()
    }

    pub fn serial(&self) -> String {
        self.serial.read().clone()
    }

    /// Replaces the serial number.
    pub fn set_serial(&self, serial: &str) {
        *self.serial.write() = serial.to_string();
    }

    /// Reallocates the buffer to `capacity` bytes.
    ///
    /// The first `min(old, new)` bytes survive and grown space reads as zero. Open sessions
    /// keep their position, even past the new end.
    pub fn set_capacity(&self, capacity: usize) -> Result {
        let mut buffer = self.buffer.write();
        let old = buffer.len();
        if capacity > old {
            buffer.try_reserve_exact(capacity - old)?;
        }
        buffer.resize(capacity, 0);
        buffer.shrink_to(capacity);
        info!("device memory resized from {} to {} bytes", old, capacity);
        Ok(())
    }

    /// Resizes from the text written to the `max_size` attribute: a base-10 integer, with an
    /// optional trailing newline. Unparsable or negative input, or a size above
    /// [`MAX_CAPACITY`], is `EINVAL`.
    ///
    /// Returns the number of bytes consumed, which is all of them.
    pub fn store_capacity(&self, text: &[u8]) -> Result<usize> {
        let value = kstrtol(text, 10).map_err(|_| EINVAL)?;
        let capacity = usize::try_from(value)?;
        if capacity > MAX_CAPACITY {
            return Err(EINVAL);
        }
        self.set_capacity(capacity)?;
        Ok(text.len())
    }

    /// A copy of the device memory.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.read().clone()
    }

    pub(crate) fn buffer(&self) -> &RwLock<Vec<u8>> {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use kernel::code::ENOMEM;

    use super::*;

    #[test]
    fn raw_permission_encodings() {
        assert_eq!(Permission::try_from(0x01u32), Ok(Permission::ReadOnly));
        assert_eq!(Permission::try_from(0x10u32), Ok(Permission::WriteOnly));
        assert_eq!(Permission::try_from(0x11u32), Ok(Permission::ReadWrite));
        assert_eq!(Permission::try_from(0x00u32), Err(EINVAL));
        assert_eq!(Permission::try_from(0x12u32), Err(EINVAL));
        assert_eq!(Permission::WriteOnly.raw(), 0x10);
    }

    #[test]
    fn new_record_is_zeroed() {
        let record = DeviceRecord::new(64, Permission::ReadWrite, "PCDEV4XYZ123").unwrap();
        assert_eq!(record.capacity(), 64);
        assert!(record.contents().iter().all(|b| *b == 0));
        assert_eq!(record.serial(), "PCDEV4XYZ123");
        let empty = DeviceRecord::new(0, Permission::ReadOnly, "").unwrap();
        assert_eq!(empty.capacity(), 0);
    }

    #[test]
    fn grow_preserves_prefix_and_zero_fills() {
        let record = DeviceRecord::new(512, Permission::ReadWrite, "s").unwrap();
        record.buffer().write().fill(0xAB);
        record.set_capacity(1024).unwrap();
        let data = record.contents();
        assert_eq!(data.len(), 1024);
        assert!(data[..512].iter().all(|b| *b == 0xAB));
        assert!(data[512..].iter().all(|b| *b == 0));
    }

    #[test]
    fn shrink_keeps_prefix() {
        let record = DeviceRecord::new(8, Permission::ReadWrite, "s").unwrap();
        record.buffer().write().copy_from_slice(b"abcdefgh");
        record.set_capacity(3).unwrap();
        assert_eq!(record.contents(), b"abc");
        record.set_capacity(5).unwrap();
        assert_eq!(record.contents(), b"abc\0\0");
    }

    #[test]
    fn store_capacity_parsing() {
        let record = DeviceRecord::new(16, Permission::ReadWrite, "s").unwrap();
        assert_eq!(record.store_capacity(b"32\n"), Ok(3));
        assert_eq!(record.capacity(), 32);
        assert_eq!(record.store_capacity(b"-1"), Err(EINVAL));
        assert_eq!(record.store_capacity(b"12abc"), Err(EINVAL));
        assert_eq!(record.store_capacity(b""), Err(EINVAL));
        assert_eq!(record.store_capacity(b"0x20"), Err(EINVAL));
        assert_eq!(record.store_capacity(b"99999999999999999999"), Err(EINVAL));
        assert_eq!(record.capacity(), 32);
        assert_eq!(record.store_capacity(b"0"), Ok(1));
        assert_eq!(record.capacity(), 0);
    }

    #[test]
    fn store_capacity_is_bounded() {
        let record = DeviceRecord::new(16, Permission::ReadWrite, "s").unwrap();
        assert_eq!(record.store_capacity(b"100000000000"), Err(EINVAL));
        assert_eq!(
            record.store_capacity(format!("{}", MAX_CAPACITY + 1).as_bytes()),
            Err(EINVAL)
        );
        assert_eq!(record.capacity(), 16);
        let max = format!("{}\n", MAX_CAPACITY);
        assert_eq!(record.store_capacity(max.as_bytes()), Ok(max.len()));
        assert_eq!(record.capacity(), MAX_CAPACITY);
    }

    #[test]
    fn impossible_size_is_enomem() {
        let record = DeviceRecord::new(4, Permission::ReadWrite, "s").unwrap();
        assert_eq!(record.set_capacity(usize::MAX), Err(ENOMEM));
        assert_eq!(record.capacity(), 4);
    }

    #[test]
    fn serial_update() {
        let record = DeviceRecord::new(4, Permission::ReadOnly, "OLD").unwrap();
        record.set_serial("NEW123");
        assert_eq!(record.serial(), "NEW123");
    }
}
