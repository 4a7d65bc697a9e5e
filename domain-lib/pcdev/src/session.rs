use kernel::fs::FileMode;

use crate::DeviceId;

/// One open of a device: which record, how it was opened, and the file position.
///
/// Sessions only come out of [`DeviceArena::open`](crate::DeviceArena::open), after the
/// access mode passed the permission check.
#[derive(Debug)]
pub struct Session {
    device: DeviceId,
    mode: FileMode,
    pub(crate) cursor: usize,
}

impl Session {
    pub(crate) fn new(device: DeviceId, mode: FileMode) -> Self {
        Self {
            device,
            mode,
            cursor: 0,
        }
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// The file position. May lie past the end after the device shrank.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
