use alloc::sync::Arc;

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    error::KernelResult as Result,
    fs::{
        file_operations::{ReadFn, SeekFn, WriteFn},
        File, FileOperations, SeekFrom,
    },
};
use log::debug;

use crate::{DeviceArena, DeviceId, Session};

/// What the cdev of one pseudo device carries: the arena and the record behind the minor.
pub struct PcdevCdev {
    arena: Arc<DeviceArena>,
    id: DeviceId,
}

impl PcdevCdev {
    pub fn new(arena: Arc<DeviceArena>, id: DeviceId) -> Self {
        Self { arena, id }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }
}

/// An open pseudo device file.
pub struct PcdevFile {
    arena: Arc<DeviceArena>,
    session: Session,
}

impl PcdevFile {
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl FileOperations for PcdevFile {
    type OpenData = PcdevCdev;

    fn open(cdev: &PcdevCdev, file: &File) -> Result<Self> {
        let session = match cdev.arena.open(cdev.id, file.mode()) {
            Ok(session) => session,
            Err(e) => {
                debug!("open of minor {} was unsuccessful: {:?}", file.minor(), e);
                return Err(e);
            }
        };
        debug!("open of minor {} was successful", file.minor());
        Ok(Self {
            arena: cdev.arena.clone(),
            session,
        })
    }

    fn release(self, file: &File) {
        debug!("release of minor {}", file.minor());
        self.arena.release(self.session);
    }

    const READ: ReadFn<Self> = Some(
        |this: &mut Self, _file: &File, buf: &mut UserSliceWriter<'_>| -> Result<usize> {
            this.arena.read(&mut this.session, buf)
        },
    );

    const WRITE: WriteFn<Self> = Some(
        |this: &mut Self, _file: &File, buf: &mut UserSliceReader<'_>| -> Result<usize> {
            this.arena.write(&mut this.session, buf)
        },
    );

    const SEEK: SeekFn<Self> = Some(
        |this: &mut Self, _file: &File, pos: SeekFrom| -> Result<u64> {
            this.arena.seek(&mut this.session, pos)
        },
    );
}
