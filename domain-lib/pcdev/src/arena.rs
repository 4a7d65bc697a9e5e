use alloc::{sync::Arc, vec::Vec};

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    code::{ENODEV, ENOMEM},
    error::KernelResult as Result,
    fs::{FileMode, SeekFrom},
    sync::RwLock,
};
use log::debug;

use crate::{check_permission, io, DeviceRecord, Session};

/// Names a record in a [`DeviceArena`].
///
/// A slot freed by `remove` gets a new generation when reused, so an old id never
/// resolves to a newer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    index: u32,
    generation: u32,
}

impl DeviceId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

struct Slot {
    generation: u32,
    record: Option<Arc<DeviceRecord>>,
}

/// The records of one driver.
#[derive(Default)]
pub struct DeviceArena {
    slots: RwLock<Vec<Slot>>,
}

impl DeviceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, reusing the first free slot.
    pub fn insert(&self, record: DeviceRecord) -> Result<DeviceId> {
        let record = Some(Arc::new(record));
        let mut slots = self.slots.write();
        if let Some((index, slot)) = slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.record.is_none())
        {
            slot.generation = slot.generation.wrapping_add(1);
            slot.record = record;
            return Ok(DeviceId {
                index: u32::try_from(index)?,
                generation: slot.generation,
            });
        }
        let index = u32::try_from(slots.len()).map_err(|_| ENOMEM)?;
        slots.try_reserve(1)?;
        slots.push(Slot {
            generation: 0,
            record,
        });
        Ok(DeviceId {
            index,
            generation: 0,
        })
    }

    /// Takes the record out. Sessions still naming it fail with `ENODEV` from now on.
    pub fn remove(&self, id: DeviceId) -> Result<Arc<DeviceRecord>> {
        let mut slots = self.slots.write();
        let slot = slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .ok_or(ENODEV)?;
        slot.record.take().ok_or(ENODEV)
    }

    /// Resolves `id`, `ENODEV` if it names no live record.
    pub fn get(&self, id: DeviceId) -> Result<Arc<DeviceRecord>> {
        let slots = self.slots.read();
        slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.clone())
            .ok_or(ENODEV)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .iter()
            .filter(|slot| slot.record.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens the record `id` with `mode`, checking the mode against its permission.
    pub fn open(&self, id: DeviceId, mode: FileMode) -> Result<Session> {
        let record = self.get(id)?;
        check_permission(record.permission(), mode)?;
        debug!("device {} opened with mode {:?}", id.index(), mode);
        Ok(Session::new(id, mode))
    }

    pub fn read(&self, session: &mut Session, out: &mut UserSliceWriter<'_>) -> Result<usize> {
        let record = self.get(session.device())?;
        io::read(&record, session, out)
    }

    pub fn write(&self, session: &mut Session, src: &mut UserSliceReader<'_>) -> Result<usize> {
        let record = self.get(session.device())?;
        io::write(&record, session, src)
    }

    pub fn seek(&self, session: &mut Session, pos: SeekFrom) -> Result<u64> {
        let record = self.get(session.device())?;
        io::seek(&record, session, pos)
    }

    /// Ends a session. Device memory is not touched.
    pub fn release(&self, session: Session) {
        debug!("device {} released", session.device().index());
    }
}
