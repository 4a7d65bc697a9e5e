//! Character devices.
//!
//! Also called "char devices", `chrdev`, `cdev`.
//!
//! C header: `include/linux/cdev.h`

use alloc::{
    boxed::Box,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::{fmt, marker::PhantomData, ops::Range};

use hashbrown::{HashMap, HashSet};
use log::debug;

use crate::{
    code::{EBUSY, EINVAL, ENXIO},
    error::KernelResult as Result,
    fs::{file_operations::OpenFile, File, FileHandle, FileMode, FileOperations},
    sync::{Lazy, Mutex, RwLock},
};

const MINORBITS: u32 = 20;
const MINORMASK: u32 = (1 << MINORBITS) - 1;

// Dynamic majors are handed out top-down, first from the classic range and then from the
// extended one, like `find_dynamic_major`.
const CHRDEV_MAJOR_DYN_END: u32 = 234;
const CHRDEV_MAJOR_DYN_START: u32 = 254;
const CHRDEV_MAJOR_DYN_EXT_START: u32 = 511;
const CHRDEV_MAJOR_DYN_EXT_END: u32 = 384;

static MAJORS: Lazy<Mutex<HashSet<u32>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn alloc_dynamic_major() -> Result<u32> {
    let mut used = MAJORS.lock();
    let candidates = (CHRDEV_MAJOR_DYN_END..=CHRDEV_MAJOR_DYN_START)
        .rev()
        .chain((CHRDEV_MAJOR_DYN_EXT_END..=CHRDEV_MAJOR_DYN_EXT_START).rev());
    for major in candidates {
        if used.insert(major) {
            return Ok(major);
        }
    }
    Err(EBUSY)
}

fn free_major(major: u32) {
    MAJORS.lock().remove(&major);
}

/// A `dev_t`: major number in the upper 12 bits, minor in the lower 20.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceNumber(u32);

impl DeviceNumber {
    /// `MKDEV`
    pub const fn new(major: u32, minor: u32) -> Self {
        Self((major << MINORBITS) | (minor & MINORMASK))
    }

    pub const fn major(&self) -> u32 {
        self.0 >> MINORBITS
    }

    pub const fn minor(&self) -> u32 {
        self.0 & MINORMASK
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major(), self.minor())
    }
}

trait Opener: Send + Sync {
    fn open(&self, file: File) -> Result<Box<dyn FileHandle>>;
}

struct Cdev<T: FileOperations> {
    data: T::OpenData,
    _ops: PhantomData<fn() -> T>,
}

impl<T: FileOperations> Opener for Cdev<T> {
    fn open(&self, file: File) -> Result<Box<dyn FileHandle>> {
        Ok(Box::new(OpenFile::<T>::open(&self.data, file)?))
    }
}

/// A region of char device numbers and the cdevs added to it.
///
/// Created like `alloc_chrdev_region`; dropping it deletes every cdev and releases the
/// region.
pub struct Registration {
    name: String,
    base: DeviceNumber,
    count: u32,
    cdevs: RwLock<HashMap<u32, Arc<dyn Opener>>>,
}

impl Registration {
    /// Allocates `minors` under a dynamic major.
    pub fn new_region(name: &str, minors: Range<u32>) -> Result<Self> {
        if minors.is_empty() || minors.end > MINORMASK + 1 {
            return Err(EINVAL);
        }
        let major = alloc_dynamic_major()?;
        let base = DeviceNumber::new(major, minors.start);
        debug!("{}: allocated region {} (+{})", name, base, minors.len());
        Ok(Self {
            name: name.to_string(),
            base,
            count: minors.end - minors.start,
            cdevs: RwLock::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> DeviceNumber {
        self.base
    }

    pub fn major(&self) -> u32 {
        self.base.major()
    }

    /// Number of minors in the region.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The device number of `minor`, `EINVAL` outside the region.
    pub fn device_number(&self, minor: u32) -> Result<DeviceNumber> {
        let first = self.base.minor();
        if minor < first || minor - first >= self.count {
            return Err(EINVAL);
        }
        Ok(DeviceNumber::new(self.major(), minor))
    }

    /// `cdev_add`: makes `minor` openable with the operations of `T`.
    ///
    /// Fails with `EINVAL` outside the region and `EBUSY` if the minor is taken.
    pub fn add<T: FileOperations>(&self, minor: u32, data: T::OpenData) -> Result {
        self.device_number(minor)?;
        let mut cdevs = self.cdevs.write();
        if cdevs.contains_key(&minor) {
            return Err(EBUSY);
        }
        let cdev: Arc<dyn Opener> = Arc::new(Cdev::<T> {
            data,
            _ops: PhantomData,
        });
        cdevs.insert(minor, cdev);
        Ok(())
    }

    /// `cdev_del`. Files already open stay usable until released.
    pub fn remove(&self, minor: u32) -> Result {
        self.cdevs.write().remove(&minor).map(|_| ()).ok_or(ENXIO)
    }

    /// Lowest minor of the region without a cdev.
    pub fn first_free(&self) -> Option<u32> {
        let cdevs = self.cdevs.read();
        let first = self.base.minor();
        (first..first + self.count).find(|minor| !cdevs.contains_key(minor))
    }

    /// Minors that currently have a cdev, in ascending order.
    pub fn active(&self) -> Vec<u32> {
        let mut minors: Vec<u32> = self.cdevs.read().keys().copied().collect();
        minors.sort_unstable();
        minors
    }

    /// `open(2)` on the device node of `minor`. `ENXIO` when no cdev backs it.
    pub fn open(&self, minor: u32, mode: FileMode) -> Result<Box<dyn FileHandle>> {
        let cdev = self.cdevs.read().get(&minor).cloned().ok_or(ENXIO)?;
        cdev.open(File::new(minor, mode))
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cdevs.write().clear();
        free_major(self.major());
        debug!("{}: released region {}", self.name, self.base);
    }
}

/// Builds a [`Registration`] whose minors get one file-operations type each, in order.
pub struct Builder {
    name: String,
    minors: Range<u32>,
    pending: Vec<Box<dyn FnOnce(&Registration, u32) -> Result>>,
}

/// Starts a registration of `minors` named `name`.
pub fn builder(name: &str, minors: Range<u32>) -> Result<Builder> {
    if minors.is_empty() {
        return Err(EINVAL);
    }
    Ok(Builder {
        name: name.to_string(),
        minors,
        pending: Vec::new(),
    })
}

impl Builder {
    /// Registers the next minor with the operations of `T`.
    pub fn register_device<T: FileOperations>(mut self, data: T::OpenData) -> Self {
        self.pending
            .push(Box::new(move |reg: &Registration, minor: u32| {
                reg.add::<T>(minor, data)
            }));
        self
    }

    /// Allocates the region and adds the devices. More devices than minors is `EINVAL`.
    pub fn build(self) -> Result<Registration> {
        if self.pending.len() > self.minors.len() {
            return Err(EINVAL);
        }
        let reg = Registration::new_region(&self.name, self.minors.clone())?;
        for (minor, add) in self.minors.zip(self.pending) {
            add(&reg, minor)?;
        }
        Ok(reg)
    }
}
