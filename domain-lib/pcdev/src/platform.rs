//! What the platform drivers share: the platform data a board attaches to a device, the
//! per-variant configuration, and the char device state a probed device is hooked into.

use alloc::{
    format,
    string::{String, ToString},
    sync::Arc,
};

use kernel::{
    chrdev::{self, DeviceNumber},
    code::{EBUSY, ENODEV},
    dev_err, dev_info,
    device::{Class, Device},
    error::KernelResult as Result,
    platform::PlatformDeviceId,
    sysfs::AttributeGroup,
};

use crate::{DeviceArena, DeviceId, DeviceRecord, PcdevCdev, PcdevFile, Permission};

/// Minors reserved by a platform driver, and so the most devices it can drive at once.
pub const MAX_DEVICES: u32 = 10;

pub const PCDEVA1X: usize = 0;
pub const PCDEVB1X: usize = 1;
pub const PCDEVC1X: usize = 2;
pub const PCDEVD1X: usize = 3;

/// `platform_data` of a pseudo device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcdevPlatformData {
    pub size: usize,
    /// Raw encoding, see [`Permission::raw`].
    pub perm: u32,
    pub serial: String,
}

impl PcdevPlatformData {
    pub fn new(size: usize, perm: u32, serial: &str) -> Self {
        Self {
            size,
            perm,
            serial: serial.to_string(),
        }
    }
}

/// Variant specific settings, picked by the matched id table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    pub config_item1: i32,
    pub config_item2: i32,
}

pub static PCDEV_CFG: [DeviceConfig; 4] = [
    DeviceConfig {
        config_item1: 60,
        config_item2: 21,
    },
    DeviceConfig {
        config_item1: 50,
        config_item2: 22,
    },
    DeviceConfig {
        config_item1: 40,
        config_item2: 23,
    },
    DeviceConfig {
        config_item1: 30,
        config_item2: 24,
    },
];

pub static PCDEV_IDS: [PlatformDeviceId; 4] = [
    PlatformDeviceId::new("pcdev-A1x", PCDEVA1X),
    PlatformDeviceId::new("pcdev-B1x", PCDEVB1X),
    PlatformDeviceId::new("pcdev-C1x", PCDEVC1X),
    PlatformDeviceId::new("pcdev-D1x", PCDEVD1X),
];

/// Driver data of a probed device.
pub struct PcdevPrivate {
    id: DeviceId,
    record: Arc<DeviceRecord>,
    devt: DeviceNumber,
    config: DeviceConfig,
}

impl PcdevPrivate {
    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn record(&self) -> &Arc<DeviceRecord> {
        &self.record
    }

    pub fn devt(&self) -> DeviceNumber {
        self.devt
    }

    pub fn config(&self) -> DeviceConfig {
        self.config
    }
}

/// Driver-wide state: the records, the char device region and the class.
pub struct PcdrvPrivate {
    arena: Arc<DeviceArena>,
    region: chrdev::Registration,
    class: Arc<Class>,
}

impl PcdrvPrivate {
    /// Reserves [`MAX_DEVICES`] minors under `region_name` and creates the class.
    pub fn new(region_name: &str, class_name: &str) -> Result<Self> {
        let region = chrdev::Registration::new_region(region_name, 0..MAX_DEVICES)?;
        let class = Class::create(class_name)?;
        Ok(Self {
            arena: Arc::new(DeviceArena::new()),
            region,
            class,
        })
    }

    pub fn arena(&self) -> &Arc<DeviceArena> {
        &self.arena
    }

    pub fn region(&self) -> &chrdev::Registration {
        &self.region
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Backs `dev` with a new record described by `pdata`.
    ///
    /// The record gets the lowest free minor and a class device `pcdev-<minor>` carrying
    /// `groups`; `dev` gets a [`PcdevPrivate`] as driver data. `EBUSY` when every minor is
    /// taken, `EINVAL` for an unknown permission encoding. Nothing is left behind on
    /// failure.
    pub fn attach(
        &self,
        dev: &Arc<Device>,
        pdata: &PcdevPlatformData,
        config: DeviceConfig,
        groups: &[&'static AttributeGroup],
    ) -> Result<Arc<PcdevPrivate>> {
        let permission = Permission::try_from(pdata.perm)?;
        dev_info!(dev, "Device serial number: {}", pdata.serial);
        dev_info!(dev, "Device size: {} bytes", pdata.size);
        dev_info!(dev, "Device permission: {:#x}", pdata.perm);
        dev_info!(dev, "Config Item 1: {}", config.config_item1);
        dev_info!(dev, "Config Item 2: {}", config.config_item2);

        let minor = self.region.first_free().ok_or(EBUSY)?;
        let devt = self.region.device_number(minor)?;
        let id = self
            .arena
            .insert(DeviceRecord::new(pdata.size, permission, &pdata.serial)?)?;
        let record = self.arena.get(id)?;

        if let Err(e) = self
            .region
            .add::<PcdevFile>(minor, PcdevCdev::new(self.arena.clone(), id))
        {
            dev_err!(dev, "cdev add failed");
            self.arena.remove(id)?;
            return Err(e);
        }
        let name = format!("pcdev-{}", minor);
        if let Err(e) = self
            .class
            .device_create_with_groups(Some(dev), Some(devt), None, groups, &name)
        {
            dev_err!(dev, "device creation failed");
            self.region.remove(minor)?;
            self.arena.remove(id)?;
            return Err(e);
        }

        let private = Arc::new(PcdevPrivate {
            id,
            record,
            devt,
            config,
        });
        dev.set_drvdata(Some(private.clone()));
        Ok(private)
    }

    /// Undoes [`PcdrvPrivate::attach`]: the class device, the cdev and the record go away
    /// and the minor is free again. `ENODEV` if `dev` was never attached.
    pub fn detach(&self, dev: &Device) -> Result {
        let private = dev.drvdata::<PcdevPrivate>().ok_or(ENODEV)?;
        self.class.device_destroy(private.devt)?;
        self.region.remove(private.devt.minor())?;
        self.arena.remove(private.id)?;
        dev.set_drvdata(None);
        Ok(())
    }
}
