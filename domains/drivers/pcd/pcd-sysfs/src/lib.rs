//! Platform driver for the pseudo character devices with device tree support and sysfs
//! attributes.
//!
//! A device described by the device tree carries its serial number, size and permission
//! as `org,device-serial-num`, `org,size` and `org,perm`; other devices fall back to
//! platform data and the id table. Every `pcdev-<minor>` node gets a `max_size`
//! attribute, writable to resize the device memory, and a read-only `serial_num`.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod sysfs;

use alloc::sync::Arc;

use kernel::{
    code::EINVAL,
    dev_info,
    device::Device,
    error::KernelResult as Result,
    module,
    of::{self, DeviceNode, OfDeviceId},
    platform::{DriverRegistration, PlatformDevice, PlatformDeviceId, PlatformDriver},
    pr_info, Host, Module, ThisModule,
};
use log::debug;
use pcdev::platform::{
    PcdevPlatformData, PcdrvPrivate, PCDEVA1X, PCDEVB1X, PCDEVC1X, PCDEVD1X, PCDEV_CFG,
    PCDEV_IDS,
};

pub use crate::sysfs::PCD_ATTR_GROUP;

module! {
    type: PcdSysfsModule,
    name: "pcd_platform_driver_dt_sysfs",
    author: "Pseudo char driver authors",
    description: "Pseudo char driver multiple device support module dt and sysfs",
    license: "GPL",
}

pub static ORG_PCDEV_DT_MATCH: [OfDeviceId; 4] = [
    OfDeviceId::new("pcdev-A1x", PCDEVA1X),
    OfDeviceId::new("pcdev-B1x", PCDEVB1X),
    OfDeviceId::new("pcdev-C1x", PCDEVC1X),
    OfDeviceId::new("pcdev-D1x", PCDEVD1X),
];

/// Reads the platform data out of the device tree node. Any missing property is `EINVAL`.
fn platdata_from_dt(dev: &Device, node: &DeviceNode) -> Result<PcdevPlatformData> {
    let serial = node.read_string("org,device-serial-num").map_err(|_| {
        dev_info!(dev, "Missing serial number property");
        EINVAL
    })?;
    let size = node.read_u32("org,size").map_err(|_| {
        dev_info!(dev, "Missing size property");
        EINVAL
    })?;
    let perm = node.read_u32("org,perm").map_err(|_| {
        dev_info!(dev, "Missing permission property");
        EINVAL
    })?;
    Ok(PcdevPlatformData::new(usize::try_from(size)?, perm, serial))
}

pub struct PcdSysfsDriver {
    drv: Arc<PcdrvPrivate>,
}

impl PcdSysfsDriver {
    /// Platform data and config index of `pdev`, from its device tree node if one matched.
    fn platdata(pdev: &PlatformDevice) -> Result<(Arc<PcdevPlatformData>, usize)> {
        let dev = pdev.device();
        let matched = dev
            .of_node()
            .and_then(|node| of::match_node(Self::OF_MATCH_TABLE, node).map(|id| (node, id)));
        if let Some((node, id)) = matched {
            return Ok((Arc::new(platdata_from_dt(dev, node)?), id.data));
        }
        let pdata = dev.platdata::<PcdevPlatformData>().ok_or_else(|| {
            dev_info!(dev, "No platform data available");
            EINVAL
        })?;
        let id = pdev.id_entry().ok_or(EINVAL)?;
        Ok((pdata, id.driver_data))
    }
}

impl PlatformDriver for PcdSysfsDriver {
    const NAME: &'static str = "pseudo-char-device";
    const ID_TABLE: &'static [PlatformDeviceId] = &PCDEV_IDS;
    const OF_MATCH_TABLE: &'static [OfDeviceId] = &ORG_PCDEV_DT_MATCH;

    fn probe(&self, pdev: &PlatformDevice) -> Result {
        let dev = pdev.device();
        dev_info!(dev, "A device is detected");
        let result = Self::platdata(pdev).and_then(|(pdata, index)| {
            let config = PCDEV_CFG.get(index).copied().ok_or(EINVAL)?;
            debug!(
                "{}: size {}, perm {:#x}, serial {}, config {}/{}",
                dev.name(),
                pdata.size,
                pdata.perm,
                pdata.serial,
                config.config_item1,
                config.config_item2
            );
            self.drv.attach(dev, &pdata, config, &[&PCD_ATTR_GROUP])
        });
        match result {
            Ok(_) => {
                dev_info!(dev, "The probe was successful");
                Ok(())
            }
            Err(e) => {
                dev_info!(dev, "Device probe failed");
                Err(e)
            }
        }
    }

    fn remove(&self, pdev: &PlatformDevice) -> Result {
        let dev = pdev.device();
        self.drv.detach(dev)?;
        dev_info!(dev, "A device is removed");
        Ok(())
    }
}

pub struct PcdSysfsModule {
    _driver: DriverRegistration,
    drv: Arc<PcdrvPrivate>,
}

impl PcdSysfsModule {
    pub fn driver_data(&self) -> &Arc<PcdrvPrivate> {
        &self.drv
    }
}

impl Module for PcdSysfsModule {
    fn init(_module: &'static ThisModule, host: &Host) -> Result<Self> {
        let drv = Arc::new(PcdrvPrivate::new("pcd_devices", "pcd_class")?);
        let driver = host
            .platform_bus()
            .register_driver(PcdSysfsDriver { drv: drv.clone() })?;
        pr_info!("PCD-Platform driver Module loaded");
        Ok(PcdSysfsModule {
            _driver: driver,
            drv,
        })
    }
}

impl Drop for PcdSysfsModule {
    fn drop(&mut self) {
        pr_info!("PCD-Platform driver Module unloaded");
    }
}
