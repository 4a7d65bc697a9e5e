//! Platform driver for the pseudo character devices.
//!
//! Devices are matched through the id table and described by their platform data. Each
//! probed device gets a record, the lowest free minor of the driver's region and a
//! `pcdev-<minor>` node. [`device_setup`] is the board side, registering four devices.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod device_setup;

use alloc::sync::Arc;

use kernel::{
    code::EINVAL,
    dev_info,
    error::KernelResult as Result,
    module,
    platform::{DriverRegistration, PlatformDevice, PlatformDeviceId, PlatformDriver},
    pr_info, Host, Module, ThisModule,
};
use log::debug;
use pcdev::platform::{PcdevPlatformData, PcdrvPrivate, PCDEV_CFG, PCDEV_IDS};

module! {
    type: PcdPlatformModule,
    name: "pcd_platform_driver",
    author: "Pseudo char driver authors",
    description: "Pseudo char platform driver",
    license: "GPL",
}

pub struct PcdPlatformDriver {
    drv: Arc<PcdrvPrivate>,
}

impl PlatformDriver for PcdPlatformDriver {
    const NAME: &'static str = "pseudo-char-device";
    const ID_TABLE: &'static [PlatformDeviceId] = &PCDEV_IDS;

    fn probe(&self, pdev: &PlatformDevice) -> Result {
        let dev = pdev.device();
        dev_info!(dev, "A device is detected");
        let Some(pdata) = dev.platdata::<PcdevPlatformData>() else {
            dev_info!(dev, "No platform data available");
            return Err(EINVAL);
        };
        let config = pdev
            .id_entry()
            .and_then(|id| PCDEV_CFG.get(id.driver_data))
            .copied()
            .ok_or(EINVAL)?;
        debug!(
            "{}: size {}, perm {:#x}, serial {}, config {}/{}",
            dev.name(),
            pdata.size,
            pdata.perm,
            pdata.serial,
            config.config_item1,
            config.config_item2
        );
        match self.drv.attach(dev, &pdata, config, &[]) {
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

pub struct PcdPlatformModule {
    _driver: DriverRegistration,
    drv: Arc<PcdrvPrivate>,
}

impl PcdPlatformModule {
    pub fn driver_data(&self) -> &Arc<PcdrvPrivate> {
        &self.drv
    }
}

impl Module for PcdPlatformModule {
    fn init(_module: &'static ThisModule, host: &Host) -> Result<Self> {
        let drv = Arc::new(PcdrvPrivate::new("pcd_devices", "pcd_class")?);
        let driver = host
            .platform_bus()
            .register_driver(PcdPlatformDriver { drv: drv.clone() })?;
        pr_info!("PCD-Platform driver Module loaded");
        Ok(PcdPlatformModule {
            _driver: driver,
            drv,
        })
    }
}

impl Drop for PcdPlatformModule {
    fn drop(&mut self) {
        pr_info!("PCD-Platform driver Module unloaded");
    }
}
