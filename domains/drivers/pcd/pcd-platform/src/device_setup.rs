//! Board file registering the four pseudo platform devices.

use alloc::{vec, vec::Vec};

use kernel::{
    error::KernelResult as Result,
    module,
    platform::{DeviceSet, PlatformDevice},
    pr_info, Host, Module, ThisModule,
};
use pcdev::{platform::PcdevPlatformData, RDONLY, RDWR, WRONLY};

module! {
    type: PcdevSetupModule,
    name: "pcdev_platform_device_setup",
    author: "Pseudo char driver authors",
    description: "Module which registers platform devices",
    license: "GPL",
}

/// The devices of the board, each with its platform data.
pub fn platform_devices() -> Vec<PlatformDevice> {
    vec![
        PlatformDevice::new("pcdev-A1x", 0)
            .with_platform_data(PcdevPlatformData::new(512, RDWR, "PCDEVABC111")),
        PlatformDevice::new("pcdev-B1x", 1)
            .with_platform_data(PcdevPlatformData::new(1024, RDWR, "PCDEVXYZ222")),
        PlatformDevice::new("pcdev-C1x", 2)
            .with_platform_data(PcdevPlatformData::new(128, RDONLY, "PCDEVDEF333")),
        PlatformDevice::new("pcdev-D1x", 3)
            .with_platform_data(PcdevPlatformData::new(32, WRONLY, "PCDEVIJK444")),
    ]
}

pub struct PcdevSetupModule {
    devices: DeviceSet,
}

impl PcdevSetupModule {
    pub fn devices(&self) -> &DeviceSet {
        &self.devices
    }
}

impl Module for PcdevSetupModule {
    fn init(_module: &'static ThisModule, host: &Host) -> Result<Self> {
        let devices = DeviceSet::register(host.platform_bus(), platform_devices())?;
        pr_info!("Device setup module loaded");
        Ok(PcdevSetupModule { devices })
    }
}

impl Drop for PcdevSetupModule {
    fn drop(&mut self) {
        pr_info!("Device setup module unloaded");
    }
}
