//! Pseudo character driver with four static devices, `/dev/pcdev-1` to `/dev/pcdev-4`.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

use alloc::{format, sync::Arc, vec::Vec};

use kernel::{
    chrdev,
    device::{Class, Device},
    error::KernelResult as Result,
    module, pr_err, pr_info, Host, Module, ThisModule,
};
use pcdev::{DeviceArena, DeviceId, DeviceRecord, PcdevCdev, PcdevFile, Permission};

module! {
    type: PcdMultiModule,
    name: "pcd_multi",
    author: "Pseudo char driver authors",
    description: "Pseudo char driver multiple device support module",
    license: "GPL",
}

pub const NO_OF_DEVICES: u32 = 4;

/// Capacity, permission and serial of each device, by minor.
pub static DEVICES: [(usize, Permission, &str); NO_OF_DEVICES as usize] = [
    (1024, Permission::ReadOnly, "PCDEV1XYZ123"),
    (512, Permission::WriteOnly, "PCDEV2XYZ123"),
    (1024, Permission::ReadWrite, "PCDEV3XYZ123"),
    (512, Permission::ReadWrite, "PCDEV4XYZ123"),
];

pub struct PcdMultiModule {
    devices: Vec<Arc<Device>>,
    class: Arc<Class>,
    region: chrdev::Registration,
    arena: Arc<DeviceArena>,
    ids: Vec<DeviceId>,
}

impl PcdMultiModule {
    pub fn region(&self) -> &chrdev::Registration {
        &self.region
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn arena(&self) -> &Arc<DeviceArena> {
        &self.arena
    }

    /// Record behind each minor.
    pub fn ids(&self) -> &[DeviceId] {
        &self.ids
    }
}

impl Module for PcdMultiModule {
    fn init(_module: &'static ThisModule, _host: &Host) -> Result<Self> {
        let arena = Arc::new(DeviceArena::new());
        let mut ids = Vec::with_capacity(DEVICES.len());
        let mut builder = chrdev::builder("pcdevs", 0..NO_OF_DEVICES)?;
        for (size, permission, serial) in DEVICES.iter() {
            let id = arena.insert(DeviceRecord::new(*size, *permission, serial)?)?;
            builder = builder.register_device::<PcdevFile>(PcdevCdev::new(arena.clone(), id));
            ids.push(id);
        }
        let region = builder.build()?;
        pr_info!("Device number <major>:<minor> = {}", region.base());

        let class = Class::create("pcd_class")?;
        let mut devices = Vec::with_capacity(ids.len());
        for minor in 0..NO_OF_DEVICES {
            let devt = region.device_number(minor)?;
            let name = format!("pcdev-{}", minor + 1);
            devices.push(class.device_create(None, Some(devt), None, &name)?);
        }
        pr_info!("Module init was successful");
        Ok(PcdMultiModule {
            devices,
            class,
            region,
            arena,
            ids,
        })
    }
}

impl Drop for PcdMultiModule {
    fn drop(&mut self) {
        for dev in self.devices.iter().rev() {
            if let Err(e) = self.class.device_unregister(dev) {
                pr_err!("{}: removal failed: {:?}", dev.name(), e);
            }
        }
        pr_info!("Module unloaded");
    }
}
