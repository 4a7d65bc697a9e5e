//! Pseudo character driver: one 512-byte read-write device, `/dev/pcd`.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

use alloc::sync::Arc;

use kernel::{
    chrdev,
    device::{Class, Device},
    error::KernelResult as Result,
    module, pr_err, pr_info, Host, Module, ThisModule,
};
use pcdev::{DeviceArena, DeviceId, DeviceRecord, PcdevCdev, PcdevFile, Permission};

module! {
    type: PcdModule,
    name: "pcd",
    author: "Pseudo char driver authors",
    description: "Pseudo char driver module",
    license: "GPL",
}

pub const DEV_MEM_SIZE: usize = 512;
pub const SERIAL: &str = "PCDEV0XYZ000";

pub struct PcdModule {
    device: Arc<Device>,
    class: Arc<Class>,
    region: chrdev::Registration,
    arena: Arc<DeviceArena>,
    id: DeviceId,
}

impl PcdModule {
    pub fn region(&self) -> &chrdev::Registration {
        &self.region
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn arena(&self) -> &Arc<DeviceArena> {
        &self.arena
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }
}

impl Module for PcdModule {
    fn init(_module: &'static ThisModule, _host: &Host) -> Result<Self> {
        let arena = Arc::new(DeviceArena::new());
        let id = arena.insert(DeviceRecord::new(
            DEV_MEM_SIZE,
            Permission::ReadWrite,
            SERIAL,
        )?)?;
        let region = chrdev::builder("pcd_devices", 0..1)?
            .register_device::<PcdevFile>(PcdevCdev::new(arena.clone(), id))
            .build()?;
        pr_info!("Device number <major>:<minor> = {}", region.base());

        let class = Class::create("pcd_class")?;
        let device = class.device_create(None, Some(region.base()), None, "pcd")?;
        pr_info!("PCD Module init successful");
        Ok(PcdModule {
            device,
            class,
            region,
            arena,
            id,
        })
    }
}

impl Drop for PcdModule {
    fn drop(&mut self) {
        if let Err(e) = self.class.device_unregister(&self.device) {
            pr_err!("pcd: device removal failed: {:?}", e);
        }
        pr_info!("PCD Module unloaded");
    }
}
