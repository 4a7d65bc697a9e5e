//! GPIO sysfs exporter.
//!
//! Binds to `org,bone-gpio-sysfs` nodes. Every available child node describes one line,
//! which is driven low as an output and shows up under `/sys/class/bone_gpios/<label>`
//! with `direction`, `value` and `label` attributes.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

mod attrs;

use alloc::{
    format,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};

use kernel::{
    code::{EINVAL, ENODEV, ENOENT},
    dev_err, dev_info, dev_warn,
    device::{Class, Device},
    error::KernelResult as Result,
    gpio::{GpioDesc, GpioProvider},
    module,
    of::{DeviceNode, OfDeviceId},
    platform::{DriverRegistration, PlatformDevice, PlatformDriver},
    pr_info, Host, Module, ThisModule,
};
use log::debug;

pub use crate::attrs::GPIO_ATTR_GROUP;

module! {
    type: GpioSysfsModule,
    name: "gpio_sysfs",
    author: "Pseudo char driver authors",
    description: "A gpio sysfs driver",
    license: "GPL",
}

pub static GPIO_DEVICE_MATCH: [OfDeviceId; 1] = [OfDeviceId::new("org,bone-gpio-sysfs", 0)];

/// Driver data of an exported line's class device.
pub struct GpiodevPrivate {
    label: String,
    desc: Arc<dyn GpioDesc>,
}

impl GpiodevPrivate {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn desc(&self) -> &Arc<dyn GpioDesc> {
        &self.desc
    }
}

/// Driver data of the platform device: the labels of the lines it exported.
struct Exported {
    labels: Vec<String>,
}

pub struct GpioSysfsDriver {
    class: Arc<Class>,
    gpio: Arc<dyn GpioProvider>,
}

impl GpioSysfsDriver {
    fn export(&self, dev: &Arc<Device>, child: &DeviceNode, index: usize) -> Result<String> {
        let label = match child.read_string("label") {
            Ok(name) => {
                dev_info!(dev, "GPIO label = {}", name);
                name.to_string()
            }
            Err(_) => {
                dev_warn!(dev, "missing label information");
                format!("unkngpio{}", index)
            }
        };

        let desc = self
            .gpio
            .get_from_child(dev, "bone", child, &label)
            .map_err(|e| {
                if e == ENOENT {
                    dev_err!(
                        dev,
                        "No GPIO has been assigned to the requested function and/or index"
                    );
                }
                e
            })?;
        desc.direction_output(0).map_err(|e| {
            dev_err!(dev, "GPIO direction set failed");
            e
        })?;

        let private = Arc::new(GpiodevPrivate {
            label: label.clone(),
            desc,
        });
        self.class
            .device_create_with_groups(Some(dev), None, Some(private), &[&GPIO_ATTR_GROUP], &label)
            .map_err(|e| {
                dev_err!(dev, "Error in device create");
                e
            })?;
        Ok(label)
    }

    fn unexport(&self, labels: &[String]) {
        for label in labels.iter().rev() {
            if let Some(dev) = self.class.find(label) {
                if let Err(e) = self.class.device_unregister(&dev) {
                    debug!("{}: unregister failed: {:?}", label, e);
                }
            }
        }
    }
}

impl PlatformDriver for GpioSysfsDriver {
    const NAME: &'static str = "bone-gpio-sysfs";
    const OF_MATCH_TABLE: &'static [OfDeviceId] = &GPIO_DEVICE_MATCH;

    fn probe(&self, pdev: &PlatformDevice) -> Result {
        let dev = pdev.device();
        let parent = dev.of_node().ok_or(EINVAL)?;
        let total = parent.child_count();
        if total == 0 {
            dev_err!(dev, "No devices found");
            return Err(EINVAL);
        }
        dev_info!(dev, "Total devices found = {}", total);

        let mut labels = Vec::with_capacity(total);
        for (i, child) in parent.available_children().enumerate() {
            match self.export(dev, child, i) {
                Ok(label) => labels.push(label),
                Err(e) => {
                    self.unexport(&labels);
                    return Err(e);
                }
            }
        }
        dev.set_drvdata(Some(Arc::new(Exported { labels })));
        Ok(())
    }

    fn remove(&self, pdev: &PlatformDevice) -> Result {
        let dev = pdev.device();
        dev_info!(dev, "remove called");
        let exported = dev.drvdata::<Exported>().ok_or(ENODEV)?;
        self.unexport(&exported.labels);
        dev.set_drvdata(None);
        Ok(())
    }
}

pub struct GpioSysfsModule {
    _driver: DriverRegistration,
    class: Arc<Class>,
}

impl GpioSysfsModule {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }
}

impl Module for GpioSysfsModule {
    fn init(_module: &'static ThisModule, host: &Host) -> Result<Self> {
        let class = Class::create("bone_gpios")?;
        let driver = host.platform_bus().register_driver(GpioSysfsDriver {
            class: class.clone(),
            gpio: host.gpio()?,
        })?;
        pr_info!("GPIO platform driver Module loaded");
        Ok(GpioSysfsModule {
            _driver: driver,
            class,
        })
    }
}

impl Drop for GpioSysfsModule {
    fn drop(&mut self) {
        pr_info!("GPIO platform driver Module unloaded");
    }
}
