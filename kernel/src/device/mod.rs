// SPDX-License-Identifier: GPL-2.0
//

//! Generic devices that are part of the kernel's driver model.
//!
//! C header: [`include/linux/device.h`](../../../../include/linux/device.h)

use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use core::{any::Any, fmt};

use downcast_rs::{impl_downcast, DowncastSync};

use crate::{
    chrdev::DeviceNumber,
    code::{EEXIST, EINVAL, ENODEV},
    error::KernelResult as Result,
    of::DeviceNode,
    print::{self, KERN_DEBUG, KERN_ERR, KERN_INFO, KERN_NOTICE, KERN_WARNING},
    sync::{Once, RwLock},
    sysfs::{AttributeGroup, DeviceAttribute},
};

/// Anything a driver hangs off a device: `platform_data`, `driver_data`.
pub trait DriverData: DowncastSync {}
impl_downcast!(sync DriverData);

impl<T: Any + Send + Sync> DriverData for T {}

/// A device of the driver model.
///
/// `of_node` and `platform_data` are set at most once, before a driver binds.
pub struct Device {
    name: String,
    devt: Option<DeviceNumber>,
    parent: Option<Arc<Device>>,
    of_node: Once<Arc<DeviceNode>>,
    platform_data: Once<Arc<dyn DriverData>>,
    drvdata: RwLock<Option<Arc<dyn DriverData>>>,
    pub(crate) attrs: RwLock<Vec<&'static DeviceAttribute>>,
}

impl Device {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            devt: None,
            parent: None,
            of_node: Once::new(),
            platform_data: Once::new(),
            drvdata: RwLock::new(None),
            attrs: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn devt(&self) -> Option<DeviceNumber> {
        self.devt
    }

    pub fn parent(&self) -> Option<&Arc<Device>> {
        self.parent.as_ref()
    }

    pub fn of_node(&self) -> Option<&Arc<DeviceNode>> {
        self.of_node.get()
    }

    /// `device_set_node`. A node that is already set is kept.
    pub fn set_of_node(&self, node: Arc<DeviceNode>) {
        self.of_node.call_once(|| node);
    }

    pub fn set_platform_data(&self, data: Arc<dyn DriverData>) {
        self.platform_data.call_once(|| data);
    }

    /// `dev_get_platdata`, typed.
    pub fn platdata<T: DriverData>(&self) -> Option<Arc<T>> {
        let data = self.platform_data.get()?.clone();
        data.downcast_arc::<T>().ok()
    }

    /// `dev_set_drvdata`
    pub fn set_drvdata(&self, data: Option<Arc<dyn DriverData>>) {
        *self.drvdata.write() = data;
    }

    /// `dev_get_drvdata`, typed.
    pub fn drvdata<T: DriverData>(&self) -> Option<Arc<T>> {
        let data = self.drvdata.read().clone()?;
        data.downcast_arc::<T>().ok()
    }

    /// Prints an error-level message (level 3) prefixed with device information.
    ///
    /// More details are available from [`dev_err`].
    ///
    /// [`dev_err`]: crate::dev_err
    pub fn pr_err(&self, args: fmt::Arguments<'_>) {
        self.printk(KERN_ERR, args);
    }

    /// Prints a warning-level message (level 4) prefixed with device information.
    ///
    /// More details are available from [`dev_warn`].
    ///
    /// [`dev_warn`]: crate::dev_warn
    pub fn pr_warn(&self, args: fmt::Arguments<'_>) {
        self.printk(KERN_WARNING, args);
    }

    /// Prints a notice-level message (level 5) prefixed with device information.
    pub fn pr_notice(&self, args: fmt::Arguments<'_>) {
        self.printk(KERN_NOTICE, args);
    }

    /// Prints an info-level message (level 6) prefixed with device information.
    ///
    /// More details are available from [`dev_info`].
    ///
    /// [`dev_info`]: crate::dev_info
    pub fn pr_info(&self, args: fmt::Arguments<'_>) {
        self.printk(KERN_INFO, args);
    }

    /// Prints a debug-level message (level 7) prefixed with device information.
    ///
    /// More details are available from [`dev_dbg`].
    ///
    /// [`dev_dbg`]: crate::dev_dbg
    pub fn pr_dbg(&self, args: fmt::Arguments<'_>) {
        if cfg!(debug_assertions) {
            self.printk(KERN_DEBUG, args);
        }
    }

    fn printk(&self, klevel: &[u8], msg: fmt::Arguments<'_>) {
        print::printk(klevel, format_args!("{}: {}", self.name, msg));
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("devt", &self.devt)
            .finish()
    }
}

/// A device class, the directory under `/sys/class` its devices appear in.
pub struct Class {
    name: String,
    devices: RwLock<Vec<Arc<Device>>>,
}

impl Class {
    /// `class_create`
    pub fn create(name: &str) -> Result<Arc<Class>> {
        if name.is_empty() {
            return Err(EINVAL);
        }
        Ok(Arc::new(Class {
            name: name.to_string(),
            devices: RwLock::new(Vec::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `device_create`: a device named `name` under this class.
    ///
    /// Fails with `EEXIST` if the class already holds a device of that name.
    pub fn device_create(
        &self,
        parent: Option<&Arc<Device>>,
        devt: Option<DeviceNumber>,
        drvdata: Option<Arc<dyn DriverData>>,
        name: &str,
    ) -> Result<Arc<Device>> {
        self.device_create_with_groups(parent, devt, drvdata, &[], name)
    }

    /// `device_create_with_groups`: like [`Class::device_create`], with the attributes of
    /// `groups` present from the start.
    pub fn device_create_with_groups(
        &self,
        parent: Option<&Arc<Device>>,
        devt: Option<DeviceNumber>,
        drvdata: Option<Arc<dyn DriverData>>,
        groups: &[&'static AttributeGroup],
        name: &str,
    ) -> Result<Arc<Device>> {
        let mut devices = self.devices.write();
        if devices.iter().any(|d| d.name == name) {
            return Err(EEXIST);
        }
        let mut dev = Device::new(name);
        dev.parent = parent.cloned();
        dev.devt = devt;
        dev.set_drvdata(drvdata);
        for group in groups {
            dev.create_group(*group)?;
        }
        let dev = Arc::new(dev);
        devices.push(dev.clone());
        Ok(dev)
    }

    /// `device_destroy`: removes the device with number `devt`.
    pub fn device_destroy(&self, devt: DeviceNumber) -> Result {
        let mut devices = self.devices.write();
        let pos = devices
            .iter()
            .position(|d| d.devt == Some(devt))
            .ok_or(ENODEV)?;
        devices.remove(pos);
        Ok(())
    }

    /// `device_unregister`
    pub fn device_unregister(&self, dev: &Arc<Device>) -> Result {
        let mut devices = self.devices.write();
        let pos = devices
            .iter()
            .position(|d| Arc::ptr_eq(d, dev))
            .ok_or(ENODEV)?;
        devices.remove(pos);
        Ok(())
    }

    /// Looks a device up by name, like a path under `/sys/class/<class>/`.
    pub fn find(&self, name: &str) -> Option<Arc<Device>> {
        self.devices.read().iter().find(|d| d.name == name).cloned()
    }

    /// Names of the devices in this class, in creation order.
    pub fn device_names(&self) -> Vec<String> {
        self.devices.read().iter().map(|d| d.name.clone()).collect()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! dev_printk {
    ($method:ident, $dev:expr, $($f:tt)*) => {
        {
            ($dev).$method(core::format_args!($($f)*));
        }
    }
}

/// Prints an error-level message (level 3) prefixed with device information.
///
/// This level should be used if an error condition occurred.
///
/// Equivalent to the kernel's `dev_err` macro.
///
/// # Examples
///
/// ```
/// # use kernel::dev_err;
/// use kernel::device::Device;
///
/// fn example(dev: &Device) {
///     dev_err!(dev, "hello {}\n", "there");
/// }
/// ```
#[macro_export]
macro_rules! dev_err {
    ($($f:tt)*) => { $crate::dev_printk!(pr_err, $($f)*); }
}

/// Prints a warning-level message (level 4) prefixed with device information.
///
/// Equivalent to the kernel's `dev_warn` macro.
#[macro_export]
macro_rules! dev_warn {
    ($($f:tt)*) => { $crate::dev_printk!(pr_warn, $($f)*); }
}

/// Prints a notice-level message (level 5) prefixed with device information.
#[macro_export]
macro_rules! dev_notice {
    ($($f:tt)*) => { $crate::dev_printk!(pr_notice, $($f)*); }
}

/// Prints an info-level message (level 6) prefixed with device information.
///
/// Equivalent to the kernel's `dev_info` macro.
#[macro_export]
macro_rules! dev_info {
    ($($f:tt)*) => { $crate::dev_printk!(pr_info, $($f)*); }
}

/// Prints a debug-level message (level 7) prefixed with device information.
///
/// Equivalent to the kernel's `dev_dbg` macro, compiled in for debug builds only.
#[macro_export]
macro_rules! dev_dbg {
    ($($f:tt)*) => { $crate::dev_printk!(pr_dbg, $($f)*); }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Private {
        size: usize,
    }

    #[test]
    fn typed_driver_data() {
        let dev = Device::new("pcdev-0");
        assert!(dev.drvdata::<Private>().is_none());
        dev.set_drvdata(Some(Arc::new(Private { size: 512 })));
        assert_eq!(dev.drvdata::<Private>().map(|p| p.size), Some(512));
        assert!(dev.drvdata::<u32>().is_none());
        dev.set_drvdata(None);
        assert!(dev.drvdata::<Private>().is_none());
    }

    #[test]
    fn platform_data_and_node_are_set_once() {
        let dev = Device::new("pcdev-A1x.0");
        dev.set_platform_data(Arc::new(7u32));
        dev.set_platform_data(Arc::new(9u32));
        assert_eq!(dev.platdata::<u32>().as_deref(), Some(&7));
        dev.set_of_node(Arc::new(DeviceNode::new("first")));
        dev.set_of_node(Arc::new(DeviceNode::new("second")));
        assert_eq!(dev.of_node().map(|n| n.name()), Some("first"));
    }

    #[test]
    fn class_device_lifecycle() {
        let class = Class::create("pcd_class").unwrap();
        let parent = Arc::new(Device::new("pcdev-A1x"));
        let devt = DeviceNumber::new(250, 0);
        let dev = class
            .device_create(Some(&parent), Some(devt), None, "pcdev-0")
            .unwrap();
        assert!(Arc::ptr_eq(dev.parent().unwrap(), &parent));
        assert!(matches!(
            class.device_create(None, None, None, "pcdev-0"),
            Err(EEXIST)
        ));
        assert_eq!(class.device_names(), ["pcdev-0"]);
        class.device_destroy(devt).unwrap();
        assert!(class.find("pcdev-0").is_none());
        assert_eq!(class.device_destroy(devt), Err(ENODEV));
        assert!(Class::create("").is_err());
    }
}
