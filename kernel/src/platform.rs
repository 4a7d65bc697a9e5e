//! Platform devices and drivers.
//!
//! C header: `include/linux/platform_device.h`

use alloc::{
    format,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};

use log::{debug, warn};

use crate::{
    code::{EBUSY, EEXIST, ENODEV},
    device::{Device, DriverData},
    error::KernelResult as Result,
    of::{self, DeviceNode, OfDeviceId},
    sync::{Mutex, RwLock},
};

/// `PLATFORM_DEVID_NONE`: the device name carries no instance suffix.
pub const PLATFORM_DEVID_NONE: i32 = -1;

/// An entry of a driver's `id_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDeviceId {
    pub name: &'static str,
    pub driver_data: usize,
}

impl PlatformDeviceId {
    pub const fn new(name: &'static str, driver_data: usize) -> Self {
        Self { name, driver_data }
    }
}

/// A device on the platform bus.
pub struct PlatformDevice {
    name: String,
    id: i32,
    dev: Arc<Device>,
    id_entry: RwLock<Option<&'static PlatformDeviceId>>,
    driver: Mutex<Option<Arc<dyn BusDriver>>>,
}

impl PlatformDevice {
    /// A device named `name`, instance `id` (or [`PLATFORM_DEVID_NONE`]).
    pub fn new(name: &str, id: i32) -> Self {
        let dev_name = if id == PLATFORM_DEVID_NONE {
            name.to_string()
        } else {
            format!("{}.{}", name, id)
        };
        Self {
            name: name.to_string(),
            id,
            dev: Arc::new(Device::new(&dev_name)),
            id_entry: RwLock::new(None),
            driver: Mutex::new(None),
        }
    }

    /// Attaches `platform_data`.
    pub fn with_platform_data<T: DriverData>(self, data: T) -> Self {
        self.dev.set_platform_data(Arc::new(data));
        self
    }

    /// Attaches the device tree node the device was created from.
    pub fn with_of_node(self, node: DeviceNode) -> Self {
        self.dev.set_of_node(Arc::new(node));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.dev
    }

    /// `platform_get_device_id`: the `id_table` entry this device matched, if any.
    pub fn id_entry(&self) -> Option<&'static PlatformDeviceId> {
        *self.id_entry.read()
    }

    /// Name of the bound driver.
    pub fn driver_name(&self) -> Option<&'static str> {
        self.driver.lock().as_ref().map(|d| d.name())
    }
}

/// A driver on the platform bus.
///
/// Matching follows `platform_match`: the device tree node against `OF_MATCH_TABLE` first,
/// then `ID_TABLE` if the driver has one, then the driver name.
pub trait PlatformDriver: Send + Sync + 'static {
    const NAME: &'static str;
    const ID_TABLE: &'static [PlatformDeviceId] = &[];
    const OF_MATCH_TABLE: &'static [OfDeviceId] = &[];

    /// Binds to a matching device.
    fn probe(&self, pdev: &PlatformDevice) -> Result;

    /// Unbinds from a device, when either side goes away.
    fn remove(&self, pdev: &PlatformDevice) -> Result;
}

enum Match {
    Of,
    Id(&'static PlatformDeviceId),
    Name,
}

trait BusDriver: Send + Sync {
    fn name(&self) -> &'static str;
    fn match_device(&self, pdev: &PlatformDevice) -> Option<Match>;
    fn probe(&self, pdev: &PlatformDevice) -> Result;
    fn remove(&self, pdev: &PlatformDevice) -> Result;
}

struct Adapter<T: PlatformDriver>(T);

impl<T: PlatformDriver> BusDriver for Adapter<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn match_device(&self, pdev: &PlatformDevice) -> Option<Match> {
        if let Some(node) = pdev.dev.of_node() {
            if of::match_node(T::OF_MATCH_TABLE, node).is_some() {
                return Some(Match::Of);
            }
        }
        if !T::ID_TABLE.is_empty() {
            return T::ID_TABLE
                .iter()
                .find(|id| id.name == pdev.name)
                .map(Match::Id);
        }
        (T::NAME == pdev.name).then_some(Match::Name)
    }

    fn probe(&self, pdev: &PlatformDevice) -> Result {
        self.0.probe(pdev)
    }

    fn remove(&self, pdev: &PlatformDevice) -> Result {
        self.0.remove(pdev)
    }
}

#[derive(Default)]
struct BusInner {
    devices: Vec<Arc<PlatformDevice>>,
    drivers: Vec<Arc<dyn BusDriver>>,
}

/// The platform bus: registered devices, registered drivers and the bindings between them.
#[derive(Default)]
pub struct PlatformBus {
    inner: Mutex<BusInner>,
}

fn try_bind(driver: &Arc<dyn BusDriver>, pdev: &PlatformDevice) -> bool {
    let Some(found) = driver.match_device(pdev) else {
        return false;
    };
    *pdev.id_entry.write() = match found {
        Match::Id(id) => Some(id),
        Match::Of | Match::Name => None,
    };
    match driver.probe(pdev) {
        Ok(()) => {
            debug!("{}: bound to {}", pdev.dev.name(), driver.name());
            *pdev.driver.lock() = Some(driver.clone());
            true
        }
        Err(e) => {
            warn!(
                "{}: probe of {} failed with error {:?}",
                driver.name(),
                pdev.dev.name(),
                e
            );
            *pdev.id_entry.write() = None;
            false
        }
    }
}

fn unbind(pdev: &PlatformDevice) {
    let Some(driver) = pdev.driver.lock().take() else {
        return;
    };
    if let Err(e) = driver.remove(pdev) {
        warn!("{}: remove of {} failed: {:?}", driver.name(), pdev.dev.name(), e);
    }
    *pdev.id_entry.write() = None;
}

impl PlatformBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// `platform_driver_register`: adds the driver and probes every unbound device it
    /// matches. A failed probe leaves the device unbound and is not an error.
    ///
    /// `EBUSY` if a driver of the same name is registered.
    pub fn register_driver<T: PlatformDriver>(
        self: &Arc<Self>,
        driver: T,
    ) -> Result<DriverRegistration> {
        let mut inner = self.inner.lock();
        if inner.drivers.iter().any(|d| d.name() == T::NAME) {
            return Err(EBUSY);
        }
        let driver: Arc<dyn BusDriver> = Arc::new(Adapter(driver));
        for pdev in inner.devices.iter() {
            if pdev.driver.lock().is_none() {
                try_bind(&driver, pdev);
            }
        }
        inner.drivers.push(driver);
        Ok(DriverRegistration {
            bus: self.clone(),
            name: T::NAME,
        })
    }

    /// `platform_driver_unregister`: unbinds every device from the driver, then drops it.
    fn unregister_driver(&self, name: &str) {
        let mut inner = self.inner.lock();
        for pdev in inner.devices.iter() {
            if pdev.driver_name() == Some(name) {
                unbind(pdev);
            }
        }
        inner.drivers.retain(|d| d.name() != name);
    }

    /// `platform_device_register`: adds the device and binds the first driver whose probe
    /// succeeds.
    ///
    /// `EEXIST` if a device of the same name and id is registered.
    pub fn add_device(&self, pdev: PlatformDevice) -> Result<Arc<PlatformDevice>> {
        let mut inner = self.inner.lock();
        if inner
            .devices
            .iter()
            .any(|d| d.dev.name() == pdev.dev.name())
        {
            return Err(EEXIST);
        }
        let pdev = Arc::new(pdev);
        for driver in inner.drivers.iter() {
            if try_bind(driver, &pdev) {
                break;
            }
        }
        inner.devices.push(pdev.clone());
        Ok(pdev)
    }

    /// `platform_device_unregister`: unbinds the device and removes it from the bus.
    pub fn unregister_device(&self, pdev: &Arc<PlatformDevice>) -> Result {
        let mut inner = self.inner.lock();
        let pos = inner
            .devices
            .iter()
            .position(|d| Arc::ptr_eq(d, pdev))
            .ok_or(ENODEV)?;
        unbind(pdev);
        inner.devices.remove(pos);
        Ok(())
    }

    /// Names of the registered devices, in registration order.
    pub fn device_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .devices
            .iter()
            .map(|d| d.dev.name().to_string())
            .collect()
    }
}

/// A registered platform driver. Dropping it unregisters the driver.
pub struct DriverRegistration {
    bus: Arc<PlatformBus>,
    name: &'static str,
}

impl DriverRegistration {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for DriverRegistration {
    fn drop(&mut self) {
        self.bus.unregister_driver(self.name);
    }
}

/// Devices registered together, unregistered in reverse order on drop.
pub struct DeviceSet {
    bus: Arc<PlatformBus>,
    devices: Vec<Arc<PlatformDevice>>,
}

impl DeviceSet {
    /// `platform_add_devices`. On failure, the devices added so far are removed again.
    pub fn register(bus: &Arc<PlatformBus>, devices: Vec<PlatformDevice>) -> Result<Self> {
        let mut set = DeviceSet {
            bus: bus.clone(),
            devices: Vec::with_capacity(devices.len()),
        };
        for pdev in devices {
            // `set` unwinds the partial registration when dropped.
            set.devices.push(bus.add_device(pdev)?);
        }
        Ok(set)
    }

    pub fn devices(&self) -> &[Arc<PlatformDevice>] {
        &self.devices
    }
}

impl Drop for DeviceSet {
    fn drop(&mut self) {
        while let Some(pdev) = self.devices.pop() {
            if let Err(e) = self.bus.unregister_device(&pdev) {
                warn!("{}: unregister failed: {:?}", pdev.dev.name(), e);
            }
        }
    }
}
