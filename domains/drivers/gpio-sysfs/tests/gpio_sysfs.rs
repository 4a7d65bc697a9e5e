use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use gpio_sysfs::{GpioSysfsModule, GpiodevPrivate};
use kernel::{
    code::{EINVAL, ENODEV, ENOENT},
    device::Device,
    error::KernelResult as Result,
    gpio::{Direction, GpioDesc, GpioProvider},
    of::DeviceNode,
    platform::{PlatformDevice, PLATFORM_DEVID_NONE},
    sync::Mutex,
    Host,
};

struct FakeLine {
    direction: Mutex<Direction>,
    value: AtomicI32,
}

impl GpioDesc for FakeLine {
    fn direction(&self) -> Result<Direction> {
        Ok(*self.direction.lock())
    }

    fn direction_input(&self) -> Result {
        *self.direction.lock() = Direction::Input;
        Ok(())
    }

    fn direction_output(&self, value: i32) -> Result {
        *self.direction.lock() = Direction::Output;
        self.value.store(value, Ordering::SeqCst);
        Ok(())
    }

    fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    fn set_value(&self, value: i32) {
        self.value.store(i32::from(value != 0), Ordering::SeqCst);
    }
}

/// Hands out a line for every child with a `bone-gpios` property.
#[derive(Default)]
struct FakeController {
    claimed: Mutex<Vec<(u32, String)>>,
}

impl GpioProvider for FakeController {
    fn get_from_child(
        &self,
        _dev: &Device,
        con_id: &str,
        child: &DeviceNode,
        label: &str,
    ) -> Result<Arc<dyn GpioDesc>> {
        let line = child
            .read_u32(&format!("{}-gpios", con_id))
            .map_err(|_| ENOENT)?;
        self.claimed.lock().push((line, label.to_string()));
        Ok(Arc::new(FakeLine {
            direction: Mutex::new(Direction::Input),
            value: AtomicI32::new(1),
        }))
    }
}

fn line(name: &str, gpio: u32) -> DeviceNode {
    DeviceNode::new(name).u32_property("bone-gpios", gpio)
}

fn bone_gpio_node() -> DeviceNode {
    DeviceNode::new("bone_gpio_devs")
        .compatible("org,bone-gpio-sysfs")
        .child(line("gpio1", 21).string_property("label", "usrled0:gpio1.21"))
        .child(line("gpio2", 22).string_property("label", "usrled1:gpio1.22"))
        .child(line("gpio3", 23))
        .child(line("gpio4", 24).disabled())
}

fn load() -> (Host, Arc<FakeController>, GpioSysfsModule) {
    let controller = Arc::new(FakeController::default());
    let host = Host::new().with_gpio(controller.clone());
    let module = gpio_sysfs::init_module(&host).unwrap();
    (host, controller, module)
}

fn add(host: &Host, node: DeviceNode) -> Arc<PlatformDevice> {
    host.platform_bus()
        .add_device(PlatformDevice::new("bone_gpio_devs", PLATFORM_DEVID_NONE).with_of_node(node))
        .unwrap()
}

#[test]
fn exports_available_children() {
    let (host, controller, module) = load();
    let pdev = add(&host, bone_gpio_node());
    assert_eq!(pdev.driver_name(), Some("bone-gpio-sysfs"));
    assert_eq!(
        module.class().device_names(),
        ["usrled0:gpio1.21", "usrled1:gpio1.22", "unkngpio2"]
    );
    let claimed = controller.claimed.lock().clone();
    assert_eq!(claimed.len(), 3);
    assert_eq!(claimed[2], (23, "unkngpio2".to_string()));

    let led = module.class().find("usrled0:gpio1.21").unwrap();
    assert_eq!(led.attribute_names(), ["direction", "value", "label"]);
    assert_eq!(led.devt(), None);
    assert_eq!(led.parent().unwrap().name(), "bone_gpio_devs");
    assert_eq!(led.show("label").unwrap(), "usrled0:gpio1.21\n");
    assert_eq!(led.drvdata::<GpiodevPrivate>().unwrap().label(), "usrled0:gpio1.21");
}

#[test]
fn lines_start_as_low_outputs() {
    let (host, _controller, module) = load();
    add(&host, bone_gpio_node());
    let led = module.class().find("unkngpio2").unwrap();
    assert_eq!(led.show("direction").unwrap(), "out\n");
    assert_eq!(led.show("value").unwrap(), "0\n");
}

#[test]
fn direction_and_value_stores() {
    let (host, _controller, module) = load();
    add(&host, bone_gpio_node());
    let led = module.class().find("usrled1:gpio1.22").unwrap();

    assert_eq!(led.store("value", b"1\n"), Ok(2));
    assert_eq!(led.show("value").unwrap(), "1\n");
    assert_eq!(led.store("value", b"0x0"), Ok(3));
    assert_eq!(led.show("value").unwrap(), "0\n");
    assert_eq!(led.store("value", b"on"), Err(EINVAL));

    assert_eq!(led.store("direction", b"in\n"), Ok(3));
    assert_eq!(led.show("direction").unwrap(), "in\n");
    assert_eq!(led.store("direction", b"out"), Ok(3));
    assert_eq!(led.show("direction").unwrap(), "out\n");
    assert_eq!(led.store("direction", b"sideways"), Err(EINVAL));
    assert_eq!(led.show("direction").unwrap(), "out\n");

    assert!(led.store("label", b"renamed").is_err());
}

#[test]
fn node_without_children_is_rejected() {
    let (host, _controller, module) = load();
    let empty = DeviceNode::new("bone_gpio_devs").compatible("org,bone-gpio-sysfs");
    let pdev = add(&host, empty);
    assert!(pdev.driver_name().is_none());
    assert!(module.class().device_names().is_empty());
}

#[test]
fn missing_line_unwinds_earlier_exports() {
    let (host, _controller, module) = load();
    let node = DeviceNode::new("bone_gpio_devs")
        .compatible("org,bone-gpio-sysfs")
        .child(line("gpio1", 21).string_property("label", "ok"))
        .child(DeviceNode::new("gpio2").string_property("label", "no-line"));
    let pdev = add(&host, node);
    assert!(pdev.driver_name().is_none());
    assert!(module.class().device_names().is_empty());
}

#[test]
fn unbinding_removes_class_devices() {
    let (host, _controller, module) = load();
    let pdev = add(&host, bone_gpio_node());
    host.platform_bus().unregister_device(&pdev).unwrap();
    assert!(module.class().device_names().is_empty());
}

#[test]
fn board_without_gpio_controller() {
    assert!(matches!(gpio_sysfs::init_module(&Host::new()), Err(ENODEV)));
}
