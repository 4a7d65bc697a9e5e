use alloc::{string::String, sync::Arc};
use core::fmt::Write;

use kernel::{
    code::{EINVAL, ENODEV},
    device::Device,
    error::KernelResult as Result,
    gpio::Direction,
    sysfs::{kstrtol, sysfs_streq, AttributeGroup, DeviceAttribute},
};

use crate::GpiodevPrivate;

fn private_of(dev: &Device) -> Result<Arc<GpiodevPrivate>> {
    dev.drvdata::<GpiodevPrivate>().ok_or(ENODEV)
}

fn direction_show(dev: &Device, _attr: &DeviceAttribute, buf: &mut String) -> Result {
    let private = private_of(dev)?;
    let direction = match private.desc.direction()? {
        Direction::Output => "out",
        Direction::Input => "in",
    };
    writeln!(buf, "{}", direction)?;
    Ok(())
}

fn direction_store(dev: &Device, _attr: &DeviceAttribute, buf: &[u8]) -> Result<usize> {
    let private = private_of(dev)?;
    if sysfs_streq(buf, "in") {
        private.desc.direction_input()?;
    } else if sysfs_streq(buf, "out") {
        private.desc.direction_output(0)?;
    } else {
        return Err(EINVAL);
    }
    Ok(buf.len())
}

fn value_show(dev: &Device, _attr: &DeviceAttribute, buf: &mut String) -> Result {
    let private = private_of(dev)?;
    writeln!(buf, "{}", private.desc.value())?;
    Ok(())
}

fn value_store(dev: &Device, _attr: &DeviceAttribute, buf: &[u8]) -> Result<usize> {
    let private = private_of(dev)?;
    let value = i32::try_from(kstrtol(buf, 0)?)?;
    private.desc.set_value(value);
    Ok(buf.len())
}

fn label_show(dev: &Device, _attr: &DeviceAttribute, buf: &mut String) -> Result {
    let private = private_of(dev)?;
    writeln!(buf, "{}", private.label)?;
    Ok(())
}

static DEV_ATTR_DIRECTION: DeviceAttribute =
    DeviceAttribute::rw("direction", direction_show, direction_store);
static DEV_ATTR_VALUE: DeviceAttribute = DeviceAttribute::rw("value", value_show, value_store);
static DEV_ATTR_LABEL: DeviceAttribute = DeviceAttribute::ro("label", label_show);

static GPIO_ATTRS: [&DeviceAttribute; 3] = [&DEV_ATTR_DIRECTION, &DEV_ATTR_VALUE, &DEV_ATTR_LABEL];

pub static GPIO_ATTR_GROUP: AttributeGroup = AttributeGroup { attrs: &GPIO_ATTRS };
