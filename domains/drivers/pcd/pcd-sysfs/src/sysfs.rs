use alloc::{string::String, sync::Arc};
use core::fmt::Write;

use kernel::{
    code::ENODEV,
    dev_info,
    device::Device,
    error::KernelResult as Result,
    sysfs::{AttributeGroup, DeviceAttribute},
};
use pcdev::platform::PcdevPrivate;

/// The attributes live on the class device; the record hangs off its parent.
fn private_of(dev: &Device) -> Result<Arc<PcdevPrivate>> {
    dev.parent()
        .and_then(|parent| parent.drvdata::<PcdevPrivate>())
        .ok_or(ENODEV)
}

fn show_max_size(dev: &Device, _attr: &DeviceAttribute, buf: &mut String) -> Result {
    let private = private_of(dev)?;
    writeln!(buf, "{}", private.record().capacity())?;
    Ok(())
}

fn store_max_size(dev: &Device, _attr: &DeviceAttribute, buf: &[u8]) -> Result<usize> {
    let private = private_of(dev)?;
    let count = private.record().store_capacity(buf)?;
    dev_info!(
        dev,
        "Re-allocated memory for the device {}",
        private.record().capacity()
    );
    Ok(count)
}

fn show_serial_num(dev: &Device, _attr: &DeviceAttribute, buf: &mut String) -> Result {
    let private = private_of(dev)?;
    writeln!(buf, "{}", private.record().serial())?;
    Ok(())
}

static DEV_ATTR_MAX_SIZE: DeviceAttribute =
    DeviceAttribute::rw("max_size", show_max_size, store_max_size);
static DEV_ATTR_SERIAL_NUM: DeviceAttribute = DeviceAttribute::ro("serial_num", show_serial_num);

static PCD_ATTRS: [&DeviceAttribute; 2] = [&DEV_ATTR_MAX_SIZE, &DEV_ATTR_SERIAL_NUM];

/// `max_size` (0644) and `serial_num` (0444).
pub static PCD_ATTR_GROUP: AttributeGroup = AttributeGroup { attrs: &PCD_ATTRS };
