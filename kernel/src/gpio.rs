//! GPIO descriptor consumer interface.
//!
//! C header: `include/linux/gpio/consumer.h`

use alloc::sync::Arc;

use crate::{device::Device, error::KernelResult as Result, of::DeviceNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// `struct gpio_desc`, as seen by a consumer.
pub trait GpioDesc: Send + Sync {
    /// `gpiod_get_direction`
    fn direction(&self) -> Result<Direction>;
    /// `gpiod_direction_input`
    fn direction_input(&self) -> Result;
    /// `gpiod_direction_output`, driving `value` once the line is an output.
    fn direction_output(&self, value: i32) -> Result;
    /// `gpiod_get_value`
    fn value(&self) -> i32;
    /// `gpiod_set_value`
    fn set_value(&self, value: i32);
}

/// The board's GPIO controller, handing out descriptors to consumers.
pub trait GpioProvider: Send + Sync {
    /// `devm_fwnode_get_gpiod_from_child`: the `<con_id>-gpios` line described by `child`,
    /// claimed for `dev` under `label`.
    fn get_from_child(
        &self,
        dev: &Device,
        con_id: &str,
        child: &DeviceNode,
        label: &str,
    ) -> Result<Arc<dyn GpioDesc>>;
}
