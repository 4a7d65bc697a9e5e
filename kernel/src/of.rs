//! Device tree nodes.
//!
//! C header: `include/linux/of.h`

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};

use crate::{
    code::{EINVAL, ENODATA},
    error::KernelResult as Result,
};

/// A property value as it appears in a device tree source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    String(String),
    U32(u32),
    Empty,
}

/// A node of the flattened device tree, with its properties and children.
#[derive(Debug, Clone)]
pub struct DeviceNode {
    name: String,
    compatible: Vec<String>,
    properties: BTreeMap<String, Property>,
    children: Vec<Arc<DeviceNode>>,
    available: bool,
}

impl DeviceNode {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            compatible: Vec::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
            available: true,
        }
    }

    pub fn compatible(mut self, compatible: &str) -> Self {
        self.compatible.push(compatible.to_string());
        self
    }

    pub fn string_property(mut self, name: &str, value: &str) -> Self {
        self.properties
            .insert(name.to_string(), Property::String(value.to_string()));
        self
    }

    pub fn u32_property(mut self, name: &str, value: u32) -> Self {
        self.properties.insert(name.to_string(), Property::U32(value));
        self
    }

    pub fn child(mut self, child: DeviceNode) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    /// Marks the node `status = "disabled"`.
    pub fn disabled(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_compatible(&self, compatible: &str) -> bool {
        self.compatible.iter().any(|c| c == compatible)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// `of_property_read_string`: `EINVAL` when absent, `ENODATA` when not a string.
    pub fn read_string(&self, name: &str) -> Result<&str> {
        match self.property(name).ok_or(EINVAL)? {
            Property::String(s) => Ok(s),
            _ => Err(ENODATA),
        }
    }

    /// `of_property_read_u32`: `EINVAL` when absent, `ENODATA` when not a cell.
    pub fn read_u32(&self, name: &str) -> Result<u32> {
        match self.property(name).ok_or(EINVAL)? {
            Property::U32(v) => Ok(*v),
            _ => Err(ENODATA),
        }
    }

    /// `of_get_child_count`
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// `for_each_available_child_of_node`
    pub fn available_children(&self) -> impl Iterator<Item = &Arc<DeviceNode>> {
        self.children.iter().filter(|c| c.available)
    }
}

/// An entry of a driver's `of_match_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfDeviceId {
    pub compatible: &'static str,
    pub data: usize,
}

impl OfDeviceId {
    pub const fn new(compatible: &'static str, data: usize) -> Self {
        Self { compatible, data }
    }
}

/// `of_match_node`
pub fn match_node(table: &'static [OfDeviceId], node: &DeviceNode) -> Option<&'static OfDeviceId> {
    table.iter().find(|id| node.is_compatible(id.compatible))
}
