//! Device attributes, the files under a device's sysfs directory.
//!
//! C header: `include/linux/sysfs.h`

use alloc::string::String;

use crate::{
    code::{EACCES, EEXIST, EINVAL, ENOENT, ERANGE},
    device::Device,
    error::KernelResult as Result,
    PAGE_SIZE,
};

pub const S_IRUSR: u16 = 0o400;
pub const S_IWUSR: u16 = 0o200;
pub const S_IRUGO: u16 = 0o444;
pub const S_IWUGO: u16 = 0o222;

/// Formats the attribute into `buf`, the equivalent of a `show` callback.
pub type ShowFn = fn(dev: &Device, attr: &DeviceAttribute, buf: &mut String) -> Result;
/// Consumes user text, returning how much of it was used.
pub type StoreFn = fn(dev: &Device, attr: &DeviceAttribute, buf: &[u8]) -> Result<usize>;

/// `struct device_attribute`
pub struct DeviceAttribute {
    name: &'static str,
    mode: u16,
    show: Option<ShowFn>,
    store: Option<StoreFn>,
}

impl DeviceAttribute {
    pub const fn new(
        name: &'static str,
        mode: u16,
        show: Option<ShowFn>,
        store: Option<StoreFn>,
    ) -> Self {
        Self {
            name,
            mode,
            show,
            store,
        }
    }

    /// `DEVICE_ATTR_RO`
    pub const fn ro(name: &'static str, show: ShowFn) -> Self {
        Self::new(name, S_IRUGO, Some(show), None)
    }

    /// `DEVICE_ATTR_RW`: readable by everybody, writable by the owner.
    pub const fn rw(name: &'static str, show: ShowFn, store: StoreFn) -> Self {
        Self::new(name, S_IRUGO | S_IWUSR, Some(show), Some(store))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn mode(&self) -> u16 {
        self.mode
    }
}

/// `struct attribute_group`
pub struct AttributeGroup {
    pub attrs: &'static [&'static DeviceAttribute],
}

impl Device {
    /// `device_create_file`. `EEXIST` if an attribute of that name is present.
    pub fn create_file(&self, attr: &'static DeviceAttribute) -> Result {
        let mut attrs = self.attrs.write();
        if attrs.iter().any(|a| a.name == attr.name) {
            return Err(EEXIST);
        }
        attrs.push(attr);
        Ok(())
    }

    /// `device_remove_file`
    pub fn remove_file(&self, attr: &'static DeviceAttribute) {
        self.attrs.write().retain(|a| a.name != attr.name);
    }

    /// `sysfs_create_group`. All attributes are added or none.
    pub fn create_group(&self, group: &'static AttributeGroup) -> Result {
        let mut attrs = self.attrs.write();
        for attr in group.attrs {
            if attrs.iter().any(|a| a.name == attr.name) {
                return Err(EEXIST);
            }
        }
        attrs.extend_from_slice(group.attrs);
        Ok(())
    }

    /// Names of the attributes, in creation order.
    pub fn attribute_names(&self) -> alloc::vec::Vec<&'static str> {
        self.attrs.read().iter().map(|a| a.name).collect()
    }

    fn attribute(&self, name: &str) -> Result<&'static DeviceAttribute> {
        self.attrs
            .read()
            .iter()
            .find(|a| a.name == name)
            .copied()
            .ok_or(ENOENT)
    }

    /// Reads the attribute file `name`. The text is cut at `PAGE_SIZE`.
    ///
    /// `ENOENT` for a missing attribute, `EACCES` for one that is not readable.
    pub fn show(&self, name: &str) -> Result<String> {
        let attr = self.attribute(name)?;
        let show = match attr.show {
            Some(show) if attr.mode & S_IRUGO != 0 => show,
            _ => return Err(EACCES),
        };
        let mut buf = String::new();
        show(self, attr, &mut buf)?;
        if buf.len() > PAGE_SIZE {
            let mut end = PAGE_SIZE;
            while !buf.is_char_boundary(end) {
                end -= 1;
            }
            buf.truncate(end);
        }
        Ok(buf)
    }

    /// Writes `buf` to the attribute file `name`.
    ///
    /// `ENOENT` for a missing attribute, `EACCES` for one that is not writable, `EINVAL` for
    /// input larger than a page.
    pub fn store(&self, name: &str, buf: &[u8]) -> Result<usize> {
        let attr = self.attribute(name)?;
        let store = match attr.store {
            Some(store) if attr.mode & S_IWUGO != 0 => store,
            _ => return Err(EACCES),
        };
        if buf.len() > PAGE_SIZE {
            return Err(EINVAL);
        }
        store(self, attr, buf)
    }
}

fn strip_newline(s: &[u8]) -> &[u8] {
    s.strip_suffix(b"\n").unwrap_or(s)
}

/// Works out the radix like `_parse_integer_fixup_radix`: with `base == 0` a `0x` prefix
/// selects 16 and a leading `0` selects 8; with `base == 16` a `0x` prefix is skipped.
fn fixup_radix(s: &[u8], base: u32) -> Result<(u32, &[u8])> {
    let hex_prefix =
        s.len() > 2 && s[0] == b'0' && (s[1] | 0x20) == b'x' && s[2].is_ascii_hexdigit();
    match base {
        0 if hex_prefix => Ok((16, &s[2..])),
        0 if s.first() == Some(&b'0') => Ok((8, s)),
        0 => Ok((10, s)),
        16 if hex_prefix => Ok((16, &s[2..])),
        2..=36 => Ok((base, s)),
        _ => Err(EINVAL),
    }
}

/// `kstrtol`: converts a string to a signed long.
///
/// Accepts an optional sign and a single trailing newline. Anything else that is not a
/// digit of the radix is `EINVAL`; overflow is `ERANGE`.
pub fn kstrtol(s: &[u8], base: u32) -> Result<i64> {
    let s = strip_newline(s);
    let (negative, s) = match s.first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = fixup_radix(s, base)?;
    if digits.is_empty() {
        return Err(EINVAL);
    }
    let mut acc: u64 = 0;
    for &c in digits {
        let digit = char::from(c).to_digit(radix).ok_or(EINVAL)?;
        acc = acc
            .checked_mul(u64::from(radix))
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(ERANGE)?;
    }
    if negative {
        if acc > i64::MAX as u64 + 1 {
            return Err(ERANGE);
        }
        Ok((acc as i64).wrapping_neg())
    } else {
        i64::try_from(acc).map_err(|_| ERANGE)
    }
}

/// `sysfs_streq`: equality that ignores one trailing newline on either side.
pub fn sysfs_streq(a: &[u8], b: &str) -> bool {
    strip_newline(a) == strip_newline(b.as_bytes())
}
