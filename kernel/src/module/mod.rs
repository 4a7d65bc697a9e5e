use alloc::sync::Arc;

use crate::{
    code::ENODEV,
    error::KernelResult as Result,
    gpio::GpioProvider,
    platform::PlatformBus,
    pr_err, pr_info,
};

/// The top level entrypoint to implementing a kernel module.
///
/// For any teardown or cleanup operations, your type may implement [`Drop`].
pub trait Module: Sized + Sync {
    /// Called at module initialization time.
    ///
    /// Use this method to perform whatever setup or registration your module
    /// should do.
    ///
    /// Equivalent to the `module_init` macro in the C API.
    fn init(module: &'static ThisModule, host: &Host) -> Result<Self>;
}

/// Equivalent to `THIS_MODULE` in the C API: the `modinfo` of a module.
#[derive(Debug)]
pub struct ThisModule {
    name: &'static str,
    author: &'static str,
    description: &'static str,
    license: &'static str,
}

impl ThisModule {
    pub const fn new(
        name: &'static str,
        author: &'static str,
        description: &'static str,
        license: &'static str,
    ) -> Self {
        Self {
            name,
            author,
            description,
            license,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn author(&self) -> &'static str {
        self.author
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn license(&self) -> &'static str {
        self.license
    }
}

/// What a module sees of the running kernel: the platform bus it registers drivers and
/// devices on, and the GPIO controller backing `gpiod_get` lookups, if the board has one.
#[derive(Clone)]
pub struct Host {
    platform: Arc<PlatformBus>,
    gpio: Option<Arc<dyn GpioProvider>>,
}

#[allow(clippy::new_without_default)]
impl Host {
    pub fn new() -> Self {
        Self {
            platform: Arc::new(PlatformBus::new()),
            gpio: None,
        }
    }

    pub fn with_gpio(mut self, provider: Arc<dyn GpioProvider>) -> Self {
        self.gpio = Some(provider);
        self
    }

    pub fn platform_bus(&self) -> &Arc<PlatformBus> {
        &self.platform
    }

    /// Fails with `ENODEV` on a board without a GPIO controller.
    pub fn gpio(&self) -> Result<Arc<dyn GpioProvider>> {
        self.gpio.clone().ok_or(ENODEV)
    }
}

/// Runs `M::init`, logging the outcome like `do_init_module`.
pub fn load<M: Module>(module: &'static ThisModule, host: &Host) -> Result<M> {
    match M::init(module, host) {
        Ok(m) => {
            pr_info!("{}: module loaded", module.name());
            Ok(m)
        }
        Err(e) => {
            pr_err!("{}: init failed: {:?}", module.name(), e);
            Err(e)
        }
    }
}

/// Declares the module's `modinfo` and its loader.
///
/// Expands to a `THIS_MODULE` static and an `init_module(host)` function returning the
/// loaded module; dropping the returned value unloads it.
///
/// # Examples
///
/// ```ignore
/// kernel::module! {
///     type: RustChrdev,
///     name: "rust_chrdev",
///     author: "Rust for Linux Contributors",
///     description: "Rust character device sample",
///     license: "GPL",
/// }
/// ```
#[macro_export]
macro_rules! module {
    (
        type: $ty:ty,
        name: $name:literal,
        author: $author:literal,
        description: $description:literal,
        license: $license:literal $(,)?
    ) => {
        pub static THIS_MODULE: $crate::ThisModule =
            $crate::ThisModule::new($name, $author, $description, $license);

        /// Loads the module.
        pub fn init_module(host: &$crate::Host) -> $crate::error::KernelResult<$ty> {
            $crate::module::load::<$ty>(&THIS_MODULE, host)
        }
    };
}
