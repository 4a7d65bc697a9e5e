//! Synchronisation primitives.
//!
//! All locks spin. Entry points of the drivers never sleep while holding one.

pub use spin::{
    Lazy, Mutex, MutexGuard, Once, RwLock, RwLockReadGuard, RwLockUpgradableGuard,
    RwLockWriteGuard,
};

/// `spinlock_t`.
pub type SpinLock<T> = Mutex<T>;
/// `rwlock_t`, used where readers may run side by side.
pub type RwSpinLock<T> = RwLock<T>;
