//! File operations for character devices.
//!
//! C header: `include/linux/fs.h`

use alloc::boxed::Box;
use core::ffi::c_int;

use bitflags::bitflags;

use crate::{
    buf::{UserSliceReader, UserSliceWriter},
    code::{EINVAL, ESPIPE},
    error::KernelResult as Result,
};

bitflags! {
    /// The `f_mode` bits describing how a file was opened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileMode: u32 {
        /// `FMODE_READ`
        const READ = 0x1;
        /// `FMODE_WRITE`
        const WRITE = 0x2;
    }
}

impl FileMode {
    /// Derives the mode from the `O_ACCMODE` bits of open flags.
    pub fn from_access_flags(flags: u32) -> Result<Self> {
        match flags & O_ACCMODE {
            O_RDONLY => Ok(FileMode::READ),
            O_WRONLY => Ok(FileMode::WRITE),
            O_RDWR => Ok(FileMode::READ | FileMode::WRITE),
            _ => Err(EINVAL),
        }
    }
}

pub const O_RDONLY: u32 = 0o0;
pub const O_WRONLY: u32 = 0o1;
pub const O_RDWR: u32 = 0o2;
pub const O_ACCMODE: u32 = 0o3;

pub const SEEK_SET: c_int = 0;
pub const SEEK_CUR: c_int = 1;
pub const SEEK_END: c_int = 2;

/// Equivalent to [`std::io::SeekFrom`], with signed offsets like `loff_t`.
///
/// [`std::io::SeekFrom`]: https://doc.rust-lang.org/std/io/enum.SeekFrom.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Pointer will be set to the given offset.
    Start(i64),
    /// Pointer will be set to the size of the file plus the given offset.
    End(i64),
    /// Pointer will be set to the current position plus the given offset.
    Current(i64),
}

impl SeekFrom {
    /// Decodes an `lseek` `whence`; anything other than `SEEK_SET`, `SEEK_CUR` and
    /// `SEEK_END` is `EINVAL`.
    pub fn from_whence(offset: i64, whence: c_int) -> Result<Self> {
        match whence {
            SEEK_SET => Ok(SeekFrom::Start(offset)),
            SEEK_CUR => Ok(SeekFrom::Current(offset)),
            SEEK_END => Ok(SeekFrom::End(offset)),
            _ => Err(EINVAL),
        }
    }
}

/// Wraps the kernel's `struct file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    minor: u32,
    mode: FileMode,
}

impl File {
    pub fn new(minor: u32, mode: FileMode) -> Self {
        Self { minor, mode }
    }

    /// Minor number of the inode this file was opened through.
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Returns the `f_mode` of the file.
    pub fn mode(&self) -> FileMode {
        self.mode
    }
}

pub type ReadFn<T> = Option<fn(&mut T, &File, &mut UserSliceWriter<'_>) -> Result<usize>>;
pub type WriteFn<T> = Option<fn(&mut T, &File, &mut UserSliceReader<'_>) -> Result<usize>>;
pub type SeekFn<T> = Option<fn(&mut T, &File, SeekFrom) -> Result<u64>>;

/// Corresponds to the kernel's `struct file_operations`.
///
/// An instance is created by `open` and lives until the file is released; it plays the
/// role of `file->private_data`. Operations left as `None` behave like a missing entry in
/// the C table.
pub trait FileOperations: Sized + Send + 'static {
    /// Per-inode data handed to `open`, the equivalent of what drivers recover with
    /// `container_of(inode->i_cdev, ...)`.
    type OpenData: Send + Sync + 'static;

    /// Creates a new instance of this file.
    ///
    /// Corresponds to the `open` function pointer in `struct file_operations`.
    fn open(data: &Self::OpenData, file: &File) -> Result<Self>;

    /// Cleans up after the last reference to the file goes away.
    ///
    /// Corresponds to the `release` function pointer in `struct file_operations`.
    fn release(self, _file: &File) {}

    /// Reads data from this file to userspace.
    ///
    /// Corresponds to the `read` function pointer in `struct file_operations`.
    const READ: ReadFn<Self> = None;

    /// Writes data from userspace to this file.
    ///
    /// Corresponds to the `write` function pointer in `struct file_operations`.
    const WRITE: WriteFn<Self> = None;

    /// Changes the position of the file.
    ///
    /// Corresponds to the `llseek` function pointer in `struct file_operations`.
    const SEEK: SeekFn<Self> = None;
}

/// An open file as seen by the caller of the system calls.
pub trait FileHandle: Send {
    fn file(&self) -> &File;

    /// `read(2)`. `EINVAL` without a read operation.
    fn read(&mut self, buf: &mut UserSliceWriter<'_>) -> Result<usize>;

    /// `write(2)`. `EINVAL` without a write operation.
    fn write(&mut self, buf: &mut UserSliceReader<'_>) -> Result<usize>;

    /// `lseek(2)`. `ESPIPE` without a seek operation.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Drops the last reference, running `release`.
    fn release(self: Box<Self>);
}

pub(crate) struct OpenFile<T: FileOperations> {
    file: File,
    inner: T,
}

impl<T: FileOperations> OpenFile<T> {
    pub(crate) fn open(data: &T::OpenData, file: File) -> Result<Self> {
        let inner = T::open(data, &file)?;
        Ok(Self { file, inner })
    }
}

impl<T: FileOperations> FileHandle for OpenFile<T> {
    fn file(&self) -> &File {
        &self.file
    }

    fn read(&mut self, buf: &mut UserSliceWriter<'_>) -> Result<usize> {
        let read = T::READ.ok_or(EINVAL)?;
        read(&mut self.inner, &self.file, buf)
    }

    fn write(&mut self, buf: &mut UserSliceReader<'_>) -> Result<usize> {
        let write = T::WRITE.ok_or(EINVAL)?;
        write(&mut self.inner, &self.file, buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let seek = T::SEEK.ok_or(ESPIPE)?;
        seek(&mut self.inner, &self.file, pos)
    }

    fn release(self: Box<Self>) {
        let OpenFile { file, inner } = *self;
        inner.release(&file);
    }
}
