//! Transfers between the caller's buffers and driver memory.
//!
//! A read or write system call hands the driver a window of caller memory. A
//! [`UserSliceReader`] copies out of it (`copy_from_user`), a [`UserSliceWriter`] copies into
//! it (`copy_to_user`). A window created with `bad_address` stands for an unmapped range:
//! it reports its length but every copy through it fails with [`EFAULT`].

use alloc::vec::Vec;

use crate::{code::EFAULT, error::KernelResult as Result};

/// A reader for caller memory.
///
/// Used to incrementally read from the user slice.
pub struct UserSliceReader<'a> {
    data: Option<&'a [u8]>,
    length: usize,
}

impl<'a> UserSliceReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            length: data.len(),
            data: Some(data),
        }
    }

    /// A window of `length` bytes that cannot be read.
    pub fn bad_address(length: usize) -> Self {
        Self { data: None, length }
    }

    /// Skip the provided number of bytes.
    ///
    /// Returns an error if skipping more than the length of the buffer.
    pub fn skip(&mut self, num_skip: usize) -> Result {
        // Update `self.length` first since that's the fallible part of this operation.
        self.length = self.length.checked_sub(num_skip).ok_or(EFAULT)?;
        if let Some(data) = self.data {
            self.data = Some(&data[num_skip..]);
        }
        Ok(())
    }

    /// Create a reader that can access the same range of data.
    ///
    /// Reading from the clone does not advance the current reader.
    pub fn clone_reader(&self) -> UserSliceReader<'a> {
        UserSliceReader {
            data: self.data,
            length: self.length,
        }
    }

    /// Returns the number of bytes left to be read from this reader.
    ///
    /// Note that even reading less than this number of bytes may fail.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if no data is available in the io buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Reads raw data from the user slice into a kernel buffer.
    ///
    /// Fails with [`EFAULT`] if the read happens on a bad address, or if the read goes out of
    /// bounds of this [`UserSliceReader`]. Nothing is consumed on failure.
    pub fn read_slice(&mut self, out: &mut [u8]) -> Result {
        let len = out.len();
        if len > self.length {
            return Err(EFAULT);
        }
        let data = self.data.ok_or(EFAULT)?;
        let (head, tail) = data.split_at(len);
        out.copy_from_slice(head);
        self.data = Some(tail);
        self.length -= len;
        Ok(())
    }

    /// Reads the entirety of the user slice, appending it to the end of the provided buffer.
    ///
    /// Fails with [`EFAULT`] if the read happens on a bad address.
    pub fn read_all(mut self, buf: &mut Vec<u8>) -> Result {
        let len = self.length;
        buf.try_reserve(len)?;
        let start = buf.len();
        buf.resize(start + len, 0);
        if let Err(e) = self.read_slice(&mut buf[start..]) {
            buf.truncate(start);
            return Err(e);
        }
        Ok(())
    }
}

/// A writer for caller memory.
///
/// Used to incrementally write into the user slice.
pub struct UserSliceWriter<'a> {
    data: Option<&'a mut [u8]>,
    length: usize,
}

impl<'a> UserSliceWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            length: data.len(),
            data: Some(data),
        }
    }

    /// A window of `length` bytes that cannot be written.
    pub fn bad_address(length: usize) -> Self {
        Self { data: None, length }
    }

    /// Returns the amount of space remaining in this buffer.
    ///
    /// Note that even writing less than this number of bytes may fail.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if no more data can be written to this buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Writes raw data to this user pointer from a kernel buffer.
    ///
    /// Fails with [`EFAULT`] if the write happens on a bad address, or if the write goes out of
    /// bounds of this [`UserSliceWriter`]. Nothing is consumed on failure.
    pub fn write_slice(&mut self, data: &[u8]) -> Result {
        let len = data.len();
        if len > self.length {
            return Err(EFAULT);
        }
        let dst = self.data.take().ok_or(EFAULT)?;
        let (head, tail) = dst.split_at_mut(len);
        head.copy_from_slice(data);
        self.data = Some(tail);
        self.length -= len;
        Ok(())
    }
}
