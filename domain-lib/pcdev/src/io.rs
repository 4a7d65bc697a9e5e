//! Reads, writes and seeks bounded by the device capacity.
//!
//! The capacity is taken from the record on every call, so a session whose position lies
//! past the end of a shrunk device sees no data and no space instead of failing.

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    code::{EINVAL, ENOSPC},
    error::KernelResult as Result,
    fs::SeekFrom,
};
use log::debug;

use crate::{DeviceRecord, Session};

/// Moves the session's position. The target must lie within `0..=capacity`, otherwise
/// `EINVAL` and the position is kept.
pub fn seek(record: &DeviceRecord, session: &mut Session, pos: SeekFrom) -> Result<u64> {
    let capacity = i64::try_from(record.capacity())?;
    let cursor = i64::try_from(session.cursor)?;
    debug!("lseek requested, current file position = {}", cursor);
    let target = match pos {
        SeekFrom::Start(offset) => Some(offset),
        SeekFrom::Current(offset) => cursor.checked_add(offset),
        SeekFrom::End(offset) => capacity.checked_add(offset),
    }
    .ok_or(EINVAL)?;
    if !(0..=capacity).contains(&target) {
        return Err(EINVAL);
    }
    session.cursor = usize::try_from(target)?;
    debug!("new value of the file position = {}", target);
    Ok(target as u64)
}

/// Copies up to `out.len()` bytes from the position on. At or past the end this returns 0.
///
/// A destination that cannot be written is `EFAULT`; the position is kept.
pub fn read(
    record: &DeviceRecord,
    session: &mut Session,
    out: &mut UserSliceWriter<'_>,
) -> Result<usize> {
    let buffer = record.buffer().read();
    let start = session.cursor;
    let count = out.len().min(buffer.len().saturating_sub(start));
    debug!("read requested for {} bytes at {}", out.len(), start);
    if count == 0 {
        return Ok(0);
    }
    out.write_slice(&buffer[start..start + count])?;
    session.cursor += count;
    debug!("number of bytes successfully read = {}", count);
    Ok(count)
}

/// Copies up to `src.len()` bytes into device memory from the position on.
///
/// Without room left this is `ENOSPC`. A source that cannot be read is `EFAULT`. Device
/// memory and the position are untouched on failure.
pub fn write(
    record: &DeviceRecord,
    session: &mut Session,
    src: &mut UserSliceReader<'_>,
) -> Result<usize> {
    let mut buffer = record.buffer().write();
    let start = session.cursor;
    let count = src.len().min(buffer.len().saturating_sub(start));
    debug!("write requested for {} bytes at {}", src.len(), start);
    if count == 0 {
        return Err(ENOSPC);
    }
    src.read_slice(&mut buffer[start..start + count])?;
    session.cursor += count;
    debug!("number of bytes successfully written = {}", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use kernel::{code::EFAULT, fs::FileMode};

    use super::*;
    use crate::{DeviceArena, Permission};

    fn setup(capacity: usize) -> (Arc<DeviceRecord>, Session) {
        let arena = DeviceArena::new();
        let record = DeviceRecord::new(capacity, Permission::ReadWrite, "PCDEV3XYZ123").unwrap();
        let id = arena.insert(record).unwrap();
        let session = arena.open(id, FileMode::READ | FileMode::WRITE).unwrap();
        (arena.get(id).unwrap(), session)
    }

    fn write_bytes(record: &DeviceRecord, session: &mut Session, data: &[u8]) -> Result<usize> {
        write(record, session, &mut UserSliceReader::new(data))
    }

    fn read_bytes(record: &DeviceRecord, session: &mut Session, n: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; n];
        let got = read(record, session, &mut UserSliceWriter::new(&mut out))?;
        out.truncate(got);
        Ok(out)
    }

    #[test]
    fn write_seek_read_scenario() {
        let (record, mut session) = setup(1024);
        assert_eq!(write_bytes(&record, &mut session, &[7u8; 300]), Ok(300));
        assert_eq!(session.cursor(), 300);
        assert_eq!(seek(&record, &mut session, SeekFrom::End(-100)), Ok(924));
        let data = read_bytes(&record, &mut session, 200).unwrap();
        assert_eq!(data.len(), 100);
        assert_eq!(session.cursor(), 1024);
    }

    #[test]
    fn read_at_end_is_empty_but_write_at_end_fails() {
        let (record, mut session) = setup(16);
        seek(&record, &mut session, SeekFrom::End(0)).unwrap();
        assert_eq!(read_bytes(&record, &mut session, 4), Ok(Vec::new()));
        assert_eq!(write_bytes(&record, &mut session, b"x"), Err(ENOSPC));
        assert_eq!(session.cursor(), 16);
    }

    #[test]
    fn empty_write_with_room_is_enospc() {
        let (record, mut session) = setup(16);
        assert_eq!(write_bytes(&record, &mut session, b""), Err(ENOSPC));
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn seek_bounds() {
        let (record, mut session) = setup(100);
        assert_eq!(seek(&record, &mut session, SeekFrom::Start(100)), Ok(100));
        assert_eq!(seek(&record, &mut session, SeekFrom::Start(101)), Err(EINVAL));
        assert_eq!(seek(&record, &mut session, SeekFrom::Start(-1)), Err(EINVAL));
        assert_eq!(seek(&record, &mut session, SeekFrom::End(1)), Err(EINVAL));
        assert_eq!(seek(&record, &mut session, SeekFrom::Current(-100)), Ok(0));
        assert_eq!(seek(&record, &mut session, SeekFrom::Current(-1)), Err(EINVAL));
        assert_eq!(seek(&record, &mut session, SeekFrom::Current(i64::MAX)), Err(EINVAL));
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn writes_land_at_the_position_only() {
        let (record, mut session) = setup(16);
        seek(&record, &mut session, SeekFrom::Start(4)).unwrap();
        assert_eq!(write_bytes(&record, &mut session, b"abc"), Ok(3));
        let contents = record.contents();
        assert_eq!(&contents[4..7], b"abc");
        assert!(contents[..4].iter().all(|b| *b == 0));
        assert!(contents[7..].iter().all(|b| *b == 0));
    }

    #[test]
    fn write_is_clipped_to_capacity() {
        let (record, mut session) = setup(8);
        seek(&record, &mut session, SeekFrom::Start(5)).unwrap();
        assert_eq!(write_bytes(&record, &mut session, b"123456"), Ok(3));
        assert_eq!(&record.contents()[5..], b"123");
        assert_eq!(session.cursor(), 8);
    }

    #[test]
    fn faults_keep_position_and_memory() {
        let (record, mut session) = setup(8);
        let mut bad_src = UserSliceReader::bad_address(4);
        assert_eq!(write(&record, &mut session, &mut bad_src), Err(EFAULT));
        assert_eq!(session.cursor(), 0);
        assert!(record.contents().iter().all(|b| *b == 0));

        let mut bad_dst = UserSliceWriter::bad_address(4);
        assert_eq!(read(&record, &mut session, &mut bad_dst), Err(EFAULT));
        assert_eq!(session.cursor(), 0);
    }

    #[test]
    fn stale_cursor_after_shrink() {
        let (record, mut session) = setup(1024);
        seek(&record, &mut session, SeekFrom::Start(800)).unwrap();
        record.set_capacity(512).unwrap();
        assert_eq!(write_bytes(&record, &mut session, b"late"), Err(ENOSPC));
        assert_eq!(read_bytes(&record, &mut session, 10), Ok(Vec::new()));
        assert_eq!(session.cursor(), 800);
        assert_eq!(seek(&record, &mut session, SeekFrom::Current(0)), Err(EINVAL));
        assert_eq!(seek(&record, &mut session, SeekFrom::End(0)), Ok(512));
    }
}
