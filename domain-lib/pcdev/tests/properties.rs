use std::sync::Arc;

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    code::ENOSPC,
    fs::{FileMode, SeekFrom},
};
use pcdev::{DeviceArena, DeviceRecord, Permission, Session};
use proptest::prelude::*;

fn open(capacity: usize) -> (Arc<DeviceArena>, Session) {
    let arena = Arc::new(DeviceArena::new());
    let record = DeviceRecord::new(capacity, Permission::ReadWrite, "PCDEV4XYZ123").unwrap();
    let id = arena.insert(record).unwrap();
    let session = arena.open(id, FileMode::READ | FileMode::WRITE).unwrap();
    (arena, session)
}

fn capacity_and_cursor() -> impl Strategy<Value = (usize, usize)> {
    (0usize..2048).prop_flat_map(|capacity| (Just(capacity), 0..=capacity))
}

proptest! {
    #[test]
    fn read_returns_what_is_left((capacity, cursor) in capacity_and_cursor(), requested in 0usize..4096) {
        let (arena, mut session) = open(capacity);
        arena.seek(&mut session, SeekFrom::Start(cursor as i64)).unwrap();
        let mut out = vec![0u8; requested];
        let got = arena.read(&mut session, &mut UserSliceWriter::new(&mut out)).unwrap();
        prop_assert_eq!(got, requested.min(capacity - cursor));
        prop_assert_eq!(session.cursor(), cursor + got);
    }

    #[test]
    fn write_without_room_fails_in_place(capacity in 0usize..2048, len in 0usize..64) {
        let (arena, mut session) = open(capacity);
        arena.seek(&mut session, SeekFrom::End(0)).unwrap();
        let data = vec![0x5Au8; len];
        let result = arena.write(&mut session, &mut UserSliceReader::new(&data));
        prop_assert_eq!(result, Err(ENOSPC));
        prop_assert_eq!(session.cursor(), capacity);
    }

    #[test]
    fn write_returns_what_fits((capacity, cursor) in capacity_and_cursor(), len in 1usize..4096) {
        prop_assume!(cursor < capacity);
        let (arena, mut session) = open(capacity);
        arena.seek(&mut session, SeekFrom::Start(cursor as i64)).unwrap();
        let data = vec![0xC3u8; len];
        let got = arena.write(&mut session, &mut UserSliceReader::new(&data)).unwrap();
        prop_assert_eq!(got, len.min(capacity - cursor));
        prop_assert_eq!(session.cursor(), cursor + got);
    }

    #[test]
    fn absolute_then_relative_seek_agree((capacity, target) in capacity_and_cursor()) {
        let (arena, mut session) = open(capacity);
        let set = arena.seek(&mut session, SeekFrom::Start(target as i64)).unwrap();
        let here = arena.seek(&mut session, SeekFrom::Current(0)).unwrap();
        prop_assert_eq!(set, target as u64);
        prop_assert_eq!(here, target as u64);
    }

    #[test]
    fn seek_outside_fails_in_place((capacity, cursor) in capacity_and_cursor(), beyond in 1i64..1000) {
        let (arena, mut session) = open(capacity);
        arena.seek(&mut session, SeekFrom::Start(cursor as i64)).unwrap();
        prop_assert!(arena.seek(&mut session, SeekFrom::Start(-beyond)).is_err());
        prop_assert!(arena.seek(&mut session, SeekFrom::End(beyond)).is_err());
        prop_assert_eq!(session.cursor(), cursor);
    }

    #[test]
    fn resize_preserves_common_prefix(old in 0usize..1024, new in 0usize..1024, fill in any::<u8>()) {
        let (arena, mut session) = open(old);
        if old > 0 {
            let data = vec![fill; old];
            arena.write(&mut session, &mut UserSliceReader::new(&data)).unwrap();
        }
        let record = arena.get(session.device()).unwrap();
        record.set_capacity(new).unwrap();
        let contents = record.contents();
        let kept = old.min(new);
        prop_assert_eq!(contents.len(), new);
        prop_assert!(contents[..kept].iter().all(|b| *b == fill));
        prop_assert!(contents[kept..].iter().all(|b| *b == 0));
    }
}
