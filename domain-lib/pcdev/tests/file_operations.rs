use std::sync::Arc;

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    chrdev,
    code::{EPERM, ENOSPC},
    fs::{FileMode, SeekFrom},
};
use pcdev::{DeviceArena, DeviceId, DeviceRecord, PcdevCdev, PcdevFile, Permission};

fn rw() -> FileMode {
    FileMode::READ | FileMode::WRITE
}

/// Two neighbouring devices behind minors 0 and 1.
fn register() -> (Arc<DeviceArena>, [DeviceId; 2], chrdev::Registration) {
    let arena = Arc::new(DeviceArena::new());
    let first = arena
        .insert(DeviceRecord::new(1024, Permission::ReadWrite, "PCDEV3XYZ123").unwrap())
        .unwrap();
    let second = arena
        .insert(DeviceRecord::new(16, Permission::ReadOnly, "PCDEV1XYZ123").unwrap())
        .unwrap();
    let reg = chrdev::builder("pcdev-test", 0..2)
        .unwrap()
        .register_device::<PcdevFile>(PcdevCdev::new(arena.clone(), first))
        .register_device::<PcdevFile>(PcdevCdev::new(arena.clone(), second))
        .build()
        .unwrap();
    (arena, [first, second], reg)
}

#[test]
fn scenario_through_the_file_interface() {
    let (_arena, _ids, reg) = register();
    let mut file = reg.open(0, rw()).unwrap();
    assert_eq!(file.write(&mut UserSliceReader::new(&[1u8; 300])), Ok(300));
    assert_eq!(file.seek(SeekFrom::End(-100)), Ok(924));
    let mut out = [0u8; 200];
    assert_eq!(file.read(&mut UserSliceWriter::new(&mut out)), Ok(100));
    assert_eq!(file.seek(SeekFrom::Current(0)), Ok(1024));
    assert_eq!(file.write(&mut UserSliceReader::new(b"more")), Err(ENOSPC));
    file.release();
}

#[test]
fn permissions_apply_per_minor() {
    let (_arena, _ids, reg) = register();
    assert!(matches!(reg.open(1, FileMode::WRITE), Err(EPERM)));
    assert!(matches!(reg.open(1, rw()), Err(EPERM)));
    let file = reg.open(1, FileMode::READ).unwrap();
    file.release();
}

#[test]
fn writes_stay_inside_their_device() {
    let (arena, [first, second], reg) = register();
    assert_eq!(reg.active(), [0, 1]);
    let mut file = reg.open(0, rw()).unwrap();
    assert_eq!(file.file().minor(), 0);
    file.seek(SeekFrom::Start(1020)).unwrap();
    assert_eq!(file.write(&mut UserSliceReader::new(b"abcdefgh")), Ok(4));
    file.release();

    let first = arena.get(first).unwrap().contents();
    assert_eq!(&first[1020..], b"abcd");
    assert!(first[..1020].iter().all(|b| *b == 0));
    let second = arena.get(second).unwrap().contents();
    assert!(second.iter().all(|b| *b == 0));
}

#[test]
fn sessions_are_independent() {
    let (_arena, _ids, reg) = register();
    let mut writer = reg.open(0, FileMode::WRITE).unwrap();
    let mut reader = reg.open(0, FileMode::READ).unwrap();
    writer.write(&mut UserSliceReader::new(b"hello")).unwrap();
    let mut out = [0u8; 5];
    assert_eq!(reader.read(&mut UserSliceWriter::new(&mut out)), Ok(5));
    assert_eq!(&out, b"hello");
    assert_eq!(writer.seek(SeekFrom::Current(0)), Ok(5));
    writer.release();
    reader.release();
}
