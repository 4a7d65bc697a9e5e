use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    code::{ENOSPC, ENXIO},
    fs::{FileMode, SeekFrom},
    Host,
};

fn rw() -> FileMode {
    FileMode::READ | FileMode::WRITE
}

#[test]
fn loads_one_device_node() {
    let module = pcd::init_module(&Host::new()).unwrap();
    assert_eq!(pcd::THIS_MODULE.name(), "pcd");
    assert_eq!(module.class().name(), "pcd_class");
    assert_eq!(module.class().device_names(), ["pcd"]);
    assert_eq!(module.device().devt(), Some(module.region().base()));
    assert_eq!(module.region().active(), [0]);
    assert!(matches!(module.region().open(1, rw()), Err(ENXIO)));
}

#[test]
fn fills_the_buffer_and_reads_it_back() {
    let module = pcd::init_module(&Host::new()).unwrap();
    let mut file = module.region().open(0, rw()).unwrap();
    let data: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
    assert_eq!(
        file.write(&mut UserSliceReader::new(&data)),
        Ok(pcd::DEV_MEM_SIZE)
    );
    assert_eq!(file.write(&mut UserSliceReader::new(b"x")), Err(ENOSPC));

    assert_eq!(file.seek(SeekFrom::Start(0)), Ok(0));
    let mut out = vec![0u8; 1024];
    assert_eq!(
        file.read(&mut UserSliceWriter::new(&mut out)),
        Ok(pcd::DEV_MEM_SIZE)
    );
    assert_eq!(&out[..pcd::DEV_MEM_SIZE], &data[..pcd::DEV_MEM_SIZE]);
    assert_eq!(file.read(&mut UserSliceWriter::new(&mut out)), Ok(0));
    file.release();
}

#[test]
fn unload_removes_the_device() {
    let module = pcd::init_module(&Host::new()).unwrap();
    let class = module.class().clone();
    let record = module.arena().get(module.id()).unwrap();
    assert_eq!(record.serial(), pcd::SERIAL);
    drop(module);
    assert!(class.device_names().is_empty());
}
