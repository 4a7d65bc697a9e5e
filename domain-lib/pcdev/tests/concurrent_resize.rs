use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    code::{EINVAL, ENOSPC},
    fs::{FileMode, SeekFrom},
};
use pcdev::{DeviceArena, DeviceRecord, Permission};

const IO_THREADS: usize = 4;
const RESIZES: usize = 2000;
const LARGEST: usize = 64 + 4095;

fn size_for(round: usize) -> usize {
    64 + (round * 37) % 4096
}

#[test]
fn io_races_resize_within_bounds() {
    let arena = Arc::new(DeviceArena::new());
    let id = arena
        .insert(DeviceRecord::new(1024, Permission::ReadWrite, "PCDEV3XYZ123").unwrap())
        .unwrap();
    let record = arena.get(id).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..IO_THREADS)
        .map(|seed| {
            let arena = arena.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut session = arena.open(id, FileMode::READ | FileMode::WRITE).unwrap();
                let mut pos = seed * 997;
                let mut rounds = 0usize;
                let mut out = vec![0u8; 4096];
                while !stop.load(Ordering::Relaxed) {
                    pos = (pos * 31 + 17) % 5000;
                    match arena.seek(&mut session, SeekFrom::Start(pos as i64)) {
                        Ok(at) => assert_eq!(at, pos as u64),
                        Err(e) => assert_eq!(e, EINVAL),
                    }

                    let got = arena
                        .read(&mut session, &mut UserSliceWriter::new(&mut out))
                        .unwrap();
                    assert!(got <= out.len());
                    assert!(session.cursor() <= LARGEST);
                    // Memory only ever holds zero fill or what the workers wrote.
                    assert!(out[..got].iter().all(|b| *b == 0 || *b == 0x5A));

                    match arena.write(&mut session, &mut UserSliceReader::new(&[0x5A; 64])) {
                        Ok(n) => assert!((1..=64).contains(&n)),
                        Err(e) => assert_eq!(e, ENOSPC),
                    }
                    assert!(session.cursor() <= LARGEST);
                    rounds += 1;
                }
                arena.release(session);
                rounds
            })
        })
        .collect();

    for round in 0..RESIZES {
        let size = size_for(round);
        record.set_capacity(size).unwrap();
        assert_eq!(record.capacity(), size);
        assert_eq!(record.contents().len(), record.capacity());
    }
    stop.store(true, Ordering::Relaxed);

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(record.capacity(), size_for(RESIZES - 1));
}

#[test]
fn resizes_through_max_size_text_race_io() {
    let arena = Arc::new(DeviceArena::new());
    let id = arena
        .insert(DeviceRecord::new(512, Permission::ReadWrite, "PCDEVXYZ222").unwrap())
        .unwrap();
    let record = arena.get(id).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let reader = {
        let arena = arena.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut session = arena.open(id, FileMode::READ).unwrap();
            let mut out = [0u8; 256];
            while !stop.load(Ordering::Relaxed) {
                if arena.seek(&mut session, SeekFrom::Start(0)).is_ok() {
                    let got = arena
                        .read(&mut session, &mut UserSliceWriter::new(&mut out))
                        .unwrap();
                    assert!(got <= out.len());
                }
            }
            arena.release(session);
        })
    };

    for round in 0..RESIZES {
        let text = format!("{}\n", size_for(round));
        assert_eq!(record.store_capacity(text.as_bytes()), Ok(text.len()));
        assert_eq!(record.contents().len(), size_for(round));
    }
    stop.store(true, Ordering::Relaxed);
    reader.join().unwrap();
}
