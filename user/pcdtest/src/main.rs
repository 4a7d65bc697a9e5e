use std::{
    io::Write,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use clap::{Parser, Subcommand};
use kernel::{
    buf::{UserSliceReader, UserSliceWriter},
    error::KernelResult as Result,
    fs::{FileHandle, FileMode, SeekFrom},
    of::DeviceNode,
    platform::{PlatformDevice, PLATFORM_DEVID_NONE},
    print::{self, Console},
    Host,
};
use log::info;
use pcdev::{RDONLY, RDWR, WRONLY};
use spin::Mutex;

#[derive(Parser)]
#[command(version, about = "Exercise the pseudo character device drivers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write, seek and read on the single device driver
    Single,
    /// Try every access mode on the four static devices
    Multi,
    /// Load the platform driver and the board devices, then list the nodes
    Platform,
    /// Probe device tree nodes and drive the sysfs attributes
    Sysfs {
        #[arg(short, long, value_name = "BYTES", default_value_t = 2048)]
        /// New `max_size` for the first device
        size: usize,
    },
    /// Resize a device while readers hammer it
    Stress {
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        #[arg(short, long, default_value_t = 200)]
        rounds: usize,
    },
}

struct Stdout;

impl Console for Stdout {
    fn put_line(&self, line: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(line);
        let _ = out.write_all(b"\n");
    }
}

static STDOUT: Stdout = Stdout;

fn mode_name(mode: FileMode) -> &'static str {
    match (mode.contains(FileMode::READ), mode.contains(FileMode::WRITE)) {
        (true, true) => "O_RDWR",
        (true, false) => "O_RDONLY",
        (false, true) => "O_WRONLY",
        (false, false) => "none",
    }
}

fn write_all(file: &mut dyn FileHandle, data: &[u8]) -> Result<usize> {
    file.write(&mut UserSliceReader::new(data))
}

fn read_some(file: &mut dyn FileHandle, n: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; n];
    let got = file.read(&mut UserSliceWriter::new(&mut out))?;
    out.truncate(got);
    Ok(out)
}

fn single() -> Result {
    let module = pcd::init_module(&Host::new())?;
    let mut file = module.region().open(0, FileMode::READ | FileMode::WRITE)?;
    let text = b"Hello from the pseudo character device";
    println!("wrote {} bytes", write_all(&mut *file, text)?);
    file.seek(SeekFrom::Start(0))?;
    let back = read_some(&mut *file, text.len())?;
    println!("read back {:?}", String::from_utf8_lossy(&back));
    file.seek(SeekFrom::End(0))?;
    println!("write at end: {:?}", write_all(&mut *file, b"x"));
    file.release();
    Ok(())
}

fn multi() -> Result {
    let module = pcd_multi::init_module(&Host::new())?;
    let modes = [
        FileMode::READ,
        FileMode::WRITE,
        FileMode::READ | FileMode::WRITE,
    ];
    for minor in module.region().active() {
        for mode in modes {
            let verdict = match module.region().open(minor, mode) {
                Ok(file) => {
                    file.release();
                    "ok".to_string()
                }
                Err(e) => format!("{:?}", e),
            };
            println!("pcdev-{} {:>8}: {}", minor + 1, mode_name(mode), verdict);
        }
    }
    Ok(())
}

fn platform() -> Result {
    let host = Host::new();
    let driver = pcd_platform::init_module(&host)?;
    let _board = pcd_platform::device_setup::init_module(&host)?;
    let drv = driver.driver_data();
    for name in drv.class().device_names() {
        let Some(node) = drv.class().find(&name) else {
            continue;
        };
        let parent = node.parent().map(|p| p.name().to_string());
        println!("{} <- {:?} ({:?})", name, parent, node.devt());
    }
    Ok(())
}

fn dt_device(name: &str, compatible: &str, serial: &str, size: u32, perm: u32) -> PlatformDevice {
    let node = DeviceNode::new(name)
        .compatible(compatible)
        .string_property("org,device-serial-num", serial)
        .u32_property("org,size", size)
        .u32_property("org,perm", perm);
    PlatformDevice::new(name, PLATFORM_DEVID_NONE).with_of_node(node)
}

/// The four pseudo devices of the board's device tree overlay.
fn load_tree(host: &Host) -> Result {
    let bus = host.platform_bus();
    bus.add_device(dt_device("pcdev-1", "pcdev-A1x", "PCDEV1ABC123", 512, RDWR))?;
    bus.add_device(dt_device("pcdev-2", "pcdev-B1x", "PCDEV2ABC456", 1024, RDWR))?;
    bus.add_device(dt_device("pcdev-3", "pcdev-C1x", "PCDEV3ABC789", 256, RDONLY))?;
    bus.add_device(dt_device("pcdev-4", "pcdev-D1x", "PCDEV4ABC000", 2048, WRONLY))?;
    Ok(())
}

fn sysfs(size: usize) -> Result {
    let host = Host::new();
    let module = pcd_sysfs::init_module(&host)?;
    load_tree(&host)?;
    let class = module.driver_data().class();
    for name in class.device_names() {
        let Some(node) = class.find(&name) else {
            continue;
        };
        print!("{}: serial_num={}", name, node.show("serial_num")?);
        print!("{}: max_size={}", name, node.show("max_size")?);
    }
    let first = class.find("pcdev-0").ok_or(kernel::code::ENODEV)?;
    first.store("max_size", format!("{}\n", size).as_bytes())?;
    print!("pcdev-0: max_size={}", first.show("max_size")?);
    Ok(())
}

fn stress(threads: usize, rounds: usize) -> Result {
    let host = Host::new();
    let module = Arc::new(pcd_sysfs::init_module(&host)?);
    load_tree(&host)?;
    let node = module
        .driver_data()
        .class()
        .find("pcdev-1")
        .ok_or(kernel::code::ENODEV)?;
    let errors = Arc::new(Mutex::new(Vec::new()));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..threads)
        .map(|_| {
            let module = module.clone();
            let errors = errors.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut reads = 0usize;
                while !done.load(Ordering::Relaxed) {
                    let opened = module
                        .driver_data()
                        .region()
                        .open(1, FileMode::READ | FileMode::WRITE);
                    let mut file = match opened {
                        Ok(file) => file,
                        Err(e) => {
                            errors.lock().push(e);
                            break;
                        }
                    };
                    if let Err(e) = read_some(&mut *file, 4096) {
                        errors.lock().push(e);
                    }
                    // Running out of space is expected while the device shrinks.
                    let _ = write_all(&mut *file, &[0x5a; 64]);
                    file.release();
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    for round in 0..rounds {
        let size = 64 + (round * 37) % 4096;
        node.store("max_size", size.to_string().as_bytes())?;
    }
    done.store(true, Ordering::Relaxed);
    let reads: usize = readers.into_iter().map(|t| t.join().unwrap_or(0)).sum();
    let errors = errors.lock();
    info!("{} resizes, {} read sessions, {} errors", rounds, reads, errors.len());
    println!("{} resizes, {} read sessions, errors: {:?}", rounds, reads, *errors);
    Ok(())
}

fn main() -> Result {
    print::init_console(&STDOUT);
    kernel::logger::init_logger()?;
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Single) => single(),
        Some(Commands::Multi) => multi(),
        Some(Commands::Platform) => platform(),
        Some(Commands::Sysfs { size }) => sysfs(size),
        Some(Commands::Stress { threads, rounds }) => stress(threads, rounds),
        None => {
            single()?;
            multi()?;
            platform()?;
            sysfs(2048)?;
            stress(4, 200)
        }
    }
}
