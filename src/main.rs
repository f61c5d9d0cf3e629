#![deny(clippy::all)]
#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use error_iter::ErrorIter as _;
use log::{error, info, LevelFilter};

use emscart::header::{checksum, HEADER_CHKSUM, HEADER_SIZE, HEADER_TITLE};
use emscart::{copy, Cart, Config, Location, RomHeader, Session, Space};

#[derive(Parser, Debug)]
#[command(name = "emscart", version, about = "Read and write EMS USB flash cartridges")]
struct Cli {
    /// More output, repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Transfer timeout in milliseconds, 0 waits forever.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// USB vendor id of the adapter (hex).
    #[arg(long, value_parser = parse_hex, global = true)]
    vid: Option<u16>,

    /// USB product id of the adapter (hex).
    #[arg(long, value_parser = parse_hex, global = true)]
    pid: Option<u16>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Dump a ROM bank or the save RAM into a file.
    Read(Transfer),
    /// Flash a file into a ROM bank or the save RAM.
    Write(Transfer),
    /// Show the ROM headers of bank 0 and bank 1.
    Title,
    /// Compute the header checksum of a ROM file.
    Checksum { file: PathBuf },
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct Transfer {
    file: PathBuf,

    /// ROM bank to use.
    #[arg(short, long, default_value_t = 0)]
    bank: u32,

    /// Use the save RAM instead of ROM.
    #[arg(short, long)]
    save: bool,

    /// Bytes per transfer.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    blocksize: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .parse_default_env()
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load().context("loading config")?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(vid) = cli.vid {
        config.vendor_id = vid;
    }
    if let Some(pid) = cli.pid {
        config.product_id = pid;
    }

    match cli.mode {
        Mode::Read(transfer) => read(&config, transfer),
        Mode::Write(transfer) => write(&config, transfer),
        Mode::Title => title(&config),
        Mode::Checksum { file } => file_checksum(file),
        Mode::Config => {
            match Config::path() {
                Some(path) => println!("# {}", path.display()),
                None => println!("# no config directory on this platform"),
            }
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

// the adapter stays claimed until the returned cart is dropped.
fn open(config: &Config) -> anyhow::Result<Cart<Session>> {
    let session = Session::open(config.vendor_id, config.product_id, config.interface)
        .context("opening the cart adapter")?;
    Ok(Cart::new(session, config.timeout()))
}

fn location(transfer: &Transfer) -> anyhow::Result<Location> {
    let space = if transfer.save { Space::Sram } else { Space::Rom };
    if transfer.bank >= space.banks() {
        bail!("{} has no bank {}", space, transfer.bank);
    }

    let location = Location::new(space, transfer.bank, 0);
    info!("base address is 0x{:X}", location.base());
    Ok(location)
}

fn read(config: &Config, transfer: Transfer) -> anyhow::Result<()> {
    let location = location(&transfer)?;
    let blocksize = transfer
        .blocksize
        .map_or(config.read_blocksize, |b| b as usize);

    // claim the adapter before truncating anything on disk.
    let mut cart = open(config)?;

    let file = File::create(&transfer.file)
        .with_context(|| format!("can't open {} for writing", transfer.file.display()))?;
    let mut out = BufWriter::new(file);

    match location.space {
        Space::Rom => info!("Saving ROM into {}", transfer.file.display()),
        Space::Sram => info!("Saving SAVE into {}", transfer.file.display()),
    }

    let copied = copy::dump(&mut cart, location, blocksize, &mut out, |_| ())
        .with_context(|| format!("dumping {} bank {}", location.space, location.bank))?;

    println!(
        "Successfully wrote {} bytes into {}",
        copied,
        transfer.file.display()
    );
    Ok(())
}

fn write(config: &Config, transfer: Transfer) -> anyhow::Result<()> {
    let location = location(&transfer)?;
    let blocksize = transfer
        .blocksize
        .map_or(config.write_blocksize, |b| b as usize);

    let file = File::open(&transfer.file).with_context(|| match location.space {
        Space::Rom => format!("can't open ROM file {}", transfer.file.display()),
        Space::Sram => format!("can't open SAVE file {}", transfer.file.display()),
    })?;
    let size = file.metadata()?.len();
    let mut input = BufReader::new(file);

    match location.space {
        Space::Rom => info!("Writing ROM file {}", transfer.file.display()),
        Space::Sram => info!("Writing SAVE file {}", transfer.file.display()),
    }
    println!(
        "Size to write: {} ({} writes to do)",
        size,
        size.checked_div(blocksize as u64).unwrap_or(0)
    );

    let mut cart = open(config)?;
    let copied = copy::flash(&mut cart, location, blocksize, &mut input, |done| {
        if size > 0 {
            print!("progress {:3}%\r", done as u64 * 100 / size);
            let _ = io::stdout().flush();
        }
    })
    .with_context(|| format!("flashing {} bank {}", location.space, location.bank))?;
    println!();

    println!(
        "Successfully wrote {} bytes from {}",
        copied,
        transfer.file.display()
    );
    Ok(())
}

fn title(config: &Config) -> anyhow::Result<()> {
    let mut cart = open(config)?;
    let mut buf = [0u8; HEADER_SIZE];

    for bank in 0..Space::Rom.banks() {
        let location = Location::new(Space::Rom, bank, 0);
        cart.read(Space::Rom, location.absolute(), &mut buf)
            .with_context(|| format!("couldn't read ROM header at bank {}", bank))?;

        let header = RomHeader::parse(&buf)?;
        println!("\nBank {}:", bank);
        print!("{}", header.inspect());
    }

    Ok(())
}

fn file_checksum(path: PathBuf) -> anyhow::Result<()> {
    let file =
        File::open(&path).with_context(|| format!("can't open ROM file {}", path.display()))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE);
    file.take(HEADER_SIZE as u64).read_to_end(&mut buf)?;
    if buf.len() <= HEADER_CHKSUM {
        bail!("{} is too short to hold a header", path.display());
    }

    println!("Checksum: {:02x}", checksum(&buf[HEADER_TITLE..HEADER_CHKSUM]));
    println!("Stored:   {:02x}", buf[HEADER_CHKSUM]);
    Ok(())
}

fn parse_hex(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("{s}: {e}"))
}

fn report(err: &anyhow::Error) {
    let mut causes = causes(err).into_iter();
    if let Some(first) = causes.next() {
        error!("{first}");
    }
    for cause in causes {
        error!("  Caused by: {cause}");
    }
}

// every context layer, then the library error and its sources.
fn causes(err: &anyhow::Error) -> Vec<String> {
    let mut lines = Vec::new();
    for cause in err.chain() {
        if let Some(source) = cause.downcast_ref::<emscart::Error>() {
            lines.extend(source.sources().map(|e| e.to_string()));
            break;
        }
        lines.push(cause.to_string());
    }
    lines
}
