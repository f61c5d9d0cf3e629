use std::path::PathBuf;

use clap::Parser;
use log::error;

use emscart::RomHeader;

/// Print the header report of ROM images on disk.
#[derive(Parser)]
struct Cli {
    files: Vec<PathBuf>,
}

fn main() {
    env_logger::init();

    for file in Cli::parse().files {
        let bytes = match std::fs::read(&file) {
            Ok(b) => b,
            Err(err) => {
                error!("{}: {}", file.display(), err);
                continue;
            }
        };

        match RomHeader::parse(&bytes) {
            Ok(header) => {
                println!("{}:", file.display());
                print!("{}", header.inspect());
            }
            Err(err) => error!("{}: {}", file.display(), err),
        }
    }
}
