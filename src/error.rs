use thiserror::Error;

use crate::space::Space;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
/// Errors that may happen while talking to the cart adapter.
pub enum Error {
    /// A bulk transfer failed, either in the command phase or the data phase.
    #[error("usb transfer failed: {0}")]
    Usb(#[from] rusb::Error),

    /// The combined frame and payload buffer for a write could not be reserved.
    #[error("could not allocate a {size} byte write buffer")]
    Alloc { size: usize },

    #[error("{len} bytes at 0x{offset:X} do not fit in {space} (0x{capacity:X} bytes)")]
    OutOfRange {
        space: Space,
        offset: u32,
        len: usize,
        capacity: u32,
    },

    #[error("blocksize must be at least one byte")]
    ZeroBlocksize,

    #[error("no cart adapter {vendor_id:04x}:{product_id:04x} found, is it plugged in?")]
    NotFound { vendor_id: u16, product_id: u16 },

    #[error("header needs at least {needed} bytes, got {got}")]
    HeaderTooShort { needed: usize, got: usize },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
