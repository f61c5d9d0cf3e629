pub mod cart;
pub mod config;
pub mod copy;
pub mod error;
pub mod header;
pub mod session;
pub mod space;
pub mod transport;
pub mod wire;

pub use cart::Cart;
pub use config::Config;
pub use error::{Error, Result};
pub use header::{Inspection, RomHeader};
pub use session::Session;
pub use space::{Location, Space};
pub use transport::Transport;
