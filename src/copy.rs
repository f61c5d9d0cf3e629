use std::io::{self, Read, Write};

use log::{debug, warn};

use crate::cart::Cart;
use crate::error::{Error, Result};
use crate::space::Location;
use crate::transport::Transport;
use crate::wire::COMMAND_LENGTH;

pub const BUFFERSIZE_READ: usize = 4096;
pub const BUFFERSIZE_WRITE: usize = 32;

/// Copies a whole bank (or the save RAM) from the cart into `out`, one
/// `blocksize` chunk at a time, starting at `from`.
///
/// `progress` gets the number of bytes copied so far after every chunk.
/// Returns the total number of bytes copied.
pub fn dump<T, W>(
    cart: &mut Cart<T>,
    from: Location,
    blocksize: usize,
    out: &mut W,
    mut progress: impl FnMut(u32),
) -> Result<u32>
where
    T: Transport,
    W: Write,
{
    if blocksize == 0 {
        return Err(Error::ZeroBlocksize);
    }

    let mut buf = vec![0u8; blocksize];
    let mut location = from;

    while location.fits(blocksize) {
        let received = cart.read(location.space, location.absolute(), &mut buf)?;
        if received != blocksize {
            warn!(
                "short read at 0x{:06X}: {} of {} bytes",
                location.absolute(),
                received,
                blocksize
            );
        }

        out.write_all(&buf)?;

        location.offset += blocksize as u32;
        progress(location.offset - from.offset);
    }

    out.flush()?;

    let copied = location.offset - from.offset;
    debug!("dumped {} bytes of {}", copied, from.space);
    Ok(copied)
}

/// Copies `input` onto the cart starting at `to`, one `blocksize` chunk at a time.
///
/// Stops at the end of the space or at the first chunk `input` cannot fill
/// completely; a trailing partial chunk is not written.
pub fn flash<T, R>(
    cart: &mut Cart<T>,
    to: Location,
    blocksize: usize,
    input: &mut R,
    mut progress: impl FnMut(u32),
) -> Result<u32>
where
    T: Transport,
    R: Read,
{
    if blocksize == 0 {
        return Err(Error::ZeroBlocksize);
    }

    let mut buf = vec![0u8; blocksize];
    let mut location = to;

    while location.fits(blocksize) {
        let filled = fill(input, &mut buf)?;
        if filled < blocksize {
            if filled > 0 {
                warn!(
                    "{} trailing bytes do not fill a {} byte block and were not written",
                    filled, blocksize
                );
            }
            break;
        }

        let sent = cart.write(location.space, location.absolute(), &buf)?;
        if sent != blocksize + COMMAND_LENGTH {
            warn!(
                "short write at 0x{:06X}: {} of {} bytes",
                location.absolute(),
                sent,
                blocksize + COMMAND_LENGTH
            );
        }

        location.offset += blocksize as u32;
        progress(location.offset - to.offset);
    }

    let copied = location.offset - to.offset;
    debug!("flashed {} bytes to {}", copied, to.space);
    Ok(copied)
}

// reads until `buf` is full or the input runs dry.
fn fill<R: Read>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
