use std::time::Duration;

use log::{debug, error, info, warn};
use rusb::{Context, Device, DeviceHandle, UsbContext};

use crate::error::{Error, Result};
use crate::transport::Transport;

// EMS cart vendor/product ID magic numbers.
pub const VENDOR_ID: u16 = 0x4670;
pub const PRODUCT_ID: u16 = 0x9394;

// endpoint 2 OUT, endpoint 1 IN.
const EP_SEND: u8 = 0x02;
const EP_RECV: u8 = 0x81;

/// An opened cart adapter with its interface claimed.
///
/// The interface is released and the device closed when the session is dropped,
/// so early returns and errors never leave the adapter claimed.
pub struct Session {
    handle: DeviceHandle<Context>,
    interface: u8,
}

impl Session {
    pub fn open(vendor_id: u16, product_id: u16, interface: u8) -> Result<Session> {
        let context = Context::new()?;
        let device = find(&context, vendor_id, product_id)?;

        let mut handle = device.open().map_err(|err| {
            error!("Failed to open device: {}", err);
            if cfg!(target_os = "linux") && err == rusb::Error::Access {
                warn!("Try running as root/sudo or update udev rules.");
            }
            err
        })?;

        handle.claim_interface(interface)?;
        info!("EMS cart found and claimed");

        Ok(Session { handle, interface })
    }
}

// walks the attached devices looking for the adapter.
fn find(context: &Context, vendor_id: u16, product_id: u16) -> Result<Device<Context>> {
    let devices = context.devices()?;
    let count = devices.len();

    debug!("Searching for EMS cart USB device:");

    for (i, device) in devices.iter().enumerate() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(err) => {
                warn!("Failed to get device description: {}", err);
                continue;
            }
        };

        debug!(
            "  [{}/{}] {:04x}:{:04x} (bus {}, device {})",
            i + 1,
            count,
            descriptor.vendor_id(),
            descriptor.product_id(),
            device.bus_number(),
            device.address()
        );

        if descriptor.vendor_id() == vendor_id && descriptor.product_id() == product_id {
            return Ok(device);
        }
    }

    Err(Error::NotFound {
        vendor_id,
        product_id,
    })
}

impl Transport for Session {
    fn send(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.write_bulk(EP_SEND, data, timeout)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        self.handle.read_bulk(EP_RECV, buf, timeout)
    }
}

// lets the device go when we're done.
impl Drop for Session {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.interface) {
            error!("Failed to release device: {}", err);
        }
        debug!("Deinitialising EMS cart");
    }
}
