use std::time::Duration;

/// The two bulk endpoints of the cart adapter.
///
/// A timeout of zero waits forever, the way libusb treats it.
pub trait Transport {
    // sends `data` on the OUT endpoint, returning the number of bytes sent.
    fn send(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize>;

    // fills `buf` from the IN endpoint, returning the number of bytes received.
    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        (**self).send(data, timeout)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        (**self).receive(buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, data: &[u8], timeout: Duration) -> rusb::Result<usize> {
        (**self).send(data, timeout)
    }

    fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> rusb::Result<usize> {
        (**self).receive(buf, timeout)
    }
}
