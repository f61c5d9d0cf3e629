use std::time::Duration;

use log::trace;

use crate::error::{Error, Result};
use crate::space::Space;
use crate::transport::Transport;
use crate::wire::{Command, COMMAND_LENGTH};

/// Issues read and write commands to the adapter over a [`Transport`].
///
/// Every call is a command phase followed by a data phase. Nothing is retried;
/// a failure in either phase is returned as is and leaves the adapter in an
/// unknown protocol state.
pub struct Cart<T: Transport> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> Cart<T> {
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Reads `buf.len()` bytes starting at the absolute address `offset`.
    ///
    /// Returns the number of bytes received in the data phase. The range is
    /// checked against the space before the adapter is touched.
    pub fn read(&mut self, space: Space, offset: u32, buf: &mut [u8]) -> Result<usize> {
        space.check(offset, buf.len())?;

        let command = Command::new(space.read_opcode(), offset, buf.len() as u32);
        trace!("{} @ 0x{:06X}, {} bytes", command.opcode(), offset, buf.len());

        self.transport.send(command.as_bytes(), self.timeout)?;
        let transferred = self.transport.receive(buf, self.timeout)?;

        Ok(transferred)
    }

    /// Writes `buf` starting at the absolute address `offset`.
    ///
    /// The frame and the payload go out in a single bulk transfer, so the
    /// returned count includes the 9 frame bytes.
    pub fn write(&mut self, space: Space, offset: u32, buf: &[u8]) -> Result<usize> {
        space.check(offset, buf.len())?;

        let command = Command::new(space.write_opcode(), offset, buf.len() as u32);
        trace!("{} @ 0x{:06X}, {} bytes", command.opcode(), offset, buf.len());

        // no scatter/gather on bulk endpoints, so frame and payload share one buffer.
        let size = buf.len() + COMMAND_LENGTH;
        let mut packet = Vec::new();
        packet
            .try_reserve_exact(size)
            .map_err(|_| Error::Alloc { size })?;
        packet.extend_from_slice(command.as_bytes());
        packet.extend_from_slice(buf);

        let transferred = self.transport.send(&packet, self.timeout)?;

        Ok(transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{BANK_SIZE, SRAM_SIZE};
    use crate::wire::Opcode;

    // records every transfer and answers reads with a counting pattern.
    #[derive(Default)]
    struct Recorder {
        sent: Vec<Vec<u8>>,
        received: usize,
        fail_send: Option<rusb::Error>,
        fail_receive: Option<rusb::Error>,
    }

    impl Transport for Recorder {
        fn send(&mut self, data: &[u8], _timeout: Duration) -> rusb::Result<usize> {
            if let Some(err) = self.fail_send {
                return Err(err);
            }
            self.sent.push(data.to_vec());
            Ok(data.len())
        }

        fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> rusb::Result<usize> {
            if let Some(err) = self.fail_receive {
                return Err(err);
            }
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = i as u8;
            }
            self.received += 1;
            Ok(buf.len())
        }
    }

    fn cart() -> Cart<Recorder> {
        Cart::new(Recorder::default(), Duration::from_millis(100))
    }

    #[test]
    fn read_sends_frame_then_receives() {
        let mut cart = cart();
        let mut buf = [0u8; 16];

        assert_eq!(cart.read(Space::Rom, BANK_SIZE, &mut buf).unwrap(), 16);
        assert_eq!(buf[15], 15);

        let recorder = cart.into_inner();
        assert_eq!(recorder.sent.len(), 1);
        let command = Command::parse(&recorder.sent[0]).unwrap();
        assert_eq!(command.opcode(), Opcode::ReadRom);
        assert_eq!(command.address(), BANK_SIZE);
        assert_eq!(command.value(), 16);
        assert_eq!(recorder.received, 1);
    }

    #[test]
    fn sram_uses_sram_opcodes() {
        let mut cart = cart();
        cart.read(Space::Sram, 0x100, &mut [0u8; 4]).unwrap();
        cart.write(Space::Sram, 0x100, &[1, 2, 3, 4]).unwrap();

        let recorder = cart.into_inner();
        assert_eq!(recorder.sent[0][0], Opcode::ReadSram as u8);
        assert_eq!(recorder.sent[1][0], Opcode::WriteSram as u8);
    }

    #[test]
    fn write_is_one_transfer_including_frame() {
        let mut cart = cart();
        let payload = [0xaa; 32];

        // transferred size counts the frame too.
        assert_eq!(cart.write(Space::Rom, 0x40, &payload).unwrap(), 32 + COMMAND_LENGTH);

        let recorder = cart.into_inner();
        assert_eq!(recorder.sent.len(), 1);
        let packet = &recorder.sent[0];
        assert_eq!(packet.len(), 41);
        assert_eq!(&packet[..9], Command::new(Opcode::WriteRom, 0x40, 32).as_bytes());
        assert_eq!(&packet[9..], &payload);
    }

    #[test]
    fn out_of_range_never_reaches_transport() {
        let mut cart = cart();
        let mut buf = [0u8; 2];

        let err = cart.read(Space::Sram, SRAM_SIZE - 1, &mut buf).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { space: Space::Sram, .. }));
        assert!(cart.write(Space::Rom, BANK_SIZE - 1, &buf).is_err());

        let recorder = cart.into_inner();
        assert!(recorder.sent.is_empty());
        assert_eq!(recorder.received, 0);
    }

    #[test]
    fn command_phase_failure_skips_data_phase() {
        let mut cart = Cart::new(
            Recorder {
                fail_send: Some(rusb::Error::Pipe),
                ..Default::default()
            },
            Duration::ZERO,
        );

        let err = cart.read(Space::Rom, 0, &mut [0u8; 8]).unwrap_err();
        assert!(matches!(err, Error::Usb(rusb::Error::Pipe)));
        assert_eq!(cart.into_inner().received, 0);
    }

    #[test]
    fn data_phase_failure_is_surfaced() {
        let mut cart = Cart::new(
            Recorder {
                fail_receive: Some(rusb::Error::Timeout),
                ..Default::default()
            },
            Duration::from_millis(10),
        );

        let err = cart.read(Space::Sram, 0, &mut [0u8; 8]).unwrap_err();
        assert!(matches!(err, Error::Usb(rusb::Error::Timeout)));
    }
}
