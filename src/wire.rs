use std::fmt;

// length of a command frame: opcode, address, length-or-value.
pub const COMMAND_LENGTH: usize = 9;

// encodes a u32 most significant byte first, whatever the host byte order is.
pub fn to_wire(value: u32) -> [u8; 4] {
    [
        ((value >> 24) & 0xff) as u8,
        ((value >> 16) & 0xff) as u8,
        ((value >> 8) & 0xff) as u8,
        (value & 0xff) as u8,
    ]
}

pub fn from_wire(bytes: [u8; 4]) -> u32 {
    ((bytes[0] as u32) << 24)
        | ((bytes[1] as u32) << 16)
        | ((bytes[2] as u32) << 8)
        | bytes[3] as u32
}

/// Commands understood by the cart adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    ReadRom = 0xff,
    WriteRom = 0x57,
    ReadSram = 0x6d,
    WriteSram = 0x4d,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            0xff => Some(Opcode::ReadRom),
            0x57 => Some(Opcode::WriteRom),
            0x6d => Some(Opcode::ReadSram),
            0x4d => Some(Opcode::WriteSram),
            _ => None,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, Opcode::WriteRom | Opcode::WriteSram)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::ReadRom => "READ",
            Opcode::WriteRom => "WRITE",
            Opcode::ReadSram => "READ_SRAM",
            Opcode::WriteSram => "WRITE_SRAM",
        };
        write!(f, "{} (0x{:02X})", name, *self as u8)
    }
}

/// A 9 byte command frame: `[opcode][address BE][length or value BE]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    frame: [u8; COMMAND_LENGTH],
}

impl Command {
    pub fn new(opcode: Opcode, address: u32, value: u32) -> Self {
        let mut frame = [0; COMMAND_LENGTH];
        frame[0] = opcode as u8;
        frame[1..5].copy_from_slice(&to_wire(address));
        frame[5..9].copy_from_slice(&to_wire(value));
        Command { opcode, frame }
    }

    // parses a frame sent by the host. Used by device side tooling and tests.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let frame: [u8; COMMAND_LENGTH] = bytes.get(..COMMAND_LENGTH)?.try_into().ok()?;
        let opcode = Opcode::from_byte(frame[0])?;
        Some(Command { opcode, frame })
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn address(&self) -> u32 {
        from_wire([self.frame[1], self.frame[2], self.frame[3], self.frame[4]])
    }

    pub fn value(&self) -> u32 {
        from_wire([self.frame[5], self.frame[6], self.frame[7], self.frame[8]])
    }

    pub fn as_bytes(&self) -> &[u8; COMMAND_LENGTH] {
        &self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_order_is_big_endian() {
        assert_eq!(to_wire(0x12345678), [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(to_wire(0), [0, 0, 0, 0]);
        assert_eq!(to_wire(u32::MAX), [0xff; 4]);
        assert_eq!(to_wire(0x400000), 0x400000u32.to_be_bytes());
    }

    #[test]
    fn wire_inverse() {
        for value in [0, 1, 0xff, 0x100, 0x20000, 0x400000, 0x8000_0000, u32::MAX] {
            assert_eq!(from_wire(to_wire(value)), value);
        }
    }

    #[test]
    fn frame_layout() {
        let command = Command::new(Opcode::ReadSram, 0x0001_0000, 0x1000);
        assert_eq!(
            command.as_bytes(),
            &[0x6d, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00]
        );
        assert_eq!(command.as_bytes().len(), COMMAND_LENGTH);
    }

    #[test]
    fn frame_fields_decode() {
        let extremes = [
            (0, 0),
            (0, u32::MAX),
            (u32::MAX, 0),
            (u32::MAX, u32::MAX),
            (0x400000, 512),
        ];
        for opcode in [Opcode::ReadRom, Opcode::WriteRom, Opcode::ReadSram, Opcode::WriteSram] {
            for (address, value) in extremes {
                let command = Command::new(opcode, address, value);
                assert_eq!(command.opcode(), opcode);
                assert_eq!(command.address(), address);
                assert_eq!(command.value(), value);
            }
        }
    }

    #[test]
    fn parse_rejects_unknown_opcode_and_short_frames() {
        assert!(Command::parse(&[0x00; 9]).is_none());
        assert!(Command::parse(&[0x57, 0, 0]).is_none());

        let frame = Command::new(Opcode::WriteRom, 0x20, 32);
        let mut bytes = frame.as_bytes().to_vec();
        bytes.extend_from_slice(&[0xaa; 32]);
        assert_eq!(Command::parse(&bytes), Some(frame));
    }

    #[test]
    fn opcode_values() {
        assert_eq!(Opcode::ReadRom as u8, 0xff);
        assert_eq!(Opcode::WriteRom as u8, 0x57);
        assert_eq!(Opcode::ReadSram as u8, 0x6d);
        assert_eq!(Opcode::WriteSram as u8, 0x4d);
        assert!(Opcode::WriteSram.is_write());
        assert!(!Opcode::ReadRom.is_write());
    }
}
