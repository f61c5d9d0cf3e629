use std::fmt;

use crate::error::{Error, Result};
use crate::wire::Opcode;

// one bank is 32 megabits.
pub const BANK_SIZE: u32 = 0x400000;
pub const SRAM_SIZE: u32 = 0x020000;

// the 64M cart carries two ROM banks.
pub const ROM_BANKS: u32 = 2;

/// Memory the adapter can read from or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Space {
    Rom,
    Sram,
}

impl Space {
    // size of one addressable window of this space. ROM is addressed bank by bank.
    pub const fn capacity(self) -> u32 {
        match self {
            Space::Rom => BANK_SIZE,
            Space::Sram => SRAM_SIZE,
        }
    }

    pub const fn banks(self) -> u32 {
        match self {
            Space::Rom => ROM_BANKS,
            Space::Sram => 1,
        }
    }

    pub fn read_opcode(self) -> Opcode {
        match self {
            Space::Rom => Opcode::ReadRom,
            Space::Sram => Opcode::ReadSram,
        }
    }

    pub fn write_opcode(self) -> Opcode {
        match self {
            Space::Rom => Opcode::WriteRom,
            Space::Sram => Opcode::WriteSram,
        }
    }

    /// Checks that `len` bytes starting at the absolute device address `offset`
    /// stay within one window of this space.
    pub fn check(self, offset: u32, len: usize) -> Result<()> {
        if !Location::from_absolute(self, offset).fits(len) {
            return Err(Error::OutOfRange {
                space: self,
                offset,
                len,
                capacity: self.capacity(),
            });
        }

        Ok(())
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Rom => write!(f, "ROM"),
            Space::Sram => write!(f, "SRAM"),
        }
    }
}

/// A position inside a space, as the user names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub space: Space,
    pub bank: u32,
    pub offset: u32,
}

impl Location {
    pub fn new(space: Space, bank: u32, offset: u32) -> Self {
        Self {
            space,
            bank,
            offset,
        }
    }

    pub fn from_absolute(space: Space, address: u32) -> Self {
        match space {
            Space::Rom => Self::new(space, address / BANK_SIZE, address % BANK_SIZE),
            Space::Sram => Self::new(space, 0, address),
        }
    }

    // address sent to the adapter. SRAM is flat, so the bank is ignored.
    pub fn absolute(&self) -> u32 {
        match self.space {
            Space::Rom => self.bank.wrapping_mul(BANK_SIZE).wrapping_add(self.offset),
            Space::Sram => self.offset,
        }
    }

    // base address of the bank this location sits in.
    pub fn base(&self) -> u32 {
        Location::new(self.space, self.bank, 0).absolute()
    }

    // true if a chunk of `len` bytes starting here stays inside the window.
    pub fn fits(&self, len: usize) -> bool {
        self.bank < self.space.banks()
            && self.offset as u64 + len as u64 <= self.space.capacity() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities() {
        assert_eq!(Space::Rom.capacity(), 0x400000);
        assert_eq!(Space::Sram.capacity(), 0x20000);
    }

    #[test]
    fn rom_banks_are_4mib_apart() {
        assert_eq!(Location::new(Space::Rom, 0, 0x150).absolute(), 0x150);
        assert_eq!(Location::new(Space::Rom, 1, 0).absolute(), 0x400000);
        assert_eq!(Location::new(Space::Rom, 1, 0x1000).base(), 0x400000);
        assert_eq!(
            Location::from_absolute(Space::Rom, 0x401000),
            Location::new(Space::Rom, 1, 0x1000)
        );
    }

    #[test]
    fn sram_ignores_bank() {
        assert_eq!(Location::new(Space::Sram, 3, 0x100).absolute(), 0x100);
        assert_eq!(Location::new(Space::Sram, 3, 0x100).base(), 0);
    }

    #[test]
    fn sram_boundary() {
        assert!(Space::Sram.check(SRAM_SIZE - 2, 2).is_ok());
        assert!(Space::Sram.check(0, SRAM_SIZE as usize).is_ok());

        match Space::Sram.check(SRAM_SIZE - 1, 2) {
            Err(Error::OutOfRange {
                space, capacity, ..
            }) => {
                assert_eq!(space, Space::Sram);
                assert_eq!(capacity, SRAM_SIZE);
            }
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn rom_transfers_stay_inside_a_bank() {
        assert!(Space::Rom.check(0, 512).is_ok());
        assert!(Space::Rom.check(BANK_SIZE, 512).is_ok());
        assert!(Space::Rom.check(BANK_SIZE - 4096, 4096).is_ok());
        assert!(Space::Rom.check(BANK_SIZE - 4096, 4097).is_err());
        // third bank does not exist.
        assert!(Space::Rom.check(2 * BANK_SIZE, 1).is_err());
    }

    #[test]
    fn fits_matches_copy_loop_limit() {
        let location = Location::new(Space::Sram, 0, SRAM_SIZE - 4096);
        assert!(location.fits(4096));
        assert!(!location.fits(4097));
        assert!(!Location::new(Space::Rom, 2, 0).fits(1));
    }
}
