use std::fmt;

use crate::error::{Error, Result};

// bytes read from the start of a bank to inspect its header.
pub const HEADER_SIZE: usize = 512;

// offsets to parts of the rom header.
pub const HEADER_LOGO: usize = 0x104;
pub const HEADER_TITLE: usize = 0x134;
pub const HEADER_CGBFLAG: usize = 0x143;
pub const HEADER_SGBFLAG: usize = 0x146;
pub const HEADER_TYPE: usize = 0x147;
pub const HEADER_ROMSIZE: usize = 0x148;
pub const HEADER_RAMSIZE: usize = 0x149;
pub const HEADER_REGION: usize = 0x14a;
pub const HEADER_OLDLICENSEE: usize = 0x14b;
pub const HEADER_ROMVER: usize = 0x14c;
pub const HEADER_CHKSUM: usize = 0x14d;
// first byte past the fields we look at.
pub const HEADER_END: usize = 0x150;

const TITLE_LENGTH: usize = 16;

const SGB_ENABLED: u8 = 0x03;
// SGB functions only work when the old licensee byte says "use new licensee".
const SGB_LICENSEE: u8 = 0x33;

// logo bytes the boot rom compares before starting a cartridge.
pub const LOGO: [u8; 0x30] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E, 0xDC, 0xCC, 0x6E, 0xE6, 0xDD, 0xDD, 0xD9, 0x99,
    0xBB, 0xBB, 0x67, 0x63, 0x6E, 0x0E, 0xEC, 0xCC, 0xDD, 0xDC, 0x99, 0x9F, 0xBB, 0xB9, 0x33, 0x3E,
];

/// Header checksum as computed by the boot rom: `x = x - byte - 1` over every
/// byte, wrapping at 8 bits.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |acc, &byte| acc.wrapping_sub(byte).wrapping_sub(1))
}

/// Which consoles a cartridge claims to support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hardware {
    CgbOnly,
    // never produced, see classify.
    CgbOnlySgb,
    CgbEnhancedSgb,
    CgbEnhanced,
    DmgSgb,
    Dmg,
}

impl Hardware {
    pub fn classify(cgb_flag: u8, sgb_flag: u8) -> Hardware {
        let cgb = cgb_flag & 0x80 != 0;
        let cgb_only = cgb && cgb_flag & 0x40 != 0;
        let sgb = sgb_flag == SGB_ENABLED;

        // the second arm is shadowed by the first. Kept in this order so the
        // reported support matches what the flashing tool has always printed.
        if cgb_only {
            Hardware::CgbOnly
        } else if cgb_only && sgb {
            Hardware::CgbOnlySgb
        } else if cgb && sgb {
            Hardware::CgbEnhancedSgb
        } else if cgb {
            Hardware::CgbEnhanced
        } else if sgb {
            Hardware::DmgSgb
        } else {
            Hardware::Dmg
        }
    }
}

impl fmt::Display for Hardware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Hardware::CgbOnly => "CGB only",
            Hardware::CgbOnlySgb => "CGB only, SGB enhanced (not a real set of options)",
            Hardware::CgbEnhancedSgb => "CGB enhanced, SGB enhanced, DMG compatible",
            Hardware::CgbEnhanced => "CGB enhanced, DMG compatible",
            Hardware::DmgSgb => "DMG, SGB enhanced",
            Hardware::Dmg => "DMG",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomSize {
    Kib(u32),
    Unknown(u8),
}

impl RomSize {
    pub fn from_code(code: u8) -> RomSize {
        match code {
            0..=7 => RomSize::Kib(32 << code),
            0x52 => RomSize::Kib(1152),
            0x53 => RomSize::Kib(1280),
            0x54 => RomSize::Kib(1536),
            _ => RomSize::Unknown(code),
        }
    }
}

impl fmt::Display for RomSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RomSize::Kib(kib) => write!(f, "{} KB ROM", kib),
            RomSize::Unknown(code) => write!(f, "Unknown ROM size code 0x{:02X}", code),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RamSize {
    None,
    Kib(u32),
    Unknown(u8),
}

impl RamSize {
    pub fn from_code(code: u8) -> RamSize {
        // 8 KiB banks.
        match code {
            0 => RamSize::None,
            2 => RamSize::Kib(8),
            3 => RamSize::Kib(4 * 8),
            4 => RamSize::Kib(16 * 8),
            5 => RamSize::Kib(8 * 8),
            _ => RamSize::Unknown(code),
        }
    }
}

impl fmt::Display for RamSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RamSize::None => write!(f, "no RAM"),
            RamSize::Kib(kib) => write!(f, "{} KB RAM", kib),
            RamSize::Unknown(code) => write!(f, "Unknown RAM size code 0x{:02X}", code),
        }
    }
}

pub fn cartridge_type_name(code: u8) -> Option<&'static str> {
    let name = match code {
        0x00 => "ROM ONLY",
        0x01 => "MBC1",
        0x02 => "MBC1+RAM",
        0x03 => "MBC1+RAM+BATTERY",
        0x05 => "MBC2",
        0x06 => "MBC2+BATTERY",
        0x08 => "ROM+RAM",
        0x09 => "ROM+RAM+BATTERY",
        0x0b => "MMM01",
        0x0c => "MMM01+RAM",
        0x0d => "MMM01+RAM+BATTERY",
        0x0f => "MBC3+TIMER+BATTERY",
        0x10 => "MBC3+TIMER+RAM+BATTERY",
        0x11 => "MBC3",
        0x12 => "MBC3+RAM",
        0x13 => "MBC3+RAM+BATTERY",
        0x19 => "MBC5",
        0x1a => "MBC5+RAM",
        0x1b => "MBC5+RAM+BATTERY",
        0x1c => "MBC5+RUMBLE",
        0x1d => "MBC5+RUMBLE+RAM",
        0x1e => "MBC5+RUMBLE+RAM+BATTERY",
        0x20 => "MBC6",
        0x22 => "MBC7+SENSOR+RUMBLE+RAM+BATTERY",
        0xfc => "POCKET CAMERA",
        0xfd => "BANDAI TAMA5",
        0xfe => "HuC3",
        0xff => "HuC1+RAM+BATTERY",
        _ => return None,
    };
    Some(name)
}

/// Findings that do not stop a dump but mean the cartridge misbehaves on hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    BadChecksum { computed: u8, stored: u8 },
    SgbLicensee { licensee: u8 },
    UnknownRomSize(u8),
    BadLogo,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::BadChecksum { computed, stored } => write!(
                f,
                "Cartridge header checksum invalid (computed 0x{:02X}, stored 0x{:02X}). This game will NOT boot on real hardware.",
                computed, stored
            ),
            Advisory::SgbLicensee { licensee } => write!(
                f,
                "SGB functions were enabled, but Old Licensee field is 0x{:02X}, not 33h. This game will not be able to use SGB functions on real hardware.",
                licensee
            ),
            Advisory::UnknownRomSize(code) => write!(f, "Unknown ROM size code 0x{:02X}", code),
            Advisory::BadLogo => write!(
                f,
                "Nintendo logo does not match. This game will NOT boot on real hardware."
            ),
        }
    }
}

/// The cartridge header found at the start of a ROM bank.
#[derive(Clone)]
pub struct RomHeader {
    bytes: [u8; HEADER_SIZE],
}

impl RomHeader {
    /// Takes a copy of the header. Images shorter than 512 bytes are accepted as
    /// long as every header field is present.
    pub fn parse(data: &[u8]) -> Result<RomHeader> {
        if data.len() < HEADER_END {
            return Err(Error::HeaderTooShort {
                needed: HEADER_END,
                got: data.len(),
            });
        }

        let mut bytes = [0; HEADER_SIZE];
        let len = data.len().min(HEADER_SIZE);
        bytes[..len].copy_from_slice(&data[..len]);

        Ok(RomHeader { bytes })
    }

    // title bytes up to the first zero, at most 16 of them.
    pub fn title_bytes(&self) -> &[u8] {
        let field = &self.bytes[HEADER_TITLE..HEADER_TITLE + TITLE_LENGTH];
        let len = field.iter().position(|&b| b == 0).unwrap_or(TITLE_LENGTH);
        &field[..len]
    }

    pub fn title(&self) -> String {
        let mut title = String::with_capacity(TITLE_LENGTH);
        for &byte in self.title_bytes() {
            title.push(byte as char);
        }
        title
    }

    pub fn cgb_flag(&self) -> u8 {
        self.bytes[HEADER_CGBFLAG]
    }

    pub fn sgb_flag(&self) -> u8 {
        self.bytes[HEADER_SGBFLAG]
    }

    pub fn cartridge_type(&self) -> u8 {
        self.bytes[HEADER_TYPE]
    }

    pub fn rom_size_code(&self) -> u8 {
        self.bytes[HEADER_ROMSIZE]
    }

    pub fn ram_size_code(&self) -> u8 {
        self.bytes[HEADER_RAMSIZE]
    }

    pub fn region(&self) -> u8 {
        self.bytes[HEADER_REGION]
    }

    pub fn old_licensee(&self) -> u8 {
        self.bytes[HEADER_OLDLICENSEE]
    }

    pub fn version(&self) -> u8 {
        self.bytes[HEADER_ROMVER]
    }

    pub fn stored_checksum(&self) -> u8 {
        self.bytes[HEADER_CHKSUM]
    }

    pub fn computed_checksum(&self) -> u8 {
        checksum(&self.bytes[HEADER_TITLE..HEADER_CHKSUM])
    }

    pub fn checksum_ok(&self) -> bool {
        self.computed_checksum() == self.stored_checksum()
    }

    pub fn logo_ok(&self) -> bool {
        self.bytes[HEADER_LOGO..HEADER_LOGO + LOGO.len()] == LOGO
    }

    pub fn hardware(&self) -> Hardware {
        Hardware::classify(self.cgb_flag(), self.sgb_flag())
    }

    pub fn rom_size(&self) -> RomSize {
        RomSize::from_code(self.rom_size_code())
    }

    pub fn ram_size(&self) -> RamSize {
        RamSize::from_code(self.ram_size_code())
    }

    pub fn sgb_licensee_mismatch(&self) -> bool {
        self.sgb_flag() == SGB_ENABLED && self.old_licensee() != SGB_LICENSEE
    }

    pub fn inspect(&self) -> Inspection {
        let mut advisories = Vec::new();

        if !self.logo_ok() {
            advisories.push(Advisory::BadLogo);
        }
        if !self.checksum_ok() {
            advisories.push(Advisory::BadChecksum {
                computed: self.computed_checksum(),
                stored: self.stored_checksum(),
            });
        }
        if self.sgb_licensee_mismatch() {
            advisories.push(Advisory::SgbLicensee {
                licensee: self.old_licensee(),
            });
        }
        if let RomSize::Unknown(code) = self.rom_size() {
            advisories.push(Advisory::UnknownRomSize(code));
        }

        Inspection {
            title: self.title(),
            hardware: self.hardware(),
            checksum_ok: self.checksum_ok(),
            cartridge_type: self.cartridge_type(),
            rom_size: self.rom_size(),
            ram_size: self.ram_size(),
            region: self.region(),
            version: self.version(),
            advisories,
        }
    }
}

impl fmt::Debug for RomHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RomHeader")
            .field("title", &self.title())
            .field("cgb_flag", &self.cgb_flag())
            .field("sgb_flag", &self.sgb_flag())
            .field("cartridge_type", &self.cartridge_type())
            .field("rom_size", &self.rom_size_code())
            .field("ram_size", &self.ram_size_code())
            .field("checksum", &self.stored_checksum())
            .finish()
    }
}

/// Everything we report about one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub title: String,
    pub hardware: Hardware,
    pub checksum_ok: bool,
    pub cartridge_type: u8,
    pub rom_size: RomSize,
    pub ram_size: RamSize,
    pub region: u8,
    pub version: u8,
    pub advisories: Vec<Advisory>,
}

impl fmt::Display for Inspection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Hardware support: {}", self.hardware)?;
        match cartridge_type_name(self.cartridge_type) {
            Some(name) => writeln!(f, "Cartridge type: {:02X}: {}", self.cartridge_type, name)?,
            None => writeln!(f, "Cartridge type: {:02X}: unknown", self.cartridge_type)?,
        }
        if let RomSize::Kib(_) = self.rom_size {
            writeln!(f, "{}", self.rom_size)?;
        }
        writeln!(f, "{}", self.ram_size)?;
        writeln!(
            f,
            "Region: {}, version {}",
            if self.region == 0 { "Japan" } else { "Overseas" },
            self.version
        )?;
        if self.checksum_ok {
            writeln!(f, "Cartridge header checksum OK.")?;
        }
        for advisory in &self.advisories {
            writeln!(f, "{}", advisory)?;
        }
        Ok(())
    }
}
