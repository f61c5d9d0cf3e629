use std::path::PathBuf;
use std::time::Duration;

use dirs::config_local_dir;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::copy::{BUFFERSIZE_READ, BUFFERSIZE_WRITE};
use crate::error::{Error, Result};
use crate::session::{PRODUCT_ID, VENDOR_ID};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub read_blocksize: usize,
    pub write_blocksize: usize,
    // 0 waits forever.
    pub timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            interface: 0,
            read_blocksize: BUFFERSIZE_READ,
            write_blocksize: BUFFERSIZE_WRITE,
            timeout_ms: 5000,
        }
    }
}

impl Config {
    // ~/.config/emscart/config.yml on linux.
    pub fn path() -> Option<PathBuf> {
        let mut path = config_local_dir()?;
        path.push("emscart");
        path.push("config.yml");
        Some(path)
    }

    /// Loads the config file, falling back to defaults when there is none.
    pub fn load() -> Result<Config> {
        let path = match Config::path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        };

        debug!("loading config from {}", path.display());
        let yaml = std::fs::read_to_string(&path)?;
        Config::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Config> {
        let config: Config = serde_yml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    // copy loops need at least one byte per transfer.
    pub fn validate(&self) -> Result<()> {
        if self.read_blocksize == 0 {
            return Err(Error::Config("read_blocksize must be at least 1".to_string()));
        }
        if self.write_blocksize == 0 {
            return Err(Error::Config("write_blocksize must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.vendor_id, 0x4670);
        assert_eq!(config.product_id, 0x9394);
        assert_eq!(config.read_blocksize, 4096);
        assert_eq!(config.write_blocksize, 32);
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = Config::from_yaml("timeout_ms: 0\nwrite_blocksize: 64\n").unwrap();
        assert_eq!(config.timeout(), Duration::ZERO);
        assert_eq!(config.write_blocksize, 64);
        assert_eq!(config.read_blocksize, BUFFERSIZE_READ);
    }

    #[test]
    fn yaml_round_trip() {
        let config = Config {
            interface: 1,
            ..Config::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn zero_blocksizes_are_rejected() {
        for yaml in ["write_blocksize: 0\n", "read_blocksize: 0\n"] {
            match Config::from_yaml(yaml) {
                Err(Error::Config(msg)) => assert!(msg.contains("blocksize"), "{}", msg),
                other => panic!("{:?} accepted: {:?}", yaml, other),
            }
        }
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(matches!(
            Config::from_yaml("read_blocksize: lots"),
            Err(Error::Config(_))
        ));
    }
}
