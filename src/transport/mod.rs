//! # Printer Transport Layer
//!
//! This module provides communication backends for sending data to printers.
//!
//! ## Available Transports
//!
//! - [`rfcomm`]: Direct Bluetooth RFCOMM socket to a MAC address (Linux)
//! - [`tty`]: A pre-bound `/dev/rfcommN` device in raw TTY mode
//! - `Vec<u8>`: In-memory sink, used for tests and dry runs
//!
//! ## Connection Lifetime
//!
//! A connection is a `Box<dyn Link>` returned by [`Connect::connect`]. It is
//! closed when dropped, so every exit path of the code that holds it
//! (success, protocol error, failed write) releases the link.
//!
//! ```no_run
//! use phomemo_layout::transport::{Connect, PrinterTarget};
//!
//! let target = PrinterTarget::Rfcomm {
//!     address: "DC:0D:30:AA:BB:CC".to_string(),
//!     channel: 1,
//! };
//! {
//!     let mut link = target.connect()?;
//!     link.write_all(&[0x1B, 0x40])?;
//! } // closed here
//! # Ok::<(), phomemo_layout::PhomemoError>(())
//! ```

pub mod rfcomm;
pub mod tty;

use std::path::PathBuf;

use log::debug;

use crate::error::PhomemoError;

pub use rfcomm::RfcommLink;
pub use tty::DeviceLink;

/// An open, ordered byte sink to the printer.
///
/// Implementations must either write every byte or return an error; the
/// protocol layer has no partial-write or retry handling.
pub trait Link {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PhomemoError>;
}

impl Link for Vec<u8> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PhomemoError> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Something that can open a [`Link`].
pub trait Connect {
    fn connect(&self) -> Result<Box<dyn Link>, PhomemoError>;

    /// Short label for reports. Never includes an address.
    fn kind(&self) -> &'static str {
        "custom"
    }

    fn channel(&self) -> Option<u8> {
        None
    }
}

/// Where a job is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterTarget {
    /// Bluetooth MAC address and RFCOMM channel.
    Rfcomm { address: String, channel: u8 },
    /// An already-bound serial device such as `/dev/rfcomm0`.
    Device(PathBuf),
}

impl Connect for PrinterTarget {
    fn kind(&self) -> &'static str {
        match self {
            PrinterTarget::Rfcomm { .. } => "rfcomm",
            PrinterTarget::Device(_) => "device",
        }
    }

    fn channel(&self) -> Option<u8> {
        match self {
            PrinterTarget::Rfcomm { channel, .. } => Some(*channel),
            PrinterTarget::Device(_) => None,
        }
    }

    fn connect(&self) -> Result<Box<dyn Link>, PhomemoError> {
        match self {
            PrinterTarget::Rfcomm { address, channel } => {
                if !rfcomm::is_valid_mac(address) {
                    return Err(PhomemoError::Configuration(format!(
                        "printer address '{}' is not a MAC address (XX:XX:XX:XX:XX:XX)",
                        address
                    )));
                }
                // Prefer a device the system already bound to this printer
                if let Some(device) = rfcomm::find_rfcomm_for_mac(address) {
                    debug!("using bound device {} for printer", device.display());
                    return Ok(Box::new(DeviceLink::open(device)?));
                }
                Ok(Box::new(RfcommLink::connect(address, *channel)?))
            }
            PrinterTarget::Device(path) => Ok(Box::new(DeviceLink::open(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_link_appends() {
        let mut sink: Vec<u8> = vec![1];
        sink.write_all(&[2, 3]).unwrap();
        Link::write_all(&mut sink, &[4]).unwrap();
        assert_eq!(sink, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_target_kind_hides_address() {
        let target = PrinterTarget::Rfcomm {
            address: "DC:0D:30:AA:BB:CC".to_string(),
            channel: 2,
        };
        assert_eq!(target.kind(), "rfcomm");
        assert_eq!(target.channel(), Some(2));

        let target = PrinterTarget::Device(PathBuf::from("/dev/rfcomm0"));
        assert_eq!(target.kind(), "device");
        assert_eq!(target.channel(), None);
    }

    #[test]
    fn test_malformed_address_is_configuration_error() {
        let target = PrinterTarget::Rfcomm {
            address: "not-a-mac".to_string(),
            channel: 1,
        };
        assert!(matches!(target.connect(), Err(PhomemoError::Configuration(_))));
    }
}
