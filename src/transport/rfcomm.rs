//! # Bluetooth RFCOMM Socket Transport
//!
//! Connects straight to a printer's Serial Port Profile channel with an
//! `AF_BLUETOOTH` stream socket, without binding a `/dev/rfcommN` device
//! first. The printer must already be paired.
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Look for "M02 Pro", note the address, e.g. DC:0D:30:XX:XX:XX
//! [bluetooth]# pair DC:0D:30:XX:XX:XX
//! ```
//!
//! The socket is owned by the link and closed when the link is dropped.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use log::{debug, info};

use crate::error::PhomemoError;

/// Bluetooth socket family (linux/socket.h).
#[cfg(target_os = "linux")]
const AF_BLUETOOTH: libc::c_int = 31;

/// RFCOMM protocol number (bluetooth/bluetooth.h).
#[cfg(target_os = "linux")]
const BTPROTO_RFCOMM: libc::c_int = 3;

/// `struct sockaddr_rc` from bluetooth/rfcomm.h.
#[cfg(target_os = "linux")]
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    /// Address bytes in little-endian order (reverse of the printed form).
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

/// An open RFCOMM connection to a printer.
pub struct RfcommLink {
    socket: File,
    channel: u8,
}

impl RfcommLink {
    /// Connect to `address` (`XX:XX:XX:XX:XX:XX`) on RFCOMM `channel`.
    ///
    /// ## Errors
    ///
    /// - [`PhomemoError::Configuration`] if the address is malformed
    /// - [`PhomemoError::Transmission`] if the socket cannot be created or
    ///   the printer does not accept the connection
    #[cfg(target_os = "linux")]
    pub fn connect(address: &str, channel: u8) -> Result<Self, PhomemoError> {
        use std::os::fd::{FromRawFd, OwnedFd};

        let bdaddr = parse_bdaddr(address)?;

        let fd = unsafe { libc::socket(AF_BLUETOOTH, libc::SOCK_STREAM, BTPROTO_RFCOMM) };
        if fd < 0 {
            return Err(PhomemoError::Transmission(format!(
                "Failed to create RFCOMM socket: {}",
                io::Error::last_os_error()
            )));
        }
        // Owned from here on: any early return closes it.
        let owned = unsafe { OwnedFd::from_raw_fd(fd) };

        let addr = SockaddrRc {
            rc_family: AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr,
            rc_channel: channel,
        };
        let result = unsafe {
            libc::connect(
                fd,
                &addr as *const SockaddrRc as *const libc::sockaddr,
                std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
            )
        };
        if result != 0 {
            return Err(PhomemoError::Transmission(format!(
                "Failed to connect to printer on channel {}: {}",
                channel,
                io::Error::last_os_error()
            )));
        }

        info!("connected to printer over RFCOMM channel {}", channel);
        Ok(Self {
            socket: File::from(owned),
            channel,
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn connect(address: &str, _channel: u8) -> Result<Self, PhomemoError> {
        parse_bdaddr(address)?;
        Err(PhomemoError::Transmission(
            "RFCOMM sockets are only supported on Linux".to_string(),
        ))
    }
}

impl super::Link for RfcommLink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PhomemoError> {
        self.socket
            .write_all(data)
            .map_err(|e| PhomemoError::Transmission(format!("Write failed: {}", e)))
    }
}

impl Drop for RfcommLink {
    fn drop(&mut self) {
        if let Err(e) = self.socket.flush() {
            debug!("flush before close failed: {}", e);
        }
        debug!("closing RFCOMM connection on channel {}", self.channel);
    }
}

/// Validate a Bluetooth MAC address format (XX:XX:XX:XX:XX:XX).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    if parts.len() != 6 {
        return false;
    }
    parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse `XX:XX:XX:XX:XX:XX` into the byte order the kernel expects.
fn parse_bdaddr(mac: &str) -> Result<[u8; 6], PhomemoError> {
    if !is_valid_mac(mac) {
        return Err(PhomemoError::Configuration(format!(
            "invalid Bluetooth address '{}'",
            mac
        )));
    }
    let mut bytes = [0u8; 6];
    for (i, part) in mac.split(':').enumerate() {
        bytes[5 - i] = u8::from_str_radix(part, 16)
            .map_err(|e| PhomemoError::Configuration(format!("invalid address byte '{}': {}", part, e)))?;
    }
    Ok(bytes)
}

/// Find an existing RFCOMM device bound to the given MAC address.
///
/// Reads `/proc/net/rfcomm` (format: `rfcomm0: XX:XX:XX:XX:XX:XX channel N ...`).
/// Returns the device path (e.g. `/dev/rfcomm0`) if one exists.
pub fn find_rfcomm_for_mac(mac: &str) -> Option<PathBuf> {
    let contents = fs::read_to_string("/proc/net/rfcomm").ok()?;
    let mac_upper = mac.to_uppercase();
    contents
        .lines()
        .filter(|line| line.to_uppercase().contains(&mac_upper))
        .filter_map(|line| line.split(':').next())
        .map(|dev_name| PathBuf::from(format!("/dev/{}", dev_name.trim())))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_mac() {
        assert!(is_valid_mac("DC:0D:30:AA:bb:0c"));
        assert!(!is_valid_mac("DC:0D:30:AA:BB"));
        assert!(!is_valid_mac("DC:0D:30:AA:BB:CCC"));
        assert!(!is_valid_mac("DC-0D-30-AA-BB-CC"));
        assert!(!is_valid_mac("ZZ:0D:30:AA:BB:CC"));
    }

    #[test]
    fn test_parse_bdaddr_reverses_bytes() {
        assert_eq!(
            parse_bdaddr("01:23:45:67:89:AB").unwrap(),
            [0xAB, 0x89, 0x67, 0x45, 0x23, 0x01]
        );
    }

    #[test]
    fn test_parse_bdaddr_rejects_garbage() {
        assert!(matches!(
            parse_bdaddr("printer"),
            Err(PhomemoError::Configuration(_))
        ));
    }
}
