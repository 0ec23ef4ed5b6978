//! # RFCOMM Device Transport
//!
//! Writes to a serial device that the system already bound to the printer.
//!
//! ## Bluetooth Setup (Linux)
//!
//! ```bash
//! # Pair the printer, then bind it to an RFCOMM device
//! $ sudo rfcomm bind 0 DC:0D:30:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary raster data is transmitted
//! without modification:
//!
//! - **No input processing**: Disable IGNBRK, BRKINT, PARMRK, ISTRIP, etc.
//! - **No output processing**: Disable OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8 (8 data bits, no parity)
//! - **No echo**: Disable ECHO, ECHONL
//! - **Non-canonical mode**: Disable ICANON (no line buffering)
//!
//! ## Chunked Writes
//!
//! Large writes are split into chunks with a short pause between them to
//! avoid overrunning the Bluetooth buffer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info};

use crate::error::PhomemoError;

/// Default chunk size for writes (bytes)
const CHUNK_SIZE: usize = 4096;

/// Delay between chunks (milliseconds)
const CHUNK_DELAY_MS: u64 = 2;

/// # Serial Device Link
///
/// ## Example
///
/// ```no_run
/// use phomemo_layout::transport::{DeviceLink, Link};
///
/// let mut link = DeviceLink::open("/dev/rfcomm0")?;
/// link.write_all(&[0x1B, 0x40])?;
/// # Ok::<(), phomemo_layout::PhomemoError>(())
/// ```
pub struct DeviceLink {
    file: File,
    path: PathBuf,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl DeviceLink {
    /// Open the device for writing and put it in raw mode.
    ///
    /// ## Errors
    ///
    /// Returns [`PhomemoError::Transmission`] if:
    /// - The device doesn't exist
    /// - Permission denied (may need root or dialout group)
    /// - TTY configuration fails
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, PhomemoError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            PhomemoError::Transmission(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(&file)?;

        info!("opened printer device {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            chunk_size: CHUNK_SIZE,
            chunk_delay: Duration::from_millis(CHUNK_DELAY_MS),
        })
    }
}

impl super::Link for DeviceLink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), PhomemoError> {
        if data.len() <= self.chunk_size {
            self.file
                .write_all(data)
                .map_err(|e| PhomemoError::Transmission(format!("Write failed: {}", e)))?;
        } else {
            for chunk in data.chunks(self.chunk_size) {
                self.file
                    .write_all(chunk)
                    .map_err(|e| PhomemoError::Transmission(format!("Write failed: {}", e)))?;

                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }

        self.file
            .flush()
            .map_err(|e| PhomemoError::Transmission(format!("Flush failed: {}", e)))
    }
}

impl Drop for DeviceLink {
    fn drop(&mut self) {
        debug!("closing printer device {}", self.path.display());
    }
}

/// Configure an open device for raw TTY mode.
///
/// IXON/IXOFF/IXANY are cleared: 0x11 and 0x13 appear in the job header and
/// in raster data and must not be taken as flow control.
#[cfg(unix)]
fn configure_tty_raw(file: &File) -> Result<(), PhomemoError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();

    let mut termios = MaybeUninit::uninit();
    let result = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if result != 0 {
        return Err(PhomemoError::Transmission(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) };
    if result != 0 {
        return Err(PhomemoError::Transmission(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }

    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File) -> Result<(), PhomemoError> {
    Ok(())
}
