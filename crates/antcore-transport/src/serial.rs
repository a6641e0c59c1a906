use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Driver;

/// Largest single read handed to the device.
const MAX_READ_CHUNK: usize = 4 * 1024;

/// Serial line settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    /// Line speed. ANT USB sticks default to 115200; older UART modules use 57600.
    pub baud_rate: u32,
    /// Upper bound on how long a read waits for the first byte.
    /// Rounded to tenths of a second, between 0.1s and 25.5s.
    pub read_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(100),
        }
    }
}

/// Driver for an ANT module exposed as a tty device.
///
/// The line is put into raw mode with `VMIN = 0` and a non-zero `VTIME`, so
/// every read returns after at most [`SerialConfig::read_timeout`].
pub struct SerialDriver {
    file: File,
    path: PathBuf,
    config: SerialConfig,
    chunk: Vec<u8>,
}

impl SerialDriver {
    /// Open a device with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, SerialConfig::default())
    }

    /// Open a device with explicit settings.
    pub fn open_with_config(path: impl AsRef<Path>, config: SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let speed = baud_constant(config.baud_rate).ok_or_else(|| {
            TransportError::Unsupported(format!("baud rate {}", config.baud_rate))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        configure_raw(&file, speed, vtime(config.read_timeout)).map_err(|source| {
            TransportError::Configure {
                path: path.clone(),
                source,
            }
        })?;

        info!(?path, baud = config.baud_rate, "opened serial device");

        Ok(Self {
            file,
            path,
            config,
            chunk: vec![0u8; MAX_READ_CHUNK],
        })
    }

    /// The device path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Line settings in effect.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Driver for SerialDriver {
    fn read(&mut self, max_bytes: usize) -> Result<Bytes> {
        let want = max_bytes.min(self.chunk.len());
        match self.file.read(&mut self.chunk[..want]) {
            Ok(n) => Ok(Bytes::copy_from_slice(&self.chunk[..n])),
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                Ok(Bytes::new())
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let n = self.file.write(data)?;
        self.file.flush()?;
        Ok(n)
    }

    fn name(&self) -> &str {
        "serial"
    }
}

impl std::fmt::Debug for SerialDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialDriver")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

fn configure_raw(file: &File, speed: libc::speed_t, vtime: libc::cc_t) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: `termios` is plain data; an all-zero value is a valid buffer for
    // `tcgetattr` to fill in.
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };

    // SAFETY: `fd` is an open descriptor owned by `file`, and `tio` is a valid
    // writable termios for the duration of each call.
    unsafe {
        if libc::tcgetattr(fd, &mut tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        libc::cfmakeraw(&mut tio);
        tio.c_cflag |= libc::CLOCAL | libc::CREAD;
        tio.c_cc[libc::VMIN] = 0;
        tio.c_cc[libc::VTIME] = vtime;
        if libc::cfsetispeed(&mut tio, speed) != 0 || libc::cfsetospeed(&mut tio, speed) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcsetattr(fd, libc::TCSANOW, &tio) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::tcflush(fd, libc::TCIOFLUSH) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    debug!(fd, vtime, "serial line configured");
    Ok(())
}

fn vtime(timeout: Duration) -> libc::cc_t {
    (timeout.as_millis() / 100).clamp(1, 255) as libc::cc_t
}

fn baud_constant(baud: u32) -> Option<libc::speed_t> {
    let speed = match baud {
        4_800 => libc::B4800,
        9_600 => libc::B9600,
        19_200 => libc::B19200,
        38_400 => libc::B38400,
        57_600 => libc::B57600,
        115_200 => libc::B115200,
        230_400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_usb_stick() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout, Duration::from_millis(100));
    }

    #[test]
    fn vtime_is_clamped_to_termios_range() {
        assert_eq!(vtime(Duration::ZERO), 1);
        assert_eq!(vtime(Duration::from_millis(250)), 2);
        assert_eq!(vtime(Duration::from_secs(60)), 255);
    }

    #[test]
    fn rejects_unknown_baud_rate() {
        let result = SerialDriver::open_with_config(
            "/dev/null",
            SerialConfig {
                baud_rate: 12_345,
                ..SerialConfig::default()
            },
        );
        assert!(matches!(result, Err(TransportError::Unsupported(_))));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let path = std::env::temp_dir().join(format!(
            "antcore-no-such-tty-{}",
            std::process::id()
        ));
        let result = SerialDriver::open(&path);
        assert!(matches!(result, Err(TransportError::Open { .. })));
    }

    #[test]
    fn non_tty_reports_configure_error() {
        let result = SerialDriver::open("/dev/null");
        assert!(matches!(result, Err(TransportError::Configure { .. })));
    }
}
