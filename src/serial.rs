use super::*;

use crate::core::protocol::serial::*;

use std::ffi::OsStr;
use std::io::{Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::{SerialPort, SerialPortSettings};

pub const SERIAL_PORT_SETTINGS: SerialPortSettings = SerialPortSettings {
    baud_rate: BAUD_RATE,
    data_bits: DATA_BITS,
    stop_bits: STOP_BITS,
    parity: PARITY,
    flow_control: FLOW_CONTROL,
    // Reads are paced by the driver's own receive window, not the port.
    timeout: Duration::from_millis(0),
};

/// Settle time after opening the port before the sensor accepts commands.
pub const POWER_UP_SETTLE: Duration = Duration::from_millis(100);

/// [`Transport`] over a local serial port.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, frame: &[u8]) {
        if let Err(err) = self.port.write_all(frame) {
            log::warn!("Failed to transmit command frame: {}", err);
        }
    }

    fn recv(&mut self) -> Option<u8> {
        match self.port.bytes_to_read() {
            Ok(0) => None,
            Ok(_) => {
                let mut byte = [0u8; 1];
                match self.port.read(&mut byte) {
                    Ok(1) => Some(byte[0]),
                    Ok(_) => None,
                    Err(err) => {
                        log::warn!("Serial read failed: {}", err);
                        None
                    }
                }
            }
            Err(err) => {
                log::warn!("Serial poll failed: {}", err);
                None
            }
        }
    }
}

/// [`MonotonicClock`] counting milliseconds since its construction.
pub struct SystemClock {
    epoch: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl MonotonicClock for SystemClock {
    fn now_millis(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

/// Open a serial port with the fixed line parameters, wait out the sensor's
/// power-up settle time and hand back a driver ready for
/// [`Slt5006::init`].
pub fn open<T: AsRef<OsStr> + ?Sized>(
    path: &T,
) -> serialport::Result<Slt5006<SerialTransport, SystemClock>> {
    log::info!(
        "Connecting to serial port {}",
        path.as_ref().to_string_lossy()
    );
    let port = serialport::open_with_settings(path, &SERIAL_PORT_SETTINGS)?;
    thread::sleep(POWER_UP_SETTLE);
    Ok(Slt5006::new(SerialTransport::new(port), SystemClock::default()))
}
