//! TT21100 capacitive touchscreen controller device driver
//!
//! This crate provides a device driver for the Parade TT21100 capacitive
//! touchscreen controller, as found on the ESP32-S3-BOX.
//!
//! The TT21100 connects to the target via I2C and an optional interrupt pin.
//! The [`embedded_hal`](https://docs.rs/embedded-hal) `blocking::i2c` and
//! `digital::v2` interfaces are used, so should work with any target that
//! provides these.
//!
//! A TT21100 device is created with:
//!
//! ```rust
//!     let i2c = I2C::new(peripherals.I2C0, sda_pin, scl_pin, 400u32.kHz(), &clocks);
//!     let irq_pin = io.pins.gpio3.into_floating_input();
//!     let mut tt = tt21100::TT21100::new(i2c, tt21100::DEFAULT_I2C_ADDR, Some(irq_pin), &mut delay)?;
//! ```
//!
//! `new()` waits until the device reports data before returning.  After
//! that the number of active touches and the touch points themselves are
//! read with:
//!
//! ```rust
//!     if tt.touch_count()? > 0 {
//!         let touches = tt.touch_points()?;
//!         for t in &touches {
//!             info!("{}: {},{} ({})", t.id, t.x, t.y, t.pressure);
//!         }
//!     }
//! ```
//!
//! Every call performs its own I2C transaction.  The driver keeps a small
//! receive buffer which is reused by each call, so calls take `&mut self`;
//! share the driver between contexts only behind a mutex.
//!
//! Logging via [`defmt`](https://docs.rs/defmt) and `defmt::Format` for the
//! public types are available with the `defmt` feature.

#![cfg_attr(not(test), no_std)]

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::Read;
use embedded_hal::digital::v2::InputPin;
use paste;

macro_rules! log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "defmt")]
        defmt::$level!($($arg)*);
    };
}

pub mod layout;
pub mod report;
pub mod transaction;

pub use report::{TouchPoint, TouchPoints};
pub use transaction::{Bus, Transaction};

use layout::{EMPTY_QUEUE_LEN, HEADER_LEN, NO_DATA_LEN, PREFIX_SIZE, REPORT_BUF_SIZE};

/// Errors produced by the TT21100 device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// An error accessing the I2C interface
    BusError,
    /// An error reading the interrupt pin
    GPIOError,
    /// The device never reported data during start up
    InitializationTimeout,
    /// No complete touch frame was read within the retry budget
    ReadTimeout,
    /// A packet length that is not a touch report the driver can hold
    ///
    /// A packet larger than the receive buffer is left queued on the
    /// device, so it cannot be drained by further `touch_points()` or
    /// `touch_count()` calls; resetting the controller is the only way past
    /// it.
    MalformedPacket(u16),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Default I2C device address for TT21100 devices
pub const DEFAULT_I2C_ADDR: u8 = 0x24;

/// Retry budgets for the polling loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Length prefix reads made while waiting for the device to start
    pub init_attempts: u32,
    /// Delay between start up reads
    pub init_delay_ms: u32,
    /// Packet reads made by `touch_points()` while waiting for a touch frame
    pub frame_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            init_attempts: 50,
            init_delay_ms: 20,
            frame_attempts: 100,
        }
    }
}

/// TT21100 driver
pub struct TT21100<I2C, IRQ> {
    bus: Bus<I2C>,
    irq_pin: Option<IRQ>,
    config: Config,
    buf: [u8; REPORT_BUF_SIZE],
    data_len: [u8; PREFIX_SIZE],
}

impl<I2C, IRQ> TT21100<I2C, IRQ> {
    /// I2C address of the device
    pub fn addr(&self) -> u8 {
        self.bus.addr()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Destroy the driver, returning the I2C peripheral and interrupt pin
    pub fn release(self) -> (I2C, Option<IRQ>) {
        (self.bus.release(), self.irq_pin)
    }
}

impl<I2C, IRQ> TT21100<I2C, IRQ>
where
    IRQ: InputPin,
{
    /// Test if the interrupt pin signals pending data (pin low)
    ///
    /// Returns `Ok(None)` if the driver was created without an interrupt pin
    pub fn data_available(&self) -> Result<Option<bool>> {
        match &self.irq_pin {
            Some(pin) => pin.is_low().map(Some).map_err(|_| Error::GPIOError),
            None => Ok(None),
        }
    }
}

impl<I2C, IRQ> TT21100<I2C, IRQ>
where
    I2C: Read,
{
    /// Create a new TT21100 device and wait for it to start
    ///
    /// `i2c` is the I2C device
    /// `irq_pin` is an optional floating input GPIO
    pub fn new(
        i2c: I2C,
        addr: u8,
        irq_pin: Option<IRQ>,
        delay: &mut dyn DelayMs<u32>,
    ) -> Result<TT21100<I2C, IRQ>> {
        Self::new_with_config(i2c, addr, irq_pin, Config::default(), delay)
    }

    /// Create a new TT21100 device with explicit retry budgets
    pub fn new_with_config(
        i2c: I2C,
        addr: u8,
        irq_pin: Option<IRQ>,
        config: Config,
        delay: &mut dyn DelayMs<u32>,
    ) -> Result<TT21100<I2C, IRQ>> {
        let mut tt = TT21100 {
            bus: Bus::new(i2c, addr),
            irq_pin,
            config,
            buf: [0u8; REPORT_BUF_SIZE],
            data_len: [0u8; PREFIX_SIZE],
        };
        tt.init(delay)?;
        Ok(tt)
    }

    /// Wait until the device reports a non-zero length prefix
    ///
    /// Return `Ok(())` once data is reported, `Err(Error::InitializationTimeout)`
    /// if `init_attempts` reads all returned zero
    pub fn init(&mut self, delay: &mut dyn DelayMs<u32>) -> Result<()> {
        for attempt in 0..self.config.init_attempts {
            if attempt > 0 {
                delay.delay_ms(self.config.init_delay_ms);
            }
            let data_len = &mut self.data_len;
            let len = self.bus.with_transaction(|tx| tx.read_length(data_len))?;
            if len != NO_DATA_LEN {
                log!(debug, "tt21100 ready, length prefix {=u16}", len);
                return Ok(());
            }
        }
        log!(warn, "tt21100 did not start");
        Err(Error::InitializationTimeout)
    }

    /// Read the number of touches currently detected
    ///
    /// Header-only packets are read and discarded, as the device does not
    /// move past them otherwise.  Only the length prefix of other packets is
    /// read, so counts above what `touch_points()` can decode are reported
    /// too, up to `MAX_REPORTED_TOUCHES`.
    pub fn touch_count(&mut self) -> Result<usize> {
        let TT21100 {
            bus, buf, data_len, ..
        } = self;
        let len = bus.with_transaction(|tx| {
            let len = tx.read_length(data_len)?;
            if len == HEADER_LEN {
                tx.read_into(buf, usize::from(HEADER_LEN))?;
            }
            Ok(len)
        })?;

        match len {
            NO_DATA_LEN | EMPTY_QUEUE_LEN => Ok(0),
            len => report::touches_in_len(len).map_err(|e| {
                log!(warn, "unexpected length prefix {=u16}", len);
                e
            }),
        }
    }

    /// Read the touch points of the next touch frame
    ///
    /// Packets are read until one carries a complete touch frame or the
    /// device reports an empty queue, in which case no touch points are
    /// returned.  Gives up with `Err(Error::ReadTimeout)` after
    /// `frame_attempts` packets.
    pub fn touch_points(&mut self) -> Result<TouchPoints> {
        let TT21100 {
            bus,
            buf,
            data_len,
            config,
            ..
        } = self;

        for _ in 0..config.frame_attempts {
            let len = bus.with_transaction(|tx| {
                let len = tx.read_length(data_len)?;
                if len == EMPTY_QUEUE_LEN {
                    return Ok(None);
                }
                if usize::from(len) > buf.len() {
                    log!(warn, "packet of {=u16} bytes does not fit", len);
                    return Err(Error::MalformedPacket(len));
                }
                tx.read_into(buf, usize::from(len))?;
                Ok(Some(len))
            })?;

            let Some(len) = len else {
                return Ok(TouchPoints::default());
            };
            let frame = &buf[..usize::from(len)];
            if report::is_frame_ready(frame) {
                return report::decode_frame(frame);
            }
            log!(trace, "frame not ready, length {=u16}", len);
        }
        log!(warn, "no touch frame after {=u32} reads", config.frame_attempts);
        Err(Error::ReadTimeout)
    }
}

// End of file
