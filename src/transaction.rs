//! Scoped I2C transactions with the TT21100
//!
//! The TT21100 has no register addressing: every read returns whatever the
//! device has queued, starting with a two byte length prefix. Reading the
//! prefix and then the packet it announces must happen without any other bus
//! traffic in between, so both reads are done inside one
//! [`Bus::with_transaction`] call.

use embedded_hal::blocking::i2c::Read;

use crate::layout::PREFIX_SIZE;
use crate::{Error, Result};

/// I2C peripheral bound to the address of a TT21100
pub struct Bus<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C> Bus<I2C> {
    /// Bind `i2c` to the device at `addr`
    pub fn new(i2c: I2C, addr: u8) -> Bus<I2C> {
        Bus { i2c, addr }
    }

    /// Device address used for every read
    pub fn addr(&self) -> u8 {
        self.addr
    }

    /// Give back the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bus<I2C>
where
    I2C: Read,
{
    /// Perform a transaction with the TT21100
    ///
    /// The bus is held for the whole of `f`, so a length prefix and the
    /// payload read after it always belong to the same packet.  Access ends
    /// when `f` returns, whether it succeeded or not.  Bus faults are
    /// returned as [`Error::BusError`] and not retried.
    ///
    /// This relies on `I2C` being owned by the driver: a shared-bus proxy
    /// locks each read on its own and lets other devices in between.
    pub fn with_transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_, I2C>) -> Result<T>,
    {
        let mut tx = Transaction {
            i2c: &mut self.i2c,
            addr: self.addr,
        };
        f(&mut tx)
    }
}

/// Read access to the device for the duration of one transaction
pub struct Transaction<'a, I2C> {
    i2c: &'a mut I2C,
    addr: u8,
}

impl<'a, I2C> Transaction<'a, I2C>
where
    I2C: Read,
{
    /// Read `len` bytes from the device into the start of `buf`
    ///
    /// A zero length read does not touch the bus.
    pub fn read_into(&mut self, buf: &mut [u8], len: usize) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        let dst = buf
            .get_mut(..len)
            .ok_or(Error::MalformedPacket(u16::try_from(len).unwrap_or(u16::MAX)))?;
        self.i2c.read(self.addr, dst).map_err(|_| Error::BusError)
    }

    /// Read the little-endian length prefix of the next packet into `prefix`
    pub fn read_length(&mut self, prefix: &mut [u8; PREFIX_SIZE]) -> Result<u16> {
        self.read_into(prefix, PREFIX_SIZE)?;
        Ok(u16::from_le_bytes(*prefix))
    }
}
