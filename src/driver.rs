//! Low-level PCF8575 bus transport.
//!
//! The expander has no register map: every read returns the full 16-bit
//! port state and every write drives it, high byte first. Connectivity is
//! probed with an address-only transaction.
//!
//! This module is crate-private — consumers interact with [`RotaryDecoder`]
//! in `decoder.rs` instead.
//!
//! [`RotaryDecoder`]: crate::RotaryDecoder

use embedded_hal_async::i2c::I2c;

use crate::error::DecoderError;

/// Low-level PCF8575 transport.
///
/// Owns an I2C peripheral and provides the 16-bit port read/write
/// primitives the decoder is built on.
pub(crate) struct Pcf8575Driver<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> Pcf8575Driver<I2C>
where
    I2C: I2c,
{
    /// Create a new transport.
    ///
    /// # Arguments
    /// * `i2c` — I2C peripheral (takes ownership for exclusive access)
    /// * `address` — 7-bit I2C device address (0x20–0x27)
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Give the I2C peripheral back to the caller.
    pub fn release(self) -> I2C {
        self.i2c
    }

    // -----------------------------------------------------------------------
    // Core transport primitives
    // -----------------------------------------------------------------------

    /// Probe the device with an address-only transaction.
    ///
    /// The expander acknowledges its address with no payload, so a
    /// zero-length write succeeds exactly when a device answers at the
    /// configured address. Nothing distinguishes an absent device from a
    /// wiring or bus fault at this layer.
    pub async fn probe(&mut self) -> Result<(), DecoderError<I2C::Error>> {
        self.i2c.write(self.address, &[]).await?;
        Ok(())
    }

    /// Read the 16-bit port state. The device transmits the high byte first.
    pub async fn read16(&mut self) -> Result<u16, DecoderError<I2C::Error>> {
        let mut buf = [0u8; 2];
        self.i2c.read(self.address, &mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Drive the 16-bit port state, high byte first.
    pub async fn write16(&mut self, value: u16) -> Result<(), DecoderError<I2C::Error>> {
        self.i2c.write(self.address, &value.to_be_bytes()).await?;
        Ok(())
    }
}
