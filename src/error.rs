//! Error types for the decoder driver.

use core::fmt;

/// Errors that can occur when communicating with the expander.
#[derive(Debug)]
pub enum DecoderError<E> {
    /// Underlying I2C bus error.
    I2c(E),

    /// Encoder channel index out of valid range (must be 0–7).
    InvalidChannel,

    /// Expander pin index out of valid range (must be 0–15).
    InvalidPin,
}

// Allow ergonomic `?` propagation from raw I2C errors.
impl<E> From<E> for DecoderError<E> {
    fn from(error: E) -> Self {
        DecoderError::I2c(error)
    }
}

impl<E: fmt::Debug> fmt::Display for DecoderError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecoderError::I2c(e) => write!(f, "I2C error: {:?}", e),
            DecoderError::InvalidChannel => write!(f, "Invalid channel index (must be 0-7)"),
            DecoderError::InvalidPin => write!(f, "Invalid pin index (must be 0-15)"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for DecoderError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            DecoderError::I2c(e) => defmt::write!(f, "I2C error: {}", e),
            DecoderError::InvalidChannel => defmt::write!(f, "Invalid channel index"),
            DecoderError::InvalidPin => defmt::write!(f, "Invalid pin index"),
        }
    }
}
