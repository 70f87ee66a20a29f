//! PCF8575 device constants.
//!
//! Unlike register-mapped expanders, the PCF8575 exposes a single 16-bit
//! quasi-bidirectional port: a read returns all pin states and a write
//! drives all outputs, high byte first on the wire in both directions.
//! There is no register addressing and no setup delay between transactions.

// ---------------------------------------------------------------------------
// Addressing
// ---------------------------------------------------------------------------

/// Default 7-bit I2C address (A0–A2 strapped low).
/// The three address straps select addresses 0x20–0x27.
pub const DEFAULT_ADDRESS: u8 = 0x20;

// ---------------------------------------------------------------------------
// Port geometry
// ---------------------------------------------------------------------------

/// Number of I/O pins on the expander port.
pub const PIN_COUNT: u8 = 16;

/// Maximum number of rotary encoder channels a fully populated port can
/// carry: one quadrature phase pair (two pins) per channel.
pub const MAX_CHANNELS: usize = 8;

/// Mask isolating one channel's 2-bit position field within a snapshot.
pub(crate) const POSITION_MASK: u16 = 0b11;
