//! Async driver for PCF8575-based quadrature rotary decoder banks.
//!
//! This crate decodes up to eight quadrature rotary encoders wired to a
//! single PCF8575 16-bit I2C port expander. Each encoder occupies two
//! adjacent port pins, so one 16-bit port read samples every encoder at
//! once; the decoder turns the per-channel 2-bit Gray-code transitions
//! into signed position counters.
//!
//! # Architecture
//!
//! The crate is split into two layers:
//!
//! - **`driver`** (crate-private) — Low-level PCF8575 transport: device
//!   probing and MSB-first 16-bit port reads/writes.
//! - **[`RotaryDecoder`]** (public) — Per-channel decode state, the
//!   quadrature step classifier, and pin-level helpers.
//!
//! # Quick start
//!
//! ```no_run
//! use embedded_hal_async::i2c::I2c;
//! use rotary_decoder::{DecoderError, RotaryDecoder, DEFAULT_ADDRESS};
//!
//! async fn run<B: I2c>(bus: B) -> Result<(), DecoderError<B::Error>> {
//!     // Construct with any `embedded-hal-async` I2C implementation
//!     let mut decoder = RotaryDecoder::new(bus, DEFAULT_ADDRESS);
//!     decoder.init(8).await?;
//!
//!     // Seed from the current wiring state so the unknown power-up
//!     // pin levels do not register as movement.
//!     decoder.read_initial_state().await?;
//!
//!     loop {
//!         if decoder.update().await? {
//!             let _position = decoder.count(0);
//!             // ...
//!         }
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **`defmt`** — Enable [`defmt::Format`] implementations on error types
//!   for embedded logging.

#![cfg_attr(not(test), no_std)]

pub use decoder::RotaryDecoder;
pub use error::DecoderError;
pub use registers::{DEFAULT_ADDRESS, MAX_CHANNELS, PIN_COUNT};

mod decoder;
mod driver;
mod error;
mod registers;
