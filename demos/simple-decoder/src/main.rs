//! Simple decoder example
//!
//! Demonstrates basic usage of the rotary-decoder crate on the Raspberry Pi
//! Pico 2. Polls a PCF8575 carrying up to eight rotary encoders every few
//! milliseconds and logs the counts via defmt whenever any knob moves.
//!
//! # Wiring
//!
//! | Signal    | Pico 2 Pin | Notes                          |
//! |-----------|------------|--------------------------------|
//! | I2C0 SDA  | GP20       |                                |
//! | I2C0 SCL  | GP21       |                                |
//! | PCF8575   | addr 0x20  | A0–A2 strapped low             |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp as hal;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Duration, Timer};
use {defmt_rtt as _, panic_probe as _};

use rotary_decoder::{RotaryDecoder, DEFAULT_ADDRESS};

/// Tell the Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

// Wire the I2C0 interrupt to Embassy's handler.
bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // --- I2C bus (GP20 = SDA, GP21 = SCL) ---
    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_21, // SCL
        p.PIN_20, // SDA
        Irqs,
        i2c::Config::default(),
    );

    // --- Decoder ---
    let mut decoder = RotaryDecoder::new(i2c, DEFAULT_ADDRESS);

    if let Err(e) = decoder.init(8).await {
        error!("Decoder init failed: {}", e);
    }

    // Adopt the current pin levels as the baseline so the unknown
    // power-up wiring state does not register as movement.
    match decoder.read_initial_state().await {
        Ok(snapshot) => info!("Initial port state: {=u16:#x}", snapshot),
        Err(e) => error!("Initial read failed: {}", e),
    }

    info!("Decoder example started — rotate knobs to see count changes");

    // Main loop: poll, log on change, repeat.
    loop {
        match decoder.update().await {
            Ok(true) => {
                info!(
                    "Counts: [{}, {}, {}, {}, {}, {}, {}, {}]",
                    decoder.count(0),
                    decoder.count(1),
                    decoder.count(2),
                    decoder.count(3),
                    decoder.count(4),
                    decoder.count(5),
                    decoder.count(6),
                    decoder.count(7),
                );
            }
            Ok(false) => {}
            Err(e) => error!("Update failed: {}", e),
        }

        Timer::after(Duration::from_millis(2)).await;
    }
}
