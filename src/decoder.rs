//! Quadrature decode core for a PCF8575-connected encoder bank.
//!
//! [`RotaryDecoder`] wraps the low-level transport with per-channel decode
//! state. One port read samples all encoders at once; each channel's 2-bit
//! Gray-code field is compared against its previous value and classified
//! as a forward step, a reverse step, or a missed-sample skip.

use embedded_hal_async::i2c::I2c;

use crate::driver::Pcf8575Driver;
use crate::error::DecoderError;
use crate::registers::{MAX_CHANNELS, PIN_COUNT, POSITION_MASK};

/// Extract channel `i`'s 2-bit position field from a port snapshot.
fn field(snapshot: u16, channel: usize) -> u8 {
    ((snapshot >> (2 * channel)) & POSITION_MASK) as u8
}

/// Quadrature decoder for up to eight rotary encoders behind a PCF8575.
///
/// Channel `i` occupies port pins `2i` (phase A) and `2i + 1` (phase B).
/// The decoder is purely polled: call [`update`](Self::update) or
/// [`update_weighted`](Self::update_weighted) at whatever cadence the
/// application needs, and read the accumulated positions with
/// [`count`](Self::count).
///
/// All state lives in fixed-size arrays; there is no allocation and no
/// locking. The `&mut self` receiver on every mutating operation leaves
/// serialization of concurrent callers to the application, matching a
/// single-task polling loop.
///
/// # Example
///
/// ```no_run
/// use embedded_hal_async::i2c::I2c;
/// use rotary_decoder::{DecoderError, RotaryDecoder, DEFAULT_ADDRESS};
///
/// async fn wait_for_detents<B: I2c>(bus: B) -> Result<(), DecoderError<B::Error>> {
///     let mut decoder = RotaryDecoder::new(bus, DEFAULT_ADDRESS);
///     decoder.init(2).await?;
///     decoder.read_initial_state().await?;
///     while decoder.count(0) < 100 {
///         decoder.update().await?;
///     }
///     Ok(())
/// }
/// ```
pub struct RotaryDecoder<I2C> {
    driver: Pcf8575Driver<I2C>,
    /// Configured number of active channels, clamped to [`MAX_CHANNELS`].
    channels: u8,
    /// Port snapshot seen by the last state-changing read.
    last_snapshot: u16,
    /// Per-channel 2-bit position as of the last update.
    last_pos: [u8; MAX_CHANNELS],
    /// Per-channel signed step accumulators.
    counts: [i32; MAX_CHANNELS],
}

impl<I2C> RotaryDecoder<I2C>
where
    I2C: I2c,
{
    /// Create a new decoder.
    ///
    /// No bus traffic happens here; call [`init`](Self::init) to verify
    /// the device answers.
    ///
    /// # Arguments
    /// * `i2c` — I2C peripheral (takes ownership for exclusive access)
    /// * `address` — 7-bit I2C device address (0x20–0x27)
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            driver: Pcf8575Driver::new(i2c, address),
            channels: 0,
            last_snapshot: 0,
            last_pos: [0; MAX_CHANNELS],
            counts: [0; MAX_CHANNELS],
        }
    }

    /// Give the I2C peripheral back to the caller, consuming the decoder.
    pub fn release(self) -> I2C {
        self.driver.release()
    }

    // -----------------------------------------------------------------------
    // Setup
    // -----------------------------------------------------------------------

    /// Configure the number of active encoder channels and probe the device.
    ///
    /// `channels` is silently clamped to [`MAX_CHANNELS`]. Counters are
    /// left untouched, so `init` may be called again after a bus fault
    /// without losing accumulated positions; use [`reset`](Self::reset)
    /// for explicit zeroing.
    ///
    /// # Errors
    /// [`DecoderError::I2c`] if no device acknowledges at the configured
    /// address. The channel count is recorded either way.
    pub async fn init(&mut self, channels: u8) -> Result<(), DecoderError<I2C::Error>> {
        self.channels = channels.min(MAX_CHANNELS as u8);
        self.driver.probe().await
    }

    /// Whether a device currently acknowledges at the configured address.
    pub async fn is_connected(&mut self) -> bool {
        self.driver.probe().await.is_ok()
    }

    /// Zero every channel's position and counter, and the snapshot cache.
    pub fn reset(&mut self) {
        self.last_pos = [0; MAX_CHANNELS];
        self.counts = [0; MAX_CHANNELS];
        self.last_snapshot = 0;
    }

    /// Read one snapshot and adopt it as the decode baseline.
    ///
    /// Seeds the snapshot cache and each active channel's last position
    /// without touching any counter. Call this once after power-up or
    /// [`reset`](Self::reset): the idle levels of the encoder contacts are
    /// arbitrary, and decoding against a zeroed baseline would register
    /// phantom steps.
    ///
    /// Returns the raw snapshot.
    pub async fn read_initial_state(&mut self) -> Result<u16, DecoderError<I2C::Error>> {
        let snapshot = self.driver.read16().await?;
        self.last_snapshot = snapshot;
        for channel in 0..self.channels as usize {
            self.last_pos[channel] = field(snapshot, channel);
        }
        Ok(snapshot)
    }

    // -----------------------------------------------------------------------
    // Polling
    // -----------------------------------------------------------------------

    /// Whether the port state differs from the last decoded snapshot.
    ///
    /// Reads the port but mutates nothing, so it is a cheap pre-check in
    /// front of [`update`](Self::update) when the caller wants to skip
    /// work on idle polls.
    pub async fn has_changed(&mut self) -> Result<bool, DecoderError<I2C::Error>> {
        let snapshot = self.driver.read16().await?;
        Ok(snapshot != self.last_snapshot)
    }

    /// Read one snapshot and step every active channel.
    ///
    /// Returns `Ok(false)` without touching any state when the snapshot
    /// equals the cached one. Otherwise each channel's transition is
    /// classified: single steps around the Gray cycle `0→1→3→2` move the
    /// counter by ±1, and skip transitions (both phases flipped between
    /// polls, so the intermediate sample was missed) are dropped because
    /// they carry no direction information. Poll faster if skips matter.
    ///
    /// # Errors
    /// [`DecoderError::I2c`] on a failed port read; no state is modified.
    pub async fn update(&mut self) -> Result<bool, DecoderError<I2C::Error>> {
        let Some(snapshot) = self.refresh().await? else {
            return Ok(false);
        };
        for channel in 0..self.channels as usize {
            let current = field(snapshot, channel);
            match (self.last_pos[channel] << 2) | current {
                0b0001 | 0b0111 | 0b1110 | 0b1000 => {
                    self.counts[channel] = self.counts[channel].wrapping_add(1);
                }
                0b0010 | 0b0100 | 0b1101 | 0b1011 => {
                    self.counts[channel] = self.counts[channel].wrapping_sub(1);
                }
                // Skip codes and unchanged fields leave the counter alone.
                _ => {}
            }
            self.last_pos[channel] = current;
        }
        Ok(true)
    }

    /// Like [`update`](Self::update), but weight each transition by its
    /// step distance: +1 for a single step, +2 for a skip, +3 for a
    /// reverse single step (three positions in the forward direction).
    ///
    /// Every weight is positive: a skip carries no direction information,
    /// and this variant resolves the ambiguity by always crediting forward
    /// motion. That suits a detented knob turned one way, and over-counts
    /// under fast bidirectional rotation. The ambiguity is inherent to
    /// 2-bit sampling; no single sample pair can resolve it.
    ///
    /// # Errors
    /// [`DecoderError::I2c`] on a failed port read; no state is modified.
    pub async fn update_weighted(&mut self) -> Result<bool, DecoderError<I2C::Error>> {
        let Some(snapshot) = self.refresh().await? else {
            return Ok(false);
        };
        for channel in 0..self.channels as usize {
            let current = field(snapshot, channel);
            let steps = match (self.last_pos[channel] << 2) | current {
                0b0001 | 0b0111 | 0b1110 | 0b1000 => 1,
                0b0011 | 0b0110 | 0b1001 | 0b1100 => 2,
                0b0010 | 0b0100 | 0b1101 | 0b1011 => 3,
                _ => 0,
            };
            self.counts[channel] = self.counts[channel].wrapping_add(steps);
            self.last_pos[channel] = current;
        }
        Ok(true)
    }

    /// Read the port and refresh the snapshot cache.
    ///
    /// Returns `None` when the port matches the cache (nothing to decode).
    async fn refresh(&mut self) -> Result<Option<u16>, DecoderError<I2C::Error>> {
        let snapshot = self.driver.read16().await?;
        if snapshot == self.last_snapshot {
            return Ok(None);
        }
        self.last_snapshot = snapshot;
        Ok(Some(snapshot))
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Accumulated count for `channel`, or 0 for an out-of-range index.
    pub fn count(&self, channel: u8) -> i32 {
        if channel as usize >= MAX_CHANNELS {
            return 0;
        }
        self.counts[channel as usize]
    }

    /// Overwrite a channel's accumulator. The channel's last observed
    /// position is untouched, so subsequent updates continue seamlessly.
    ///
    /// # Errors
    /// [`DecoderError::InvalidChannel`] if `channel >= 8`.
    pub fn set_count(&mut self, channel: u8, value: i32) -> Result<(), DecoderError<I2C::Error>> {
        if channel as usize >= MAX_CHANNELS {
            return Err(DecoderError::InvalidChannel);
        }
        self.counts[channel as usize] = value;
        Ok(())
    }

    /// Last observed 2-bit position for `channel` (debug aid), or 0 for an
    /// out-of-range index.
    pub fn last_position(&self, channel: u8) -> u8 {
        if channel as usize >= MAX_CHANNELS {
            return 0;
        }
        self.last_pos[channel as usize]
    }

    /// The configured (clamped) number of active channels.
    pub fn channel_count(&self) -> u8 {
        self.channels
    }

    // -----------------------------------------------------------------------
    // Raw port access
    // -----------------------------------------------------------------------

    /// Read the raw 16-bit port state, bypassing the decode state.
    pub async fn read_snapshot(&mut self) -> Result<u16, DecoderError<I2C::Error>> {
        self.driver.read16().await
    }

    /// Drive the raw 16-bit port state, bypassing the decode state.
    pub async fn write_snapshot(&mut self, value: u16) -> Result<(), DecoderError<I2C::Error>> {
        self.driver.write16(value).await
    }

    /// Read a single expander pin.
    ///
    /// # Errors
    /// [`DecoderError::InvalidPin`] if `pin >= 16`;
    /// [`DecoderError::I2c`] on a failed port read.
    pub async fn read_pin(&mut self, pin: u8) -> Result<bool, DecoderError<I2C::Error>> {
        if pin >= PIN_COUNT {
            return Err(DecoderError::InvalidPin);
        }
        let snapshot = self.driver.read16().await?;
        Ok(snapshot & (1 << pin) != 0)
    }

    /// Drive a single expander pin, leaving the other 15 as read.
    ///
    /// Read-modify-write of the whole port; not atomic against other bus
    /// masters or tasks writing the same device.
    ///
    /// # Errors
    /// [`DecoderError::InvalidPin`] if `pin >= 16`;
    /// [`DecoderError::I2c`] on a failed transaction.
    pub async fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), DecoderError<I2C::Error>> {
        if pin >= PIN_COUNT {
            return Err(DecoderError::InvalidPin);
        }
        let mut snapshot = self.driver.read16().await?;
        let mask = 1u16 << pin;
        if high {
            snapshot |= mask;
        } else {
            snapshot &= !mask;
        }
        self.driver.write16(snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::DEFAULT_ADDRESS;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, Operation};
    use futures_lite::future::block_on;
    use std::collections::VecDeque;

    /// Bus double: replays queued port states and records every write.
    struct ScriptedBus {
        reads: VecDeque<u16>,
        writes: Vec<Vec<u8>>,
        fail: bool,
    }

    impl ScriptedBus {
        fn replay(reads: &[u16]) -> Self {
            Self {
                reads: reads.iter().copied().collect(),
                writes: Vec::new(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                reads: VecDeque::new(),
                writes: Vec::new(),
                fail: true,
            }
        }
    }

    impl ErrorType for ScriptedBus {
        type Error = ErrorKind;
    }

    impl I2c for ScriptedBus {
        async fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for operation in operations.iter_mut() {
                match operation {
                    Operation::Read(buf) => {
                        let value = self.reads.pop_front().expect("bus read with empty script");
                        // High byte first, matching the expander's wire order.
                        buf.copy_from_slice(&value.to_be_bytes());
                    }
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                }
            }
            Ok(())
        }
    }

    fn decoder(reads: &[u16]) -> RotaryDecoder<ScriptedBus> {
        RotaryDecoder::new(ScriptedBus::replay(reads), DEFAULT_ADDRESS)
    }

    /// Decoder with `channels` active and the baseline seeded from `initial`.
    fn primed(channels: u8, initial: u16, reads: &[u16]) -> RotaryDecoder<ScriptedBus> {
        let mut script = vec![initial];
        script.extend_from_slice(reads);
        let mut dec = decoder(&script);
        block_on(dec.init(channels)).unwrap();
        block_on(dec.read_initial_state()).unwrap();
        dec
    }

    #[test]
    fn init_clamps_channel_count() {
        let mut dec = decoder(&[]);
        block_on(dec.init(12)).unwrap();
        assert_eq!(dec.channel_count(), 8);
    }

    #[test]
    fn init_surfaces_bus_fault() {
        let mut dec = RotaryDecoder::new(ScriptedBus::failing(), DEFAULT_ADDRESS);
        let result = block_on(dec.init(4));
        assert!(matches!(result, Err(DecoderError::I2c(_))));
        // The clamped channel count is recorded even when the probe fails.
        assert_eq!(dec.channel_count(), 4);
    }

    #[test]
    fn read_initial_state_seeds_active_channels_only() {
        let mut dec = decoder(&[0xFFFF]);
        block_on(dec.init(2)).unwrap();
        let raw = block_on(dec.read_initial_state()).unwrap();
        assert_eq!(raw, 0xFFFF);
        assert_eq!(dec.last_position(0), 0b11);
        assert_eq!(dec.last_position(1), 0b11);
        // Channel 2 is inactive and stays unseeded.
        assert_eq!(dec.last_position(2), 0);
        for channel in 0..8 {
            assert_eq!(dec.count(channel), 0);
        }
    }

    #[test]
    fn update_short_circuits_on_identical_snapshot() {
        let mut dec = primed(2, 0x0005, &[0x0005]);
        assert!(!block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), 0);
        assert_eq!(dec.last_position(0), 0b01);
    }

    #[test]
    fn single_step_forward_increments() {
        let mut dec = primed(2, 0x0000, &[0x0001]);
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), 1);
        assert_eq!(dec.count(1), 0);
        assert_eq!(dec.last_position(0), 0b01);
    }

    #[test]
    fn single_step_reverse_decrements() {
        let mut dec = primed(2, 0x0000, &[0x0002]);
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), -1);
    }

    #[test]
    fn full_gray_cycle_counts_four() {
        let mut dec = primed(1, 0x0000, &[0x0001, 0x0003, 0x0002, 0x0000]);
        for _ in 0..4 {
            assert!(block_on(dec.update()).unwrap());
        }
        assert_eq!(dec.count(0), 4);
        assert_eq!(dec.last_position(0), 0);
    }

    #[test]
    fn reverse_gray_cycle_counts_minus_four() {
        let mut dec = primed(1, 0x0000, &[0x0002, 0x0003, 0x0001, 0x0000]);
        for _ in 0..4 {
            assert!(block_on(dec.update()).unwrap());
        }
        assert_eq!(dec.count(0), -4);
    }

    #[test]
    fn skip_transition_is_dropped_by_update() {
        // 00 → 11: both phases flipped between polls.
        let mut dec = primed(1, 0x0000, &[0x0003]);
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), 0);
        // The position still follows the port.
        assert_eq!(dec.last_position(0), 0b11);
    }

    #[test]
    fn update_weighted_credits_skip_as_two() {
        let mut dec = primed(1, 0x0000, &[0x0003]);
        assert!(block_on(dec.update_weighted()).unwrap());
        assert_eq!(dec.count(0), 2);
    }

    #[test]
    fn update_weighted_credits_reverse_step_as_three() {
        let mut dec = primed(1, 0x0000, &[0x0002]);
        assert!(block_on(dec.update_weighted()).unwrap());
        assert_eq!(dec.count(0), 3);
    }

    #[test]
    fn update_weighted_credits_single_step_as_one() {
        let mut dec = primed(1, 0x0000, &[0x0001]);
        assert!(block_on(dec.update_weighted()).unwrap());
        assert_eq!(dec.count(0), 1);
    }

    #[test]
    fn channels_decode_independently() {
        // 0b1001: channel 0 goes 00→01 (forward), channel 1 goes 00→10
        // (reverse) in the same snapshot.
        let mut dec = primed(2, 0x0000, &[0x0009]);
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), 1);
        assert_eq!(dec.count(1), -1);
    }

    #[test]
    fn inactive_channels_never_move() {
        let mut dec = primed(1, 0x0000, &[0x0004]);
        // Channel 1's field changed, but only channel 0 is active.
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(1), 0);
        assert_eq!(dec.last_position(1), 0);
    }

    #[test]
    fn has_changed_observes_without_decoding() {
        let mut dec = primed(1, 0x0000, &[0x0001, 0x0000, 0x0001]);
        assert!(block_on(dec.has_changed()).unwrap());
        assert!(!block_on(dec.has_changed()).unwrap());
        assert_eq!(dec.count(0), 0);
        // The cache was not advanced, so update still sees the change.
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), 1);
    }

    #[test]
    fn out_of_range_accessors_are_inert() {
        let mut dec = decoder(&[]);
        assert_eq!(dec.count(8), 0);
        assert_eq!(dec.last_position(8), 0);
        assert!(matches!(
            dec.set_count(8, 5),
            Err(DecoderError::InvalidChannel)
        ));
        for channel in 0..8 {
            assert_eq!(dec.count(channel), 0);
        }
    }

    #[test]
    fn set_count_preserves_position() {
        let mut dec = primed(1, 0x0002, &[]);
        dec.set_count(0, 42).unwrap();
        assert_eq!(dec.count(0), 42);
        assert_eq!(dec.last_position(0), 0b10);
    }

    #[test]
    fn counter_wraps_instead_of_panicking() {
        let mut dec = primed(1, 0x0000, &[0x0001]);
        dec.set_count(0, i32::MAX).unwrap();
        assert!(block_on(dec.update()).unwrap());
        assert_eq!(dec.count(0), i32::MIN);
    }

    #[test]
    fn reset_zeroes_state_and_cache() {
        let mut dec = primed(2, 0xFFFF, &[0x0000]);
        dec.set_count(0, 7).unwrap();
        dec.reset();
        assert_eq!(dec.count(0), 0);
        assert_eq!(dec.last_position(0), 0);
        // The cache is zeroed too, so an all-low port reads as unchanged.
        assert!(!block_on(dec.update()).unwrap());
    }

    #[test]
    fn write_pin_read_modify_writes_the_port() {
        let mut dec = decoder(&[0x0000, 0xFFFF]);
        block_on(dec.write_pin(3, true)).unwrap();
        block_on(dec.write_pin(3, false)).unwrap();
        let bus = dec.release();
        // High byte first on the wire.
        assert_eq!(bus.writes, vec![vec![0x00, 0x08], vec![0xFF, 0xF7]]);
    }

    #[test]
    fn read_pin_masks_the_snapshot() {
        let mut dec = decoder(&[0x0008, 0x0008]);
        assert!(block_on(dec.read_pin(3)).unwrap());
        assert!(!block_on(dec.read_pin(2)).unwrap());
    }

    #[test]
    fn pin_index_is_validated_before_bus_traffic() {
        // Empty script: any bus access would panic the fake.
        let mut dec = decoder(&[]);
        assert!(matches!(
            block_on(dec.read_pin(16)),
            Err(DecoderError::InvalidPin)
        ));
        assert!(matches!(
            block_on(dec.write_pin(16, true)),
            Err(DecoderError::InvalidPin)
        ));
    }

    #[test]
    fn write_snapshot_sends_value_verbatim() {
        let mut dec = decoder(&[]);
        block_on(dec.write_snapshot(0xABCD)).unwrap();
        let bus = dec.release();
        assert_eq!(bus.writes, vec![vec![0xAB, 0xCD]]);
    }
}
