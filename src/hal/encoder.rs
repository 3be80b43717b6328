use embedded_hal::Qei;

use super::PositionSensor;

/// Period of a 16-bit hardware counter.
pub const SIXTEEN_BIT_PERIOD: u32 = 1 << 16;

/// Accumulated position of a wrapping hardware counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionState {
    /// Unwrapped position (in counts).
    pub position: i64,

    /// The corrected delta from the most recent update.
    pub last_delta: i32,

    /// Number of counts before the hardware counter wraps.
    pub wrap_period: u32,
}

impl PositionState {
    pub fn new(wrap_period: u32) -> Self {
        Self {
            position: 0,
            last_delta: 0,
            wrap_period,
        }
    }

    /// Correct a raw counter delta for a single wrap of the counter and
    /// accumulate it.
    ///
    /// A raw delta larger than half the period is taken to have wrapped.
    /// Motion of more than half a period between two samples aliases and
    /// cannot be recovered.
    pub fn accumulate(&mut self, raw_delta: i64) -> i64 {
        let period = i64::from(self.wrap_period);
        let mut delta = raw_delta;
        if 2 * delta > period {
            delta -= period;
        } else if 2 * delta < -period {
            delta += period;
        }

        self.last_delta = delta as i32;
        self.position += delta;
        delta
    }
}

/// Quadrature encoder read through a hardware [`Qei`] counter.
pub struct Encoder<Q> {
    qei: Q,
    prev_count: u32,
    state: PositionState,
    id: Option<&'static str>,
}

impl<Q> Encoder<Q>
where
    Q: Qei,
    Q::Count: Into<u32>,
{
    /// Create an encoder for a counter that wraps after `wrap_period` counts.
    /// The current count becomes the reference sample.
    pub fn new(qei: Q, wrap_period: u32) -> Self {
        let prev_count = qei.count().into();
        Self {
            qei,
            prev_count,
            state: PositionState::new(wrap_period),
            id: None,
        }
    }

    /// Create an encoder for a 16-bit hardware timer.
    pub fn sixteen_bit(qei: Q) -> Self {
        Self::new(qei, SIXTEEN_BIT_PERIOD)
    }

    /// Builder method to set `id` and return `self`
    pub fn with_id(mut self, id: &'static str) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<&'static str> {
        self.id
    }

    /// The corrected delta from the most recent update.
    pub fn delta(&self) -> i32 {
        self.state.last_delta
    }

    /// Overwrite the accumulated position.
    pub fn set_position(&mut self, position: i64) {
        self.state.position = position;
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn free(self) -> Q {
        self.qei
    }
}

impl<Q> PositionSensor for Encoder<Q>
where
    Q: Qei,
    Q::Count: Into<u32>,
{
    fn update(&mut self) {
        let count: u32 = self.qei.count().into();
        let raw_delta = i64::from(count) - i64::from(self.prev_count);
        self.prev_count = count;

        let delta = self.state.accumulate(raw_delta);
        if delta != raw_delta {
            log::trace!(
                "{}: counter wrapped, delta {} -> {}",
                self.id.unwrap_or("encoder"),
                raw_delta,
                delta
            );
        }
    }

    fn read(&self) -> i64 {
        self.state.position
    }

    fn zero(&mut self) {
        self.state.position = 0;
    }
}
