//! Channel fold-down.

/// Folds N interleaved channels into one mono sample per frame.
///
/// Mixing happens before any index-based cut or gain logic, because those
/// stages are expressed in mono-sample units. The accumulator carries state
/// across chunk boundaries so a frame split over two decoder outputs still
/// mixes correctly.
pub struct MonoMix {
    channels: u16,
    acc: i32,
    filled: u16,
}

impl MonoMix {
    pub fn new(channels: u16) -> Self {
        Self {
            channels: channels.max(1),
            acc: 0,
            filled: 0,
        }
    }

    /// Feed one interleaved sample; yields a mono sample when the frame
    /// completes (arithmetic mean of its channels).
    #[inline]
    pub fn push(&mut self, sample: i16) -> Option<i16> {
        if self.channels == 1 {
            return Some(sample);
        }
        self.acc += i32::from(sample);
        self.filled += 1;
        if self.filled == self.channels {
            let mean = self.acc / i32::from(self.channels);
            self.acc = 0;
            self.filled = 0;
            Some(mean as i16)
        } else {
            None
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}
