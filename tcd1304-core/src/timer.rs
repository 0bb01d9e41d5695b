//! Integration timer collaborator.
//!
//! The sensor's integration time is set by a hardware timer whose period
//! spans one exposure and whose compare output produces the shutter pulse.

/// Hardware timer driving the integration period.
///
/// Both methods run synchronously from the polled loop while acquisition is
/// idle.
pub trait IntegrationTimer {
    /// Load a new period and pulse width, both in timer ticks.
    fn reconfigure(&mut self, period_ticks: u32, pulse_ticks: u32);

    /// Restart counting from zero with the loaded configuration.
    fn restart(&mut self);
}

impl<T: IntegrationTimer + ?Sized> IntegrationTimer for &mut T {
    fn reconfigure(&mut self, period_ticks: u32, pulse_ticks: u32) {
        (**self).reconfigure(period_ticks, pulse_ticks);
    }

    fn restart(&mut self) {
        (**self).restart();
    }
}

/// Inputs of the tick conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimerConfig {
    /// Timer input clock in MHz (ticks per microsecond).
    pub base_clock_mhz: u32,
    /// Fixed shutter pulse width in ticks.
    pub pulse_ticks: u32,
}

impl TimerConfig {
    /// 84 MHz timer clock, 1 us pulse.
    pub const DEFAULT: Self = Self {
        base_clock_mhz: 84,
        pulse_ticks: 84,
    };

    /// Auto-reload value for an integration time of `us` microseconds.
    ///
    /// `base_clock_mhz * us - 1`, saturating at both ends.
    #[must_use]
    pub const fn period_ticks(&self, us: u32) -> u32 {
        self.base_clock_mhz.saturating_mul(us).saturating_sub(1)
    }

    /// Reprogram `timer` for `us` microseconds and restart it.
    pub fn apply<T: IntegrationTimer + ?Sized>(&self, timer: &mut T, us: u32) {
        timer.reconfigure(self.period_ticks(us), self.pulse_ticks);
        timer.restart();
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        config: Option<(u32, u32)>,
        restarts: u32,
    }

    impl IntegrationTimer for Recorder {
        fn reconfigure(&mut self, period_ticks: u32, pulse_ticks: u32) {
            self.config = Some((period_ticks, pulse_ticks));
        }

        fn restart(&mut self) {
            self.restarts += 1;
        }
    }

    #[test]
    fn test_period_ticks() {
        let config = TimerConfig::default();
        assert_eq!(config.period_ticks(20), 1679);
        assert_eq!(config.period_ticks(100_000), 8_399_999);
    }

    #[test]
    fn test_period_ticks_saturates() {
        let config = TimerConfig::default();
        assert_eq!(config.period_ticks(0), 0);
        assert_eq!(config.period_ticks(u32::MAX), u32::MAX - 1);
    }

    #[test]
    fn test_apply_reconfigures_then_restarts() {
        let mut timer = Recorder::default();
        TimerConfig {
            base_clock_mhz: 16,
            pulse_ticks: 16,
        }
        .apply(&mut timer, 50);
        assert_eq!(timer.config, Some((799, 16)));
        assert_eq!(timer.restarts, 1);
    }
}
