use crate::types::Mode;

/// Minimum dwell time between relay transitions.
///
/// Only the cooling path is guarded. The baseline is seeded at construction
/// so that the very first evaluation after boot reports an active lock.
#[derive(Debug, Clone, Copy)]
pub struct ProtectionTimer {
    last_transition_ms: u64,
}

impl ProtectionTimer {
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_transition_ms: now_ms,
        }
    }

    pub fn record_transition(&mut self, now_ms: u64) {
        self.last_transition_ms = now_ms;
    }

    pub fn last_transition_ms(&self) -> u64 {
        self.last_transition_ms
    }

    pub fn is_active(&self, now_ms: u64, mode: Mode, protection_time_s: u32) -> bool {
        self.remaining_ms(now_ms, mode, protection_time_s) > 0
    }

    pub fn remaining_ms(&self, now_ms: u64, mode: Mode, protection_time_s: u32) -> u64 {
        if mode == Mode::Heat {
            return 0;
        }
        let window_ms = u64::from(protection_time_s) * 1_000;
        let elapsed = now_ms.saturating_sub(self.last_transition_ms);
        window_ms.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_right_after_boot() {
        let timer = ProtectionTimer::new(1_000);
        assert!(timer.is_active(1_000, Mode::Cool, 30));
    }

    #[test]
    fn heat_mode_is_never_protected() {
        let timer = ProtectionTimer::new(1_000);
        assert!(!timer.is_active(1_000, Mode::Heat, 999));
        assert_eq!(timer.remaining_ms(1_000, Mode::Heat, 999), 0);
    }

    #[test]
    fn releases_exactly_at_threshold() {
        let mut timer = ProtectionTimer::new(0);
        timer.record_transition(10_000);
        let threshold = 10_000 + 30 * 1_000;

        assert!(timer.is_active(threshold - 1, Mode::Cool, 30));
        assert!(!timer.is_active(threshold, Mode::Cool, 30));
        assert!(!timer.is_active(threshold + 1, Mode::Cool, 30));
    }

    #[test]
    fn zero_window_disables_the_lock() {
        let timer = ProtectionTimer::new(500);
        assert!(!timer.is_active(500, Mode::Cool, 0));
    }

    #[test]
    fn clock_running_backwards_keeps_lock_engaged() {
        let timer = ProtectionTimer::new(50_000);
        assert!(timer.is_active(10_000, Mode::Cool, 30));
        assert_eq!(timer.remaining_ms(10_000, Mode::Cool, 30), 30_000);
    }

    #[test]
    fn remaining_counts_down() {
        let mut timer = ProtectionTimer::new(0);
        timer.record_transition(2_000);
        assert_eq!(timer.remaining_ms(12_000, Mode::Cool, 30), 20_000);
        assert_eq!(timer.remaining_ms(40_000, Mode::Cool, 30), 0);
    }
}
