//! Pre-start checkpoint policy.
//!
//! The pre-start sweep ticks every `poll_interval_minutes`; a given event is
//! only acted on when its minutes-to-start crosses one of the two
//! checkpoints (30 and 5 minutes out). Since the sweep can't land on the
//! exact minute, a checkpoint fires the first time minutes-to-start falls
//! into the half-open window `(target - interval, target]`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    ThirtyMinute,
    FiveMinute,
}

impl Checkpoint {
    pub fn target_minutes(&self) -> i64 {
        match self {
            Checkpoint::ThirtyMinute => 30,
            Checkpoint::FiveMinute => 5,
        }
    }
}

/// Which checkpoint, if any, `minutes_to_start` falls under for a sweep
/// cadence of `poll_interval_minutes`. Evaluates the five-minute checkpoint
/// first since it's the more consequential one (final-odds capture) and the
/// windows never overlap for a sane `poll_interval_minutes <= 25`.
pub fn checkpoint_for(minutes_to_start: i64, poll_interval_minutes: i64) -> Option<Checkpoint> {
    for checkpoint in [Checkpoint::FiveMinute, Checkpoint::ThirtyMinute] {
        let target = checkpoint.target_minutes();
        if minutes_to_start <= target && minutes_to_start > target - poll_interval_minutes {
            return Some(checkpoint);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_five_minute_mark_fires() {
        assert_eq!(checkpoint_for(5, 5), Some(Checkpoint::FiveMinute));
    }

    #[test]
    fn exact_thirty_minute_mark_fires() {
        assert_eq!(checkpoint_for(30, 5), Some(Checkpoint::ThirtyMinute));
    }

    #[test]
    fn window_catches_overshoot_ticks() {
        // sweep landed at 28 minutes-to-start instead of exactly 30
        assert_eq!(checkpoint_for(28, 5), Some(Checkpoint::ThirtyMinute));
    }

    #[test]
    fn outside_any_window_is_none() {
        assert_eq!(checkpoint_for(17, 5), None);
    }

    #[test]
    fn past_start_is_none() {
        assert_eq!(checkpoint_for(-2, 5), None);
    }
}
