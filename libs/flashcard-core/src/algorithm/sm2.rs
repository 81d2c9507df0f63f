//! SM-2 review scheduler.
//!
//! A three-grade variant of SuperMemo 2. The ease factor is updated first and
//! the new interval multiplies the *previous* interval by the *updated* ease
//! factor; reordering these steps changes long-run interval growth.

use crate::types::{DifficultyGrade, ReviewState, MAXIMUM_INTERVAL_DAYS, MINIMUM_EASE_FACTOR};

/// Interval after the first successful review.
const FIRST_INTERVAL: u32 = 1;

/// Interval after the second consecutive successful review.
const SECOND_INTERVAL: u32 = 3;

/// Compute the state that follows `state` after a review graded `grade`.
///
/// Pure: the caller stamps `last_reviewed_at` when persisting, so the
/// returned state carries the previous timestamp unchanged.
pub fn next_state(state: &ReviewState, grade: DifficultyGrade) -> ReviewState {
    let q = f64::from(grade.to_value());
    let miss = 3.0 - q;

    let ease_factor =
        (state.ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MINIMUM_EASE_FACTOR);

    let (interval, repetitions) = match grade {
        // A hard review restarts the spacing curve; the ease penalty still sticks.
        DifficultyGrade::Hard => (FIRST_INTERVAL, 0),
        DifficultyGrade::Medium | DifficultyGrade::Easy => {
            let repetitions = state.repetitions + 1;
            let interval = match repetitions {
                1 => FIRST_INTERVAL,
                2 => SECOND_INTERVAL,
                _ => grown_interval(state.interval, ease_factor),
            };
            (interval, repetitions)
        }
    };

    ReviewState {
        interval,
        repetitions,
        ease_factor: round_ease(ease_factor),
        last_difficulty: Some(grade),
        last_reviewed_at: state.last_reviewed_at,
    }
}

// Growth is clamped to `1..=MAXIMUM_INTERVAL_DAYS`.
fn grown_interval(interval: u32, ease_factor: f64) -> u32 {
    let days = (f64::from(interval) * ease_factor).round();
    days.clamp(1.0, f64::from(MAXIMUM_INTERVAL_DAYS)) as u32
}

/// Round to two decimal places, the precision ease factors are stored at.
fn round_ease(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn summary(state: &ReviewState) -> (u32, u32, f64) {
        (state.interval, state.repetitions, state.ease_factor)
    }

    #[test]
    fn three_easy_reviews_grow_interval() {
        let s1 = next_state(&ReviewState::default(), DifficultyGrade::Easy);
        assert_eq!(summary(&s1), (1, 1, 2.6));

        let s2 = next_state(&s1, DifficultyGrade::Easy);
        assert_eq!(summary(&s2), (3, 2, 2.7));

        // round(3 * 2.8) = 8
        let s3 = next_state(&s2, DifficultyGrade::Easy);
        assert_eq!(summary(&s3), (8, 3, 2.8));
    }

    #[test]
    fn hard_review_penalises_ease() {
        let state = next_state(&ReviewState::default(), DifficultyGrade::Hard);
        assert_eq!(summary(&state), (1, 0, 2.36));
        assert_eq!(state.last_difficulty, Some(DifficultyGrade::Hard));
    }

    #[test]
    fn medium_review_keeps_ease() {
        let state = next_state(&ReviewState::default(), DifficultyGrade::Medium);
        assert_eq!(summary(&state), (1, 1, 2.5));
    }

    #[test]
    fn hard_review_always_resets_spacing() {
        let state = ReviewState {
            interval: 40,
            repetitions: 7,
            ease_factor: 2.9,
            ..Default::default()
        };
        let next = next_state(&state, DifficultyGrade::Hard);
        assert_eq!(next.repetitions, 0);
        assert_eq!(next.interval, 1);
        assert_eq!(next.ease_factor, 2.76);
    }

    #[test]
    fn uses_previous_interval_and_updated_ease() {
        let state = ReviewState {
            interval: 10,
            repetitions: 4,
            ease_factor: 2.0,
            ..Default::default()
        };
        // ease 2.0 -> 2.1, interval round(10 * 2.1) = 21
        let next = next_state(&state, DifficultyGrade::Easy);
        assert_eq!(summary(&next), (21, 5, 2.1));
    }

    #[test]
    fn ease_factor_floor_holds_for_every_grade_sequence() {
        let sequences = 3usize.pow(6);
        for mut code in 0..sequences {
            let mut state = ReviewState::default();
            for _ in 0..6 {
                let grade = DifficultyGrade::ALL[code % 3];
                code /= 3;
                state = next_state(&state, grade);
                assert!(state.ease_factor >= MINIMUM_EASE_FACTOR);
                assert!(state.interval >= 1);
            }
        }
    }

    #[test]
    fn ease_factor_clamps_at_floor() {
        let state = ReviewState {
            ease_factor: 1.35,
            ..Default::default()
        };
        let next = next_state(&state, DifficultyGrade::Hard);
        assert_eq!(next.ease_factor, 1.3);
    }

    #[test]
    fn does_not_touch_review_timestamp() {
        let state = ReviewState::default();
        let next = next_state(&state, DifficultyGrade::Easy);
        assert_eq!(next.last_reviewed_at, None);
    }

    #[test]
    fn long_easy_streak_stays_within_maximum_interval() {
        let reviewed = chrono::Utc::now();
        let mut state = ReviewState::default();
        for _ in 0..20 {
            state = next_state(&state, DifficultyGrade::Easy);
            state.last_reviewed_at = Some(reviewed);
            assert!(state.interval <= MAXIMUM_INTERVAL_DAYS);
            assert!(state.next_review_date().is_some());
            assert!(!state.is_due_at(reviewed));
        }
        assert_eq!(state.interval, MAXIMUM_INTERVAL_DAYS);
        assert_eq!(state.repetitions, 20);
    }
}
