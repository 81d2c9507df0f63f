//! Learner-facing feedback after a review.

use crate::types::DifficultyGrade;

/// Message shown after a review graded `grade` that scheduled the card
/// `interval` days out.
pub fn review_feedback(grade: DifficultyGrade, interval: u32) -> String {
    let base = match grade {
        DifficultyGrade::Hard => "Don't give up! Practice makes perfect.",
        DifficultyGrade::Medium => "Good job! You are making steady progress.",
        DifficultyGrade::Easy => "Excellent! You have mastered this content.",
    };

    let next = match (grade, interval) {
        (DifficultyGrade::Hard, 1) => "You will see this card again tomorrow.".to_string(),
        (_, 1) => "Next review in 1 day.".to_string(),
        (_, days) => format!("Next review in {days} days."),
    };

    format!("{base} {next}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hard_review_tomorrow() {
        assert_eq!(
            review_feedback(DifficultyGrade::Hard, 1),
            "Don't give up! Practice makes perfect. You will see this card again tomorrow."
        );
    }

    #[test]
    fn singular_day() {
        assert_eq!(
            review_feedback(DifficultyGrade::Medium, 1),
            "Good job! You are making steady progress. Next review in 1 day."
        );
    }

    #[test]
    fn plural_days() {
        assert_eq!(
            review_feedback(DifficultyGrade::Easy, 8),
            "Excellent! You have mastered this content. Next review in 8 days."
        );
        assert_eq!(
            review_feedback(DifficultyGrade::Hard, 3),
            "Don't give up! Practice makes perfect. Next review in 3 days."
        );
    }
}
