//! Study statistics and heuristic study analysis.
//!
//! Everything here is derived from a snapshot of review states; nothing is
//! stored. Two different "learned" predicates exist on purpose: the overall
//! statistics count a card as learned once it is [`is_learned`], while deck
//! progress counts any card with at least one successful review
//! ([`is_learned_in_deck`]). They report different numbers and must stay
//! separate.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::due::is_due;
use crate::types::{CardWithState, DifficultyGrade, ReviewState, DEFAULT_EASE_FACTOR};

/// How many recent reviews the study analysis looks at.
pub const ANALYSIS_REVIEW_WINDOW: usize = 20;

/// How many recent reviews the general statistics list.
pub const STATS_REVIEW_WINDOW: usize = 5;

/// Days covered by the consistency analysis.
const CONSISTENCY_WINDOW_DAYS: i64 = 7;

/// Due count above which a workload suggestion is made.
const WORKLOAD_THRESHOLD: usize = 20;

/// Learned for the overall statistics: two or more successful reviews in a
/// row with a healthy ease factor.
pub fn is_learned(state: &ReviewState) -> bool {
    state.repetitions >= 2 && state.ease_factor >= 2.0
}

/// Learned for deck progress: at least one successful review in a row.
pub fn is_learned_in_deck(state: &ReviewState) -> bool {
    state.repetitions > 0
}

/// `part / total` as a rounded percentage, 0 for an empty total.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Aggregate counters over a snapshot of cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub total_cards: usize,
    pub studied_cards: usize,
    pub learned_cards: usize,
    pub due_cards: usize,
    pub avg_ease_factor: f64,
    pub last_study_date: Option<DateTime<Utc>>,
    pub studied_today: usize,
}

impl StudyStats {
    /// Compute statistics over all cards in `entries`.
    ///
    /// "Today" is the UTC calendar date of `now`.
    pub fn compute(entries: &[CardWithState], now: DateTime<Utc>) -> Self {
        let counters = Counters::collect(entries, now, is_learned);
        let today = now.date_naive();
        let studied_today = entries
            .iter()
            .filter_map(CardWithState::last_reviewed_at)
            .filter(|at| at.date_naive() == today)
            .count();

        Self {
            total_cards: counters.total,
            studied_cards: counters.studied,
            learned_cards: counters.learned,
            due_cards: counters.due,
            avg_ease_factor: counters.avg_ease_factor(),
            last_study_date: counters.last_study_date,
            studied_today,
        }
    }
}

/// Per-deck progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckProgress {
    pub total_cards: usize,
    pub studied_cards: usize,
    pub learned_cards: usize,
    pub due_cards: usize,
    pub avg_ease_factor: f64,
    pub last_study_date: Option<DateTime<Utc>>,
    pub completion_rate: u32,
}

impl DeckProgress {
    /// Compute progress over the cards of a single deck.
    pub fn compute(entries: &[CardWithState], now: DateTime<Utc>) -> Self {
        let counters = Counters::collect(entries, now, is_learned_in_deck);

        Self {
            total_cards: counters.total,
            studied_cards: counters.studied,
            learned_cards: counters.learned,
            due_cards: counters.due,
            avg_ease_factor: counters.avg_ease_factor(),
            last_study_date: counters.last_study_date,
            completion_rate: percentage(counters.learned, counters.total),
        }
    }
}

struct Counters {
    total: usize,
    studied: usize,
    learned: usize,
    due: usize,
    ease_sum: f64,
    last_study_date: Option<DateTime<Utc>>,
}

impl Counters {
    fn collect(
        entries: &[CardWithState],
        now: DateTime<Utc>,
        learned: fn(&ReviewState) -> bool,
    ) -> Self {
        let mut counters = Self {
            total: entries.len(),
            studied: 0,
            learned: 0,
            due: 0,
            ease_sum: 0.0,
            last_study_date: None,
        };

        for entry in entries {
            if is_due(entry.state.as_ref(), now) {
                counters.due += 1;
            }
            let Some(state) = &entry.state else {
                continue;
            };
            counters.studied += 1;
            counters.ease_sum += state.ease_factor;
            if learned(state) {
                counters.learned += 1;
            }
            if let Some(at) = state.last_reviewed_at {
                counters.last_study_date = Some(counters.last_study_date.map_or(at, |d| d.max(at)));
            }
        }

        counters
    }

    fn avg_ease_factor(&self) -> f64 {
        if self.studied == 0 {
            DEFAULT_EASE_FACTOR
        } else {
            self.ease_sum / self.studied as f64
        }
    }
}

/// A past review, as recorded by the latest review state of a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentReview {
    pub card_id: i64,
    pub deck_id: i64,
    pub question: String,
    pub response: String,
    pub last_difficulty: Option<DifficultyGrade>,
    pub last_reviewed_at: DateTime<Utc>,
    pub interval: u32,
    pub repetitions: u32,
}

/// The `limit` most recently reviewed cards, newest first.
pub fn recent_reviews(entries: &[CardWithState], limit: usize) -> Vec<RecentReview> {
    let mut reviews: Vec<RecentReview> = entries
        .iter()
        .filter_map(|entry| {
            let state = entry.state.as_ref()?;
            let reviewed_at = state.last_reviewed_at?;
            Some(RecentReview {
                card_id: entry.card.id,
                deck_id: entry.card.deck_id,
                question: entry.card.question.clone(),
                response: entry.card.response.clone(),
                last_difficulty: state.last_difficulty,
                last_reviewed_at: reviewed_at,
                interval: state.interval,
                repetitions: state.repetitions,
            })
        })
        .collect();

    reviews.sort_by(|a, b| {
        b.last_reviewed_at
            .cmp(&a.last_reviewed_at)
            .then_with(|| a.card_id.cmp(&b.card_id))
    });
    reviews.truncate(limit);
    reviews
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConsistency {
    pub reviews_last_7_days: usize,
    pub average_per_day: f64,
    pub level: ConsistencyLevel,
}

impl StudyConsistency {
    pub fn analyze(reviews: &[RecentReview], now: DateTime<Utc>) -> Self {
        let window = Duration::days(CONSISTENCY_WINDOW_DAYS);
        let count = reviews
            .iter()
            .filter(|r| now - r.last_reviewed_at <= window)
            .count();

        let level = match count {
            n if n >= 5 => ConsistencyLevel::High,
            n if n >= 2 => ConsistencyLevel::Medium,
            _ => ConsistencyLevel::Low,
        };

        Self {
            reviews_last_7_days: count,
            average_per_day: (count as f64 / CONSISTENCY_WINDOW_DAYS as f64 * 10.0).round() / 10.0,
            level,
        }
    }
}

/// Share of each grade among graded reviews, in rounded percent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyDistribution {
    pub hard: u32,
    pub medium: u32,
    pub easy: u32,
    pub total: usize,
}

impl DifficultyDistribution {
    pub fn analyze(reviews: &[RecentReview]) -> Self {
        let (mut hard, mut medium, mut easy) = (0, 0, 0);
        for grade in reviews.iter().filter_map(|r| r.last_difficulty) {
            match grade {
                DifficultyGrade::Hard => hard += 1,
                DifficultyGrade::Medium => medium += 1,
                DifficultyGrade::Easy => easy += 1,
            }
        }
        let total = hard + medium + easy;

        Self {
            hard: percentage(hard, total),
            medium: percentage(medium, total),
            easy: percentage(easy, total),
            total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Progress,
    Consistency,
    Workload,
    Difficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
    pub priority: Priority,
}

/// Heuristic analysis of a learner's recent study habits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyAnalysis {
    pub overall_progress: u32,
    pub study_consistency: StudyConsistency,
    pub difficulty_distribution: DifficultyDistribution,
    pub suggestions: Vec<Suggestion>,
}

impl StudyAnalysis {
    pub fn analyze(stats: &StudyStats, reviews: &[RecentReview], now: DateTime<Utc>) -> Self {
        let overall_progress = percentage(stats.learned_cards, stats.total_cards);
        let study_consistency = StudyConsistency::analyze(reviews, now);
        let difficulty_distribution = DifficultyDistribution::analyze(reviews);
        let suggestions = suggest(
            overall_progress,
            &study_consistency,
            &difficulty_distribution,
            stats,
        );

        Self {
            overall_progress,
            study_consistency,
            difficulty_distribution,
            suggestions,
        }
    }
}

// Every rule is checked on its own; several can fire at once.
fn suggest(
    overall_progress: u32,
    consistency: &StudyConsistency,
    distribution: &DifficultyDistribution,
    stats: &StudyStats,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    if overall_progress < 30 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Progress,
            message: "Try studying a little every day to speed up your progress.".to_string(),
            priority: Priority::High,
        });
    }

    if consistency.level == ConsistencyLevel::Low {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Consistency,
            message: "Keep a regular study routine for better retention.".to_string(),
            priority: Priority::High,
        });
    }

    if stats.due_cards > WORKLOAD_THRESHOLD {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Workload,
            message: format!(
                "You have {} cards waiting. Consider longer study sessions.",
                stats.due_cards
            ),
            priority: Priority::Medium,
        });
    }

    if distribution.hard > 50 {
        suggestions.push(Suggestion {
            kind: SuggestionKind::Difficulty,
            message: "Many cards were marked as hard. Consider reviewing the base material."
                .to_string(),
            priority: Priority::Medium,
        });
    }

    suggestions
}
