//! Feedback accumulation.
//!
//! Local bookkeeping over the result stream: a bounded log of
//! interactions, an append-only feedback log, and per-department and
//! per-category accuracy counters. Consumed by the stats surface and
//! the parameter tuner; never part of the pipeline's control flow.

use chrono::Utc;
use std::collections::{HashMap, VecDeque};

use crate::models::{FeedbackRecord, IssueCategory};

/// Bounds matching the source system's retention.
const MAX_INTERACTIONS: usize = 1000;
const MAX_FEEDBACK: usize = 500;
/// Recent-feedback window for the positive rate.
const FEEDBACK_WINDOW: usize = 100;

/// One recorded query/response interaction.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub query: String,
    pub issue_category: IssueCategory,
    pub department: String,
    pub response_seconds: f64,
    pub cache_hit: bool,
}

/// Correct/total counters for one department or category.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccuracyCounter {
    pub correct: u64,
    pub total: u64,
}

impl AccuracyCounter {
    pub fn rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.correct as f64 / self.total as f64)
        }
    }
}

/// The accumulator. All records are bounded; counters are cumulative.
#[derive(Debug, Default)]
pub struct FeedbackLog {
    interactions: VecDeque<Interaction>,
    feedback: VecDeque<FeedbackRecord>,
    department_accuracy: HashMap<String, AccuracyCounter>,
    category_accuracy: HashMap<&'static str, AccuracyCounter>,
    total_interactions: u64,
    total_feedback: u64,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one pipeline interaction.
    pub fn record_interaction(&mut self, interaction: Interaction) {
        if self.interactions.len() >= MAX_INTERACTIONS {
            self.interactions.pop_front();
        }
        self.interactions.push_back(interaction);
        self.total_interactions += 1;
    }

    /// Record one user feedback event and update the accuracy counters.
    pub fn record_feedback(
        &mut self,
        query: &str,
        is_helpful: bool,
        issue_category: IssueCategory,
        department: &str,
    ) {
        let record = FeedbackRecord {
            query: truncate_chars(query, 200),
            is_helpful,
            issue_category: issue_category.key().to_string(),
            department: department.to_string(),
            timestamp: Utc::now(),
        };

        if self.feedback.len() >= MAX_FEEDBACK {
            self.feedback.pop_front();
        }
        self.feedback.push_back(record);
        self.total_feedback += 1;

        let dept = self
            .department_accuracy
            .entry(department.to_string())
            .or_default();
        dept.total += 1;
        if is_helpful {
            dept.correct += 1;
        }

        let cat = self
            .category_accuracy
            .entry(issue_category.key())
            .or_default();
        cat.total += 1;
        if is_helpful {
            cat.correct += 1;
        }
    }

    /// Positive-feedback rate over the most recent window, or `None`
    /// before any feedback arrives.
    pub fn positive_rate(&self) -> Option<f64> {
        if self.feedback.is_empty() {
            return None;
        }
        let recent: Vec<_> = self
            .feedback
            .iter()
            .rev()
            .take(FEEDBACK_WINDOW)
            .collect();
        let positive = recent.iter().filter(|f| f.is_helpful).count();
        Some(positive as f64 / recent.len() as f64)
    }

    /// Mean response time over the retained interactions.
    pub fn mean_response_seconds(&self) -> Option<f64> {
        if self.interactions.is_empty() {
            return None;
        }
        let sum: f64 = self.interactions.iter().map(|i| i.response_seconds).sum();
        Some(sum / self.interactions.len() as f64)
    }

    /// Overall classification accuracy across all categories with
    /// feedback, or `None` before any feedback.
    pub fn overall_accuracy(&self) -> Option<f64> {
        let (correct, total) = self
            .category_accuracy
            .values()
            .fold((0u64, 0u64), |(c, t), counter| {
                (c + counter.correct, t + counter.total)
            });
        if total == 0 {
            None
        } else {
            Some(correct as f64 / total as f64)
        }
    }

    pub fn department_accuracy(&self) -> &HashMap<String, AccuracyCounter> {
        &self.department_accuracy
    }

    pub fn category_accuracy(&self) -> &HashMap<&'static str, AccuracyCounter> {
        &self.category_accuracy
    }

    pub fn total_interactions(&self) -> u64 {
        self.total_interactions
    }

    pub fn total_feedback(&self) -> u64 {
        self.total_feedback
    }

    pub fn recent_feedback(&self) -> impl Iterator<Item = &FeedbackRecord> {
        self.feedback.iter()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
