//! Core rating types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marketplace user identifier
pub type UserId = i64;

/// A single trust rating: `rater` rated `ratee` with `rating` at `timestamp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingEvent {
    /// User giving the rating
    pub rater: UserId,
    /// User receiving the rating
    pub ratee: UserId,
    /// Signed trust score, never zero
    pub rating: i32,
    /// When the rating was left (second precision)
    pub timestamp: DateTime<Utc>,
}

impl RatingEvent {
    /// Create a new rating event
    pub fn new(rater: UserId, ratee: UserId, rating: i32, timestamp: DateTime<Utc>) -> Self {
        Self {
            rater,
            ratee,
            rating,
            timestamp,
        }
    }

    /// Whether the rating expresses distrust
    pub fn is_negative(&self) -> bool {
        self.rating < 0
    }

    /// Whether the rating expresses trust
    pub fn is_positive(&self) -> bool {
        self.rating > 0
    }

    /// Ordinal bucket of the rating magnitude
    pub fn weight_class(&self) -> WeightClass {
        WeightClass::from_rating(self.rating)
    }

    /// Display color tag
    pub fn color(&self) -> EdgeColor {
        if self.is_negative() {
            EdgeColor::Red
        } else {
            EdgeColor::Green
        }
    }

    /// Whether `user` takes part in this rating under `role`
    pub fn involves(&self, user: UserId, role: Role) -> bool {
        match role {
            Role::Target => self.ratee == user,
            Role::Source => self.rater == user,
            Role::Either => self.ratee == user || self.rater == user,
        }
    }
}

/// Rating sign filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    All,
}

impl Polarity {
    /// Check whether a rating passes this filter
    pub fn admits(&self, rating: i32) -> bool {
        match self {
            Polarity::Positive => rating > 0,
            Polarity::Negative => rating < 0,
            Polarity::All => true,
        }
    }
}

impl Default for Polarity {
    fn default() -> Self {
        Self::All
    }
}

/// Side of a rating a user is looked up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User received the rating (ratee)
    Target,
    /// User gave the rating (rater)
    Source,
    /// Either side
    Either,
}

impl Role {
    /// Column suffix used in the output table
    pub fn suffix(&self) -> &'static str {
        match self {
            Role::Target => "target",
            Role::Source => "source",
            Role::Either => "either",
        }
    }
}

/// Ordinal bucket of |rating|
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WeightClass {
    /// |rating| in 1..=2
    Weak,
    /// |rating| in 3..=5
    Moderate,
    /// |rating| in 6..=8
    Strong,
    /// |rating| of 9 and above
    Extreme,
}

impl WeightClass {
    /// Bucket a signed rating by magnitude
    pub fn from_rating(rating: i32) -> Self {
        match rating.unsigned_abs() {
            0..=2 => WeightClass::Weak,
            3..=5 => WeightClass::Moderate,
            6..=8 => WeightClass::Strong,
            _ => WeightClass::Extreme,
        }
    }

    /// Ordinal value starting at 1
    pub fn ordinal(&self) -> u8 {
        match self {
            WeightClass::Weak => 1,
            WeightClass::Moderate => 2,
            WeightClass::Strong => 3,
            WeightClass::Extreme => 4,
        }
    }
}

/// Color tag attached to rating edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeColor {
    Green,
    Red,
}

/// Per-window activity breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCount {
    pub negative: usize,
    pub positive: usize,
    pub total: usize,
}

impl WindowCount {
    /// Count one rating into the breakdown
    pub fn add(&mut self, event: &RatingEvent) {
        if event.is_negative() {
            self.negative += 1;
        } else {
            self.positive += 1;
        }
        self.total += 1;
    }
}
