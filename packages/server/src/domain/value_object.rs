//! Value objects of the gateway domain.
//!
//! Each value object validates its invariant on construction, so a value that
//! exists is always valid.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use kakehashi_shared::time::{now_millis, to_iso8601};
use uuid::Uuid;

use super::error::ValueObjectError;

/// Maximum length of a chat query, in characters, after trimming.
pub const MAX_QUERY_CHARS: usize = 2000;
/// Maximum length of an escalation reason, in characters, after trimming.
pub const MAX_REASON_CHARS: usize = 1000;
/// Accepted length range of an escalation contact number.
pub const CONTACT_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;

/// Process-unique identifier of a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyClientId);
        }
        Ok(Self(value))
    }

    /// Allocate a fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Correlation id tying a user question to its answer and analytics record.
///
/// Generated ids have the form `msg_<unix-millis>_<12 hex chars>`: the time
/// prefix keeps them ordered by creation, the random suffix keeps them unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyMessageId);
        }
        Ok(Self(value))
    }

    pub fn generate() -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("msg_{}_{}", now_millis(), &random[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn new(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_iso8601(&self) -> String {
        to_iso8601(&self.0)
    }
}

/// A validated chat question: non-empty after trimming, at most
/// [`MAX_QUERY_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatQuery(String);

impl ChatQuery {
    pub fn new(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyQuery);
        }
        let length = trimmed.chars().count();
        if length > MAX_QUERY_CHARS {
            return Err(ValueObjectError::QueryTooLong {
                length,
                max: MAX_QUERY_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Verdict a user gives on an assistant answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackType {
    Positive,
    Negative,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl FromStr for FeedbackType {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(ValueObjectError::InvalidFeedbackType(other.to_string())),
        }
    }
}

/// Urgency of a human escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl FromStr for Priority {
    type Err = ValueObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            other => Err(ValueObjectError::InvalidPriority(other.to_string())),
        }
    }
}

/// Why the user asked for a human: 1 to [`MAX_REASON_CHARS`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationReason(String);

impl EscalationReason {
    pub fn new(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if length == 0 || length > MAX_REASON_CHARS {
            return Err(ValueObjectError::InvalidReasonLength {
                length,
                max: MAX_REASON_CHARS,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Phone-style contact number: digits only, 10 to 15 of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactNumber(String);

impl ContactNumber {
    pub fn new(raw: &str) -> Result<Self, ValueObjectError> {
        let trimmed = raw.trim();
        let all_digits = !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit());
        if !all_digits || !CONTACT_DIGITS.contains(&trimmed.len()) {
            return Err(ValueObjectError::InvalidContact(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
