use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::JobSource;

/// Lifecycle of a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Applied,
    UnderReview,
    InterviewScheduled,
    InterviewCompleted,
    OfferReceived,
    OfferAccepted,
    OfferDeclined,
    Rejected,
    Withdrawn,
    Expired,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 10] = [
        ApplicationStatus::Applied,
        ApplicationStatus::UnderReview,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::InterviewCompleted,
        ApplicationStatus::OfferReceived,
        ApplicationStatus::OfferAccepted,
        ApplicationStatus::OfferDeclined,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
        ApplicationStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::InterviewScheduled => "interview_scheduled",
            ApplicationStatus::InterviewCompleted => "interview_completed",
            ApplicationStatus::OfferReceived => "offer_received",
            ApplicationStatus::OfferAccepted => "offer_accepted",
            ApplicationStatus::OfferDeclined => "offer_declined",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|st| st.as_str() == s)
    }

    /// Days to wait before the next follow-up for an application in this
    /// state. Terminal states get a long interval so they fall out of the
    /// reminder window naturally.
    pub fn follow_up_interval_days(&self) -> i64 {
        match self {
            ApplicationStatus::Applied => 7,
            ApplicationStatus::UnderReview => 3,
            ApplicationStatus::InterviewScheduled => 1,
            ApplicationStatus::InterviewCompleted => 5,
            ApplicationStatus::OfferReceived => 1,
            ApplicationStatus::OfferAccepted => 7,
            ApplicationStatus::OfferDeclined => 7,
            ApplicationStatus::Rejected => 30,
            ApplicationStatus::Withdrawn => 30,
            ApplicationStatus::Expired => 30,
        }
    }

    /// States that count as a positive response from the company.
    pub fn is_response(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::UnderReview
                | ApplicationStatus::InterviewScheduled
                | ApplicationStatus::InterviewCompleted
                | ApplicationStatus::OfferReceived
                | ApplicationStatus::OfferAccepted
                | ApplicationStatus::OfferDeclined
        )
    }

    pub fn is_interview(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::InterviewScheduled | ApplicationStatus::InterviewCompleted
        )
    }

    pub fn is_offer(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::OfferReceived
                | ApplicationStatus::OfferAccepted
                | ApplicationStatus::OfferDeclined
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked application, as persisted in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: i64,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub source: JobSource,
    pub url: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub resume_used: Option<String>,
    pub auto_applied: bool,
    pub notes: Option<String>,
}

impl ApplicationRecord {
    pub fn needs_follow_up(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.last_updated);
        elapsed.num_days() >= self.status.follow_up_interval_days()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(status: ApplicationStatus, days_ago: i64) -> ApplicationRecord {
        let then = Utc::now() - Duration::days(days_ago);
        ApplicationRecord {
            id: 1,
            job_id: "job-1".to_string(),
            title: "Rust Engineer".to_string(),
            company: "Acme".to_string(),
            source: JobSource::LinkedIn,
            url: None,
            status,
            applied_at: then,
            last_updated: then,
            resume_used: None,
            auto_applied: false,
            notes: None,
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in ApplicationStatus::ALL {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApplicationStatus::parse("ghosted"), None);
    }

    #[test]
    fn follow_up_respects_per_status_intervals() {
        assert!(record(ApplicationStatus::Applied, 8).needs_follow_up(Utc::now()));
        assert!(!record(ApplicationStatus::Applied, 3).needs_follow_up(Utc::now()));
        assert!(record(ApplicationStatus::UnderReview, 3).needs_follow_up(Utc::now()));
        assert!(!record(ApplicationStatus::Rejected, 10).needs_follow_up(Utc::now()));
    }

    #[test]
    fn response_states_exclude_terminal_silence() {
        assert!(ApplicationStatus::UnderReview.is_response());
        assert!(ApplicationStatus::OfferDeclined.is_response());
        assert!(!ApplicationStatus::Applied.is_response());
        assert!(!ApplicationStatus::Rejected.is_response());
        assert!(!ApplicationStatus::Expired.is_response());
    }
}
