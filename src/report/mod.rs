use std::collections::HashMap;

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::models::application::{ApplicationRecord, ApplicationStatus};

const ACTIVE_STATUSES: [ApplicationStatus; 5] = [
    ApplicationStatus::Applied,
    ApplicationStatus::UnderReview,
    ApplicationStatus::InterviewScheduled,
    ApplicationStatus::InterviewCompleted,
    ApplicationStatus::OfferReceived,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessMetrics {
    pub total_applications: usize,
    pub active_applications: usize,
    /// Percentage of applications that reached an offer.
    pub success_rate: f64,
    pub interview_rate: f64,
    pub offer_rate: f64,
    pub average_response_time_days: f64,
    pub status_breakdown: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingReport {
    pub generated_at: DateTime<Utc>,
    pub metrics: SuccessMetrics,
    pub follow_ups_due: Vec<FollowUp>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUp {
    pub application_id: i64,
    pub title: String,
    pub company: String,
    pub status: ApplicationStatus,
    pub days_since_update: i64,
}

/// All rates are percentages. An empty history produces all-zero metrics
/// instead of dividing by zero.
pub fn success_metrics(records: &[ApplicationRecord]) -> SuccessMetrics {
    let total = records.len();

    let mut status_breakdown: HashMap<String, usize> = HashMap::new();
    for record in records {
        *status_breakdown
            .entry(record.status.as_str().to_string())
            .or_default() += 1;
    }

    let active = records
        .iter()
        .filter(|r| ACTIVE_STATUSES.contains(&r.status))
        .count();

    if total == 0 {
        return SuccessMetrics {
            total_applications: 0,
            active_applications: 0,
            success_rate: 0.0,
            interview_rate: 0.0,
            offer_rate: 0.0,
            average_response_time_days: 0.0,
            status_breakdown,
        };
    }

    let successful = records
        .iter()
        .filter(|r| {
            matches!(
                r.status,
                ApplicationStatus::OfferReceived | ApplicationStatus::OfferAccepted
            )
        })
        .count();
    let interviews = records.iter().filter(|r| r.status.is_interview()).count();
    let offers = records.iter().filter(|r| r.status.is_offer()).count();

    let response_times: Vec<i64> = records
        .iter()
        .filter(|r| r.status.is_response())
        .map(|r| r.last_updated.signed_duration_since(r.applied_at).num_days())
        .collect();
    let average_response_time_days = if response_times.is_empty() {
        0.0
    } else {
        let sum: i64 = response_times.iter().sum();
        (sum as f64 / response_times.len() as f64 * 10.0).round() / 10.0
    };

    let rate = |n: usize| (n as f64 / total as f64) * 100.0;

    SuccessMetrics {
        total_applications: total,
        active_applications: active,
        success_rate: rate(successful),
        interview_rate: rate(interviews),
        offer_rate: rate(offers),
        average_response_time_days,
        status_breakdown,
    }
}

pub fn follow_ups_due(records: &[ApplicationRecord], now: DateTime<Utc>) -> Vec<FollowUp> {
    records
        .iter()
        .filter(|r| r.needs_follow_up(now))
        .map(|r| FollowUp {
            application_id: r.id,
            title: r.title.clone(),
            company: r.company.clone(),
            status: r.status,
            days_since_update: now.signed_duration_since(r.last_updated).num_days(),
        })
        .collect()
}

pub fn recommendations(metrics: &SuccessMetrics, follow_up_count: usize) -> Vec<String> {
    let mut recommendations = Vec::new();

    if follow_up_count > 0 {
        recommendations.push(format!(
            "Follow up on {follow_up_count} applications that require attention"
        ));
    }

    if metrics.total_applications > 0 {
        if metrics.success_rate < 10.0 {
            recommendations
                .push("Consider improving application strategy - success rate is low".to_string());
        } else if metrics.success_rate < 25.0 {
            recommendations.push(
                "Application success rate could be improved with targeted applications".to_string(),
            );
        }
    }

    if metrics.average_response_time_days > 14.0 {
        recommendations
            .push("Consider following up earlier - average response time is high".to_string());
    }

    if metrics.total_applications < 10 {
        recommendations
            .push("Increase application volume for better success chances".to_string());
    } else if metrics.total_applications > 100 {
        recommendations.push(
            "Focus on quality over quantity - consider more targeted applications".to_string(),
        );
    }

    if recommendations.is_empty() {
        recommendations
            .push("Application tracking is healthy - continue current strategy".to_string());
    }

    recommendations
}

pub fn build_report(records: &[ApplicationRecord], now: DateTime<Utc>) -> TrackingReport {
    let metrics = success_metrics(records);
    let follow_ups = follow_ups_due(records, now);
    let recommendations = recommendations(&metrics, follow_ups.len());

    TrackingReport {
        generated_at: now,
        metrics,
        follow_ups_due: follow_ups,
        recommendations,
    }
}

/// Human-readable rendition for the terminal.
pub fn render(report: &TrackingReport) -> String {
    let metrics = &report.metrics;
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "Application Tracking Report".bold().underline()));
    out.push_str(&format!(
        "  {} {}\n",
        "total applications:".dimmed(),
        metrics.total_applications
    ));
    out.push_str(&format!(
        "  {} {}\n",
        "active applications:".dimmed(),
        metrics.active_applications
    ));
    out.push_str(&format!(
        "  {} {:.1}%\n",
        "success rate:".dimmed(),
        metrics.success_rate
    ));
    out.push_str(&format!(
        "  {} {:.1}%\n",
        "interview rate:".dimmed(),
        metrics.interview_rate
    ));
    out.push_str(&format!(
        "  {} {:.1} days\n",
        "avg response time:".dimmed(),
        metrics.average_response_time_days
    ));

    if !report.follow_ups_due.is_empty() {
        out.push_str(&format!("\n{}\n", "Follow-ups due".bold()));
        for follow_up in &report.follow_ups_due {
            out.push_str(&format!(
                "  {} at {} ({}, {} days since update)\n",
                follow_up.title.yellow(),
                follow_up.company,
                follow_up.status,
                follow_up.days_since_update
            ));
        }
    }

    out.push_str(&format!("\n{}\n", "Recommendations".bold()));
    for recommendation in &report.recommendations {
        out.push_str(&format!("  - {recommendation}\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::models::job::JobSource;

    use super::*;

    fn record(status: ApplicationStatus, days_ago: i64) -> ApplicationRecord {
        let applied = Utc::now() - Duration::days(days_ago);
        ApplicationRecord {
            id: 1,
            job_id: "job".to_string(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            source: JobSource::Indeed,
            url: None,
            status,
            applied_at: applied,
            last_updated: Utc::now() - Duration::days(days_ago / 2),
            resume_used: None,
            auto_applied: false,
            notes: None,
        }
    }

    #[test]
    fn empty_history_yields_zero_metrics() {
        let metrics = success_metrics(&[]);
        assert_eq!(metrics.total_applications, 0);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.interview_rate, 0.0);
        assert_eq!(metrics.average_response_time_days, 0.0);
    }

    #[test]
    fn rates_reflect_status_mix() {
        let records = vec![
            record(ApplicationStatus::Applied, 10),
            record(ApplicationStatus::Rejected, 10),
            record(ApplicationStatus::InterviewScheduled, 10),
            record(ApplicationStatus::OfferReceived, 10),
        ];

        let metrics = success_metrics(&records);
        assert_eq!(metrics.total_applications, 4);
        assert!((metrics.success_rate - 25.0).abs() < f64::EPSILON);
        assert!((metrics.interview_rate - 25.0).abs() < f64::EPSILON);
        assert!((metrics.offer_rate - 25.0).abs() < f64::EPSILON);
        assert_eq!(metrics.active_applications, 3);
    }

    #[test]
    fn low_success_rate_triggers_strategy_recommendation() {
        let records: Vec<ApplicationRecord> = (0..20)
            .map(|_| record(ApplicationStatus::Rejected, 5))
            .collect();

        let metrics = success_metrics(&records);
        let recs = recommendations(&metrics, 0);
        assert!(recs.iter().any(|r| r.contains("success rate is low")));
    }

    #[test]
    fn healthy_history_gets_the_default_recommendation() {
        let records: Vec<ApplicationRecord> = (0..20)
            .map(|i| {
                record(
                    if i < 6 {
                        ApplicationStatus::OfferReceived
                    } else {
                        ApplicationStatus::UnderReview
                    },
                    4,
                )
            })
            .collect();

        let metrics = success_metrics(&records);
        let recs = recommendations(&metrics, 0);
        assert_eq!(recs, vec!["Application tracking is healthy - continue current strategy"]);
    }

    #[test]
    fn follow_ups_respect_status_intervals() {
        let stale = record(ApplicationStatus::Applied, 20);
        let fresh = record(ApplicationStatus::Applied, 2);

        let due = follow_ups_due(&[stale, fresh], Utc::now());
        assert_eq!(due.len(), 1);
        assert!(due[0].days_since_update >= 7);
    }
}
