use chrono::Utc;
use log::warn;

use crate::models::job::{JobPosting, JobSource};

use super::JobQuery;

const TEMPLATE: &str = "position focused on building scalable systems and solving complex technical challenges. Experience with modern software development practices, strong problem-solving skills, and collaborative mindset.";

/// Last-resort postings when every board came back empty. Lets the rest of
/// the pipeline run end to end on a machine with no credentials at all.
pub fn fallback_postings(query: &JobQuery) -> Vec<JobPosting> {
    warn!("all job sources came back empty, using generic fallback postings");

    (0..query.limit.min(3))
        .map(|i| JobPosting {
            id: format!("mock_general_{}", i + 1),
            title: query.role.clone(),
            company: format!("Example Employer {}", i + 1),
            location: query.location.clone(),
            url: None,
            salary: None,
            description: format!("{} {}", query.role, TEMPLATE),
            source: JobSource::General,
            posted_at: Utc::now(),
            synthetic: true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_postings_are_synthetic_general_jobs() {
        let query = JobQuery {
            role: "Software Engineer".to_string(),
            location: "Remote".to_string(),
            limit: 10,
        };

        let jobs = fallback_postings(&query);
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.synthetic));
        assert!(jobs.iter().all(|j| j.source == JobSource::General));
        assert!(jobs[0].description.contains("scalable systems"));
    }
}
