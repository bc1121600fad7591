use eyre::Result;
use log::{info, warn};

use crate::models::job::{JobPosting, JobSource, dedup_postings};
use crate::utils::config::{Config, SearchConfig};

use super::general;
use super::glassdoor::GlassdoorScraper;
use super::indeed::IndeedScraper;
use super::linkedin::LinkedInScraper;
use super::JobQuery;

const SOURCES: [JobSource; 3] = [JobSource::LinkedIn, JobSource::Glassdoor, JobSource::Indeed];

/// Fans the search out to every board concurrently and merges the results.
pub struct SearchCoordinator {
    config: Config,
}

impl SearchCoordinator {
    pub fn new(config: Config) -> Self {
        SearchCoordinator { config }
    }

    pub async fn search(&self) -> Result<Vec<JobPosting>> {
        let query = JobQuery {
            role: self.config.search.role.clone(),
            location: self.config.search.location.clone(),
            limit: self.config.search.max_jobs_per_source,
        };

        info!(
            "searching {} sources for '{}' in '{}'",
            SOURCES.len(),
            query.role,
            query.location
        );

        let timeout = self.config.search.search_timeout();
        let handles: Vec<_> = SOURCES
            .iter()
            .map(|&source| {
                let config = self.config.clone();
                let query = query.clone();
                tokio::spawn(async move {
                    match tokio::time::timeout(timeout, run_source(config, source, &query)).await {
                        Ok(jobs) => jobs,
                        Err(_) => {
                            warn!("{} search timed out after {:?}", source, timeout);
                            Vec::new()
                        }
                    }
                })
            })
            .collect();

        let mut batches = Vec::with_capacity(SOURCES.len());
        let mut join_failed = false;
        for (handle, source) in handles.into_iter().zip(SOURCES) {
            match handle.await {
                Ok(jobs) => batches.push(jobs),
                Err(e) => {
                    warn!("{} search task failed to join: {}", source, e);
                    join_failed = true;
                }
            }
        }

        // A panicked task means the concurrent pass is incomplete, redo the
        // missing work sequentially rather than silently dropping a board.
        if join_failed {
            warn!("rerunning search sequentially");
            batches.clear();
            for source in SOURCES {
                batches.push(run_source(self.config.clone(), source, &query).await);
            }
        }

        let mut jobs = collate(batches, &self.config.search);

        if jobs.is_empty() {
            jobs = general::fallback_postings(&JobQuery {
                limit: self.config.search.max_jobs,
                ..query
            });
        }

        info!("search produced {} unique postings", jobs.len());
        Ok(jobs)
    }
}

async fn run_source(config: Config, source: JobSource, query: &JobQuery) -> Vec<JobPosting> {
    let result = match source {
        JobSource::LinkedIn => LinkedInScraper::new(config).search(query).await,
        JobSource::Glassdoor => GlassdoorScraper::new(config).search(query).await,
        JobSource::Indeed => IndeedScraper::new(config).search(query).await,
        JobSource::General => Ok(Vec::new()),
    };

    match result {
        Ok(jobs) => jobs,
        Err(e) => {
            warn!("{} search failed: {}", source, e);
            Vec::new()
        }
    }
}

/// Merges per-source batches, removes (title, company) duplicates, drops
/// excluded titles, ranks by search relevance and caps the total.
fn collate(batches: Vec<Vec<JobPosting>>, search: &SearchConfig) -> Vec<JobPosting> {
    let merged: Vec<JobPosting> = batches.into_iter().flatten().collect();
    let mut unique = dedup_postings(merged);

    unique.retain(|p| !is_excluded(p, &search.exclude_keywords));
    unique.sort_by_key(|p| std::cmp::Reverse(relevance_score(p, search)));
    unique.truncate(search.max_jobs);
    unique
}

fn is_excluded(posting: &JobPosting, exclude_keywords: &[String]) -> bool {
    let title = posting.title.to_lowercase();
    exclude_keywords
        .iter()
        .any(|k| title.contains(&k.to_lowercase()))
}

/// Base 50, plus 15 per configured keyword found in the title or company,
/// plus small bonuses for a salary figure above the floor and for matching
/// job types or experience levels.
fn relevance_score(posting: &JobPosting, search: &SearchConfig) -> i64 {
    let mut score = 50;

    let header = format!("{} {}", posting.title, posting.company).to_lowercase();
    score += search
        .keywords
        .iter()
        .filter(|k| header.contains(&k.to_lowercase()))
        .count() as i64
        * 15;

    if search.min_salary.is_some()
        && posting
            .salary
            .as_deref()
            .map(str::to_lowercase)
            .is_some_and(|s| s.contains('k') || s.contains("000"))
    {
        score += 10;
    }

    let body = posting.description.to_lowercase();
    score += search
        .experience_levels
        .iter()
        .filter(|l| body.contains(&l.to_lowercase()))
        .count() as i64
        * 5;

    let location = posting.location.to_lowercase();
    score += search
        .job_types
        .iter()
        .filter(|t| {
            let t = t.to_lowercase();
            body.contains(&t) || location.contains(&t)
        })
        .count() as i64
        * 5;

    score
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::utils::config::ConfigInner;

    use super::*;

    fn posting(title: &str, company: &str, source: JobSource) -> JobPosting {
        JobPosting {
            id: format!("{}_{}_{}", source, title, company),
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            url: None,
            salary: None,
            description: String::new(),
            source,
            posted_at: Utc::now(),
            synthetic: false,
        }
    }

    fn search(max_jobs: usize) -> SearchConfig {
        let mut search = ConfigInner::default().search;
        search.max_jobs = max_jobs;
        search.keywords = Vec::new();
        search.exclude_keywords = Vec::new();
        search.job_types = Vec::new();
        search.experience_levels = Vec::new();
        search
    }

    #[test]
    fn collate_removes_cross_source_duplicates() {
        let batches = vec![
            vec![posting("Rust Engineer", "Acme", JobSource::LinkedIn)],
            vec![posting("rust engineer", "ACME", JobSource::Indeed)],
            vec![posting("Go Engineer", "Acme", JobSource::Indeed)],
        ];

        let jobs = collate(batches, &search(10));
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source, JobSource::LinkedIn);
    }

    #[test]
    fn collate_caps_the_merged_total() {
        let batch: Vec<JobPosting> = (0..20)
            .map(|i| posting(&format!("Job {i}"), "Acme", JobSource::Indeed))
            .collect();

        assert_eq!(collate(vec![batch], &search(5)).len(), 5);
    }

    #[test]
    fn collate_of_empty_batches_is_empty() {
        assert!(collate(vec![Vec::new(), Vec::new()], &search(10)).is_empty());
    }

    #[test]
    fn excluded_titles_are_dropped() {
        let mut search = search(10);
        search.exclude_keywords = vec!["senior".to_string(), "manager".to_string()];

        let batches = vec![vec![
            posting("Senior Rust Engineer", "Acme", JobSource::Indeed),
            posting("Rust Engineer", "Acme", JobSource::Indeed),
            posting("Engineering Manager", "Acme", JobSource::Indeed),
        ]];

        let jobs = collate(batches, &search);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Rust Engineer");
    }

    #[test]
    fn keyword_matches_rank_postings_first() {
        let mut search = search(10);
        search.keywords = vec!["rust".to_string(), "backend".to_string()];

        let batches = vec![vec![
            posting("Frontend Developer", "Acme", JobSource::Indeed),
            posting("Backend Rust Engineer", "Acme", JobSource::Indeed),
        ]];

        let jobs = collate(batches, &search);
        assert_eq!(jobs[0].title, "Backend Rust Engineer");
    }

    #[test]
    fn salary_above_floor_earns_a_bonus() {
        let search_with_floor = {
            let mut s = search(10);
            s.min_salary = Some(100_000);
            s
        };

        let mut paid = posting("Engineer", "Acme", JobSource::Indeed);
        paid.salary = Some("$120,000 - $150,000".to_string());
        let unpaid = posting("Engineer", "Initech", JobSource::Indeed);

        assert!(
            relevance_score(&paid, &search_with_floor)
                > relevance_score(&unpaid, &search_with_floor)
        );
    }
}
