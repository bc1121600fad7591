use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use eyre::{Result, eyre};
use log::{info, warn};
use scraper::{Html, Selector};

use crate::models::job::{JobPosting, JobSource};
use crate::utils::config::Config;

use super::{BROWSER_USER_AGENT, JobQuery, element_text};

const MOCK_TITLES: &[&str] = &["{role}", "Senior {role}", "Lead {role}", "{role} Developer"];
const MOCK_COMPANIES: &[&str] = &[
    "TechCorp Inc.",
    "Innovation Labs",
    "Digital Solutions",
    "Future Systems",
    "Smart Technologies",
    "Global Innovations",
    "NextGen Corp",
    "Elite Solutions",
];

/// Glassdoor search. The listing page is heavily bot-protected, so a failed
/// or empty scrape degrades to synthetic postings instead of failing the run.
pub struct GlassdoorScraper {
    config: Config,
    client: reqwest::Client,
}

impl GlassdoorScraper {
    pub fn new(config: Config) -> Self {
        GlassdoorScraper {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>> {
        if self.config.boards.credentials_for(JobSource::Glassdoor).is_none() {
            warn!("no glassdoor credentials configured, skipping glassdoor search");
            return Ok(Vec::new());
        }

        let url = format!(
            "https://www.glassdoor.com/Job/jobs.htm?sc.keyword={}&locKeyword={}",
            urlencoding::encode(&query.role),
            urlencoding::encode(&query.location)
        );

        info!("searching glassdoor: {}", url);

        let response = (|| async {
            self.client
                .get(&url)
                .header("User-Agent", BROWSER_USER_AGENT)
                .send()
                .await?
                .error_for_status()
        })
        .retry(ExponentialBuilder::default())
        .await;

        let jobs = match response {
            Ok(response) => {
                let html = response.text().await?;
                parse_listing(&html, query.limit)?
            }
            Err(e) => {
                warn!("glassdoor search failed: {}", e);
                Vec::new()
            }
        };

        if jobs.is_empty() {
            warn!("glassdoor scrape yielded nothing, generating synthetic postings");
            return Ok(mock_postings(query));
        }

        info!("glassdoor returned {} postings", jobs.len());
        Ok(jobs)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| eyre!("invalid selector '{css}': {e}"))
}

fn parse_listing(html: &str, limit: usize) -> Result<Vec<JobPosting>> {
    let card_sel = selector("[data-jobid]")?;
    let title_sel = selector(".job-title, [class*='jobTitle']")?;
    let company_sel = selector(".employer-name, [class*='employerName']")?;
    let location_sel = selector(".job-location, .emp-location")?;

    let document = Html::parse_document(html);
    let mut jobs = Vec::new();

    for card in document.select(&card_sel) {
        let Some(id) = card.value().attr("data-jobid") else {
            continue;
        };

        let field = |sel: &Selector| card.select(sel).next().map(element_text);

        jobs.push(JobPosting {
            url: Some(format!("https://www.glassdoor.com/job-listing/{id}")),
            id: format!("glassdoor_{id}"),
            title: field(&title_sel).unwrap_or_else(|| "Unknown Title".to_string()),
            company: field(&company_sel).unwrap_or_else(|| "Unknown Company".to_string()),
            location: field(&location_sel).unwrap_or_default(),
            salary: None,
            description: String::new(),
            source: JobSource::Glassdoor,
            posted_at: Utc::now(),
            synthetic: false,
        });

        if jobs.len() >= limit {
            break;
        }
    }

    Ok(jobs)
}

/// Deterministic placeholder postings shaped like real scrape output. Marked
/// synthetic so downstream stages never auto-apply to them.
pub fn mock_postings(query: &JobQuery) -> Vec<JobPosting> {
    (0..query.limit.min(10))
        .map(|i| {
            let title = MOCK_TITLES[i % MOCK_TITLES.len()].replace("{role}", &query.role);
            let company = MOCK_COMPANIES[i % MOCK_COMPANIES.len()];
            JobPosting {
                id: format!("mock_glassdoor_{}", i + 1),
                title,
                company: company.to_string(),
                location: query.location.clone(),
                url: Some(format!("https://glassdoor.com/job/mock_{}", i + 1)),
                salary: None,
                description: format!(
                    "Placeholder listing for a {} position at {}. Requirements: experience with {} technologies, strong problem-solving skills, team collaboration.",
                    query.role, company, query.role
                ),
                source: JobSource::Glassdoor,
                posted_at: Utc::now(),
                synthetic: true,
            }
        })
        .collect()
}
