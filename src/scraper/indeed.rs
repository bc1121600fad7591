use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use eyre::{Result, eyre};
use log::{debug, info, warn};
use scraper::{Html, Selector};

use crate::models::job::{JobPosting, JobSource};
use crate::utils::config::Config;

use super::{BROWSER_USER_AGENT, JobQuery, element_text};

/// Public Indeed search, no login needed.
pub struct IndeedScraper {
    #[allow(dead_code)]
    config: Config,
    client: reqwest::Client,
}

impl IndeedScraper {
    pub fn new(config: Config) -> Self {
        IndeedScraper {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>> {
        let url = format!(
            "https://www.indeed.com/jobs?q={}&l={}&limit={}",
            urlencoding::encode(&query.role),
            urlencoding::encode(&query.location),
            query.limit.min(50)
        );

        info!("searching indeed: {}", url);

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

        let html = match response {
            Ok(response) => response.text().await?,
            Err(e) => {
                warn!("indeed search failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let jobs = parse_listing(&html, query)?;
        info!("indeed returned {} postings", jobs.len());
        Ok(jobs)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| eyre!("invalid selector '{css}': {e}"))
}

/// Pulls job cards out of an Indeed results page. Card ids come from the
/// data-jk attribute, the rest from markup inside the card.
fn parse_listing(html: &str, query: &JobQuery) -> Result<Vec<JobPosting>> {
    let card_sel = selector("[data-jk]")?;
    let title_sel = selector(".jobTitle, [class*='jcs-JobTitle']")?;
    let company_sel = selector(".companyName, [data-testid='company-name']")?;
    let location_sel = selector("[data-testid='job-location'], [data-testid='text-location']")?;
    let salary_sel = selector(".salary-snippet, [class*='salary-snippet']")?;
    let snippet_sel = selector(".job-snippet")?;

    let document = Html::parse_document(html);
    let mut jobs = Vec::new();
    let mut seen_ids = Vec::new();

    for card in document.select(&card_sel) {
        let Some(id) = card.value().attr("data-jk") else {
            continue;
        };
        if seen_ids.contains(&id.to_string()) {
            continue;
        }
        seen_ids.push(id.to_string());

        let field = |sel: &Selector| card.select(sel).next().map(element_text);

        let title = field(&title_sel).unwrap_or_else(|| "Unknown Title".to_string());
        let company = field(&company_sel).unwrap_or_else(|| "Unknown Company".to_string());

        debug!("parsed indeed card {}: {} at {}", id, title, company);

        jobs.push(JobPosting {
            url: Some(format!("https://www.indeed.com/viewjob?jk={id}")),
            id: format!("indeed_{id}"),
            title,
            company,
            location: field(&location_sel).unwrap_or_else(|| query.location.clone()),
            salary: field(&salary_sel),
            description: field(&snippet_sel).unwrap_or_default(),
            source: JobSource::Indeed,
            posted_at: Utc::now(),
            synthetic: false,
        });

        if jobs.len() >= query.limit {
            break;
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
    <ul>
    <li><div class="job_seen_beacon" data-jk="abc123">
        <h2 class="jobTitle"><span>Backend Engineer</span></h2>
        <span class="companyName">Acme Corp</span>
        <div data-testid="job-location">Remote</div>
        <span class="salary-snippet">$120,000 - $150,000</span>
        <div class="job-snippet">Build <b>APIs</b> in Rust.</div>
    </div></li>
    <li><div class="job_seen_beacon" data-jk="def456">
        <h2 class="jobTitle"><span>Platform Engineer</span></h2>
        <span class="companyName">Initech</span>
        <div data-testid="job-location">Austin, TX</div>
    </div></li>
    </ul>
    "#;

    fn query(limit: usize) -> JobQuery {
        JobQuery {
            role: "engineer".to_string(),
            location: "remote".to_string(),
            limit,
        }
    }

    #[test]
    fn parses_cards_from_listing_html() {
        let jobs = parse_listing(FIXTURE, &query(10)).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "indeed_abc123");
        assert_eq!(jobs[0].title, "Backend Engineer");
        assert_eq!(jobs[0].company, "Acme Corp");
        assert_eq!(jobs[0].salary.as_deref(), Some("$120,000 - $150,000"));
        assert!(jobs[0].description.contains("APIs"));
        assert_eq!(jobs[1].company, "Initech");
    }

    #[test]
    fn respects_the_card_limit() {
        let jobs = parse_listing(FIXTURE, &query(1)).unwrap();
        assert_eq!(jobs.len(), 1);
    }

    #[test]
    fn empty_page_parses_to_no_jobs() {
        assert!(parse_listing("<html></html>", &query(10)).unwrap().is_empty());
    }
}
