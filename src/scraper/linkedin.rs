use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use eyre::{Result, eyre};
use log::{info, warn};
use scraper::{Html, Selector};

use crate::models::job::{JobPosting, JobSource};
use crate::utils::config::Config;

use super::{BROWSER_USER_AGENT, JobQuery, element_text};

/// LinkedIn job search through the guest listing endpoint. Credential-gated
/// so unauthenticated runs do not hammer a board that will block them anyway.
pub struct LinkedInScraper {
    config: Config,
    client: reqwest::Client,
}

impl LinkedInScraper {
    pub fn new(config: Config) -> Self {
        LinkedInScraper {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub async fn search(&self, query: &JobQuery) -> Result<Vec<JobPosting>> {
        if self.config.boards.credentials_for(JobSource::LinkedIn).is_none() {
            warn!("no linkedin credentials configured, skipping linkedin search");
            return Ok(Vec::new());
        }

        let url = format!(
            "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search?keywords={}&location={}&start=0",
            urlencoding::encode(&query.role),
            urlencoding::encode(&query.location)
        );

        info!("searching linkedin: {}", url);

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
                warn!("linkedin search failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let jobs = parse_cards(&html, query.limit)?;
        info!("linkedin returned {} postings", jobs.len());
        Ok(jobs)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| eyre!("invalid selector '{css}': {e}"))
}

/// Guest listing cards carry a data-entity-urn with the numeric posting id.
fn parse_cards(html: &str, limit: usize) -> Result<Vec<JobPosting>> {
    let card_sel = selector("[data-entity-urn]")?;
    let title_sel = selector(".base-search-card__title")?;
    let company_sel = selector(".base-search-card__subtitle")?;
    let location_sel = selector(".job-search-card__location")?;

    let document = Html::parse_document(html);
    let mut jobs = Vec::new();

    for card in document.select(&card_sel) {
        let Some(id) = card
            .value()
            .attr("data-entity-urn")
            .and_then(|urn| urn.strip_prefix("urn:li:jobPosting:"))
        else {
            continue;
        };

        let field = |sel: &Selector| card.select(sel).next().map(element_text);

        jobs.push(JobPosting {
            url: Some(format!("https://www.linkedin.com/jobs/view/{id}")),
            id: format!("linkedin_{id}"),
            title: field(&title_sel).unwrap_or_else(|| "Unknown Title".to_string()),
            company: field(&company_sel).unwrap_or_else(|| "Unknown Company".to_string()),
            location: field(&location_sel).unwrap_or_default(),
            salary: None,
            description: String::new(),
            source: JobSource::LinkedIn,
            posted_at: Utc::now(),
            synthetic: false,
        });

        if jobs.len() >= limit {
            break;
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
    <li><div data-entity-urn="urn:li:jobPosting:3912345678">
        <h3 class="base-search-card__title">Rust Engineer</h3>
        <h4 class="base-search-card__subtitle"><a>Ferrous Systems</a></h4>
        <span class="job-search-card__location">Berlin, Germany</span>
    </div></li>
    <li><div data-entity-urn="urn:li:jobPosting:3987654321">
        <h3 class="base-search-card__title">Systems Programmer</h3>
        <h4 class="base-search-card__subtitle"><a>Oxide</a></h4>
        <span class="job-search-card__location">Remote</span>
    </div></li>
    "#;

    #[test]
    fn parses_guest_listing_cards() {
        let jobs = parse_cards(FIXTURE, 10).unwrap();

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, "linkedin_3912345678");
        assert_eq!(jobs[0].title, "Rust Engineer");
        assert_eq!(jobs[0].company, "Ferrous Systems");
        assert_eq!(jobs[0].location, "Berlin, Germany");
        assert_eq!(
            jobs[0].url.as_deref(),
            Some("https://www.linkedin.com/jobs/view/3912345678")
        );
    }

    #[test]
    fn limit_caps_parsed_cards() {
        assert_eq!(parse_cards(FIXTURE, 1).unwrap().len(), 1);
    }

    #[test]
    fn special_characters_survive_the_query_string() {
        let encoded = urlencoding::encode("C++ & Rust Developer");
        assert_eq!(encoded, "C%2B%2B%20%26%20Rust%20Developer");
    }
}
