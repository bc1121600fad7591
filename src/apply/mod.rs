use backon::{ExponentialBuilder, Retryable};
use eyre::Result;
use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::job::JobPosting;
use crate::scraper::BROWSER_USER_AGENT;
use crate::utils::config::Config;

/// Markers that identify an apply control on a job page, most specific
/// first.
const APPLY_MARKERS: &[&str] = &[
    "data-test=\"apply-button\"",
    "data-test='apply-button'",
    "data-test=\"apply-link\"",
    "apply-button",
    "data-test=\"apply\"",
    "easy apply",
    "apply now",
    ">apply<",
    "value=\"apply",
    "value=\"submit",
];

const EMAIL_FIELDS: &[&str] = &["email", "e-mail", "user_email"];
const FIRST_NAME_FIELDS: &[&str] = &["firstName", "first_name", "fname", "given_name"];
const LAST_NAME_FIELDS: &[&str] = &["lastName", "last_name", "lname", "family_name"];
const PHONE_FIELDS: &[&str] = &["phone", "telephone", "mobile"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum ApplyOutcome {
    /// Application form was posted and accepted.
    Submitted,
    /// An apply control exists but leads off-site, needs a human.
    ExternalRedirect,
    /// Nothing was sent.
    Skipped(String),
    /// Dry run, nothing was sent but the posting was a candidate.
    Simulated,
}

impl ApplyOutcome {
    pub fn was_submitted(&self) -> bool {
        matches!(self, ApplyOutcome::Submitted)
    }
}

/// Enforces the per-day submission ceiling.
#[derive(Debug)]
pub struct DailyCounter {
    max: usize,
    used: usize,
}

impl DailyCounter {
    pub fn new(max: usize) -> Self {
        DailyCounter { max, used: 0 }
    }

    pub fn resume_from(max: usize, already_used: usize) -> Self {
        DailyCounter {
            max,
            used: already_used.min(max),
        }
    }

    /// Claims one submission slot. Refuses once the ceiling is reached.
    pub fn try_claim(&mut self) -> bool {
        if self.used < self.max {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.max - self.used
    }
}

pub struct ApplySubmitter {
    config: Config,
    client: reqwest::Client,
    dry_run: bool,
}

impl ApplySubmitter {
    pub fn new(config: Config, dry_run: bool) -> Self {
        ApplySubmitter {
            config,
            client: reqwest::Client::new(),
            dry_run,
        }
    }

    /// Attempts one application over plain HTTP: fetch the posting page,
    /// locate an apply control and an application form, then post the
    /// contact fields the form actually declares.
    pub async fn apply(&self, posting: &JobPosting) -> Result<ApplyOutcome> {
        if posting.synthetic {
            return Ok(ApplyOutcome::Skipped(
                "synthetic posting, nothing to apply to".to_string(),
            ));
        }

        let Some(url) = posting.url.as_deref() else {
            return Ok(ApplyOutcome::Skipped("no job url available".to_string()));
        };

        if self.dry_run {
            info!(
                "dry run: would apply to '{}' at {} ({})",
                posting.title, posting.company, url
            );
            return Ok(ApplyOutcome::Simulated);
        }

        info!("applying to '{}' at {}", posting.title, posting.company);

        let response = (|| async {
            self.client
                .get(url)
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
                warn!("job page fetch failed: {}", e);
                return Ok(ApplyOutcome::Skipped(format!("job page fetch failed: {e}")));
            }
        };

        if find_apply_marker(&html).is_none() {
            return Ok(ApplyOutcome::Skipped("apply control not found".to_string()));
        }

        let Some(form) = parse_form(&html)? else {
            // An apply control without an on-page form usually means an
            // off-site ATS redirect.
            debug!("apply control present but no form, treating as external redirect");
            return Ok(ApplyOutcome::ExternalRedirect);
        };

        let params = self.form_params(&form);
        if params.is_empty() {
            return Ok(ApplyOutcome::Skipped(
                "form declares no fillable contact fields".to_string(),
            ));
        }

        let target = resolve_url(url, form.action.as_deref());
        debug!("posting {} contact fields to {}", params.len(), target);

        let response = self
            .client
            .post(&target)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(urlencoded_body(&params))
            .send()
            .await?;

        if response.status().is_success() {
            info!("application submitted to '{}'", posting.title);
            Ok(ApplyOutcome::Submitted)
        } else {
            warn!("form submission returned {}", response.status());
            Ok(ApplyOutcome::Skipped(format!(
                "form submission returned {}",
                response.status()
            )))
        }
    }

    /// Fills only the fields the form declares, matching each concern's
    /// candidate names in order.
    fn form_params(&self, form: &ApplicationForm) -> Vec<(String, String)> {
        let contact = &self.config.application.contact;
        let (first_name, last_name) = split_name(&contact.full_name);

        let mut params = Vec::new();
        let mut fill = |candidates: &[&str], value: &str| {
            if value.is_empty() {
                return;
            }
            if let Some(field) = candidates.iter().find(|c| form.has_field(c)) {
                params.push((field.to_string(), value.to_string()));
            }
        };

        fill(EMAIL_FIELDS, &contact.email);
        fill(FIRST_NAME_FIELDS, &first_name);
        fill(LAST_NAME_FIELDS, &last_name);
        fill(PHONE_FIELDS, contact.phone.as_deref().unwrap_or(""));

        params
    }
}

#[derive(Debug, Clone)]
struct ApplicationForm {
    action: Option<String>,
    fields: Vec<String>,
}

impl ApplicationForm {
    fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(name))
    }
}

fn find_apply_marker(html: &str) -> Option<&'static str> {
    let lower = html.to_lowercase();
    APPLY_MARKERS.iter().find(|m| lower.contains(*m)).copied()
}

/// Finds the first form that looks like an application form and the input
/// names it declares.
fn parse_form(html: &str) -> Result<Option<ApplicationForm>> {
    let form_re = Regex::new(r#"(?is)<form\b([^>]*)>(.*?)</form>"#)?;
    let action_re = Regex::new(r#"(?i)action\s*=\s*["']([^"']+)["']"#)?;
    let name_re = Regex::new(r#"(?i)<(?:input|textarea|select)\b[^>]*\bname\s*=\s*["']([^"']+)["']"#)?;

    let mut fallback = None;

    for caps in form_re.captures_iter(html) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let form = ApplicationForm {
            action: action_re
                .captures(attrs)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
            fields: name_re
                .captures_iter(body)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .collect(),
        };

        let attrs_lower = attrs.to_lowercase();
        let looks_like_application = form
            .action
            .as_deref()
            .is_some_and(|a| a.to_lowercase().contains("apply"))
            || attrs_lower.contains("application-form")
            || attrs_lower.contains("apply-form");

        if looks_like_application {
            return Ok(Some(form));
        }
        if fallback.is_none() && !form.fields.is_empty() {
            fallback = Some(form);
        }
    }

    Ok(fallback)
}

fn urlencoded_body(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Joins a form action against the page it came from.
fn resolve_url(base: &str, action: Option<&str>) -> String {
    let Some(action) = action.filter(|a| !a.is_empty()) else {
        return base.to_string();
    };

    if action.starts_with("http://") || action.starts_with("https://") {
        return action.to_string();
    }

    if let Some(rest) = base.strip_prefix("https://").or_else(|| base.strip_prefix("http://")) {
        let scheme_len = base.len() - rest.len();
        let host_end = rest.find('/').map(|i| scheme_len + i).unwrap_or(base.len());

        if action.starts_with('/') {
            return format!("{}{}", &base[..host_end], action);
        }

        // A relative action against a bare host still needs a separator.
        return match base[host_end..].rfind('/') {
            Some(i) => format!("{}{}", &base[..host_end + i + 1], action),
            None => format!("{base}/{action}"),
        };
    }

    action.to_string()
}

fn split_name(full_name: &str) -> (String, String) {
    match full_name.trim().rsplit_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (full_name.trim().to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORM_PAGE: &str = r#"
    <html><body>
    <button data-test="apply-button">Apply Now</button>
    <form action="/jobs/apply" method="post">
        <input type="email" name="email" />
        <input type="text" name="first_name" />
        <input type="text" name="last_name" />
        <input type="tel" name="phone" />
        <input type="hidden" name="csrf" value="x" />
    </form>
    </body></html>
    "#;

    #[test]
    fn daily_counter_never_exceeds_max() {
        let mut counter = DailyCounter::new(3);

        let mut claimed = 0;
        for _ in 0..10 {
            if counter.try_claim() {
                claimed += 1;
            }
        }

        assert_eq!(claimed, 3);
        assert_eq!(counter.used(), 3);
        assert_eq!(counter.remaining(), 0);
        assert!(!counter.try_claim());
    }

    #[test]
    fn daily_counter_resumes_from_persisted_count() {
        let mut counter = DailyCounter::resume_from(5, 4);
        assert!(counter.try_claim());
        assert!(!counter.try_claim());

        // A stored count above the ceiling must not underflow remaining().
        let counter = DailyCounter::resume_from(3, 10);
        assert_eq!(counter.remaining(), 0);
    }

    #[test]
    fn finds_apply_markers_case_insensitively() {
        assert!(find_apply_marker(FORM_PAGE).is_some());
        assert!(find_apply_marker("<button>EASY APPLY</button>").is_some());
        assert!(find_apply_marker("<p>nothing to see</p>").is_none());
    }

    #[test]
    fn parses_application_form_and_fields() {
        let form = parse_form(FORM_PAGE).unwrap().unwrap();
        assert_eq!(form.action.as_deref(), Some("/jobs/apply"));
        assert!(form.has_field("email"));
        assert!(form.has_field("first_name"));
        assert!(!form.has_field("resume"));
    }

    #[test]
    fn pages_without_forms_parse_to_none() {
        assert!(parse_form("<html><p>redirecting...</p></html>").unwrap().is_none());
    }

    #[test]
    fn resolves_relative_form_actions() {
        assert_eq!(
            resolve_url("https://jobs.example.com/view/123", Some("/apply")),
            "https://jobs.example.com/apply"
        );
        assert_eq!(
            resolve_url("https://jobs.example.com/view/123", Some("submit")),
            "https://jobs.example.com/view/submit"
        );
        assert_eq!(
            resolve_url("https://a.com/x", Some("https://ats.example.com/apply")),
            "https://ats.example.com/apply"
        );
        assert_eq!(resolve_url("https://a.com/x", None), "https://a.com/x");
    }

    #[test]
    fn resolves_relative_action_against_bare_host() {
        assert_eq!(
            resolve_url("https://a.com", Some("submit")),
            "https://a.com/submit"
        );
        assert_eq!(resolve_url("https://a.com", Some("/apply")), "https://a.com/apply");
    }

    #[test]
    fn form_body_percent_encodes_values() {
        let params = vec![
            ("email".to_string(), "jane+doe@example.com".to_string()),
            ("first_name".to_string(), "Jane Ann".to_string()),
        ];

        assert_eq!(
            urlencoded_body(&params),
            "email=jane%2Bdoe%40example.com&first_name=Jane%20Ann"
        );
    }

    #[tokio::test]
    async fn synthetic_postings_are_never_submitted() {
        use chrono::Utc;
        use std::sync::Arc;

        use crate::models::job::JobSource;
        use crate::utils::config::ConfigInner;

        let posting = JobPosting {
            id: "mock_glassdoor_1".to_string(),
            title: "Engineer".to_string(),
            company: "TechCorp Inc.".to_string(),
            location: "Remote".to_string(),
            url: Some("https://example.com/job".to_string()),
            salary: None,
            description: String::new(),
            source: JobSource::Glassdoor,
            posted_at: Utc::now(),
            synthetic: true,
        };

        // Guard fires before any network I/O, even outside dry-run mode.
        let submitter = ApplySubmitter::new(Arc::new(ConfigInner::default()), false);
        let outcome = submitter.apply(&posting).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Skipped(_)));
        assert!(!outcome.was_submitted());
    }

    #[test]
    fn split_name_separates_last_word() {
        assert_eq!(
            split_name("Jane van Doe"),
            ("Jane van".to_string(), "Doe".to_string())
        );
        assert_eq!(split_name("Prince"), ("Prince".to_string(), String::new()));
    }
}
