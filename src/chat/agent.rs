use backon::{ExponentialBuilder, Retryable};
use eyre::{Result, eyre};
use log::{debug, info};
use serde::Deserialize;
use serde_json::json;

use crate::analysis::JobAnalysis;
use crate::models::job::JobPosting;
use crate::resume::profile::ResumeProfile;
use crate::resume::tailor::{TailorSource, TailoredResume};

const SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");
const TAILOR_TEMPLATE: &str = include_str!("tailor_prompt.txt");

#[derive(Debug, Clone, Deserialize)]
struct TailorOutput {
    summary: String,
    technical_skills: Vec<String>,
    #[serde(default)]
    keywords_added: Vec<String>,
    #[serde(default)]
    modifications: Vec<String>,
}

/// A raw scrape reduced to the fields the pipeline cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct StructuredPosting {
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    pub description: String,
    pub requirements: String,
}

pub struct TailorAgent {
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl TailorAgent {
    pub fn new(api_key: String, model: String, endpoint: String, max_retries: u32) -> Self {
        Self {
            api_key,
            model,
            endpoint,
            max_retries,
        }
    }

    /// Rewrites the resume summary and skills for one posting.
    pub async fn tailor(
        &self,
        profile: &ResumeProfile,
        analysis: &JobAnalysis,
    ) -> Result<TailoredResume> {
        info!(
            "tailoring resume for '{}' at {} using LLM (max retries: {})",
            analysis.title, analysis.company, self.max_retries
        );

        let prompt = TAILOR_TEMPLATE
            .replace("{job_title}", &analysis.title)
            .replace("{job_company}", &analysis.company)
            .replace("{resume_content}", truncated(&profile.raw, 4000))
            .replace("{candidate_skills}", &profile.skills.join(", "))
            .replace("{job_description}", &analysis.responsibilities.join("\n"))
            .replace("{required_skills}", &analysis.required_skills.join(", "))
            .replace("{preferred_skills}", &analysis.preferred_skills.join(", "));

        let schema = json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Professional summary tailored to this posting"
                },
                "technical_skills": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Skills section, most relevant first"
                },
                "keywords_added": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Posting keywords newly worked into the resume"
                },
                "modifications": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Human-readable list of changes made"
                }
            },
            "required": ["summary", "technical_skills"]
        });

        let content = self.call_gemini_api(&prompt, schema, 0.3, 2048).await?;
        let output: TailorOutput = parse_json_window(&content)?;

        info!("successfully tailored resume for {}", analysis.job_id);

        Ok(TailoredResume {
            job_id: analysis.job_id.clone(),
            summary: output.summary,
            technical_skills: output.technical_skills,
            keywords_added: output.keywords_added,
            modifications: output.modifications,
            source: TailorSource::Llm,
        })
    }

    /// Cleans a raw scraped page into a structured posting. Scraped
    /// descriptions are often HTML soup the section regexes cannot read.
    pub async fn structure_posting(&self, raw: &str) -> Result<StructuredPosting> {
        info!(
            "structuring raw posting using LLM (max retries: {})",
            self.max_retries
        );
        debug!("raw posting length: {}", raw.len());

        let prompt = format!(
            "Extract and clean the job description from the following content. \
            If it's HTML, convert to plain text. If it's already plain text, clean it up.\n\n\
            IMPORTANT: Respond ONLY with valid JSON in this format:\n\
            {{\n\
              \"title\": \"Job Title\",\n\
              \"company\": \"Company Name\",\n\
              \"description\": \"Clean job description with key responsibilities\",\n\
              \"requirements\": \"Key technical requirements and qualifications\"\n\
            }}\n\n\
            Content to process:\n{}",
            truncated(raw, 8000)
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Job title/position name"
                },
                "company": {
                    "type": "string",
                    "description": "Company name (can be null if not found)"
                },
                "description": {
                    "type": "string",
                    "description": "Clean job description with key responsibilities"
                },
                "requirements": {
                    "type": "string",
                    "description": "Key technical requirements and qualifications"
                }
            },
            "required": ["title", "description", "requirements"]
        });

        let content = self.call_gemini_api(&prompt, schema, 0.3, 2048).await?;
        parse_json_window(&content)
    }

    /// Asks the model for skills the regex pass could not name. Used to
    /// supplement, never replace, the regex extraction.
    pub async fn extract_skills(&self, posting: &JobPosting) -> Result<Vec<String>> {
        info!("extracting skills from '{}' using LLM", posting.title);
        debug!("description length: {}", posting.description.len());

        let prompt = format!(
            "List every technical skill, tool and technology this job posting asks for. \
            Respond ONLY with valid JSON in this format:\n\
            {{\"skills\": [\"skill1\", \"skill2\"]}}\n\n\
            Posting ({} at {}):\n{}",
            posting.title,
            posting.company,
            truncated(&posting.description, 4000)
        );

        let schema = json!({
            "type": "object",
            "properties": {
                "skills": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["skills"]
        });

        let content = self.call_gemini_api(&prompt, schema, 0.1, 1024).await?;

        #[derive(Deserialize)]
        struct SkillsOutput {
            skills: Vec<String>,
        }

        let output: SkillsOutput = parse_json_window(&content)?;
        Ok(output
            .skills
            .into_iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect())
    }

    async fn call_gemini_api(
        &self,
        prompt: &str,
        schema: serde_json::Value,
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String> {
        debug!("prompt length: {} characters", prompt.len());

        let client = reqwest::Client::new();
        let api_key = self.api_key.clone();
        let endpoint = self.endpoint.clone();
        let model = self.model.clone();

        let response = (|| async {
            let request_body = json!({
                "contents": [{"parts": [{"text": prompt}]}],
                "systemInstruction": {
                    "parts": [{"text": SYSTEM_PROMPT}]
                },
                "generationConfig": {
                    "temperature": temperature,
                    "maxOutputTokens": max_tokens,
                    "responseMimeType": "application/json",
                    "responseJsonSchema": schema
                }
            });

            let url = format!(
                "{}/{}:generateContent?key={}",
                endpoint.trim_end_matches('/'),
                model,
                api_key
            );

            let response = client.post(&url).json(&request_body).send().await?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await?;
                return Err(eyre!("Gemini API error ({}): {}", status, error_body));
            }

            Ok(response)
        })
        .retry(ExponentialBuilder::default())
        .await?;

        let body: serde_json::Value = response.json().await?;

        let content = body
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("content"))
            .and_then(|c| c.get("parts"))
            .and_then(|p| p.get(0))
            .and_then(|p| p.get("text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| eyre!("invalid Gemini API response structure"))?;

        Ok(content.to_string())
    }
}

/// The model sometimes wraps its JSON in prose or code fences. Parse only
/// the outermost brace-delimited window.
fn parse_json_window<T: serde::de::DeserializeOwned>(response: &str) -> Result<T> {
    let trimmed = response.trim();
    let json_start = trimmed
        .find('{')
        .ok_or_else(|| eyre!("no JSON object found in response"))?;
    let json_end = trimmed
        .rfind('}')
        .ok_or_else(|| eyre!("malformed JSON in response"))?;

    let json_str = &trimmed[json_start..=json_end];
    debug!(
        "extracted JSON (length: {} chars): {}",
        json_str.len(),
        &json_str[..std::cmp::min(200, json_str.len())]
    );

    serde_json::from_str(json_str).map_err(|e| {
        debug!("JSON parsing failed: {}", e);
        eyre!("failed to parse LLM response as JSON: {}", e)
    })
}

fn truncated(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
