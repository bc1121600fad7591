use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use eyre::{Result, eyre};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::fit::FitReport;
use crate::analysis::{Analyzer, AnalysisSummary, JobAnalysis, summarize};
use crate::apply::{ApplyOutcome, ApplySubmitter, DailyCounter};
use crate::chat::agent::TailorAgent;
use crate::models::application::ApplicationStatus;
use crate::models::job::JobPosting;
use crate::report::{TrackingReport, build_report};
use crate::resume::profile::ResumeProfile;
use crate::resume::tailor::{TailoredResume, heuristic_tailor};
use crate::resume::extract;
use crate::scraper::coordinator::SearchCoordinator;
use crate::store::Store;
use crate::utils::config::Config;

const MAX_STAGE_RETRIES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Search,
    Analyze,
    Tailor,
    Apply,
    Track,
}

impl Stage {
    pub const SEQUENCE: [Stage; 6] = [
        Stage::Extract,
        Stage::Search,
        Stage::Analyze,
        Stage::Tailor,
        Stage::Apply,
        Stage::Track,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Search => "search",
            Stage::Analyze => "analyze",
            Stage::Tailor => "tailor",
            Stage::Apply => "apply",
            Stage::Track => "track",
        }
    }

    /// A failed critical stage aborts the run. Tailoring and applying are
    /// best-effort, the pipeline still has value without them.
    pub fn is_critical(&self) -> bool {
        !matches!(self, Stage::Tailor | Stage::Apply)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    CompletedWithWarnings,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationAttempt {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub outcome: ApplyOutcome,
    pub at: DateTime<Utc>,
}

/// Accumulator passed through every stage. Serialized to the session file
/// at the end of the run, successful or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: WorkflowStatus,
    pub resume: Option<ResumeProfile>,
    pub postings: Vec<JobPosting>,
    pub analyses: Vec<JobAnalysis>,
    pub summary: Option<AnalysisSummary>,
    pub tailored: Vec<TailoredResume>,
    pub attempts: Vec<ApplicationAttempt>,
    pub report: Option<TrackingReport>,
    pub errors: Vec<StageError>,
}

impl WorkflowState {
    pub fn new() -> Self {
        WorkflowState {
            session_id: format!("session_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            started_at: Utc::now(),
            completed_at: None,
            status: WorkflowStatus::Running,
            resume: None,
            postings: Vec::new(),
            analyses: Vec::new(),
            summary: None,
            tailored: Vec::new(),
            attempts: Vec::new(),
            report: None,
            errors: Vec::new(),
        }
    }

    pub fn record_error(&mut self, stage: Stage, message: String) {
        self.errors.push(StageError { stage, message });
    }

    pub fn finalize(&mut self, critical_failure: bool) {
        self.completed_at = Some(Utc::now());
        self.status = if critical_failure {
            WorkflowStatus::Error
        } else if self.errors.is_empty() {
            WorkflowStatus::Completed
        } else {
            WorkflowStatus::CompletedWithWarnings
        };
    }

    pub fn submitted_count(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome.was_submitted())
            .count()
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Workflow {
    config: Config,
    store: Store,
    analyzer: Analyzer,
    resume_path: Option<PathBuf>,
    auto_apply: bool,
    dry_run: bool,
}

impl Workflow {
    pub fn new(
        config: Config,
        store: Store,
        resume_path: Option<PathBuf>,
        auto_apply: bool,
        dry_run: bool,
    ) -> Result<Self> {
        Ok(Workflow {
            analyzer: Analyzer::new()?,
            config,
            store,
            resume_path,
            auto_apply,
            dry_run,
        })
    }

    pub async fn run(&self) -> Result<WorkflowState> {
        let mut state = WorkflowState::new();
        info!("starting workflow session {}", state.session_id);

        let mut critical_failure = false;

        for stage in Stage::SEQUENCE {
            info!("entering stage: {}", stage);

            match self.run_stage_with_retries(stage, &mut state).await {
                Ok(()) => debug!("stage {} completed", stage),
                Err(e) => {
                    state.record_error(stage, e.to_string());
                    if stage.is_critical() {
                        error!("critical stage {} failed: {}", stage, e);
                        critical_failure = true;
                        break;
                    }
                    warn!("stage {} failed, continuing: {}", stage, e);
                }
            }
        }

        state.finalize(critical_failure);
        self.persist_session(&state).await;

        info!(
            "workflow session {} finished with status {:?}",
            state.session_id, state.status
        );
        Ok(state)
    }

    async fn run_stage_with_retries(&self, stage: Stage, state: &mut WorkflowState) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.run_stage(stage, state).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < MAX_STAGE_RETRIES => {
                    attempt += 1;
                    let backoff = Duration::from_secs(1 << attempt);
                    warn!(
                        "stage {} failed (attempt {}), retrying in {:?}: {}",
                        stage, attempt, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn run_stage(&self, stage: Stage, state: &mut WorkflowState) -> Result<()> {
        match stage {
            Stage::Extract => self.extract(state).await,
            Stage::Search => self.search(state).await,
            Stage::Analyze => self.analyze(state).await,
            Stage::Tailor => self.tailor(state).await,
            Stage::Apply => self.apply(state).await,
            Stage::Track => self.track(state).await,
        }
    }

    async fn extract(&self, state: &mut WorkflowState) -> Result<()> {
        let Some(path) = &self.resume_path else {
            warn!("no resume provided, tailoring and fit scoring will be skipped");
            return Ok(());
        };

        let content = extract::extract_text(path).await?;
        state.resume = Some(ResumeProfile::parse(&content)?);
        Ok(())
    }

    async fn search(&self, state: &mut WorkflowState) -> Result<()> {
        state.postings = SearchCoordinator::new(self.config.clone()).search().await?;

        if state.postings.is_empty() {
            return Err(eyre!("no postings found from any source"));
        }
        Ok(())
    }

    async fn analyze(&self, state: &mut WorkflowState) -> Result<()> {
        // Raw HTML descriptions defeat the section regexes. Structure them
        // first when an LLM is available.
        if let Some(agent) = self.tailor_agent() {
            for posting in state
                .postings
                .iter_mut()
                .filter(|p| p.description.contains('<'))
            {
                match agent.structure_posting(&posting.description).await {
                    Ok(structured) => {
                        posting.description =
                            format!("{}\n{}", structured.description, structured.requirements);
                    }
                    Err(e) => warn!("llm structuring failed for {}: {}", posting.id, e),
                }
            }
        }

        let mut analyses = self.analyzer.analyze_all(&state.postings);

        // The LLM pass names skills the header regexes cannot see. Purely
        // additive, a failed call leaves the regex result standing.
        if let Some(agent) = self.tailor_agent() {
            for (posting, analysis) in state.postings.iter().zip(analyses.iter_mut()) {
                match agent.extract_skills(posting).await {
                    Ok(skills) => {
                        for skill in skills {
                            if !analysis.required_skills.contains(&skill) {
                                analysis.required_skills.push(skill);
                            }
                        }
                    }
                    Err(e) => warn!("llm skill extraction failed for {}: {}", posting.id, e),
                }
            }
        }

        let all_skills: Vec<String> = analyses
            .iter()
            .flat_map(|a| a.required_skills.iter().chain(a.preferred_skills.iter()))
            .cloned()
            .collect();
        self.store.bump_skill_frequency(&all_skills).await?;

        state.summary = Some(summarize(&analyses));
        state.analyses = analyses;
        Ok(())
    }

    async fn tailor(&self, state: &mut WorkflowState) -> Result<()> {
        let Some(profile) = state.resume.clone() else {
            info!("skipping tailoring, no resume profile available");
            return Ok(());
        };

        let agent = self.tailor_agent();
        let analyses = state.analyses.clone();

        for analysis in &analyses {
            let tailored = match &agent {
                Some(agent) => match agent.tailor(&profile, analysis).await {
                    Ok(tailored) => tailored,
                    Err(e) => {
                        warn!(
                            "llm tailoring failed for {}, using keyword fallback: {}",
                            analysis.job_id, e
                        );
                        heuristic_tailor(&profile, analysis)
                    }
                },
                None => heuristic_tailor(&profile, analysis),
            };

            self.write_tailored_resume(&state.session_id, &profile, &tailored)
                .await;
            state.tailored.push(tailored);
        }

        info!("tailored resume for {} postings", state.tailored.len());
        Ok(())
    }

    /// Writes the rewritten resume text next to the session file so the
    /// user can review what would be sent per posting.
    async fn write_tailored_resume(
        &self,
        session_id: &str,
        profile: &ResumeProfile,
        tailored: &TailoredResume,
    ) {
        let (text, mods) = tailored.apply_to(profile);
        debug!(
            "rewrite for {}: {}/{} modifications applied (rate {:.2})",
            tailored.job_id,
            mods.applied,
            mods.planned,
            mods.success_rate()
        );

        let dir = self.config.session.dir.join(session_id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!("failed to create tailored resume dir: {}", e);
            return;
        }

        let path = dir.join(format!("resume_{}.txt", tailored.job_id));
        if let Err(e) = tokio::fs::write(&path, text).await {
            warn!("failed to write tailored resume {}: {}", path.display(), e);
        }
    }

    async fn apply(&self, state: &mut WorkflowState) -> Result<()> {
        if !self.auto_apply {
            info!("auto-apply disabled, skipping application submission");
            return Ok(());
        }

        let already_used = self.store.applications_today().await?;
        let mut counter = DailyCounter::resume_from(
            self.config.application.max_daily_applications,
            already_used,
        );
        info!(
            "daily application budget: {} remaining of {}",
            counter.remaining(),
            self.config.application.max_daily_applications
        );

        let submitter = ApplySubmitter::new(self.config.clone(), self.dry_run);
        let threshold = self.config.application.skill_match_threshold;

        let postings = state.postings.clone();
        for posting in &postings {
            // The stage can be retried; a posting already attempted this
            // session must not be submitted twice.
            if state.attempts.iter().any(|a| a.job_id == posting.id) {
                debug!("skipping {} (already attempted this session)", posting.id);
                continue;
            }

            if posting.synthetic {
                debug!("skipping synthetic posting {}", posting.id);
                continue;
            }

            if let (Some(profile), Some(analysis)) = (
                &state.resume,
                state.analyses.iter().find(|a| a.job_id == posting.id),
            ) {
                let fit = FitReport::compute(&profile.skills, &analysis.required_skills);
                if !fit.meets(threshold) {
                    debug!(
                        "skipping {} (fit {:.2} below threshold {:.2})",
                        posting.id, fit.score, threshold
                    );
                    continue;
                }
            }

            if !counter.try_claim() {
                warn!("daily application cap reached, stopping submissions");
                break;
            }

            let outcome = match submitter.apply(posting).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("application to {} failed: {}", posting.id, e);
                    ApplyOutcome::Skipped(e.to_string())
                }
            };

            if outcome.was_submitted() {
                let resume_used = self
                    .resume_path
                    .as_ref()
                    .map(|p| p.display().to_string());
                self.store
                    .record_application(
                        posting,
                        ApplicationStatus::Applied,
                        resume_used.as_deref(),
                        true,
                        None,
                    )
                    .await?;
            }

            state.attempts.push(ApplicationAttempt {
                job_id: posting.id.clone(),
                title: posting.title.clone(),
                company: posting.company.clone(),
                outcome,
                at: Utc::now(),
            });

            if !self.dry_run {
                tokio::time::sleep(self.config.application.application_delay()).await;
            }
        }

        info!(
            "apply stage finished: {} submitted, {} attempts",
            state.submitted_count(),
            state.attempts.len()
        );
        Ok(())
    }

    async fn track(&self, state: &mut WorkflowState) -> Result<()> {
        let records = self.store.list_applications().await?;
        state.report = Some(build_report(&records, Utc::now()));
        Ok(())
    }

    fn tailor_agent(&self) -> Option<TailorAgent> {
        self.config.llm.api_key.as_ref().map(|key| {
            TailorAgent::new(
                key.clone(),
                self.config.llm.model.clone(),
                self.config.llm.endpoint.clone(),
                self.config.llm.max_retries,
            )
        })
    }

    /// Best-effort: a session that cannot be written must not turn a
    /// finished run into a failure.
    async fn persist_session(&self, state: &WorkflowState) {
        let json = match serde_json::to_string_pretty(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize session state: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.save_session(&state.session_id, &json).await {
            warn!("failed to save session to store: {}", e);
        }

        let dir = &self.config.session.dir;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!("failed to create session dir {}: {}", dir.display(), e);
            return;
        }

        let path = dir.join(format!("{}.json", state.session_id));
        match tokio::fs::write(&path, &json).await {
            Ok(()) => info!("session written to {}", path.display()),
            Err(e) => warn!("failed to write session file: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_sequence_runs_extract_to_track() {
        assert_eq!(Stage::SEQUENCE.first(), Some(&Stage::Extract));
        assert_eq!(Stage::SEQUENCE.last(), Some(&Stage::Track));
        assert_eq!(Stage::SEQUENCE.len(), 6);
    }

    #[test]
    fn only_tailor_and_apply_are_non_critical() {
        for stage in Stage::SEQUENCE {
            let expected = !matches!(stage, Stage::Tailor | Stage::Apply);
            assert_eq!(stage.is_critical(), expected, "{stage}");
        }
    }

    #[test]
    fn finalize_reflects_error_severity() {
        let mut state = WorkflowState::new();
        state.finalize(false);
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert!(state.completed_at.is_some());

        let mut state = WorkflowState::new();
        state.record_error(Stage::Tailor, "llm unavailable".to_string());
        state.finalize(false);
        assert_eq!(state.status, WorkflowStatus::CompletedWithWarnings);

        let mut state = WorkflowState::new();
        state.record_error(Stage::Search, "all sources failed".to_string());
        state.finalize(true);
        assert_eq!(state.status, WorkflowStatus::Error);
    }

    fn workflow_posting(id: &str, synthetic: bool) -> JobPosting {
        use crate::models::job::JobSource;

        JobPosting {
            id: id.to_string(),
            title: format!("Role {id}"),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            url: Some("https://example.com/job".to_string()),
            salary: None,
            description: String::new(),
            source: JobSource::Indeed,
            posted_at: Utc::now(),
            synthetic,
        }
    }

    async fn dry_run_workflow() -> Workflow {
        use std::sync::Arc;

        use crate::utils::config::ConfigInner;

        Workflow::new(
            Arc::new(ConfigInner::default()),
            Store::open_in_memory().await.unwrap(),
            None,
            true,
            true,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn rerunning_apply_skips_attempted_postings() {
        let workflow = dry_run_workflow().await;

        let mut state = WorkflowState::new();
        state.postings = vec![workflow_posting("job-1", false), workflow_posting("job-2", false)];
        state.attempts.push(ApplicationAttempt {
            job_id: "job-1".to_string(),
            title: "Role job-1".to_string(),
            company: "Acme".to_string(),
            outcome: ApplyOutcome::Simulated,
            at: Utc::now(),
        });

        workflow.apply(&mut state).await.unwrap();

        assert_eq!(state.attempts.len(), 2);
        assert_eq!(
            state.attempts.iter().filter(|a| a.job_id == "job-1").count(),
            1
        );
    }

    #[tokio::test]
    async fn apply_never_touches_synthetic_postings() {
        let workflow = dry_run_workflow().await;

        let mut state = WorkflowState::new();
        state.postings = vec![
            workflow_posting("mock_glassdoor_1", true),
            workflow_posting("job-1", false),
        ];

        workflow.apply(&mut state).await.unwrap();

        assert_eq!(state.attempts.len(), 1);
        assert_eq!(state.attempts[0].job_id, "job-1");
    }

    #[test]
    fn state_serializes_to_session_json() {
        let mut state = WorkflowState::new();
        state.attempts.push(ApplicationAttempt {
            job_id: "job-1".to_string(),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            outcome: ApplyOutcome::Simulated,
            at: Utc::now(),
        });
        state.finalize(false);

        let json = serde_json::to_string(&state).unwrap();
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.session_id, state.session_id);
        assert_eq!(restored.attempts.len(), 1);
        assert_eq!(restored.submitted_count(), 0);
    }
}
