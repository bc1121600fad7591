use serde::{Deserialize, Serialize};

/// How well a candidate's skills cover a job's required skills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub score: f64,
}

impl FitReport {
    /// Compares candidate skills against required skills, case-insensitively.
    /// A job with no extractable requirements scores 1.0 so it is never
    /// filtered out on missing data alone.
    pub fn compute(candidate_skills: &[String], required_skills: &[String]) -> Self {
        if required_skills.is_empty() {
            return Self {
                matched: Vec::new(),
                missing: Vec::new(),
                score: 1.0,
            };
        }

        let candidate: Vec<String> = candidate_skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .collect();

        let mut matched = Vec::new();
        let mut missing = Vec::new();
        for skill in required_skills {
            let wanted = skill.trim().to_lowercase();
            if candidate.contains(&wanted) {
                matched.push(wanted);
            } else {
                missing.push(wanted);
            }
        }

        let score = matched.len() as f64 / required_skills.len() as f64;
        Self {
            matched,
            missing,
            score,
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partial_overlap_scores_proportionally() {
        let report = FitReport::compute(
            &strs(&["Python", "docker"]),
            &strs(&["python", "docker", "kubernetes", "aws"]),
        );
        assert!((report.score - 0.5).abs() < f64::EPSILON);
        assert_eq!(report.matched, strs(&["python", "docker"]));
        assert_eq!(report.missing, strs(&["kubernetes", "aws"]));
        assert!(!report.meets(0.7));
    }

    #[test]
    fn no_requirements_scores_full_match() {
        let report = FitReport::compute(&strs(&["rust"]), &[]);
        assert!((report.score - 1.0).abs() < f64::EPSILON);
        assert!(report.meets(0.7));
    }

    #[test]
    fn empty_candidate_matches_nothing() {
        let report = FitReport::compute(&[], &strs(&["python"]));
        assert_eq!(report.score, 0.0);
        assert_eq!(report.missing, strs(&["python"]));
    }
}
