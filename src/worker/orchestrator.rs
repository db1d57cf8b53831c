//! Per-job pipeline: load, compute, persist.
//!
//! A job moves through `Received → Loading → Computing → Persisting →
//! Completed`. `Failed` is reachable from every non-terminal state. The
//! outcome is always returned as a [`JobReport`]; nothing is swallowed. A
//! panic inside the pipeline fails the job at the stage it reached.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RankingConfig;
use crate::error::{EntityKind, RecommendError, Result};
use crate::queue::JobDescriptor;
use crate::recommend::{
    attach_peer_usage, build_gaps, prepare, RankedResource, RankingWeights, ResourceRanker, UserSkillSet,
};
use crate::similarity::{
    CatalogSimilarity, MatrixCache, SimilarityMatrix, SkillMapping, SkillSimilarityIndex,
};
use crate::store::types::{Idp, IdpStatus, Resource, Skill, User};
use crate::store::RecommendationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Received,
    Loading,
    Computing,
    Persisting,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Loading => "loading",
            Self::Computing => "computing",
            Self::Persisting => "persisting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (self, next) {
            (Received, Loading) | (Loading, Computing) | (Computing, Persisting) => true,
            (Persisting, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    /// Recommendations were written and the IDP is active.
    Completed { recommended: usize },
    /// The user or IDP no longer exists. The job ends `Failed` but nothing was written.
    Dropped(RecommendError),
    /// The job failed in `stage`; the IDP was marked failed.
    Failed { stage: JobState, error: RecommendError },
}

#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub idp_id: String,
    pub history: Vec<JobState>,
    pub outcome: JobOutcome,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn final_state(&self) -> JobState {
        self.history.last().copied().unwrap_or(JobState::Received)
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.outcome, JobOutcome::Completed { .. })
    }
}

/// Everything a job reads before computing.
pub struct LoadedJob {
    pub user: User,
    pub idp: Idp,
    pub skills: Vec<Skill>,
    pub resources: Vec<Resource>,
    /// Other users' use of each resource, keyed by resource ID.
    pub peer_usage: HashMap<String, usize>,
}

/// State history for one job; rejects illegal transitions.
struct Run {
    history: Vec<JobState>,
}

impl Run {
    fn new() -> Self {
        Self {
            history: vec![JobState::Received],
        }
    }

    fn state(&self) -> JobState {
        self.history.last().copied().unwrap_or(JobState::Received)
    }

    fn advance(&mut self, next: JobState) -> Result<()> {
        let current = self.state();
        if !current.can_transition_to(next) {
            return Err(RecommendError::Computation(format!(
                "illegal job transition {current} -> {next}"
            )));
        }
        self.history.push(next);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Why a job stopped before `Completed`.
enum Halt {
    Dropped(RecommendError),
    Failed(JobState, RecommendError),
}

pub struct Orchestrator {
    store: Arc<dyn RecommendationStore>,
    index: Arc<SkillSimilarityIndex>,
    cache: Arc<MatrixCache>,
    ranker: ResourceRanker,
    top_n: usize,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RecommendationStore>,
        index: Arc<SkillSimilarityIndex>,
        cache: Arc<MatrixCache>,
        ranking: &RankingConfig,
    ) -> Self {
        Self {
            store,
            index,
            cache,
            ranker: ResourceRanker::new(RankingWeights::from(ranking)),
            top_n: ranking.top_n,
        }
    }

    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }

    /// Run one job to a terminal state.
    pub fn handle(&self, job_id: &str, job: &JobDescriptor) -> JobReport {
        let started = Instant::now();
        let _span = tracing::info_span!("job", job_id = %job_id, idp = %job.idp_id).entered();
        tracing::info!(user = %job.user_id, "job received");

        let mut run = Run::new();
        let driven = panic::catch_unwind(AssertUnwindSafe(|| self.drive(job, &mut run)))
            .unwrap_or_else(|payload| {
                let stage = run.state();
                Err(Halt::Failed(
                    stage,
                    RecommendError::Computation(format!(
                        "job panicked while {stage}: {}",
                        panic_message(payload.as_ref())
                    )),
                ))
            });
        let outcome = match driven {
            Ok(recommended) => {
                tracing::info!(recommended, "job completed");
                JobOutcome::Completed { recommended }
            }
            Err(Halt::Dropped(error)) => {
                if let Err(e) = run.advance(JobState::Failed) {
                    tracing::error!(error = %e, "could not record job failure");
                }
                tracing::warn!(
                    error = %error,
                    retryable = error.is_retryable(),
                    "job dropped, nothing written"
                );
                JobOutcome::Dropped(error)
            }
            Err(Halt::Failed(stage, error)) => {
                if let Err(e) = run.advance(JobState::Failed) {
                    tracing::error!(error = %e, "could not record job failure");
                }
                tracing::error!(
                    stage = %stage,
                    error = %error,
                    retryable = error.is_retryable(),
                    "job failed"
                );
                self.record_failure(&job.idp_id, &error);
                JobOutcome::Failed { stage, error }
            }
        };

        JobReport {
            job_id: job_id.to_string(),
            idp_id: job.idp_id.clone(),
            history: run.history,
            outcome,
            elapsed: started.elapsed(),
        }
    }

    /// Fail a job that was delivered too often without running it again.
    pub fn abandon(&self, job_id: &str, job: &JobDescriptor, attempts: u32) -> JobReport {
        let _span = tracing::info_span!("job", job_id = %job_id, idp = %job.idp_id).entered();
        let error = RecommendError::Computation(format!(
            "abandoned after {attempts} deliveries without finishing"
        ));
        tracing::error!(attempts, error = %error, "job abandoned");
        self.record_failure(&job.idp_id, &error);
        JobReport {
            job_id: job_id.to_string(),
            idp_id: job.idp_id.clone(),
            history: vec![JobState::Received, JobState::Failed],
            outcome: JobOutcome::Failed {
                stage: JobState::Received,
                error,
            },
            elapsed: Duration::ZERO,
        }
    }

    fn record_failure(&self, idp_id: &str, error: &RecommendError) {
        if let Err(e) = self.store.mark_failed(idp_id, &error.to_string()) {
            tracing::error!(error = %format!("{e:#}"), "failed to mark idp as failed");
        }
    }

    fn drive(&self, job: &JobDescriptor, run: &mut Run) -> std::result::Result<usize, Halt> {
        let step = |run: &mut Run, next: JobState| {
            let stage = run.state();
            run.advance(next).map_err(|e| Halt::Failed(stage, e))
        };

        step(run, JobState::Loading)?;
        let loaded = self.load(job).map_err(|e| match e {
            RecommendError::EntityNotFound { .. } => Halt::Dropped(e),
            other => Halt::Failed(JobState::Loading, other),
        })?;

        step(run, JobState::Computing)?;
        let ranked = self
            .compute(&loaded)
            .map_err(|e| Halt::Failed(JobState::Computing, e))?;

        step(run, JobState::Persisting)?;
        let entries: Vec<_> = ranked
            .iter()
            .take(self.top_n)
            .map(RankedResource::to_entry)
            .collect();
        self.store
            .write_recommendations(&job.idp_id, &entries, IdpStatus::Active)
            .map_err(|e| Halt::Failed(JobState::Persisting, RecommendError::Store(e)))?;

        step(run, JobState::Completed)?;
        Ok(entries.len())
    }

    /// Fetch the user, IDP and both catalogs for `job`.
    pub fn load(&self, job: &JobDescriptor) -> Result<LoadedJob> {
        let user = self
            .store
            .fetch_user(&job.user_id)?
            .ok_or_else(|| RecommendError::not_found(EntityKind::User, &job.user_id))?;
        let idp = self
            .store
            .fetch_idp(&job.idp_id)?
            .ok_or_else(|| RecommendError::not_found(EntityKind::Idp, &job.idp_id))?;

        if idp.user_id != job.user_id {
            tracing::warn!(
                job_user = %job.user_id,
                idp_user = %idp.user_id,
                "idp belongs to a different user than the job"
            );
        }

        let skills = self.store.fetch_skills()?;
        let resources = self.store.fetch_resources()?;
        let peer_usage = self.store.fetch_peer_usage(&user.id)?;
        tracing::debug!(
            skills = skills.len(),
            resources = resources.len(),
            goals = idp.goals.len(),
            peer_used = peer_usage.len(),
            role = user.role.as_str(),
            "job inputs loaded"
        );

        Ok(LoadedJob {
            user,
            idp,
            skills,
            resources,
            peer_usage,
        })
    }

    /// Rank every resource for the loaded job, best first.
    pub fn compute(&self, loaded: &LoadedJob) -> Result<Vec<RankedResource>> {
        let similarity = match self.cache.get_or_build(&loaded.skills, &self.index) {
            Ok(snapshot) => snapshot,
            Err(RecommendError::EmptyCatalog) => {
                tracing::warn!("skill catalog is empty, ranking on resource metadata only");
                Arc::new(CatalogSimilarity {
                    version: String::new(),
                    mapping: SkillMapping::empty(),
                    matrix: SimilarityMatrix::empty(),
                })
            }
            Err(e) => return Err(e),
        };

        let user_skills = UserSkillSet::from_user(&loaded.user);
        let gaps = build_gaps(&loaded.idp, &user_skills, &similarity.mapping);
        if gaps.is_empty() {
            tracing::info!("no usable goals, ranking on resource metadata only");
        }

        let mut features = prepare(&loaded.resources, &similarity.mapping);
        attach_peer_usage(&mut features, &loaded.peer_usage);
        let ranked = self.ranker.rank(
            &loaded.resources,
            &user_skills,
            &gaps,
            &features,
            &similarity.matrix,
            &similarity.mapping,
        );

        if ranked.len() != loaded.resources.len() {
            return Err(RecommendError::Computation(format!(
                "ranked {} of {} resources",
                ranked.len(),
                loaded.resources.len()
            )));
        }
        Ok(ranked)
    }

    /// Load and rank without writing anything back.
    pub fn preview(&self, job: &JobDescriptor) -> Result<Vec<RankedResource>> {
        let loaded = self.load(job)?;
        self.compute(&loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut run = Run::new();
        for next in [
            JobState::Loading,
            JobState::Computing,
            JobState::Persisting,
            JobState::Completed,
        ] {
            run.advance(next).unwrap();
        }
        assert_eq!(run.state(), JobState::Completed);
        assert_eq!(run.history.len(), 5);
    }

    #[test]
    fn failed_is_reachable_from_any_non_terminal_state() {
        for from in [
            JobState::Received,
            JobState::Loading,
            JobState::Computing,
            JobState::Persisting,
        ] {
            assert!(from.can_transition_to(JobState::Failed));
        }
        assert!(!JobState::Completed.can_transition_to(JobState::Failed));
        assert!(!JobState::Failed.can_transition_to(JobState::Failed));
    }

    #[test]
    fn panic_payloads_are_rendered() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("index out of range"));
        assert_eq!(panic_message(boxed.as_ref()), "index out of range");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }

    #[test]
    fn skipping_a_stage_is_rejected() {
        let mut run = Run::new();
        let err = run.advance(JobState::Persisting).unwrap_err();
        assert!(matches!(err, RecommendError::Computation(_)));
        assert_eq!(run.state(), JobState::Received);
    }
}
