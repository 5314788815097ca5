//! The optimize-validate loop. Each round generates, renders and validates
//! candidates, then decides whether to stop or feed issues back into the next round.
//!
//! # Rounds
//! Rounds run strictly one after another. Within a round, parallel mode fans out
//! `fan_out` independent candidate pipelines (generate → render → validate) on a
//! `JoinSet`, and DECIDE waits for all of them. Sequential mode runs one pipeline
//! inline.
//!
//! # Failure policy
//! A generation or render failure removes that candidate from the round and is
//! recorded in the [`RoundReport`]; it never aborts the run. A round where nothing
//! rendered contributes nothing but still counts against `max_iterations`. Only a
//! failed job extraction (before the first round) is an error.
//!
//! # Selection
//! - any passing candidate in a round → best aggregate score among them, earliest
//!   slot on ties, and the run ends;
//! - otherwise the running best across all rounds is kept (replaced only by a
//!   strictly higher score, so earlier candidates win ties) and its issues and
//!   suggestions are fed to the next round.
//!
//! # Cancellation
//! Dropping the `optimize` future drops the round's `JoinSet`, which aborts every
//! in-flight pipeline; renderers release their resources on drop.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::generation::{CandidateGenerator, Feedback, GenerationRequest};
use crate::jobs::{JobExtractionError, JobExtractor};
use crate::models::{
    Candidate, CandidateId, JobPosting, OptimizedResume, RenderedCandidate, ResumeSource,
    SelectionMetric, ValidationResult,
};
use crate::optimization::validator::Validator;
use crate::render::Renderer;

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

/// The job to optimize for: raw text to extract, or an already structured posting.
#[derive(Debug, Clone)]
pub enum JobInput {
    Text(String),
    Posting(JobPosting),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeParams {
    /// Round budget. Must be at least 1.
    pub max_iterations: u32,
    /// Fan out `fan_out` candidates per round instead of one.
    pub parallel: bool,
}

/// Errors that stop a run before its first round.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("max_iterations must be at least 1")]
    InvalidIterations,

    #[error(transparent)]
    JobExtraction(#[from] JobExtractionError),
}

impl OptimizeError {
    pub fn is_invalid_api_key(&self) -> bool {
        matches!(self, OptimizeError::JobExtraction(e) if e.is_invalid_api_key())
    }
}

/// Terminal state of a run.
#[derive(Debug)]
pub struct Optimization {
    /// `None` only if no candidate ever rendered.
    pub optimized: Option<OptimizedResume>,
    /// Verdict for `optimized`; empty and failing when nothing rendered.
    pub validation: ValidationResult,
    pub job: JobPosting,
    pub rounds: Vec<RoundReport>,
}

/// What happened in one round, for the caller's display.
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub round: u32,
    pub requested: u32,
    pub candidates: Vec<CandidateReport>,
    /// No candidate in this round rendered.
    pub degraded: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    pub id: CandidateId,
    #[serde(flatten)]
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateStatus {
    Validated { passed: bool, score: f64 },
    GenerationFailed { error: String },
    RenderFailed { error: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Optimizer
// ────────────────────────────────────────────────────────────────────────────

/// Drives the optimize-validate loop over pluggable collaborators.
#[derive(Clone)]
pub struct Optimizer {
    extractor: Arc<dyn JobExtractor>,
    generator: Arc<dyn CandidateGenerator>,
    renderer: Arc<dyn Renderer>,
    validator: Arc<Validator>,
    fan_out: u32,
    metric: SelectionMetric,
}

impl Optimizer {
    pub fn new(
        extractor: Arc<dyn JobExtractor>,
        generator: Arc<dyn CandidateGenerator>,
        renderer: Arc<dyn Renderer>,
        validator: Arc<Validator>,
    ) -> Self {
        Self {
            extractor,
            generator,
            renderer,
            validator,
            fan_out: 3,
            metric: SelectionMetric::Mean,
        }
    }

    /// Candidates per round in parallel mode. Values below 1 are raised to 1.
    pub fn with_fan_out(mut self, fan_out: u32) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn with_selection_metric(mut self, metric: SelectionMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Runs a full optimization for `source` against `job`.
    ///
    /// Errors only when the run cannot start. Exhausting the budget without a
    /// passing candidate is a normal result with `validation.passed == false`.
    pub async fn optimize(
        &self,
        source: &ResumeSource,
        job: JobInput,
        params: OptimizeParams,
    ) -> Result<Optimization, OptimizeError> {
        if params.max_iterations == 0 {
            return Err(OptimizeError::InvalidIterations);
        }

        let job = match job {
            JobInput::Posting(posting) => posting,
            JobInput::Text(text) => self.extractor.extract(&text).await?,
        };

        Ok(self.run(source, job, params).await)
    }

    async fn run(&self, source: &ResumeSource, job: JobPosting, params: OptimizeParams) -> Optimization {
        let source = Arc::new(source.clone());
        let job = Arc::new(job);
        let round_size = if params.parallel { self.fan_out } else { 1 };

        let mut best: Option<Scored> = None;
        let mut feedback = Feedback::default();
        let mut rounds = Vec::new();

        for round in 0..params.max_iterations {
            info!(
                round,
                candidates = round_size,
                feedback_items = feedback.issues.len() + feedback.suggestions.len(),
                "Optimization round starting"
            );

            let ctx = Arc::new(RoundContext {
                generator: Arc::clone(&self.generator),
                renderer: Arc::clone(&self.renderer),
                validator: Arc::clone(&self.validator),
                source: Arc::clone(&source),
                job: Arc::clone(&job),
                feedback: std::mem::take(&mut feedback),
                round_size,
            });

            let outcomes = run_round(ctx, round, round_size, params.parallel).await;
            let (report, scored) = self.summarize(round, round_size, outcomes);
            rounds.push(report);

            if let Some(winner) = decide(&mut best, scored) {
                info!(
                    round,
                    candidate = %winner.rendered.id(),
                    score = winner.score,
                    "Candidate passed all filters"
                );
                return finish(Some(winner), &job, rounds);
            }

            if round + 1 >= params.max_iterations {
                break;
            }

            if let Some(b) = &best {
                feedback = Feedback::from_validation(&b.validation);
            }
        }

        match &best {
            Some(b) => info!(
                rounds = rounds.len(),
                candidate = %b.rendered.id(),
                score = b.score,
                "Iteration budget exhausted, returning best-effort candidate"
            ),
            None => warn!(rounds = rounds.len(), "Iteration budget exhausted with no rendered candidate"),
        }
        finish(best, &job, rounds)
    }

    /// Turns raw pipeline outcomes into the round report plus ranked, validated candidates.
    fn summarize(
        &self,
        round: u32,
        requested: u32,
        outcomes: Vec<(CandidateId, PipelineOutcome)>,
    ) -> (RoundReport, Vec<Scored>) {
        let mut candidates = Vec::with_capacity(outcomes.len());
        let mut scored = Vec::new();

        for (id, outcome) in outcomes {
            let status = match outcome {
                PipelineOutcome::Validated { rendered, validation } => {
                    let score = validation.aggregate_score(self.metric);
                    let status = CandidateStatus::Validated {
                        passed: validation.passed,
                        score,
                    };
                    scored.push(Scored {
                        rendered,
                        validation,
                        score,
                    });
                    status
                }
                PipelineOutcome::GenerationFailed(error) => CandidateStatus::GenerationFailed { error },
                PipelineOutcome::RenderFailed(error) => CandidateStatus::RenderFailed { error },
            };
            candidates.push(CandidateReport { id, status });
        }

        let degraded = scored.is_empty();
        if degraded {
            warn!(round, "No candidate rendered this round");
        }

        (
            RoundReport {
                round,
                requested,
                candidates,
                degraded,
            },
            scored,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Round execution
// ────────────────────────────────────────────────────────────────────────────

/// Everything one candidate pipeline reads. Shared read-only across a round's tasks.
struct RoundContext {
    generator: Arc<dyn CandidateGenerator>,
    renderer: Arc<dyn Renderer>,
    validator: Arc<Validator>,
    source: Arc<ResumeSource>,
    job: Arc<JobPosting>,
    feedback: Feedback,
    round_size: u32,
}

enum PipelineOutcome {
    Validated {
        rendered: RenderedCandidate,
        validation: ValidationResult,
    },
    GenerationFailed(String),
    RenderFailed(String),
}

/// A validated candidate with its ranking score.
struct Scored {
    rendered: RenderedCandidate,
    validation: ValidationResult,
    score: f64,
}

/// Runs every pipeline of a round and returns outcomes in slot order.
/// Returns only once all pipelines have finished.
async fn run_round(
    ctx: Arc<RoundContext>,
    round: u32,
    size: u32,
    parallel: bool,
) -> Vec<(CandidateId, PipelineOutcome)> {
    let ids: Vec<CandidateId> = (0..size).map(|slot| CandidateId { round, slot }).collect();

    if !parallel {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            outcomes.push((id, run_pipeline(&ctx, id).await));
        }
        return outcomes;
    }

    let mut join_set = JoinSet::new();
    for id in ids.iter().copied() {
        let ctx = Arc::clone(&ctx);
        join_set.spawn(async move { (id, run_pipeline(&ctx, id).await) });
    }

    let mut ordered: Vec<Option<PipelineOutcome>> = ids.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((id, outcome)) => ordered[id.slot as usize] = Some(outcome),
            Err(e) => error!(round, "Candidate task did not complete: {e}"),
        }
    }

    ids.into_iter()
        .zip(ordered)
        .map(|(id, outcome)| {
            let outcome = outcome.unwrap_or_else(|| {
                PipelineOutcome::GenerationFailed("candidate task did not complete".to_string())
            });
            (id, outcome)
        })
        .collect()
}

/// generate → render → validate for a single candidate. Never fails; failures
/// become outcomes.
async fn run_pipeline(ctx: &RoundContext, id: CandidateId) -> PipelineOutcome {
    let request = GenerationRequest {
        id,
        round_size: ctx.round_size,
        source: &ctx.source,
        job: &ctx.job,
        feedback: &ctx.feedback,
    };

    let markup = match ctx.generator.generate(request).await {
        Ok(markup) => markup,
        Err(e) => {
            warn!(candidate = %id, "Candidate generation failed: {e}");
            return PipelineOutcome::GenerationFailed(e.to_string());
        }
    };

    let document = match ctx.renderer.render(&markup).await {
        Ok(document) => document,
        Err(e) => {
            warn!(candidate = %id, "Candidate render failed: {e}");
            return PipelineOutcome::RenderFailed(e.to_string());
        }
    };

    let rendered = RenderedCandidate::new(Candidate { id, markup }, document);
    let validation = ctx.validator.validate(&rendered, &ctx.job);
    info!(
        candidate = %id,
        passed = validation.passed,
        pages = rendered.page_count(),
        "Candidate validated"
    );
    PipelineOutcome::Validated {
        rendered,
        validation,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Decision
// ────────────────────────────────────────────────────────────────────────────

/// DECIDE step. Returns the winner if any candidate passed; otherwise folds the
/// round into `best`. `scored` must be in generation order.
fn decide(best: &mut Option<Scored>, scored: Vec<Scored>) -> Option<Scored> {
    let (passing, failing): (Vec<Scored>, Vec<Scored>) =
        scored.into_iter().partition(|s| s.validation.passed);

    if let Some(winner) = pick_highest(passing) {
        return Some(winner);
    }

    for candidate in failing {
        let replace = best.as_ref().map_or(true, |b| candidate.score > b.score);
        if replace {
            *best = Some(candidate);
        }
    }
    None
}

/// Highest score; the earliest wins ties.
fn pick_highest(candidates: Vec<Scored>) -> Option<Scored> {
    candidates.into_iter().fold(None, |acc: Option<Scored>, c| match acc {
        Some(a) if a.score >= c.score => Some(a),
        _ => Some(c),
    })
}

fn finish(best: Option<Scored>, job: &Arc<JobPosting>, rounds: Vec<RoundReport>) -> Optimization {
    let job = JobPosting::clone(job);
    match best {
        Some(s) => Optimization {
            optimized: Some(s.rendered.into()),
            validation: s.validation,
            job,
            rounds,
        },
        None => Optimization {
            optimized: None,
            validation: ValidationResult::nothing_rendered(),
            job,
            rounds,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::generation::GenerationError;
    use crate::models::{FilterResult, RenderOutput};
    use crate::optimization::filters::Filter;
    use crate::render::RenderError;

    // ── stubs ───────────────────────────────────────────────────────────────

    struct StubExtractor {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl JobExtractor for StubExtractor {
        async fn extract(&self, raw_text: &str) -> Result<JobPosting, JobExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(JobExtractionError::EmptyText);
            }
            Ok(JobPosting {
                title: "Rust Engineer".to_string(),
                raw_text: raw_text.to_string(),
                ..Default::default()
            })
        }
    }

    type Script = dyn Fn(CandidateId, &Feedback) -> Result<String, GenerationError> + Send + Sync;

    /// Generator driven by a closure of the candidate id (and optionally the
    /// feedback it receives); records the feedback it saw.
    struct ScriptedGenerator {
        script: Box<Script>,
        seen: Mutex<Vec<(CandidateId, Feedback)>>,
    }

    impl ScriptedGenerator {
        fn new(script: impl Fn(CandidateId) -> Result<String, GenerationError> + Send + Sync + 'static) -> Arc<Self> {
            Self::responsive(move |id, _| script(id))
        }

        fn responsive(
            script: impl Fn(CandidateId, &Feedback) -> Result<String, GenerationError> + Send + Sync + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                script: Box::new(script),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }

        fn feedback_for(&self, round: u32) -> Vec<Feedback> {
            let mut seen: Vec<_> = self
                .seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| id.round == round)
                .cloned()
                .collect();
            seen.sort_by_key(|(id, _)| *id);
            seen.into_iter().map(|(_, f)| f).collect()
        }
    }

    #[async_trait]
    impl CandidateGenerator for ScriptedGenerator {
        async fn generate(&self, request: GenerationRequest<'_>) -> Result<String, GenerationError> {
            self.seen
                .lock()
                .unwrap()
                .push((request.id, request.feedback.clone()));
            (self.script)(request.id, request.feedback)
        }
    }

    /// Fails markup containing `FAIL_RENDER`; hangs on `HANG_RENDER` until dropped.
    struct StubRenderer {
        dropped_while_rendering: Arc<AtomicBool>,
    }

    impl StubRenderer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                dropped_while_rendering: Arc::new(AtomicBool::new(false)),
            })
        }
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, markup: &str) -> Result<RenderOutput, RenderError> {
            if markup.contains("FAIL_RENDER") {
                return Err(RenderError::InvalidPdf("stub render failure".to_string()));
            }
            if markup.contains("HANG_RENDER") {
                let _guard = SetOnDrop(Arc::clone(&self.dropped_while_rendering));
                std::future::pending::<()>().await;
            }
            Ok(RenderOutput {
                pdf_bytes: markup.as_bytes().to_vec(),
                page_count: 1,
                warnings: vec![],
            })
        }
    }

    /// Reads `score=<f64>` from the markup. Issue text echoes the score so
    /// feedback can be traced.
    struct MarkupScoreFilter {
        name: &'static str,
        threshold: f64,
    }

    impl Filter for MarkupScoreFilter {
        fn name(&self) -> &str {
            self.name
        }

        fn evaluate(&self, candidate: &RenderedCandidate, _job: &JobPosting) -> FilterResult {
            let score = candidate
                .markup()
                .split("score=")
                .nth(1)
                .and_then(|rest| rest.split(|c: char| c != '.' && !c.is_ascii_digit()).next())
                .and_then(|s| s.parse::<f64>().ok());
            match score {
                Some(score) => FilterResult::scored(
                    self.name,
                    score,
                    self.threshold,
                    vec![format!("{} scored {score}", candidate.id())],
                    vec!["raise the score".to_string()],
                ),
                None => FilterResult::unscorable(self.name, self.threshold, "no score in markup"),
            }
        }
    }

    fn validator(threshold: f64) -> Arc<Validator> {
        Arc::new(
            Validator::new(vec![Arc::new(MarkupScoreFilter {
                name: "markup_score",
                threshold,
            })])
            .unwrap(),
        )
    }

    fn optimizer(
        extractor_fails: bool,
        generator: Arc<ScriptedGenerator>,
        renderer: Arc<StubRenderer>,
        threshold: f64,
        fan_out: u32,
    ) -> Optimizer {
        Optimizer::new(
            Arc::new(StubExtractor {
                fail: extractor_fails,
                calls: AtomicUsize::new(0),
            }),
            generator,
            renderer,
            validator(threshold),
        )
        .with_fan_out(fan_out)
    }

    fn posting() -> JobInput {
        JobInput::Posting(JobPosting {
            title: "Rust Engineer".to_string(),
            company: "Ferrous Labs".to_string(),
            ..Default::default()
        })
    }

    fn source() -> ResumeSource {
        ResumeSource::new("Jane Doe\nRust engineer")
    }

    fn params(max_iterations: u32, parallel: bool) -> OptimizeParams {
        OptimizeParams {
            max_iterations,
            parallel,
        }
    }

    // ── scenarios ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_single_passing_candidate_ends_after_one_round() {
        let generator = ScriptedGenerator::new(|_| Ok("<p>score=1.0</p>".to_string()));
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.9, 3);

        let result = opt.optimize(&source(), posting(), params(1, false)).await.unwrap();

        assert!(result.validation.passed);
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(generator.calls(), 1);
        let optimized = result.optimized.expect("artifact");
        assert_eq!(optimized.candidate_id, CandidateId { round: 0, slot: 0 });
        assert_eq!(result.job.company, "Ferrous Labs");
    }

    #[tokio::test]
    async fn test_always_failing_filter_runs_full_budget_and_returns_last_improvement() {
        // Each draft scores 0.1 above the score reported in its feedback, so
        // improvement only happens if the best candidate's issues reach the next round.
        let generator = ScriptedGenerator::responsive(|_, feedback| {
            let previous = feedback
                .issues
                .iter()
                .filter_map(|issue| issue.rsplit(' ').next()?.parse::<f64>().ok())
                .next();
            let score = previous.map_or(0.2, |p| p + 0.1);
            Ok(format!("<p>score={score:.1}</p>"))
        });
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.99, 3);

        let result = opt.optimize(&source(), posting(), params(3, false)).await.unwrap();

        assert!(!result.validation.passed);
        assert_eq!(result.rounds.len(), 3);
        assert_eq!(generator.calls(), 3);
        let optimized = result.optimized.expect("best effort artifact");
        assert_eq!(optimized.candidate_id, CandidateId { round: 2, slot: 0 });
        assert!((result.validation.results[0].score - 0.4).abs() < 1e-9);

        assert!(generator.feedback_for(0)[0].is_empty());
        assert!(generator.feedback_for(1)[0].issues[0].ends_with("scored 0.2"));
        assert!(generator.feedback_for(2)[0].issues[0].ends_with("scored 0.3"));
    }

    #[tokio::test]
    async fn test_parallel_round_selects_the_passing_candidate() {
        let generator = ScriptedGenerator::new(|id| {
            let score = if id.slot == 1 { "0.95" } else { "0.5" };
            Ok(format!("<p>score={score}</p>"))
        });
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.9, 3);

        let result = opt.optimize(&source(), posting(), params(5, true)).await.unwrap();

        assert!(result.validation.passed);
        assert_eq!(result.rounds.len(), 1);
        assert_eq!(generator.calls(), 3);
        assert_eq!(
            result.optimized.unwrap().candidate_id,
            CandidateId { round: 0, slot: 1 }
        );
        let slots: Vec<u32> = result.rounds[0].candidates.iter().map(|c| c.id.slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    // ── selection ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_highest_passing_wins_and_ties_go_to_earliest_slot() {
        let generator = ScriptedGenerator::new(|id| {
            let score = match id.slot {
                0 => "0.91",
                1 => "0.97",
                _ => "0.97",
            };
            Ok(format!("<p>score={score}</p>"))
        });
        let opt = optimizer(false, generator, StubRenderer::new(), 0.9, 3);

        let result = opt.optimize(&source(), posting(), params(1, true)).await.unwrap();
        assert_eq!(
            result.optimized.unwrap().candidate_id,
            CandidateId { round: 0, slot: 1 }
        );
    }

    #[tokio::test]
    async fn test_running_best_never_regresses_across_rounds() {
        let generator = ScriptedGenerator::new(|id| {
            let score = match id.round {
                0 => "0.5",
                1 => "0.3",
                _ => "0.5",
            };
            Ok(format!("<p>score={score}</p>"))
        });
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.9, 1);

        let result = opt.optimize(&source(), posting(), params(3, false)).await.unwrap();

        // round 2 ties round 0; the earlier candidate is kept
        assert_eq!(
            result.optimized.unwrap().candidate_id,
            CandidateId { round: 0, slot: 0 }
        );
        assert!((result.validation.results[0].score - 0.5).abs() < 1e-9);
        // feedback in rounds 1 and 2 comes from the round-0 running best
        for round in [1, 2] {
            let feedback = generator.feedback_for(round);
            assert_eq!(feedback.len(), 1);
            assert_eq!(feedback[0].issues, vec!["r0c0 scored 0.5".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_first_round_gets_empty_feedback_and_later_rounds_get_best_feedback() {
        let generator = ScriptedGenerator::new(|id| Ok(format!("<p>score=0.{}</p>", id.slot + 1)));
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.99, 3);

        opt.optimize(&source(), posting(), params(2, true)).await.unwrap();

        assert!(generator.feedback_for(0).iter().all(Feedback::is_empty));
        let round1 = generator.feedback_for(1);
        assert_eq!(round1.len(), 3);
        for fb in round1 {
            assert_eq!(fb.issues, vec!["r0c2 scored 0.3".to_string()]);
            assert_eq!(fb.suggestions, vec!["raise the score".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_min_metric_ranks_by_weakest_filter() {
        let generator = ScriptedGenerator::new(|id| {
            // slot 0: mean 0.55, min 0.3 ; slot 1: mean 0.5, min 0.45
            let markup = if id.slot == 0 {
                "<p>score=0.3</p><!-- b:0.8 -->"
            } else {
                "<p>score=0.45</p><!-- b:0.55 -->"
            };
            Ok(markup.to_string())
        });

        struct SecondScore;
        impl Filter for SecondScore {
            fn name(&self) -> &str {
                "second"
            }
            fn evaluate(&self, c: &RenderedCandidate, _j: &JobPosting) -> FilterResult {
                let s: f64 = c
                    .markup()
                    .split("b:")
                    .nth(1)
                    .and_then(|r| r.split(' ').next())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.0);
                FilterResult::scored("second", s, 0.99, vec![], vec![])
            }
        }

        let validator = Validator::new(vec![
            Arc::new(MarkupScoreFilter {
                name: "markup_score",
                threshold: 0.99,
            }),
            Arc::new(SecondScore),
        ])
        .unwrap();

        let opt = Optimizer::new(
            Arc::new(StubExtractor {
                fail: false,
                calls: AtomicUsize::new(0),
            }),
            generator,
            StubRenderer::new(),
            Arc::new(validator),
        )
        .with_fan_out(2);

        let mean = opt.clone().optimize(&source(), posting(), params(1, true)).await.unwrap();
        assert_eq!(mean.optimized.unwrap().candidate_id.slot, 0);

        let min = opt
            .with_selection_metric(SelectionMetric::Min)
            .optimize(&source(), posting(), params(1, true))
            .await
            .unwrap();
        assert_eq!(min.optimized.unwrap().candidate_id.slot, 1);
    }

    // ── failure handling ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_one_render_failure_does_not_stop_the_round() {
        let generator = ScriptedGenerator::new(|id| match id.slot {
            0 => Ok("<p>FAIL_RENDER</p>".to_string()),
            1 => Ok("<p>score=0.4</p>".to_string()),
            _ => Ok("<p>score=0.6</p>".to_string()),
        });
        let opt = optimizer(false, generator, StubRenderer::new(), 0.9, 3);

        let result = opt.optimize(&source(), posting(), params(1, true)).await.unwrap();

        let round = &result.rounds[0];
        assert!(!round.degraded);
        assert!(matches!(round.candidates[0].status, CandidateStatus::RenderFailed { .. }));
        assert!(matches!(
            round.candidates[2].status,
            CandidateStatus::Validated { passed: false, .. }
        ));
        assert_eq!(
            result.optimized.unwrap().candidate_id,
            CandidateId { round: 0, slot: 2 }
        );
    }

    #[tokio::test]
    async fn test_generation_failures_are_recorded_not_raised() {
        let generator = ScriptedGenerator::new(|id| {
            if id.slot == 0 {
                Err(GenerationError::EmptyMarkup)
            } else {
                Ok("<p>score=0.95</p>".to_string())
            }
        });
        let opt = optimizer(false, generator, StubRenderer::new(), 0.9, 2);

        let result = opt.optimize(&source(), posting(), params(2, true)).await.unwrap();

        assert!(result.validation.passed);
        assert_eq!(
            result.rounds[0].candidates[0].status,
            CandidateStatus::GenerationFailed {
                error: "generator returned no markup".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_nothing_ever_renders_returns_empty_failing_result() {
        let generator = ScriptedGenerator::new(|_| Ok("<p>FAIL_RENDER</p>".to_string()));
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.9, 3);

        let result = opt.optimize(&source(), posting(), params(2, true)).await.unwrap();

        assert!(result.optimized.is_none());
        assert_eq!(result.validation, ValidationResult::nothing_rendered());
        assert_eq!(result.rounds.len(), 2);
        assert!(result.rounds.iter().all(|r| r.degraded));
        assert_eq!(generator.calls(), 6);
        assert!(generator.feedback_for(1).iter().all(Feedback::is_empty));
    }

    #[tokio::test]
    async fn test_degraded_round_is_followed_by_a_normal_round() {
        let generator = ScriptedGenerator::new(|id| {
            if id.round == 0 {
                Ok("<p>FAIL_RENDER</p>".to_string())
            } else {
                Ok("<p>score=0.95</p>".to_string())
            }
        });
        let opt = optimizer(false, generator, StubRenderer::new(), 0.9, 2);

        let result = opt.optimize(&source(), posting(), params(3, true)).await.unwrap();

        assert!(result.rounds[0].degraded);
        assert!(result.validation.passed);
        assert_eq!(result.rounds.len(), 2);
        assert_eq!(result.optimized.unwrap().candidate_id.round, 1);
    }

    #[tokio::test]
    async fn test_rounds_never_exceed_budget() {
        for max in 1..=4 {
            let generator = ScriptedGenerator::new(|id| {
                if id.slot % 2 == 0 {
                    Ok("<p>FAIL_RENDER</p>".to_string())
                } else {
                    Err(GenerationError::EmptyMarkup)
                }
            });
            let opt = optimizer(false, generator, StubRenderer::new(), 0.9, 2);
            let result = opt.optimize(&source(), posting(), params(max, true)).await.unwrap();
            assert_eq!(result.rounds.len(), max as usize);
        }
    }

    // ── fatal errors ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_zero_iterations_is_rejected() {
        let generator = ScriptedGenerator::new(|_| Ok("<p>score=1</p>".to_string()));
        let opt = optimizer(false, generator.clone(), StubRenderer::new(), 0.9, 1);

        let err = opt.optimize(&source(), posting(), params(0, false)).await.unwrap_err();
        assert!(matches!(err, OptimizeError::InvalidIterations));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_job_extraction_failure_is_fatal_before_any_round() {
        let generator = ScriptedGenerator::new(|_| Ok("<p>score=1</p>".to_string()));
        let opt = optimizer(true, generator.clone(), StubRenderer::new(), 0.9, 1);

        let err = opt
            .optimize(&source(), JobInput::Text("posting".to_string()), params(3, false))
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizeError::JobExtraction(_)));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_text_input_is_extracted_once() {
        let generator = ScriptedGenerator::new(|_| Ok("<p>score=1</p>".to_string()));
        let extractor = Arc::new(StubExtractor {
            fail: false,
            calls: AtomicUsize::new(0),
        });
        let opt = Optimizer::new(extractor.clone(), generator, StubRenderer::new(), validator(0.9));

        let result = opt
            .optimize(&source(), JobInput::Text("We need Rust".to_string()), params(2, false))
            .await
            .unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.job.raw_text, "We need Rust");
    }

    // ── cancellation ────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_cancelling_the_run_abandons_in_flight_renders() {
        let generator = ScriptedGenerator::new(|id| {
            if id.slot == 0 {
                Ok("<p>HANG_RENDER</p>".to_string())
            } else {
                Ok("<p>score=0.95</p>".to_string())
            }
        });
        let renderer = StubRenderer::new();
        let dropped = Arc::clone(&renderer.dropped_while_rendering);
        let opt = optimizer(false, generator, renderer, 0.9, 2);

        let src = source();
        let run = opt.optimize(&src, posting(), params(1, true));
        let outcome = tokio::time::timeout(Duration::from_secs(5), run).await;
        assert!(outcome.is_err(), "round must wait for every pipeline");

        // let the runtime process the aborts
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(dropped.load(Ordering::SeqCst));
    }
}
