use crate::config::Config;
use crate::error::Result;
use crate::extract;
use crate::load::{LoadReport, Loader};
use crate::transform::Normalizer;
use chrono::{DateTime, Utc};
use tracing::{info, info_span};

/// Run lifecycle: `Idle → Extracting → Transforming → Loading → Done`.
/// A failure in any working state halts the run there; there is no retry
/// or resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Done,
}

/// What a completed run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_records: usize,
    pub report: LoadReport,
}

/// Runs the full pipeline: extract, transform, load. The database
/// connection is opened only once transformed output exists and is closed
/// on every exit path when the loader drops.
pub fn run(config: &Config) -> Result<RunSummary> {
    let started_at = Utc::now();
    let mut state = RunState::Idle;

    state = advance(state, RunState::Extracting);
    let extracted = {
        let span = info_span!("extract");
        let _enter = span.enter();
        extract::extract(&config.input)?
    };

    state = advance(state, RunState::Transforming);
    let batch = {
        let span = info_span!("transform");
        let _enter = span.enter();
        Normalizer::new(&extracted.schema).normalize(&extracted.records)?
    };

    state = advance(state, RunState::Loading);
    let report = {
        let span = info_span!("load");
        let _enter = span.enter();
        let mut loader = Loader::connect(&config.database.path, config.load.commit_mode)?;
        loader.init_schema()?;
        loader.load(&batch)?
    };

    advance(state, RunState::Done);
    Ok(RunSummary {
        started_at,
        finished_at: Utc::now(),
        input_records: extracted.records.len(),
        report,
    })
}

/// Creates the destination tables without running a batch.
pub fn init_db(config: &Config) -> Result<()> {
    let loader = Loader::connect(&config.database.path, config.load.commit_mode)?;
    loader.init_schema()?;
    info!(path = %config.database.path.display(), "Database schema initialized");
    Ok(())
}

fn advance(from: RunState, to: RunState) -> RunState {
    info!(from = ?from, to = ?to, "Run state transition");
    to
}
