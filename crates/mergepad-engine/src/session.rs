//! Comparison session: the pipeline plus the selection state it feeds.
//!
//! A session runs normalize → diff → materialize on every [`compare`], seeds
//! a fresh [`SelectionStore`] and answers merge/render queries against it.
//! Nothing survives from one comparison to the next except the configuration.
//!
//! [`compare`]: MergeSession::compare

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::adapter::{Differ, SimilarDiffer};
use crate::materialize::materialize;
use crate::normalize::normalize;
use crate::reconcile::{Row, rows_for_segments};
use crate::reduce::{display_lines, merge};
use crate::selection::SelectionStore;
use crate::types::{DiffAlgorithm, DiffStats, InitialSelection, Mode, SegmentId, SegmentState};

/// Configuration for a [`MergeSession`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub algorithm: DiffAlgorithm,
    #[serde(default)]
    pub initial_selection: InitialSelection,
}

impl EngineConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }
}

pub struct MergeSession {
    config: EngineConfig,
    differ: Box<dyn Differ>,
    store: SelectionStore,
    generation: u64,
}

impl MergeSession {
    pub fn new(config: EngineConfig) -> Self {
        let differ = SimilarDiffer::new(config.mode, config.algorithm);
        Self::with_differ(config, Box::new(differ))
    }

    /// Use a custom diff primitive instead of `similar`.
    pub fn with_differ(config: EngineConfig, differ: Box<dyn Differ>) -> Self {
        Self {
            config,
            differ,
            store: SelectionStore::default(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Number of comparisons run so far. Segment ids are only meaningful
    /// together with the generation that produced them.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Run a new comparison, replacing all previous segments and selections.
    pub fn compare(&mut self, original: &str, modified: &str) -> DiffStats {
        let span = info_span!("compare", mode = %self.config.mode, generation = self.generation + 1);
        let _enter = span.enter();

        let original = normalize(original, self.config.mode);
        let modified = normalize(modified, self.config.mode);
        let spans = self.differ.diff(&original, &modified);
        let segments = materialize(&spans, self.config.mode);

        self.store = SelectionStore::new(segments, self.config.initial_selection);
        self.generation += 1;

        let stats = self.stats();
        debug!(
            spans = spans.len(),
            segments = self.store.len(),
            added = stats.added,
            removed = stats.removed,
            "comparison materialized"
        );
        stats
    }

    pub fn toggle(&mut self, id: SegmentId) -> bool {
        self.store.toggle(id)
    }

    /// Toggle only if `generation` still names the current comparison.
    pub fn toggle_in(&mut self, generation: u64, id: SegmentId) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, id, "ignoring stale toggle");
            return false;
        }
        self.store.toggle(id)
    }

    pub fn set(&mut self, id: SegmentId, accepted: bool) -> bool {
        self.store.set(id, accepted)
    }

    pub fn select(&mut self, policy: InitialSelection) {
        self.store.select(policy);
    }

    pub fn snapshot(&self) -> Vec<SegmentState> {
        self.store.snapshot()
    }

    pub fn merged(&self) -> String {
        merge(self.store.segments(), self.store.acceptance(), self.config.mode)
    }

    /// Merged output split for display. Text comparisons drop a trailing
    /// blank line; code lines are returned as merged.
    pub fn merged_lines(&self) -> Vec<String> {
        let merged = self.merged();
        let lines: Vec<&str> = match self.config.mode {
            Mode::Code => merged.split('\n').collect(),
            Mode::Text => display_lines(&merged),
        };
        lines.into_iter().map(str::to_string).collect()
    }

    /// Dual-pane line numbering. Only code comparisons have lines.
    pub fn rows(&self) -> Option<Vec<Row>> {
        match self.config.mode {
            Mode::Code => Some(rows_for_segments(self.store.segments())),
            Mode::Text => None,
        }
    }

    pub fn stats(&self) -> DiffStats {
        DiffStats::from_states(&self.store.snapshot())
    }
}

impl std::fmt::Debug for MergeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeSession")
            .field("config", &self.config)
            .field("generation", &self.generation)
            .field("segments", &self.store.len())
            .finish()
    }
}
