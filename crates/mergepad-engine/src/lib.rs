//! # mergepad-engine
//!
//! Two-way comparison with per-segment accept/reject. Given an original and a
//! modified version of some content, the engine computes a difference, exposes
//! it as an ordered list of independently toggleable segments, and rebuilds a
//! merged output from whichever segments are currently accepted.
//!
//! ## Pipeline
//!
//! 1. **Normalize**: canonicalize both inputs ([`normalize`]).
//! 2. **Diff**: hand them to a [`Differ`] (by default `similar`) and receive
//!    tagged spans.
//! 3. **Materialize**: split spans into segments, one per line in code mode
//!    or one per span in text mode ([`materialize`]).
//! 4. **Select**: seed and toggle acceptance ([`SelectionStore`]).
//! 5. **Reduce**: fold accepted segments into the merged output
//!    ([`reduce::merge`]), and number lines per side for a dual-pane view
//!    ([`reconcile`]).
//!
//! ## Example
//!
//! ```rust
//! use mergepad_engine::{EngineConfig, MergeSession, Mode};
//!
//! let mut session = MergeSession::new(EngineConfig::new(Mode::Code));
//! session.compare("a\nb\nc", "a\nx\nc");
//! assert_eq!(session.merged(), "a\nx\nc");
//!
//! // Reject the added line, accept the removed one.
//! session.toggle(2);
//! session.toggle(1);
//! assert_eq!(session.merged(), "a\nb\nc");
//! ```

pub mod adapter;
pub mod materialize;
pub mod normalize;
pub mod reconcile;
pub mod reduce;
pub mod selection;
pub mod session;
pub mod types;

pub use adapter::{Differ, SimilarDiffer};
pub use materialize::materialize;
pub use normalize::normalize;
pub use reconcile::Row;
pub use selection::SelectionStore;
pub use session::{EngineConfig, MergeSession};
pub use types::{
    DiffAlgorithm, DiffStats, InitialSelection, Mode, ParseModeError, ParseSelectionError,
    Segment, SegmentId, SegmentKind, SegmentState, Span,
};
