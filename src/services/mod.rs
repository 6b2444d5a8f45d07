//! Business logic services.
//!
//! Services orchestrate the entry store and external collaborators and
//! provide the tiering and consolidation operations.

mod analysis;
mod bulk;
mod categories;
mod consolidation;
mod identity_merge;
mod provenance;
mod refresh;
mod tier_resolver;

pub use analysis::{
    AnalysisOutcome, AnalysisReport, AnalysisService, DEFAULT_PREVIEW_CHARS, LibraryAnalyzer,
    merge_recommendations, truncate_chars,
};
pub use bulk::{BulkFailure, BulkOperation, BulkOutcome, BulkRunner};
pub use categories::CategoryService;
pub use consolidation::{ConsolidationOrchestrator, LibraryState, MergeReport, PreparedMerge};
pub use identity_merge::{dedupe_by_key, merge_by_key};
pub use provenance::{
    DEFAULT_SEPARATOR, DraftStatus, MergeDraft, MergeSource, NoopSummarizer, ProvenanceMerger,
    Summarizer, SummaryOutcome, select_merge_target,
};
pub use refresh::SourceRefresher;
pub use tier_resolver::{BudgetedTiers, TierResolver};

use crate::models::{ActingUser, EventMeta};
use crate::observability::{current_context, current_correlation_id};

/// Event metadata for a mutation by `actor`, tagged with the active
/// correlation id.
pub(crate) fn event_meta(source: &'static str, actor: &ActingUser) -> EventMeta {
    let actor_label = actor
        .label()
        .or_else(|| current_context().and_then(|ctx| ctx.actor().map(str::to_string)));
    EventMeta::new(source, current_correlation_id()).with_actor(actor_label)
}
