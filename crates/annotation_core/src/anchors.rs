//! crates/annotation_core/src/anchors.rs
//!
//! Anchors are stored as two independent records: a highlight (geometry and
//! quote, keyed by the internal paper id) and a context (kind, author, parent,
//! keyed by the external paper id) whose `location` holds the highlight id.
//! They are joined here at read time. The backend does not guarantee the join
//! holds, so a context without its highlight is dropped from every listing.

use crate::backend::{with_session, Backend};
use crate::domain::{Anchor, AnchorKind, Context, ExternalPaperId, Highlight, Session};
use crate::envelope;
use crate::ports::{PortError, PortResult};
use crate::records::{ContextRecord, HighlightRecord};
use crate::reference;
use crate::resolver::PaperIndex;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

const CREATE_HIGHLIGHT: &str = "/PdfHighlighter/createHighlight";
const LIST_HIGHLIGHTS: &str = "/PdfHighlighter/_listByPaper";
const CREATE_CONTEXT: &str = "/HighlightedContext/create";
const FILTERED_CONTEXTS: &str = "/HighlightedContext/_getFilteredContexts";

/// Everything needed to attach a new anchor to a paper.
#[derive(Debug, Clone)]
pub struct NewAnchor {
    pub paper: ExternalPaperId,
    pub kind: AnchorKind,
    /// Encoded geometry, `p=<page>;rects=...`.
    pub reference: String,
    pub snippet: String,
    pub color: Option<String>,
    pub parent_context: Option<String>,
}

#[derive(Clone)]
pub struct AnchorService {
    backend: Backend,
    papers: PaperIndex,
}

impl AnchorService {
    pub fn new(backend: Backend, papers: PaperIndex) -> Self {
        Self { backend, papers }
    }

    /// Creates the highlight, then the context pointing at it, and returns the
    /// context id as the anchor id.
    ///
    /// The two writes are not transactional. If the context write fails the
    /// highlight stays behind unreferenced; nothing is rolled back.
    pub async fn create(&self, anchor: &NewAnchor, session: &Session) -> PortResult<String> {
        let internal = self.papers.ensure(&anchor.paper, None).await?;
        let geometry = reference::decode(&anchor.reference);

        let mut highlight = json!({
            "paper": internal,
            "page": geometry.page,
            "rects": geometry.rects,
            "quote": anchor.snippet,
        });
        if let Some(color) = &anchor.color {
            highlight["color"] = json!(color);
        }
        let raw = self
            .backend
            .call(CREATE_HIGHLIGHT, with_session(highlight, Some(session)))
            .await?;
        let highlight_id = envelope::keyed::<String>(CREATE_HIGHLIGHT, raw, "highlightId")?
            .ok_or_else(|| {
                PortError::HighlightCreationFailed(format!("no highlight id for paper {}", anchor.paper))
            })?;

        let mut context = json!({
            "paperId": anchor.paper,
            "location": highlight_id,
            "kind": anchor.kind,
        });
        if let Some(parent) = &anchor.parent_context {
            context["parentContext"] = json!(parent);
        }
        if let Some(color) = &anchor.color {
            context["color"] = json!(color);
        }
        let raw = self
            .backend
            .call(CREATE_CONTEXT, with_session(context, Some(session)))
            .await?;
        let context_id = envelope::keyed::<String>(CREATE_CONTEXT, raw, "newContext")?
            .ok_or_else(|| {
                PortError::ContextCreationFailed(format!(
                    "no context id for highlight {}",
                    highlight_id
                ))
            })?;

        info!(
            paper = %anchor.paper,
            highlight = %highlight_id,
            anchor = %context_id,
            "Created anchor"
        );
        Ok(context_id)
    }

    /// Lists every anchor of a paper in the order the backend returned the contexts.
    pub async fn list_by_paper(&self, paper: &ExternalPaperId) -> PortResult<Vec<Anchor>> {
        let internal = self.papers.ensure(paper, None).await?;

        let contexts = self.contexts_for(paper).await?;
        if contexts.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self
            .backend
            .call(LIST_HIGHLIGHTS, json!({ "paper": internal }))
            .await?;
        let records: Vec<HighlightRecord> =
            envelope::fan_out_collection_lenient(LIST_HIGHLIGHTS, raw, "highlights")?;
        let highlights = records.into_iter().map(HighlightRecord::to_domain).collect();

        Ok(reconcile(contexts, highlights))
    }

    /// Context records of a paper. Records that cannot be decoded are skipped.
    pub async fn contexts_for(&self, paper: &ExternalPaperId) -> PortResult<Vec<Context>> {
        let raw = self
            .backend
            .call(FILTERED_CONTEXTS, json!({ "paperIds": [paper] }))
            .await?;
        let records: Vec<ContextRecord> =
            envelope::fan_out_collection_lenient(FILTERED_CONTEXTS, raw, "filteredContexts")?;
        Ok(records.into_iter().map(ContextRecord::to_domain).collect())
    }
}

/// Joins contexts to highlights on `context.location == highlight.id`.
///
/// Contexts whose highlight is missing are skipped. Output order follows `contexts`.
pub fn reconcile(contexts: Vec<Context>, highlights: Vec<Highlight>) -> Vec<Anchor> {
    let by_id: HashMap<String, Highlight> = highlights
        .into_iter()
        .map(|h| (h.id.clone(), h))
        .collect();

    contexts
        .into_iter()
        .filter_map(|context| {
            let Some(highlight) = by_id.get(&context.location) else {
                debug!(
                    context = %context.id,
                    location = %context.location,
                    "Dropping context without a matching highlight"
                );
                return None;
            };
            Some(Anchor {
                id: context.id,
                kind: context.kind.unwrap_or_default(),
                reference: reference::encode(highlight.page, &highlight.rects),
                snippet: highlight.quote.clone().unwrap_or_default(),
                color: context.color.or_else(|| highlight.color.clone()),
                parent_context: context.parent_context,
            })
        })
        .collect()
}
