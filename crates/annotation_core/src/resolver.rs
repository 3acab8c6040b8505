//! crates/annotation_core/src/resolver.rs
//!
//! Maps external paper ids to the backend's internal ids.
//!
//! Highlight operations are keyed by `InternalPaperId`, context operations by
//! `ExternalPaperId`. Mixing them produces orphaned records on the storage
//! side, which is why the two ids are separate types.

use crate::backend::Backend;
use crate::domain::{ExternalPaperId, InternalPaperId, Paper, PaperHit};
use crate::envelope;
use crate::ports::{PortError, PortResult};
use crate::records::PaperRecord;
use serde_json::{json, Map, Value};
use tracing::debug;

const ENSURE: &str = "/PaperIndex/ensure";
const UPDATE_META: &str = "/PaperIndex/updateMeta";
const GET_BY_PAPER_ID: &str = "/PaperIndex/_getByPaperId";
const LIST_RECENT: &str = "/PaperIndex/_listRecent";
const SEARCH_ARXIV: &str = "/PaperIndex/_searchArxiv";

#[derive(Clone)]
pub struct PaperIndex {
    backend: Backend,
}

impl PaperIndex {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Returns the internal id for `external`, creating the paper on first reference.
    ///
    /// Idempotent: the backend looks the paper up before creating it, so repeated
    /// calls with the same external id yield the same internal id.
    pub async fn ensure(
        &self,
        external: &ExternalPaperId,
        title: Option<&str>,
    ) -> PortResult<InternalPaperId> {
        let mut body = Map::new();
        body.insert("id".to_string(), json!(external));
        if let Some(title) = title {
            body.insert("title".to_string(), json!(title));
        }
        let raw = self.backend.call(ENSURE, Value::Object(body)).await?;
        let internal = envelope::direct::<InternalPaperId>(ENSURE, raw)?
            .ok_or_else(|| PortError::MissingId(format!("paper {}", external)))?;
        debug!(external = %external, internal = %internal, "Resolved paper id");
        Ok(internal)
    }

    /// Looks a paper up by external id without creating it.
    pub async fn lookup(&self, external: &ExternalPaperId) -> PortResult<Option<Paper>> {
        let raw = self
            .backend
            .call(GET_BY_PAPER_ID, json!({ "paperId": external }))
            .await?;
        let record = envelope::first::<PaperRecord>(GET_BY_PAPER_ID, raw, "paper")?;
        Ok(record.map(PaperRecord::to_domain))
    }

    pub async fn update_meta(&self, external: &ExternalPaperId, title: Option<&str>) -> PortResult<()> {
        self.backend
            .call(UPDATE_META, json!({ "id": external, "title": title }))
            .await?;
        Ok(())
    }

    /// Most recently indexed papers, newest first as ordered by the backend.
    pub async fn list_recent(&self, limit: Option<u32>) -> PortResult<Vec<Paper>> {
        let body = match limit {
            Some(limit) => json!({ "limit": limit }),
            None => json!({}),
        };
        let raw = self.backend.call(LIST_RECENT, body).await?;
        let records = envelope::fan_out_collection::<PaperRecord>(LIST_RECENT, raw, "papers")?;
        Ok(records.into_iter().map(PaperRecord::to_domain).collect())
    }

    pub async fn search_arxiv(&self, query: &str) -> PortResult<Vec<PaperHit>> {
        let raw = self.backend.call(SEARCH_ARXIV, json!({ "q": query })).await?;
        Ok(envelope::first::<Vec<PaperHit>>(SEARCH_ARXIV, raw, "result")?.unwrap_or_default())
    }
}
