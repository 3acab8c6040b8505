//! crates/annotation_core/src/client.rs
//!
//! Bundles every service over one shared transport.

use crate::access::AccessControl;
use crate::accounts::Accounts;
use crate::anchors::AnchorService;
use crate::backend::Backend;
use crate::discussion::DiscussionService;
use crate::ports::Transport;
use crate::resolver::PaperIndex;
use std::sync::Arc;

#[derive(Clone)]
pub struct AnnotationClient {
    pub papers: PaperIndex,
    pub anchors: AnchorService,
    pub discussions: DiscussionService,
    pub access: AccessControl,
    pub accounts: Accounts,
}

impl AnnotationClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let backend = Backend::new(transport);
        let papers = PaperIndex::new(backend.clone());
        let access = AccessControl::new(backend.clone());
        Self {
            anchors: AnchorService::new(backend.clone(), papers.clone()),
            discussions: DiscussionService::new(backend.clone(), access.clone()),
            accounts: Accounts::new(backend),
            papers,
            access,
        }
    }
}
