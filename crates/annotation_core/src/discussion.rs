//! crates/annotation_core/src/discussion.rs
//!
//! Threads and replies grouped under a per-paper publication.
//!
//! Public and group-private threads are different backend entities created
//! through different operations. Deletion is always soft: listings include
//! deleted items by default so callers can render placeholders.

use crate::access::AccessControl;
use crate::backend::{with_session, Backend};
use crate::domain::{ExternalPaperId, Reply, ReplyNode, Session, Thread};
use crate::envelope;
use crate::ports::{PortError, PortResult};
use crate::records::{ReplyNodeRecord, ReplyRecord, ThreadRecord};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

const OPEN: &str = "/DiscussionPub/open";
const PUB_ID_BY_PAPER: &str = "/DiscussionPub/_getPubIdByPaper";
const START_THREAD: &str = "/DiscussionPub/startThread";
const START_PRIVATE_THREAD: &str = "/DiscussionPub/startPrivateThread";
const REPLY: &str = "/DiscussionPub/reply";
const REPLY_TO: &str = "/DiscussionPub/replyTo";
const LIST_THREADS: &str = "/DiscussionPub/_listThreads";
const LIST_REPLIES: &str = "/DiscussionPub/_listReplies";
const LIST_REPLIES_TREE: &str = "/DiscussionPub/_listRepliesTree";
const DELETE_THREAD: &str = "/DiscussionPub/deleteThread";
const DELETE_REPLY: &str = "/DiscussionPub/deleteReply";

//=========================================================================================
// Requests
//=========================================================================================

#[derive(Debug, Clone)]
pub struct NewThread {
    pub pub_id: String,
    pub author: String,
    pub title: Option<String>,
    pub body: String,
    pub anchor_id: Option<String>,
    /// Present for a group-private thread.
    pub group_id: Option<String>,
}

/// Which group scopes a thread listing keeps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupFilter {
    /// Everything the backend returned.
    #[default]
    All,
    /// Threads without a group.
    Public,
    /// Threads of one group.
    Group(String),
    /// Only threads of groups the session user is a member of.
    Joined,
    /// Public threads plus those of `Joined`.
    Visible,
}

#[derive(Debug, Clone)]
pub struct ThreadQuery {
    pub pub_id: String,
    pub anchor_id: Option<String>,
    pub include_deleted: bool,
    pub group: GroupFilter,
}

impl ThreadQuery {
    pub fn new(pub_id: impl Into<String>) -> Self {
        Self {
            pub_id: pub_id.into(),
            anchor_id: None,
            include_deleted: true,
            group: GroupFilter::All,
        }
    }

    pub fn anchor(mut self, anchor_id: impl Into<String>) -> Self {
        self.anchor_id = Some(anchor_id.into());
        self
    }

    pub fn include_deleted(mut self, include: bool) -> Self {
        self.include_deleted = include;
        self
    }

    pub fn group(mut self, group: GroupFilter) -> Self {
        self.group = group;
        self
    }
}

//=========================================================================================
// Service
//=========================================================================================

#[derive(Clone)]
pub struct DiscussionService {
    backend: Backend,
    access: AccessControl,
}

impl DiscussionService {
    pub fn new(backend: Backend, access: AccessControl) -> Self {
        Self { backend, access }
    }

    /// Opens the publication handle threads of `paper` are grouped under.
    ///
    /// Whether opening twice reuses the handle is up to the backend; use
    /// `ensure_publication` when that matters.
    pub async fn open_publication(
        &self,
        paper: &ExternalPaperId,
        session: Option<&Session>,
    ) -> PortResult<String> {
        let raw = self
            .backend
            .call(OPEN, with_session(json!({ "paperId": paper }), session))
            .await?;
        envelope::direct::<String>(OPEN, raw)?
            .ok_or_else(|| PortError::MissingId(format!("publication of paper {}", paper)))
    }

    pub async fn publication_for(&self, paper: &ExternalPaperId) -> PortResult<Option<String>> {
        let raw = self
            .backend
            .call(PUB_ID_BY_PAPER, json!({ "paperId": paper }))
            .await?;
        envelope::first(PUB_ID_BY_PAPER, raw, "result")
    }

    /// Returns the existing publication of `paper`, opening one only when there is none.
    pub async fn ensure_publication(
        &self,
        paper: &ExternalPaperId,
        session: Option<&Session>,
    ) -> PortResult<String> {
        match self.publication_for(paper).await? {
            Some(pub_id) => Ok(pub_id),
            None => self.open_publication(paper, session).await,
        }
    }

    /// Starts a thread, routing group threads to the private-thread operation.
    ///
    /// `anchorId` is always sent, as an empty string when the thread is not anchored.
    pub async fn start_thread(&self, thread: &NewThread, session: Option<&Session>) -> PortResult<String> {
        let mut body = json!({
            "pubId": thread.pub_id,
            "author": thread.author,
            "body": thread.body,
            "anchorId": thread.anchor_id.as_deref().unwrap_or(""),
        });
        if let Some(title) = &thread.title {
            body["title"] = json!(title);
        }
        let path = match &thread.group_id {
            Some(group_id) => {
                body["groupId"] = json!(group_id);
                START_PRIVATE_THREAD
            }
            None => START_THREAD,
        };

        let raw = self.backend.call(path, with_session(body, session)).await?;
        let thread_id = envelope::direct::<String>(path, raw)?
            .ok_or_else(|| PortError::MissingId(format!("thread in publication {}", thread.pub_id)))?;
        info!(
            thread = %thread_id,
            publication = %thread.pub_id,
            private = thread.group_id.is_some(),
            "Started thread"
        );
        Ok(thread_id)
    }

    /// Replies at the root of a thread, optionally pointing at an anchor.
    ///
    /// `anchorId` is always sent, as an empty string when absent.
    pub async fn reply(
        &self,
        thread_id: &str,
        author: &str,
        body: &str,
        anchor_id: Option<&str>,
        session: Option<&Session>,
    ) -> PortResult<String> {
        let payload = reply_payload(thread_id, author, body, anchor_id);
        let raw = self.backend.call(REPLY, with_session(payload, session)).await?;
        envelope::direct::<String>(REPLY, raw)?
            .ok_or_else(|| PortError::MissingId(format!("reply in thread {}", thread_id)))
    }

    /// Replies under `parent_id`, or at the root when it is `None`.
    pub async fn reply_to(
        &self,
        thread_id: &str,
        author: &str,
        body: &str,
        parent_id: Option<&str>,
        anchor_id: Option<&str>,
        session: Option<&Session>,
    ) -> PortResult<String> {
        let mut payload = reply_payload(thread_id, author, body, anchor_id);
        if let Some(parent_id) = parent_id {
            payload["parentId"] = json!(parent_id);
        }
        let raw = self.backend.call(REPLY_TO, with_session(payload, session)).await?;
        envelope::direct::<String>(REPLY_TO, raw)?
            .ok_or_else(|| PortError::MissingId(format!("reply in thread {}", thread_id)))
    }

    pub async fn list_threads(&self, query: &ThreadQuery, session: Option<&Session>) -> PortResult<Vec<Thread>> {
        let mut body = json!({ "pubId": query.pub_id });
        if let Some(anchor_id) = &query.anchor_id {
            body["anchorId"] = json!(anchor_id);
        }
        let raw = self
            .backend
            .call(LIST_THREADS, with_session(body, session))
            .await?;
        let threads: Vec<Thread> = envelope::fan_out_collection::<ThreadRecord>(LIST_THREADS, raw, "threads")?
            .into_iter()
            .map(ThreadRecord::to_domain)
            .filter(|t| query.include_deleted || !t.deleted)
            .collect();

        let joined: Option<HashSet<String>> = match (&query.group, session) {
            (GroupFilter::Joined | GroupFilter::Visible, Some(session)) => Some(
                self.access
                    .memberships(session)
                    .await?
                    .into_iter()
                    .map(|m| m.group_id)
                    .collect(),
            ),
            (GroupFilter::Joined | GroupFilter::Visible, None) => Some(HashSet::new()),
            _ => None,
        };

        Ok(threads
            .into_iter()
            .filter(|t| match (&query.group, t.group_id.as_deref()) {
                (GroupFilter::All, _) => true,
                (GroupFilter::Public, group) => group.is_none(),
                (GroupFilter::Group(wanted), group) => group == Some(wanted.as_str()),
                (GroupFilter::Joined, None) => false,
                (GroupFilter::Visible, None) => true,
                (GroupFilter::Joined | GroupFilter::Visible, Some(group)) => {
                    joined.as_ref().is_some_and(|ids| ids.contains(group))
                }
            })
            .collect())
    }

    /// Flat reply listing, in backend order.
    pub async fn list_replies(&self, thread_id: &str, include_deleted: bool) -> PortResult<Vec<Reply>> {
        let raw = self
            .backend
            .call(LIST_REPLIES, json!({ "threadId": thread_id }))
            .await?;
        Ok(envelope::fan_out_collection::<ReplyRecord>(LIST_REPLIES, raw, "replies")?
            .into_iter()
            .map(ReplyRecord::to_domain)
            .filter(|r| include_deleted || !r.deleted)
            .collect())
    }

    /// Server-assembled reply tree.
    ///
    /// When the assembled tree cannot be read (a body too deep to decode, an
    /// unexpected shape) the tree is rebuilt locally from the flat listing.
    /// Excluding deleted replies hoists their children into the deleted reply's place.
    pub async fn list_replies_tree(&self, thread_id: &str, include_deleted: bool) -> PortResult<Vec<ReplyNode>> {
        let tree = match self.server_tree(thread_id).await {
            Ok(tree) => tree,
            Err(e @ (PortError::RemoteCallFailed(_) | PortError::UnexpectedShape { .. })) => {
                warn!(thread = %thread_id, error = %e, "Reply tree unavailable, assembling it locally");
                reply_forest(self.list_replies(thread_id, true).await?)
            }
            Err(e) => return Err(e),
        };
        Ok(if include_deleted { tree } else { without_deleted(tree) })
    }

    async fn server_tree(&self, thread_id: &str) -> PortResult<Vec<ReplyNode>> {
        let raw = self
            .backend
            .call(LIST_REPLIES_TREE, json!({ "threadId": thread_id }))
            .await?;
        let records: Vec<ReplyNodeRecord> =
            envelope::fan_out_collection(LIST_REPLIES_TREE, raw, "replies")?;
        Ok(records.into_iter().map(ReplyNodeRecord::to_domain).collect())
    }

    pub async fn delete_thread(&self, thread_id: &str, session: Option<&Session>) -> PortResult<()> {
        self.backend
            .call(DELETE_THREAD, with_session(json!({ "threadId": thread_id }), session))
            .await?;
        info!(thread = %thread_id, "Soft-deleted thread");
        Ok(())
    }

    pub async fn delete_reply(&self, reply_id: &str, session: Option<&Session>) -> PortResult<()> {
        self.backend
            .call(DELETE_REPLY, with_session(json!({ "replyId": reply_id }), session))
            .await?;
        info!(reply = %reply_id, "Soft-deleted reply");
        Ok(())
    }
}

//=========================================================================================
// Tree helpers
//=========================================================================================

fn reply_payload(thread_id: &str, author: &str, body: &str, anchor_id: Option<&str>) -> Value {
    json!({
        "threadId": thread_id,
        "author": author,
        "body": body,
        "anchorId": anchor_id.unwrap_or(""),
    })
}

/// A node being assembled: children still to visit, children already built.
struct Frame<T> {
    reply: Reply,
    pending: std::vec::IntoIter<T>,
    built: Vec<ReplyNode>,
}

impl<T> Frame<T> {
    fn new(reply: Reply, children: Vec<T>) -> Self {
        Self {
            reply,
            pending: children.into_iter(),
            built: Vec::new(),
        }
    }
}

/// Builds a reply forest from a flat listing, keeping input order among siblings.
///
/// Replies whose parent is not in the listing become roots. Assembly uses an
/// explicit stack, so reply chains of any length are fine.
pub fn reply_forest(replies: Vec<Reply>) -> Vec<ReplyNode> {
    let ids: HashSet<String> = replies.iter().map(|r| r.id.clone()).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<String, Vec<Reply>> = HashMap::new();
    for reply in replies {
        match reply.parent_id.clone().filter(|p| ids.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(reply),
            None => roots.push(reply),
        }
    }

    let mut open = |reply: Reply| {
        let direct = children.remove(&reply.id).unwrap_or_default();
        Frame::new(reply, direct)
    };
    let mut forest = Vec::with_capacity(roots.len());
    let mut stack: Vec<Frame<Reply>> = Vec::new();
    for root in roots {
        stack.push(open(root));
        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending.next() {
                let next = open(child);
                stack.push(next);
            } else if let Some(done) = stack.pop() {
                let node = ReplyNode {
                    reply: done.reply,
                    children: done.built,
                };
                match stack.last_mut() {
                    Some(parent) => parent.built.push(node),
                    None => forest.push(node),
                }
            }
        }
    }
    forest
}

/// Drops deleted nodes, moving their surviving children into their place.
fn without_deleted(nodes: Vec<ReplyNode>) -> Vec<ReplyNode> {
    let mut kept = Vec::with_capacity(nodes.len());
    let mut stack: Vec<Frame<ReplyNode>> = Vec::new();
    for node in nodes {
        stack.push(Frame::new(node.reply, node.children));
        while let Some(frame) = stack.last_mut() {
            if let Some(child) = frame.pending.next() {
                stack.push(Frame::new(child.reply, child.children));
            } else if let Some(done) = stack.pop() {
                let out = match stack.last_mut() {
                    Some(parent) => &mut parent.built,
                    None => &mut kept,
                };
                if done.reply.deleted {
                    out.extend(done.built);
                } else {
                    out.push(ReplyNode {
                        reply: done.reply,
                        children: done.built,
                    });
                }
            }
        }
    }
    kept
}
