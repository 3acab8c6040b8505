//! crates/annotation_core/src/domain.rs
//!
//! Defines the core data structures for papers, anchors, discussions and groups.
//! Wire records (backend field names, epoch-millisecond timestamps) live in
//! `records.rs`; everything here is the flat model handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Paper Identifiers
//=========================================================================================

/// Backend-assigned paper id. Required by every highlight operation, never shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalPaperId(String);

/// User-facing paper id (DOI, arXiv id, ...). Required by every context operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalPaperId(String);

impl InternalPaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ExternalPaperId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InternalPaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ExternalPaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A paper known to the backend index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paper {
    pub internal_id: InternalPaperId,
    pub external_id: ExternalPaperId,
    pub title: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A search hit from the arXiv lookup; `id` is an external id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperHit {
    pub id: ExternalPaperId,
    #[serde(default)]
    pub title: Option<String>,
}

//=========================================================================================
// Geometry and Anchors
//=========================================================================================

/// A rectangle in fractional page-relative coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }
}

/// Page number plus the highlighted rectangles on that page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub page: u32,
    pub rects: Vec<Rect>,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            page: 1,
            rects: Vec::new(),
        }
    }
}

/// What part of a paper an anchor points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnchorKind {
    Section,
    Figure,
    #[default]
    Lines,
}

impl AnchorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            AnchorKind::Section => "Section",
            AnchorKind::Figure => "Figure",
            AnchorKind::Lines => "Lines",
        }
    }
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnchorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Section" | "section" => Ok(AnchorKind::Section),
            "Figure" | "figure" => Ok(AnchorKind::Figure),
            "Lines" | "lines" => Ok(AnchorKind::Lines),
            other => Err(format!("unknown anchor kind '{}'", other)),
        }
    }
}

/// Stored PDF highlight: geometry and quoted text, owned by a paper.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub id: String,
    pub paper: InternalPaperId,
    pub page: u32,
    pub rects: Vec<Rect>,
    pub quote: Option<String>,
    pub color: Option<String>,
}

/// Stored context record. Points at a highlight through `location`.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub id: String,
    pub paper_id: ExternalPaperId,
    pub author: String,
    pub location: String,
    pub kind: Option<AnchorKind>,
    pub parent_context: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A context joined with its highlight; the unit discussions attach to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anchor {
    pub id: String,
    pub kind: AnchorKind,
    /// Encoded `p=<page>;rects=...` reference of the highlight geometry.
    pub reference: String,
    pub snippet: String,
    pub color: Option<String>,
    pub parent_context: Option<String>,
}

//=========================================================================================
// Discussions
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub id: String,
    pub author: String,
    pub title: Option<String>,
    pub body: String,
    pub anchor_id: Option<String>,
    /// `None` for public threads.
    pub group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub id: String,
    pub author: String,
    pub body: String,
    pub anchor_id: Option<String>,
    /// `None` for replies attached at the thread root.
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
    pub deleted: bool,
}

/// A reply with its nested answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyNode {
    pub reply: Reply,
    pub children: Vec<ReplyNode>,
}

//=========================================================================================
// Groups and Access
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: String,
    pub admin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Membership {
    pub id: String,
    pub group_id: String,
    pub user: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invitation {
    pub id: String,
    pub group_id: String,
    pub inviter: String,
    pub invitee: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything the group screens need for one user, gathered by `AccessControl::refresh`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupOverview {
    pub group_ids: Vec<String>,
    pub groups: std::collections::BTreeMap<String, Group>,
    pub memberships: Vec<Membership>,
    pub invitations: Vec<Invitation>,
}

//=========================================================================================
// Accounts
//=========================================================================================

/// An authenticated login, passed explicitly into every operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: String,
}

impl Session {
    pub fn new(token: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: user.into(),
        }
    }
}

/// Verified identity details attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Identity {
    pub orcid: Option<String>,
    pub affiliation: Option<String>,
    pub badges: Vec<String>,
}
