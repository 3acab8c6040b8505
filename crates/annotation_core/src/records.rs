//! crates/annotation_core/src/records.rs
//!
//! "Impure" wire records as the backend emits them (`_id` keys, camelCase,
//! epoch-millisecond timestamps). Each converts into its domain counterpart.

use crate::domain::{
    AnchorKind, Context, ExternalPaperId, Group, Highlight, Identity, InternalPaperId,
    Invitation, Membership, Paper, Rect, Reply, ReplyNode, Thread,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaperRecord {
    #[serde(rename = "_id")]
    id: String,
    paper_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    created_at: Option<DateTime<Utc>>,
}
impl PaperRecord {
    pub(crate) fn to_domain(self) -> Paper {
        Paper {
            internal_id: InternalPaperId::new(self.id),
            external_id: ExternalPaperId::new(self.paper_id),
            title: self.title,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct HighlightRecord {
    #[serde(rename = "_id")]
    id: String,
    paper: String,
    page: u32,
    #[serde(default)]
    rects: Vec<Rect>,
    #[serde(default)]
    quote: Option<String>,
    #[serde(default)]
    color: Option<String>,
}
impl HighlightRecord {
    pub(crate) fn to_domain(self) -> Highlight {
        Highlight {
            id: self.id,
            paper: InternalPaperId::new(self.paper),
            page: self.page,
            rects: self.rects,
            quote: self.quote,
            color: self.color,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContextRecord {
    #[serde(rename = "_id")]
    id: String,
    paper_id: String,
    author: String,
    location: String,
    #[serde(default, deserialize_with = "lenient_kind")]
    kind: Option<AnchorKind>,
    #[serde(default)]
    parent_context: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}
impl ContextRecord {
    pub(crate) fn to_domain(self) -> Context {
        Context {
            id: self.id,
            paper_id: ExternalPaperId::new(self.paper_id),
            author: self.author,
            location: self.location,
            kind: self.kind,
            parent_context: self.parent_context,
            color: self.color,
            created_at: self.created_at,
        }
    }
}

/// Any casing of a known kind; anything else is treated as unset.
fn lenient_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<AnchorKind>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|kind| kind.to_ascii_lowercase().parse().ok()))
}

/// Empty anchor ids are how the backend stores "no anchor".
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThreadRecord {
    #[serde(rename = "_id")]
    id: String,
    author: String,
    #[serde(default)]
    title: Option<String>,
    body: String,
    #[serde(default)]
    anchor_id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    deleted: bool,
}
impl ThreadRecord {
    pub(crate) fn to_domain(self) -> Thread {
        Thread {
            id: self.id,
            author: self.author,
            title: self.title,
            body: self.body,
            anchor_id: non_empty(self.anchor_id),
            group_id: non_empty(self.group_id),
            created_at: self.created_at,
            edited_at: self.edited_at,
            deleted: self.deleted,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReplyRecord {
    #[serde(rename = "_id")]
    id: String,
    author: String,
    body: String,
    #[serde(default)]
    anchor_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    deleted: bool,
}
impl ReplyRecord {
    pub(crate) fn to_domain(self) -> Reply {
        Reply {
            id: self.id,
            author: self.author,
            body: self.body,
            anchor_id: non_empty(self.anchor_id),
            parent_id: non_empty(self.parent_id),
            created_at: self.created_at,
            edited_at: self.edited_at,
            deleted: self.deleted,
        }
    }
}

/// Server-assembled reply tree node: the reply's own fields plus `children`.
#[derive(Deserialize)]
pub(crate) struct ReplyNodeRecord {
    #[serde(flatten)]
    reply: ReplyRecord,
    #[serde(default)]
    children: Vec<ReplyNodeRecord>,
}
impl ReplyNodeRecord {
    pub(crate) fn to_domain(self) -> ReplyNode {
        ReplyNode {
            reply: self.reply.to_domain(),
            children: self
                .children
                .into_iter()
                .map(ReplyNodeRecord::to_domain)
                .collect(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct GroupRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    admin: String,
}
impl GroupRecord {
    pub(crate) fn to_domain(self) -> Group {
        Group {
            id: self.id,
            name: self.name,
            description: self.description,
            admin: self.admin,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MembershipRecord {
    #[serde(rename = "_id")]
    id: String,
    group_id: String,
    user: String,
    #[serde(default)]
    is_admin: bool,
}
impl MembershipRecord {
    pub(crate) fn to_domain(self) -> Membership {
        Membership {
            id: self.id,
            group_id: self.group_id,
            user: self.user,
            is_admin: self.is_admin,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InvitationRecord {
    #[serde(rename = "_id")]
    id: String,
    group_id: String,
    inviter: String,
    invitee: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}
impl InvitationRecord {
    pub(crate) fn to_domain(self) -> Invitation {
        Invitation {
            id: self.id,
            group_id: self.group_id,
            inviter: self.inviter,
            invitee: self.invitee,
            message: self.message,
            created_at: self.created_at,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct IdentityRecord {
    #[serde(default)]
    orcid: Option<String>,
    #[serde(default)]
    affiliation: Option<String>,
    #[serde(default)]
    badges: Vec<String>,
}
impl IdentityRecord {
    pub(crate) fn to_domain(self) -> Identity {
        Identity {
            orcid: self.orcid,
            affiliation: self.affiliation,
            badges: self.badges,
        }
    }
}
