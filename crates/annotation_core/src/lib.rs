pub mod access;
pub mod accounts;
pub mod anchors;
pub mod backend;
pub mod client;
pub mod discussion;
pub mod domain;
pub mod envelope;
pub mod ports;
pub mod reference;
pub mod resolver;
mod records;

pub use access::AccessControl;
pub use accounts::Accounts;
pub use anchors::{AnchorService, NewAnchor};
pub use client::AnnotationClient;
pub use discussion::{DiscussionService, GroupFilter, NewThread, ThreadQuery};
pub use domain::{
    Anchor, AnchorKind, Context, ExternalPaperId, Geometry, Group, GroupOverview, Highlight,
    Identity, InternalPaperId, Invitation, Membership, Paper, PaperHit, Rect, Reply, ReplyNode,
    Session, Thread,
};
pub use ports::{PortError, PortResult, Transport};
pub use resolver::PaperIndex;
