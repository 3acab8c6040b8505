//! services/annotator/src/cli.rs
//!
//! Command-line surface of the annotator. Every command prints its result as
//! JSON on stdout; logs go to stderr.

use crate::config::{Config, ConfigError};
use crate::error::AppError;
use annotation_core::{
    AnchorKind, AnnotationClient, ExternalPaperId, GroupFilter, NewAnchor, NewThread, Session,
    ThreadQuery,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Debug, Parser)]
#[command(name = "annotator")]
#[command(about = "Anchored annotations and discussions on research papers", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve a DOI or arXiv id to the backend's internal paper id
    Ensure {
        paper: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Highlights joined with their contexts
    #[command(subcommand)]
    Anchors(AnchorsCommand),
    /// Discussion threads of a publication
    #[command(subcommand)]
    Threads(ThreadsCommand),
    /// Replies of a thread
    #[command(subcommand)]
    Replies(RepliesCommand),
    /// Groups, memberships and invitations of the logged-in user
    #[command(subcommand)]
    Groups(GroupsCommand),
}

#[derive(Debug, Subcommand)]
pub enum AnchorsCommand {
    List {
        paper: String,
    },
    Create {
        paper: String,
        /// Encoded geometry, e.g. `p=3;rects=0.1,0.2,0.3,0.4`
        #[arg(long)]
        reference: String,
        #[arg(long, default_value = "")]
        snippet: String,
        #[arg(long, default_value = "Lines")]
        kind: AnchorKind,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        parent_context: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ThreadsCommand {
    List {
        pub_id: String,
        /// Only threads attached to this anchor; pass "" for unanchored threads
        #[arg(long)]
        anchor: Option<String>,
        /// `all`, `public`, `joined`, `visible` or a group id
        #[arg(long, default_value = "all", value_parser = parse_group_filter)]
        group: GroupFilter,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
    Start {
        pub_id: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        anchor: Option<String>,
        /// Makes the thread private to this group
        #[arg(long)]
        group: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum RepliesCommand {
    List {
        thread: String,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
    Tree {
        thread: String,
        #[command(flatten)]
        deleted: DeletedArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum GroupsCommand {
    Refresh,
}

#[derive(Debug, Args)]
pub struct DeletedArgs {
    /// Leave out soft-deleted items
    #[arg(long)]
    pub live_only: bool,
}

fn parse_group_filter(raw: &str) -> Result<GroupFilter, String> {
    match raw {
        "" => Err("group filter must not be empty".to_string()),
        "all" => Ok(GroupFilter::All),
        "public" => Ok(GroupFilter::Public),
        "joined" => Ok(GroupFilter::Joined),
        "visible" => Ok(GroupFilter::Visible),
        id => Ok(GroupFilter::Group(id.to_string())),
    }
}

fn require_session(config: &Config) -> Result<&Session, AppError> {
    config
        .session
        .as_ref()
        .ok_or_else(|| ConfigError::MissingVar("ANNOTATOR_SESSION".to_string()).into())
}

/// Executes one command and returns what should be printed.
pub async fn run(command: Command, client: &AnnotationClient, config: &Config) -> Result<Value, AppError> {
    let session = config.session.as_ref();
    let output = match command {
        Command::Ensure { paper, title } => {
            let external = ExternalPaperId::new(paper);
            let internal = client.papers.ensure(&external, title.as_deref()).await?;
            json!({ "paper": external, "internalId": internal })
        }
        Command::Anchors(AnchorsCommand::List { paper }) => {
            let anchors = client.anchors.list_by_paper(&ExternalPaperId::new(paper)).await?;
            serde_json::to_value(anchors)?
        }
        Command::Anchors(AnchorsCommand::Create {
            paper,
            reference,
            snippet,
            kind,
            color,
            parent_context,
        }) => {
            let anchor = NewAnchor {
                paper: ExternalPaperId::new(paper),
                kind,
                reference,
                snippet,
                color,
                parent_context,
            };
            let id = client.anchors.create(&anchor, require_session(config)?).await?;
            json!({ "anchorId": id })
        }
        Command::Threads(ThreadsCommand::List {
            pub_id,
            anchor,
            group,
            deleted,
        }) => {
            let mut query = ThreadQuery::new(pub_id)
                .include_deleted(!deleted.live_only)
                .group(group);
            if let Some(anchor) = anchor {
                query = query.anchor(anchor);
            }
            serde_json::to_value(client.discussions.list_threads(&query, session).await?)?
        }
        Command::Threads(ThreadsCommand::Start {
            pub_id,
            body,
            title,
            anchor,
            group,
        }) => {
            let session = require_session(config)?;
            let thread = NewThread {
                pub_id,
                author: session.user.clone(),
                title,
                body,
                anchor_id: anchor,
                group_id: group,
            };
            let id = client.discussions.start_thread(&thread, Some(session)).await?;
            json!({ "threadId": id })
        }
        Command::Replies(RepliesCommand::List { thread, deleted }) => {
            serde_json::to_value(client.discussions.list_replies(&thread, !deleted.live_only).await?)?
        }
        Command::Replies(RepliesCommand::Tree { thread, deleted }) => serde_json::to_value(
            client
                .discussions
                .list_replies_tree(&thread, !deleted.live_only)
                .await?,
        )?,
        Command::Groups(GroupsCommand::Refresh) => {
            serde_json::to_value(client.access.refresh(require_session(config)?).await?)?
        }
    };
    Ok(output)
}
