//! crates/annotation_core/src/access.rs
//!
//! Group, membership and invitation lifecycle. Mostly a pass-through to the
//! backend's `Group` entity; the discussion layer reads memberships from here
//! to decide which group threads a user can see.

use crate::backend::{with_session, Backend};
use crate::domain::{Group, GroupOverview, Invitation, Membership, Session};
use crate::envelope;
use crate::ports::{PortError, PortResult};
use crate::records::{GroupRecord, InvitationRecord, MembershipRecord};
use futures::future::try_join_all;
use serde_json::json;
use std::collections::HashSet;
use tracing::info;

const CREATE_GROUP: &str = "/Group/createGroup";
const REMOVE_GROUP: &str = "/Group/removeGroup";
const GET_GROUP: &str = "/Group/_getGroup";
const GROUPS_FOR_USER: &str = "/Group/_getGroupsForUser";
const MEMBERSHIPS_BY_USER: &str = "/Group/_getMembershipsByUser";
const PENDING_INVITATIONS: &str = "/Group/_listPendingInvitationsByUser";
const INVITE_USER: &str = "/Group/inviteUser";
const ACCEPT_INVITATION: &str = "/Group/acceptInvitation";
const REMOVE_INVITATION: &str = "/Group/removeInvitation";
const REVOKE_MEMBERSHIP: &str = "/Group/revokeMembership";

#[derive(Clone)]
pub struct AccessControl {
    backend: Backend,
}

impl AccessControl {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Creates a group administered by the session user and returns its id.
    pub async fn create_group(&self, session: &Session, name: &str, description: &str) -> PortResult<String> {
        let body = json!({ "name": name, "description": description });
        let raw = self
            .backend
            .call(CREATE_GROUP, with_session(body, Some(session)))
            .await?;
        let id = envelope::keyed::<String>(CREATE_GROUP, raw, "newGroup")?
            .ok_or_else(|| PortError::MissingId(format!("group '{}'", name)))?;
        info!(group = %id, "Created group");
        Ok(id)
    }

    pub async fn remove_group(&self, session: &Session, group_id: &str) -> PortResult<()> {
        self.backend
            .call(REMOVE_GROUP, with_session(json!({ "group": group_id }), Some(session)))
            .await?;
        Ok(())
    }

    pub async fn group(&self, group_id: &str) -> PortResult<Option<Group>> {
        let raw = self.backend.call(GET_GROUP, json!({ "group": group_id })).await?;
        let record = envelope::first::<GroupRecord>(GET_GROUP, raw, "group")?;
        Ok(record.map(GroupRecord::to_domain))
    }

    /// Ids of the groups the session user belongs to.
    pub async fn groups_for_user(&self, session: &Session) -> PortResult<Vec<String>> {
        let raw = self
            .backend
            .call(GROUPS_FOR_USER, with_session(json!({}), Some(session)))
            .await?;
        envelope::wrapped(GROUPS_FOR_USER, raw, "groups", "group")
    }

    pub async fn memberships(&self, session: &Session) -> PortResult<Vec<Membership>> {
        let raw = self
            .backend
            .call(MEMBERSHIPS_BY_USER, with_session(json!({}), Some(session)))
            .await?;
        let records: Vec<MembershipRecord> =
            envelope::wrapped(MEMBERSHIPS_BY_USER, raw, "memberships", "membership")?;
        Ok(records.into_iter().map(MembershipRecord::to_domain).collect())
    }

    pub async fn pending_invitations(&self, session: &Session) -> PortResult<Vec<Invitation>> {
        let raw = self
            .backend
            .call(PENDING_INVITATIONS, with_session(json!({}), Some(session)))
            .await?;
        let records: Vec<InvitationRecord> =
            envelope::wrapped(PENDING_INVITATIONS, raw, "invitations", "invitation")?;
        Ok(records.into_iter().map(InvitationRecord::to_domain).collect())
    }

    pub async fn invite(
        &self,
        session: &Session,
        group_id: &str,
        invitee: &str,
        message: Option<&str>,
    ) -> PortResult<()> {
        let mut body = json!({ "group": group_id, "invitee": invitee });
        if let Some(message) = message {
            body["message"] = json!(message);
        }
        self.backend
            .call(INVITE_USER, with_session(body, Some(session)))
            .await?;
        info!(group = %group_id, invitee, "Invited user");
        Ok(())
    }

    /// Turns the invitation into a membership; the invitation itself is removed by the backend.
    pub async fn accept_invitation(&self, session: &Session, invitation_id: &str) -> PortResult<()> {
        self.backend
            .call(
                ACCEPT_INVITATION,
                with_session(json!({ "invitation": invitation_id }), Some(session)),
            )
            .await?;
        Ok(())
    }

    pub async fn remove_invitation(&self, session: &Session, invitation_id: &str) -> PortResult<()> {
        self.backend
            .call(
                REMOVE_INVITATION,
                with_session(json!({ "invitation": invitation_id }), Some(session)),
            )
            .await?;
        Ok(())
    }

    /// Deletes a membership. Used both for an admin revoking and for a member leaving.
    pub async fn revoke_membership(&self, session: &Session, membership_id: &str) -> PortResult<()> {
        self.backend
            .call(
                REVOKE_MEMBERSHIP,
                with_session(json!({ "membership": membership_id }), Some(session)),
            )
            .await?;
        Ok(())
    }

    /// Loads groups, memberships and invitations concurrently, then the details of
    /// every group referenced by them, also concurrently.
    pub async fn refresh(&self, session: &Session) -> PortResult<GroupOverview> {
        let (group_ids, memberships, invitations) = futures::try_join!(
            self.groups_for_user(session),
            self.memberships(session),
            self.pending_invitations(session),
        )?;

        let mut seen = HashSet::new();
        let wanted: Vec<&str> = group_ids
            .iter()
            .map(String::as_str)
            .chain(invitations.iter().map(|inv| inv.group_id.as_str()))
            .filter(|id| seen.insert(*id))
            .collect();

        let details = try_join_all(wanted.iter().map(|id| self.group(id))).await?;
        let groups = wanted
            .iter()
            .zip(details)
            .filter_map(|(id, group)| group.map(|g| (id.to_string(), g)))
            .collect();

        Ok(GroupOverview {
            group_ids,
            groups,
            memberships,
            invitations,
        })
    }
}
