//! crates/annotation_core/src/accounts.rs
//!
//! Registration, login/logout and verified identity details. Login hands back
//! an explicit `Session` that callers thread through authenticated operations;
//! where that session is stored is up to them.

use crate::backend::Backend;
use crate::domain::{Identity, Session};
use crate::envelope;
use crate::ports::{PortError, PortResult};
use crate::records::IdentityRecord;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const REGISTER: &str = "/UserAuthentication/register";
const LOGIN: &str = "/login";
const LOGOUT: &str = "/logout";
const ADD_ORCID: &str = "/IdentityVerification/addORCID";
const ADD_BADGE: &str = "/IdentityVerification/addBadge";
const GET_IDENTITY: &str = "/IdentityVerification/get";

#[derive(Deserialize)]
struct LoginRecord {
    session: String,
    user: String,
}

#[derive(Clone)]
pub struct Accounts {
    backend: Backend,
}

impl Accounts {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Registers a user and returns the new user id.
    pub async fn register(&self, username: &str, password: &str) -> PortResult<String> {
        let raw = self
            .backend
            .call(REGISTER, json!({ "username": username, "password": password }))
            .await?;
        let user = envelope::keyed::<String>(REGISTER, raw, "user")?
            .ok_or_else(|| PortError::MissingId(format!("user '{}'", username)))?;
        info!(user = %user, "Registered user");
        Ok(user)
    }

    pub async fn login(&self, username: &str, password: &str) -> PortResult<Session> {
        let raw = self
            .backend
            .call(LOGIN, json!({ "username": username, "password": password }))
            .await?;
        let record: LoginRecord = serde_json::from_value(raw).map_err(|e| PortError::UnexpectedShape {
            path: LOGIN.to_string(),
            message: e.to_string(),
        })?;
        Ok(Session::new(record.session, record.user))
    }

    pub async fn logout(&self, session: &Session) -> PortResult<()> {
        self.backend
            .call(LOGOUT, json!({ "session": session.token }))
            .await?;
        Ok(())
    }

    pub async fn add_orcid(&self, user_id: &str, orcid: &str) -> PortResult<()> {
        self.backend
            .call(ADD_ORCID, json!({ "userId": user_id, "orcid": orcid }))
            .await?;
        Ok(())
    }

    pub async fn add_badge(&self, user_id: &str, badge: &str) -> PortResult<()> {
        self.backend
            .call(ADD_BADGE, json!({ "userId": user_id, "badge": badge }))
            .await?;
        Ok(())
    }

    /// Identity details of a user; a user with none yields an empty identity.
    pub async fn identity(&self, user_id: &str) -> PortResult<Identity> {
        let raw = self
            .backend
            .call(GET_IDENTITY, json!({ "userId": user_id }))
            .await?;
        Ok(envelope::direct::<IdentityRecord>(GET_IDENTITY, raw)?
            .map(IdentityRecord::to_domain)
            .unwrap_or_default())
    }
}
