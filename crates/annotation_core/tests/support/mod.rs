//! In-memory stand-in for the remote backend.
//!
//! Speaks the same `/<Entity>/<action>` protocol and response shapes as the
//! real service and records every call so tests can assert on routing.

#![allow(dead_code)]

use annotation_core::{AnnotationClient, PortError, PortResult, Session, Transport};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const TOKEN: &str = "token-alice";
pub const USER: &str = "alice";

pub fn session() -> Session {
    Session::new(TOKEN, USER)
}

#[derive(Default)]
struct State {
    clock: i64,
    papers: Vec<Value>,
    highlights: Vec<Value>,
    contexts: Vec<Value>,
    publications: HashMap<String, String>,
    threads: Vec<Value>,
    replies: Vec<Value>,
    groups: Vec<Value>,
    memberships: Vec<Value>,
    invitations: Vec<Value>,
    users: HashMap<String, (String, String)>,
    identities: HashMap<String, Value>,
    calls: Vec<(String, Value)>,
    canned: HashMap<String, Value>,
    failing: HashMap<String, String>,
}

impl State {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        1_700_000_000_000 + self.clock
    }
}

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

fn str_arg<'a>(body: &'a Value, key: &str) -> &'a str {
    body.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> AnnotationClient {
        AnnotationClient::new(Arc::new(self.clone()))
    }

    /// Makes every call to `path` answer with `response` instead of the emulation.
    pub fn respond_with(&self, path: &str, response: Value) {
        self.state.lock().unwrap().canned.insert(path.to_string(), response);
    }

    /// Makes every call to `path` fail at the transport level with `message`.
    pub fn fail_with(&self, path: &str, message: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(path.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|(path, _)| path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.paths().iter().filter(|p| p.as_str() == path).count()
    }

    pub fn papers(&self) -> Vec<Value> {
        self.state.lock().unwrap().papers.clone()
    }

    pub fn highlights(&self) -> Vec<Value> {
        self.state.lock().unwrap().highlights.clone()
    }

    pub fn contexts(&self) -> Vec<Value> {
        self.state.lock().unwrap().contexts.clone()
    }

    pub fn threads(&self) -> Vec<Value> {
        self.state.lock().unwrap().threads.clone()
    }

    pub fn memberships(&self) -> Vec<Value> {
        self.state.lock().unwrap().memberships.clone()
    }

    pub fn invitations(&self) -> Vec<Value> {
        self.state.lock().unwrap().invitations.clone()
    }

    /// Stores a highlight record directly, bypassing the client.
    pub fn seed_highlight(&self, record: Value) {
        self.state.lock().unwrap().highlights.push(record);
    }

    /// Stores a context record directly, bypassing the client.
    pub fn seed_context(&self, record: Value) {
        self.state.lock().unwrap().contexts.push(record);
    }

    pub fn seed_group(&self, id: &str, name: &str, admin: &str) {
        self.state.lock().unwrap().groups.push(json!({
            "_id": id, "name": name, "description": format!("{} group", name), "admin": admin,
        }));
    }

    pub fn seed_membership(&self, group_id: &str, user: &str) {
        self.state.lock().unwrap().memberships.push(json!({
            "_id": new_id("membership"), "groupId": group_id, "user": user, "isAdmin": false,
        }));
    }

    pub fn seed_invitation(&self, group_id: &str, inviter: &str, invitee: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = new_id("invitation");
        let created_at = state.tick();
        state.invitations.push(json!({
            "_id": id, "groupId": group_id, "inviter": inviter, "invitee": invitee,
            "createdAt": created_at,
        }));
        id
    }

    pub fn register_user(&self, username: &str, password: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .users
            .insert(username.to_string(), (password.to_string(), format!("user-{}", username)));
    }

    fn user_of(body: &Value) -> Option<String> {
        match str_arg(body, "session") {
            TOKEN => Some(USER.to_string()),
            "" => None,
            other => other.strip_prefix("token-").map(str::to_string),
        }
    }

    fn handle(&self, path: &str, body: &Value) -> Value {
        let mut state = self.state.lock().unwrap();
        state.calls.push((path.to_string(), body.clone()));
        if let Some(canned) = state.canned.get(path) {
            return canned.clone();
        }

        let authenticated = !matches!(
            path,
            "/PaperIndex/ensure"
                | "/PaperIndex/updateMeta"
                | "/PaperIndex/_getByPaperId"
                | "/PaperIndex/_listRecent"
                | "/PdfHighlighter/_listByPaper"
                | "/HighlightedContext/_getFilteredContexts"
                | "/DiscussionPub/open"
                | "/DiscussionPub/_getPubIdByPaper"
                | "/DiscussionPub/_listThreads"
                | "/DiscussionPub/_listReplies"
                | "/DiscussionPub/_listRepliesTree"
                | "/Group/_getGroup"
                | "/IdentityVerification/get"
                | "/IdentityVerification/addORCID"
                | "/IdentityVerification/addBadge"
                | "/UserAuthentication/register"
                | "/login"
        );
        let user = Self::user_of(body);
        if authenticated && user.is_none() {
            return json!({ "error": "Invalid session" });
        }
        let user = user.unwrap_or_default();

        match path {
            "/PaperIndex/ensure" => {
                let external = str_arg(body, "id").to_string();
                let existing = state
                    .papers
                    .iter()
                    .find(|p| p["paperId"] == json!(external))
                    .map(|p| p["_id"].clone());
                match existing {
                    Some(id) => json!({ "result": id }),
                    None => {
                        let id = new_id("paper");
                        let created_at = state.tick();
                        let mut paper = json!({ "_id": id, "paperId": external, "createdAt": created_at });
                        if let Some(title) = body.get("title") {
                            paper["title"] = title.clone();
                        }
                        state.papers.push(paper);
                        json!({ "result": id })
                    }
                }
            }
            "/PaperIndex/updateMeta" => {
                let external = body["id"].clone();
                match state.papers.iter_mut().find(|p| p["paperId"] == external) {
                    Some(paper) => {
                        paper["title"] = body["title"].clone();
                        json!({ "ok": true })
                    }
                    None => json!({ "error": "Paper not found" }),
                }
            }
            "/PaperIndex/_getByPaperId" => {
                let paper = state
                    .papers
                    .iter()
                    .find(|p| p["paperId"] == body["paperId"])
                    .cloned()
                    .unwrap_or(Value::Null);
                json!([{ "paper": paper }])
            }
            "/PaperIndex/_listRecent" => {
                let limit = body.get("limit").and_then(Value::as_u64).unwrap_or(u64::MAX) as usize;
                let papers: Vec<Value> = state.papers.iter().rev().take(limit).cloned().collect();
                json!([{ "papers": papers }])
            }
            "/PdfHighlighter/createHighlight" => {
                let id = new_id("highlight");
                let mut record = object(body.clone());
                record.remove("session");
                record.insert("_id".to_string(), json!(id));
                state.highlights.push(Value::Object(record));
                json!({ "highlightId": id })
            }
            "/PdfHighlighter/_listByPaper" => {
                let highlights: Vec<Value> = state
                    .highlights
                    .iter()
                    .filter(|h| h["paper"] == body["paper"])
                    .cloned()
                    .collect();
                json!([{ "highlights": highlights }])
            }
            "/HighlightedContext/create" => {
                let id = new_id("context");
                let created_at = state.tick();
                let mut record = object(body.clone());
                record.remove("session");
                record.insert("_id".to_string(), json!(id));
                record.insert("author".to_string(), json!(user));
                record.insert("createdAt".to_string(), json!(created_at));
                state.contexts.push(Value::Object(record));
                json!({ "newContext": id })
            }
            "/HighlightedContext/_getFilteredContexts" => {
                let wanted = body["paperIds"].as_array().cloned().unwrap_or_default();
                let contexts: Vec<Value> = state
                    .contexts
                    .iter()
                    .filter(|c| wanted.contains(&c["paperId"]))
                    .cloned()
                    .collect();
                json!([{ "filteredContexts": contexts }])
            }
            "/DiscussionPub/open" => {
                let paper = str_arg(body, "paperId").to_string();
                let id = new_id("pub");
                state.publications.insert(paper, id.clone());
                json!({ "result": id })
            }
            "/DiscussionPub/_getPubIdByPaper" => match state.publications.get(str_arg(body, "paperId")) {
                Some(id) => json!([{ "result": id }]),
                None => json!([]),
            },
            "/DiscussionPub/startThread" | "/DiscussionPub/startPrivateThread" => {
                let id = new_id("thread");
                let created_at = state.tick();
                let mut record = object(body.clone());
                record.remove("session");
                record.insert("_id".to_string(), json!(id));
                record.insert("createdAt".to_string(), json!(created_at));
                record.insert("deleted".to_string(), json!(false));
                record.insert(
                    "private".to_string(),
                    json!(path == "/DiscussionPub/startPrivateThread"),
                );
                state.threads.push(Value::Object(record));
                json!({ "result": id })
            }
            "/DiscussionPub/reply" | "/DiscussionPub/replyTo" => {
                let id = new_id("reply");
                let created_at = state.tick();
                let mut record = object(body.clone());
                record.remove("session");
                record.insert("_id".to_string(), json!(id));
                record.insert("createdAt".to_string(), json!(created_at));
                record.insert("deleted".to_string(), json!(false));
                state.replies.push(Value::Object(record));
                json!({ "result": id })
            }
            "/DiscussionPub/_listThreads" => {
                let threads: Vec<Value> = state
                    .threads
                    .iter()
                    .filter(|t| t["pubId"] == body["pubId"])
                    .filter(|t| body.get("anchorId").map_or(true, |a| t["anchorId"] == *a))
                    .cloned()
                    .collect();
                json!([{ "threads": threads }])
            }
            "/DiscussionPub/_listReplies" => {
                let replies: Vec<Value> = state
                    .replies
                    .iter()
                    .filter(|r| r["threadId"] == body["threadId"])
                    .cloned()
                    .collect();
                json!([{ "replies": replies }])
            }
            "/DiscussionPub/_listRepliesTree" => {
                let replies: Vec<Value> = state
                    .replies
                    .iter()
                    .filter(|r| r["threadId"] == body["threadId"])
                    .cloned()
                    .collect();
                json!([{ "replies": tree_of(&replies, None) }])
            }
            "/DiscussionPub/deleteThread" => {
                for thread in state.threads.iter_mut().filter(|t| t["_id"] == body["threadId"]) {
                    thread["deleted"] = json!(true);
                }
                json!({ "ok": true })
            }
            "/DiscussionPub/deleteReply" => {
                for reply in state.replies.iter_mut().filter(|r| r["_id"] == body["replyId"]) {
                    reply["deleted"] = json!(true);
                }
                json!({ "ok": true })
            }
            "/Group/createGroup" => {
                let id = new_id("group");
                state.groups.push(json!({
                    "_id": id, "name": body["name"], "description": body["description"], "admin": user,
                }));
                state.memberships.push(json!({
                    "_id": new_id("membership"), "groupId": id, "user": user, "isAdmin": true,
                }));
                json!({ "newGroup": id })
            }
            "/Group/removeGroup" => {
                let group = body["group"].clone();
                state.groups.retain(|g| g["_id"] != group);
                state.memberships.retain(|m| m["groupId"] != group);
                json!({ "ok": true })
            }
            "/Group/_getGroup" => {
                let group = state
                    .groups
                    .iter()
                    .find(|g| g["_id"] == body["group"])
                    .cloned()
                    .unwrap_or(Value::Null);
                json!([{ "group": group }])
            }
            "/Group/_getGroupsForUser" => {
                let groups: Vec<Value> = state
                    .memberships
                    .iter()
                    .filter(|m| m["user"] == json!(user))
                    .map(|m| json!({ "group": m["groupId"] }))
                    .collect();
                json!({ "groups": groups })
            }
            "/Group/_getMembershipsByUser" => {
                let memberships: Vec<Value> = state
                    .memberships
                    .iter()
                    .filter(|m| m["user"] == json!(user))
                    .map(|m| json!({ "membership": m }))
                    .collect();
                json!({ "memberships": memberships })
            }
            "/Group/_listPendingInvitationsByUser" => {
                let invitations: Vec<Value> = state
                    .invitations
                    .iter()
                    .filter(|i| i["invitee"] == json!(user))
                    .map(|i| json!({ "invitation": i }))
                    .collect();
                json!({ "invitations": invitations })
            }
            "/Group/inviteUser" => {
                let id = new_id("invitation");
                let created_at = state.tick();
                let mut invitation = json!({
                    "_id": id, "groupId": body["group"], "inviter": user,
                    "invitee": body["invitee"], "createdAt": created_at,
                });
                if let Some(message) = body.get("message") {
                    invitation["message"] = message.clone();
                }
                state.invitations.push(invitation);
                json!({ "invitation": id })
            }
            "/Group/acceptInvitation" => {
                let position = state
                    .invitations
                    .iter()
                    .position(|i| i["_id"] == body["invitation"]);
                match position {
                    Some(index) => {
                        let invitation = state.invitations.remove(index);
                        let id = new_id("membership");
                        state.memberships.push(json!({
                            "_id": id, "groupId": invitation["groupId"],
                            "user": invitation["invitee"], "isAdmin": false,
                        }));
                        json!({ "membership": id })
                    }
                    None => json!({ "error": "Invitation not found" }),
                }
            }
            "/Group/removeInvitation" => {
                let invitation = body["invitation"].clone();
                state.invitations.retain(|i| i["_id"] != invitation);
                json!({ "ok": true })
            }
            "/Group/revokeMembership" => {
                let membership = body["membership"].clone();
                state.memberships.retain(|m| m["_id"] != membership);
                json!({ "ok": true })
            }
            "/UserAuthentication/register" => {
                let username = str_arg(body, "username").to_string();
                if state.users.contains_key(&username) {
                    return json!({ "error": "Username already taken" });
                }
                let id = format!("user-{}", username);
                state
                    .users
                    .insert(username, (str_arg(body, "password").to_string(), id.clone()));
                json!({ "user": id })
            }
            "/login" => match state.users.get(str_arg(body, "username")) {
                Some((password, id)) if password == str_arg(body, "password") => {
                    json!({ "session": format!("token-{}", id), "user": id })
                }
                _ => json!({ "error": "Invalid username or password" }),
            },
            "/logout" => json!({ "status": "logged out" }),
            "/IdentityVerification/addORCID" => {
                let identity = state
                    .identities
                    .entry(str_arg(body, "userId").to_string())
                    .or_insert_with(|| json!({ "badges": [] }));
                identity["orcid"] = body["orcid"].clone();
                json!({ "ok": true })
            }
            "/IdentityVerification/addBadge" => {
                let identity = state
                    .identities
                    .entry(str_arg(body, "userId").to_string())
                    .or_insert_with(|| json!({ "badges": [] }));
                if let Some(badges) = identity["badges"].as_array_mut() {
                    badges.push(body["badge"].clone());
                }
                json!({ "ok": true })
            }
            "/IdentityVerification/get" => {
                let identity = state.identities.get(str_arg(body, "userId")).cloned();
                json!({ "result": identity })
            }
            other => json!({ "error": format!("Unknown operation {}", other) }),
        }
    }
}

/// Nests replies the way the backend's tree query does.
fn tree_of(replies: &[Value], parent: Option<&Value>) -> Vec<Value> {
    replies
        .iter()
        .filter(|r| match parent {
            Some(parent) => r.get("parentId") == Some(parent),
            None => r.get("parentId").map_or(true, Value::is_null),
        })
        .map(|r| {
            let mut node = r.clone();
            node["children"] = json!(tree_of(replies, Some(&r["_id"])));
            node
        })
        .collect()
}

#[async_trait]
impl Transport for InMemoryBackend {
    async fn post(&self, path: &str, body: Value) -> PortResult<Value> {
        let failure = self.state.lock().unwrap().failing.get(path).cloned();
        if let Some(message) = failure {
            self.state.lock().unwrap().calls.push((path.to_string(), body));
            return Err(PortError::RemoteCallFailed(format!("{}: {}", path, message)));
        }
        Ok(self.handle(path, &body))
    }
}
