use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Social network an interaction arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
    Twitter,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "youtube" => Some(Platform::Youtube),
            "instagram" => Some(Platform::Instagram),
            "tiktok" => Some(Platform::Tiktok),
            "twitter" => Some(Platform::Twitter),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Comment,
    Dm,
    Mention,
}

impl InteractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionKind::Comment => "comment",
            InteractionKind::Dm => "dm",
            InteractionKind::Mention => "mention",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comment" => Some(InteractionKind::Comment),
            "dm" => Some(InteractionKind::Dm),
            "mention" => Some(InteractionKind::Mention),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Unread,
    Read,
    AwaitingApproval,
    Replied,
    Archived,
}

impl InteractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionStatus::Unread => "unread",
            InteractionStatus::Read => "read",
            InteractionStatus::AwaitingApproval => "awaiting_approval",
            InteractionStatus::Replied => "replied",
            InteractionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(InteractionStatus::Unread),
            "read" => Some(InteractionStatus::Read),
            "awaiting_approval" => Some(InteractionStatus::AwaitingApproval),
            "replied" => Some(InteractionStatus::Replied),
            "archived" => Some(InteractionStatus::Archived),
            _ => None,
        }
    }
}

/// Where an interaction sits in the automation pipeline. Each inbound
/// interaction is dispatched at most once; `Dispatched` carries the
/// matched workflow on the interaction row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Pending,
    Evaluating,
    Dispatched,
    Exhausted,
    Failed,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Pending => "pending",
            DispatchState::Evaluating => "evaluating",
            DispatchState::Dispatched => "dispatched",
            DispatchState::Exhausted => "exhausted",
            DispatchState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DispatchState::Pending),
            "evaluating" => Some(DispatchState::Evaluating),
            "dispatched" => Some(DispatchState::Dispatched),
            "exhausted" => Some(DispatchState::Exhausted),
            "failed" => Some(DispatchState::Failed),
            _ => None,
        }
    }
}

/// An AI-drafted reply waiting for human approval. `prior_status` is the
/// status the interaction held before it entered the approval queue, so a
/// rejection can restore it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingResponse {
    pub text: String,
    pub workflow_id: Option<Uuid>,
    pub prior_status: InteractionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub id: Uuid,
    pub platform: Platform,
    pub kind: InteractionKind,
    /// Identifier of the comment/DM/mention on the originating platform.
    pub external_id: String,
    pub author_handle: String,
    pub author_follower_count: i64,
    pub author_is_verified: bool,
    pub content: String,
    pub like_count: i64,
    pub status: InteractionStatus,
    pub review_priority: Option<super::workflow::ReviewPriority>,
    pub tags: Vec<String>,
    pub view_ids: Vec<Uuid>,
    pub pending_response: Option<PendingResponse>,
    pub dispatch_state: DispatchState,
    pub matched_workflow_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Payload accepted by the ingest webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct NewInteraction {
    pub kind: InteractionKind,
    pub external_id: String,
    pub author_handle: String,
    #[serde(default)]
    pub author_follower_count: i64,
    #[serde(default)]
    pub author_is_verified: bool,
    pub content: String,
    #[serde(default)]
    pub like_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for p in [
            Platform::Youtube,
            Platform::Instagram,
            Platform::Tiktok,
            Platform::Twitter,
        ] {
            assert_eq!(Platform::parse(p.as_str()), Some(p));
        }
        assert_eq!(Platform::parse("myspace"), None);
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(
            InteractionStatus::parse("awaiting_approval"),
            Some(InteractionStatus::AwaitingApproval)
        );
        assert_eq!(InteractionStatus::parse("snoozed"), None);
    }
}
