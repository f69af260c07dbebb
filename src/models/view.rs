use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::interaction::{Interaction, InteractionKind, Platform};

/// Deterministic filters of a manual view. All set filters must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewFilters {
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub interaction_types: Vec<InteractionKind>,
    /// Case-insensitive substring match on the interaction content.
    #[serde(default)]
    pub keyword: Option<String>,
}

/// How a view decides membership: a deterministic filter set, or a
/// natural-language prompt resolved by the AI classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewDefinition {
    Manual { filters: ViewFilters },
    AiPrompt { prompt: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub id: Uuid,
    pub name: String,
    pub pinned: bool,
    pub definition: ViewDefinition,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct CreateView {
    pub name: String,
    pub definition: ViewDefinition,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateView {
    pub name: Option<String>,
    pub definition: Option<ViewDefinition>,
}

/// Membership test for manual views. AI-prompt views go through the
/// classifier instead and are resolved by the dispatch worker.
pub fn manual_view_matches(filters: &ViewFilters, interaction: &Interaction) -> bool {
    if !filters.platforms.is_empty() && !filters.platforms.contains(&interaction.platform) {
        return false;
    }
    if !filters.interaction_types.is_empty()
        && !filters.interaction_types.contains(&interaction.kind)
    {
        return false;
    }
    if let Some(keyword) = filters.keyword.as_deref() {
        let keyword = keyword.trim();
        if !keyword.is_empty()
            && !interaction
                .content
                .to_lowercase()
                .contains(&keyword.to_lowercase())
        {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interaction::{DispatchState, InteractionStatus};

    fn interaction(platform: Platform, kind: InteractionKind, content: &str) -> Interaction {
        let now = OffsetDateTime::now_utc();
        Interaction {
            id: Uuid::new_v4(),
            platform,
            kind,
            external_id: "ext-1".into(),
            author_handle: "sam".into(),
            author_follower_count: 10,
            author_is_verified: false,
            content: content.into(),
            like_count: 0,
            status: InteractionStatus::Unread,
            review_priority: None,
            tags: vec![],
            view_ids: vec![],
            pending_response: None,
            dispatch_state: DispatchState::Pending,
            matched_workflow_id: None,
            received_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        let filters = ViewFilters::default();
        let i = interaction(Platform::Tiktok, InteractionKind::Dm, "hi");
        assert!(manual_view_matches(&filters, &i));
    }

    #[test]
    fn keyword_filter_is_case_insensitive() {
        let filters = ViewFilters {
            keyword: Some("Refund".into()),
            ..Default::default()
        };
        let hit = interaction(Platform::Twitter, InteractionKind::Comment, "need a REFUND");
        let miss = interaction(Platform::Twitter, InteractionKind::Comment, "love it");
        assert!(manual_view_matches(&filters, &hit));
        assert!(!manual_view_matches(&filters, &miss));
    }

    #[test]
    fn platform_filter_excludes_other_platforms() {
        let filters = ViewFilters {
            platforms: vec![Platform::Instagram],
            ..Default::default()
        };
        let hit = interaction(Platform::Instagram, InteractionKind::Comment, "hello");
        let miss = interaction(Platform::Youtube, InteractionKind::Comment, "hello");
        assert!(manual_view_matches(&filters, &hit));
        assert!(!manual_view_matches(&filters, &miss));
    }
}
