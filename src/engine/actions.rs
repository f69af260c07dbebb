use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

use crate::models::interaction::{Interaction, InteractionStatus, PendingResponse};
use crate::models::workflow::{ModerationVerb, Workflow, WorkflowAction};
use crate::services::ai::AiError;
use crate::services::platform::PlatformError;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("platform call failed: {0}")]
    Platform(#[from] PlatformError),
    #[error("response generation failed: {0}")]
    Generation(#[from] AiError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Executes the matched workflow's single action. The external side
/// effect always runs before any local state transition, so a failed
/// call leaves the interaction exactly as dispatch found it.
pub async fn execute_action(
    state: &AppState,
    workflow: &Workflow,
    interaction: &Interaction,
) -> Result<(), ActionError> {
    match &workflow.action {
        WorkflowAction::AutoRespond { response_text } => {
            state
                .platform
                .publish_reply(interaction, response_text)
                .await?;
            state.interaction_repo.mark_replied(interaction.id).await?;
            info!(
                interaction_id = %interaction.id,
                workflow_id = %workflow.id,
                "auto-responded"
            );
        }
        WorkflowAction::GenerateResponse {
            tone,
            ai_instructions,
        } => {
            let draft = state
                .generator
                .draft_reply(interaction, tone.as_deref(), ai_instructions.as_deref())
                .await?;
            let pending = PendingResponse {
                text: draft,
                workflow_id: Some(workflow.id),
                prior_status: interaction.status,
                generated_at: OffsetDateTime::now_utc(),
            };
            state
                .interaction_repo
                .set_pending_response(interaction.id, pending)
                .await?;
            info!(
                interaction_id = %interaction.id,
                workflow_id = %workflow.id,
                "drafted response awaiting approval"
            );
        }
        WorkflowAction::Moderate { verbs } => {
            match verbs.for_kind(interaction.kind) {
                ModerationVerb::Delete => state.platform.delete_comment(interaction).await?,
                ModerationVerb::Block => state.platform.block_author(interaction).await?,
            }
            state
                .interaction_repo
                .set_status(interaction.id, InteractionStatus::Archived)
                .await?;
            info!(
                interaction_id = %interaction.id,
                workflow_id = %workflow.id,
                kind = interaction.kind.as_str(),
                "moderated"
            );
        }
        WorkflowAction::Archive => {
            // Local transition only; nothing is touched on the platform.
            state
                .interaction_repo
                .set_status(interaction.id, InteractionStatus::Archived)
                .await?;
        }
        WorkflowAction::FlagForReview { priority } => {
            state
                .interaction_repo
                .set_review_priority(interaction.id, *priority)
                .await?;
        }
        WorkflowAction::AddTag { tags } => {
            state.interaction_repo.add_tags(interaction.id, tags).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{build_state, interaction_fixture, workflow_fixture};
    use crate::db::interaction_repository::MockInteractionRepository;
    use crate::models::interaction::InteractionKind;
    use crate::models::workflow::{ModerationVerbs, ReviewPriority};
    use crate::services::platform::mock::{MockPlatformClient, PlatformCall};
    use std::sync::Arc;

    #[tokio::test]
    async fn auto_respond_publishes_then_marks_replied() {
        let mut repo = MockInteractionRepository::new();
        repo.expect_mark_replied()
            .times(1)
            .returning(|_| Box::pin(async { Ok(true) }));
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        let wf = workflow_fixture(WorkflowAction::AutoRespond {
            response_text: "Thanks!".into(),
        });
        let i = interaction_fixture();

        execute_action(&state, &wf, &i).await.unwrap();
        assert_eq!(
            platform.recorded(),
            vec![PlatformCall::Reply {
                external_id: i.external_id.clone(),
                text: "Thanks!".into()
            }]
        );
    }

    #[tokio::test]
    async fn auto_respond_failure_leaves_interaction_untouched() {
        // A failing platform call must not reach the repository at all.
        let repo = MockInteractionRepository::new();
        let platform = Arc::new(MockPlatformClient::failing());
        let state = build_state(Some(repo), None, Some(platform), None, None);

        let wf = workflow_fixture(WorkflowAction::AutoRespond {
            response_text: "Thanks!".into(),
        });
        let err = execute_action(&state, &wf, &interaction_fixture())
            .await
            .expect_err("publish failure should bubble");
        assert!(matches!(err, ActionError::Platform(_)));
    }

    #[tokio::test]
    async fn generate_response_stores_provenance_and_prior_status() {
        let wf = workflow_fixture(WorkflowAction::GenerateResponse {
            tone: Some("warm".into()),
            ai_instructions: None,
        });
        let wf_id = wf.id;
        let i = interaction_fixture();
        let prior = i.status;

        let mut repo = MockInteractionRepository::new();
        repo.expect_set_pending_response()
            .times(1)
            .withf(move |_, pending| {
                pending.workflow_id == Some(wf_id)
                    && pending.prior_status == prior
                    && !pending.text.is_empty()
            })
            .returning(|_, _| Box::pin(async { Ok(None) }));
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        execute_action(&state, &wf, &i).await.unwrap();
        assert!(platform.recorded().is_empty(), "no platform write yet");
    }

    #[tokio::test]
    async fn moderate_deletes_comments_and_blocks_dm_authors() {
        let wf = workflow_fixture(WorkflowAction::Moderate {
            verbs: ModerationVerbs::default(),
        });

        for (kind, expected) in [
            (
                InteractionKind::Comment,
                PlatformCall::DeleteComment {
                    external_id: "c-1".into(),
                },
            ),
            (
                InteractionKind::Dm,
                PlatformCall::BlockAuthor {
                    author_handle: "jordan".into(),
                },
            ),
        ] {
            let mut repo = MockInteractionRepository::new();
            repo.expect_set_status()
                .times(1)
                .returning(|_, _| Box::pin(async { Ok(true) }));
            let platform = Arc::new(MockPlatformClient::default());
            let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

            let mut i = interaction_fixture();
            i.kind = kind;
            execute_action(&state, &wf, &i).await.unwrap();
            assert_eq!(platform.recorded(), vec![expected]);
        }
    }

    #[tokio::test]
    async fn archive_never_calls_the_platform() {
        let mut repo = MockInteractionRepository::new();
        repo.expect_set_status()
            .times(1)
            .withf(|_, status| *status == InteractionStatus::Archived)
            .returning(|_, _| Box::pin(async { Ok(true) }));
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        let wf = workflow_fixture(WorkflowAction::Archive);
        execute_action(&state, &wf, &interaction_fixture())
            .await
            .unwrap();
        assert!(platform.recorded().is_empty());
    }

    #[tokio::test]
    async fn flag_for_review_sets_priority_only() {
        let mut repo = MockInteractionRepository::new();
        repo.expect_set_review_priority()
            .times(1)
            .withf(|_, p| *p == ReviewPriority::High)
            .returning(|_, _| Box::pin(async { Ok(true) }));
        let platform = Arc::new(MockPlatformClient::default());
        let state = build_state(Some(repo), None, Some(platform.clone()), None, None);

        let wf = workflow_fixture(WorkflowAction::FlagForReview {
            priority: ReviewPriority::High,
        });
        execute_action(&state, &wf, &interaction_fixture())
            .await
            .unwrap();
        assert!(platform.recorded().is_empty());
    }

    #[tokio::test]
    async fn add_tag_delegates_to_idempotent_union() {
        let mut repo = MockInteractionRepository::new();
        repo.expect_add_tags()
            .times(1)
            .withf(|_, tags| tags == ["vip"])
            .returning(|_, _| Box::pin(async { Ok(true) }));
        let state = build_state(Some(repo), None, None, None, None);

        let wf = workflow_fixture(WorkflowAction::AddTag {
            tags: vec!["vip".into()],
        });
        execute_action(&state, &wf, &interaction_fixture())
            .await
            .unwrap();
    }
}
