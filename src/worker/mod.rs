use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::{dispatch_interaction, DispatchError, DispatchOutcome};
use crate::models::interaction::Interaction;
use crate::models::view::{manual_view_matches, ViewDefinition};
use crate::state::AppState;

const IDLE_POLL: Duration = Duration::from_millis(750);
const ERROR_BACKOFF: Duration = Duration::from_millis(1000);

/// Spawns the dispatch worker: claims queued interactions one at a
/// time, resolves their view memberships, and runs a dispatch pass.
pub async fn start_background_worker(state: AppState) {
    tokio::spawn(async move {
        loop {
            match state.interaction_repo.claim_next_pending().await {
                Ok(Some(interaction)) => {
                    process_interaction(&state, interaction).await;
                }
                Ok(None) => {
                    sleep(IDLE_POLL).await;
                }
                Err(e) => {
                    error!(?e, "worker: error claiming interaction");
                    sleep(ERROR_BACKOFF).await;
                }
            }
        }
    });
}

async fn process_interaction(state: &AppState, mut interaction: Interaction) {
    match resolve_view_memberships(state, &interaction).await {
        Ok(view_ids) => {
            if view_ids != interaction.view_ids {
                if let Err(e) = state
                    .interaction_repo
                    .set_view_ids(interaction.id, &view_ids)
                    .await
                {
                    warn!(
                        interaction_id = %interaction.id,
                        ?e,
                        "worker: failed to persist view memberships"
                    );
                }
                interaction.view_ids = view_ids;
            }
        }
        Err(e) => {
            warn!(
                interaction_id = %interaction.id,
                ?e,
                "worker: failed to resolve view memberships; requeueing"
            );
            let _ = state
                .interaction_repo
                .requeue_for_dispatch(interaction.id)
                .await;
            sleep(ERROR_BACKOFF).await;
            return;
        }
    }

    match dispatch_interaction(state, &interaction).await {
        Ok(DispatchOutcome::Dispatched { workflow_id }) => {
            info!(
                interaction_id = %interaction.id,
                workflow_id = %workflow_id,
                "worker: interaction dispatched"
            );
        }
        Ok(DispatchOutcome::Exhausted) => {}
        Err(DispatchError::Action {
            workflow_id,
            source,
        }) => {
            // The interaction keeps its pre-dispatch state; record the
            // failure so it can be inspected and requeued.
            error!(
                interaction_id = %interaction.id,
                workflow_id = %workflow_id,
                %source,
                "worker: action failed during dispatch"
            );
            if let Err(e) = state
                .interaction_repo
                .insert_dispatch_failure(interaction.id, Some(workflow_id), &source.to_string())
                .await
            {
                error!(?e, "worker: failed to record dispatch failure");
            }
            let _ = state
                .interaction_repo
                .mark_dispatch_failed(interaction.id)
                .await;
        }
        Err(DispatchError::AlreadyInFlight(id)) => {
            warn!(interaction_id = %id, "worker: dispatch already in flight; requeueing");
            let _ = state.interaction_repo.requeue_for_dispatch(id).await;
        }
        Err(e) => {
            error!(
                interaction_id = %interaction.id,
                ?e,
                "worker: transient dispatch error; requeueing"
            );
            let _ = state
                .interaction_repo
                .requeue_for_dispatch(interaction.id)
                .await;
            sleep(ERROR_BACKOFF).await;
        }
    }
}

/// Resolves which views an interaction belongs to. Manual views match
/// deterministically; AI-prompt views consult the classifier, where a
/// failed or timed-out call simply counts as non-membership.
async fn resolve_view_memberships(
    state: &AppState,
    interaction: &Interaction,
) -> Result<Vec<Uuid>, sqlx::Error> {
    let views = state.view_repo.list_views().await?;

    let mut memberships = Vec::new();
    for view in views {
        let is_member = match &view.definition {
            ViewDefinition::Manual { filters } => manual_view_matches(filters, interaction),
            ViewDefinition::AiPrompt { prompt } => {
                match state.classifier.matches(prompt, interaction).await {
                    Ok(verdict) => verdict,
                    Err(e) => {
                        warn!(
                            view_id = %view.id,
                            interaction_id = %interaction.id,
                            %e,
                            "worker: view classifier failed; treating as non-member"
                        );
                        false
                    }
                }
            }
        };
        if is_member {
            memberships.push(view.id);
        }
    }
    Ok(memberships)
}
