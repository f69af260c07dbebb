use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::interaction::Interaction;
use crate::state::AppState;

use super::actions::{execute_action, ActionError};
use super::{conditions, rule_store, trigger};

#[derive(Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one workflow matched and its action ran.
    Dispatched { workflow_id: Uuid },
    /// No active workflow matched; the interaction is left for manual
    /// handling.
    Exhausted,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch already in progress for interaction {0}")]
    AlreadyInFlight(Uuid),
    #[error("failed to load workflow snapshot: {0}")]
    Snapshot(#[source] sqlx::Error),
    #[error("workflow {workflow_id} action failed: {source}")]
    Action {
        workflow_id: Uuid,
        #[source]
        source: ActionError,
    },
    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Removes the in-flight marker when a dispatch pass ends, however it
/// ends.
struct InFlightGuard {
    map: Arc<DashMap<Uuid, ()>>,
    id: Uuid,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.map.remove(&self.id);
    }
}

/// Runs one dispatch pass for an interaction: walk the active workflow
/// snapshot in priority order, apply the trigger filter, then the
/// condition evaluator, and execute the first full match. Evaluation
/// halts at that point, so at most one workflow ever acts on an
/// interaction.
///
/// An action failure aborts the pass before any dispatch bookkeeping;
/// the caller decides whether to record a dead letter or requeue.
pub async fn dispatch_interaction(
    state: &AppState,
    interaction: &Interaction,
) -> Result<DispatchOutcome, DispatchError> {
    use dashmap::mapref::entry::Entry;

    let _guard = match state.dispatch_guard.entry(interaction.id) {
        Entry::Occupied(_) => return Err(DispatchError::AlreadyInFlight(interaction.id)),
        Entry::Vacant(slot) => {
            slot.insert(());
            InFlightGuard {
                map: state.dispatch_guard.clone(),
                id: interaction.id,
            }
        }
    };

    let snapshot = state
        .workflow_repo
        .list_active_workflows()
        .await
        .map_err(DispatchError::Snapshot)?;
    let snapshot = rule_store::order_for_dispatch(snapshot);

    for workflow in &snapshot {
        if !trigger::passes(workflow, interaction) {
            continue;
        }
        debug!(
            interaction_id = %interaction.id,
            workflow_id = %workflow.id,
            "trigger filter passed; evaluating conditions"
        );
        if !conditions::workflow_matches(workflow, interaction, state.classifier.as_ref()).await {
            continue;
        }

        match execute_action(state, workflow, interaction).await {
            Ok(()) => {
                state
                    .interaction_repo
                    .mark_dispatched(interaction.id, workflow.id)
                    .await?;
                info!(
                    interaction_id = %interaction.id,
                    workflow_id = %workflow.id,
                    action = workflow.action.kind_str(),
                    "dispatched"
                );
                return Ok(DispatchOutcome::Dispatched {
                    workflow_id: workflow.id,
                });
            }
            Err(source) => {
                return Err(DispatchError::Action {
                    workflow_id: workflow.id,
                    source,
                });
            }
        }
    }

    state.interaction_repo.mark_exhausted(interaction.id).await?;
    Ok(DispatchOutcome::Exhausted)
}
