use std::collections::HashSet;

use thiserror::Error;
use uuid::Uuid;

use crate::models::workflow::Workflow;

/// Sorts a workflow snapshot into evaluation order: system tier first
/// (auto_moderator, then auto_archive), then user workflows ascending by
/// priority. The repository already orders its listings this way; the
/// dispatcher re-applies the ordering so the invariant never depends on
/// a single SQL clause.
pub fn order_for_dispatch(mut workflows: Vec<Workflow>) -> Vec<Workflow> {
    workflows.sort_by_key(|wf| match wf.system_type {
        Some(system) => (0, system.rank(), 0),
        None => (1, 0, wf.priority),
    });
    workflows
}

#[derive(Debug, Error, PartialEq)]
pub enum ReorderError {
    #[error("System workflows cannot be reordered")]
    SystemWorkflow(Uuid),
    #[error("Unknown workflow in ordering")]
    UnknownWorkflow(Uuid),
    #[error("Workflow listed more than once")]
    DuplicateWorkflow(Uuid),
    #[error("Ordering must include every user workflow")]
    IncompleteOrdering { missing: Vec<Uuid> },
}

/// Validates a requested full ordering of the user tier against the
/// current workflow list and turns it into (id, priority) assignments.
/// Any ordering that touches a system workflow, names an unknown id,
/// repeats an id, or omits a user workflow is rejected whole.
pub fn plan_reorder(
    current: &[Workflow],
    requested: &[Uuid],
) -> Result<Vec<(Uuid, i32)>, ReorderError> {
    let system_ids: HashSet<Uuid> = current
        .iter()
        .filter(|wf| wf.is_system())
        .map(|wf| wf.id)
        .collect();
    let user_ids: HashSet<Uuid> = current
        .iter()
        .filter(|wf| !wf.is_system())
        .map(|wf| wf.id)
        .collect();

    let mut seen = HashSet::new();
    for id in requested {
        if system_ids.contains(id) {
            return Err(ReorderError::SystemWorkflow(*id));
        }
        if !user_ids.contains(id) {
            return Err(ReorderError::UnknownWorkflow(*id));
        }
        if !seen.insert(*id) {
            return Err(ReorderError::DuplicateWorkflow(*id));
        }
    }

    if seen.len() != user_ids.len() {
        let missing: Vec<Uuid> = user_ids.difference(&seen).copied().collect();
        return Err(ReorderError::IncompleteOrdering { missing });
    }

    Ok(requested
        .iter()
        .enumerate()
        .map(|(rank, id)| (*id, rank as i32 + 1))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::workflow::{
        SystemWorkflowType, WorkflowAction, WorkflowStatus,
    };
    use time::OffsetDateTime;

    fn workflow(priority: i32, system_type: Option<SystemWorkflowType>) -> Workflow {
        let now = OffsetDateTime::now_utc();
        Workflow {
            id: Uuid::new_v4(),
            name: format!("wf-{priority}"),
            status: WorkflowStatus::Active,
            priority,
            view_ids: vec![],
            platforms: vec![],
            interaction_types: vec![],
            conditions: vec![],
            action: WorkflowAction::Archive,
            system_type,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn system_workflows_lead_regardless_of_priority() {
        let user_low = workflow(1, None);
        let user_high = workflow(7, None);
        let archive = workflow(99, Some(SystemWorkflowType::AutoArchive));
        let moderator = workflow(42, Some(SystemWorkflowType::AutoModerator));

        let ordered = order_for_dispatch(vec![
            user_high.clone(),
            archive.clone(),
            user_low.clone(),
            moderator.clone(),
        ]);

        let ids: Vec<Uuid> = ordered.iter().map(|wf| wf.id).collect();
        assert_eq!(ids, vec![moderator.id, archive.id, user_low.id, user_high.id]);
    }

    #[test]
    fn reorder_assigns_sequential_priorities() {
        let a = workflow(1, None);
        let b = workflow(2, None);
        let current = vec![a.clone(), b.clone()];

        let plan = plan_reorder(&current, &[b.id, a.id]).unwrap();
        assert_eq!(plan, vec![(b.id, 1), (a.id, 2)]);
    }

    #[test]
    fn reorder_rejects_system_workflows() {
        let moderator = workflow(0, Some(SystemWorkflowType::AutoModerator));
        let user = workflow(1, None);
        let current = vec![moderator.clone(), user.clone()];

        assert_eq!(
            plan_reorder(&current, &[moderator.id, user.id]),
            Err(ReorderError::SystemWorkflow(moderator.id))
        );
    }

    #[test]
    fn reorder_rejects_unknown_and_duplicate_ids() {
        let a = workflow(1, None);
        let current = vec![a.clone()];

        let stranger = Uuid::new_v4();
        assert_eq!(
            plan_reorder(&current, &[stranger]),
            Err(ReorderError::UnknownWorkflow(stranger))
        );
        assert_eq!(
            plan_reorder(&current, &[a.id, a.id]),
            Err(ReorderError::DuplicateWorkflow(a.id))
        );
    }

    #[test]
    fn reorder_requires_the_full_user_tier() {
        let a = workflow(1, None);
        let b = workflow(2, None);
        let current = vec![a.clone(), b.clone()];

        match plan_reorder(&current, &[a.id]) {
            Err(ReorderError::IncompleteOrdering { missing }) => {
                assert_eq!(missing, vec![b.id]);
            }
            other => panic!("expected IncompleteOrdering, got {other:?}"),
        }
    }
}
