use crate::models::interaction::Interaction;
use crate::models::workflow::Workflow;

/// Cheap pre-filter run before any condition work. Empty filter sets
/// mean "match everything", so a workflow with no scoping applies to
/// every interaction.
pub fn passes(workflow: &Workflow, interaction: &Interaction) -> bool {
    if !workflow.platforms.is_empty() && !workflow.platforms.contains(&interaction.platform) {
        return false;
    }
    if !workflow.interaction_types.is_empty()
        && !workflow.interaction_types.contains(&interaction.kind)
    {
        return false;
    }
    if !workflow.view_ids.is_empty()
        && !workflow
            .view_ids
            .iter()
            .any(|v| interaction.view_ids.contains(v))
    {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interaction::{
        DispatchState, InteractionKind, InteractionStatus, Platform,
    };
    use crate::models::workflow::{WorkflowAction, WorkflowStatus};
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn workflow() -> Workflow {
        let now = OffsetDateTime::now_utc();
        Workflow {
            id: Uuid::new_v4(),
            name: "Test".into(),
            status: WorkflowStatus::Active,
            priority: 1,
            view_ids: vec![],
            platforms: vec![],
            interaction_types: vec![],
            conditions: vec![],
            action: WorkflowAction::Archive,
            system_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn interaction() -> Interaction {
        let now = OffsetDateTime::now_utc();
        Interaction {
            id: Uuid::new_v4(),
            platform: Platform::Instagram,
            kind: InteractionKind::Comment,
            external_id: "c-1".into(),
            author_handle: "jess".into(),
            author_follower_count: 100,
            author_is_verified: false,
            content: "nice post".into(),
            like_count: 3,
            status: InteractionStatus::Unread,
            review_priority: None,
            tags: vec![],
            view_ids: vec![],
            pending_response: None,
            dispatch_state: DispatchState::Evaluating,
            matched_workflow_id: None,
            received_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unscoped_workflow_matches_everything() {
        assert!(passes(&workflow(), &interaction()));
    }

    #[test]
    fn platform_scope_excludes_other_platforms() {
        let mut wf = workflow();
        wf.platforms = vec![Platform::Youtube, Platform::Tiktok];
        assert!(!passes(&wf, &interaction()));

        wf.platforms.push(Platform::Instagram);
        assert!(passes(&wf, &interaction()));
    }

    #[test]
    fn interaction_type_scope_is_enforced() {
        let mut wf = workflow();
        wf.interaction_types = vec![InteractionKind::Dm];
        assert!(!passes(&wf, &interaction()));

        let mut dm = interaction();
        dm.kind = InteractionKind::Dm;
        assert!(passes(&wf, &dm));
    }

    #[test]
    fn view_scope_needs_shared_membership() {
        let view_a = Uuid::new_v4();
        let view_b = Uuid::new_v4();

        let mut wf = workflow();
        wf.view_ids = vec![view_a];

        let mut i = interaction();
        assert!(!passes(&wf, &i), "no memberships at all");

        i.view_ids = vec![view_b];
        assert!(!passes(&wf, &i), "different view");

        i.view_ids.push(view_a);
        assert!(passes(&wf, &i));
    }
}
