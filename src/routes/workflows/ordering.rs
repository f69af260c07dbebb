use super::prelude::*;

#[derive(Deserialize)]
pub struct ReorderPayload {
    pub workflow_ids: Vec<Uuid>,
    /// Ordering version the client last saw; protects against lost
    /// updates between concurrent editors.
    pub expected_version: Option<i64>,
}

pub async fn reorder_workflows(
    State(app_state): State<AppState>,
    Json(payload): Json<ReorderPayload>,
) -> Response {
    let current = match app_state.workflow_repo.list_workflows().await {
        Ok(workflows) => workflows,
        Err(e) => {
            error!(?e, "DB error listing workflows for reorder");
            return JsonResponse::server_error("Failed to reorder workflows").into_response();
        }
    };

    let plan = match plan_reorder(&current, &payload.workflow_ids) {
        Ok(plan) => plan,
        Err(err @ ReorderError::SystemWorkflow(_)) => {
            return JsonResponse::forbidden_with_code(&err.to_string(), "system-workflow")
                .into_response();
        }
        Err(err) => return JsonResponse::bad_request(&err.to_string()).into_response(),
    };

    let expected_version = match payload.expected_version {
        Some(version) => version,
        None => match app_state.workflow_repo.ordering_version().await {
            Ok(version) => version,
            Err(e) => {
                error!(?e, "DB error reading ordering version");
                return JsonResponse::server_error("Failed to reorder workflows").into_response();
            }
        },
    };

    match app_state
        .workflow_repo
        .apply_user_ordering(&plan, expected_version)
        .await
    {
        Ok(true) => JsonResponse::success("Workflow order updated").into_response(),
        Ok(false) => {
            JsonResponse::conflict("Workflow order changed underneath you; reload and retry")
                .into_response()
        }
        Err(e) => {
            error!(?e, "DB error applying workflow ordering");
            JsonResponse::server_error("Failed to reorder workflows").into_response()
        }
    }
}

pub async fn activate_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Response {
    set_status(app_state, workflow_id, WorkflowStatus::Active).await
}

pub async fn pause_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Response {
    set_status(app_state, workflow_id, WorkflowStatus::Paused).await
}

async fn set_status(app_state: AppState, workflow_id: Uuid, status: WorkflowStatus) -> Response {
    match app_state
        .workflow_repo
        .set_workflow_status(workflow_id, status)
        .await
    {
        Ok(Some(workflow)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "workflow": workflow
            })),
        )
            .into_response(),
        Ok(None) => JsonResponse::not_found("Workflow not found").into_response(),
        Err(e) => {
            error!(?e, "DB error setting workflow status");
            JsonResponse::server_error("Failed to update workflow status").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::workflow_repository::MockWorkflowRepository;
    use crate::engine::test_support::{build_state, workflow_fixture};
    use crate::models::workflow::{SystemWorkflowType, WorkflowAction};

    #[tokio::test]
    async fn reorder_rejects_orderings_naming_system_workflows() {
        let mut moderator = workflow_fixture(WorkflowAction::Moderate {
            verbs: Default::default(),
        });
        moderator.system_type = Some(SystemWorkflowType::AutoModerator);
        let moderator_id = moderator.id;
        let user = workflow_fixture(WorkflowAction::Archive);
        let user_id = user.id;

        let mut repo = MockWorkflowRepository::new();
        repo.expect_list_workflows().returning(move || {
            let workflows = vec![moderator.clone(), user.clone()];
            Box::pin(async move { Ok(workflows) })
        });
        // apply_user_ordering must never run for a rejected ordering.
        let state = build_state(None, Some(repo), None, None, None);

        let resp = reorder_workflows(
            State(state),
            Json(ReorderPayload {
                workflow_ids: vec![moderator_id, user_id],
                expected_version: Some(3),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reorder_surfaces_version_conflicts() {
        let a = workflow_fixture(WorkflowAction::Archive);
        let b = workflow_fixture(WorkflowAction::Archive);
        let (a_id, b_id) = (a.id, b.id);

        let mut repo = MockWorkflowRepository::new();
        repo.expect_list_workflows().returning(move || {
            let workflows = vec![a.clone(), b.clone()];
            Box::pin(async move { Ok(workflows) })
        });
        repo.expect_apply_user_ordering()
            .times(1)
            .withf(move |plan, version| {
                *version == 5 && plan == [(b_id, 1), (a_id, 2)]
            })
            .returning(|_, _| Box::pin(async { Ok(false) }));
        let state = build_state(None, Some(repo), None, None, None);

        let resp = reorder_workflows(
            State(state),
            Json(ReorderPayload {
                workflow_ids: vec![b_id, a_id],
                expected_version: Some(5),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn activate_returns_updated_workflow() {
        let wf = workflow_fixture(WorkflowAction::Archive);
        let mut repo = MockWorkflowRepository::new();
        repo.expect_set_workflow_status()
            .withf(|_, status| *status == WorkflowStatus::Active)
            .returning(move |_, _| {
                let wf = wf.clone();
                Box::pin(async move { Ok(Some(wf)) })
            });
        let state = build_state(None, Some(repo), None, None, None);

        let resp = activate_workflow(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
