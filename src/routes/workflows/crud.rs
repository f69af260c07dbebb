use super::prelude::*;

pub async fn create_workflow(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateWorkflow>,
) -> Response {
    let CreateWorkflow {
        name,
        status,
        view_ids,
        platforms,
        interaction_types,
        conditions,
        action,
    } = payload;

    if let Err(err) = validate_workflow(&name, &conditions, &action) {
        return JsonResponse::bad_request(&err.to_string()).into_response();
    }

    let record = NewWorkflowRecord {
        name,
        status: status.unwrap_or(WorkflowStatus::Draft),
        view_ids,
        platforms,
        interaction_types,
        conditions,
        action,
        system_type: None,
    };

    match app_state.workflow_repo.create_workflow(record).await {
        Ok(workflow) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "workflow": workflow
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error creating workflow");
            JsonResponse::server_error("Failed to create workflow").into_response()
        }
    }
}

pub async fn list_workflows(State(app_state): State<AppState>) -> Response {
    let version = match app_state.workflow_repo.ordering_version().await {
        Ok(v) => v,
        Err(e) => {
            error!(?e, "DB error reading ordering version");
            return JsonResponse::server_error("Failed to fetch workflows").into_response();
        }
    };
    match app_state.workflow_repo.list_workflows().await {
        Ok(workflows) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "workflows": workflows,
                "ordering_version": version
            })),
        )
            .into_response(),
        Err(e) => {
            error!(?e, "DB error listing workflows");
            JsonResponse::server_error("Failed to fetch workflows").into_response()
        }
    }
}

pub async fn get_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Response {
    match app_state.workflow_repo.find_workflow(workflow_id).await {
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
            error!(?e, "DB error fetching workflow");
            JsonResponse::server_error("Failed to fetch workflow").into_response()
        }
    }
}

pub async fn update_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
    Json(payload): Json<UpdateWorkflow>,
) -> Response {
    let existing = match app_state.workflow_repo.find_workflow(workflow_id).await {
        Ok(Some(workflow)) => workflow,
        Ok(None) => return JsonResponse::not_found("Workflow not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching workflow");
            return JsonResponse::server_error("Failed to update workflow").into_response();
        }
    };

    if existing.is_system() {
        // Only conditions are editable on system workflows; their name,
        // scope, and action semantics are fixed.
        let touches_fixed_fields = payload.name.is_some()
            || payload.action.is_some()
            || payload.view_ids.is_some()
            || payload.platforms.is_some()
            || payload.interaction_types.is_some();
        if touches_fixed_fields {
            return JsonResponse::forbidden_with_code(
                "Only the conditions of a system workflow can be edited",
                "system-workflow",
            )
            .into_response();
        }
    }

    let changes = WorkflowChanges {
        name: payload.name.unwrap_or(existing.name),
        view_ids: payload.view_ids.unwrap_or(existing.view_ids),
        platforms: payload.platforms.unwrap_or(existing.platforms),
        interaction_types: payload
            .interaction_types
            .unwrap_or(existing.interaction_types),
        conditions: payload.conditions.unwrap_or(existing.conditions),
        action: payload.action.unwrap_or(existing.action),
    };

    if let Err(err) = validate_workflow(&changes.name, &changes.conditions, &changes.action) {
        return JsonResponse::bad_request(&err.to_string()).into_response();
    }

    match app_state
        .workflow_repo
        .update_workflow(workflow_id, changes)
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
            error!(?e, "DB error updating workflow");
            JsonResponse::server_error("Failed to update workflow").into_response()
        }
    }
}

pub async fn delete_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<Uuid>,
) -> Response {
    match app_state.workflow_repo.find_workflow(workflow_id).await {
        Ok(Some(workflow)) if workflow.is_system() => {
            return JsonResponse::forbidden_with_code(
                "System workflows cannot be deleted, only paused",
                "system-workflow",
            )
            .into_response();
        }
        Ok(Some(_)) => {}
        Ok(None) => return JsonResponse::not_found("Workflow not found").into_response(),
        Err(e) => {
            error!(?e, "DB error fetching workflow");
            return JsonResponse::server_error("Failed to delete workflow").into_response();
        }
    }

    match app_state.workflow_repo.delete_workflow(workflow_id).await {
        Ok(true) => JsonResponse::success("Workflow deleted").into_response(),
        Ok(false) => JsonResponse::not_found("Workflow not found").into_response(),
        Err(e) => {
            error!(?e, "DB error deleting workflow");
            JsonResponse::server_error("Failed to delete workflow").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::workflow_repository::MockWorkflowRepository;
    use crate::engine::test_support::{build_state, workflow_fixture};
    use crate::models::workflow::{
        Condition, ConditionField, FieldOperator, SystemWorkflowType, WorkflowAction,
    };
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(resp: Response) -> Value {
        let body = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn create_rejects_mixed_condition_dialects() {
        let state = build_state(None, None, None, None, None);
        let payload = CreateWorkflow {
            name: "Mixed".into(),
            status: None,
            view_ids: vec![],
            platforms: vec![],
            interaction_types: vec![],
            conditions: vec![
                Condition::Field {
                    field: ConditionField::Content,
                    operator: FieldOperator::Contains,
                    value: serde_json::json!("spam"),
                },
                Condition::Prompt {
                    prompt: "is spam".into(),
                },
            ],
            action: WorkflowAction::Archive,
        };

        let resp = create_workflow(State(state), Json(payload)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_persists_valid_workflow() {
        let created = workflow_fixture(WorkflowAction::Archive);
        let mut repo = MockWorkflowRepository::new();
        repo.expect_create_workflow()
            .times(1)
            .withf(|record| {
                record.system_type.is_none() && record.status == WorkflowStatus::Draft
            })
            .returning(move |_| {
                let wf = created.clone();
                Box::pin(async move { Ok(wf) })
            });
        let state = build_state(None, Some(repo), None, None, None);

        let payload = CreateWorkflow {
            name: "Tag VIPs".into(),
            status: None,
            view_ids: vec![],
            platforms: vec![],
            interaction_types: vec![],
            conditions: vec![],
            action: WorkflowAction::AddTag {
                tags: vec!["vip".into()],
            },
        };
        let resp = create_workflow(State(state), Json(payload)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["success"], Value::Bool(true));
    }

    #[tokio::test]
    async fn delete_refuses_system_workflow() {
        let mut system = workflow_fixture(WorkflowAction::Archive);
        system.system_type = Some(SystemWorkflowType::AutoArchive);

        let mut repo = MockWorkflowRepository::new();
        repo.expect_find_workflow().returning(move |_| {
            let wf = system.clone();
            Box::pin(async move { Ok(Some(wf)) })
        });
        let state = build_state(None, Some(repo), None, None, None);

        let resp = delete_workflow(State(state), Path(Uuid::new_v4())).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = body_json(resp).await;
        assert_eq!(json["code"], "system-workflow");
    }

    #[tokio::test]
    async fn update_allows_condition_edit_on_system_workflow() {
        let mut system = workflow_fixture(WorkflowAction::Moderate {
            verbs: Default::default(),
        });
        system.system_type = Some(SystemWorkflowType::AutoModerator);
        let updated = system.clone();

        let mut repo = MockWorkflowRepository::new();
        let found = system.clone();
        repo.expect_find_workflow().returning(move |_| {
            let wf = found.clone();
            Box::pin(async move { Ok(Some(wf)) })
        });
        repo.expect_update_workflow()
            .times(1)
            .withf(|_, changes| changes.conditions.len() == 1)
            .returning(move |_, _| {
                let wf = updated.clone();
                Box::pin(async move { Ok(Some(wf)) })
            });
        let state = build_state(None, Some(repo), None, None, None);

        let payload = UpdateWorkflow {
            conditions: Some(vec![Condition::Prompt {
                prompt: "obvious scams".into(),
            }]),
            ..Default::default()
        };
        let resp = update_workflow(State(state), Path(system.id), Json(payload)).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn update_refuses_action_change_on_system_workflow() {
        let mut system = workflow_fixture(WorkflowAction::Moderate {
            verbs: Default::default(),
        });
        system.system_type = Some(SystemWorkflowType::AutoModerator);

        let mut repo = MockWorkflowRepository::new();
        let found = system.clone();
        repo.expect_find_workflow().returning(move |_| {
            let wf = found.clone();
            Box::pin(async move { Ok(Some(wf)) })
        });
        let state = build_state(None, Some(repo), None, None, None);

        let payload = UpdateWorkflow {
            action: Some(WorkflowAction::Archive),
            ..Default::default()
        };
        let resp = update_workflow(State(state), Path(system.id), Json(payload)).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
