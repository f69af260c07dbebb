use tracing::warn;

use crate::models::interaction::Interaction;
use crate::models::workflow::{Condition, ConditionField, FieldOperator, Workflow};
use crate::services::ai::Classifier;

/// Evaluates a workflow's conditions against an interaction.
///
/// Field conditions AND together; prompt conditions OR together and are
/// the only place the classifier is consulted. An empty condition list
/// matches unconditionally. Classifier failures (timeout, transport,
/// malformed reply) count as non-match for that prompt.
pub async fn workflow_matches(
    workflow: &Workflow,
    interaction: &Interaction,
    classifier: &dyn Classifier,
) -> bool {
    let mut prompts: Vec<&str> = Vec::new();

    for condition in &workflow.conditions {
        match condition {
            Condition::Field {
                field,
                operator,
                value,
            } => {
                if !evaluate_field(*field, *operator, value, interaction) {
                    return false;
                }
            }
            Condition::Prompt { prompt } => prompts.push(prompt),
        }
    }

    if prompts.is_empty() {
        return true;
    }

    for prompt in prompts {
        match classifier.matches(prompt, interaction).await {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                warn!(
                    workflow_id = %workflow.id,
                    interaction_id = %interaction.id,
                    %err,
                    "classifier call failed; treating prompt as non-match"
                );
            }
        }
    }
    false
}

pub(crate) fn evaluate_field(
    field: ConditionField,
    operator: FieldOperator,
    expected: &serde_json::Value,
    interaction: &Interaction,
) -> bool {
    match field {
        ConditionField::Content => {
            text_op(operator, &interaction.content, expected.as_str().unwrap_or(""))
        }
        ConditionField::AuthorHandle => text_op(
            operator,
            &interaction.author_handle,
            expected.as_str().unwrap_or(""),
        ),
        ConditionField::AuthorFollowerCount => numeric_op(
            operator,
            interaction.author_follower_count as f64,
            expected.as_f64(),
        ),
        ConditionField::LikeCount => {
            numeric_op(operator, interaction.like_count as f64, expected.as_f64())
        }
        ConditionField::AuthorIsVerified => match (operator, expected.as_bool()) {
            (FieldOperator::Equals, Some(b)) => interaction.author_is_verified == b,
            (FieldOperator::NotEquals, Some(b)) => interaction.author_is_verified != b,
            _ => false,
        },
    }
}

fn text_op(operator: FieldOperator, actual: &str, expected: &str) -> bool {
    let actual_lower = actual.to_lowercase();
    let expected_lower = expected.to_lowercase();
    match operator {
        FieldOperator::Contains => actual_lower.contains(&expected_lower),
        FieldOperator::NotContains => !actual_lower.contains(&expected_lower),
        FieldOperator::Equals => actual_lower == expected_lower,
        FieldOperator::NotEquals => actual_lower != expected_lower,
        // Ordering operators are rejected at save time for text fields.
        _ => false,
    }
}

fn numeric_op(operator: FieldOperator, actual: f64, expected: Option<f64>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    match operator {
        FieldOperator::Equals => actual == expected,
        FieldOperator::NotEquals => actual != expected,
        FieldOperator::GreaterThan => actual > expected,
        FieldOperator::LessThan => actual < expected,
        FieldOperator::GreaterOrEqual => actual >= expected,
        FieldOperator::LessOrEqual => actual <= expected,
        FieldOperator::Contains | FieldOperator::NotContains => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interaction::{
        DispatchState, InteractionKind, InteractionStatus, Platform,
    };
    use crate::models::workflow::{WorkflowAction, WorkflowStatus};
    use crate::services::ai::mock::MockClassifier;
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn interaction(content: &str) -> Interaction {
        let now = OffsetDateTime::now_utc();
        Interaction {
            id: Uuid::new_v4(),
            platform: Platform::Twitter,
            kind: InteractionKind::Mention,
            external_id: "m-1".into(),
            author_handle: "drew".into(),
            author_follower_count: 2_000,
            author_is_verified: true,
            content: content.into(),
            like_count: 12,
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

    fn workflow_with(conditions: Vec<Condition>) -> Workflow {
        let now = OffsetDateTime::now_utc();
        Workflow {
            id: Uuid::new_v4(),
            name: "Conditions".into(),
            status: WorkflowStatus::Active,
            priority: 1,
            view_ids: vec![],
            platforms: vec![],
            interaction_types: vec![],
            conditions,
            action: WorkflowAction::Archive,
            system_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn empty_conditions_always_match() {
        let classifier = MockClassifier::default();
        let wf = workflow_with(vec![]);
        assert!(workflow_matches(&wf, &interaction("anything"), &classifier).await);
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn field_conditions_are_anded() {
        let classifier = MockClassifier::default();
        let wf = workflow_with(vec![
            Condition::Field {
                field: ConditionField::Content,
                operator: FieldOperator::Contains,
                value: json!("refund"),
            },
            Condition::Field {
                field: ConditionField::LikeCount,
                operator: FieldOperator::GreaterThan,
                value: json!(10),
            },
        ]);

        assert!(workflow_matches(&wf, &interaction("I want a refund"), &classifier).await);

        // Flipping any single condition to false fails the workflow.
        let mut few_likes = interaction("I want a refund");
        few_likes.like_count = 1;
        assert!(!workflow_matches(&wf, &few_likes, &classifier).await);
        assert!(!workflow_matches(&wf, &interaction("great product"), &classifier).await);
    }

    #[tokio::test]
    async fn prompt_conditions_are_ored() {
        let classifier =
            MockClassifier::with_verdicts(&[("is angry", false), ("asks for refund", true)]);
        let wf = workflow_with(vec![
            Condition::Prompt {
                prompt: "is angry".into(),
            },
            Condition::Prompt {
                prompt: "asks for refund".into(),
            },
        ]);
        assert!(workflow_matches(&wf, &interaction("refund please"), &classifier).await);
    }

    #[tokio::test]
    async fn first_true_prompt_short_circuits() {
        let classifier =
            MockClassifier::with_verdicts(&[("first", true), ("second", true)]);
        let wf = workflow_with(vec![
            Condition::Prompt {
                prompt: "first".into(),
            },
            Condition::Prompt {
                prompt: "second".into(),
            },
        ]);
        assert!(workflow_matches(&wf, &interaction("hi"), &classifier).await);
        assert_eq!(classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn classifier_failure_counts_as_non_match() {
        let classifier = MockClassifier {
            fail_all: true,
            ..Default::default()
        };
        let wf = workflow_with(vec![Condition::Prompt {
            prompt: "anything".into(),
        }]);
        assert!(!workflow_matches(&wf, &interaction("hi"), &classifier).await);
    }

    #[test]
    fn text_comparisons_are_case_insensitive() {
        let i = interaction("Buy NOW limited offer");
        assert!(evaluate_field(
            ConditionField::Content,
            FieldOperator::Contains,
            &json!("buy now"),
            &i
        ));
        assert!(evaluate_field(
            ConditionField::AuthorHandle,
            FieldOperator::Equals,
            &json!("Drew"),
            &i
        ));
    }

    #[test]
    fn numeric_boundaries() {
        let i = interaction("x");
        assert!(evaluate_field(
            ConditionField::AuthorFollowerCount,
            FieldOperator::GreaterOrEqual,
            &json!(2000),
            &i
        ));
        assert!(!evaluate_field(
            ConditionField::AuthorFollowerCount,
            FieldOperator::GreaterThan,
            &json!(2000),
            &i
        ));
        assert!(evaluate_field(
            ConditionField::LikeCount,
            FieldOperator::LessOrEqual,
            &json!(12),
            &i
        ));
    }

    #[test]
    fn boolean_equality() {
        let i = interaction("x");
        assert!(evaluate_field(
            ConditionField::AuthorIsVerified,
            FieldOperator::Equals,
            &json!(true),
            &i
        ));
        assert!(evaluate_field(
            ConditionField::AuthorIsVerified,
            FieldOperator::NotEquals,
            &json!(false),
            &i
        ));
    }
}
