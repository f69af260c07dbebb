use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::interaction::{InteractionKind, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Paused,
    Draft,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Active => "active",
            WorkflowStatus::Paused => "paused",
            WorkflowStatus::Draft => "draft",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(WorkflowStatus::Active),
            "paused" => Some(WorkflowStatus::Paused),
            "draft" => Some(WorkflowStatus::Draft),
            _ => None,
        }
    }
}

/// Built-in workflows with fixed action semantics. They are seeded at
/// startup, cannot be deleted, and always evaluate ahead of the user tier
/// (auto-moderator first, then auto-archive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemWorkflowType {
    AutoModerator,
    AutoArchive,
}

impl SystemWorkflowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemWorkflowType::AutoModerator => "auto_moderator",
            SystemWorkflowType::AutoArchive => "auto_archive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_moderator" => Some(SystemWorkflowType::AutoModerator),
            "auto_archive" => Some(SystemWorkflowType::AutoArchive),
            _ => None,
        }
    }

    /// Evaluation rank within the system tier.
    pub fn rank(&self) -> i32 {
        match self {
            SystemWorkflowType::AutoModerator => 0,
            SystemWorkflowType::AutoArchive => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Numeric,
    Boolean,
}

/// Interaction fields a condition can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionField {
    Content,
    AuthorHandle,
    AuthorFollowerCount,
    LikeCount,
    AuthorIsVerified,
}

impl ConditionField {
    pub fn kind(&self) -> FieldKind {
        match self {
            ConditionField::Content | ConditionField::AuthorHandle => FieldKind::Text,
            ConditionField::AuthorFollowerCount | ConditionField::LikeCount => FieldKind::Numeric,
            ConditionField::AuthorIsVerified => FieldKind::Boolean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperator {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl FieldOperator {
    /// Whether this operator is defined for a field of the given kind.
    pub fn supports(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Text => matches!(
                self,
                FieldOperator::Contains
                    | FieldOperator::NotContains
                    | FieldOperator::Equals
                    | FieldOperator::NotEquals
            ),
            FieldKind::Numeric => matches!(
                self,
                FieldOperator::Equals
                    | FieldOperator::NotEquals
                    | FieldOperator::GreaterThan
                    | FieldOperator::LessThan
                    | FieldOperator::GreaterOrEqual
                    | FieldOperator::LessOrEqual
            ),
            FieldKind::Boolean => {
                matches!(self, FieldOperator::Equals | FieldOperator::NotEquals)
            }
        }
    }
}

/// One predicate of a workflow. Field conditions AND together; prompt
/// conditions OR together. A single workflow uses one dialect only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Field {
        field: ConditionField,
        operator: FieldOperator,
        value: serde_json::Value,
    },
    Prompt {
        prompt: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPriority {
    Low,
    Normal,
    High,
}

impl ReviewPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewPriority::Low => "low",
            ReviewPriority::Normal => "normal",
            ReviewPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(ReviewPriority::Low),
            "normal" => Some(ReviewPriority::Normal),
            "high" => Some(ReviewPriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationVerb {
    Delete,
    Block,
}

/// Per-interaction-type moderation verbs. Comments are removed; DM and
/// mention authors are blocked, since their content lives on the author's
/// side of the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationVerbs {
    pub comment: ModerationVerb,
    pub dm: ModerationVerb,
    pub mention: ModerationVerb,
}

impl Default for ModerationVerbs {
    fn default() -> Self {
        Self {
            comment: ModerationVerb::Delete,
            dm: ModerationVerb::Block,
            mention: ModerationVerb::Block,
        }
    }
}

impl ModerationVerbs {
    pub fn for_kind(&self, kind: InteractionKind) -> ModerationVerb {
        match kind {
            InteractionKind::Comment => self.comment,
            InteractionKind::Dm => self.dm,
            InteractionKind::Mention => self.mention,
        }
    }
}

/// The single action a workflow performs when it matches. Adding a
/// variant forces every executor match arm to be revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowAction {
    AutoRespond {
        response_text: String,
    },
    GenerateResponse {
        #[serde(default)]
        tone: Option<String>,
        #[serde(default)]
        ai_instructions: Option<String>,
    },
    Moderate {
        #[serde(default)]
        verbs: ModerationVerbs,
    },
    Archive,
    FlagForReview {
        priority: ReviewPriority,
    },
    AddTag {
        tags: Vec<String>,
    },
}

impl WorkflowAction {
    pub fn kind_str(&self) -> &'static str {
        match self {
            WorkflowAction::AutoRespond { .. } => "auto_respond",
            WorkflowAction::GenerateResponse { .. } => "generate_response",
            WorkflowAction::Moderate { .. } => "moderate",
            WorkflowAction::Archive => "archive",
            WorkflowAction::FlagForReview { .. } => "flag_for_review",
            WorkflowAction::AddTag { .. } => "add_tag",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub status: WorkflowStatus,
    /// Rank within the user tier; system workflows ignore it and are
    /// ordered by `SystemWorkflowType::rank`.
    pub priority: i32,
    /// Empty means "all views".
    pub view_ids: Vec<Uuid>,
    /// Empty means "all platforms".
    pub platforms: Vec<Platform>,
    /// Empty means "all interaction types".
    pub interaction_types: Vec<InteractionKind>,
    pub conditions: Vec<Condition>,
    pub action: WorkflowAction,
    pub system_type: Option<SystemWorkflowType>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Workflow {
    pub fn is_system(&self) -> bool {
        self.system_type.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateWorkflow {
    pub name: String,
    #[serde(default)]
    pub status: Option<WorkflowStatus>,
    #[serde(default)]
    pub view_ids: Vec<Uuid>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub interaction_types: Vec<InteractionKind>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub action: WorkflowAction,
}

/// Partial update; omitted fields keep their stored values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateWorkflow {
    pub name: Option<String>,
    pub view_ids: Option<Vec<Uuid>>,
    pub platforms: Option<Vec<Platform>>,
    pub interaction_types: Option<Vec<InteractionKind>>,
    pub conditions: Option<Vec<Condition>>,
    pub action: Option<WorkflowAction>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WorkflowValidationError {
    #[error("Workflow name is required")]
    EmptyName,
    #[error("A workflow cannot combine field and prompt conditions")]
    MixedConditionDialects,
    #[error("Operator {operator:?} is not defined for field {field:?}")]
    OperatorTypeMismatch {
        field: ConditionField,
        operator: FieldOperator,
    },
    #[error("Condition value does not match the field's type")]
    ValueTypeMismatch,
    #[error("Prompt conditions cannot be empty")]
    EmptyPrompt,
    #[error("auto_respond requires non-empty response text")]
    EmptyResponseText,
    #[error("add_tag requires at least one tag")]
    NoTags,
}

/// Save-time validation shared by create and update paths.
pub fn validate_workflow(
    name: &str,
    conditions: &[Condition],
    action: &WorkflowAction,
) -> Result<(), WorkflowValidationError> {
    if name.trim().is_empty() {
        return Err(WorkflowValidationError::EmptyName);
    }
    validate_conditions(conditions)?;
    validate_action(action)
}

pub fn validate_conditions(conditions: &[Condition]) -> Result<(), WorkflowValidationError> {
    let has_field = conditions
        .iter()
        .any(|c| matches!(c, Condition::Field { .. }));
    let has_prompt = conditions
        .iter()
        .any(|c| matches!(c, Condition::Prompt { .. }));
    if has_field && has_prompt {
        return Err(WorkflowValidationError::MixedConditionDialects);
    }

    for condition in conditions {
        match condition {
            Condition::Field {
                field,
                operator,
                value,
            } => {
                if !operator.supports(field.kind()) {
                    return Err(WorkflowValidationError::OperatorTypeMismatch {
                        field: *field,
                        operator: *operator,
                    });
                }
                let value_ok = match field.kind() {
                    FieldKind::Text => value.is_string(),
                    FieldKind::Numeric => value.is_number(),
                    FieldKind::Boolean => value.is_boolean(),
                };
                if !value_ok {
                    return Err(WorkflowValidationError::ValueTypeMismatch);
                }
            }
            Condition::Prompt { prompt } => {
                if prompt.trim().is_empty() {
                    return Err(WorkflowValidationError::EmptyPrompt);
                }
            }
        }
    }
    Ok(())
}

fn validate_action(action: &WorkflowAction) -> Result<(), WorkflowValidationError> {
    match action {
        WorkflowAction::AutoRespond { response_text } if response_text.trim().is_empty() => {
            Err(WorkflowValidationError::EmptyResponseText)
        }
        WorkflowAction::AddTag { tags } if tags.iter().all(|t| t.trim().is_empty()) => {
            Err(WorkflowValidationError::NoTags)
        }
        _ => Ok(()),
    }
}
