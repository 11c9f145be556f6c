//! Request context of an authenticated admin and the audit trail of mutations.

use axum::{async_trait, extract::FromRequestParts, http::{request::Parts, StatusCode}, Json};
use serde::Serialize;
use tracing::warn;

use service::activity::log_activity;
use service::auth::domain::Claims;
use service::notifier::{edit_url, list_url, ActionOutcome, Notifier};

use crate::errors::JsonApiError;
use crate::routes::auth::ServerState;

/// Claims of the caller, injected by the bearer middleware.
#[derive(Clone, Debug)]
pub struct CurrentAdmin(pub Claims);

impl CurrentAdmin {
    pub fn id(&self) -> i32 { self.0.uid }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentAdmin {
    type Rejection = JsonApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentAdmin)
            .ok_or_else(|| JsonApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized", None))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    fn activity_prefix(self) -> &'static str {
        match self {
            Action::Create => "AddNew",
            Action::Update => "Edit",
            Action::Delete => "Delete",
        }
    }
}

/// Writes the activity log entry and bumps the mutation counter.
/// A failing log write is reported but never fails the request.
pub async fn audit(state: &ServerState, admin: &CurrentAdmin, entity: &str, action: Action, id: i32, comment: &str) {
    common::metrics::record_mutation(entity, action.verb());
    let activity_type = format!("{}{}", action.activity_prefix(), entity);
    if let Err(e) = log_activity(&state.db, Some(admin.id()), &activity_type, Some(entity), Some(id), comment).await {
        warn!(error = %e, %activity_type, "activity log write failed");
    }
}

/// Audits a mutation and wraps its result with a notification and a redirect.
///
/// `slug` is the URL segment of the entity, e.g. `category`.
pub async fn outcome<T: Serialize>(
    state: &ServerState,
    admin: &CurrentAdmin,
    entity: &str,
    slug: &str,
    action: Action,
    id: i32,
    data: T,
) -> Json<ActionOutcome<T>> {
    let message = match action {
        Action::Create => format!("{entity} created"),
        Action::Update => format!("{entity} updated"),
        Action::Delete => format!("{entity} deleted"),
    };
    audit(state, admin, entity, action, id, &message).await;
    let mut notifier = Notifier::new();
    notifier.success(message);
    let redirect = match action {
        Action::Create | Action::Update => edit_url(slug, id),
        Action::Delete => list_url(slug),
    };
    Json(ActionOutcome::ok(data, notifier).redirect_to(redirect))
}
