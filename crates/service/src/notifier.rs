//! Notifications and action outcomes returned by mutating endpoints.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// Collects user-facing messages during one request.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    items: Vec<Notification>,
}

impl Notifier {
    pub fn new() -> Self { Self::default() }

    pub fn add(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.items.push(Notification { kind, message: message.into() });
    }

    pub fn success(&mut self, message: impl Into<String>) { self.add(NotificationKind::Success, message) }
    pub fn info(&mut self, message: impl Into<String>) { self.add(NotificationKind::Info, message) }
    pub fn warning(&mut self, message: impl Into<String>) { self.add(NotificationKind::Warning, message) }
    pub fn error(&mut self, message: impl Into<String>) { self.add(NotificationKind::Error, message) }

    pub fn has_errors(&self) -> bool { self.items.iter().any(|n| n.kind == NotificationKind::Error) }

    pub fn into_vec(self) -> Vec<Notification> { self.items }
}

/// JSON equivalent of "flash message + redirect".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionOutcome<T> {
    pub success: bool,
    pub data: Option<T>,
    pub notifications: Vec<Notification>,
    pub redirect: Option<String>,
}

impl<T> ActionOutcome<T> {
    pub fn ok(data: T, notifier: Notifier) -> Self {
        Self { success: !notifier.has_errors(), data: Some(data), notifications: notifier.into_vec(), redirect: None }
    }

    pub fn failed(notifier: Notifier) -> Self {
        Self { success: false, data: None, notifications: notifier.into_vec(), redirect: None }
    }

    pub fn redirect_to(mut self, url: impl Into<String>) -> Self {
        self.redirect = Some(url.into());
        self
    }
}

impl ActionOutcome<()> {
    pub fn done(notifier: Notifier) -> Self { Self::ok((), notifier) }
}

/// Edit URL of an entity, e.g. `/admin/category/7`.
pub fn edit_url(entity: &str, id: i32) -> String { format!("/admin/{entity}/{id}") }

/// List URL of an entity, e.g. `/admin/category`.
pub fn list_url(entity: &str) -> String { format!("/admin/{entity}") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_success_reflects_errors() {
        let mut n = Notifier::new();
        n.success("saved");
        let o = ActionOutcome::ok(1, n).redirect_to(edit_url("category", 1));
        assert!(o.success);
        assert_eq!(o.redirect.as_deref(), Some("/admin/category/1"));

        let mut n = Notifier::new();
        n.error("boom");
        let o = ActionOutcome::ok(1, n);
        assert!(!o.success);
    }
}
