//! Confirmation gate for destructive actions.

/// A pending delete, shown to whoever confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePrompt<'a> {
    /// Delete one notification.
    One {
        /// Id of the notification.
        id: &'a str,
        /// Its title, when the notification is held locally.
        title: Option<&'a str>,
    },
    /// Delete the selected notifications.
    Selected {
        /// How many are selected.
        count: usize,
    },
}

impl DeletePrompt<'_> {
    /// Question to put to the user.
    #[must_use]
    pub fn question(&self) -> String {
        match self {
            Self::One {
                title: Some(title), ..
            } => format!("Delete notification \"{title}\"?"),
            Self::One { id, title: None } => format!("Delete notification {id}?"),
            Self::Selected { count: 1 } => "Delete 1 selected notification?".to_string(),
            Self::Selected { count } => format!("Delete {count} selected notifications?"),
        }
    }
}

/// Decides whether a delete goes ahead.
pub trait Confirm: Send + Sync {
    /// Return `true` to proceed.
    fn confirm(&self, prompt: &DeletePrompt<'_>) -> bool;
}

/// Approves every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &DeletePrompt<'_>) -> bool {
        true
    }
}

impl<F> Confirm for F
where
    F: Fn(&DeletePrompt<'_>) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &DeletePrompt<'_>) -> bool {
        self(prompt)
    }
}
