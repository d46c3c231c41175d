/// LIFO of page ids for one mini-app session.
///
/// Never empty: the entry page stays at the bottom and `pop` refuses to remove
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageStack {
    entries: Vec<String>,
}

impl PageStack {
    pub fn new(entry: impl Into<String>) -> Self {
        Self {
            entries: vec![entry.into()],
        }
    }

    pub fn current(&self) -> &str {
        self.entries.last().map(String::as_str).unwrap_or_default()
    }

    pub fn entry(&self) -> &str {
        self.entries.first().map(String::as_str).unwrap_or_default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn can_go_back(&self) -> bool {
        self.entries.len() > 1
    }

    /// Appends `page_id` unless it is already on top. Returns whether the
    /// stack changed.
    pub fn push(&mut self, page_id: impl Into<String>) -> bool {
        let page_id = page_id.into();
        if self.current() == page_id {
            return false;
        }

        self.entries.push(page_id);
        true
    }

    /// Removes the top entry and returns the new current page, or `None`
    /// without mutating when only the entry page is left.
    pub fn pop(&mut self) -> Option<&str> {
        if !self.can_go_back() {
            return None;
        }

        self.entries.pop();
        Some(self.current())
    }
}

/// Successful outcome of a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Pushed { page_id: String },
    /// The target was already the current page; nothing changed.
    AlreadyCurrent,
    Popped { page_id: String },
    /// Back on the entry page; the host was asked to exit the mini-app.
    ExitRequested,
    Submitted,
    ValueChanged,
    Toasted,
    /// Not owned by the session; handed to the host.
    Forwarded,
}

impl Transition {
    /// Whether the visible page or its field values changed.
    pub fn needs_render(&self) -> bool {
        matches!(
            self,
            Transition::Pushed { .. } | Transition::Popped { .. } | Transition::ValueChanged
        )
    }
}

/// Why a transition was refused. The session is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Refusal {
    #[error("required fields missing: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("page '{0}' is not defined by this mini-app")]
    UnknownPage(String),
    #[error("action '{action}' is missing parameter '{param}'")]
    MissingParam {
        action: &'static str,
        param: &'static str,
    },
}

pub type TransitionResult = Result<Transition, Refusal>;
