//! One running mini-app: its definition, page stack and form values.
//!
//! Every action a rendered node fires goes through [`MiniAppSession::dispatch`].
//! Page navigation, submission and value changes are handled here; anything
//! else is forwarded to the host untouched. Refusals leave the session exactly
//! as it was.

use crate::descriptor::{Action, DescriptorNode, MiniAppDefinition, Page, Params, StyleMode};
use crate::error::LoadError;
use crate::events::{ExitReason, HostEvent, HostSink, Severity, Toast};
use crate::form::FormState;
use crate::interpreter::Interpreter;
use crate::navigation::{PageStack, Refusal, Transition, TransitionResult};
use crate::render::{Dispatch, RenderNode, VALUE_CHANGE_ACTION};
use crate::trust::TrustLevel;
use crate::validator::find_missing_visible;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

pub const PUSH_PAGE_ACTION: &str = "@pushPage";
pub const POP_PAGE_ACTION: &str = "@popPage";
pub const SUBMIT_FORM_ACTION: &str = "@submitForm";
pub const TOAST_ACTION: &str = "@toast";
pub const REGISTER_ACTION: &str = "@register";

/// Host action `@register` is translated into.
pub const REGISTRATION_HOST_ACTION: &str = "registration";

const DEFAULT_SUBMIT_MESSAGE: &str = "Form submitted successfully!";
const DEFAULT_TOAST_MESSAGE: &str = "Notification";

/// What the host draws for the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedScreen {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mini_app: Option<String>,
    pub page_id: String,
    pub title: String,
    pub can_go_back: bool,
    /// Fullscreen pages draw their own chrome.
    pub show_header: bool,
    pub body: Option<RenderNode>,
}

#[derive(Debug, Clone)]
pub struct MiniAppSession {
    definition: MiniAppDefinition,
    stack: PageStack,
    form: FormState,
}

impl MiniAppSession {
    /// Opens the session on the entry page for `level`.
    pub fn start(definition: MiniAppDefinition, level: TrustLevel) -> Result<Self, LoadError> {
        let entry = definition
            .entry_page_id(level)
            .ok_or(LoadError::NoPages)?
            .to_string();

        if !definition.contains_page(&entry) {
            return Err(LoadError::UnknownEntryPage(entry));
        }

        info!(
            mini_app = definition.id.as_deref().unwrap_or("-"),
            entry = %entry,
            %level,
            "mini-app session started"
        );

        Ok(Self {
            definition,
            stack: PageStack::new(entry),
            form: FormState::new(),
        })
    }

    pub fn definition(&self) -> &MiniAppDefinition {
        &self.definition
    }

    pub fn stack(&self) -> &PageStack {
        &self.stack
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn current_page_id(&self) -> &str {
        self.stack.current()
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.definition.page(self.stack.current())
    }

    pub fn can_go_back(&self) -> bool {
        self.stack.can_go_back()
    }

    pub fn dispatch(
        &mut self,
        action_type: &str,
        params: &Params,
        level: TrustLevel,
        events: &mut impl HostSink,
    ) -> TransitionResult {
        debug!(action = action_type, "mini-app action");

        match action_type {
            VALUE_CHANGE_ACTION => {
                let id = params
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or(Refusal::MissingParam {
                        action: VALUE_CHANGE_ACTION,
                        param: "id",
                    })?;
                let value = params.get("value").cloned().unwrap_or(Value::Null);
                Ok(self.value_change(id, value))
            }
            PUSH_PAGE_ACTION => {
                let target = params
                    .get("pageId")
                    .and_then(Value::as_str)
                    .ok_or(Refusal::MissingParam {
                        action: PUSH_PAGE_ACTION,
                        param: "pageId",
                    })?;
                self.push(target, level, events)
            }
            POP_PAGE_ACTION => Ok(self.pop(events)),
            SUBMIT_FORM_ACTION => self.submit(params, level, events),
            TOAST_ACTION => {
                let message = params
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_TOAST_MESSAGE);
                let severity = Severity::parse_or(
                    params.get("type").and_then(Value::as_str),
                    Severity::Info,
                );
                events.emit(HostEvent::Toast(Toast::new(message, severity)));
                Ok(Transition::Toasted)
            }
            REGISTER_ACTION => {
                events.emit(HostEvent::Forward(Action::new(
                    REGISTRATION_HOST_ACTION,
                    Params::new(),
                )));
                Ok(Transition::Forwarded)
            }
            other => {
                events.emit(HostEvent::Forward(Action::new(other, params.clone())));
                Ok(Transition::Forwarded)
            }
        }
    }

    /// Validates the current page, then moves to `target`.
    pub fn push(
        &mut self,
        target: &str,
        level: TrustLevel,
        events: &mut impl HostSink,
    ) -> TransitionResult {
        self.validate_current(level, events)?;

        if !self.definition.contains_page(target) {
            warn!(page = target, "push refused: page not defined by mini-app");
            return Err(Refusal::UnknownPage(target.to_string()));
        }

        if self.stack.push(target) {
            Ok(Transition::Pushed {
                page_id: target.to_string(),
            })
        } else {
            debug!(page = target, "push ignored: page already current");
            Ok(Transition::AlreadyCurrent)
        }
    }

    /// Goes back one page, or asks the host to exit from the entry page.
    pub fn pop(&mut self, events: &mut impl HostSink) -> Transition {
        match self.stack.pop() {
            Some(page_id) => Transition::Popped {
                page_id: page_id.to_string(),
            },
            None => {
                events.emit(HostEvent::Exit(ExitReason::Back));
                Transition::ExitRequested
            }
        }
    }

    /// Validates the current page and hands the submission to the host.
    /// The stack is left alone; the host decides what follows.
    pub fn submit(
        &mut self,
        params: &Params,
        level: TrustLevel,
        events: &mut impl HostSink,
    ) -> TransitionResult {
        self.validate_current(level, events)?;

        let on_success = params.get("onSuccess").and_then(|on_success| on_success.get("params"));
        let message = on_success
            .and_then(|params| params.get("message"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SUBMIT_MESSAGE);
        let severity = Severity::parse_or(
            on_success
                .and_then(|params| params.get("type"))
                .and_then(Value::as_str),
            Severity::Success,
        );

        events.emit(HostEvent::Toast(Toast::new(message, severity)));
        events.emit(HostEvent::Submit(params.clone()));
        Ok(Transition::Submitted)
    }

    pub fn value_change(&mut self, field_id: &str, value: Value) -> Transition {
        self.form.set(field_id, value);
        Transition::ValueChanged
    }

    fn validate_current(
        &self,
        level: TrustLevel,
        events: &mut impl HostSink,
    ) -> Result<(), Refusal> {
        let Some(page) = self.current_page() else {
            return Ok(());
        };

        let missing = find_missing_visible(page, &self.form, level);
        if missing.is_empty() {
            return Ok(());
        }

        debug!(page = %page.id, ?missing, "validation refused transition");
        events.emit(HostEvent::Toast(Toast::new(
            format!("Please fill in required fields: {}", missing.join(", ")),
            Severity::Warning,
        )));
        Err(Refusal::MissingFields(missing))
    }

    /// Renders the current page inside its wrapper.
    pub fn render(&self, interpreter: &Interpreter) -> RenderedScreen {
        let page = self.current_page();
        let style_mode = page.map(|page| page.style_mode).unwrap_or_default();

        let title = page
            .map(|page| page.title.as_str())
            .filter(|title| !title.is_empty())
            .or(self.definition.name.as_deref())
            .unwrap_or_default()
            .to_string();

        let body = page.and_then(|page| {
            let wrapper = match style_mode {
                StyleMode::Fullscreen => "container",
                StyleMode::Default => "scrollview",
            };
            let root = DescriptorNode::new(wrapper).with_children(page.components.clone());
            interpreter.render(Some(&root), &self.form)
        });

        RenderedScreen {
            mini_app: self.definition.id.clone(),
            page_id: self.stack.current().to_string(),
            title,
            can_go_back: self.stack.can_go_back(),
            show_header: style_mode == StyleMode::Default,
            body,
        }
    }

    /// Binds this session to a trust level and event sink so rendered nodes
    /// can dispatch into it.
    pub fn dispatcher<'a, S: HostSink>(
        &'a mut self,
        level: TrustLevel,
        events: &'a mut S,
    ) -> SessionDispatch<'a, S> {
        SessionDispatch {
            session: self,
            level,
            events,
            outcomes: Vec::new(),
        }
    }
}

/// [`Dispatch`] adapter that feeds rendered-node actions into a session.
pub struct SessionDispatch<'a, S: HostSink> {
    session: &'a mut MiniAppSession,
    level: TrustLevel,
    events: &'a mut S,
    outcomes: Vec<TransitionResult>,
}

impl<S: HostSink> SessionDispatch<'_, S> {
    /// Outcomes of every dispatched action, oldest first.
    pub fn outcomes(&self) -> &[TransitionResult] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<TransitionResult> {
        self.outcomes
    }
}

impl<S: HostSink> Dispatch for SessionDispatch<'_, S> {
    fn dispatch(&mut self, action_type: &str, params: &Params) {
        let outcome = self
            .session
            .dispatch(action_type, params, self.level, &mut *self.events);
        self.outcomes.push(outcome);
    }
}
