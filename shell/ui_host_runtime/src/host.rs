//! Stdio host loop.
//!
//! A reader thread decodes host envelopes from stdin, a writer thread frames
//! shell envelopes onto stdout, and every piece of session state lives on the
//! loop thread in [`ShellHost`].

use crate::config::ShellConfig;
use crate::descriptor::Params;
use crate::error::HostError;
use crate::events::{ExitReason, HostEvent};
use crate::interpreter::Interpreter;
use crate::load::FetchResult;
use crate::protocol::{
    FRAME_TOO_LARGE, HostEnvelope, SHELL_TO_HOST_CAP, ShellEnvelope, encoded_len,
    error_envelope, reader_loop, ready_envelope, writer_loop,
};
use crate::registry::ComponentRegistry;
use crate::session::MiniAppSession;
use crate::trust::{SharedTrustLevel, TrustLevel};
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread;
use tracing::{debug, info, warn};

/// Session state machine driven by host envelopes.
#[derive(Debug)]
pub struct ShellHost {
    sid: String,
    interpreter: Interpreter,
    trust: SharedTrustLevel,
    session: Option<MiniAppSession>,
    rev: u64,
    next_message_id: u64,
    frame_cap: usize,
}

impl ShellHost {
    pub fn new(sid: impl Into<String>, registry: Arc<ComponentRegistry>, level: TrustLevel) -> Self {
        let trust = SharedTrustLevel::new(level);
        Self {
            sid: sid.into(),
            interpreter: Interpreter::new(registry, Arc::new(trust.clone())),
            trust,
            session: None,
            rev: 0,
            next_message_id: 1,
            frame_cap: SHELL_TO_HOST_CAP,
        }
    }

    /// Largest render payload the host is sent; bigger screens are reported
    /// as `frame_too_large` errors.
    pub fn with_frame_cap(mut self, frame_cap: usize) -> Self {
        self.frame_cap = frame_cap;
        self
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn session(&self) -> Option<&MiniAppSession> {
        self.session.as_ref()
    }

    pub fn trust_level(&self) -> TrustLevel {
        self.interpreter.trust_level()
    }

    /// Applies one inbound envelope and returns what to send back, in order.
    pub fn handle(&mut self, envelope: HostEnvelope) -> Vec<ShellEnvelope> {
        if envelope.sid() != self.sid {
            warn!(expected = %self.sid, got = %envelope.sid(), "sid mismatch; envelope ignored");
            return vec![self.error(
                "sid_mismatch",
                format!("envelope sid '{}' does not match '{}'", envelope.sid(), self.sid),
            )];
        }

        match envelope {
            HostEnvelope::Load { result, .. } => self.load(result),
            HostEnvelope::Intent { name, params, .. } => self.intent(&name, &params),
            HostEnvelope::Trust { level, .. } => self.set_trust(level),
            HostEnvelope::Close { .. } => {
                if self.session.take().is_some() {
                    info!("mini-app session closed by host");
                }
                Vec::new()
            }
        }
    }

    fn load(&mut self, result: FetchResult) -> Vec<ShellEnvelope> {
        let started = result
            .into_definition()
            .and_then(|definition| MiniAppSession::start(definition, self.trust_level()));

        match started {
            Ok(session) => {
                self.session = Some(session);
                self.render().into_iter().collect()
            }
            Err(err) => {
                warn!(error = %err, "screen load failed; keeping current session");
                vec![self.error(err.code(), err.to_string())]
            }
        }
    }

    fn intent(&mut self, name: &str, params: &Params) -> Vec<ShellEnvelope> {
        let level = self.trust_level();
        let Some(session) = self.session.as_mut() else {
            debug!(intent = name, "intent without a loaded session");
            return vec![self.error("no_session", format!("no session to handle '{name}'"))];
        };

        let mut events = Vec::new();
        let outcome = session.dispatch(name, params, level, &mut events);

        let mut out = Vec::with_capacity(events.len() + 1);
        for event in events {
            self.translate(event, &mut out);
        }

        match outcome {
            Ok(transition) if transition.needs_render() => out.extend(self.render()),
            Ok(transition) => debug!(?transition, "intent handled"),
            Err(refusal) => debug!(%refusal, "intent refused"),
        }

        out
    }

    fn translate(&mut self, event: HostEvent, out: &mut Vec<ShellEnvelope>) {
        match event {
            HostEvent::Toast(toast) => out.push(ShellEnvelope::Toast {
                sid: self.sid.clone(),
                message: toast.message,
                severity: toast.severity,
            }),
            HostEvent::Forward(action) => {
                let id = self.next_id();
                out.push(ShellEnvelope::Action {
                    sid: self.sid.clone(),
                    id,
                    name: action.kind,
                    params: action.params,
                });
            }
            HostEvent::Submit(params) => {
                let id = self.next_id();
                out.push(ShellEnvelope::Submit {
                    sid: self.sid.clone(),
                    id,
                    params,
                });
                out.push(self.exit(ExitReason::Submitted));
            }
            HostEvent::Exit(reason) => out.push(self.exit(reason)),
        }
    }

    fn set_trust(&mut self, level: TrustLevel) -> Vec<ShellEnvelope> {
        if level == self.trust_level() {
            return Vec::new();
        }

        info!(%level, "trust level changed");
        self.trust.set(level);
        self.render().into_iter().collect()
    }

    fn exit(&mut self, reason: ExitReason) -> ShellEnvelope {
        self.session = None;
        info!(?reason, "mini-app session ended");
        ShellEnvelope::Exit {
            sid: self.sid.clone(),
            reason,
        }
    }

    /// Renders the current page. A screen that cannot be framed is replaced
    /// by an error so the host knows its view is stale; `rev` only advances
    /// for renders that are actually sent.
    fn render(&mut self) -> Option<ShellEnvelope> {
        let screen = self.session.as_ref()?.render(&self.interpreter);
        let page_id = screen.page_id.clone();
        let envelope = ShellEnvelope::Render {
            sid: self.sid.clone(),
            rev: self.rev + 1,
            screen,
        };

        let fits = encoded_len(&envelope).is_ok_and(|len| len <= self.frame_cap);
        if !fits {
            warn!(page = %page_id, cap = self.frame_cap, "render exceeds frame cap");
            return Some(self.error(
                FRAME_TOO_LARGE,
                format!("render of page '{page_id}' exceeds {} byte frame cap", self.frame_cap),
            ));
        }

        self.rev += 1;
        debug!(rev = self.rev, page = %page_id, "render");
        Some(envelope)
    }

    fn error(&self, code: &str, message: String) -> ShellEnvelope {
        error_envelope(self.sid.clone(), code, message)
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_message_id;
        self.next_message_id += 1;
        id
    }
}

/// Bounded outbound queue. Host actions are dropped when it is full; every
/// other envelope waits for room.
struct Outbound {
    tx: SyncSender<ShellEnvelope>,
    capacity: usize,
    dropped: u64,
}

impl Outbound {
    fn new(tx: SyncSender<ShellEnvelope>, capacity: usize) -> Self {
        Self {
            tx,
            capacity,
            dropped: 0,
        }
    }

    fn send(&mut self, envelope: ShellEnvelope) -> Result<(), HostError> {
        if !envelope.is_droppable() {
            return self
                .tx
                .send(envelope)
                .map_err(|_| HostError::Disconnected("writer thread stopped"));
        }

        match self.tx.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_envelope)) => {
                self.dropped += 1;
                if self.dropped == 1 || self.dropped.is_power_of_two() {
                    warn!(
                        capacity = self.capacity,
                        dropped = self.dropped,
                        "outbound queue full; dropping host actions"
                    );
                }
                Ok(())
            }
            Err(TrySendError::Disconnected(_envelope)) => {
                Err(HostError::Disconnected("writer thread stopped"))
            }
        }
    }
}

/// Serves host envelopes on stdio until stdin closes.
pub fn run(registry: ComponentRegistry, config: ShellConfig) -> Result<(), HostError> {
    let (out_tx, out_rx) = mpsc::sync_channel(config.outbound_queue_cap);
    let (in_tx, in_rx) = mpsc::channel();

    let writer_handle = thread::spawn(move || writer_loop(io::stdout().lock(), out_rx));
    let reader_handle = thread::spawn(move || {
        let read_result = reader_loop(io::stdin().lock(), |envelope| {
            if in_tx.send(envelope).is_err() {
                debug!("host loop gone; discarding envelope");
            }
        });

        if let Err(err) = &read_result {
            warn!(error = %err, "reader loop terminated with error");
        }
        read_result
    });

    let mut outbound = Outbound::new(out_tx, config.outbound_queue_cap);
    let mut host = ShellHost::new(config.sid.clone(), Arc::new(registry), config.trust_level);
    info!(sid = %config.sid, level = %config.trust_level, "shell host ready");
    outbound.send(ready_envelope(config.sid))?;

    for envelope in in_rx {
        for reply in host.handle(envelope) {
            outbound.send(reply)?;
        }
    }

    // Stdin closed; let the writer drain what is queued.
    drop(outbound);

    reader_handle
        .join()
        .map_err(|_| HostError::ThreadPanicked("reader"))??;
    writer_handle
        .join()
        .map_err(|_| HostError::ThreadPanicked("writer"))??;

    info!("shell host stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::register_builtin_components;
    use crate::events::Severity;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    const SID: &str = "S1";

    fn host(level: TrustLevel) -> ShellHost {
        let mut registry = ComponentRegistry::new();
        register_builtin_components(&mut registry);
        ShellHost::new(SID, Arc::new(registry), level)
    }

    fn load(data: Value) -> HostEnvelope {
        HostEnvelope::Load {
            sid: SID.to_string(),
            result: FetchResult::ok(data),
        }
    }

    fn intent(name: &str, params: Value) -> HostEnvelope {
        HostEnvelope::Intent {
            sid: SID.to_string(),
            name: name.to_string(),
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    fn cedula() -> Value {
        json!({
            "id": "cedula",
            "name": "Online Cedula",
            "pages": [
                { "id": "welcome", "title": "Welcome", "components": [
                    { "type": "button", "props": { "title": "Start" },
                      "action": { "type": "@pushPage", "params": { "pageId": "details" } },
                      "visibleWhen": { "userLevel": ["registered", "verified"] } },
                    { "type": "button", "props": { "title": "Sign Up" },
                      "action": { "type": "@register", "params": {} },
                      "visibleWhen": { "userLevel": ["guest"] } }
                ]},
                { "id": "details", "title": "Personal Information", "components": [
                    { "id": "fullName", "type": "text-input",
                      "props": { "label": "Full Name", "required": true } },
                    { "type": "button", "props": { "title": "Submit" },
                      "action": { "type": "@submitForm", "params": {
                          "endpoint": "/tenant/miniapps/cedula/submit",
                          "onSuccess": { "type": "@toast", "params": { "message": "Application submitted!" } }
                      } } }
                ]}
            ],
            "navigation": { "initialPageId": "welcome", "guestPageId": "welcome" }
        })
    }

    fn rendered_page(envelope: &ShellEnvelope) -> (u64, &str) {
        match envelope {
            ShellEnvelope::Render { rev, screen, .. } => (*rev, screen.page_id.as_str()),
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[test]
    fn load_renders_entry_page() {
        let mut host = host(TrustLevel::Registered);

        let out = host.handle(load(cedula()));

        assert_eq!(out.len(), 1);
        assert_eq!(rendered_page(&out[0]), (1, "welcome"));
        assert!(host.session().is_some());
    }

    #[test]
    fn failed_load_reports_error_and_keeps_session() {
        let mut host = host(TrustLevel::Registered);
        host.handle(load(cedula()));

        let out = host.handle(HostEnvelope::Load {
            sid: SID.to_string(),
            result: FetchResult::failed("gateway timeout"),
        });

        assert_eq!(
            out,
            vec![ShellEnvelope::Error {
                sid: SID.to_string(),
                code: "fetch_failed".to_string(),
                message: "fetch failed: gateway timeout".to_string(),
            }]
        );
        assert_eq!(
            host.session().map(MiniAppSession::current_page_id),
            Some("welcome")
        );
    }

    #[test]
    fn mismatched_sid_is_reported() {
        let mut host = host(TrustLevel::Guest);

        let out = host.handle(HostEnvelope::Close {
            sid: "S2".to_string(),
        });

        assert!(matches!(
            out.as_slice(),
            [ShellEnvelope::Error { code, .. }] if code == "sid_mismatch"
        ));
    }

    #[test]
    fn intent_without_session_is_an_error() {
        let mut host = host(TrustLevel::Guest);

        let out = host.handle(intent("@popPage", json!({})));

        assert!(matches!(
            out.as_slice(),
            [ShellEnvelope::Error { code, .. }] if code == "no_session"
        ));
    }

    #[test]
    fn full_flow_from_welcome_to_submission() {
        let mut host = host(TrustLevel::Registered);
        host.handle(load(cedula()));

        let out = host.handle(intent("@pushPage", json!({ "pageId": "details" })));
        assert_eq!(rendered_page(&out[0]), (2, "details"));

        let out = host.handle(intent("@submitForm", json!({})));
        assert_eq!(
            out,
            vec![ShellEnvelope::Toast {
                sid: SID.to_string(),
                message: "Please fill in required fields: Full Name".to_string(),
                severity: Severity::Warning,
            }]
        );

        let out = host.handle(intent(
            "@onValueChange",
            json!({ "id": "fullName", "value": "Juan Dela Cruz" }),
        ));
        assert_eq!(rendered_page(&out[0]), (3, "details"));

        let submit = json!({ "endpoint": "/tenant/miniapps/cedula/submit" });
        let out = host.handle(intent("@submitForm", submit.clone()));
        assert_eq!(
            out,
            vec![
                ShellEnvelope::Toast {
                    sid: SID.to_string(),
                    message: "Form submitted successfully!".to_string(),
                    severity: Severity::Success,
                },
                ShellEnvelope::Submit {
                    sid: SID.to_string(),
                    id: 1,
                    params: submit.as_object().cloned().unwrap_or_default(),
                },
                ShellEnvelope::Exit {
                    sid: SID.to_string(),
                    reason: ExitReason::Submitted,
                },
            ]
        );
        assert!(host.session().is_none());
    }

    #[test]
    fn back_on_entry_page_exits_once() {
        let mut host = host(TrustLevel::Guest);
        host.handle(load(cedula()));

        let out = host.handle(intent("@popPage", json!({})));

        assert_eq!(
            out,
            vec![ShellEnvelope::Exit {
                sid: SID.to_string(),
                reason: ExitReason::Back,
            }]
        );
        assert!(host.session().is_none());
    }

    #[test]
    fn unknown_page_push_sends_nothing() {
        let mut host = host(TrustLevel::Registered);
        host.handle(load(cedula()));

        let out = host.handle(intent("@pushPage", json!({ "pageId": "nonexistentPage" })));

        assert!(out.is_empty());
        assert_eq!(
            host.session().map(MiniAppSession::current_page_id),
            Some("welcome")
        );
    }

    #[test]
    fn forwarded_actions_get_increasing_ids() {
        let mut host = host(TrustLevel::Guest);
        host.handle(load(cedula()));

        let first = host.handle(intent("@register", json!({})));
        let second = host.handle(intent("nav_marketplace", json!({ "tab": "shops" })));

        assert!(matches!(
            first.as_slice(),
            [ShellEnvelope::Action { id: 1, name, .. }] if name == "registration"
        ));
        assert!(matches!(
            second.as_slice(),
            [ShellEnvelope::Action { id: 2, name, .. }] if name == "nav_marketplace"
        ));
    }

    #[test]
    fn trust_change_rerenders_with_new_level() {
        let mut host = host(TrustLevel::Guest);
        host.handle(load(cedula()));

        let out = host.handle(HostEnvelope::Trust {
            sid: SID.to_string(),
            level: TrustLevel::Registered,
        });

        let [ShellEnvelope::Render { screen, .. }] = out.as_slice() else {
            panic!("expected a single render, got {out:?}");
        };
        let body = screen.body.as_ref().expect("body rendered");
        assert_eq!(body.children.len(), 1);
        assert_eq!(body.children[0].prop_str("label"), Some("Start"));

        let unchanged = host.handle(HostEnvelope::Trust {
            sid: SID.to_string(),
            level: TrustLevel::Registered,
        });
        assert!(unchanged.is_empty());
    }

    #[test]
    fn close_discards_session() {
        let mut host = host(TrustLevel::Guest);
        host.handle(load(cedula()));

        let out = host.handle(HostEnvelope::Close {
            sid: SID.to_string(),
        });

        assert!(out.is_empty());
        assert!(host.session().is_none());
    }

    #[test]
    fn oversized_render_is_reported_to_host() {
        let mut host = host(TrustLevel::Registered).with_frame_cap(64);

        let out = host.handle(load(cedula()));
        assert!(matches!(
            out.as_slice(),
            [ShellEnvelope::Error { code, message, .. }]
                if code == FRAME_TOO_LARGE && message.contains("'welcome'")
        ));

        let out = host.handle(intent("@pushPage", json!({ "pageId": "details" })));
        assert!(matches!(
            out.as_slice(),
            [ShellEnvelope::Error { code, .. }] if code == FRAME_TOO_LARGE
        ));
        assert_eq!(
            host.session().map(MiniAppSession::current_page_id),
            Some("details")
        );
    }

    #[test]
    fn render_revision_skips_unsent_screens() {
        let mut host = host(TrustLevel::Registered);
        host.handle(load(cedula()));
        host.frame_cap = 64;
        host.handle(intent("@pushPage", json!({ "pageId": "details" })));
        host.frame_cap = SHELL_TO_HOST_CAP;

        let out = host.handle(intent("@popPage", json!({})));
        assert_eq!(rendered_page(&out[0]), (2, "welcome"));
    }

    #[test]
    fn outbound_drops_actions_when_queue_is_full() {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut outbound = Outbound::new(tx, 1);

        outbound
            .send(ready_envelope(SID.to_string()))
            .expect("seed queue with one envelope");
        outbound
            .send(ShellEnvelope::Action {
                sid: SID.to_string(),
                id: 1,
                name: "nav_marketplace".to_string(),
                params: Params::new(),
            })
            .expect("full queue drops instead of failing");

        assert_eq!(outbound.dropped, 1);
        let seeded = rx.try_recv().expect("seed envelope remains queued");
        assert_eq!(seeded.kind(), "ready");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn outbound_reports_stopped_writer() {
        let (tx, rx) = mpsc::sync_channel(1);
        drop(rx);
        let mut outbound = Outbound::new(tx, 1);

        let err = outbound
            .send(ready_envelope(SID.to_string()))
            .expect_err("writer is gone");
        assert!(matches!(err, HostError::Disconnected(_)));
    }
}
