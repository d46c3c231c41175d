use crate::descriptor::{Action, Params};
use serde::Serialize;
use serde_json::Value;

/// Kind given to nodes whose descriptor type is not registered.
pub const FALLBACK_KIND: &str = "unknown";

/// Action dispatched by input nodes when their value changes.
pub const VALUE_CHANGE_ACTION: &str = "@onValueChange";

/// The single channel rendered nodes use to signal intent.
pub trait Dispatch {
    fn dispatch(&mut self, action_type: &str, params: &Params);
}

impl<F> Dispatch for F
where
    F: FnMut(&str, &Params),
{
    fn dispatch(&mut self, action_type: &str, params: &Params) {
        self(action_type, params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub kind: String,
    #[serde(skip_serializing_if = "Params::is_empty")]
    pub props: Params,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Form field this node edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl RenderNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            props: Params::new(),
            children: Vec::new(),
            action: None,
            field: None,
        }
    }

    /// Placeholder for a descriptor type nothing is registered for.
    pub fn fallback(unknown_kind: &str) -> Self {
        Self::new(FALLBACK_KIND)
            .with_prop("type", unknown_kind)
            .with_prop(
                "message",
                format!("Unknown SDUI component: {unknown_kind}"),
            )
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_opt_prop(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with_prop(key, value),
            None => self,
        }
    }

    pub fn with_children(mut self, children: Vec<RenderNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_action(mut self, action: Option<Action>) -> Self {
        self.action = action;
        self
    }

    pub fn bound_to(mut self, field: Option<String>) -> Self {
        self.field = field;
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.kind == FALLBACK_KIND
    }

    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(Value::as_str)
    }

    /// Simulates a tap. Returns whether an action was dispatched.
    pub fn press<D: Dispatch + ?Sized>(&self, dispatch: &mut D) -> bool {
        match &self.action {
            Some(action) => {
                dispatch.dispatch(&action.kind, &action.params);
                true
            }
            None => false,
        }
    }

    /// Simulates the user editing this node's field.
    pub fn change<D: Dispatch + ?Sized>(&self, value: Value, dispatch: &mut D) -> bool {
        let Some(field) = &self.field else {
            return false;
        };

        let params = Params::from_iter([
            ("id".to_string(), Value::String(field.clone())),
            ("value".to_string(), value),
        ]);
        dispatch.dispatch(VALUE_CHANGE_ACTION, &params);
        true
    }

    pub fn find(&self, predicate: &impl Fn(&RenderNode) -> bool) -> Option<&RenderNode> {
        if predicate(self) {
            return Some(self);
        }

        self.children
            .iter()
            .find_map(|child| child.find(predicate))
    }

    pub fn find_field(&self, field_id: &str) -> Option<&RenderNode> {
        self.find(&|node| node.field.as_deref() == Some(field_id))
    }

    pub fn find_action(&self, action_type: &str) -> Option<&RenderNode> {
        self.find(&|node| {
            node.action
                .as_ref()
                .is_some_and(|action| action.kind == action_type)
        })
    }
}
