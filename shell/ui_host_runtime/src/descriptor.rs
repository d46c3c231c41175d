//! Descriptor data received from the backend.
//!
//! Payloads are normalized while they are decoded: the three action encodings
//! found in served screens collapse into one [`Action`], and form inputs that
//! only carry `props.name` get that name as their field id. Malformed node
//! fields fall back to their defaults instead of failing the payload. Nothing
//! past this module sees the raw shapes.

use crate::trust::TrustLevel;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::debug;

/// Loosely typed key-value bag used for props and action parameters.
pub type Params = Map<String, Value>;

/// Declarative action fired when the user interacts with a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub params: Params,
}

impl Action {
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }
}

/// Trust levels allowed to see a node. `None` means no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleWhen {
    pub user_level: Option<BTreeSet<TrustLevel>>,
}

impl VisibleWhen {
    pub fn levels(levels: impl IntoIterator<Item = TrustLevel>) -> Self {
        Self {
            user_level: Some(levels.into_iter().collect()),
        }
    }

    pub fn admits(&self, level: TrustLevel) -> bool {
        match &self.user_level {
            Some(levels) => levels.contains(&level),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    #[default]
    Default,
    Fullscreen,
}

impl StyleMode {
    fn from_value(value: &Value) -> Self {
        value
            .as_str()
            .filter(|raw| raw.eq_ignore_ascii_case("fullscreen"))
            .map_or(StyleMode::Default, |_| StyleMode::Fullscreen)
    }
}

impl<'de> Deserialize<'de> for StyleMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(StyleMode::from_value(&Value::deserialize(deserializer)?))
    }
}

/// One typed node of a server-driven screen.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub struct DescriptorNode {
    pub kind: String,
    pub props: Params,
    pub children: Vec<DescriptorNode>,
    pub id: Option<String>,
    pub visible_when: Option<VisibleWhen>,
    pub action: Option<Action>,
    pub style_mode: StyleMode,
    validation_required: bool,
}

impl DescriptorNode {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn with_children(mut self, children: Vec<DescriptorNode>) -> Self {
        self.children = children;
        self
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn label(&self) -> Option<&str> {
        self.props
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
    }

    /// `props.required` or `validation.required`, using JSON truthiness.
    pub fn is_required(&self) -> bool {
        self.validation_required || self.props.get("required").is_some_and(is_truthy)
    }

    /// Name used when reporting this node as a missing required field.
    pub fn display_name(&self) -> &str {
        self.label()
            .or(self.id.as_deref())
            .unwrap_or(self.kind.as_str())
    }
}

/// JavaScript-style truthiness, which is what served payloads are written against.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

impl From<Value> for DescriptorNode {
    /// Never fails: malformed fields fall back to their empty form so one bad
    /// node cannot reject its siblings. A non-string `type` is kept in
    /// stringified form and later renders as a fallback.
    fn from(value: Value) -> Self {
        let Value::Object(mut raw) = value else {
            return Self::new(kind_to_string(&value));
        };

        let props = match raw.remove("props") {
            Some(Value::Object(map)) => map,
            _ => Params::new(),
        };

        let id = raw.get("id").and_then(scalar_to_string).or_else(|| {
            props
                .get("name")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
        });

        let action = normalize_action(raw.get("action").unwrap_or(&Value::Null), &props);
        let visible_when = raw.get("visibleWhen").and_then(parse_visible_when);
        let validation_required = raw
            .get("validation")
            .and_then(|validation| validation.get("required"))
            .is_some_and(is_truthy);

        Self {
            kind: raw.get("type").map(kind_to_string).unwrap_or_default(),
            children: nodes_from_value(raw.remove("children").unwrap_or(Value::Null)),
            style_mode: raw
                .get("styleMode")
                .map(StyleMode::from_value)
                .unwrap_or_default(),
            props,
            id,
            visible_when,
            action,
            validation_required,
        }
    }
}

fn kind_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn nodes_from_value(value: Value) -> Vec<DescriptorNode> {
    match value {
        Value::Array(items) => items.into_iter().map(DescriptorNode::from).collect(),
        _ => Vec::new(),
    }
}

/// `visibleWhen` applies only when it is an object; a `userLevel` that is not
/// an array imposes no constraint.
fn parse_visible_when(value: &Value) -> Option<VisibleWhen> {
    let constraint = value.as_object()?;
    let user_level = constraint
        .get("userLevel")
        .and_then(Value::as_array)
        .map(|names| parse_levels(names.iter().filter_map(Value::as_str)));

    Some(VisibleWhen { user_level })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn parse_levels<'a>(names: impl Iterator<Item = &'a str>) -> BTreeSet<TrustLevel> {
    names
        .filter_map(|name| match name.parse::<TrustLevel>() {
            Ok(level) => Some(level),
            Err(err) => {
                debug!("ignoring visibility constraint: {err}");
                None
            }
        })
        .collect()
}

fn normalize_action(node_action: &Value, props: &Params) -> Option<Action> {
    action_from_value(node_action, props)
        .or_else(|| {
            props
                .get("action")
                .and_then(|value| action_from_value(value, props))
        })
        .or_else(|| {
            props
                .get("onPress")
                .and_then(|on_press| on_press.get("action"))
                .and_then(Value::as_str)
                .filter(|kind| !kind.is_empty())
                .map(|kind| Action::new(kind, Params::new()))
        })
}

fn action_from_value(value: &Value, props: &Params) -> Option<Action> {
    match value {
        Value::Object(map) => {
            let kind = map
                .get("type")
                .and_then(Value::as_str)
                .filter(|kind| !kind.is_empty())?;
            let params = map
                .get("params")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Some(Action::new(kind, params))
        }
        Value::String(kind) if !kind.is_empty() => {
            let params = props
                .get("actionParams")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Some(Action::new(kind.as_str(), params))
        }
        _ => None,
    }
}

/// One page of a mini-app.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default)]
    pub style_mode: StyleMode,
    #[serde(default, deserialize_with = "lenient_nodes")]
    pub components: Vec<DescriptorNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Navigation {
    #[serde(default)]
    pub initial_page_id: Option<String>,
    #[serde(default)]
    pub guest_page_id: Option<String>,
}

/// A named bundle of pages plus navigation metadata.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MiniAppDefinition {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub name: Option<String>,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub navigation: Navigation,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(scalar_to_string(&Value::deserialize(deserializer)?))
}

fn lenient_nodes<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<DescriptorNode>, D::Error> {
    Ok(nodes_from_value(Value::deserialize(deserializer)?))
}

/// Page id given to the only page of a screen served without `pages`.
pub const SINGLE_SCREEN_PAGE_ID: &str = "main";

impl MiniAppDefinition {
    /// Wraps a plain descriptor screen as a one-page mini-app.
    pub fn single_screen(title: Option<String>, node: DescriptorNode) -> Self {
        let page = Page {
            id: SINGLE_SCREEN_PAGE_ID.to_string(),
            title: title.clone().unwrap_or_default(),
            style_mode: node.style_mode,
            components: vec![node],
        };

        Self {
            id: None,
            name: title,
            pages: vec![page],
            navigation: Navigation {
                initial_page_id: Some(SINGLE_SCREEN_PAGE_ID.to_string()),
                guest_page_id: None,
            },
        }
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|page| page.id == page_id)
    }

    pub fn contains_page(&self, page_id: &str) -> bool {
        self.page(page_id).is_some()
    }

    /// Entry page for a session started at `level`: the guest entry for guests
    /// when one is declared, otherwise the initial page, otherwise the first page.
    pub fn entry_page_id(&self, level: TrustLevel) -> Option<&str> {
        let guest_entry = self
            .navigation
            .guest_page_id
            .as_deref()
            .filter(|_| level == TrustLevel::Guest);

        guest_entry
            .or(self.navigation.initial_page_id.as_deref())
            .or_else(|| self.pages.first().map(|page| page.id.as_str()))
    }

    /// Field ids used by more than one descriptor on the same page, as
    /// `(page_id, field_id)` pairs.
    pub fn duplicate_field_ids(&self) -> Vec<(String, String)> {
        let mut duplicates = Vec::new();

        for page in &self.pages {
            let mut seen = BTreeSet::new();
            let mut reported = BTreeSet::new();
            let mut stack: Vec<&DescriptorNode> = page.components.iter().rev().collect();

            while let Some(node) = stack.pop() {
                if let Some(id) = node.id.as_deref() {
                    if !seen.insert(id) && reported.insert(id) {
                        duplicates.push((page.id.clone(), id.to_string()));
                    }
                }
                stack.extend(node.children.iter().rev());
            }
        }

        duplicates
    }
}
