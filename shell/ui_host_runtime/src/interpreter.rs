//! Descriptor tree interpretation.
//!
//! One render pass reads the trust level once, then walks the tree: hidden
//! nodes are dropped together with their subtree, registered types are handed
//! to their renderer, and unknown types become a fallback node so a single bad
//! descriptor never takes its siblings down with it.

use crate::descriptor::DescriptorNode;
use crate::form::FormState;
use crate::registry::ComponentRegistry;
use crate::render::RenderNode;
use crate::trust::{TrustLevel, TrustLevelSource};
use crate::visibility::is_visible;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub struct Interpreter {
    registry: Arc<ComponentRegistry>,
    trust: Arc<dyn TrustLevelSource>,
}

impl Interpreter {
    pub fn new(registry: Arc<ComponentRegistry>, trust: Arc<dyn TrustLevelSource>) -> Self {
        Self { registry, trust }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn trust_level(&self) -> TrustLevel {
        self.trust.current()
    }

    /// Renders `node` for the trust level current at call time.
    pub fn render(&self, node: Option<&DescriptorNode>, form: &FormState) -> Option<RenderNode> {
        self.scope(form).render(node)
    }

    /// Renders a sibling list, skipping nodes that produce nothing.
    pub fn render_all(&self, nodes: &[DescriptorNode], form: &FormState) -> Vec<RenderNode> {
        self.scope(form).render_nodes(nodes)
    }

    fn scope<'a>(&'a self, form: &'a FormState) -> RenderScope<'a> {
        RenderScope {
            interpreter: self,
            trust_level: self.trust.current(),
            form,
        }
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("registry", &self.registry)
            .field("trust_level", &self.trust.current())
            .finish()
    }
}

/// Context handed to renderers for one render pass.
#[derive(Clone, Copy)]
pub struct RenderScope<'a> {
    interpreter: &'a Interpreter,
    trust_level: TrustLevel,
    form: &'a FormState,
}

impl<'a> RenderScope<'a> {
    pub fn trust_level(&self) -> TrustLevel {
        self.trust_level
    }

    pub fn form(&self) -> &'a FormState {
        self.form
    }

    pub fn value(&self, field_id: &str) -> Option<&'a Value> {
        self.form.get(field_id)
    }

    pub fn render(&self, node: Option<&DescriptorNode>) -> Option<RenderNode> {
        let node = node?;

        if !is_visible(node, self.trust_level) {
            return None;
        }

        match self.interpreter.registry.resolve(&node.kind) {
            Some(renderer) => Some(renderer.render(node, self)),
            None => {
                warn!(component = %node.kind, "SDUI component not registered");
                Some(RenderNode::fallback(&node.kind))
            }
        }
    }

    pub fn render_nodes(&self, nodes: &[DescriptorNode]) -> Vec<RenderNode> {
        nodes
            .iter()
            .filter_map(|node| self.render(Some(node)))
            .collect()
    }

    /// Renders `node.children` in order.
    pub fn render_children(&self, node: &DescriptorNode) -> Vec<RenderNode> {
        self.render_nodes(&node.children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Params;
    use crate::render::Dispatch;
    use crate::trust::SharedTrustLevel;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn render_group(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
        RenderNode::new("group").with_children(scope.render_children(node))
    }

    fn render_leaf(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
        RenderNode::new("leaf")
            .with_opt_prop("text", node.prop("text").cloned())
            .with_action(node.action.clone())
    }

    fn registry() -> Arc<ComponentRegistry> {
        let mut registry = ComponentRegistry::new();
        registry.register("group", render_group);
        registry.register("leaf", render_leaf);
        Arc::new(registry)
    }

    fn node(value: serde_json::Value) -> DescriptorNode {
        DescriptorNode::from_value(value).expect("descriptor decodes")
    }

    #[test]
    fn absent_node_renders_nothing() {
        let interpreter = Interpreter::new(registry(), Arc::new(TrustLevel::Guest));
        assert_eq!(interpreter.render(None, &FormState::new()), None);
    }

    #[test]
    fn hidden_subtree_is_omitted_entirely() {
        let interpreter = Interpreter::new(registry(), Arc::new(TrustLevel::Guest));
        let tree = node(json!({
            "type": "group",
            "visibleWhen": { "userLevel": ["verified"] },
            "children": [
                { "type": "leaf", "props": { "text": "no constraint of its own" } }
            ]
        }));

        assert_eq!(interpreter.render(Some(&tree), &FormState::new()), None);
    }

    #[test]
    fn hidden_subtree_renderer_is_never_invoked() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        fn counting(_node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
            CALLS.fetch_add(1, Ordering::SeqCst);
            RenderNode::new("counted")
        }

        let mut registry = ComponentRegistry::new();
        registry.register("group", render_group);
        registry.register("counted", counting);
        let interpreter = Interpreter::new(Arc::new(registry), Arc::new(TrustLevel::Guest));

        let tree = node(json!({
            "type": "group",
            "children": [{
                "type": "group",
                "visibleWhen": { "userLevel": ["registered"] },
                "children": [{ "type": "counted" }]
            }]
        }));

        let rendered = interpreter
            .render(Some(&tree), &FormState::new())
            .expect("outer group renders");
        assert!(rendered.children.is_empty());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unknown_type_does_not_break_siblings() {
        let interpreter = Interpreter::new(registry(), Arc::new(TrustLevel::Guest));
        let page = vec![
            node(json!({ "type": "leaf", "props": { "text": "first" } })),
            node(json!({ "type": "HoloDeck" })),
            node(json!({ "type": "leaf", "props": { "text": "third" } })),
        ];

        let rendered = interpreter.render_all(&page, &FormState::new());

        assert_eq!(rendered.len(), 3);
        assert_eq!(rendered[0].prop_str("text"), Some("first"));
        assert!(rendered[1].is_fallback());
        assert_eq!(rendered[1].prop_str("type"), Some("HoloDeck"));
        assert_eq!(rendered[2].prop_str("text"), Some("third"));
    }

    #[test]
    fn unknown_type_nested_in_container_degrades_locally() {
        let interpreter = Interpreter::new(registry(), Arc::new(TrustLevel::Guest));
        let tree = node(json!({
            "type": "group",
            "children": [
                { "type": "Mystery", "children": [{ "type": "leaf" }] },
                { "type": "leaf" }
            ]
        }));

        let rendered = interpreter
            .render(Some(&tree), &FormState::new())
            .expect("group renders");
        let kinds: Vec<&str> = rendered.children.iter().map(|c| c.kind.as_str()).collect();
        assert_eq!(kinds, vec!["unknown", "leaf"]);
        assert!(rendered.children[0].children.is_empty());
    }

    #[test]
    fn trust_level_is_read_on_every_pass() {
        let trust = SharedTrustLevel::new(TrustLevel::Guest);
        let interpreter = Interpreter::new(registry(), Arc::new(trust.clone()));
        let tree = node(json!({
            "type": "leaf",
            "visibleWhen": { "userLevel": ["registered", "verified"] }
        }));
        let form = FormState::new();

        assert_eq!(interpreter.render(Some(&tree), &form), None);

        trust.set(TrustLevel::Registered);
        assert!(interpreter.render(Some(&tree), &form).is_some());
    }

    #[test]
    fn renderer_receives_descriptor_untouched() {
        let interpreter = Interpreter::new(registry(), Arc::new(TrustLevel::Verified));
        let tree = node(json!({
            "type": "leaf",
            "props": { "text": "Go" },
            "action": { "type": "custom_nav", "params": { "x": 1 } }
        }));
        let before = tree.clone();

        let rendered = interpreter
            .render(Some(&tree), &FormState::new())
            .expect("leaf renders");

        assert_eq!(tree, before);
        let calls = Cell::new(0);
        let mut seen: Option<(String, Params)> = None;
        let mut dispatch = |kind: &str, params: &Params| {
            calls.set(calls.get() + 1);
            seen = Some((kind.to_string(), params.clone()));
        };
        rendered.press(&mut dispatch as &mut dyn Dispatch);

        assert_eq!(calls.get(), 1);
        let (kind, params) = seen.expect("dispatched");
        assert_eq!(kind, "custom_nav");
        assert_eq!(params.get("x"), Some(&json!(1)));
    }
}
