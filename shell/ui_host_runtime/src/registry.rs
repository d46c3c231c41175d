use crate::descriptor::DescriptorNode;
use crate::interpreter::RenderScope;
use crate::render::RenderNode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Turns one descriptor into a rendered node.
///
/// Renderers that compose children recurse through [`RenderScope`]; the
/// interpreter never descends on their behalf.
pub trait Renderer: Send + Sync {
    fn render(&self, node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode;
}

impl<F> Renderer for F
where
    F: Fn(&DescriptorNode, &RenderScope<'_>) -> RenderNode + Send + Sync,
{
    fn render(&self, node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
        self(node, scope)
    }
}

/// Descriptor type name to renderer lookup.
///
/// Filled once at startup, then shared read-only with the interpreter.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    renderers: HashMap<String, Arc<dyn Renderer>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<R>(&mut self, kind: impl Into<String>, renderer: R)
    where
        R: Renderer + 'static,
    {
        self.register_shared(kind, Arc::new(renderer));
    }

    pub fn register_shared(&mut self, kind: impl Into<String>, renderer: Arc<dyn Renderer>) {
        self.renderers.insert(kind.into(), renderer);
    }

    /// Points `alias` at whatever `target` currently resolves to. Returns
    /// false, leaving the registry untouched, when `target` is unknown.
    pub fn alias(&mut self, alias: impl Into<String>, target: &str) -> bool {
        match self.renderers.get(target).cloned() {
            Some(renderer) => {
                self.register_shared(alias, renderer);
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, kind: &str) -> Option<&dyn Renderer> {
        self.renderers.get(kind).map(|renderer| &**renderer)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.renderers.contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.renderers.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::FormState;
    use crate::interpreter::Interpreter;
    use crate::trust::TrustLevel;
    use rstest::rstest;

    fn render_a(_node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
        RenderNode::new("a")
    }

    fn render_b(_node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
        RenderNode::new("b")
    }

    fn renderer<F>(f: F) -> F
    where
        F: Fn(&DescriptorNode, &RenderScope<'_>) -> RenderNode + Send + Sync,
    {
        f
    }

    fn render_with(registry: ComponentRegistry, kind: &str) -> Option<RenderNode> {
        let interpreter = Interpreter::new(Arc::new(registry), Arc::new(TrustLevel::Guest));
        interpreter.render(Some(&DescriptorNode::new(kind)), &FormState::new())
    }

    #[rstest]
    #[case::empty_string("")]
    #[case::never_registered("WalletCard")]
    #[case::case_differs("Text")]
    fn unregistered_kind_resolves_to_none(#[case] kind: &str) {
        let mut registry = ComponentRegistry::new();
        registry.register("text", render_a);

        assert!(registry.resolve(kind).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ComponentRegistry::new();
        registry.register("text", render_a);
        registry.register("text", render_b);

        assert_eq!(registry.len(), 1);
        let rendered = render_with(registry, "text").expect("text renders");
        assert_eq!(rendered.kind, "b");
    }

    #[test]
    fn alias_shares_target_renderer() {
        let mut registry = ComponentRegistry::new();
        registry.register("button", render_a);

        assert!(registry.alias("Button", "button"));
        assert!(!registry.alias("Link", "anchor"));
        assert_eq!(registry.kinds(), vec!["Button", "button"]);

        let rendered = render_with(registry, "Button").expect("alias renders");
        assert_eq!(rendered.kind, "a");
    }

    #[test]
    fn closures_can_be_registered() {
        let mut registry = ComponentRegistry::new();
        let label = String::from("captured");
        registry.register(
            "badge",
            renderer(move |_node, _scope| {
                RenderNode::new("badge").with_prop("label", label.clone())
            }),
        );

        let rendered = render_with(registry, "badge").expect("badge renders");
        assert_eq!(rendered.prop_str("label"), Some("captured"));
    }
}
