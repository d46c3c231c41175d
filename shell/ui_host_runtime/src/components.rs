use crate::descriptor::DescriptorNode;
use crate::interpreter::RenderScope;
use crate::registry::ComponentRegistry;
use crate::render::RenderNode;
use serde_json::Value;

/// Installs the atom renderers and their aliases.
pub fn register_builtin_components(registry: &mut ComponentRegistry) {
    registry.register("container", render_container);
    registry.register("scrollview", render_scrollview);
    registry.register("text", render_text);
    registry.register("heading", render_heading);
    registry.register("image", render_image);
    registry.register("button", render_button);
    registry.register("Input", render_input);
    registry.register("date-picker", render_date_picker);
    registry.register("icon", render_icon);

    for (alias, target) in [
        ("Text", "text"),
        ("Button", "button"),
        ("text-input", "Input"),
        ("textarea", "Input"),
    ] {
        registry.alias(alias, target);
    }
}

/// Registers `kind` as a presentational section the host draws itself: props
/// and action are forwarded as served and children are rendered in order.
pub fn register_passthrough(registry: &mut ComponentRegistry, kind: &str) {
    registry.register(kind, render_passthrough);
}

fn first_str<'a>(node: &'a DescriptorNode, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| node.prop(key).and_then(Value::as_str))
        .find(|value| !value.is_empty())
}

fn with_style(node: &DescriptorNode, out: RenderNode) -> RenderNode {
    out.with_opt_prop("style", node.prop("style").cloned())
}

fn render_container(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("container")).with_children(scope.render_children(node))
}

fn render_scrollview(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("scrollview"))
        .with_opt_prop(
            "contentContainerStyle",
            node.prop("contentContainerStyle").cloned(),
        )
        .with_children(scope.render_children(node))
}

fn render_text(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("text"))
        .with_prop("text", first_str(node, &["text", "content"]).unwrap_or_default())
        .with_action(node.action.clone())
}

fn render_heading(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("heading"))
        .with_prop("text", first_str(node, &["text", "content"]).unwrap_or_default())
}

fn render_image(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("image"))
        .with_opt_prop("source", first_str(node, &["source", "imageUrl"]))
}

fn render_button(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
    let variant = first_str(node, &["variant"]).unwrap_or("default");

    with_style(node, RenderNode::new("button"))
        .with_prop(
            "label",
            first_str(node, &["text", "label", "title"]).unwrap_or_default(),
        )
        .with_prop("variant", variant)
        .with_opt_prop("textStyle", node.prop("textStyle").cloned())
        .with_action(node.action.clone())
}

fn render_input(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
    let multiline = node.kind == "textarea"
        || node.prop("multiline").and_then(Value::as_bool).unwrap_or(false);
    let value = node
        .id
        .as_deref()
        .and_then(|id| scope.value(id))
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));

    with_style(node, RenderNode::new("input"))
        .with_opt_prop("label", node.label())
        .with_opt_prop("placeholder", first_str(node, &["placeholder"]))
        .with_prop(
            "keyboardType",
            first_str(node, &["keyboardType"]).unwrap_or("default"),
        )
        .with_prop("multiline", multiline)
        .with_opt_prop("rows", node.prop("rows").cloned())
        .with_prop("required", node.is_required())
        .with_prop("value", value)
        .bound_to(node.id.clone())
}

fn render_date_picker(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
    let value = node
        .id
        .as_deref()
        .and_then(|id| scope.value(id))
        .filter(|value| !value.is_null())
        .cloned();

    with_style(node, RenderNode::new("date-picker"))
        .with_opt_prop("label", node.label())
        .with_prop(
            "placeholder",
            first_str(node, &["placeholder"]).unwrap_or("Select Date"),
        )
        .with_prop("required", node.is_required())
        .with_opt_prop("value", value)
        .bound_to(node.id.clone())
}

fn render_icon(node: &DescriptorNode, _scope: &RenderScope<'_>) -> RenderNode {
    with_style(node, RenderNode::new("icon"))
        .with_opt_prop("name", first_str(node, &["name"]))
        .with_opt_prop("size", node.prop("size").cloned())
        .with_opt_prop("color", node.prop("color").cloned())
}

fn render_passthrough(node: &DescriptorNode, scope: &RenderScope<'_>) -> RenderNode {
    let mut out = RenderNode::new(node.kind.clone())
        .with_action(node.action.clone())
        .with_children(scope.render_children(node));
    out.props = node.props.clone();
    out
}
