use crate::descriptor::{DescriptorNode, Page};
use crate::form::{FormState, is_blank};
use crate::trust::TrustLevel;
use crate::visibility::is_visible;

/// Labels of required fields on `page` that have no usable value, in
/// descriptor order. Nested inputs are included.
pub fn find_missing_required(page: &Page, form: &FormState) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(&page.components, form, None, &mut missing);
    missing
}

/// Like [`find_missing_required`], but skips subtrees hidden at `level`:
/// inputs that were never rendered cannot be filled in.
pub fn find_missing_visible(page: &Page, form: &FormState, level: TrustLevel) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(&page.components, form, Some(level), &mut missing);
    missing
}

fn collect_missing(
    nodes: &[DescriptorNode],
    form: &FormState,
    level: Option<TrustLevel>,
    missing: &mut Vec<String>,
) {
    for node in nodes {
        if level.is_some_and(|level| !is_visible(node, level)) {
            continue;
        }

        if node.is_required() && is_missing(node, form) {
            missing.push(node.display_name().to_string());
        }

        collect_missing(&node.children, form, level, missing);
    }
}

fn is_missing(node: &DescriptorNode, form: &FormState) -> bool {
    match node.id.as_deref() {
        Some(id) => is_blank(form.get(id)),
        None => true,
    }
}
