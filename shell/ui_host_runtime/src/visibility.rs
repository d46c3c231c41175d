use crate::descriptor::DescriptorNode;
use crate::trust::TrustLevel;

/// Whether `node` may be rendered for a caller at `level`.
///
/// A hidden node hides its whole subtree; callers must not descend into it.
pub fn is_visible(node: &DescriptorNode, level: TrustLevel) -> bool {
    node.visible_when
        .as_ref()
        .is_none_or(|constraint| constraint.admits(level))
}
