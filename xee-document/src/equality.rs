// deep structural comparison of (sub)trees, possibly living in different
// arenas

use std::hash::{Hash, Hasher};

use xot::{Axis, Node, Value, Xot};

// names compare by (local name, namespace URI); the prefix is irrelevant
type Attributes<'a> = Vec<((&'a str, &'a str), &'a str)>;

fn attributes(xot: &Xot, node: Node) -> Attributes<'_> {
    let mut attributes = xot
        .axis(Axis::Attribute, node)
        .filter_map(|child| match xot.value(child) {
            Value::Attribute(attribute) => {
                Some((xot.name_ns_str(attribute.name()), &attribute.value()[..]))
            }
            _ => None,
        })
        .collect::<Vec<_>>();
    attributes.sort_unstable();
    attributes
}

/// Whether two nodes are equal by structure.
///
/// Namespace declarations and attribute order do not participate.
pub(crate) fn deep_equal(a_xot: &Xot, a: Node, b_xot: &Xot, b: Node) -> bool {
    let equal_here = match (a_xot.value(a), b_xot.value(b)) {
        (Value::Document, Value::Document) => true,
        (Value::Element(a_element), Value::Element(b_element)) => {
            a_xot.name_ns_str(a_element.name()) == b_xot.name_ns_str(b_element.name())
                && attributes(a_xot, a) == attributes(b_xot, b)
        }
        (Value::Text(a_text), Value::Text(b_text)) => a_text.get() == b_text.get(),
        (Value::Comment(a_comment), Value::Comment(b_comment)) => {
            a_comment.get() == b_comment.get()
        }
        (Value::ProcessingInstruction(a_pi), Value::ProcessingInstruction(b_pi)) => {
            a_xot.name_ns_str(a_pi.target()) == b_xot.name_ns_str(b_pi.target())
                && a_pi.data() == b_pi.data()
        }
        (Value::Attribute(a_attribute), Value::Attribute(b_attribute)) => {
            a_xot.name_ns_str(a_attribute.name()) == b_xot.name_ns_str(b_attribute.name())
                && a_attribute.value() == b_attribute.value()
        }
        (Value::Namespace(a_namespace), Value::Namespace(b_namespace)) => {
            a_xot.prefix_str(a_namespace.prefix()) == b_xot.prefix_str(b_namespace.prefix())
                && a_xot.namespace_str(a_namespace.namespace())
                    == b_xot.namespace_str(b_namespace.namespace())
        }
        _ => false,
    };
    if !equal_here {
        return false;
    }
    let mut a_children = a_xot.children(a);
    let mut b_children = b_xot.children(b);
    loop {
        match (a_children.next(), b_children.next()) {
            (None, None) => return true,
            (Some(a), Some(b)) => {
                if !deep_equal(a_xot, a, b_xot, b) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Hash a node consistently with [`deep_equal`].
pub(crate) fn deep_hash<H: Hasher>(xot: &Xot, node: Node, state: &mut H) {
    match xot.value(node) {
        Value::Document => 0u8.hash(state),
        Value::Element(element) => {
            1u8.hash(state);
            xot.name_ns_str(element.name()).hash(state);
            attributes(xot, node).hash(state);
        }
        Value::Text(text) => {
            2u8.hash(state);
            text.get().hash(state);
        }
        Value::Comment(comment) => {
            3u8.hash(state);
            comment.get().hash(state);
        }
        Value::ProcessingInstruction(pi) => {
            4u8.hash(state);
            xot.name_ns_str(pi.target()).hash(state);
            pi.data().hash(state);
        }
        Value::Attribute(attribute) => {
            5u8.hash(state);
            xot.name_ns_str(attribute.name()).hash(state);
            attribute.value().hash(state);
        }
        Value::Namespace(namespace) => {
            6u8.hash(state);
            xot.prefix_str(namespace.prefix()).hash(state);
            xot.namespace_str(namespace.namespace()).hash(state);
        }
    }
    for child in xot.children(node) {
        deep_hash(xot, child, state);
    }
    // end marker, so that siblings and children hash differently
    0xffu8.hash(state);
}
