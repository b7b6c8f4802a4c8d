use xee_name::{Name, XML_NAMESPACE};
use xee_xpath::Tree;
use xot::{Axis, NameId, Node, Value, Xot};

use crate::error::Result;

/// The expanded name of an element or attribute, with the prefix it is
/// written with at `node`.
pub(crate) fn prefixed_name(xot: &Xot, node: Node, name_id: NameId) -> Name {
    let name = Name::from_xot(name_id, xot);
    if name.namespace().is_none() {
        return name;
    }
    let scope = if xot.is_element(node) {
        node
    } else {
        xot.parent(node).unwrap_or(node)
    };
    let prefix = xot
        .prefix_for_namespace(scope, xot.namespace_for_name(name_id))
        .map(|prefix| xot.prefix_str(prefix).to_string());
    name.with_prefix(prefix)
}

/// All namespace declarations in scope for a source element, as
/// `(prefix, uri)` pairs.
pub(crate) fn in_scope_declarations(source: &Tree, node: Node) -> Vec<(String, String)> {
    let xot = source.xot();
    source
        .namespace_nodes(node)
        .into_iter()
        .filter_map(|namespace| match xot.value(namespace) {
            Value::Namespace(namespace) => Some((
                xot.prefix_str(namespace.prefix()).to_string(),
                xot.namespace_str(namespace.namespace()).to_string(),
            )),
            _ => None,
        })
        .collect()
}

fn lookup_prefix<'a>(xot: &'a Xot, element: Node, prefix: &str) -> Option<&'a str> {
    let mut current = Some(element);
    while let Some(node) = current {
        for (prefix_id, namespace_id) in xot.namespace_declarations(node) {
            if xot.prefix_str(prefix_id) == prefix {
                return Some(xot.namespace_str(namespace_id));
            }
        }
        current = xot.parent(node).filter(|parent| xot.is_element(*parent));
    }
    None
}

/// Declare `prefix` as `uri` on `element` unless that binding is already
/// in scope.
pub(crate) fn declare(xot: &mut Xot, element: Node, prefix: &str, uri: &str) {
    if uri == XML_NAMESPACE || lookup_prefix(xot, element, prefix) == Some(uri) {
        return;
    }
    let prefix = xot.add_prefix(prefix);
    let namespace = xot.add_namespace(uri);
    xot.namespaces_mut(element).insert(prefix, namespace);
}

/// Make sure `uri` can be written on `element`, either for the element
/// name itself or for one of its attributes.
///
/// Attributes need a non-empty prefix. When the preferred prefix is
/// unavailable a fresh `nsN` prefix is declared instead.
pub(crate) fn ensure_namespace(
    xot: &mut Xot,
    element: Node,
    uri: &str,
    preferred: Option<&str>,
    attribute: bool,
) {
    if uri.is_empty() || uri == XML_NAMESPACE {
        return;
    }
    let namespace = xot.add_namespace(uri);
    if let Some(prefix) = xot.prefix_for_namespace(element, namespace) {
        if !attribute || !xot.prefix_str(prefix).is_empty() {
            return;
        }
    }
    let preferred = preferred.filter(|prefix| !(attribute && prefix.is_empty()));
    let prefix = match preferred {
        Some(prefix) if lookup_prefix(xot, element, prefix).is_none() => prefix.to_string(),
        _ => fresh_prefix(xot, element),
    };
    let prefix = xot.add_prefix(&prefix);
    xot.namespaces_mut(element).insert(prefix, namespace);
}

fn fresh_prefix(xot: &Xot, element: Node) -> String {
    let mut i = 0;
    loop {
        let prefix = format!("ns{}", i);
        if lookup_prefix(xot, element, &prefix).is_none() {
            return prefix;
        }
        i += 1;
    }
}

/// Append text to `parent`.
///
/// Empty text is dropped. So is whitespace directly under the document
/// node, where a well-formed document cannot hold text.
pub(crate) fn append_text(xot: &mut Xot, parent: Node, text: &str) -> Result<()> {
    let at_root = matches!(xot.value(parent), Value::Document);
    if text.is_empty() || (at_root && text.trim().is_empty()) {
        return Ok(());
    }
    let node = xot.new_text(text);
    xot.append(parent, node)?;
    Ok(())
}

/// Set an attribute on `element`. Attributes with nowhere to go are
/// dropped.
pub(crate) fn set_attribute(xot: &mut Xot, element: Node, name: &Name, value: String) {
    if !xot.is_element(element) {
        return;
    }
    let name_id = name.add_name_id(xot);
    xot.attributes_mut(element).insert(name_id, value);
    if let Some(uri) = name.namespace() {
        ensure_namespace(xot, element, uri, name.prefix(), true);
    }
}

/// Create an element named `name` as the last child of `parent`.
pub(crate) fn append_element(
    xot: &mut Xot,
    parent: Node,
    name: &Name,
    declarations: &[(String, String)],
) -> Result<Node> {
    let name_id = name.add_name_id(xot);
    let element = xot.new_element(name_id);
    xot.append(parent, element)?;
    for (prefix, uri) in declarations {
        declare(xot, element, prefix, uri);
    }
    if let Some(uri) = name.namespace() {
        ensure_namespace(xot, element, uri, name.prefix(), false);
    }
    Ok(element)
}

/// Deep copy a source node, from another arena, under `parent`.
///
/// Copied elements carry every namespace in scope at the source, so the
/// copy reads the same wherever it lands.
pub(crate) fn copy_node(source: &Tree, node: Node, xot: &mut Xot, parent: Node) -> Result<()> {
    let source_xot = source.xot();
    match source_xot.value(node) {
        Value::Document => {
            for child in source_xot.children(node) {
                copy_node(source, child, xot, parent)?;
            }
        }
        Value::Element(element) => {
            let name = prefixed_name(source_xot, node, element.name());
            let declarations = in_scope_declarations(source, node);
            let copy = append_element(xot, parent, &name, &declarations)?;
            for attribute in source_xot.axis(Axis::Attribute, node) {
                copy_node(source, attribute, xot, copy)?;
            }
            for child in source_xot.children(node) {
                copy_node(source, child, xot, copy)?;
            }
        }
        Value::Attribute(attribute) => {
            let name = prefixed_name(source_xot, node, attribute.name());
            set_attribute(xot, parent, &name, attribute.value().to_string());
        }
        Value::Text(text) => append_text(xot, parent, text.get())?,
        Value::Comment(comment) => {
            let comment = xot.new_comment(comment.get());
            xot.append(parent, comment)?;
        }
        Value::ProcessingInstruction(pi) => {
            let target = xot.add_name(source_xot.name_ns_str(pi.target()).0);
            let pi = xot.new_processing_instruction(target, pi.data());
            xot.append(parent, pi)?;
        }
        Value::Namespace(namespace) => {
            if xot.is_element(parent) {
                declare(
                    xot,
                    parent,
                    source_xot.prefix_str(namespace.prefix()),
                    source_xot.namespace_str(namespace.namespace()),
                );
            }
        }
    }
    Ok(())
}
