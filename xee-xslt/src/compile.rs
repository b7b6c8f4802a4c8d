use std::sync::Arc;

use rust_decimal::Decimal;
use xee_name::XSL_NAMESPACE;
use xot::{Axis, NameId, Node, Value, Xot};

use crate::ast::{
    Binding, BindingValue, DataType, Expression, Global, Instruction, Namespaces, Sort, Template,
};
use crate::error::{Error, Result};
use crate::output::prefixed_name;
use crate::pattern::Pattern;
use crate::stylesheet::Stylesheet;
use crate::value_template::ValueTemplate;

/// Compile stylesheet text.
///
/// The root element is either `xsl:stylesheet`/`xsl:transform` or, for a
/// simplified stylesheet, a literal result element that becomes the body
/// of a template matching `/`.
pub fn compile(stylesheet: &str) -> Result<Stylesheet> {
    let mut xot = Xot::new();
    let root = xot
        .parse(stylesheet)
        .map_err(|e| Error::Parse(e.to_string()))?;
    let document_element = xot
        .document_element(root)
        .map_err(|e| Error::Parse(e.to_string()))?;
    let stylesheet = Compiler { xot: &xot }.stylesheet(document_element)?;
    tracing::debug!(
        templates = stylesheet.templates.len(),
        globals = stylesheet.globals.len(),
        "compiled stylesheet"
    );
    Ok(stylesheet)
}

// XML whitespace is narrower than Unicode whitespace
fn is_xml_whitespace(s: &str) -> bool {
    s.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

struct Compiler<'a> {
    xot: &'a Xot,
}

impl<'a> Compiler<'a> {
    fn stylesheet(&self, root: Node) -> Result<Stylesheet> {
        let namespaces = self.namespaces(root, &Namespaces::default());
        match self.xsl_name(root) {
            Some("stylesheet" | "transform") => self.declarations(root, &namespaces),
            Some(_) => Err(Error::UnexpectedElement(self.display_name(root))),
            None if !self.has_xsl_version(root) => {
                Err(Error::NotAStylesheet(self.display_name(root)))
            }
            None => {
                let body = vec![self.literal_element(root, &namespaces, false)?];
                let template = Template {
                    pattern: Some(Pattern::compile("/", &namespaces)?),
                    name: None,
                    mode: None,
                    priority: None,
                    params: Vec::new(),
                    body,
                };
                Ok(Stylesheet {
                    templates: vec![template],
                    globals: Vec::new(),
                })
            }
        }
    }

    fn declarations(&self, root: Node, namespaces: &Namespaces) -> Result<Stylesheet> {
        let mut templates = Vec::new();
        let mut globals = Vec::new();
        for child in self.element_children(root) {
            match self.xsl_name(child) {
                Some("template") => templates.push(self.template(child, namespaces)?),
                Some("variable") => globals.push(Global {
                    binding: self.binding(child, namespaces, "variable", false)?,
                    param: false,
                }),
                Some("param") => globals.push(Global {
                    binding: self.binding(child, namespaces, "param", false)?,
                    param: true,
                }),
                Some("output" | "strip-space" | "preserve-space") => {}
                Some(local @ ("import" | "include")) => {
                    return Err(Error::Unsupported(local.to_string()))
                }
                Some(_) => return Err(Error::UnexpectedElement(self.display_name(child))),
                // top-level elements in other namespaces are data
                None => {}
            }
        }
        Ok(Stylesheet { templates, globals })
    }

    fn template(&self, node: Node, inherited: &Namespaces) -> Result<Template> {
        let namespaces = &self.namespaces(node, inherited);
        let pattern = self
            .attribute(node, "match")
            .map(|pattern| Pattern::compile(pattern, namespaces))
            .transpose()?;
        let name = self.attribute(node, "name").map(|name| name.trim().to_string());
        if pattern.is_none() && name.is_none() {
            return Err(Error::MissingAttribute {
                element: "template",
                attribute: "match",
            });
        }
        let mode = self.attribute(node, "mode").map(|mode| mode.trim().to_string());
        let priority = self
            .attribute(node, "priority")
            .map(|priority| {
                priority
                    .trim()
                    .parse::<Decimal>()
                    .map_err(|_| Error::InvalidAttribute {
                        attribute: "priority",
                        value: priority.to_string(),
                    })
            })
            .transpose()?;

        let preserve = self.preserve_space(node, false);
        let mut params = Vec::new();
        let mut body = Vec::new();
        for child in self.xot.children(node) {
            if self.xsl_name(child) == Some("param") {
                params.push(self.binding(child, namespaces, "param", preserve)?);
            } else if let Some(instruction) = self.item(child, namespaces, preserve)? {
                body.push(instruction);
            }
        }
        Ok(Template {
            pattern,
            name,
            mode,
            priority,
            params,
            body,
        })
    }

    fn body(&self, node: Node, namespaces: &Namespaces, preserve: bool) -> Result<Vec<Instruction>> {
        let mut body = Vec::new();
        for child in self.xot.children(node) {
            if let Some(instruction) = self.item(child, namespaces, preserve)? {
                body.push(instruction);
            }
        }
        Ok(body)
    }

    fn item(
        &self,
        node: Node,
        namespaces: &Namespaces,
        preserve: bool,
    ) -> Result<Option<Instruction>> {
        match self.xot.value(node) {
            Value::Text(text) => {
                let text = text.get();
                let keep = preserve || !is_xml_whitespace(text);
                Ok(keep.then(|| Instruction::Text(text.to_string())))
            }
            Value::Element(_) => match self.xsl_name(node) {
                Some(local) => self.instruction(node, local, namespaces, preserve),
                None => self.literal_element(node, namespaces, preserve).map(Some),
            },
            _ => Ok(None),
        }
    }

    fn instruction(
        &self,
        node: Node,
        local: &str,
        inherited: &Namespaces,
        preserve: bool,
    ) -> Result<Option<Instruction>> {
        let namespaces = &self.namespaces(node, inherited);
        let preserve = self.preserve_space(node, preserve);
        let instruction = match local {
            "apply-templates" => {
                let select = self.optional_expression(node, "select", namespaces)?;
                let mode = self.attribute(node, "mode").map(|mode| mode.trim().to_string());
                let mut sorts = Vec::new();
                let mut params = Vec::new();
                for child in self.element_children(node) {
                    match self.xsl_name(child) {
                        Some("sort") => sorts.push(self.sort(child, namespaces)?),
                        Some("with-param") => {
                            params.push(self.binding(child, namespaces, "with-param", preserve)?)
                        }
                        _ => return Err(Error::UnexpectedElement(self.display_name(child))),
                    }
                }
                Instruction::ApplyTemplates {
                    select,
                    mode,
                    sorts,
                    params,
                }
            }
            "call-template" => {
                let name = self.required(node, "call-template", "name")?.trim().to_string();
                let mut params = Vec::new();
                for child in self.element_children(node) {
                    match self.xsl_name(child) {
                        Some("with-param") => {
                            params.push(self.binding(child, namespaces, "with-param", preserve)?)
                        }
                        _ => return Err(Error::UnexpectedElement(self.display_name(child))),
                    }
                }
                Instruction::CallTemplate { name, params }
            }
            "value-of" => {
                Instruction::ValueOf(self.expression(node, "value-of", "select", namespaces)?)
            }
            "variable" => {
                Instruction::Variable(self.binding(node, namespaces, "variable", preserve)?)
            }
            "copy" => Instruction::Copy(self.body(node, namespaces, preserve)?),
            "copy-of" => {
                Instruction::CopyOf(self.expression(node, "copy-of", "select", namespaces)?)
            }
            "for-each" => {
                let select = self.expression(node, "for-each", "select", namespaces)?;
                let mut sorts = Vec::new();
                let mut body = Vec::new();
                for child in self.xot.children(node) {
                    if self.xsl_name(child) == Some("sort") {
                        sorts.push(self.sort(child, namespaces)?);
                    } else if let Some(instruction) = self.item(child, namespaces, preserve)? {
                        body.push(instruction);
                    }
                }
                Instruction::ForEach { select, sorts, body }
            }
            "if" => Instruction::If {
                test: self.expression(node, "if", "test", namespaces)?,
                body: self.body(node, namespaces, preserve)?,
            },
            "choose" => {
                let mut when = Vec::new();
                let mut otherwise = Vec::new();
                for child in self.element_children(node) {
                    let child_namespaces = &self.namespaces(child, namespaces);
                    let child_preserve = self.preserve_space(child, preserve);
                    match self.xsl_name(child) {
                        Some("when") => when.push((
                            self.expression(child, "when", "test", child_namespaces)?,
                            self.body(child, child_namespaces, child_preserve)?,
                        )),
                        Some("otherwise") => {
                            otherwise = self.body(child, child_namespaces, child_preserve)?
                        }
                        _ => return Err(Error::UnexpectedElement(self.display_name(child))),
                    }
                }
                if when.is_empty() {
                    return Err(Error::MissingChild {
                        element: "choose",
                        child: "when",
                    });
                }
                Instruction::Choose { when, otherwise }
            }
            "element" | "attribute" => {
                let element = if local == "element" { "element" } else { "attribute" };
                let name = ValueTemplate::parse(self.required(node, element, "name")?, namespaces)?;
                let namespace = self
                    .attribute(node, "namespace")
                    .map(|namespace| ValueTemplate::parse(namespace, namespaces))
                    .transpose()?;
                let body = self.body(node, namespaces, preserve)?;
                if local == "element" {
                    Instruction::Element {
                        name,
                        namespace,
                        namespaces: namespaces.clone(),
                        body,
                    }
                } else {
                    Instruction::Attribute {
                        name,
                        namespace,
                        namespaces: namespaces.clone(),
                        body,
                    }
                }
            }
            "text" => {
                let text = self
                    .xot
                    .children(node)
                    .filter_map(|child| self.xot.text_str(child))
                    .collect::<String>();
                if text.is_empty() {
                    return Ok(None);
                }
                Instruction::Text(text)
            }
            "comment" => Instruction::Comment(self.body(node, namespaces, preserve)?),
            "processing-instruction" => Instruction::ProcessingInstruction {
                name: ValueTemplate::parse(
                    self.required(node, "processing-instruction", "name")?,
                    namespaces,
                )?,
                body: self.body(node, namespaces, preserve)?,
            },
            "message" => {
                let terminate = match self.attribute(node, "terminate").map(str::trim) {
                    None | Some("no") => false,
                    Some("yes") => true,
                    Some(other) => {
                        return Err(Error::InvalidAttribute {
                            attribute: "terminate",
                            value: other.to_string(),
                        })
                    }
                };
                Instruction::Message {
                    terminate,
                    body: self.body(node, namespaces, preserve)?,
                }
            }
            // only meaningful inside extension instructions, which we don't
            // have
            "fallback" => return Ok(None),
            _ => return Err(Error::UnexpectedElement(self.display_name(node))),
        };
        Ok(Some(instruction))
    }

    fn literal_element(
        &self,
        node: Node,
        inherited: &Namespaces,
        preserve: bool,
    ) -> Result<Instruction> {
        let namespaces = &self.namespaces(node, inherited);
        let preserve = self.preserve_space(node, preserve);
        let name = match self.xot.value(node) {
            Value::Element(element) => prefixed_name(self.xot, node, element.name()),
            _ => return Err(Error::UnexpectedElement(self.display_name(node))),
        };
        let mut declarations = Vec::new();
        let mut attributes = Vec::new();
        for (prefix, namespace) in self.xot.namespace_declarations(node) {
            let uri = self.xot.namespace_str(namespace);
            if uri != XSL_NAMESPACE {
                declarations.push((self.xot.prefix_str(prefix).to_string(), uri.to_string()));
            }
        }
        for child in self.xot.axis(Axis::Attribute, node) {
            if let Value::Attribute(attribute) = self.xot.value(child) {
                let attribute_name = prefixed_name(self.xot, child, attribute.name());
                // xsl:version and friends steer the stylesheet, they are
                // not output
                if attribute_name.namespace() != Some(XSL_NAMESPACE) {
                    let value = ValueTemplate::parse(attribute.value(), namespaces)?;
                    attributes.push((attribute_name, value));
                }
            }
        }
        Ok(Instruction::LiteralElement {
            name,
            declarations,
            attributes,
            body: self.body(node, namespaces, preserve)?,
        })
    }

    fn binding(
        &self,
        node: Node,
        inherited: &Namespaces,
        element: &'static str,
        preserve: bool,
    ) -> Result<Binding> {
        let namespaces = &self.namespaces(node, inherited);
        let preserve = self.preserve_space(node, preserve);
        let name = self.required(node, element, "name")?.trim().to_string();
        let value = match self.attribute(node, "select") {
            Some(select) => BindingValue::Select(Expression::compile(select, namespaces)?),
            None => {
                let body = self.body(node, namespaces, preserve)?;
                if body.is_empty() {
                    BindingValue::Empty
                } else {
                    BindingValue::Body(body)
                }
            }
        };
        Ok(Binding { name, value })
    }

    fn sort(&self, node: Node, inherited: &Namespaces) -> Result<Sort> {
        let namespaces = &self.namespaces(node, inherited);
        let select = Expression::compile(self.attribute(node, "select").unwrap_or("."), namespaces)?;
        let data_type = match self.attribute(node, "data-type").map(str::trim) {
            None | Some("text") => DataType::Text,
            Some("number") => DataType::Number,
            Some(other) => {
                return Err(Error::InvalidAttribute {
                    attribute: "data-type",
                    value: other.to_string(),
                })
            }
        };
        let descending = match self.attribute(node, "order").map(str::trim) {
            None | Some("ascending") => false,
            Some("descending") => true,
            Some(other) => {
                return Err(Error::InvalidAttribute {
                    attribute: "order",
                    value: other.to_string(),
                })
            }
        };
        Ok(Sort {
            select,
            data_type,
            descending,
        })
    }

    fn expression(
        &self,
        node: Node,
        element: &'static str,
        attribute: &'static str,
        namespaces: &Namespaces,
    ) -> Result<Expression> {
        Expression::compile(self.required(node, element, attribute)?, namespaces)
    }

    fn optional_expression(
        &self,
        node: Node,
        attribute: &str,
        namespaces: &Namespaces,
    ) -> Result<Option<Expression>> {
        self.attribute(node, attribute)
            .map(|expr| Expression::compile(expr, namespaces))
            .transpose()
    }

    /// The local name of an element in the XSLT namespace.
    fn xsl_name(&self, node: Node) -> Option<&'a str> {
        let element = self.xot.element(node)?;
        let (local, namespace) = self.xot.name_ns_str(element.name());
        (namespace == XSL_NAMESPACE).then_some(local)
    }

    fn has_xsl_version(&self, node: Node) -> bool {
        let xot = self.xot;
        xot.axis(Axis::Attribute, node)
            .any(|child| match xot.value(child) {
                Value::Attribute(attribute) => {
                    xot.name_ns_str(attribute.name()) == ("version", XSL_NAMESPACE)
                }
                _ => false,
            })
    }

    fn display_name(&self, node: Node) -> String {
        match self.xot.element(node) {
            Some(element) => prefixed_name(self.xot, node, element.name()).to_full_name(),
            None => String::new(),
        }
    }

    fn element_children(&self, node: Node) -> impl Iterator<Item = Node> + 'a {
        let xot = self.xot;
        xot.children(node).filter(move |child| xot.is_element(*child))
    }

    fn attribute(&self, node: Node, local: &str) -> Option<&'a str> {
        let name = self.xot.name(local)?;
        self.attribute_value(node, name)
    }

    fn attribute_value(&self, node: Node, name: NameId) -> Option<&'a str> {
        let xot = self.xot;
        xot.axis(Axis::Attribute, node)
            .find_map(|child| match xot.value(child) {
                Value::Attribute(attribute) if attribute.name() == name => {
                    Some(&attribute.value()[..])
                }
                _ => None,
            })
    }

    fn required(
        &self,
        node: Node,
        element: &'static str,
        attribute: &'static str,
    ) -> Result<&'a str> {
        self.attribute(node, attribute)
            .ok_or(Error::MissingAttribute { element, attribute })
    }

    fn preserve_space(&self, node: Node, inherited: bool) -> bool {
        match self.attribute_value(node, self.xot.xml_space_name()) {
            Some("preserve") => true,
            Some("default") => false,
            _ => inherited,
        }
    }

    // elements without declarations of their own share the parent's map
    fn namespaces(&self, node: Node, inherited: &Namespaces) -> Namespaces {
        let own = self
            .xot
            .namespace_declarations(node)
            .into_iter()
            .map(|(prefix, namespace)| {
                (
                    self.xot.prefix_str(prefix).to_string(),
                    self.xot.namespace_str(namespace).to_string(),
                )
            })
            .collect::<Vec<_>>();
        if own.is_empty() {
            return inherited.clone();
        }
        let mut namespaces = (**inherited).clone();
        namespaces.extend(own);
        Arc::new(namespaces)
    }
}
