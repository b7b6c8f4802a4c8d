use std::borrow::Cow;
use std::cmp::Ordering;

use xee_name::Name;
use xee_xpath::{string_to_number, Context, Focus, NodeKind, Tree, Value, Variables};
use xot::{Node, Xot};

use crate::ast::{
    Binding, BindingValue, DataType, Expression, Instruction, Namespaces, Sort, Template,
};
use crate::error::{Error, Result};
use crate::output;
use crate::parameters::Parameters;
use crate::stylesheet::Stylesheet;
use crate::value_template::{Part, ValueTemplate};

/// Applies a stylesheet to one source tree, writing into a fresh arena.
pub(crate) struct Runner<'a> {
    stylesheet: &'a Stylesheet,
    source: &'a Tree,
    xot: Xot,
    globals: Variables,
}

#[derive(Debug, PartialEq)]
enum SortKey {
    Text(String),
    Number(f64),
}

impl<'a> Runner<'a> {
    pub(crate) fn new(stylesheet: &'a Stylesheet, source: &'a Tree) -> Self {
        Runner {
            stylesheet,
            source,
            xot: Xot::new(),
            globals: Variables::default(),
        }
    }

    pub(crate) fn run(mut self, node: Node, parameters: &Parameters) -> Result<Tree> {
        let root = self.xot.new_document();
        let focus = Focus::new(node);
        let stylesheet = self.stylesheet;
        for global in &stylesheet.globals {
            let name = &global.binding.name;
            let value = match parameters.get(name).filter(|_| global.param) {
                Some(value) => Value::from(value),
                None => {
                    let globals = std::mem::take(&mut self.globals);
                    let value = self.binding(&global.binding, &focus, &globals);
                    self.globals = globals;
                    value?
                }
            };
            self.globals.insert(name.clone(), value);
        }
        self.apply_templates(vec![node], None, &Variables::default(), root)?;
        tracing::debug!(
            nodes = self.xot.all_descendants(root).count(),
            "applied stylesheet"
        );
        Ok(Tree::new(self.xot, root))
    }

    fn apply_templates(
        &mut self,
        nodes: Vec<Node>,
        mode: Option<&str>,
        params: &Variables,
        parent: Node,
    ) -> Result<()> {
        let stylesheet = self.stylesheet;
        let size = nodes.len();
        for (index, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: index + 1,
                size,
            };
            match stylesheet.matching(self.source, node, mode)? {
                Some(template) => self.template(template, &focus, params, parent)?,
                None => self.builtin(&focus, mode, parent)?,
            }
        }
        Ok(())
    }

    fn template(
        &mut self,
        template: &Template,
        focus: &Focus,
        params: &Variables,
        parent: Node,
    ) -> Result<()> {
        tracing::trace!(
            name = template.name.as_deref(),
            mode = template.mode.as_deref(),
            node = %self.source.generate_id(focus.node),
            "applying template"
        );
        // a template sees the globals and its own parameters, never the
        // caller's variables
        let mut scope = self.globals.clone();
        for param in &template.params {
            let value = match params.get(&param.name) {
                Some(value) => value.clone(),
                None => self.binding(param, focus, &scope)?,
            };
            scope.insert(param.name.clone(), value);
        }
        self.sequence(&template.body, focus, &scope, parent)
    }

    fn builtin(&mut self, focus: &Focus, mode: Option<&str>, parent: Node) -> Result<()> {
        let source = self.source;
        match source.kind(focus.node) {
            NodeKind::Document | NodeKind::Element => {
                let children = source.xot().children(focus.node).collect();
                self.apply_templates(children, mode, &Variables::default(), parent)
            }
            NodeKind::Text | NodeKind::Attribute => {
                let text = source.string_value(focus.node);
                output::append_text(&mut self.xot, parent, &text)
            }
            _ => Ok(()),
        }
    }

    fn sequence(
        &mut self,
        body: &[Instruction],
        focus: &Focus,
        variables: &Variables,
        parent: Node,
    ) -> Result<()> {
        let mut scope = Cow::Borrowed(variables);
        for instruction in body {
            match instruction {
                Instruction::Variable(binding) => {
                    let value = self.binding(binding, focus, &scope)?;
                    scope.to_mut().insert(binding.name.clone(), value);
                }
                instruction => self.instruction(instruction, focus, &scope, parent)?,
            }
        }
        Ok(())
    }

    fn instruction(
        &mut self,
        instruction: &Instruction,
        focus: &Focus,
        variables: &Variables,
        parent: Node,
    ) -> Result<()> {
        match instruction {
            Instruction::Text(text) => output::append_text(&mut self.xot, parent, text),
            Instruction::LiteralElement {
                name,
                declarations,
                attributes,
                body,
            } => {
                let element = output::append_element(&mut self.xot, parent, name, declarations)?;
                for (name, value) in attributes {
                    let value = self.value_template(value, focus, variables)?;
                    output::set_attribute(&mut self.xot, element, name, value);
                }
                self.sequence(body, focus, variables, element)
            }
            Instruction::ValueOf(expression) => {
                let text = self
                    .evaluate(expression, focus, variables)?
                    .to_string_value(self.source);
                output::append_text(&mut self.xot, parent, &text)
            }
            Instruction::ApplyTemplates {
                select,
                mode,
                sorts,
                params,
            } => {
                let nodes = match select {
                    Some(select) => self.select(select, focus, variables)?,
                    None => self.source.xot().children(focus.node).collect(),
                };
                let nodes = self.sort(nodes, sorts, variables)?;
                let params = self.params(params, focus, variables)?;
                self.apply_templates(nodes, mode.as_deref(), &params, parent)
            }
            Instruction::CallTemplate { name, params } => {
                let stylesheet = self.stylesheet;
                let template = stylesheet
                    .named(name)
                    .ok_or_else(|| Error::UnknownTemplate(name.clone()))?;
                let params = self.params(params, focus, variables)?;
                self.template(template, focus, &params, parent)
            }
            // bound by the enclosing sequence
            Instruction::Variable(_) => Ok(()),
            Instruction::Copy(body) => self.copy(body, focus, variables, parent),
            Instruction::CopyOf(expression) => {
                match self.evaluate(expression, focus, variables)? {
                    Value::NodeSet(nodes) => {
                        for node in nodes {
                            output::copy_node(self.source, node, &mut self.xot, parent)?;
                        }
                        Ok(())
                    }
                    other => {
                        let text = other.to_string_value(self.source);
                        output::append_text(&mut self.xot, parent, &text)
                    }
                }
            }
            Instruction::ForEach { select, sorts, body } => {
                let nodes = self.select(select, focus, variables)?;
                let nodes = self.sort(nodes, sorts, variables)?;
                let size = nodes.len();
                for (index, node) in nodes.into_iter().enumerate() {
                    let focus = Focus {
                        node,
                        position: index + 1,
                        size,
                    };
                    self.sequence(body, &focus, variables, parent)?;
                }
                Ok(())
            }
            Instruction::If { test, body } => {
                if self.evaluate(test, focus, variables)?.to_boolean() {
                    self.sequence(body, focus, variables, parent)?;
                }
                Ok(())
            }
            Instruction::Choose { when, otherwise } => {
                for (test, body) in when {
                    if self.evaluate(test, focus, variables)?.to_boolean() {
                        return self.sequence(body, focus, variables, parent);
                    }
                }
                self.sequence(otherwise, focus, variables, parent)
            }
            Instruction::Element {
                name,
                namespace,
                namespaces,
                body,
            } => {
                let name = self.computed_name(
                    name,
                    namespace.as_ref(),
                    namespaces,
                    true,
                    focus,
                    variables,
                )?;
                let element = output::append_element(&mut self.xot, parent, &name, &[])?;
                self.sequence(body, focus, variables, element)
            }
            Instruction::Attribute {
                name,
                namespace,
                namespaces,
                body,
            } => {
                let name = self.computed_name(
                    name,
                    namespace.as_ref(),
                    namespaces,
                    false,
                    focus,
                    variables,
                )?;
                let value = self.fragment(body, focus, variables)?;
                output::set_attribute(&mut self.xot, parent, &name, value);
                Ok(())
            }
            Instruction::Comment(body) => {
                let text = self.fragment(body, focus, variables)?;
                let comment = self.xot.new_comment(&text);
                self.xot.append(parent, comment)?;
                Ok(())
            }
            Instruction::ProcessingInstruction { name, body } => {
                let target = self.value_template(name, focus, variables)?;
                let data = self.fragment(body, focus, variables)?;
                let target = self.xot.add_name(target.trim());
                let data = (!data.is_empty()).then_some(data.as_str());
                let pi = self.xot.new_processing_instruction(target, data);
                self.xot.append(parent, pi)?;
                Ok(())
            }
            Instruction::Message { terminate, body } => {
                let message = self.fragment(body, focus, variables)?;
                tracing::info!(terminate, "{}", message);
                if *terminate {
                    return Err(Error::Terminated(message));
                }
                Ok(())
            }
        }
    }

    fn copy(
        &mut self,
        body: &[Instruction],
        focus: &Focus,
        variables: &Variables,
        parent: Node,
    ) -> Result<()> {
        let source = self.source;
        let source_xot = source.xot();
        match source_xot.value(focus.node) {
            xot::Value::Document => self.sequence(body, focus, variables, parent),
            xot::Value::Element(element) => {
                let name = output::prefixed_name(source_xot, focus.node, element.name());
                let declarations = output::in_scope_declarations(source, focus.node);
                let copy = output::append_element(&mut self.xot, parent, &name, &declarations)?;
                self.sequence(body, focus, variables, copy)
            }
            _ => output::copy_node(source, focus.node, &mut self.xot, parent),
        }
    }

    /// The name of an `xsl:element` or `xsl:attribute`.
    fn computed_name(
        &self,
        name: &ValueTemplate,
        namespace: Option<&ValueTemplate>,
        namespaces: &Namespaces,
        element: bool,
        focus: &Focus,
        variables: &Variables,
    ) -> Result<Name> {
        let qname = self.value_template(name, focus, variables)?;
        match namespace {
            Some(namespace) => {
                let uri = self.value_template(namespace, focus, variables)?;
                let (prefix, local) = match qname.trim().split_once(':') {
                    Some((prefix, local)) => (Some(prefix.to_string()), local),
                    None => (None, qname.trim()),
                };
                if local.is_empty() || local.contains(':') {
                    return Err(xee_name::Error::InvalidQName(qname.clone()).into());
                }
                let uri = (!uri.is_empty()).then_some(uri);
                Ok(Name::new(local.to_string(), uri, prefix))
            }
            None if element => Ok(Name::parse_element(&qname, namespaces.as_ref())?),
            None => Ok(Name::parse(&qname, namespaces.as_ref())?),
        }
    }

    fn evaluate(
        &self,
        expression: &Expression,
        focus: &Focus,
        variables: &Variables,
    ) -> Result<Value> {
        let context = Context::new(self.source, &*expression.namespaces)
            .with_variables(variables)
            .with_current(focus.node);
        expression
            .xpath
            .evaluate_with_focus(&context, *focus)
            .map_err(Error::xpath(expression.xpath.source()))
    }

    fn select(
        &self,
        expression: &Expression,
        focus: &Focus,
        variables: &Variables,
    ) -> Result<Vec<Node>> {
        self.evaluate(expression, focus, variables)?
            .into_node_set()
            .map_err(Error::xpath(expression.xpath.source()))
    }

    fn value_template(
        &self,
        template: &ValueTemplate,
        focus: &Focus,
        variables: &Variables,
    ) -> Result<String> {
        let mut s = String::new();
        for part in template.parts() {
            match part {
                Part::Text(text) => s.push_str(text),
                Part::Value(expression) => s.push_str(
                    &self
                        .evaluate(expression, focus, variables)?
                        .to_string_value(self.source),
                ),
            }
        }
        Ok(s)
    }

    fn binding(
        &mut self,
        binding: &Binding,
        focus: &Focus,
        variables: &Variables,
    ) -> Result<Value> {
        match &binding.value {
            BindingValue::Select(expression) => self.evaluate(expression, focus, variables),
            BindingValue::Body(body) => Ok(Value::String(self.fragment(body, focus, variables)?)),
            BindingValue::Empty => Ok(Value::String(String::new())),
        }
    }

    fn params(
        &mut self,
        params: &[Binding],
        focus: &Focus,
        variables: &Variables,
    ) -> Result<Variables> {
        let mut values = Variables::default();
        for param in params {
            let value = self.binding(param, focus, variables)?;
            values.insert(param.name.clone(), value);
        }
        Ok(values)
    }

    /// Run `body` and return the string value of what it produced.
    ///
    /// This is how result tree fragments are represented.
    fn fragment(
        &mut self,
        body: &[Instruction],
        focus: &Focus,
        variables: &Variables,
    ) -> Result<String> {
        let name = self.xot.add_name("fragment");
        let holder = self.xot.new_element(name);
        let result = self.sequence(body, focus, variables, holder);
        let xot = &self.xot;
        let text: String = xot
            .descendants(holder)
            .filter_map(|node| xot.text_str(node))
            .collect();
        let _ = self.xot.remove(holder);
        result.map(|_| text)
    }

    fn sort(&self, nodes: Vec<Node>, sorts: &[Sort], variables: &Variables) -> Result<Vec<Node>> {
        if sorts.is_empty() {
            return Ok(nodes);
        }
        let size = nodes.len();
        let mut keyed = Vec::with_capacity(size);
        for (index, node) in nodes.into_iter().enumerate() {
            let focus = Focus {
                node,
                position: index + 1,
                size,
            };
            let keys = sorts
                .iter()
                .map(|sort| {
                    let value = self
                        .evaluate(&sort.select, &focus, variables)?
                        .to_string_value(self.source);
                    Ok(match sort.data_type {
                        DataType::Text => SortKey::Text(value),
                        DataType::Number => SortKey::Number(string_to_number(&value)),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            keyed.push((keys, node));
        }
        // sort_by is stable, so equal keys keep document order
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, sorts));
        Ok(keyed.into_iter().map(|(_, node)| node).collect())
    }
}

fn compare_keys(a: &[SortKey], b: &[SortKey], sorts: &[Sort]) -> Ordering {
    for ((a, b), sort) in a.iter().zip(b).zip(sorts) {
        let ordering = match (a, b) {
            (SortKey::Number(a), SortKey::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                // NaN sorts before every number
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            },
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        };
        let ordering = if sort.descending {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
