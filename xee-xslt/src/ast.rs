use std::sync::Arc;

use ahash::HashMap;
use rust_decimal::Decimal;
use xee_name::Name;
use xee_xpath::XPath;

use crate::error::{Error, Result};
use crate::pattern::Pattern;
use crate::value_template::ValueTemplate;

/// The namespace declarations in scope for a stylesheet element.
///
/// Elements without declarations of their own share their parent's map.
pub(crate) type Namespaces = Arc<HashMap<String, String>>;

/// An XPath expression together with the prefixes it may use.
#[derive(Debug, Clone)]
pub(crate) struct Expression {
    pub(crate) xpath: XPath,
    pub(crate) namespaces: Namespaces,
}

impl Expression {
    pub(crate) fn compile(source: &str, namespaces: &Namespaces) -> Result<Self> {
        let xpath = XPath::compile(source).map_err(Error::xpath(source))?;
        Ok(Expression {
            xpath,
            namespaces: namespaces.clone(),
        })
    }
}

#[derive(Debug)]
pub(crate) struct Template {
    pub(crate) pattern: Option<Pattern>,
    pub(crate) name: Option<String>,
    pub(crate) mode: Option<String>,
    pub(crate) priority: Option<Decimal>,
    pub(crate) params: Vec<Binding>,
    pub(crate) body: Vec<Instruction>,
}

/// A top-level `xsl:variable` or `xsl:param`.
#[derive(Debug)]
pub(crate) struct Global {
    pub(crate) binding: Binding,
    pub(crate) param: bool,
}

/// `xsl:variable`, `xsl:param` and `xsl:with-param` all bind a name to
/// either an expression or the string value of their content.
#[derive(Debug)]
pub(crate) struct Binding {
    pub(crate) name: String,
    pub(crate) value: BindingValue,
}

#[derive(Debug)]
pub(crate) enum BindingValue {
    Select(Expression),
    Body(Vec<Instruction>),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataType {
    Text,
    Number,
}

#[derive(Debug)]
pub(crate) struct Sort {
    pub(crate) select: Expression,
    pub(crate) data_type: DataType,
    pub(crate) descending: bool,
}

#[derive(Debug)]
pub(crate) enum Instruction {
    Text(String),
    LiteralElement {
        name: Name,
        declarations: Vec<(String, String)>,
        attributes: Vec<(Name, ValueTemplate)>,
        body: Vec<Instruction>,
    },
    ValueOf(Expression),
    ApplyTemplates {
        select: Option<Expression>,
        mode: Option<String>,
        sorts: Vec<Sort>,
        params: Vec<Binding>,
    },
    CallTemplate {
        name: String,
        params: Vec<Binding>,
    },
    Variable(Binding),
    Copy(Vec<Instruction>),
    CopyOf(Expression),
    ForEach {
        select: Expression,
        sorts: Vec<Sort>,
        body: Vec<Instruction>,
    },
    If {
        test: Expression,
        body: Vec<Instruction>,
    },
    Choose {
        when: Vec<(Expression, Vec<Instruction>)>,
        otherwise: Vec<Instruction>,
    },
    Element {
        name: ValueTemplate,
        namespace: Option<ValueTemplate>,
        namespaces: Namespaces,
        body: Vec<Instruction>,
    },
    Attribute {
        name: ValueTemplate,
        namespace: Option<ValueTemplate>,
        namespaces: Namespaces,
        body: Vec<Instruction>,
    },
    Comment(Vec<Instruction>),
    ProcessingInstruction {
        name: ValueTemplate,
        body: Vec<Instruction>,
    },
    Message {
        terminate: bool,
        body: Vec<Instruction>,
    },
}
