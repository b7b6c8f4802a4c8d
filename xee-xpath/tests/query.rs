use insta::assert_snapshot;
use rstest::rstest;
use xee_name::NamespaceContext;
use xee_xpath::{evaluate, Context, Error, NodeKind, Tree, Value, XPath};
use xot::Xot;

const BOOKS: &str = r#"<library xmlns:dc="http://purl.org/dc/elements/1.1/">
<book id="b1" year="1999"><dc:title>Lorem</dc:title><price>10</price></book>
<book id="b2" year="2005"><dc:title>Ipsum</dc:title><price>25.5</price></book>
<!--catalogue ends-->
</library>"#;

fn tree(xml: &str) -> Tree {
    let mut xot = Xot::new();
    let root = xot.parse(xml).unwrap();
    Tree::new(xot, root)
}

fn strings(tree: &Tree, expr: &str, namespaces: &NamespaceContext) -> Vec<String> {
    evaluate(expr, tree, tree.root(), namespaces)
        .unwrap()
        .into_iter()
        .map(|matched| tree.string_value(matched.node))
        .collect()
}

fn value(xml: &str, expr: &str) -> String {
    let tree = tree(xml);
    let namespaces = NamespaceContext::default();
    let context = Context::new(&tree, &namespaces);
    XPath::compile(expr)
        .unwrap()
        .evaluate(&context, tree.root())
        .unwrap()
        .to_string_value(&tree)
}

#[test]
fn test_text_nodes() {
    let tree = tree("<r><a>1</a><a>2</a></r>");
    let matched = evaluate("//a/text()", &tree, tree.root(), &NamespaceContext::default()).unwrap();
    assert_eq!(matched.len(), 2);
    assert!(matched.iter().all(|m| m.kind == NodeKind::Text));
    assert_eq!(
        strings(&tree, "//a/text()", &NamespaceContext::default()),
        vec!["1", "2"]
    );
}

#[test]
fn test_attribute() {
    let tree = tree(r#"<r id="5"/>"#);
    let matched = evaluate("/r/@id", &tree, tree.root(), &NamespaceContext::default()).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].kind, NodeKind::Attribute);
    assert_eq!(tree.string_value(matched[0].node), "5");
}

#[test]
fn test_empty_result_is_ok() {
    let tree = tree("<r/>");
    let matched = evaluate("//missing", &tree, tree.root(), &NamespaceContext::default()).unwrap();
    assert!(matched.is_empty());
}

#[test]
fn test_prefixed_names_need_binding() {
    let tree = tree(BOOKS);
    let namespaces = NamespaceContext::default();
    assert_eq!(
        evaluate("//dc:title", &tree, tree.root(), &namespaces),
        Err(Error::UnboundPrefix("dc".to_string()))
    );
    let namespaces = namespaces.add("dc", "http://purl.org/dc/elements/1.1/");
    assert_eq!(
        strings(&tree, "//dc:title", &namespaces),
        vec!["Lorem", "Ipsum"]
    );
    assert_eq!(strings(&tree, "//book/dc:*", &namespaces).len(), 2);
}

#[rstest]
#[case("<r/>")]
#[case("<a/>")]
#[case("<r><a/><p:a xmlns:p='urn:p'/></r>")]
fn test_unbound_prefix_fails_whatever_the_tree(#[case] xml: &str) {
    let tree = tree(xml);
    let namespaces = NamespaceContext::empty();
    for expr in ["//p:a", "//*[p:*]", "count(//x/@p:y)", "/nothing/p:a"] {
        assert_eq!(
            evaluate(expr, &tree, tree.root(), &namespaces),
            Err(Error::UnboundPrefix("p".to_string())),
            "{expr}"
        );
    }
}

#[test]
fn test_not_a_node_set() {
    let tree = tree("<r/>");
    assert_eq!(
        evaluate("count(//r)", &tree, tree.root(), &NamespaceContext::default()),
        Err(Error::NotANodeSet("number"))
    );
}

#[test]
fn test_syntax_error_span() {
    let error = XPath::compile("//book[@id = ]").unwrap_err();
    assert_eq!(error.span(), Some(13..14));
    assert_snapshot!(error.to_string(), @"expected an expression, found RightBracket at position 13");
}

#[rstest]
#[case("count(//book)", "2")]
#[case("sum(//price)", "35.5")]
#[case("//book[@year > 2000]/@id", "b2")]
#[case("string(//book[2]/preceding-sibling::book/@id)", "b1")]
#[case("name(//book[1]/*[1])", "dc:title")]
#[case("local-name(//book[1]/*[1])", "title")]
#[case("normalize-space(//comment())", "catalogue ends")]
#[case("//book[price = 25.5]/@year", "2005")]
#[case("boolean(//book[not(@id)])", "false")]
#[case("concat(//book[last()]/@id, '-', count(//book/ancestor::*))", "b2-1")]
#[case("(//book)[1]/following::price", "25.5")]
#[case("count(//book[1]/following-sibling::node())", "5")]
fn test_expressions(#[case] expr: &str, #[case] expected: &str) {
    assert_eq!(value(BOOKS, expr), expected);
}

#[test]
fn test_evaluate_general_value() {
    let tree = tree("<r/>");
    let namespaces = NamespaceContext::empty();
    let context = Context::new(&tree, &namespaces);
    let xpath = XPath::compile("1 = 1 and 'a' != 'b'").unwrap();
    assert_eq!(xpath.evaluate(&context, tree.root()), Ok(Value::Boolean(true)));
    assert_eq!(xpath.source(), "1 = 1 and 'a' != 'b'");
}

#[test]
fn test_current_in_predicate() {
    let tree = tree(r#"<r><a k="x"/><b k="x">hit</b><b k="y">miss</b></r>"#);
    let namespaces = NamespaceContext::empty();
    let context = Context::new(&tree, &namespaces);
    let a = XPath::compile("/r/a")
        .unwrap()
        .select(&context, tree.root())
        .unwrap()[0];
    let xpath = XPath::compile("string(../b[@k = current()/@k])").unwrap();
    assert_eq!(
        xpath.evaluate(&context, a),
        Ok(Value::String("hit".to_string()))
    );
}

#[test]
fn test_union_branches() {
    let xpath = XPath::compile("a | b/c | @d").unwrap();
    let branches = xpath.branches();
    assert_eq!(branches.len(), 3);
    assert_eq!(branches[1].ast(), XPath::compile("b/c").unwrap().ast());
    assert_eq!(XPath::compile("a").unwrap().branches().len(), 1);
}
