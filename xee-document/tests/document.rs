use std::thread;

use rstest::rstest;
use xee_document::{Document, Error, NamespaceContext, NodeKind, Parameters};

const IDENTITY: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
  <xsl:template match="@*|node()">
    <xsl:copy><xsl:apply-templates select="@*|node()"/></xsl:copy>
  </xsl:template>
</xsl:stylesheet>"#;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_send_sync() {
    assert_send_sync::<Document>();
    assert_send_sync::<xee_document::ResultList<Document>>();
    assert_send_sync::<NamespaceContext>();
}

#[rstest]
#[case("<r/>")]
#[case(r#"<r id="5"><a>1</a><a>2</a></r>"#)]
#[case(r#"<p:r xmlns:p="urn:p"><p:a x="1"/>text<!--c--><?pi data?></p:r>"#)]
fn test_round_trip(#[case] xml: &str) {
    let document = Document::from_text(xml).unwrap();
    let rendered = document.render().unwrap();
    assert_eq!(Document::from_text(&rendered).unwrap(), document);
}

#[test]
fn test_render() {
    let document: Document = r#"<r id="5"><a>1</a></r>"#.parse().unwrap();
    insta::assert_snapshot!(document, @r#"<r id="5"><a>1</a></r>"#);
}

#[test]
fn test_query_text() {
    let document = Document::from_text("<r><a>1</a><a>2</a></r>").unwrap();
    assert_eq!(document.query("//a/text()").unwrap().to_vec(), vec!["1", "2"]);
}

#[test]
fn test_query_attribute() {
    let document = Document::from_text(r#"<r id="5"/>"#).unwrap();
    assert_eq!(document.query("/r/@id").unwrap().to_vec(), vec!["5"]);
}

#[test]
fn test_query_cdata() {
    let document = Document::from_text("<r><![CDATA[a < b]]></r>").unwrap();
    assert_eq!(document.query("/r/text()").unwrap().to_vec(), vec!["a < b"]);
}

#[test]
fn test_query_empty() {
    let document = Document::from_text("<r/>").unwrap();
    assert!(document.query("//missing/text()").unwrap().is_empty());
}

#[rstest]
#[case("//r", NodeKind::Element)]
#[case("/", NodeKind::Document)]
#[case("//comment()", NodeKind::Comment)]
fn test_query_rejects_kind(#[case] expr: &str, #[case] expected: NodeKind) {
    let document = Document::from_text("<r><!--c--></r>").unwrap();
    match document.query(expr).unwrap_err() {
        Error::Type { query, kind } => {
            assert_eq!(query, expr);
            assert_eq!(kind, expected);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_query_invalid_xpath() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document.query("//[").unwrap_err();
    assert!(matches!(err, Error::Query { ref query, .. } if query == "//["));
}

#[test]
fn test_query_not_a_node_set() {
    let document = Document::from_text("<r/>").unwrap();
    assert!(matches!(
        document.query("count(//r)").unwrap_err(),
        Error::Query { .. }
    ));
}

#[test]
fn test_malformed() {
    let err = Document::from_text("<bad><unclosed>").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_nodes_count() {
    let document = Document::from_text("<r><a/><b><a/></b><a/></r>").unwrap();
    let nodes = document.nodes("//a").unwrap();
    assert_eq!(nodes.len(), 3);
    assert!(nodes.iter().all(|node| node.kind() == NodeKind::Element));
}

#[test]
fn test_nodes_are_relative() {
    let document = Document::from_text("<r><b><a>1</a></b><b><a>2</a></b></r>").unwrap();
    let values = document
        .nodes("/r/b")
        .unwrap()
        .into_iter()
        .map(|b| b.value("a/text()").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["1", "2"]);
}

#[test]
fn test_nodes_render_subtree() {
    let document = Document::from_text(r#"<r><b x="1"><a/></b></r>"#).unwrap();
    let b = document.nodes("/r/b").unwrap();
    assert_eq!(b[0].render().unwrap(), r#"<b x="1"><a/></b>"#);
}

#[test]
fn test_nodes_share_namespaces() {
    let document = Document::from_text(r#"<r xmlns="urn:r"><a>1</a></r>"#)
        .unwrap()
        .register_namespace("x", "urn:r");
    let r = document.nodes("/x:r").unwrap();
    assert_eq!(r[0].query("x:a/text()").unwrap().to_vec(), vec!["1"]);
}

#[rstest]
#[case("<r/>")]
#[case("<a/>")]
#[case(r#"<r xmlns="urn:r"/>"#)]
fn test_unbound_prefix(#[case] xml: &str) {
    let document = Document::from_text(xml).unwrap();
    assert!(matches!(
        document.nodes("//p:a").unwrap_err(),
        Error::Query { .. }
    ));
    assert!(matches!(
        document.query("//p:a/text()").unwrap_err(),
        Error::Query { .. }
    ));
}

#[test]
fn test_default_namespaces() {
    let document = Document::from_text(
        r#"<html xmlns="http://www.w3.org/1999/xhtml"><body>hi</body></html>"#,
    )
    .unwrap();
    assert_eq!(
        document.query("/xhtml:html/xhtml:body/text()").unwrap().to_vec(),
        vec!["hi"]
    );
}

#[test]
fn test_register_namespace_leaves_original() {
    let document = Document::from_text(r#"<r xmlns="urn:r"/>"#).unwrap();
    let registered = document.register_namespace("x", "urn:r");
    assert_eq!(registered.nodes("/x:r").unwrap().len(), 1);
    assert!(document.nodes("/x:r").is_err());
    assert_eq!(document.namespaces().resolve("x"), None);
    assert_eq!(registered.namespaces().resolve("x"), Some("urn:r"));
}

#[test]
fn test_merge_namespaces_other_wins() {
    let document = Document::from_text(r#"<r xmlns="urn:b"/>"#)
        .unwrap()
        .register_namespace("x", "urn:a");
    let context = NamespaceContext::empty().add("x", "urn:b");
    let merged = document.merge_namespaces(&context);
    assert_eq!(merged.namespaces().resolve("x"), Some("urn:b"));
    assert_eq!(merged.nodes("/x:r").unwrap().len(), 1);
    assert_eq!(document.nodes("/x:r").unwrap().len(), 0);
}

#[test]
fn test_equality_ignores_namespace_context() {
    let a = Document::from_text("<r><a/></r>").unwrap();
    let b = a.register_namespace("x", "urn:x");
    assert_eq!(a, b);
}

#[test]
fn test_structural_equality_across_documents() {
    let a = Document::from_text(r#"<r y="2" x="1"><a>t</a></r>"#).unwrap();
    let b = Document::from_text(r#"<r x="1" y="2"><a>t</a></r>"#).unwrap();
    let c = Document::from_text(r#"<r x="1" y="2"><a>u</a></r>"#).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    let mut set = std::collections::HashSet::new();
    set.insert(a);
    assert!(set.contains(&b));
    assert!(!set.contains(&c));
}

#[test]
fn test_transform() {
    let document = Document::from_text("<r><a>1</a><a>2</a></r>").unwrap();
    let output = document
        .transform(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
              <xsl:template match="/r">
                <sum><xsl:value-of select="sum(a)"/></sum>
              </xsl:template>
            </xsl:stylesheet>"#,
        )
        .unwrap();
    assert_eq!(output.render().unwrap(), "<sum>3</sum>");
    assert_eq!(document.query("//a/text()").unwrap().len(), 2);
}

#[test]
fn test_transform_keeps_namespaces() {
    let document = Document::from_text("<r/>")
        .unwrap()
        .register_namespace("x", "urn:x");
    let output = document.transform(IDENTITY).unwrap();
    assert_eq!(output.namespaces(), document.namespaces());
}

#[test]
fn test_transform_with_parameters() {
    let document = Document::from_text("<r/>").unwrap();
    let output = document
        .transform_with(
            r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
              <xsl:param name="greeting" select="'hello'"/>
              <xsl:template match="/"><g><xsl:value-of select="$greeting"/></g></xsl:template>
            </xsl:stylesheet>"#,
            &Parameters::new().with("greeting", "hi"),
        )
        .unwrap();
    assert_eq!(output.render().unwrap(), "<g>hi</g>");
}

#[test]
fn test_identity_twice() {
    let document =
        Document::from_text(r#"<r id="5"><a>1</a><!--c--><b x="y"><a>2</a></b></r>"#).unwrap();
    let once = document.transform(IDENTITY).unwrap();
    let twice = once.transform(IDENTITY).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once, document);
}

#[test]
fn test_transform_subtree() {
    let document = Document::from_text("<r><b><a>1</a></b></r>").unwrap();
    let b = document.nodes("/r/b").unwrap();
    let output = b[0].transform(IDENTITY).unwrap();
    assert_eq!(output.render().unwrap(), "<b><a>1</a></b>");
}

#[test]
fn test_transform_error() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document.transform("<not-a-stylesheet").unwrap_err();
    assert!(matches!(err, Error::Transform(_)));
}

#[test]
fn test_transform_needs_a_stylesheet() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document.transform("<notxsl/>").unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(xee_xslt::Error::NotAStylesheet(name)) if name == "notxsl"
    ));
    let output = document
        .transform(r#"<o xsl:version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform"/>"#)
        .unwrap();
    assert_eq!(output.render().unwrap(), "<o/>");
}

fn stylesheet(templates: &str) -> String {
    format!(
        r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">{}</xsl:stylesheet>"#,
        templates
    )
}

#[test]
fn test_transform_bad_select() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document
        .transform(&stylesheet(
            r#"<xsl:template match="/"><xsl:value-of select="1 +"/></xsl:template>"#,
        ))
        .unwrap_err();
    assert!(matches!(
        &err,
        Error::Transform(xee_xslt::Error::XPath { expr, .. }) if expr == "1 +"
    ));
}

#[test]
fn test_transform_unknown_template() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document
        .transform(&stylesheet(
            r#"<xsl:template match="/"><xsl:call-template name="missing"/></xsl:template>"#,
        ))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transform(xee_xslt::Error::UnknownTemplate(name)) if name == "missing"
    ));
}

#[test]
fn test_transform_terminated() {
    let document = Document::from_text("<r><a>1</a></r>").unwrap();
    let err = document
        .transform(&stylesheet(
            r#"<xsl:template match="a"><xsl:message terminate="yes">found <xsl:value-of select="."/></xsl:message></xsl:template>"#,
        ))
        .unwrap_err();
    insta::assert_snapshot!(err, @"transformation failed: terminated by xsl:message: found 1");
}

#[test]
fn test_doctype_is_rejected() {
    // xot doesn't parse DTDs, so even a well-formed document with one fails
    let err = Document::from_text("<!DOCTYPE r><r>1</r>").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}

#[test]
fn test_value_cardinality_message() {
    let document = Document::from_text("<r/>").unwrap();
    let err = document.value("//a/text()").unwrap_err();
    insta::assert_snapshot!(
        err,
        @"expected exactly one item, found 0, from query '//a/text()' on <r/>"
    );
}

#[test]
fn test_shared_between_threads() {
    let document = Document::from_text("<r><a>1</a><a>2</a><a>3</a></r>").unwrap();
    let handles = (1..=3)
        .map(|i| {
            let document = document.clone();
            thread::spawn(move || document.value(&format!("/r/a[{i}]/text()")).unwrap())
        })
        .collect::<Vec<_>>();
    let values = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(values, vec!["1", "2", "3"]);
}
