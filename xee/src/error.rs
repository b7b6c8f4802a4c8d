use xee_document::Error;

/// Report an error to stderr. XPath errors are shown against the expression
/// text, with the offending range underlined when it's known.
pub(crate) fn render_error(e: &anyhow::Error) {
    let rendered = match e.downcast_ref::<Error>() {
        Some(Error::Query { query, source }) => render_xpath_error(query, source),
        Some(Error::Transform(xee_xslt::Error::XPath { expr, source })) => {
            render_xpath_error(expr, source)
        }
        _ => Err(std::io::Error::other("not an XPath error")),
    };
    if rendered.is_err() {
        eprintln!("error: {:#}", e);
    }
}

fn render_xpath_error(src: &str, e: &xee_xpath::Error) -> std::io::Result<()> {
    let red = ariadne::Color::Red;
    let start = e.span().map(|span| span.start).unwrap_or(0);

    let mut report = ariadne::Report::build(ariadne::ReportKind::Error, start..start)
        .with_message(e.to_string());

    if let Some(span) = e.span() {
        report = report.with_label(ariadne::Label::new(span).with_message("here").with_color(red))
    }
    report.finish().eprint(ariadne::Source::from(src))
}
