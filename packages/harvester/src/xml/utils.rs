//! XML utility functions for parsing responses and navigating DOM trees.

use roxmltree::{Document, Node, ParsingOptions};

use crate::error::Result;

/// Parse a response body into a DOM tree.
///
/// Parsing is lenient about what precedes the root: a byte order mark,
/// whitespace or other junk before the first `<` is skipped. Internal DTDs
/// are accepted; external entities are never loaded.
///
/// # Examples
/// ```
/// use sru_harvester::xml::parse_document;
///
/// let doc = parse_document("\u{feff}  <root><a/></root>").unwrap();
/// assert_eq!(doc.root_element().tag_name().name(), "root");
/// ```
pub fn parse_document(text: &str) -> Result<Document<'_>> {
    let start = text.find('<').unwrap_or(0);
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    Ok(Document::parse_with_options(&text[start..], options)?)
}

/// Entities every XML parser knows without a DTD.
const PREDEFINED_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

/// Repair markup that [`parse_document`] rejects.
///
/// A `&` that does not start a character or entity reference becomes
/// `&amp;`. A `<` that cannot start markup, or that appears inside an
/// attribute value, becomes `&lt;`. Without a DTD, references to entities
/// other than the predefined five are treated as plain text. Comments,
/// CDATA sections and processing instructions are copied untouched.
///
/// Returns `None` when nothing needed repair.
///
/// # Examples
/// ```
/// use sru_harvester::xml::recover_markup;
///
/// assert_eq!(
///     recover_markup("<t>Tom & Jerry &amp; 1 < 2</t>").as_deref(),
///     Some("<t>Tom &amp; Jerry &amp; 1 &lt; 2</t>")
/// );
/// assert_eq!(recover_markup("<t>fine</t>"), None);
/// ```
pub fn recover_markup(text: &str) -> Option<String> {
    let has_dtd = text.contains("<!DOCTYPE");
    let mut out = String::with_capacity(text.len() + 32);
    let mut changed = false;
    let mut in_tag = false;
    let mut quote: Option<char> = None;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if c == '<' && !in_tag {
            if let Some(len) = verbatim_section(rest) {
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
        }

        match c {
            '&' if !in_tag || quote.is_some() => {
                if is_reference(rest, has_dtd) {
                    out.push('&');
                } else {
                    out.push_str("&amp;");
                    changed = true;
                }
            }
            '<' if in_tag => {
                out.push_str("&lt;");
                changed = true;
            }
            '<' => {
                let next = rest[1..].chars().next();
                if next.is_some_and(|n| n == '/' || is_name_start(n)) {
                    in_tag = true;
                    out.push('<');
                } else {
                    out.push_str("&lt;");
                    changed = true;
                }
            }
            '"' | '\'' if in_tag => {
                match quote {
                    None => quote = Some(c),
                    Some(open) if open == c => quote = None,
                    Some(_) => {}
                }
                out.push(c);
            }
            '>' if in_tag && quote.is_none() => {
                in_tag = false;
                out.push('>');
            }
            _ => out.push(c),
        }
        rest = &rest[c.len_utf8()..];
    }

    changed.then_some(out)
}

/// Length of a comment, CDATA section, processing instruction or doctype
/// at the start of `text`.
fn verbatim_section(text: &str) -> Option<usize> {
    let terminator = if text.starts_with("<!--") {
        "-->"
    } else if text.starts_with("<![CDATA[") {
        "]]>"
    } else if text.starts_with("<?") {
        "?>"
    } else if text.starts_with("<!DOCTYPE") {
        let subset = text.find('[').filter(|open| text.find('>').is_some_and(|gt| *open < gt));
        if subset.is_some() {
            "]>"
        } else {
            ">"
        }
    } else {
        return None;
    };
    Some(
        text.find(terminator)
            .map_or(text.len(), |end| end + terminator.len()),
    )
}

/// Whether `text` starts with a well-formed reference such as `&amp;`,
/// `&#233;` or `&#xE9;`.
fn is_reference(text: &str, has_dtd: bool) -> bool {
    let body = &text[1..];
    let Some(end) = body.find(|c: char| c == ';' || c == '&' || c == '<' || c.is_whitespace())
    else {
        return false;
    };
    if !body[end..].starts_with(';') {
        return false;
    }
    let name = &body[..end];

    if let Some(hex) = name.strip_prefix("#x") {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(digits) = name.strip_prefix('#') {
        !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
    } else if PREDEFINED_ENTITIES.contains(&name) {
        true
    } else {
        has_dtd
            && name.chars().next().is_some_and(is_name_start)
            && name
                .chars()
                .all(|c| is_name_start(c) || c.is_ascii_digit() || c == '-' || c == '.')
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

/// Get the tag name without namespace.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use sru_harvester::xml::get_tag_name;
///
/// let xml = r#"<sru:record xmlns:sru="urn:x"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "record");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Check if a node is an element with the given local name, in any namespace.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node) == tag
}

/// Check if a node is an element with the given namespace and local name.
///
/// An empty `namespace` matches elements without a namespace.
pub fn has_qualified_tag(node: Node<'_, '_>, namespace: &str, tag: &str) -> bool {
    has_tag(node, tag) && node.tag_name().namespace().unwrap_or_default() == namespace
}

/// Find the first child element with the given local name, in any namespace.
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| has_tag(*child, tag))
}

/// Find the first child element with the given namespace and local name.
pub fn find_qualified_child<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &str,
    tag: &str,
) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| has_qualified_tag(*child, namespace, tag))
}

/// Find all descendant elements with the given namespace and local name.
///
/// The node itself is not included. Matches come in document order.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use sru_harvester::xml::find_descendants;
///
/// let xml = r#"<r xmlns="urn:x"><records><record/><record/></records></r>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(find_descendants(doc.root_element(), "urn:x", "record").count(), 2);
/// ```
pub fn find_descendants<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &'a str,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .filter(move |n| has_qualified_tag(*n, namespace, tag))
}

/// Find the first descendant element with the given namespace and local name.
pub fn find_descendant<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &'a str,
    tag: &'a str,
) -> Option<Node<'a, 'input>> {
    find_descendants(node, namespace, tag).next()
}

/// Get the text content of a node, trimmed.
///
/// # Returns
/// Trimmed text content, or empty string if no text
pub fn get_text(node: Node<'_, '_>) -> String {
    node.text()
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
