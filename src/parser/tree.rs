use quick_xml::escape::{resolve_html5_entity, resolve_xml_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed markup at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

/// Index of a node inside its [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

pub const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Arena of parsed markup. Element and attribute names are stored lower-cased,
/// so every lookup is ASCII case-insensitive.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(markup);
        reader.config_mut().trim_text(false);

        let mut tree = Tree {
            nodes: vec![Node {
                kind: NodeKind::Root,
                children: Vec::new(),
            }],
        };
        let mut open: Vec<NodeId> = vec![ROOT];
        let mut buf = Vec::new();

        loop {
            let position = reader.buffer_position() as u64;
            let parent = open.last().copied().unwrap_or(ROOT);
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let id = tree.push_element(parent, &e, position)?;
                    open.push(id);
                }
                Ok(Event::Empty(e)) => {
                    tree.push_element(parent, &e, position)?;
                }
                Ok(Event::End(e)) => {
                    if open.len() <= 1 {
                        return Err(ParseError::Malformed {
                            position,
                            message: format!(
                                "closing tag </{}> without matching opening tag",
                                String::from_utf8_lossy(e.name().as_ref())
                            ),
                        });
                    }
                    open.pop();
                }
                Ok(Event::Text(e)) => {
                    tree.push_text(parent, decode(&String::from_utf8_lossy(&e)));
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    tree.push_text(parent, text);
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ParseError::Malformed {
                        position: reader.error_position() as u64,
                        message: e.to_string(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        if let Some(&unclosed) = open.get(1..).and_then(|rest| rest.last()) {
            return Err(ParseError::Malformed {
                position: markup.len() as u64,
                message: format!(
                    "element <{}> is never closed",
                    tree.name(unclosed).unwrap_or_default()
                ),
            });
        }

        Ok(tree)
    }

    fn push_element(
        &mut self,
        parent: NodeId,
        start: &BytesStart<'_>,
        position: u64,
    ) -> Result<NodeId, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|err| ParseError::Malformed {
                position,
                message: err.to_string(),
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            attrs.push((key, decode(&String::from_utf8_lossy(&attr.value))));
        }
        Ok(self.push(parent, NodeKind::Element { name, attrs }))
    }

    fn push_text(&mut self, parent: NodeId, text: String) {
        if !text.is_empty() {
            self.push(parent, NodeKind::Text(text));
        }
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        ROOT
    }

    /// Tag name of an element node, `None` for text and the document root.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    fn is(&self, id: NodeId, tag: &str) -> bool {
        self.name(id).is_some_and(|n| n.eq_ignore_ascii_case(tag))
    }

    /// Every node below `scope` in document order, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: self.nodes[scope.0].children.iter().rev().copied().collect(),
        }
    }

    /// First element named `tag` below `scope`.
    pub fn find(&self, scope: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(scope).find(|&id| self.is(id, tag))
    }

    /// First element named `tag` below `scope` whose `key` attribute equals `value`.
    pub fn find_by_attr(
        &self,
        scope: NodeId,
        tag: &str,
        key: &str,
        value: &str,
    ) -> Option<NodeId> {
        self.descendants(scope)
            .find(|&id| self.is(id, tag) && self.attr(id, key) == Some(value))
    }

    pub fn find_all(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope).filter(|&id| self.is(id, tag)).collect()
    }

    /// Direct children of `scope` named `tag`.
    pub fn children_named(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.nodes[scope.0]
            .children
            .iter()
            .copied()
            .filter(|&id| self.is(id, tag))
            .collect()
    }

    /// Concatenated text of every text node below `id`.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeKind::Text(t) = &self.nodes[id.0].kind {
            return t.clone();
        }
        self.descendants(id)
            .filter_map(|n| match &self.nodes[n.0].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Text of the first element named `tag` below `scope`.
    pub fn find_text(&self, scope: NodeId, tag: &str) -> Option<String> {
        self.find(scope, tag).map(|id| self.text(id))
    }

    /// Every text node of the document, in document order.
    pub fn text_nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.descendants(ROOT)
            .filter_map(|n| match &self.nodes[n.0].kind {
                NodeKind::Text(t) => Some(t.as_str()),
                _ => None,
            })
    }
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_xml_entity(name).or_else(|| resolve_html5_entity(name))
}

/// Decodes character references, the XML entities and the HTML named
/// entities. A reference that still cannot be resolved (an entity from an
/// external DTD) stays verbatim; the rest of the run is decoded anyway.
fn decode(raw: &str) -> String {
    if let Ok(text) = unescape_with(raw, resolve_entity) {
        return text.into_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp + 1..];
        match tail.find(|c: char| c == ';' || c == '&' || c.is_whitespace()) {
            Some(end) if tail[end..].starts_with(';') => {
                let reference = &rest[amp..amp + end + 2];
                match unescape_with(reference, resolve_entity) {
                    Ok(t) => out.push_str(&t),
                    Err(_) => out.push_str(reference),
                }
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('&');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Explicit-stack pre-order walk.
pub struct Descendants<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.nodes[id.0].children.iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Tree {
        Tree::parse(xml).unwrap()
    }

    #[test]
    fn find_is_document_order() {
        let t = parse("<a><b><c>1</c></b><c>2</c></a>");
        let c = t.find(t.root(), "c").unwrap();
        assert_eq!(t.text(c), "1");
        let all: Vec<String> = t.find_all(t.root(), "c").iter().map(|&n| t.text(n)).collect();
        assert_eq!(all, vec!["1", "2"]);
    }

    #[test]
    fn names_are_case_insensitive() {
        let t = parse(r#"<tbx:langSet xml:lang="en"><tbx:term>x</tbx:term></tbx:langSet>"#);
        let ls = t.find(t.root(), "tbx:langset").unwrap();
        assert_eq!(t.name(ls), Some("tbx:langset"));
        assert_eq!(t.attr(ls, "XML:LANG"), Some("en"));
        assert_eq!(t.find_text(ls, "tbx:Term").as_deref(), Some("x"));
    }

    #[test]
    fn children_named_is_not_recursive() {
        let t = parse("<g><r>1</r><g><r>2</r></g><r>3</r></g>");
        let g = t.find(t.root(), "g").unwrap();
        let direct: Vec<String> = t.children_named(g, "r").iter().map(|&n| t.text(n)).collect();
        assert_eq!(direct, vec!["1", "3"]);
    }

    #[test]
    fn find_excludes_scope_itself() {
        let t = parse("<g id=\"outer\"><x/><g id=\"inner\"/></g>");
        let outer = t.find(t.root(), "g").unwrap();
        let inner = t.find(outer, "g").unwrap();
        assert_eq!(t.attr(inner, "id"), Some("inner"));
        assert!(t.find(inner, "g").is_none());
    }

    #[test]
    fn find_by_attr_matches_value() {
        let t = parse(
            r#"<m><std-ref type="undated">ISO 1</std-ref><std-ref type="dated">ISO 1:2020</std-ref></m>"#,
        );
        let dated = t.find_by_attr(t.root(), "std-ref", "type", "dated").unwrap();
        assert_eq!(t.text(dated), "ISO 1:2020");
        assert!(t.find_by_attr(t.root(), "std-ref", "type", "other").is_none());
    }

    #[test]
    fn text_concatenates_mixed_content() {
        let t =
            parse("<p>See <std><std-ref>ISO 9000</std-ref></std> &amp; more<![CDATA[ <raw>]]></p>");
        let p = t.find(t.root(), "p").unwrap();
        assert_eq!(t.text(p), "See ISO 9000 & more <raw>");
    }

    #[test]
    fn text_nodes_in_order() {
        let t = parse("<a>one<b>two</b>three</a>");
        let nodes: Vec<&str> = t.text_nodes().collect();
        assert_eq!(nodes, vec!["one", "two", "three"]);
    }

    #[test]
    fn missing_attribute_is_absent() {
        let t = parse("<a/>");
        let a = t.find(t.root(), "a").unwrap();
        assert_eq!(t.attr(a, "id"), None);
    }

    #[test]
    fn html_entities_decode_alongside_xml_ones() {
        let t = parse("<p>R&amp;D&nbsp;x &lt;y&gt; &#160;z&mdash;</p>");
        let p = t.find(t.root(), "p").unwrap();
        assert_eq!(t.text(p), "R&D\u{a0}x <y> \u{a0}z\u{2014}");
    }

    #[test]
    fn undeclared_entity_kept_verbatim_rest_decoded() {
        let t = parse("<p>A &custom; B &amp; C&nbsp;D &#x41; & E</p>");
        let p = t.find(t.root(), "p").unwrap();
        assert_eq!(t.text(p), "A &custom; B & C\u{a0}D A & E");
    }

    #[test]
    fn attribute_values_decode_entities() {
        let t = parse(r#"<std-ref title="A&nbsp;&amp;B" note="&custom; &lt;"/>"#);
        let r = t.find(t.root(), "std-ref").unwrap();
        assert_eq!(t.attr(r, "title"), Some("A\u{a0}&B"));
        assert_eq!(t.attr(r, "note"), Some("&custom; <"));
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        assert!(matches!(
            Tree::parse("<a><b></a>"),
            Err(ParseError::Malformed { .. })
        ));
    }

    #[test]
    fn unclosed_element_is_malformed() {
        let err = Tree::parse("<a><b>text").unwrap_err();
        assert!(err.to_string().contains("<b>"));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let depth = 20_000;
        let xml = format!("{}leaf{}", "<g>".repeat(depth), "</g>".repeat(depth));
        let t = parse(&xml);
        assert_eq!(t.find_all(t.root(), "g").len(), depth);
        assert_eq!(t.text(t.root()), "leaf");
    }
}
