//! In-memory element tree over the original build-file text.
//!
//! Every element keeps the byte span it occupies in the source so the writer can splice edits
//! without re-serializing untouched content. Removal only detaches a node; the arena never shrinks,
//! so [`NodeId`]s stay valid for the lifetime of the document.

use crate::error::BuildFileError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::ops::Range;

/// Index of an element in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Content {
    Text(String),
    Element(NodeId),
}

#[derive(Debug, Clone)]
pub struct Element {
    name: String,
    local_name: String,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
    content: Vec<Content>,
    span: Range<usize>,
    inner: Range<usize>,
    self_closing: bool,
}

impl Element {
    /// Qualified name as written in the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attribute value by exact (unprefixed) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Bytes from the opening `<` to the final `>`.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Bytes between the start tag and the end tag (empty for `<x />`).
    pub fn inner(&self) -> Range<usize> {
        self.inner.clone()
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.content.iter().filter_map(|c| match c {
            Content::Element(id) => Some(*id),
            Content::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BuildDocument {
    source: String,
    elements: Vec<Element>,
    detached: Vec<bool>,
    root: NodeId,
}

impl BuildDocument {
    pub fn parse(text: &str) -> Result<Self, BuildFileError> {
        // Offsets from the reader are relative to `body`; spans are relative to `text`.
        let (bom, body) = match text.strip_prefix('\u{feff}') {
            Some(rest) => ('\u{feff}'.len_utf8(), rest),
            None => (0, text),
        };
        let mut reader = Reader::from_str(body);
        let mut elements: Vec<Element> = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                let at = bom + reader.buffer_position() as usize;
                BuildFileError::malformed(at as u64, e.to_string())
            })?;
            let pos = reader.buffer_position() as usize;
            let after = bom + pos;

            match event {
                Event::Start(_) | Event::Empty(_) if stack.is_empty() && root.is_some() => {
                    return Err(BuildFileError::malformed(
                        after as u64,
                        "more than one root element",
                    ));
                }
                Event::Start(e) => {
                    let start = bom + tag_start(body, pos);
                    let id = push_element(&mut elements, stack.last().copied(), &e, start..after)?;
                    elements[id.0].inner = after..after;
                    root.get_or_insert(id);
                    stack.push(id);
                }
                Event::Empty(e) => {
                    let start = bom + tag_start(body, pos);
                    let id = push_element(&mut elements, stack.last().copied(), &e, start..after)?;
                    elements[id.0].self_closing = true;
                    elements[id.0].inner = after..after;
                    root.get_or_insert(id);
                }
                Event::End(_) => {
                    let id = stack.pop().ok_or_else(|| {
                        BuildFileError::malformed(after as u64, "unexpected closing tag")
                    })?;
                    let el = &mut elements[id.0];
                    el.inner.end = bom + tag_start(body, pos);
                    el.span.end = after;
                }
                Event::Text(t) if stack.is_empty() => {
                    if !t.iter().all(u8::is_ascii_whitespace) {
                        return Err(BuildFileError::malformed(
                            after as u64,
                            "text outside the root element",
                        ));
                    }
                }
                Event::CData(_) if stack.is_empty() => {
                    return Err(BuildFileError::malformed(
                        after as u64,
                        "CDATA outside the root element",
                    ));
                }
                Event::Text(t) => {
                    if let Some(&parent) = stack.last() {
                        let s = t.unescape().map_err(|e| {
                            BuildFileError::malformed(after as u64, e.to_string())
                        })?;
                        elements[parent.0].content.push(Content::Text(s.into_owned()));
                    }
                }
                Event::CData(c) => {
                    if let Some(&parent) = stack.last() {
                        let s = String::from_utf8_lossy(&c).into_owned();
                        elements[parent.0].content.push(Content::Text(s));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(BuildFileError::malformed(
                text.len() as u64,
                format!("{} element(s) left unclosed", stack.len()),
            ));
        }
        let root = root.ok_or_else(|| BuildFileError::malformed(0, "no root element"))?;

        let detached = vec![false; elements.len()];
        Ok(Self {
            source: text.to_string(),
            elements,
            detached,
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, id: NodeId) -> &Element {
        &self.elements[id.0]
    }

    /// Every element, in document order, including detached ones.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.elements.len()).map(NodeId)
    }

    /// Child elements that are still attached.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.elements[id.0]
            .children()
            .filter(move |c| !self.detached[c.0])
    }

    /// Attached descendant elements of `id` (not `id` itself), in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let mut kids: Vec<NodeId> = self.children(next).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last()
    }

    /// Concatenated text of the element and all of its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for c in &self.elements[id.0].content {
            match c {
                Content::Text(t) => out.push_str(t),
                Content::Element(child) if !self.detached[child.0] => self.collect_text(*child, out),
                Content::Element(_) => {}
            }
        }
    }

    /// True when neither the node nor any ancestor has been detached.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.detached[c.0] {
                return false;
            }
            cur = self.elements[c.0].parent;
        }
        true
    }

    pub fn is_detached(&self, id: NodeId) -> bool {
        self.detached[id.0]
    }

    /// Detach a node (and with it, its subtree). Returns false if it already was.
    pub fn detach(&mut self, id: NodeId) -> bool {
        if id == self.root || self.detached[id.0] {
            return false;
        }
        self.detached[id.0] = true;
        true
    }

    /// Detached nodes whose ancestors are all attached, in document order.
    pub fn detached_roots(&self) -> Vec<NodeId> {
        self.ids()
            .filter(|&id| {
                self.detached[id.0]
                    && self.elements[id.0]
                        .parent
                        .is_some_and(|p| self.is_attached(p))
            })
            .collect()
    }

    /// 1-based line of the element's start tag.
    pub fn line_of(&self, id: NodeId) -> usize {
        let start = self.elements[id.0].span.start;
        self.source[..start].bytes().filter(|b| *b == b'\n').count() + 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.elements.len()
    }
}

fn push_element(
    elements: &mut Vec<Element>,
    parent: Option<NodeId>,
    e: &BytesStart<'_>,
    span: Range<usize>,
) -> Result<NodeId, BuildFileError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| BuildFileError::malformed(span.start as u64, err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| BuildFileError::malformed(span.start as u64, err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    let id = NodeId(elements.len());
    elements.push(Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        local_name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        attributes,
        parent,
        content: Vec::new(),
        span,
        inner: 0..0,
        self_closing: false,
    });
    if let Some(p) = parent {
        elements[p.0].content.push(Content::Element(id));
    }
    Ok(id)
}

/// Start of the tag that ends at `end`.
///
/// `<` cannot appear unescaped inside a tag, so the last one before `end` opens it.
fn tag_start(text: &str, end: usize) -> usize {
    text[..end].rfind('<').unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <ItemGroup>
    <Reference Include="A">
      <HintPath>..\packages\A.1.0\lib\A.dll</HintPath>
    </Reference>
    <None Include="packages.config" />
  </ItemGroup>
</Project>
"#;

    #[test]
    fn spans_cover_whole_elements() {
        let doc = BuildDocument::parse(DOC).expect("parse");
        let reference = doc
            .ids()
            .find(|&id| doc.element(id).local_name() == "Reference")
            .expect("reference");
        let span = doc.element(reference).span();
        assert!(DOC[span.clone()].starts_with("<Reference Include=\"A\">"));
        assert!(DOC[span].ends_with("</Reference>"));

        let none = doc
            .ids()
            .find(|&id| doc.element(id).local_name() == "None")
            .expect("none");
        assert_eq!(
            &DOC[doc.element(none).span()],
            "<None Include=\"packages.config\" />"
        );
        assert!(doc.element(none).is_self_closing());
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let doc = BuildDocument::parse(DOC).expect("parse");
        let reference = doc
            .ids()
            .find(|&id| doc.element(id).local_name() == "Reference")
            .expect("reference");
        assert!(doc.text_content(reference).contains(r"..\packages\A.1.0\lib\A.dll"));
    }

    #[test]
    fn detaching_hides_subtree() {
        let mut doc = BuildDocument::parse(DOC).expect("parse");
        let group = doc.children(doc.root()).next().expect("item group");
        assert!(doc.detach(group));
        assert!(!doc.detach(group));
        let hint = doc
            .ids()
            .find(|&id| doc.element(id).local_name() == "HintPath")
            .expect("hint");
        assert!(!doc.is_attached(hint));
        assert_eq!(doc.detached_roots(), vec![group]);
        assert!(doc.descendants(doc.root()).is_empty());
    }

    #[test]
    fn root_cannot_be_detached() {
        let mut doc = BuildDocument::parse(DOC).expect("parse");
        assert!(!doc.detach(doc.root()));
    }

    #[test]
    fn line_numbers_are_one_based() {
        let doc = BuildDocument::parse(DOC).expect("parse");
        assert_eq!(doc.line_of(doc.root()), 2);
    }

    #[test]
    fn leading_bom_is_counted_in_spans() {
        let text = "\u{feff}<?xml version=\"1.0\"?>\n<Project Label=\"café\">\n  <ItemGroup />\n</Project>\n";
        let doc = BuildDocument::parse(text).expect("parse");
        let root = doc.root();
        assert!(text[doc.element(root).span()].starts_with("<Project Label=\"café\">"));
        assert!(text[doc.element(root).span()].ends_with("</Project>"));
        let group = doc.children(root).next().expect("item group");
        assert_eq!(&text[doc.element(group).span()], "<ItemGroup />");
        assert_eq!(doc.line_of(group), 3);
    }

    #[test]
    fn text_outside_root_is_rejected() {
        assert!(BuildDocument::parse("<Project>\n  <ItemGroup />\n</Project>\ntrailing text").is_err());
        assert!(BuildDocument::parse("stray<Project />").is_err());
        assert!(BuildDocument::parse("<Project /><![CDATA[x]]>").is_err());
        assert!(BuildDocument::parse("<?xml version=\"1.0\"?>\n<Project />\n\n").is_ok());
    }

    #[test]
    fn two_roots_are_rejected() {
        assert!(BuildDocument::parse("<a /><b />").is_err());
    }

    #[test]
    fn unclosed_elements_are_rejected() {
        assert!(BuildDocument::parse("<Project><ItemGroup></Project>").is_err());
        assert!(BuildDocument::parse("<Project><ItemGroup>").is_err());
    }
}
