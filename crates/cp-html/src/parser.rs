//! HTML5 Parser implementation
//!
//! Parses with html5ever's RcDom and converts the result into our arena.

use std::path::Path;

use cp_dom::{Document, DomTree, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_named(html, "<string>")
    }

    /// Read and parse an HTML file
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Document, ParseError> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            source_name: path.display().to_string(),
            source,
        })?;
        self.parse_named(&html, &path.display().to_string())
    }

    fn parse_named(&self, html: &str, name: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", name);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())
            .map_err(|source| ParseError::Io {
                source_name: name.to_string(),
                source,
            })?;

        let mut document = Document::empty();
        convert_node(&dom.document, document.tree_mut(), NodeId::ROOT)?;
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }
}

/// Convert an RcDom node (and its subtree) into the arena under `parent`
fn convert_node(handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<(), ParseError> {
    match &handle.data {
        RcNodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert_node(child, tree, parent)?;
            }
        }
        RcNodeData::Text { contents } => {
            let text = contents.borrow().to_string();
            if !text.trim().is_empty() {
                let id = tree.create_text(&text);
                tree.append_child(parent, id)?;
            }
        }
        RcNodeData::Comment { contents } => {
            let id = tree.create_comment(contents);
            tree.append_child(parent, id)?;
        }
        RcNodeData::Element { name, attrs, .. } => {
            let id = tree.create_element(&name.local);
            if let Some(element) = tree.element_mut(id) {
                for attr in attrs.borrow().iter() {
                    element.attrs.set(&attr.name.local, attr.value.to_string());
                }
            }
            tree.append_child(parent, id)?;

            for child in handle.children.borrow().iter() {
                convert_node(child, tree, id)?;
            }
        }
        // No doctype or processing-instruction nodes in our tree
        RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => {}
    }
    Ok(())
}
