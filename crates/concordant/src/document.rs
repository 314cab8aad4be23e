//! Element Tree Adapter.
//!
//! Wraps an `html5ever` parse tree so that the rest of the engine never
//! touches raw nodes. Elements are reference-counted handles: cloning an
//! [`Element`] clones the handle, never the node, and equality is node
//! identity.
//!
//! ```text
//! ┌──────────────┐  parse   ┌──────────────┐  wrap   ┌──────────────┐
//! │ HTML source  │────────► │ RcDom        │───────► │ Element      │
//! └──────────────┘          └──────────────┘         └──────────────┘
//!                                  ▲                        │
//!                                  └──── in-place mutation ─┘
//! ```
//!
//! HTML parsing does not bind XML namespaces, so `prefix:name` elements and
//! attributes are resolved here against `xmlns:prefix` declarations on the
//! element or its ancestors.

use crate::resource::Resource;
use crate::result::ConcordantResult;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use thiserror::Error;

const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Structural errors raised by the element tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    /// The element was removed from its document and can no longer be navigated
    #[error("stale element <{name}>: it has been removed from the document")]
    Stale {
        /// Local name of the stale element
        name: String,
    },

    /// A node that is not an element was offered where an element is required
    #[error("node is not an element")]
    NotAnElement,

    /// A structurally required element is missing
    #[error("document has no <{name}> element")]
    Missing {
        /// Local name of the missing element
        name: String,
    },
}

/// Split a parsed name into `(prefix, local)`.
#[must_use]
pub fn split_prefixed(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) if !prefix.is_empty() && !local.is_empty() => (Some(prefix), local),
        _ => (None, name),
    }
}

/// An element of a specification document.
///
/// The parse-tree node stays private; everything goes through this type.
///
/// ```compile_fail
/// let element = concordant::Element::new("p");
/// let _ = element.handle();
/// ```
#[derive(Clone)]
pub struct Element {
    handle: Handle,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

impl Eq for Element {}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.qualified_name())?;
        for (name, value) in self.attributes() {
            write!(f, " {name}=\"{value}\"")?;
        }
        f.write_str(">")
    }
}

impl Element {
    /// Create a detached XHTML element.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        let handle = Node::new(NodeData::Element {
            name: QualName::new(
                None,
                Namespace::from(XHTML_NAMESPACE),
                LocalName::from(tag.to_ascii_lowercase()),
            ),
            attrs: RefCell::new(Vec::new()),
            template_contents: RefCell::new(None),
            mathml_annotation_xml_integration_point: false,
        });
        Self { handle }
    }

    /// Create a detached element with text content.
    #[must_use]
    pub fn with_text(tag: &str, text: &str) -> Self {
        let element = Self::new(tag);
        element.append_text(text);
        element
    }

    /// Wrap a parse-tree node.
    pub(crate) fn wrap(handle: Handle) -> Result<Self, ElementError> {
        if matches!(handle.data, NodeData::Element { .. }) {
            Ok(Self { handle })
        } else {
            Err(ElementError::NotAnElement)
        }
    }

    #[allow(clippy::unreachable)]
    fn qual_name(&self) -> &QualName {
        match &self.handle.data {
            NodeData::Element { name, .. } => name,
            _ => unreachable!("Element always wraps an element node"),
        }
    }

    #[allow(clippy::unreachable)]
    fn attrs(&self) -> &RefCell<Vec<Attribute>> {
        match &self.handle.data {
            NodeData::Element { attrs, .. } => attrs,
            _ => unreachable!("Element always wraps an element node"),
        }
    }

    /// Tag name as parsed, including any `prefix:` (lower-cased by the parser)
    #[must_use]
    pub fn qualified_name(&self) -> String {
        self.qual_name().local.to_string()
    }

    /// Tag name without its prefix
    #[must_use]
    pub fn local_name(&self) -> String {
        let name = self.qualified_name();
        split_prefixed(&name).1.to_string()
    }

    /// Whether the unprefixed tag name equals `local` (case-insensitive)
    #[must_use]
    pub fn is_named(&self, local: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(local)
    }

    /// All attributes as `(qualified name, value)` in document order
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, String)> {
        self.attrs()
            .borrow()
            .iter()
            .map(|a| (a.name.local.to_string(), a.value.to_string()))
            .collect()
    }

    /// Attribute value by qualified name (case-insensitive)
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attrs()
            .borrow()
            .iter()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string())
    }

    /// Attribute value by namespace URI and local name, resolving prefixes
    /// through in-scope `xmlns:` declarations.
    #[must_use]
    pub fn namespaced_attribute(&self, namespace: &str, local: &str) -> Option<String> {
        self.attributes().into_iter().find_map(|(name, value)| {
            let (prefix, attr_local) = split_prefixed(&name);
            let prefix = prefix?;
            if !attr_local.eq_ignore_ascii_case(local) {
                return None;
            }
            (self.lookup_namespace(prefix).as_deref() == Some(namespace)).then_some(value)
        })
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut attrs = self.attrs().borrow_mut();
        if let Some(existing) = attrs
            .iter_mut()
            .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(name))
        {
            existing.value = StrTendril::from_slice(value);
            return;
        }
        attrs.push(Attribute {
            name: QualName::new(None, Namespace::from(""), LocalName::from(name)),
            value: StrTendril::from_slice(value),
        });
    }

    /// Add an attribute, overwriting any existing value.
    pub fn add_attribute(&self, name: &str, value: &str) {
        self.set_attribute(name, value);
    }

    /// Append `value` to an attribute, comma-joining with any existing value.
    pub fn append_attribute(&self, name: &str, value: &str) {
        match self.attribute(name) {
            Some(existing) if !existing.is_empty() => {
                self.set_attribute(name, &format!("{existing},{value}"));
            }
            _ => self.set_attribute(name, value),
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attribute(&self, name: &str) {
        self.attrs()
            .borrow_mut()
            .retain(|a| !a.name.local.as_ref().eq_ignore_ascii_case(name));
    }

    /// Whether the `class` attribute lists `class`
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Add a CSS class unless already present.
    pub fn add_class(&self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attribute("class") {
            Some(existing) if !existing.trim().is_empty() => {
                self.set_attribute("class", &format!("{} {class}", existing.trim()));
            }
            _ => self.set_attribute("class", class),
        }
    }

    /// Resolve a namespace prefix declared on this element or an ancestor.
    #[must_use]
    pub fn lookup_namespace(&self, prefix: &str) -> Option<String> {
        let declaration = format!("xmlns:{prefix}");
        let mut current = Some(self.handle.clone());
        while let Some(node) = current {
            if let NodeData::Element { attrs, .. } = &node.data {
                if let Some(attr) = attrs
                    .borrow()
                    .iter()
                    .find(|a| a.name.local.as_ref().eq_ignore_ascii_case(&declaration))
                {
                    return Some(attr.value.to_string());
                }
            }
            current = parent_of(&node).ok().flatten();
        }
        None
    }

    /// Concatenated text of all descendant text nodes
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.handle, &mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&self, text: &str) {
        for child in self.handle.children.borrow_mut().drain(..) {
            child.parent.set(Some(Weak::new()));
        }
        if !text.is_empty() {
            self.append_text(text);
        }
    }

    /// Append a text node.
    pub fn append_text(&self, text: &str) {
        let node = Node::new(NodeData::Text {
            contents: RefCell::new(StrTendril::from_slice(text)),
        });
        node.parent.set(Some(Rc::downgrade(&self.handle)));
        self.handle.children.borrow_mut().push(node);
    }

    /// Whether the element is still reachable from its root.
    ///
    /// Freshly created elements count as live; removed ones do not.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.ensure_live().is_ok()
    }

    fn ensure_live(&self) -> Result<(), ElementError> {
        let mut node = self.handle.clone();
        loop {
            match parent_of(&node) {
                Ok(Some(parent)) => node = parent,
                Ok(None) => return Ok(()),
                Err(()) => {
                    return Err(ElementError::Stale {
                        name: self.qualified_name(),
                    })
                }
            }
        }
    }

    /// Parent element, `None` at the root
    pub fn parent(&self) -> Result<Option<Self>, ElementError> {
        self.ensure_live()?;
        Ok(parent_of(&self.handle)
            .ok()
            .flatten()
            .and_then(|p| Self::wrap(p).ok()))
    }

    /// Direct child elements in document order
    pub fn child_elements(&self) -> Result<Vec<Self>, ElementError> {
        self.ensure_live()?;
        Ok(self
            .handle
            .children
            .borrow()
            .iter()
            .filter_map(|c| Self::wrap(c.clone()).ok())
            .collect())
    }

    /// First direct child element named `local`
    pub fn first_child_element(&self, local: &str) -> Result<Option<Self>, ElementError> {
        Ok(self.child_elements()?.into_iter().find(|c| c.is_named(local)))
    }

    /// Lazy document-order iterator over descendants named `local`
    /// (`*` matches every element). Clone the iterator to restart it.
    pub fn descendants(&self, local: &str) -> Result<Descendants, ElementError> {
        self.ensure_live()?;
        let mut stack: Vec<Handle> = self.handle.children.borrow().iter().cloned().collect();
        stack.reverse();
        Ok(Descendants {
            stack,
            name: (local != "*").then(|| local.to_ascii_lowercase()),
        })
    }

    /// Append `child` as the last child, detaching it from any previous parent.
    pub fn append_child(&self, child: &Self) -> Result<(), ElementError> {
        self.ensure_live()?;
        detach(&child.handle);
        child.handle.parent.set(Some(Rc::downgrade(&self.handle)));
        self.handle.children.borrow_mut().push(child.handle.clone());
        Ok(())
    }

    /// Insert `child` as the first child.
    pub fn prepend_child(&self, child: &Self) -> Result<(), ElementError> {
        self.ensure_live()?;
        detach(&child.handle);
        child.handle.parent.set(Some(Rc::downgrade(&self.handle)));
        self.handle.children.borrow_mut().insert(0, child.handle.clone());
        Ok(())
    }

    /// Insert `sibling` directly after this element.
    pub fn insert_after(&self, sibling: &Self) -> Result<(), ElementError> {
        self.ensure_live()?;
        let parent = parent_of(&self.handle)
            .ok()
            .flatten()
            .ok_or_else(|| ElementError::Missing {
                name: "parent".to_string(),
            })?;
        detach(&sibling.handle);
        let mut children = parent.children.borrow_mut();
        let index = children
            .iter()
            .position(|c| Rc::ptr_eq(c, &self.handle))
            .map_or(children.len(), |i| i + 1);
        sibling.handle.parent.set(Some(Rc::downgrade(&parent)));
        children.insert(index, sibling.handle.clone());
        Ok(())
    }

    /// Remove this element from its parent. Later navigation fails as stale.
    pub fn remove(&self) -> Result<(), ElementError> {
        self.ensure_live()?;
        detach(&self.handle);
        self.handle.parent.set(Some(Weak::new()));
        Ok(())
    }

    /// Move every child node (elements and text) to the end of `dest`.
    pub fn move_children_to(&self, dest: &Self) -> Result<(), ElementError> {
        self.ensure_live()?;
        dest.ensure_live()?;
        let children: Vec<Handle> = self.handle.children.borrow_mut().drain(..).collect();
        let mut dest_children = dest.handle.children.borrow_mut();
        for child in children {
            child.parent.set(Some(Rc::downgrade(&dest.handle)));
            dest_children.push(child);
        }
        Ok(())
    }
}

/// Parent of a node: `Ok(None)` at a root, `Err(())` when the node was removed.
fn parent_of(node: &Handle) -> Result<Option<Handle>, ()> {
    let weak = node.parent.take();
    let result = match &weak {
        None => Ok(None),
        Some(w) => w.upgrade().map(Some).ok_or(()),
    };
    node.parent.set(weak);
    result
}

fn detach(node: &Handle) {
    if let Ok(Some(parent)) = parent_of(node) {
        parent
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, node));
    }
    node.parent.set(None);
}

fn collect_text(node: &Handle, out: &mut String) {
    for child in node.children.borrow().iter() {
        match &child.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => collect_text(child, out),
            _ => {}
        }
    }
}

/// Iterator returned by [`Element::descendants`].
#[derive(Clone)]
pub struct Descendants {
    stack: Vec<Handle>,
    name: Option<String>,
}

impl fmt::Debug for Descendants {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descendants")
            .field("pending", &self.stack.len())
            .field("name", &self.name)
            .finish()
    }
}

impl Iterator for Descendants {
    type Item = Element;

    fn next(&mut self) -> Option<Element> {
        while let Some(node) = self.stack.pop() {
            for child in node.children.borrow().iter().rev() {
                self.stack.push(child.clone());
            }
            if let Ok(element) = Element::wrap(node) {
                match &self.name {
                    Some(name) if !element.is_named(name) => {}
                    _ => return Some(element),
                }
            }
        }
        None
    }
}

/// A parsed specification document bound to its logical location.
pub struct Document {
    dom: RcDom,
    resource: Resource,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("resource", &self.resource)
            .finish()
    }
}

impl Document {
    /// Parse HTML source. Missing `<html>`, `<head>` and `<body>` elements are
    /// inserted by the parser.
    #[must_use]
    pub fn parse(html: &str, resource: Resource) -> Self {
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(html);
        Self { dom, resource }
    }

    /// Logical location of the document
    #[must_use]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Resolve an `href` relative to this document.
    #[must_use]
    pub fn relative_resource(&self, href: &str) -> Resource {
        self.resource.relative_resource(href)
    }

    /// The `<html>` element
    pub fn root(&self) -> Result<Element, ElementError> {
        self.dom
            .document
            .children
            .borrow()
            .iter()
            .find_map(|c| Element::wrap(c.clone()).ok())
            .ok_or_else(|| ElementError::Missing {
                name: "html".to_string(),
            })
    }

    /// The `<head>` element, created if absent
    pub fn head(&self) -> Result<Element, ElementError> {
        let root = self.root()?;
        if let Some(head) = root.first_child_element("head")? {
            return Ok(head);
        }
        let head = Element::new("head");
        root.prepend_child(&head)?;
        Ok(head)
    }

    /// The `<body>` element
    pub fn body(&self) -> Result<Element, ElementError> {
        self.root()?
            .first_child_element("body")?
            .ok_or_else(|| ElementError::Missing {
                name: "body".to_string(),
            })
    }

    /// Every prefix bound to `namespace` by an `xmlns:` declaration
    pub fn namespace_prefixes(&self, namespace: &str) -> Result<Vec<String>, ElementError> {
        let root = self.root()?;
        let mut prefixes = Vec::new();
        for element in std::iter::once(root.clone()).chain(root.descendants("*")?) {
            for (name, value) in element.attributes() {
                if let Some(prefix) = name.strip_prefix("xmlns:") {
                    if value == namespace && !prefixes.iter().any(|p| p == prefix) {
                        prefixes.push(prefix.to_string());
                    }
                }
            }
        }
        Ok(prefixes)
    }

    /// Serialise the (possibly rewritten) document.
    pub fn to_html(&self) -> ConcordantResult<String> {
        let mut bytes = Vec::new();
        let handle: SerializableHandle = self.dom.document.clone().into();
        serialize(&mut bytes, &handle, SerializeOpts::default())?;
        String::from_utf8(bytes).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()).into()
        })
    }
}
