use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use thiserror::Error;

/// SEC-003: Maximum allowed element nesting depth.
/// Prevents stack exhaustion from maliciously deep feed documents.
const MAX_DOCUMENT_DEPTH: usize = 50;

/// Errors that can occur while building or querying a document tree.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// XML parsing failed before a complete tree could be built.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// SEC-003: Element nesting depth exceeds the safety limit.
    #[error("document nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    /// A required child element was not found.
    #[error("no child element named <{0}>")]
    NotFound(String),

    /// The feed bytes were not valid UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

/// One element of a parsed XML document.
///
/// Owns its attributes, accumulated text content, and children in document
/// order. There are no parent links and no sharing; parents own children
/// outright, so the tree is plain data with no interior mutability.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    /// Element tag name, namespace prefix stripped.
    pub tag: String,
    /// Attribute name → unescaped value. Duplicate attribute names keep the
    /// first occurrence.
    pub attributes: HashMap<String, String>,
    /// Concatenated text and CDATA content directly inside this element.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    fn new(tag: String) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// Returns the first direct child with the given tag name.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::NotFound`] when no such child exists. Callers
    /// that can tolerate absence should use [`DocumentNode::all`] instead.
    pub fn first(&self, tag: &str) -> Result<&DocumentNode, DocumentError> {
        self.children
            .iter()
            .find(|c| c.tag == tag)
            .ok_or_else(|| DocumentError::NotFound(tag.to_string()))
    }

    /// Returns all direct children with the given tag name, in document
    /// order. An empty result is not an error.
    pub fn all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a DocumentNode> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Returns the value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Parses raw feed bytes into a document tree.
///
/// The returned node is a synthetic root whose children are the document's
/// top-level elements; for a well-formed feed that is a single child. Tag
/// names keep their local part only (a `media:thumbnail` element becomes
/// `thumbnail`), matching how the feed vocabulary is looked up.
///
/// # Errors
///
/// Returns [`DocumentError::XmlParse`] for malformed XML,
/// [`DocumentError::MaxDepthExceeded`] past the nesting cap, and
/// [`DocumentError::Encoding`] for non-UTF-8 input.
///
/// # Security
///
/// XXE is structurally mitigated: `quick-xml` (0.37) does not parse
/// `<!ENTITY>` declarations, and `decode_and_unescape_value()` resolves only
/// the five XML builtin entities. See SEC-002 in `Cargo.toml`.
pub fn parse_document(bytes: &[u8]) -> Result<DocumentNode, DocumentError> {
    let content = std::str::from_utf8(bytes)?;
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    // Stack of open elements; index 0 is the synthetic root.
    let mut stack: Vec<DocumentNode> = vec![DocumentNode::new(String::new())];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if stack.len() > MAX_DOCUMENT_DEPTH {
                    return Err(DocumentError::MaxDepthExceeded(MAX_DOCUMENT_DEPTH));
                }
                let node = open_element(&e, &reader)?;
                stack.push(node);
            }
            Ok(Event::Empty(e)) => {
                let node = open_element(&e, &reader)?;
                // Self-closing element; attach immediately.
                attach(&mut stack, node);
            }
            Ok(Event::End(_)) => {
                // quick-xml validates tag balance, so the stack cannot
                // underflow past the synthetic root here.
                if stack.len() > 1 {
                    let node = stack.pop().unwrap_or_else(|| DocumentNode::new(String::new()));
                    attach(&mut stack, node);
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| DocumentError::XmlParse(e.to_string()))?;
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(DocumentError::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let root = stack
        .into_iter()
        .next()
        .unwrap_or_else(|| DocumentNode::new(String::new()));
    Ok(root)
}

/// Builds a node from a start or empty-element event, decoding attributes.
fn open_element(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<DocumentNode, DocumentError> {
    let name = e.name();
    let local = name.local_name();
    let tag = String::from_utf8_lossy(local.as_ref()).into_owned();
    let mut node = DocumentNode::new(tag);

    let decoder = reader.decoder();
    for attr_result in e.attributes() {
        let attr = match attr_result {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed attribute");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(|e| DocumentError::XmlParse(e.to_string()))?
            .to_string();
        node.attributes.entry(key).or_insert(value);
    }

    Ok(node)
}

fn attach(stack: &mut [DocumentNode], node: DocumentNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}
