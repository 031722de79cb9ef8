//! XML adapter.
//!
//! Values map onto elements: object fields become child elements named after
//! the field, array elements become `<item>` children of an element marked
//! `kind="array"`, scalars become text content, and null becomes a
//! `null="true"` attribute. Field names that are not valid XML names (the
//! envelope fields `@type`/`@value`, starred collision names) travel as
//! `<field name="…">` wrapper elements, so every wire name round-trips.
//!
//! The sink assembles a small node tree and serialises it under a
//! configurable root element; the source parses with `roxmltree` and
//! linearises the document into events. XML has no native scalar types, so
//! the source runs in lexical mode: scalars surface as strings and typed
//! reads coerce.

use crate::adapter::{Event, EventSource, ListProducer, Sink};
use crate::error::{Result, WireformError};

enum XmlNode {
    Null,
    Text(String),
    Object(Vec<(String, XmlNode)>),
    Array(Vec<XmlNode>),
}

enum Frame {
    Object {
        children: Vec<(String, XmlNode)>,
        pending: Option<String>,
    },
    Array(Vec<XmlNode>),
}

/// Builds an XML document from sink calls.
pub struct XmlSink {
    root_name: String,
    stack: Vec<Frame>,
    root: Option<XmlNode>,
}

impl XmlSink {
    /// A sink whose document root element is `root_name`.
    pub fn new(root_name: &str) -> Self {
        Self {
            root_name: root_name.to_string(),
            stack: Vec::new(),
            root: None,
        }
    }

    /// Serialise the finished document.
    pub fn finish(self) -> Result<String> {
        if !self.stack.is_empty() {
            return Err(WireformError::Internal(
                "unbalanced object or array in XML sink".to_string(),
            ));
        }
        let root = self.root.ok_or_else(|| {
            WireformError::Internal("no value was written to the XML sink".to_string())
        })?;
        let mut out = String::new();
        serialize(&self.root_name, &root, &mut out);
        Ok(out)
    }

    fn attach(&mut self, node: XmlNode) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { children, pending }) => {
                let name = pending.take().ok_or_else(|| {
                    WireformError::Internal(
                        "value written into an object without a field name".to_string(),
                    )
                })?;
                children.push((name, node));
                Ok(())
            }
            Some(Frame::Array(items)) => {
                items.push(node);
                Ok(())
            }
            None => {
                if self.root.is_some() {
                    return Err(WireformError::Internal(
                        "more than one root value written".to_string(),
                    ));
                }
                self.root = Some(node);
                Ok(())
            }
        }
    }

    fn text(&mut self, text: String) -> Result<()> {
        self.attach(XmlNode::Text(text))
    }

    fn finite(v: f64) -> Result<f64> {
        if v.is_finite() {
            Ok(v)
        } else {
            Err(WireformError::MalformedScalar(format!(
                "{v} is not representable in XML"
            )))
        }
    }
}

impl Sink for XmlSink {
    fn write_null(&mut self) -> Result<()> {
        self.attach(XmlNode::Null)
    }

    fn write_bool(&mut self, v: bool) -> Result<()> {
        self.text(v.to_string())
    }

    fn write_i8(&mut self, v: i8) -> Result<()> {
        self.text(v.to_string())
    }

    fn write_i16(&mut self, v: i16) -> Result<()> {
        self.text(v.to_string())
    }

    fn write_i32(&mut self, v: i32) -> Result<()> {
        self.text(v.to_string())
    }

    fn write_i64(&mut self, v: i64) -> Result<()> {
        self.text(v.to_string())
    }

    fn write_f32(&mut self, v: f32) -> Result<()> {
        Self::finite(f64::from(v))?;
        self.text(format!("{v:?}"))
    }

    fn write_f64(&mut self, v: f64) -> Result<()> {
        Self::finite(v)?;
        self.text(format!("{v:?}"))
    }

    fn write_str(&mut self, v: &str) -> Result<()> {
        self.text(v.to_string())
    }

    fn start_object(&mut self) -> Result<()> {
        self.stack.push(Frame::Object {
            children: Vec::new(),
            pending: None,
        });
        Ok(())
    }

    fn field(&mut self, name: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(Frame::Object { pending, .. }) => {
                *pending = Some(name.to_string());
                Ok(())
            }
            _ => Err(WireformError::Internal(
                "field name written outside an object".to_string(),
            )),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Object { children, .. }) => self.attach(XmlNode::Object(children)),
            _ => Err(WireformError::Internal(
                "object closed without a matching open".to_string(),
            )),
        }
    }

    fn start_array(&mut self) -> Result<()> {
        self.stack.push(Frame::Array(Vec::new()));
        Ok(())
    }

    fn end_array(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Array(items)) => self.attach(XmlNode::Array(items)),
            _ => Err(WireformError::Internal(
                "array closed without a matching open".to_string(),
            )),
        }
    }
}

fn valid_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn escape(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
}

fn serialize(name: &str, node: &XmlNode, out: &mut String) {
    // Invalid wire names ride on a wrapper element with a name attribute.
    let (tag, name_attr) = if valid_xml_name(name) {
        (name, None)
    } else {
        ("field", Some(name))
    };
    out.push('<');
    out.push_str(tag);
    if let Some(attr) = name_attr {
        out.push_str(" name=\"");
        escape(attr, out);
        out.push('"');
    }
    match node {
        XmlNode::Null => out.push_str(" null=\"true\"/>"),
        XmlNode::Text(text) => {
            out.push('>');
            escape(text, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        XmlNode::Object(children) => {
            if children.is_empty() {
                out.push_str(" kind=\"object\"/>");
                return;
            }
            out.push('>');
            for (child_name, child) in children {
                serialize(child_name, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        XmlNode::Array(items) => {
            out.push_str(" kind=\"array\"");
            if items.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for item in items {
                serialize("item", item, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Event source over XML text.
pub type XmlSource = EventSource<ListProducer>;

/// Parse XML text into an event source.
pub fn source(text: &str) -> Result<XmlSource> {
    let document = roxmltree::Document::parse(text)
        .map_err(|e| WireformError::MalformedInput(format!("invalid XML: {e}")))?;
    let mut events = Vec::new();
    element_events(document.root_element(), &mut events);
    Ok(EventSource::lexical(ListProducer::new(events)))
}

fn field_name(element: roxmltree::Node<'_, '_>) -> String {
    if element.tag_name().name() == "field"
        && let Some(name) = element.attribute("name")
    {
        return name.to_string();
    }
    element.tag_name().name().to_string()
}

fn element_events(element: roxmltree::Node<'_, '_>, out: &mut Vec<Event>) {
    if element.attribute("null") == Some("true") {
        out.push(Event::Null);
        return;
    }
    if element.attribute("kind") == Some("array") {
        out.push(Event::StartArray);
        for child in element.children().filter(roxmltree::Node::is_element) {
            element_events(child, out);
        }
        out.push(Event::EndArray);
        return;
    }
    let children: Vec<_> = element
        .children()
        .filter(roxmltree::Node::is_element)
        .collect();
    if children.is_empty() && element.attribute("kind") != Some("object") {
        out.push(Event::Str(element.text().unwrap_or("").to_string()));
        return;
    }
    out.push(Event::StartObject);
    for child in children {
        out.push(Event::Field(field_name(child)));
        element_events(child, out);
    }
    out.push(Event::EndObject);
}
