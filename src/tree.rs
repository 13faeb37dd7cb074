//! Tree form of an action log
//!
//! Every action becomes a child [`Node`] of a single `keytrail` root. The
//! tag names the action kind, parameters are attributes, and the text of a
//! `type` action is the node's inline text. The tree is encoded as XML
//! (canonical) or JSON.

use crate::action::{Action, ActionLog};
use crate::error::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tag of the root container
pub const ROOT_TAG: &str = "keytrail";

const INDENT: &str = "  ";

/// A named tree node with ordered attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::missing_attribute(&self.name, key))
    }

    fn parse_attr<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.require(key)?;
        raw.parse()
            .map_err(|_| Error::invalid_value(&format!("{}@{}", self.name, key), raw))
    }

    // ------------------------------------------------------------------
    // XML
    // ------------------------------------------------------------------

    /// Render as an indented XML document
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        write_text(&mut writer, "\n")?;
        self.write_xml(&mut writer, 0)?;
        write_text(&mut writer, "\n")?;
        String::from_utf8(writer.into_inner()).map_err(|e| Error::malformed_log(e.to_string()))
    }

    fn write_xml(&self, writer: &mut Writer<Vec<u8>>, depth: usize) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            return writer.write_event(Event::Empty(start)).map_err(xml_error);
        }

        writer.write_event(Event::Start(start)).map_err(xml_error)?;
        if let Some(text) = &self.text {
            write_text(writer, text)?;
        }
        if !self.children.is_empty() {
            let inner = format!("\n{}", INDENT.repeat(depth + 1));
            for child in &self.children {
                write_text(writer, &inner)?;
                child.write_xml(writer, depth + 1)?;
            }
            write_text(writer, &format!("\n{}", INDENT.repeat(depth)))?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(xml_error)
    }

    /// Parse an XML document into its root node.
    ///
    /// Inline text of leaf elements is kept byte-exact; whitespace between
    /// child elements is layout and is dropped.
    pub fn from_xml(xml: &str) -> Result<Node> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => stack.push(node_from_start(&e)?),
                Event::Empty(e) => {
                    let node = node_from_start(&e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(xml_error)?;
                    if let Some(top) = stack.last_mut() {
                        top.text.get_or_insert_with(String::new).push_str(&text);
                    } else if !text.trim().is_empty() {
                        return Err(Error::malformed_log("text outside of the root element"));
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if let Some(top) = stack.last_mut() {
                        top.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
                Event::End(_) => {
                    let mut node = stack
                        .pop()
                        .ok_or_else(|| Error::malformed_log("unbalanced closing tag"))?;
                    if !node.children.is_empty() {
                        node.text = None;
                    }
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::malformed_log("unexpected end of document"));
        }
        root.ok_or_else(|| Error::malformed_log("document has no root element"))
    }

    // ------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Node> {
        Ok(serde_json::from_str(json)?)
    }
}

fn xml_error(e: impl std::fmt::Display) -> Error {
    Error::malformed_log(format!("xml: {}", e))
}

fn write_text(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<()> {
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)
}

fn node_from_start(e: &BytesStart<'_>) -> Result<Node> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut node = Node::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        node.attributes.push((key, value));
    }
    Ok(node)
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Error::malformed_log("document has more than one root element")),
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Action <-> Node
// ----------------------------------------------------------------------

impl From<&Action> for Node {
    fn from(action: &Action) -> Self {
        let node = Node::new(action.tag());
        match action {
            Action::Type { text } => node.with_text(text.clone()),
            Action::Enter => node,
            Action::Tab { times } => node.attr("times", times),
            Action::Sleep { duration } => node.attr("duration", duration),
            Action::Combo { modifier, key } => node.attr("modifier", modifier).attr("key", key),
            Action::Mouse { button, x, y } => node.attr("click", button).attr("x", x).attr("y", y),
            Action::MouseMove { x, y } => node.attr("x", x).attr("y", y),
            Action::MouseWheel { direction } => node.attr("scroll", direction),
            Action::Window { activate } => node.attr("activate", activate),
        }
    }
}

impl TryFrom<&Node> for Action {
    type Error = Error;

    fn try_from(node: &Node) -> Result<Self> {
        let action = match node.name.as_str() {
            "type" => Action::Type {
                text: node.text.clone().unwrap_or_default(),
            },
            "enter" => Action::Enter,
            "tab" => {
                let times = match node.get("times") {
                    Some(_) => node.parse_attr::<u32>("times")?,
                    None => 1,
                };
                if times == 0 {
                    return Err(Error::invalid_value("tab@times", "0"));
                }
                Action::Tab { times }
            }
            "sleep" => Action::Sleep {
                duration: node.parse_attr("duration")?,
            },
            "combo" => Action::Combo {
                modifier: node.require("modifier")?.parse()?,
                key: node.require("key")?.parse()?,
            },
            "mouse" => Action::Mouse {
                button: node.require("click")?.parse()?,
                x: node.parse_attr("x")?,
                y: node.parse_attr("y")?,
            },
            "mousemove" => Action::MouseMove {
                x: node.parse_attr("x")?,
                y: node.parse_attr("y")?,
            },
            "mousewheel" => Action::MouseWheel {
                direction: node.require("scroll")?.parse()?,
            },
            "window" => Action::Window {
                activate: node.require("activate")?.to_string(),
            },
            other => return Err(Error::unknown_action(other)),
        };
        Ok(action)
    }
}

impl ActionLog {
    pub fn to_tree(&self) -> Node {
        Node {
            name: ROOT_TAG.to_string(),
            children: self.iter().map(Node::from).collect(),
            ..Default::default()
        }
    }

    /// Rebuild a log from its tree form, rejecting the whole tree on the
    /// first unrecognized or malformed child.
    pub fn from_tree(root: &Node) -> Result<Self> {
        if root.name != ROOT_TAG {
            return Err(Error::malformed_log(format!(
                "expected <{}> root, found <{}>",
                ROOT_TAG, root.name
            )));
        }
        let actions = root
            .children
            .iter()
            .map(Action::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(ActionLog::new(actions))
    }

    pub fn to_xml(&self) -> Result<String> {
        self.to_tree().to_xml()
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::from_tree(&Node::from_xml(xml)?)
    }

    pub fn to_json(&self) -> Result<String> {
        self.to_tree().to_json()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_tree(&Node::from_json(json)?)
    }
}
