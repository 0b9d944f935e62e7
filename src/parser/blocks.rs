use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const ENABLED_ATTRIBUTE: &str = "accordionJsonLdEnabled";

const CONTAINER_NAME: &str = "core/accordion";
const CONTAINER_SUFFIX: &str = "/accordion";
const QA_GROUP_NAMES: &[&str] = &["core/accordion-content", "core/accordion-item"];
const QA_GROUP_KEYWORDS: &[&str] = &["accordion-content", "accordion-item"];
const HEADER_NAMES: &[&str] = &["core/accordion-header", "core/accordion-heading"];
const HEADER_KEYWORDS: &[&str] = &["accordion-header", "accordion-heading"];
const PANEL_NAMES: &[&str] = &["core/accordion-panel"];
const PANEL_KEYWORDS: &[&str] = &["accordion-panel"];

/// One node of a parsed block document, in the host's parsed-block JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    #[serde(
        rename = "blockName",
        default,
        deserialize_with = "name_or_empty",
        serialize_with = "empty_as_null"
    )]
    pub type_name: String,
    #[serde(rename = "attrs", default, deserialize_with = "object_or_empty")]
    pub attributes: Map<String, Value>,
    #[serde(rename = "innerHTML", default, deserialize_with = "string_only")]
    pub raw_markup: Option<String>,
    #[serde(rename = "innerContent", default, deserialize_with = "fragments")]
    pub raw_fragments: Vec<String>,
    #[serde(rename = "innerBlocks", default, deserialize_with = "nodes_only")]
    pub children: Vec<BlockNode>,
}

impl BlockNode {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            attributes: Map::new(),
            raw_markup: None,
            raw_fragments: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_markup(mut self, markup: impl Into<String>) -> Self {
        self.raw_markup = Some(markup.into());
        self
    }

    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw_fragments = fragments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children(mut self, children: Vec<BlockNode>) -> Self {
        self.children = children;
        self
    }
}

// Unlinks descendants one at a time; a recursive drop of a deep tree
// overflows the stack.
impl Drop for BlockNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Decode a block forest from host JSON. Entries that are not block objects
/// are dropped; a non-array document yields an empty forest.
pub fn forest_from_json(json: &str) -> serde_json::Result<Vec<BlockNode>> {
    let value: Value = serde_json::from_str(json)?;
    Ok(nodes_from_value(value))
}

fn nodes_from_value(value: Value) -> Vec<BlockNode> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|v| BlockNode::deserialize(v).ok())
            .collect(),
        _ => Vec::new(),
    }
}

fn name_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn empty_as_null<S: Serializer>(name: &str, s: S) -> Result<S::Ok, S::Error> {
    if name.is_empty() {
        s.serialize_none()
    } else {
        s.serialize_str(name)
    }
}

fn object_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn string_only<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// null placeholders (inner block slots) join as empty strings
fn fragments<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => String::new(),
            })
            .collect(),
        _ => Vec::new(),
    })
}

fn nodes_only<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<BlockNode>, D::Error> {
    Ok(nodes_from_value(Value::deserialize(d)?))
}

// ── Classification ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Container,
    QaGroup,
    Header,
    Panel,
    Other,
}

impl BlockRole {
    /// Primary role of a block name. Predicates can overlap; the first match in
    /// container, qa-group, header, panel order wins.
    pub fn of(type_name: &str) -> Self {
        if is_container(type_name) {
            BlockRole::Container
        } else if is_qa_group(type_name) {
            BlockRole::QaGroup
        } else if is_header(type_name) {
            BlockRole::Header
        } else if is_panel(type_name) {
            BlockRole::Panel
        } else {
            BlockRole::Other
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockRole::Container => "container",
            BlockRole::QaGroup => "qa-group",
            BlockRole::Header => "header",
            BlockRole::Panel => "panel",
            BlockRole::Other => "other",
        }
    }
}

fn normalize(type_name: &str) -> String {
    type_name.to_ascii_lowercase()
}

fn matches_role(type_name: &str, names: &[&str], keywords: &[&str]) -> bool {
    let name = normalize(type_name);
    if name.is_empty() {
        return false;
    }
    names.contains(&name.as_str()) || keywords.iter().any(|kw| name.contains(kw))
}

/// `core/accordion` or any `<ns>/accordion`. Suffix match only: `x/accordion-foo`
/// is not a container.
pub fn is_container(type_name: &str) -> bool {
    let name = normalize(type_name);
    if name.is_empty() {
        return false;
    }
    name == CONTAINER_NAME || name.ends_with(CONTAINER_SUFFIX)
}

pub fn is_qa_group(type_name: &str) -> bool {
    matches_role(type_name, QA_GROUP_NAMES, QA_GROUP_KEYWORDS)
}

pub fn is_header(type_name: &str) -> bool {
    matches_role(type_name, HEADER_NAMES, HEADER_KEYWORDS)
}

pub fn is_panel(type_name: &str) -> bool {
    matches_role(type_name, PANEL_NAMES, PANEL_KEYWORDS)
}

/// Opt-in flag. Absent means disabled; any present value other than the
/// boolean `false` (null, 0, "", "false") means enabled.
pub fn is_enabled_for_block(node: &BlockNode) -> bool {
    match node.attributes.get(ENABLED_ATTRIBUTE) {
        Some(value) => *value != Value::Bool(false),
        None => false,
    }
}
