use std::io;

use serde::Serialize;
use serde_json::ser::{CharEscape, CompactFormatter, Formatter, PrettyFormatter, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::input::{forest_from_content, InputFormat};
use crate::parser::blocks::BlockNode;
use crate::parser::extract::{extract_qa_items_with_depth, QaItem};
use crate::parser::markup::parse_blocks_with_depth;
use crate::settings::Settings;

pub const SCHEMA_CONTEXT: &str = "https://schema.org";
pub const SCRIPT_TYPE: &str = "application/ld+json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDocument {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(rename = "mainEntity")]
    pub main_entity: Vec<Question>,
    /// Properties added by filters, written after `mainEntity`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    #[serde(rename = "@type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "acceptedAnswer")]
    pub accepted_answer: Answer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    #[serde(rename = "@type")]
    pub kind: String,
    pub text: String,
}

impl From<QaItem> for Question {
    fn from(item: QaItem) -> Self {
        Question {
            kind: "Question".to_string(),
            name: item.question,
            accepted_answer: Answer {
                kind: "Answer".to_string(),
                text: item.answer,
            },
        }
    }
}

impl SchemaDocument {
    /// `None` when there is nothing to describe.
    pub fn from_items(items: Vec<QaItem>, context_url: &str) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        Some(SchemaDocument {
            context: context_url.to_string(),
            kind: "FAQPage".to_string(),
            main_entity: items.into_iter().map(Question::from).collect(),
            extra: Map::new(),
        })
    }
}

/// What the host knows about the content being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub post_id: Option<u64>,
}

pub type SchemaFilter = Box<dyn Fn(SchemaDocument, &RenderContext) -> SchemaDocument + Send + Sync>;

/// Ordered rewrites applied to every document before encoding.
#[derive(Default)]
pub struct SchemaFilters {
    filters: Vec<SchemaFilter>,
}

impl SchemaFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(SchemaDocument, &RenderContext) -> SchemaDocument + Send + Sync + 'static,
    {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn apply(&self, doc: SchemaDocument, ctx: &RenderContext) -> SchemaDocument {
        self.filters.iter().fold(doc, |doc, filter| filter(doc, ctx))
    }
}

/// JSON with `<`, `>`, `&`, `'` and `"` inside strings written as `\u00XX`
/// escapes so the output can sit inside a `<script>` element. Slashes and
/// non-ASCII text are written as-is.
pub fn encode(doc: &SchemaDocument, pretty: bool) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = HtmlSafeFormatter {
        pretty: pretty.then(|| PrettyFormatter::with_indent(b"    ")),
    };
    let mut ser = Serializer::with_formatter(&mut buf, formatter);
    doc.serialize(&mut ser).map_err(Error::Encode)?;
    Ok(String::from_utf8(buf)?)
}

pub fn script_tag(json: &str) -> String {
    format!("<script type=\"{}\">\n{}\n</script>\n", SCRIPT_TYPE, json)
}

/// Content → `<script type="application/ld+json">` element, or `None` when the
/// content holds no complete question/answer pair.
pub struct Renderer {
    settings: Settings,
    filters: SchemaFilters,
}

impl Renderer {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            filters: SchemaFilters::new(),
        }
    }

    pub fn with_filters(settings: Settings, filters: SchemaFilters) -> Self {
        Self { settings, filters }
    }

    pub fn filters_mut(&mut self) -> &mut SchemaFilters {
        &mut self.filters
    }

    pub fn render(&self, content: &str, ctx: &RenderContext) -> Result<Option<String>> {
        if content.trim().is_empty() {
            debug!(post_id = ?ctx.post_id, "empty content");
            return Ok(None);
        }
        let forest = parse_blocks_with_depth(content, self.settings.max_depth);
        self.render_blocks(&forest, ctx)
    }

    pub fn render_as(&self, content: &str, format: InputFormat, ctx: &RenderContext) -> Result<Option<String>> {
        match format {
            InputFormat::Markup => self.render(content, ctx),
            InputFormat::Json => {
                self.render_blocks(&forest_from_content(content, format, self.settings.max_depth)?, ctx)
            }
        }
    }

    pub fn render_blocks(&self, forest: &[BlockNode], ctx: &RenderContext) -> Result<Option<String>> {
        match self.schema_for(forest, ctx) {
            Some(doc) => {
                let json = encode(&doc, self.settings.pretty)?;
                Ok(Some(script_tag(&json)))
            }
            None => Ok(None),
        }
    }

    /// Extracted, wrapped and filtered document; `None` whenever `mainEntity`
    /// would be empty.
    pub fn schema_for(&self, forest: &[BlockNode], ctx: &RenderContext) -> Option<SchemaDocument> {
        if forest.is_empty() {
            return None;
        }
        let items = extract_qa_items_with_depth(forest, self.settings.max_depth);
        let doc = SchemaDocument::from_items(items, &self.settings.context_url)?;

        let doc = self.filters.apply(doc, ctx);
        if doc.main_entity.is_empty() {
            debug!(post_id = ?ctx.post_id, "schema emptied by filters");
            return None;
        }
        info!(post_id = ?ctx.post_id, questions = doc.main_entity.len(), "FAQPage schema built");
        Some(doc)
    }
}

struct HtmlSafeFormatter<'a> {
    pretty: Option<PrettyFormatter<'a>>,
}

impl Formatter for HtmlSafeFormatter<'_> {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped: &[u8] = match c {
                '<' => b"\\u003C",
                '>' => b"\\u003E",
                '&' => b"\\u0026",
                '\'' => b"\\u0027",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped)?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }

    fn write_char_escape<W>(&mut self, writer: &mut W, char_escape: CharEscape) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        #[allow(unreachable_patterns)]
        let escaped: &[u8] = match char_escape {
            CharEscape::Quote => b"\\u0022",
            CharEscape::ReverseSolidus => b"\\\\",
            CharEscape::Solidus => b"\\/",
            CharEscape::Backspace => b"\\b",
            CharEscape::FormFeed => b"\\f",
            CharEscape::LineFeed => b"\\n",
            CharEscape::CarriageReturn => b"\\r",
            CharEscape::Tab => b"\\t",
            CharEscape::AsciiControl(byte) => {
                let bytes = [
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX[(byte >> 4) as usize],
                    HEX[(byte & 0xF) as usize],
                ];
                return writer.write_all(&bytes);
            }
            _ => return CompactFormatter.write_char_escape(writer, char_escape),
        };
        writer.write_all(escaped)
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.begin_array(writer),
            None => CompactFormatter.begin_array(writer),
        }
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.end_array(writer),
            None => CompactFormatter.end_array(writer),
        }
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.begin_array_value(writer, first),
            None => CompactFormatter.begin_array_value(writer, first),
        }
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.end_array_value(writer),
            None => CompactFormatter.end_array_value(writer),
        }
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.begin_object(writer),
            None => CompactFormatter.begin_object(writer),
        }
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.end_object(writer),
            None => CompactFormatter.end_object(writer),
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.begin_object_key(writer, first),
            None => CompactFormatter.begin_object_key(writer, first),
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.begin_object_value(writer),
            None => CompactFormatter.begin_object_value(writer),
        }
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        match &mut self.pretty {
            Some(p) => p.end_object_value(writer),
            None => CompactFormatter.end_object_value(writer),
        }
    }
}
