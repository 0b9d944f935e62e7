//! FAQPage JSON-LD from accordion blocks.
//!
//! Post content (serialized block markup or the host's parsed-block JSON) is
//! turned into a block forest, walked for accordion items and wrapped into a
//! schema.org `FAQPage` document ready for an `application/ld+json` script tag.

pub mod error;
pub mod input;
pub mod parser;
pub mod schema;
pub mod settings;

pub use error::{Error, Result};
pub use parser::blocks::{BlockNode, BlockRole};
pub use parser::extract::{extract_qa_items, QaItem};
pub use parser::text::extract_text_from_block;
pub use schema::{RenderContext, Renderer, SchemaDocument, SchemaFilters};
pub use settings::Settings;
