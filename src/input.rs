use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::parser::blocks::{forest_from_json, BlockNode};
use crate::parser::markup::parse_blocks_with_depth;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Serialized block markup (post content).
    Markup,
    /// Parsed-block JSON array.
    Json,
}

impl InputFormat {
    /// `.json` files are parsed-block JSON, anything else is markup.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Markup,
        }
    }
}

/// File contents, or stdin for `-`.
pub fn read_content(path: &Path) -> Result<String> {
    let read_err = |source: std::io::Error| Error::Read {
        path: PathBuf::from(path),
        source,
    };
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(read_err)
}

/// Block forest of `content`. Markup nests at most `max_depth` levels; JSON
/// is bounded by the decoder's own recursion limit.
pub fn forest_from_content(content: &str, format: InputFormat, max_depth: usize) -> Result<Vec<BlockNode>> {
    match format {
        InputFormat::Markup => Ok(parse_blocks_with_depth(content, max_depth)),
        InputFormat::Json => forest_from_json(content).map_err(Error::BlockJson),
    }
}
