use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::warn;

use accordion_json_ld::input::{read_content, InputFormat};
use accordion_json_ld::{RenderContext, Renderer};

pub struct BatchCounts {
    pub posts: usize,
    pub with_faq: usize,
    pub errors: usize,
}

impl BatchCounts {
    pub fn print(&self) {
        println!(
            "Rendered {} posts: {} with FAQ schema, {} without, {} errors.",
            self.posts,
            self.with_faq,
            self.posts - self.with_faq - self.errors,
            self.errors,
        );
    }
}

enum Outcome {
    Rendered(String),
    Empty,
    Failed,
}

/// Posts are independent, so they render in parallel; results keep input order.
pub fn render_all(renderer: &Renderer, posts: &[PathBuf], out: Option<&Path>) -> Result<BatchCounts> {
    let pb = ProgressBar::new(posts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let outcomes: Vec<Outcome> = posts
        .par_iter()
        .map(|path| {
            let outcome = match render_one(renderer, path) {
                Ok(Some(tag)) => Outcome::Rendered(tag),
                Ok(None) => Outcome::Empty,
                Err(e) => {
                    warn!("{}: {:#}", path.display(), e);
                    Outcome::Failed
                }
            };
            pb.inc(1);
            outcome
        })
        .collect();
    pb.finish_and_clear();

    let mut counts = BatchCounts {
        posts: posts.len(),
        with_faq: 0,
        errors: 0,
    };
    for (path, outcome) in posts.iter().zip(&outcomes) {
        match outcome {
            Outcome::Rendered(tag) => {
                counts.with_faq += 1;
                match out {
                    Some(dir) => {
                        let target = dir.join(output_name(path));
                        std::fs::write(&target, tag)
                            .with_context(|| format!("Failed to write {}", target.display()))?;
                    }
                    None => println!("  {}: FAQ schema", path.display()),
                }
            }
            Outcome::Empty => {}
            Outcome::Failed => counts.errors += 1,
        }
    }
    Ok(counts)
}

fn render_one(renderer: &Renderer, path: &Path) -> Result<Option<String>> {
    let content = read_content(path)?;
    let rendered = renderer.render_as(&content, InputFormat::from_path(path), &RenderContext::default())?;
    Ok(rendered)
}

fn output_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "post".to_string());
    format!("{}.jsonld.html", stem)
}
