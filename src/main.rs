mod batch;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use accordion_json_ld::input::{forest_from_content, read_content, InputFormat};
use accordion_json_ld::parser::blocks::{is_container, is_header, is_panel, is_qa_group};
use accordion_json_ld::parser::extract::extract_qa_items_with_depth;
use accordion_json_ld::{BlockRole, RenderContext, Renderer, Settings};

#[derive(Parser)]
#[command(name = "accordion-json-ld", about = "FAQPage JSON-LD from accordion blocks")]
struct Cli {
    /// Settings file (default: ./accordion-json-ld.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the question/answer pairs found in a post as JSON
    Extract {
        /// Post content file, `-` for stdin
        input: PathBuf,
        /// Input is parsed-block JSON (implied by a .json extension)
        #[arg(long)]
        json: bool,
    },
    /// Print the FAQPage script tag for a post (nothing when it has no FAQ)
    Render {
        /// Post content file, `-` for stdin
        input: PathBuf,
        /// Input is parsed-block JSON (implied by a .json extension)
        #[arg(long)]
        json: bool,
        /// Post id handed to schema filters
        #[arg(long)]
        post_id: Option<u64>,
    },
    /// Show how block names are classified
    Classify {
        /// Block names, e.g. core/accordion-item
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Render every .html/.json post in a directory
    Batch {
        dir: PathBuf,
        /// Write `<name>.jsonld.html` files here instead of only reporting
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Max posts to process
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    let result = match cli.command {
        Commands::Extract { input, json } => {
            let format = input_format(&input, json);
            let content = read_content(&input)?;
            let forest = forest_from_content(&content, format, settings.max_depth)?;
            let items = extract_qa_items_with_depth(&forest, settings.max_depth);
            info!(questions = items.len(), "extracted");
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }
        Commands::Render { input, json, post_id } => {
            let format = input_format(&input, json);
            let content = read_content(&input)?;
            let renderer = Renderer::new(settings);
            let ctx = RenderContext { post_id };
            match renderer.render_as(&content, format, &ctx)? {
                Some(tag) => print!("{}", tag),
                None => info!("No complete question/answer pairs, nothing to output."),
            }
            Ok(())
        }
        Commands::Classify { names } => {
            println!(
                "{:<40} | {:<9} | {:<9} | {:<8} | {:<6} | {:<5}",
                "Block", "Role", "Container", "QA group", "Header", "Panel"
            );
            println!("{}", "-".repeat(91));
            for name in &names {
                println!(
                    "{:<40} | {:<9} | {:<9} | {:<8} | {:<6} | {:<5}",
                    truncate(name, 40),
                    BlockRole::of(name).as_str(),
                    yes_no(is_container(name)),
                    yes_no(is_qa_group(name)),
                    yes_no(is_header(name)),
                    yes_no(is_panel(name)),
                );
            }
            Ok(())
        }
        Commands::Batch { dir, out, limit } => {
            let posts = list_posts(&dir, limit)?;
            if posts.is_empty() {
                println!("No .html or .json posts in {}.", dir.display());
                return Ok(());
            }
            if let Some(out) = &out {
                std::fs::create_dir_all(out)
                    .with_context(|| format!("Failed to create {}", out.display()))?;
            }
            println!("Rendering {} posts...", posts.len());
            let renderer = Renderer::new(settings);
            let counts = batch::render_all(&renderer, &posts, out.as_deref())?;
            counts.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn input_format(path: &Path, json: bool) -> InputFormat {
    if json {
        InputFormat::Json
    } else {
        InputFormat::from_path(path)
    }
}

fn list_posts(dir: &Path, limit: Option<usize>) -> Result<Vec<PathBuf>> {
    let mut posts: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("html") | Some("json")
                )
        })
        .collect();
    posts.sort();
    if let Some(n) = limit {
        posts.truncate(n);
    }
    Ok(posts)
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "-"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_posts_filters_and_limits() {
        let posts = list_posts(Path::new("tests/fixtures"), None).unwrap();
        let names: Vec<String> = posts
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["faq-blocks.json", "faq-post.html", "no-faq-post.html"]);
        assert_eq!(list_posts(Path::new("tests/fixtures"), Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn json_flag_overrides_extension() {
        assert_eq!(input_format(Path::new("post.html"), true), InputFormat::Json);
        assert_eq!(input_format(Path::new("post.html"), false), InputFormat::Markup);
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("core/accordion", 40), "core/accordion");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["accordion-json-ld", "render", "post.html", "--post-id", "7"]).unwrap();
        assert!(matches!(cli.command, Commands::Render { post_id: Some(7), json: false, .. }));
        assert!(Cli::try_parse_from(["accordion-json-ld", "classify"]).is_err());
    }
}
