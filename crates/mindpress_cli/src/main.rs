mod site;
mod speakers;
mod walk;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mindpress_core::book::{combined_book, combined_public_book, export_chapter};
use mindpress_core::config::load_site_config;
use mindpress_core::lint::lint_text;
use mindpress_core::sources::SourceRegistry;

#[derive(Debug, Parser)]
#[command(name = "mindpress")]
struct Cli {
    #[arg(long = "source-dir", short = 's', global = true)]
    source_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Build the static site from the project tree.")]
    Build {
        #[arg(long, value_name = "PATH", default_value = "dist")]
        out: PathBuf,
    },
    #[command(about = "Lint provenance/citation syntax across the project.")]
    Lint,
    #[command(about = "Concatenate the chapters into a single book file.")]
    Book {
        #[arg(long)]
        public: bool,
    },
    #[command(about = "Export chapters as standalone series posts.")]
    ExportChapters {
        #[arg(long, value_name = "PATH", default_value = "content/series/chapters")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let root = root_dir(&cli)?;
    match &cli.command {
        Command::Build { out } => run_build(&root, out),
        Command::Lint => {
            let findings = run_lint(&root)?;
            if findings > 0 {
                eprintln!("\n{findings} provenance lint error(s).");
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Book { public } => run_book(&root, *public),
        Command::ExportChapters { out } => run_export_chapters(&root, out),
    }
}

fn root_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.source_dir {
        Some(path) => {
            if path.is_absolute() {
                Ok(path.clone())
            } else {
                let cwd = std::env::current_dir().context("failed to read current directory")?;
                Ok(cwd.join(path))
            }
        }
        None => std::env::current_dir().context("failed to read current directory"),
    }
}

fn run_build(root: &Path, out: &Path) -> Result<()> {
    let config = load_site_config(&root.join("mindpress.yaml"))?;
    site::build_site(root, out, &config)
}

/// Lint every content file that can carry citations. Returns the number
/// of findings; printing happens here, the exit code in `main`.
fn run_lint(root: &Path) -> Result<usize> {
    let registry = load_registry(root)?;

    let mut targets: Vec<(PathBuf, bool)> = Vec::new();
    for rel in [
        "site/home.md",
        "content/blog/index.md",
        "notes/glossary.md",
        "notes/claims.md",
        "notes/lineage.md",
    ] {
        let path = root.join(rel);
        if path.is_file() {
            targets.push((path, false));
        }
    }
    if root.join("manuscript").join("chapters").is_dir() {
        for path in walk::chapter_files(root)? {
            targets.push((path, true));
        }
    }
    for path in walk::blog_post_files(root) {
        targets.push((path, false));
    }

    let mut count = 0;
    for (path, is_chapter) in targets {
        let text = walk::read_markdown(&path)?;
        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        for finding in lint_text(&rel, &text, &registry, is_chapter) {
            println!("{finding}");
            count += 1;
        }
    }
    Ok(count)
}

fn run_book(root: &Path, public: bool) -> Result<()> {
    let config = load_site_config(&root.join("mindpress.yaml"))?;
    let chapter_files = walk::chapter_files(root)?;
    if chapter_files.is_empty() {
        bail!("no chapters under {}", root.join("manuscript/chapters").display());
    }
    let mut chapters = Vec::new();
    for path in &chapter_files {
        chapters.push(walk::read_markdown(path)?);
    }
    let references = read_optional(&root.join("manuscript").join("references.md"));

    let (out_path, book) = if public {
        (
            root.join("manuscript").join("book_public.md"),
            combined_public_book(&config.title, &config.subtitle, &chapters, references.as_deref()),
        )
    } else {
        (
            root.join("manuscript").join("book.md"),
            combined_book(&config.title, &config.subtitle, &chapters, references.as_deref()),
        )
    };
    std::fs::write(&out_path, book)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    println!("wrote {}", out_path.display());
    Ok(())
}

fn run_export_chapters(root: &Path, out: &Path) -> Result<()> {
    let chapter_files = walk::chapter_files(root)?;
    if chapter_files.is_empty() {
        bail!("no chapters under {}", root.join("manuscript/chapters").display());
    }
    let out_dir = if out.is_absolute() {
        out.to_path_buf()
    } else {
        root.join(out)
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut index_lines = vec![
        "# Chapter Series".to_string(),
        String::new(),
        "Standalone exports of the manuscript chapters.".to_string(),
        String::new(),
    ];
    for path in &chapter_files {
        let text = walk::read_markdown(path)?;
        let stem = walk::file_stem(path);
        let (title, body) = export_chapter(&text, &stem);
        let out_path = out_dir.join(format!("{stem}.md"));
        std::fs::write(&out_path, body)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        index_lines.push(format!("- {title} (`{}`)", out.join(format!("{stem}.md")).display()));
    }
    let index = index_lines.join("\n").trim_end().to_string() + "\n";
    std::fs::write(out_dir.join("index.md"), index)
        .with_context(|| format!("failed to write {}", out_dir.join("index.md").display()))?;
    println!("wrote {} posts to {}", chapter_files.len(), out_dir.display());
    Ok(())
}

fn load_registry(root: &Path) -> Result<SourceRegistry> {
    let path = root.join("sources").join("sources.csv");
    if !path.exists() {
        return Ok(SourceRegistry::default());
    }
    SourceRegistry::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

fn read_optional(path: &Path) -> Option<String> {
    std::fs::read_to_string(path).ok()
}
