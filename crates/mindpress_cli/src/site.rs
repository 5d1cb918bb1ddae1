//! Site build orchestration
//!
//! Reads the project tree, renders every page through the base template
//! and writes a fresh `dist/` (or `--out`) directory. Output is a pure
//! function of the inputs: no timestamps, no randomness.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mindpress_core::blocks::parse_blocks;
use mindpress_core::cite::Citer;
use mindpress_core::config::SiteConfig;
use mindpress_core::model::{Chapter, SearchDocument, search_index_json};
use mindpress_core::page::{PageTemplate, PageVars, absolute_page_url, build_nav};
use mindpress_core::render::render_blocks;
use mindpress_core::sources::SourceRegistry;
use walkdir::WalkDir;

use crate::speakers::SidecarSpeakerTime;
use crate::walk;

pub fn build_site(root: &Path, out: &Path, config: &SiteConfig) -> Result<()> {
    let out_dir = resolve_out_dir(root, out);
    guard_output_dir(root, &out_dir)?;
    if out_dir.exists() {
        std::fs::remove_dir_all(&out_dir)
            .with_context(|| format!("failed to clear {}", out_dir.display()))?;
    }
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    copy_assets(root, &out_dir)?;
    std::fs::write(out_dir.join(".nojekyll"), "").context("failed to write .nojekyll")?;

    let registry = load_registry(root)?;
    let speakers = SidecarSpeakerTime::new(root.join("transcripts").join("_speakers"));
    let citer = Citer::new(&registry, &speakers);

    let template_path = root.join("site").join("templates").join("base.html");
    let template_src = std::fs::read_to_string(&template_path)
        .with_context(|| format!("missing page template {}", template_path.display()))?;
    let template = PageTemplate::from_source(&template_src)?;

    let chapters = walk::load_chapters(root)?;
    let chapters_nav: Vec<(String, String)> = chapters
        .iter()
        .map(|c| (c.anchor_id.clone(), c.title.clone()))
        .collect();

    let writer = PageWriter {
        out_dir: &out_dir,
        template: &template,
        og_image_url: absolute_page_url(&config.base_url, "og.png"),
        base_url: &config.base_url,
        chapters_nav: &chapters_nav,
    };

    let mut search_index: Vec<SearchDocument> = Vec::new();

    // Home.
    let home_path = root.join("site").join("home.md");
    let home_md = match std::fs::read_to_string(&home_path) {
        Ok(text) => text,
        Err(_) => format!("# {}\n\n_Home content missing: site/home.md._\n", config.title),
    };
    let text = writer.emit(&citer, "index.html", &config.title, "home", "./", &home_md)?;
    search_index.push(entry("index.html", "Home", text));

    // Reader: generated TOC plus every chapter on one page.
    let reader_md = reader_markdown(&chapters);
    let text = writer.emit(&citer, "reader/index.html", "Reader", "reader", "../", &reader_md)?;
    search_index.push(entry("reader/index.html", "Reader", text));

    // Blog index and posts.
    let posts = load_blog_posts(root)?;
    let blog_index_md = blog_index_markdown(root, &posts);
    let text = writer.emit(&citer, "blog/index.html", "Blog", "blog-index", "../", &blog_index_md)?;
    search_index.push(entry("blog/index.html", "Blog", text));

    for post in &posts {
        let text = writer.emit(&citer, &post.href, &post.title, &post.href, "../", &post.markdown)?;
        search_index.push(entry(&post.href, &post.title, text));
    }

    // Per-chapter search results that jump into the reader.
    for chapter in &chapters {
        let rendered = render_blocks(&parse_blocks(&chapter.markdown), &citer);
        search_index.push(entry(
            &format!("reader/index.html#{}", chapter.anchor_id),
            &chapter.title,
            rendered.search_text,
        ));
    }

    // Knowledge-base pages, each only when its note file exists.
    for (name, title, page_id) in [
        ("glossary", "Glossary", "glossary"),
        ("claims", "Claims", "claims"),
        ("lineage", "Lineage", "lineage"),
    ] {
        let path = root.join("notes").join(format!("{name}.md"));
        let Ok(md) = std::fs::read_to_string(&path) else {
            continue;
        };
        let href = format!("{name}/index.html");
        let text = writer.emit(&citer, &href, title, page_id, "../", &md)?;
        search_index.push(entry(&href, title, text));
    }

    // Sources index, generated from kept registry rows.
    let sources_md = sources_markdown(&registry);
    let text = writer.emit(&citer, "sources/index.html", "Sources", "sources", "../", &sources_md)?;
    search_index.push(entry("sources/index.html", "Sources", text));

    write_search_index(&out_dir, &search_index)?;

    println!("wrote site to {}", out_dir.display());
    Ok(())
}

struct PageWriter<'a> {
    out_dir: &'a Path,
    template: &'a PageTemplate,
    og_image_url: String,
    base_url: &'a str,
    chapters_nav: &'a [(String, String)],
}

impl PageWriter<'_> {
    /// Render one markdown page, write it under `href` and return the
    /// plain text for the search index.
    fn emit(
        &self,
        citer: &Citer<'_>,
        href: &str,
        title: &str,
        page_id: &str,
        rel_root: &str,
        markdown: &str,
    ) -> Result<String> {
        let rendered = render_blocks(&parse_blocks(markdown), citer);
        let nav = build_nav(self.chapters_nav, href, rel_root);
        let html = self.template.render(&PageVars {
            title: title.to_string(),
            nav,
            content: rendered.html,
            root: rel_root.to_string(),
            page_id: page_id.to_string(),
            page_url: absolute_page_url(self.base_url, href),
            og_image_url: self.og_image_url.clone(),
            extra_scripts: String::new(),
        })?;
        let path = self.out_dir.join(href);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(&path, html)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(rendered.search_text)
    }
}

fn entry(href: &str, title: &str, text: String) -> SearchDocument {
    SearchDocument {
        href: href.to_string(),
        title: title.to_string(),
        text,
    }
}

fn resolve_out_dir(root: &Path, out: &Path) -> PathBuf {
    if out.is_absolute() {
        out.to_path_buf()
    } else {
        root.join(out)
    }
}

/// Refuse to delete anything that is plainly not a build directory.
fn guard_output_dir(root: &Path, out_dir: &Path) -> Result<()> {
    let out_abs = std::path::absolute(out_dir)
        .with_context(|| format!("failed to resolve {}", out_dir.display()))?;
    let root_abs = std::path::absolute(root)
        .with_context(|| format!("failed to resolve {}", root.display()))?;
    let mut unsafe_dirs = vec![PathBuf::from("/"), root_abs.clone()];
    if let Some(parent) = root_abs.parent() {
        unsafe_dirs.push(parent.to_path_buf());
    }
    if unsafe_dirs.contains(&out_abs) {
        bail!("refusing to delete unsafe output dir: {}", out_abs.display());
    }
    Ok(())
}

fn load_registry(root: &Path) -> Result<SourceRegistry> {
    let path = root.join("sources").join("sources.csv");
    if !path.exists() {
        return Ok(SourceRegistry::default());
    }
    SourceRegistry::load(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Copy the immediate files of `site/assets/` to `dist/assets/`, plus a
/// few conventional root copies for stable `/favicon.ico`-style paths.
fn copy_assets(root: &Path, out_dir: &Path) -> Result<()> {
    let assets_dir = root.join("site").join("assets");
    let dst = out_dir.join("assets");
    std::fs::create_dir_all(&dst)
        .with_context(|| format!("failed to create {}", dst.display()))?;
    if assets_dir.is_dir() {
        for entry in WalkDir::new(&assets_dir).min_depth(1).max_depth(1) {
            let entry = entry.context("failed to walk site/assets")?;
            if !entry.file_type().is_file() {
                continue;
            }
            let target = dst.join(entry.file_name());
            std::fs::copy(entry.path(), &target)
                .with_context(|| format!("failed to copy {}", entry.path().display()))?;
        }
    }
    for name in ["favicon.ico", "favicon.svg", "apple-touch-icon.png", "og.png"] {
        let src = assets_dir.join(name);
        if src.is_file() {
            std::fs::copy(&src, out_dir.join(name))
                .with_context(|| format!("failed to copy {}", src.display()))?;
        }
    }
    Ok(())
}

fn reader_markdown(chapters: &[Chapter]) -> String {
    let mut parts = vec![
        "# Reader".to_string(),
        String::new(),
        "A single-page view of the whole book.".to_string(),
        String::new(),
        "## Table of contents".to_string(),
        String::new(),
    ];
    for chapter in chapters {
        parts.push(format!("- [{}](#{})", chapter.title, chapter.anchor_id));
    }
    parts.push(String::new());
    let toc = parts.join("\n");
    let bodies: Vec<&str> = chapters
        .iter()
        .map(|c| c.markdown.trim_end())
        .collect();
    format!("{toc}\n\n---\n\n{}", bodies.join("\n\n---\n\n"))
}

struct BlogPost {
    href: String,
    title: String,
    markdown: String,
}

fn load_blog_posts(root: &Path) -> Result<Vec<BlogPost>> {
    let mut posts = Vec::new();
    for path in walk::blog_post_files(root) {
        let markdown = walk::read_markdown(&path)?;
        let stem = walk::file_stem(&path);
        let title = mindpress_core::book::first_h1(&markdown, &stem);
        posts.push(BlogPost {
            href: format!("blog/{stem}.html"),
            title,
            markdown,
        });
    }
    Ok(posts)
}

fn blog_index_markdown(root: &Path, posts: &[BlogPost]) -> String {
    let index_path = root.join("content").join("blog").join("index.md");
    let mut lines: Vec<String> = match std::fs::read_to_string(&index_path) {
        Ok(text) => text.trim_end().lines().map(str::to_string).collect(),
        Err(_) => vec![
            "# Blog".to_string(),
            String::new(),
            "_Blog index missing._".to_string(),
        ],
    };
    lines.push(String::new());
    lines.push("## Posts".to_string());
    lines.push(String::new());
    if posts.is_empty() {
        lines.push("_No posts yet._".to_string());
    } else {
        for post in posts {
            let name = post.href.rsplit('/').next().unwrap_or(&post.href);
            lines.push(format!("- [{}](./{name})", post.title));
        }
    }
    lines.join("\n") + "\n"
}

fn sources_markdown(registry: &SourceRegistry) -> String {
    let mut lines = vec![
        "# Sources".to_string(),
        String::new(),
        "Keystone/kept sources referenced by the manuscript.".to_string(),
        String::new(),
    ];
    for record in registry.kept_sources() {
        let title = record.title.trim();
        let title = if title.is_empty() {
            record.source_id.as_str()
        } else {
            title
        };
        let mut head = format!("- `{}`", record.source_id);
        let date = record.published_date.trim();
        if !date.is_empty() {
            head.push_str(&format!(" ({date})"));
        }
        head.push_str(&format!(": {title}"));
        let creator = record.creator_or_channel.trim();
        if !creator.is_empty() {
            head.push_str(&format!(" — {creator}"));
        }
        let url = record.url.trim();
        if !url.is_empty() {
            head.push_str(&format!(" — {url}"));
        }
        lines.push(head);
    }
    lines.join("\n") + "\n"
}

/// Temp-file-and-rename keeps a crashed build from leaving a truncated
/// index behind.
fn write_search_index(out_dir: &Path, docs: &[SearchDocument]) -> Result<()> {
    let json = search_index_json(docs).context("failed to serialize search index")?;
    let final_path = out_dir.join("search_index.json");
    let tmp_path = out_dir.join("search_index.json.tmp");
    std::fs::write(&tmp_path, json)
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, &final_path)
        .with_context(|| format!("failed to move search index into {}", final_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<html><head><title>{{title}}</title>\
<link rel=\"canonical\" href=\"{{page_url}}\">\
<meta property=\"og:image\" content=\"{{og_image_url}}\">\
</head><body id=\"{{page_id}}\" class=\"{{body_class}}\">\
{{nav}}<main>{{content}}</main>{{extra_scripts}}</body></html>";

    fn write_fixture(root: &Path) {
        fs::create_dir_all(root.join("site/templates")).expect("mkdir");
        fs::create_dir_all(root.join("site/assets")).expect("mkdir");
        fs::create_dir_all(root.join("manuscript/chapters")).expect("mkdir");
        fs::create_dir_all(root.join("content/blog/posts")).expect("mkdir");
        fs::create_dir_all(root.join("sources")).expect("mkdir");
        fs::write(root.join("site/templates/base.html"), TEMPLATE).expect("write template");
        fs::write(root.join("site/assets/style.css"), "body{}\n").expect("write asset");
        fs::write(root.join("site/assets/og.png"), b"png".as_slice()).expect("write og");
        fs::write(root.join("site/home.md"), "# Welcome\n\nThe home page.\n").expect("write home");
        fs::write(
            root.join("manuscript/chapters/ch01.md"),
            "# Chapter 1: Minds\n\n[BACH] Minds predict. <!-- src: yt_abc123 @ 00:12:34 -->\n",
        )
        .expect("write chapter");
        fs::write(
            root.join("content/blog/posts/first-post.md"),
            "# First Post\n\nHello.\n\n```mermaid\ngraph TD; A-->B;\n```\n",
        )
        .expect("write post");
        fs::write(
            root.join("sources/sources.csv"),
            "source_id,title,kind,creator_or_channel,url,published_date,language,notes\n\
             yt_abc123,Talk,youtube,Chan,https://youtube.com/watch?v=abc123,2020-01-01,en,curation_status=keep\n",
        )
        .expect("write csv");
    }

    fn build(root: &Path, out: &Path) -> Result<()> {
        build_site(root, out, &SiteConfig::default())
    }

    #[test]
    fn builds_the_full_page_set() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        build(temp.path(), Path::new("dist")).expect("build");

        let dist = temp.path().join("dist");
        for file in [
            "index.html",
            "reader/index.html",
            "blog/index.html",
            "blog/first-post.html",
            "sources/index.html",
            "search_index.json",
            ".nojekyll",
            "assets/style.css",
            "og.png",
        ] {
            assert!(dist.join(file).exists(), "missing {file}");
        }
        // No note files, no knowledge-base pages.
        assert!(!dist.join("glossary/index.html").exists());

        let reader = fs::read_to_string(dist.join("reader/index.html")).expect("reader");
        assert!(reader.contains("&amp;t=754s"));
        assert!(reader.contains("id=\"chapter-1-minds\""));
        assert!(reader.contains("data-tag=\"BACH\""));

        let post = fs::read_to_string(dist.join("blog/first-post.html")).expect("post");
        assert!(!post.contains("mermaid"));

        let blog_index = fs::read_to_string(dist.join("blog/index.html")).expect("blog index");
        assert!(blog_index.contains("First Post"));

        let sources = fs::read_to_string(dist.join("sources/index.html")).expect("sources");
        // Code spans protect underscores, so the id renders entity-escaped.
        assert!(sources.contains("<code>yt&#95;abc123</code>"));
        assert!(sources.contains("(2020-01-01)"));
    }

    #[test]
    fn search_index_covers_pages_and_chapters() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        build(temp.path(), Path::new("dist")).expect("build");

        let raw = fs::read_to_string(temp.path().join("dist/search_index.json")).expect("index");
        let docs: Vec<serde_json::Value> = serde_json::from_str(&raw).expect("json");
        let hrefs: Vec<&str> = docs.iter().filter_map(|d| d["href"].as_str()).collect();
        assert!(hrefs.contains(&"index.html"));
        assert!(hrefs.contains(&"reader/index.html#chapter-1-minds"));
        assert!(hrefs.contains(&"blog/first-post.html"));
        assert!(!raw.contains("search_index.json.tmp"));
        assert!(!temp.path().join("dist/search_index.json.tmp").exists());
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        build(temp.path(), Path::new("dist")).expect("first build");
        let first = fs::read_to_string(temp.path().join("dist/index.html")).expect("read");
        let first_index =
            fs::read_to_string(temp.path().join("dist/search_index.json")).expect("read");
        build(temp.path(), Path::new("dist")).expect("second build");
        let second = fs::read_to_string(temp.path().join("dist/index.html")).expect("read");
        let second_index =
            fs::read_to_string(temp.path().join("dist/search_index.json")).expect("read");
        assert_eq!(first, second);
        assert_eq!(first_index, second_index);
    }

    #[test]
    fn refuses_unsafe_output_dirs() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        let err = build(temp.path(), temp.path()).expect_err("must refuse root");
        assert!(err.to_string().contains("unsafe output dir"));
        assert!(temp.path().join("site/home.md").exists());
    }

    #[test]
    fn missing_template_fails_the_build() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        fs::remove_file(temp.path().join("site/templates/base.html")).expect("remove");
        let err = build(temp.path(), Path::new("dist")).expect_err("must fail");
        assert!(err.to_string().contains("missing page template"));
    }

    #[test]
    fn missing_home_renders_a_placeholder() {
        let temp = TempDir::new().expect("tempdir");
        write_fixture(temp.path());
        fs::remove_file(temp.path().join("site/home.md")).expect("remove");
        build(temp.path(), Path::new("dist")).expect("build");
        let home = fs::read_to_string(temp.path().join("dist/index.html")).expect("home");
        assert!(home.contains("Home content missing"));
    }
}
