//! Content discovery under the project root

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use mindpress_core::book::strip_chapter_prefix;
use mindpress_core::model::Chapter;
use mindpress_core::render::slugify;
use walkdir::WalkDir;

/// Chapter files are `manuscript/chapters/ch*.md`, ordered by filename.
/// The chapters directory must exist.
pub fn chapter_files(root: &Path) -> Result<Vec<PathBuf>> {
    let dir = root.join("manuscript").join("chapters");
    if !dir.is_dir() {
        bail!("missing chapters directory: {}", dir.display());
    }
    Ok(markdown_files(&dir, "ch"))
}

pub fn load_chapters(root: &Path) -> Result<Vec<Chapter>> {
    let mut chapters = Vec::new();
    for path in chapter_files(root)? {
        let markdown = read_markdown(&path)?;
        let h1 = first_h1_raw(&markdown).unwrap_or_else(|| file_stem(&path));
        chapters.push(Chapter {
            anchor_id: slugify(&h1),
            title: strip_chapter_prefix(&h1),
            markdown,
        });
    }
    Ok(chapters)
}

/// Blog posts are the immediate `*.md` files of `content/blog/posts/`,
/// ordered by filename. A missing directory means no posts.
pub fn blog_post_files(root: &Path) -> Vec<PathBuf> {
    let dir = root.join("content").join("blog").join("posts");
    if !dir.is_dir() {
        return Vec::new();
    }
    markdown_files(&dir, "")
}

pub fn read_markdown(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// First `# ` heading verbatim (prefix trimmed); the `Chapter N:` form is
/// kept so the reader anchor matches the rendered heading id.
pub fn first_h1_raw(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# ").map(|rest| rest.trim().to_string()))
        .filter(|h1| !h1.is_empty())
}

fn markdown_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "md")
                && path
                    .file_name()
                    .is_some_and(|name| name.to_string_lossy().starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn chapters_are_ordered_and_titled() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join("manuscript/chapters");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("ch02.md"), "# Chapter 2: World Models\n\nbody\n").expect("write");
        fs::write(dir.join("ch01.md"), "# Chapter 1: Minds\n\nbody\n").expect("write");
        fs::write(dir.join("notes.md"), "# Not a chapter\n").expect("write");

        let chapters = load_chapters(temp.path()).expect("chapters");
        let titles: Vec<&str> = chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Minds", "World Models"]);
        assert_eq!(chapters[0].anchor_id, "chapter-1-minds");
    }

    #[test]
    fn missing_chapters_dir_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        assert!(load_chapters(temp.path()).is_err());
    }

    #[test]
    fn chapter_without_h1_falls_back_to_stem() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join("manuscript/chapters");
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join("ch01.md"), "no heading here\n").expect("write");
        let chapters = load_chapters(temp.path()).expect("chapters");
        assert_eq!(chapters[0].title, "ch01");
        assert_eq!(chapters[0].anchor_id, "ch01");
    }

    #[test]
    fn blog_posts_ignore_missing_dir_and_subdirs() {
        let temp = TempDir::new().expect("tempdir");
        assert!(blog_post_files(temp.path()).is_empty());

        let dir = temp.path().join("content/blog/posts");
        fs::create_dir_all(dir.join("drafts")).expect("mkdir");
        fs::write(dir.join("b-post.md"), "# B\n").expect("write");
        fs::write(dir.join("a-post.md"), "# A\n").expect("write");
        fs::write(dir.join("drafts/skip.md"), "# nested\n").expect("write");
        fs::write(dir.join("readme.txt"), "not markdown\n").expect("write");

        let posts = blog_post_files(temp.path());
        let names: Vec<String> = posts.iter().map(|p| file_stem(p)).collect();
        assert_eq!(names, ["a-post", "b-post"]);
    }
}
