//! Page assembly: wrap a rendered fragment in the site template
//!
//! The template is user content (`site/templates/base.html`). All values
//! are escaped here before substitution, so the environment runs with
//! auto-escaping off.

use anyhow::{Context, Result};
use minijinja::{AutoEscape, Environment, context};

use crate::inline::{escape, escape_attr};

#[derive(Debug, Clone, Default)]
pub struct PageVars {
    pub title: String,
    pub nav: String,
    pub content: String,
    pub root: String,
    pub page_id: String,
    pub page_url: String,
    pub og_image_url: String,
    pub extra_scripts: String,
}

pub struct PageTemplate {
    env: Environment<'static>,
}

impl PageTemplate {
    pub fn from_source(source: &str) -> Result<Self> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template_owned("base".to_string(), source.to_string())
            .context("failed to parse base template")?;
        Ok(Self { env })
    }

    pub fn render(&self, vars: &PageVars) -> Result<String> {
        let template = self.env.get_template("base").context("base template missing")?;
        template
            .render(context! {
                title => escape(&vars.title),
                nav => &vars.nav,
                content => &vars.content,
                root => &vars.root,
                page_id => escape(&vars.page_id),
                page_url => escape_attr(&vars.page_url),
                og_image_url => escape_attr(&vars.og_image_url),
                body_class => "",
                extra_scripts => &vars.extra_scripts,
            })
            .with_context(|| format!("failed to render page {}", vars.page_id))
    }
}

/// Resolve a page href against the absolute site base URL.
pub fn absolute_page_url(base_url: &str, href: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let rel = href.trim_start_matches("./").trim_start_matches('/');
    format!("{base}/{rel}")
}

/// Build the shared two-group navigation: core pages plus per-chapter
/// deep links into the reader. `chapters` is `(anchor_id, title)`.
pub fn build_nav(chapters: &[(String, String)], current_href: &str, root: &str) -> String {
    let is_current = |href: &str| {
        href == current_href
            || (href == "blog/index.html" && current_href.starts_with("blog/"))
    };
    let link = |href: &str, label: &str| {
        let current = if is_current(href) { " aria-current=\"page\"" } else { "" };
        format!(
            "<a href=\"{}\"{current}>{}</a>",
            escape(&format!("{root}{href}")),
            escape(label)
        )
    };

    let mut parts: Vec<String> = Vec::new();
    parts.push("<div class=\"nav\">".to_string());
    parts.push("<div class=\"navgroup\">".to_string());
    parts.push("<div class=\"navtitle\">Core</div>".to_string());
    parts.push(link("index.html", "Home"));
    parts.push(link("reader/index.html", "Reader"));
    parts.push(link("blog/index.html", "Blog"));
    let kb_open = ["glossary/", "claims/", "sources/", "lineage/"]
        .iter()
        .any(|prefix| current_href.starts_with(prefix));
    parts.push(format!(
        "<details class=\"navdetails\"{}>",
        if kb_open { " open" } else { "" }
    ));
    parts.push("<summary class=\"navsummary\">Knowledge base</summary>".to_string());
    parts.push(link("glossary/index.html", "Glossary"));
    parts.push(link("claims/index.html", "Claims"));
    parts.push(link("sources/index.html", "Sources"));
    parts.push(link("lineage/index.html", "Lineage"));
    parts.push("</details>".to_string());
    parts.push("</div>".to_string());

    parts.push("<div class=\"navgroup\">".to_string());
    parts.push("<div class=\"navtitle\">Book</div>".to_string());
    for (anchor_id, title) in chapters {
        parts.push(link(&format!("reader/index.html#{anchor_id}"), title));
    }
    parts.push("</div>".to_string());
    parts.push("</div>".to_string());
    parts.join("\n")
}
