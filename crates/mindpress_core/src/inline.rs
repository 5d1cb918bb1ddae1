//! Inline Markdown formatting for a restricted grammar
//!
//! Input is always a single block-separated line: code spans, links, bold
//! and italics, nothing else. Stages run in a strict order, each over the
//! escaped output of the previous one, so user content is never
//! re-interpreted as markup.

/// Escape text content (`&`, `<`, `>`). Quotes are left alone; attribute
/// values go through [`escape_attr`] instead.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape attribute values (`&`, `<`, `>`, `"`, `'`).
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render one line of restricted inline Markdown to HTML.
pub fn inline_format(s: &str) -> String {
    let s = escape(s);
    let s = replace_code_spans(&s);
    let s = replace_links(&s);
    let s = replace_bold(&s);
    let s = replace_emphasis(&s, '*');
    replace_emphasis(&s, '_')
}

fn replace_code_spans(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find('`') {
        let after_open = &rest[open + 1..];
        let Some(close) = after_open.find('`') else {
            break;
        };
        if close == 0 {
            // Empty span: emit the first backtick literally and rescan.
            out.push_str(&rest[..open + 1]);
            rest = after_open;
            continue;
        }
        out.push_str(&rest[..open]);
        out.push_str("<code>");
        // Protect the contents from the later emphasis stages.
        let code = after_open[..close].replace('*', "&#42;").replace('_', "&#95;");
        out.push_str(&code);
        out.push_str("</code>");
        rest = &after_open[close + 1..];
    }
    out.push_str(rest);
    out
}

fn replace_links(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    'scan: while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        if let Some(label_end) = after_open.find(']') {
            let label = &after_open[..label_end];
            let tail = &after_open[label_end + 1..];
            if !label.is_empty() && tail.starts_with('(') {
                if let Some(href_end) = tail[1..].find(')') {
                    let href = &tail[1..1 + href_end];
                    if !href.is_empty() {
                        // The input was escaped for text, which leaves quotes.
                        let href_attr = href.replace('"', "&quot;").replace('\'', "&#x27;");
                        out.push_str(&rest[..open]);
                        if href.starts_with("http://") || href.starts_with("https://") {
                            out.push_str(&format!(
                                "<a href=\"{href_attr}\" target=\"_blank\" rel=\"noopener noreferrer\">{label}</a>"
                            ));
                        } else {
                            out.push_str(&format!("<a href=\"{href_attr}\">{label}</a>"));
                        }
                        rest = &tail[1 + href_end + 1..];
                        continue 'scan;
                    }
                }
            }
        }
        // Not a link; emit the bracket literally and rescan after it.
        out.push_str(&rest[..open + 1]);
        rest = after_open;
    }
    out.push_str(rest);
    out
}

fn replace_bold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        match after_open.find('*') {
            Some(content_end)
                if content_end > 0 && after_open[content_end..].starts_with("**") =>
            {
                out.push_str(&rest[..open]);
                out.push_str("<strong>");
                out.push_str(&after_open[..content_end]);
                out.push_str("</strong>");
                rest = &after_open[content_end + 2..];
            }
            _ => {
                out.push_str(&rest[..open + 1]);
                rest = &rest[open + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_word(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// Replace `*text*` (or `_text_`) with `<em>`, skipping delimiters that sit
/// directly against a word character so intra-word underscores survive.
fn replace_emphasis(s: &str, delim: char) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != delim {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let prev_ok = i == 0 || !is_word(chars[i - 1]);
        let close = if prev_ok {
            chars[i + 1..]
                .iter()
                .position(|&c| c == delim || c == '\n')
                .filter(|&off| off > 0 && chars[i + 1 + off] == delim)
                .map(|off| i + 1 + off)
        } else {
            None
        };
        match close {
            Some(close) if close + 1 >= chars.len() || !is_word(chars[close + 1]) => {
                out.push_str("<em>");
                out.extend(&chars[i + 1..close]);
                out.push_str("</em>");
                i = close + 1;
            }
            _ => {
                out.push(delim);
                i += 1;
            }
        }
    }
    out
}

/// Strip all inline markup, tags and anchor comments back to plain text
/// with collapsed whitespace. Used only to build the search index.
pub fn strip_for_search(s: &str) -> String {
    let s = crate::blocks::strip_tag_prefix(s).1;
    let s = crate::blocks::strip_anchor_comments(&s);
    let s = unwrap_delimited(&s, "`", "`");
    let s = unwrap_delimited(&s, "**", "**");
    let s = unwrap_emphasis(&s, '*');
    let s = unwrap_emphasis(&s, '_');
    let s = unwrap_links(&s);
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unwrap_delimited(s: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find(open) {
        let after_open = &rest[start + open.len()..];
        match after_open.find(close) {
            Some(end) if end > 0 => {
                out.push_str(&rest[..start]);
                out.push_str(&after_open[..end]);
                rest = &after_open[end + close.len()..];
            }
            _ => {
                out.push_str(&rest[..start + open.len()]);
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    out
}

fn unwrap_emphasis(s: &str, delim: char) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != delim {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let prev_ok = i == 0 || !is_word(chars[i - 1]);
        let close = if prev_ok {
            chars[i + 1..]
                .iter()
                .position(|&c| c == delim || c == '\n')
                .filter(|&off| off > 0 && chars[i + 1 + off] == delim)
                .map(|off| i + 1 + off)
        } else {
            None
        };
        match close {
            Some(close) if close + 1 >= chars.len() || !is_word(chars[close + 1]) => {
                out.extend(&chars[i + 1..close]);
                i = close + 1;
            }
            _ => {
                out.push(delim);
                i += 1;
            }
        }
    }
    out
}

fn unwrap_links(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    'scan: while let Some(open) = rest.find('[') {
        let after_open = &rest[open + 1..];
        if let Some(label_end) = after_open.find(']') {
            let label = &after_open[..label_end];
            let tail = &after_open[label_end + 1..];
            if !label.is_empty() && tail.starts_with('(') {
                if let Some(href_end) = tail[1..].find(')') {
                    if href_end > 0 {
                        out.push_str(&rest[..open]);
                        out.push_str(label);
                        rest = &tail[1 + href_end + 1..];
                        continue 'scan;
                    }
                }
            }
        }
        out.push_str(&rest[..open + 1]);
        rest = after_open;
    }
    out.push_str(rest);
    out
}
