//! The organized index: which screenshots belong to which run, rendered as a
//! static HTML page.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Run name -> screenshot name -> pixel dimensions (when decodable).
///
/// Both levels are ordered alphabetically, which fixes the page layout for a
/// given input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizedIndex {
    runs: BTreeMap<String, BTreeMap<String, Option<(u32, u32)>>>,
}

impl OrganizedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a screenshot. A repeated name within a run replaces the earlier entry.
    pub fn insert(&mut self, run: &str, file_name: &str, dimensions: Option<(u32, u32)>) {
        self.runs
            .entry(run.to_string())
            .or_default()
            .insert(file_name.to_string(), dimensions);
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    pub fn screenshot_count(&self) -> usize {
        self.runs.values().map(BTreeMap::len).sum()
    }

    /// Run names in page order
    pub fn runs(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(String::as_str)
    }

    /// Screenshot names of `run` in page order
    pub fn screenshots(&self, run: &str) -> Vec<&str> {
        self.runs
            .get(run)
            .map(|shots| shots.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Render the index page. Image paths are relative to the organized root.
    pub fn render_html(&self) -> String {
        let mut html = String::new();
        html.push_str(PAGE_HEAD);

        for (run, shots) in &self.runs {
            if shots.is_empty() {
                continue;
            }
            let run_html = escape_html(run);
            let _ = writeln!(html, "  <section class=\"run\">");
            let _ = writeln!(html, "    <h2>Run {}</h2>", run_html);
            let _ = writeln!(html, "    <div class=\"grid\">");
            for (name, dimensions) in shots {
                let name_html = escape_html(name);
                let size_attrs = dimensions
                    .map(|(w, h)| format!(" width=\"{}\" height=\"{}\"", w, h))
                    .unwrap_or_default();
                let _ = writeln!(html, "      <figure>");
                let _ = writeln!(
                    html,
                    "        <a href=\"{run}/{name}\"><img src=\"{run}/{name}\" alt=\"{name}\" loading=\"lazy\"{size}></a>",
                    run = run_html,
                    name = name_html,
                    size = size_attrs,
                );
                let _ = writeln!(html, "        <figcaption>{}</figcaption>", name_html);
                let _ = writeln!(html, "      </figure>");
            }
            let _ = writeln!(html, "    </div>");
            let _ = writeln!(html, "  </section>");
        }

        html.push_str(PAGE_TAIL);
        html
    }
}

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Test Screenshots</title>
  <style>
    body { font-family: sans-serif; margin: 2rem; background: #f5f5f5; color: #222; }
    h1 { margin-bottom: 1.5rem; }
    .run { background: #fff; border-radius: 6px; padding: 1rem 1.5rem; margin-bottom: 2rem; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.15); }
    .run h2 { margin-top: 0; font-size: 1.2rem; border-bottom: 1px solid #ddd; padding-bottom: 0.5rem; }
    .grid { display: flex; flex-wrap: wrap; gap: 1rem; }
    figure { margin: 0; width: 320px; }
    figure img { max-width: 100%; height: auto; border: 1px solid #ccc; }
    figcaption { font-size: 0.85rem; word-break: break-all; margin-top: 0.25rem; }
  </style>
</head>
<body>
  <h1>Test Screenshots</h1>
"#;

const PAGE_TAIL: &str = "</body>\n</html>\n";

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_and_screenshots_sorted() {
        let mut index = OrganizedIndex::new();
        index.insert("20240102_000000", "b.png", None);
        index.insert("20240101_000000", "z.png", None);
        index.insert("20240102_000000", "a.png", Some((800, 600)));

        assert_eq!(
            index.runs().collect::<Vec<_>>(),
            vec!["20240101_000000", "20240102_000000"]
        );
        assert_eq!(index.screenshots("20240102_000000"), vec!["a.png", "b.png"]);

        let html = index.render_html();
        let first_run = html.find("Run 20240101_000000").unwrap();
        let second_run = html.find("Run 20240102_000000").unwrap();
        assert!(first_run < second_run);
        assert!(html.find("20240102_000000/a.png").unwrap() < html.find("20240102_000000/b.png").unwrap());
        assert!(html.contains("width=\"800\" height=\"600\""));
        assert!(html.contains("<figcaption>z.png</figcaption>"));
    }

    #[test]
    fn test_duplicate_names_collapse() {
        let mut index = OrganizedIndex::new();
        index.insert("run", "shot.png", None);
        index.insert("run", "shot.png", None);
        assert_eq!(index.screenshot_count(), 1);
        assert_eq!(index.run_count(), 1);
    }

    #[test]
    fn test_names_are_escaped() {
        let mut index = OrganizedIndex::new();
        index.insert("r&d", "<x>.png", None);
        let html = index.render_html();
        assert!(html.contains("Run r&amp;d"));
        assert!(html.contains("&lt;x&gt;.png"));
        assert!(!html.contains("<x>.png"));
    }
}
