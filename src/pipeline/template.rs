//! Standalone HTML page around a rendered part: base stylesheet, highlight classes, device page size.

use anyhow::Result;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, css_for_theme_with_class_style};

use crate::Device;
use crate::pipeline::markup::escape_html;

/// Theme the highlight classes are generated from.
pub const HIGHLIGHT_THEME: &str = "InspiredGitHub";

const BASE_CSS: &str = r#"
body { margin: 0; color: #24292e; background: #fff; }
.markdown-body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; font-size: 14px; line-height: 1.5; padding: 24px; word-wrap: break-word; }
.markdown-body h1 { font-size: 2em; border-bottom: 1px solid #eaecef; padding-bottom: .3em; }
.markdown-body h4 { margin: .4em 0; font-weight: 400; }
.markdown-body a { color: #0366d6; text-decoration: none; }
.markdown-body pre { background: #f6f8fa; border-radius: 3px; padding: 12px; overflow: hidden; white-space: pre-wrap; word-break: break-all; font-size: 12px; }
.markdown-body code { font-family: SFMono-Regular, Consolas, "Liberation Mono", Menlo, monospace; }
.file-header { page-break-before: always; break-before: page; font-weight: 600 !important; border-bottom: 1px solid #eaecef; }
.to-top { font-size: 11px; }
"#;

/// `@page` rule for a device profile. Desktop keeps the renderer's default paper.
pub fn page_rule(device: Device) -> &'static str {
    match device {
        Device::Desktop => "",
        Device::Tablet => "@page { size: 8in 14in; margin: 0; }",
        Device::Mobile => "@page { size: 6in 10in; margin: 0; }",
    }
}

/// Builds full pages. Highlight CSS is generated once.
pub struct PageTemplate {
    device: Device,
    highlight_css: String,
}

impl PageTemplate {
    pub fn new(device: Device, class_style: ClassStyle) -> Result<Self> {
        let themes = ThemeSet::load_defaults();
        let theme = themes
            .themes
            .get(HIGHLIGHT_THEME)
            .ok_or_else(|| anyhow::anyhow!("missing highlight theme {HIGHLIGHT_THEME}"))?;
        let highlight_css = css_for_theme_with_class_style(theme, class_style)
            .map_err(|e| anyhow::anyhow!("highlight css: {e}"))?;
        Ok(Self {
            device,
            highlight_css,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Wrap an HTML `body` fragment into a complete document.
    pub fn render(&self, title: &str, body: &str) -> String {
        format!(
            "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
             <title>{title}</title>\n<style>\n{base}\n{highlight}\n{page}\n</style>\n</head>\n\
             <body>\n{body}\n</body>\n</html>\n",
            title = escape_html(title),
            base = BASE_CSS,
            highlight = self.highlight_css,
            page = page_rule(self.device),
        )
    }
}
