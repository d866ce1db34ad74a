//! Markup stages: part → Markdown → HTML body.
//!
//! The Markdown form is what pagination measures. HTML comes from comrak with every fenced block
//! swapped for syntect classed HTML, so the page only needs a class stylesheet.

use anyhow::Result;
use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::options::Options;
use comrak::{Arena, format_html, parse_document};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::{DocumentPart, IndexLine, LanguageTag};

/// Anchor of the table of contents; every section links back to it.
pub const CONTENTS_ANCHOR: &str = "Contents";

/// Prefix of the highlight CSS classes (`syntax-keyword`, ...).
pub const CLASS_PREFIX: &str = "syntax-";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// Shortest backtick fence longer than any backtick run inside `content` (minimum three).
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Header, back-to-top link and (for code) the fenced body of one file.
pub fn section_text(id: &str, language: &LanguageTag, content: &str) -> String {
    let id = escape_html(id);
    let header = format!(
        "<h4 class=\"file-header\" id=\"{id}\">{id}</h4>\n\
         <a class=\"to-top\" href=\"#{CONTENTS_ANCHOR}\">&#x2191; to top</a>\n"
    );
    match language {
        LanguageTag::Prose => format!("{header}\n{content}\n"),
        LanguageTag::Code(name) => {
            let fence = fence_for(content);
            let newline = if content.ends_with('\n') { "" } else { "\n" };
            format!("{header}\n{fence} {name}\n{content}{newline}{fence}\n")
        }
    }
}

fn index_line_markdown(line: &IndexLine) -> String {
    let pad = "&nbsp;&nbsp;&nbsp;&nbsp;".repeat(line.depth);
    let label = escape_html(&line.label);
    match &line.anchor_id {
        Some(anchor) if !line.is_directory_heading => {
            format!("#### {pad}[|- {label}](#{})", anchor.replace(' ', "%20"))
        }
        _ => format!("#### {pad} /{label}"),
    }
}

/// Full Markdown for `part`: title, contents, then every section in order.
pub fn part_to_markdown(part: &DocumentPart) -> String {
    let mut out = format!("# {}\n\n", escape_html(&part.title));
    out.push_str(&format!(
        "<h2 id=\"{CONTENTS_ANCHOR}\">{CONTENTS_ANCHOR}</h2>\n\n"
    ));
    for line in &part.table_of_contents {
        out.push_str(&index_line_markdown(line));
        out.push('\n');
    }
    out.push('\n');
    for section in &part.sections {
        out.push_str(&section.serialized);
        out.push('\n');
    }
    out
}

/// Markdown → HTML with classed syntax highlighting. Built once per run.
pub struct Highlighter {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    pub fn new() -> Self {
        let mut options = Options::default();
        options.extension.table = true;
        options.extension.strikethrough = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.render.hardbreaks = true;
        options.render.github_pre_lang = true;
        // File headers and the contents anchor are raw HTML.
        options.render.r#unsafe = true;
        Self {
            options,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed {
                prefix: CLASS_PREFIX,
            },
        }
    }

    pub fn class_style(&self) -> ClassStyle {
        self.class_style
    }

    /// Render Markdown to an HTML fragment.
    pub fn markdown_to_html(&self, markdown: &str) -> Result<String> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        self.rewrite_code_blocks(root)?;
        let mut html = String::new();
        format_html(root, &self.options, &mut html)
            .map_err(|e| anyhow::anyhow!("format html: {e}"))?;
        Ok(format!("<article class=\"markdown-body\">{html}</article>"))
    }

    fn rewrite_code_blocks<'a>(&self, node: &'a AstNode<'a>) -> Result<()> {
        let code = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::CodeBlock(block) => Some((block.info.trim().to_string(), block.literal.clone())),
                _ => None,
            }
        };
        if let Some((info, literal)) = code {
            let language = info.split_whitespace().next().map(str::to_string);
            let html = self.highlight(language.as_deref(), &literal)?;
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
            return Ok(());
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.rewrite_code_blocks(next)?;
            child = next.next_sibling();
        }
        Ok(())
    }

    /// Highlight `code` as `language`; unknown languages fall back to plain text.
    pub fn highlight(&self, language: Option<&str>, code: &str) -> Result<String> {
        let token = language.unwrap_or("text");
        let syntax = self
            .find_syntax(token)
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntax_set, self.class_style);
        let mut code = code.to_string();
        if !code.ends_with('\n') {
            code.push('\n');
        }
        for line in LinesWithEndings::from(code.as_str()) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .map_err(|e| anyhow::anyhow!("highlight {token}: {e}"))?;
        }
        let lang = escape_html(&token.to_ascii_lowercase());
        Ok(format!(
            "<pre class=\"{CLASS_PREFIX}highlight\" data-language=\"{lang}\"><code class=\"language-{lang}\">{}</code></pre>",
            generator.finalize()
        ))
    }

    fn find_syntax(&self, token: &str) -> Option<&SyntaxReference> {
        let lowercase = token.to_ascii_lowercase();
        self.syntax_set
            .find_syntax_by_token(&lowercase)
            .or_else(|| self.syntax_set.find_syntax_by_name(token))
            .or_else(|| self.syntax_set.find_syntax_by_extension(&lowercase))
    }
}
