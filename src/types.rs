//! Public and internal types for the repobook API and pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::config::SizeConsts;

/// One path produced by the tree walk. Ordered pre-order: a directory is followed by its children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Zero-based at the root's immediate children.
    pub depth: usize,
    pub is_dir: bool,
}

/// Canonical language of a source file, resolved from its extension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LanguageTag {
    /// Markdown: rendered as prose, never fenced.
    Prose,
    /// Anything else: rendered as a fenced code block with this info string.
    Code(String),
}

impl LanguageTag {
    pub fn is_prose(&self) -> bool {
        matches!(self, LanguageTag::Prose)
    }

    /// Info string used on the code fence (`md` for prose).
    pub fn name(&self) -> &str {
        match self {
            LanguageTag::Prose => "md",
            LanguageTag::Code(name) => name,
        }
    }
}

/// Content of one file inside a part. `id` is the path relative to the walk root.
#[derive(Clone, Debug)]
pub struct FileSection {
    pub id: String,
    pub language: LanguageTag,
    pub raw_content: Vec<u8>,
    /// Header + (fenced) content, as it appears in the serialized part.
    pub serialized: String,
}

/// One line of a part's table of contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexLine {
    pub label: String,
    pub depth: usize,
    pub is_directory_heading: bool,
    /// Target of the link for files; `None` for directory headings.
    pub anchor_id: Option<String>,
}

/// A size-bounded unit of output: table of contents plus the file sections it covers.
#[derive(Clone, Debug)]
pub struct DocumentPart {
    /// 0 for single-part output; 1..N once the book is known to span several parts.
    pub part_number: usize,
    pub title: String,
    pub table_of_contents: Vec<IndexLine>,
    pub sections: Vec<FileSection>,
}

impl DocumentPart {
    pub fn is_numbered(&self) -> bool {
        self.part_number > 0
    }

    /// Sum of the serialized section lengths (before amplification).
    pub fn serialized_len(&self) -> usize {
        self.sections.iter().map(|s| s.serialized.len()).sum()
    }
}

/// Request to convert one serialized part into one artifact.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderJob {
    pub source_document_path: PathBuf,
    pub target_artifact_path: PathBuf,
}

/// Device profile; only changes the page template, never pagination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Device {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// Requested artifact format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Pdf,
    Epub,
    Mobi,
    /// Keep the intermediate HTML; no external renderer runs.
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pdf => "pdf",
            OutputFormat::Epub => "epub",
            OutputFormat::Mobi => "mobi",
            OutputFormat::Html => "html",
        }
    }
}

/// External tool that turns an HTML document into the artifact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RendererKind {
    #[default]
    Chrome,
    Calibre,
    Wkhtmltopdf,
}

impl RendererKind {
    /// Formats the renderer can produce.
    pub fn supports(&self, format: OutputFormat) -> bool {
        match self {
            RendererKind::Chrome | RendererKind::Wkhtmltopdf => format == OutputFormat::Pdf,
            RendererKind::Calibre => format != OutputFormat::Html,
        }
    }
}

macro_rules! impl_choice {
    ($ty:ty, $what:literal, { $($name:literal => $variant:path),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    other => Err(anyhow::anyhow!(
                        "unknown {} '{}' (expected one of: {})",
                        $what,
                        other,
                        [$($name),+].join(", ")
                    )),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

impl_choice!(Device, "device", {
    "desktop" => Device::Desktop,
    "tablet" => Device::Tablet,
    "mobile" => Device::Mobile,
});

impl_choice!(OutputFormat, "format", {
    "pdf" => OutputFormat::Pdf,
    "epub" => OutputFormat::Epub,
    "mobi" => OutputFormat::Mobi,
    "html" => OutputFormat::Html,
});

impl_choice!(RendererKind, "renderer", {
    "chrome" => RendererKind::Chrome,
    "calibre" => RendererKind::Calibre,
    "wkhtmltopdf" => RendererKind::Wkhtmltopdf,
});

/// Lib-only options for [`build_book`](crate::build_book). Only what shapes the book itself.
#[derive(Clone, Debug)]
pub struct BookOpts {
    /// Title printed on every part. Defaults to the root directory name.
    pub title: Option<String>,
    /// Extension allow-list (`rs,py,md`). `None` registers the whole catalog.
    pub allow_list: Option<Vec<String>>,
    /// Part ceiling in megabytes, converted with [`SizeConsts::bytes_for_mb`].
    pub size_mb: f64,
    /// Extra directory exclusion patterns (substring or glob).
    pub exclude: Vec<String>,
    pub device: Device,
}

impl Default for BookOpts {
    fn default() -> Self {
        Self {
            title: None,
            allow_list: None,
            size_mb: SizeConsts::DEFAULT_PART_MB,
            exclude: Vec::new(),
            device: Device::Desktop,
        }
    }
}

impl From<&BookOpts> for Opts {
    fn from(o: &BookOpts) -> Self {
        Opts {
            title: o.title.clone(),
            allow_list: o.allow_list.clone(),
            size_mb: o.size_mb,
            exclude: o.exclude.clone(),
            device: o.device,
            format: OutputFormat::Html,
            keep_html: true,
            ..Default::default()
        }
    }
}

/// Full options (CLI). Use [`BookOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    /// Artifact path. When None, `<root name>.<format ext>` in the working directory.
    pub output: Option<PathBuf>,
    pub title: Option<String>,
    pub allow_list: Option<Vec<String>>,
    pub size_mb: f64,
    pub exclude: Vec<String>,
    pub device: Device,
    pub format: OutputFormat,
    pub renderer: RendererKind,
    /// Explicit renderer binary (browser, ebook-convert, wkhtmltopdf). When None, looked up on PATH.
    pub renderer_path: Option<PathBuf>,
    /// Render concurrency. None or 0 → default policy.
    pub concurrency: Option<usize>,
    /// Keep the intermediate HTML next to the artifacts.
    pub keep_html: bool,
    /// Stop claiming new render jobs after the first failure.
    pub fail_fast: bool,
    /// PDF document outline from the page headings (chrome).
    pub outline: bool,
    /// Show progress bar (verbose mode).
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            output: None,
            title: None,
            allow_list: None,
            size_mb: SizeConsts::DEFAULT_PART_MB,
            exclude: Vec::new(),
            device: Device::Desktop,
            format: OutputFormat::Pdf,
            renderer: RendererKind::Chrome,
            renderer_path: None,
            concurrency: None,
            keep_html: false,
            fail_fast: false,
            outline: true,
            verbose: false,
        }
    }
}

impl Opts {
    pub fn ceiling_bytes(&self) -> usize {
        SizeConsts::bytes_for_mb(self.size_mb)
    }
}

/// Result of a whole run: the artifacts written, in part order. Empty when nothing qualified.
#[derive(Debug, Default)]
pub struct BookOutcome {
    pub artifacts: Vec<PathBuf>,
    pub parts: usize,
}

impl BookOutcome {
    pub fn is_empty(&self) -> bool {
        self.parts == 0
    }
}
