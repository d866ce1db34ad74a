//! Load `.repobook.toml` from the input directory (CLI only). Lib callers pass [`BookOpts`](crate::BookOpts) directly.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RepobookToml {
    #[serde(default)]
    book: BookSection,
    #[serde(default)]
    render: RenderSection,
}

#[derive(Debug, Default, Deserialize)]
struct BookSection {
    title: Option<String>,
    /// Comma-separated or array form of the extension allow-list.
    allow: Option<AllowList>,
    size_mb: Option<f64>,
    exclude: Option<Vec<String>>,
    device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSection {
    format: Option<String>,
    renderer: Option<String>,
    renderer_path: Option<String>,
    concurrency: Option<usize>,
    keep_html: Option<bool>,
    fail_fast: Option<bool>,
    outline: Option<bool>,
    verbose: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AllowList {
    Csv(String),
    List(Vec<String>),
}

impl AllowList {
    fn into_vec(self) -> Vec<String> {
        match self {
            AllowList::Csv(s) => crate::engine::tools::split_allow_list(&s),
            AllowList::List(v) => v,
        }
    }
}

/// Load the config file from `dir` if present. Returns None if the file is missing or invalid. CLI only.
pub(crate) fn load_repobook_toml(dir: &Path) -> Option<RepobookToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_repobook_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_repobook_toml(s: &str) -> Result<RepobookToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $opts_field:ident) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$opts_field = v;
        }
    };
}

/// Overwrite a parsed enum field from file; an unknown value is logged and ignored.
macro_rules! apply_file_choice {
    ($sec:expr, $opts:expr, $field:ident) => {
        if let Some(ref raw) = $sec.$field {
            match raw.parse() {
                Ok(v) => $opts.$field = v,
                Err(e) => log::warn!("{}: {}", PackagePaths::get().config_filename(), e),
            }
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: RepobookToml, opts: &mut Opts) {
    let book = file.book;
    if let Some(title) = book.title {
        opts.title = Some(title);
    }
    if let Some(allow) = book.allow {
        opts.allow_list = Some(allow.into_vec());
    }
    apply_file_opt!(book, opts, size_mb => size_mb);
    apply_file_opt!(book, opts, exclude => exclude);
    apply_file_choice!(book, opts, device);

    let render = file.render;
    apply_file_choice!(render, opts, format);
    apply_file_choice!(render, opts, renderer);
    if let Some(p) = render.renderer_path {
        opts.renderer_path = Some(PathBuf::from(p));
    }
    if let Some(n) = render.concurrency {
        opts.concurrency = Some(n);
    }
    apply_file_opt!(render, opts, keep_html => keep_html);
    apply_file_opt!(render, opts, fail_fast => fail_fast);
    apply_file_opt!(render, opts, outline => outline);
    apply_file_opt!(render, opts, verbose => verbose);
}
