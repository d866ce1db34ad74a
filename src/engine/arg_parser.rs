use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::{Device, OutputFormat, RendererKind};

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Turn a source tree into paginated, syntax-highlighted books.
#[derive(Clone, Parser)]
#[command(name = "repobook")]
#[command(about = "Render a directory of source files into PDF/EPUB/MOBI/HTML books.")]
pub struct Cli {
    /// Directory to render. Default: current directory.
    #[arg(value_name = "INPUT", default_value = DefaultArgs::DIR)]
    pub input: PathBuf,

    /// Output file. Default: `<input dir name>.<format>` in the working directory.
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Only include these extensions, comma separated (e.g. `rs,toml,md`).
    #[arg(long = "allow", short = 'w', value_name = "EXTS")]
    pub allow: Option<String>,

    /// Part size ceiling in MB. Larger books are split into numbered parts.
    #[arg(long, short = 's', value_name = "MB")]
    pub size: Option<f64>,

    /// Book title. Default: input directory name.
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Page profile: desktop, tablet or mobile.
    #[arg(long, short = 'd')]
    pub device: Option<Device>,

    /// Output format: pdf, epub, mobi or html.
    #[arg(long, short = 'f')]
    pub format: Option<OutputFormat>,

    /// Renderer: chrome, calibre or wkhtmltopdf.
    #[arg(long, short = 'r')]
    pub renderer: Option<RendererKind>,

    /// Renderer binary. Default: looked up on PATH.
    #[arg(long, value_name = "PATH")]
    pub renderer_path: Option<PathBuf>,

    /// Parallel render jobs. Default: min(4, cores, parts).
    #[arg(long, short = 'j', value_parser = clap::value_parser!(usize))]
    pub concurrency: Option<usize>,

    /// Extra directory exclusion pattern (substring or glob). Repeat for more: -e a -e b
    #[arg(long, short = 'e', value_name = "PATTERN", action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Keep the intermediate HTML next to the artifacts.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub keep_html: Option<bool>,

    /// Stop starting new render jobs after the first failure.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub fail_fast: Option<bool>,

    /// Skip the PDF document outline (chrome renderer).
    #[arg(long)]
    pub no_outline: bool,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
