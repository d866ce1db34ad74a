//! CLI command handler: resolve options (config file, then flags) and build the book.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Opts;
use crate::book::run_book;
use crate::engine::arg_parser::Cli;
use crate::engine::tools::split_allow_list;
use crate::render::backends::check_configured_binary;
use crate::utils::repobook_toml::{apply_file_to_opts, load_repobook_toml};
use crate::utils::setup_logging;

/// Overwrite opts field from a CLI flag when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $opts_field:ident) => {
        if let Some(v) = $cli.$cli_field.clone() {
            $opts.$opts_field = v;
        }
    };
}

/// `.repobook.toml` from the input directory first, then every flag given on the command line.
fn setup_opts(cli: &Cli) -> Opts {
    let mut opts = Opts::default();
    let file = load_repobook_toml(&cli.input);
    let had_file = file.is_some();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }

    opts.output = cli.output.clone();
    if let Some(raw) = &cli.allow {
        opts.allow_list = Some(split_allow_list(raw));
    }
    if cli.title.is_some() {
        opts.title = cli.title.clone();
    }
    apply_cli_opt!(cli, opts, size => size_mb);
    apply_cli_opt!(cli, opts, device => device);
    apply_cli_opt!(cli, opts, format => format);
    apply_cli_opt!(cli, opts, renderer => renderer);
    if cli.renderer_path.is_some() {
        opts.renderer_path = cli.renderer_path.clone();
    }
    if cli.concurrency.is_some() {
        opts.concurrency = cli.concurrency;
    }
    opts.exclude.extend(cli.exclude.iter().cloned());
    apply_cli_opt!(cli, opts, keep_html => keep_html);
    apply_cli_opt!(cli, opts, fail_fast => fail_fast);
    if cli.no_outline {
        opts.outline = false;
    }
    apply_cli_opt!(cli, opts, verbose => verbose);

    setup_logging(opts.verbose);
    if had_file {
        debug!("applied {}", crate::utils::config::PackagePaths::get().config_filename());
    }
    opts
}

/// Build the book for `cli.input`. Ctrl+C stops new parts and render jobs; running renders finish.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    check_configured_binary(opts.renderer_path.as_deref());

    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let outcome = run_book(&cli.input, &opts, Some(&cancel_requested))?;
    if outcome.is_empty() {
        info!("No files matched; nothing was written.");
    } else {
        debug!(
            "{} part(s), {} artifact(s)",
            outcome.parts,
            outcome.artifacts.len()
        );
    }
    Ok(())
}
