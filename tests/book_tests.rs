use repobook::book::run_book;
use repobook::{BookOpts, Device, Opts, OutputFormat, RendererKind, build_book};
use std::fs;
use std::path::{Path, PathBuf};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn sample_repo(root: &Path) {
    write(root, "README.md", "# Sample\n\nA *small* project.\n");
    write(root, "src/main.rs", "fn main() {\n    println!(\"hi\");\n}\n");
    write(root, "src/util.py", "def add(a, b):\n    return a + b\n");
    write(root, "assets/logo.png", "not really a png");
}

fn html_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "html"))
        .collect();
    files.sort();
    files
}

#[test]
fn single_part_book_is_one_highlighted_page() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    sample_repo(src.path());
    let output = out.path().join("sample.html");

    let opts = BookOpts {
        title: Some("Sample".to_string()),
        ..Default::default()
    };
    let outcome = build_book(src.path(), &opts, &output).unwrap();

    assert_eq!(outcome.parts, 1);
    assert_eq!(outcome.artifacts, vec![output.clone()]);
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.starts_with("<!doctype html>"));
    assert!(html.contains("<title>Sample</title>"));
    assert!(html.contains("id=\"Contents\""));
    assert!(html.contains("id=\"src/main.rs\""));
    assert!(html.contains("href=\"#src/main.rs\""));
    assert!(html.contains("data-language=\"rust\""));
    assert!(html.contains("syntax-"));
    assert!(html.contains("<em>small</em>"));
    assert!(!html.contains("logo.png"));
}

#[test]
fn split_book_writes_numbered_pages() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = BookOpts {
        title: Some("Sample".to_string()),
        // 80 bytes: every file is a part of its own.
        size_mb: 0.0001,
        ..Default::default()
    };
    let outcome = build_book(src.path(), &opts, &out.path().join("sample.html")).unwrap();

    assert_eq!(outcome.parts, 3);
    let written = html_files(out.path());
    assert_eq!(
        written,
        vec![
            out.path().join("sample-1.html"),
            out.path().join("sample-2.html"),
            out.path().join("sample-3.html"),
        ]
    );
    assert_eq!(outcome.artifacts, written);
    let first = fs::read_to_string(&written[0]).unwrap();
    assert!(first.contains("<title>Sample (1)</title>"));
}

#[test]
fn empty_tree_writes_nothing() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write(src.path(), "data/blob.bin", "0101");

    let outcome = build_book(src.path(), &BookOpts::default(), &out.path().join("x.html")).unwrap();

    assert!(outcome.is_empty());
    assert!(outcome.artifacts.is_empty());
    assert!(html_files(out.path()).is_empty());
}

#[test]
fn device_profile_sets_page_size() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    sample_repo(src.path());
    let output = out.path().join("m.html");

    let opts = BookOpts {
        device: Device::Mobile,
        ..Default::default()
    };
    build_book(src.path(), &opts, &output).unwrap();
    assert!(fs::read_to_string(&output).unwrap().contains("size: 6in 10in"));
}

#[test]
fn unsupported_renderer_format_is_rejected_before_writing() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = Opts {
        output: Some(out.path().join("book.epub")),
        format: OutputFormat::Epub,
        renderer: RendererKind::Chrome,
        ..Default::default()
    };
    assert!(run_book(src.path(), &opts, None).is_err());
    assert!(html_files(out.path()).is_empty());
}

#[test]
fn missing_renderer_fails_the_render_phase() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = Opts {
        output: Some(out.path().join("book.pdf")),
        format: OutputFormat::Pdf,
        renderer: RendererKind::Wkhtmltopdf,
        renderer_path: Some(out.path().join("no-such-renderer")),
        ..Default::default()
    };
    let err = run_book(src.path(), &opts, None).unwrap_err();
    assert!(format!("{err:#}").contains("cannot start wkhtmltopdf"));
    assert!(!out.path().join("book.pdf").exists());
}

/// Executable stand-in for a renderer: runs `body` with the artifact path (last argument) in `$out`.
#[cfg(unix)]
fn fake_renderer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("fake-renderer");
    fs::write(&path, format!("#!/bin/sh\nfor out; do :; done\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn rendered_artifact_replaces_intermediate_page() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = Opts {
        output: Some(out.path().join("book.pdf")),
        format: OutputFormat::Pdf,
        renderer: RendererKind::Wkhtmltopdf,
        renderer_path: Some(fake_renderer(bin.path(), "printf pdf > \"$out\"")),
        ..Default::default()
    };
    let outcome = run_book(src.path(), &opts, None).unwrap();

    assert_eq!(outcome.parts, 1);
    assert_eq!(outcome.artifacts, vec![out.path().join("book.pdf")]);
    assert_eq!(fs::read_to_string(out.path().join("book.pdf")).unwrap(), "pdf");
    assert!(html_files(out.path()).is_empty());
}

#[cfg(unix)]
#[test]
fn keep_html_leaves_pages_next_to_artifacts() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = Opts {
        output: Some(out.path().join("book.pdf")),
        size_mb: 0.0001,
        renderer: RendererKind::Wkhtmltopdf,
        renderer_path: Some(fake_renderer(bin.path(), "printf pdf > \"$out\"")),
        keep_html: true,
        concurrency: Some(2),
        ..Default::default()
    };
    let outcome = run_book(src.path(), &opts, None).unwrap();

    assert_eq!(outcome.parts, 3);
    assert_eq!(
        outcome.artifacts,
        (1..=3)
            .map(|n| out.path().join(format!("book-{n}.pdf")))
            .collect::<Vec<_>>()
    );
    assert_eq!(html_files(out.path()).len(), 3);
}

#[cfg(unix)]
#[test]
fn failing_renderer_reports_the_job_and_keeps_its_page() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let bin = tempfile::tempdir().unwrap();
    sample_repo(src.path());

    let opts = Opts {
        output: Some(out.path().join("book.pdf")),
        renderer: RendererKind::Wkhtmltopdf,
        renderer_path: Some(fake_renderer(bin.path(), "echo broken page >&2; exit 2")),
        ..Default::default()
    };
    let err = run_book(src.path(), &opts, None).unwrap_err();

    assert!(format!("{err:#}").contains("1 of 1 render jobs failed"));
    assert!(!out.path().join("book.pdf").exists());
    assert_eq!(html_files(out.path()), vec![out.path().join("book.html")]);
}
