//! Pagination: turns the walked file list into size-bounded [`DocumentPart`]s, one per call.
//!
//! The engine is a cursor over the entry list. Each [`PaginationEngine::render`] call scans forward,
//! appending qualifying files until the amplified byte count crosses the ceiling, then closes the part
//! right after its last file, so the entries leading to the file that did not fit start the next one. A file that is too big on its own becomes a
//! part by itself so the cursor always moves.
//!
//! Parts are numbered only once a second part is known to exist: a book that fits in one part has
//! `part_number == 0` and an unnumbered title.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::engine::tools::{base_name, extension_of, is_hidden, path_to_id};
use crate::language::LanguageRegistry;
use crate::pipeline::markup::section_text;
use crate::utils::config::SizeConsts;
use crate::{DocumentPart, FileEntry, FileSection, IndexLine, LanguageTag};

/// Knobs that shape the parts.
#[derive(Clone, Debug)]
pub struct PaginationConfig {
    pub title: String,
    /// Maximum amplified bytes per part.
    pub ceiling: usize,
    /// Multiplier applied to each serialized section before comparing against `ceiling`.
    pub amplification: usize,
}

impl PaginationConfig {
    pub fn new(title: impl Into<String>, ceiling: usize) -> Self {
        Self {
            title: title.into(),
            ceiling,
            amplification: SizeConsts::AMPLIFICATION,
        }
    }
}

/// Lazy, finite, non-restartable sequence of parts over one walk.
pub struct PaginationEngine {
    root: PathBuf,
    files: Vec<FileEntry>,
    registry: LanguageRegistry,
    config: PaginationConfig,
    /// Next unconsumed index into `files`.
    file_offset: usize,
    /// Amplified size of the part being assembled.
    byte_offset: usize,
    /// Parts already closed; 0 while the book may still be single-part.
    part_offset: usize,
    done: bool,
}

impl PaginationEngine {
    pub fn new(
        root: &Path,
        files: Vec<FileEntry>,
        registry: LanguageRegistry,
        config: PaginationConfig,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            files,
            registry,
            config,
            file_offset: 0,
            byte_offset: 0,
            part_offset: 0,
            done: false,
        }
    }

    pub fn has_next_part(&self) -> bool {
        !self.done
    }

    pub fn file_offset(&self) -> usize {
        self.file_offset
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Language of `entry` when it belongs in a part: a non-hidden file with a registered extension.
    fn qualifying_language(&self, entry: &FileEntry) -> Option<LanguageTag> {
        if entry.is_dir || is_hidden(&entry.path) {
            return None;
        }
        let ext = extension_of(&entry.path)?;
        self.registry.resolve(ext).cloned()
    }

    fn read_section(&self, entry: &FileEntry, language: LanguageTag) -> Result<FileSection> {
        let raw_content = std::fs::read(&entry.path)
            .with_context(|| format!("read {}", entry.path.display()))?;
        let id = path_to_id(&entry.path, &self.root);
        let serialized = section_text(&id, &language, &String::from_utf8_lossy(&raw_content));
        Ok(FileSection {
            id,
            language,
            raw_content,
            serialized,
        })
    }

    /// Table of contents for `files[start..end]`: directories always, files when they have a language.
    fn build_index(&self, start: usize, end: usize) -> Vec<IndexLine> {
        self.files[start..end.min(self.files.len())]
            .iter()
            .filter(|f| !base_name(&f.path).starts_with('.'))
            .filter(|f| f.is_dir || self.qualifying_language(f).is_some())
            .map(|f| {
                let id = path_to_id(&f.path, &self.root);
                IndexLine {
                    label: id.clone(),
                    depth: f.depth,
                    is_directory_heading: f.is_dir,
                    anchor_id: (!f.is_dir).then_some(id),
                }
            })
            .collect()
    }

    fn close_part(
        &self,
        part_number: usize,
        start: usize,
        end: usize,
        sections: Vec<FileSection>,
    ) -> DocumentPart {
        let title = if part_number == 0 {
            self.config.title.clone()
        } else {
            format!("{} ({})", self.config.title, part_number)
        };
        debug!(
            "paginate: part {} with {} files (entries {}..{})",
            part_number,
            sections.len(),
            start,
            end
        );
        DocumentPart {
            part_number,
            title,
            table_of_contents: self.build_index(start, end),
            sections,
        }
    }

    /// Next part, or `None` once every qualifying file has been emitted (or there were none).
    pub fn render(&mut self) -> Result<Option<DocumentPart>> {
        if self.done {
            return Ok(None);
        }
        let start = self.file_offset;
        let mut sections: Vec<FileSection> = Vec::new();
        // One past the last entry that stays in this part.
        let mut kept_end = start;

        for i in start..self.files.len() {
            let entry = &self.files[i];
            let Some(language) = self.qualifying_language(entry) else {
                continue;
            };
            let section = self.read_section(entry, language)?;
            self.byte_offset += section.serialized.len() * self.config.amplification;
            sections.push(section);

            if self.byte_offset > self.config.ceiling {
                self.part_offset += 1;
                self.byte_offset = 0;
                let end = if sections.len() == 1 {
                    // Too big on its own: emit it alone and move past it.
                    i + 1
                } else {
                    // The file that crossed the ceiling opens the next part, along with the
                    // directory headings that lead to it.
                    sections.pop();
                    kept_end
                };
                self.file_offset = end;
                return Ok(Some(self.close_part(self.part_offset, start, end, sections)));
            }
            kept_end = i + 1;
        }

        self.done = true;
        self.file_offset = self.files.len();
        if sections.is_empty() {
            debug!("paginate: nothing left after entry {}", start);
            return Ok(None);
        }
        if self.part_offset > 0 {
            self.part_offset += 1;
        }
        Ok(Some(self.close_part(
            self.part_offset,
            start,
            self.files.len(),
            sections,
        )))
    }
}

impl Iterator for PaginationEngine {
    type Item = Result<DocumentPart>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.render() {
            Ok(Some(part)) => Some(Ok(part)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
