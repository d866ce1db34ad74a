//! Pipeline components: walk, pagination, markup, page template.

pub mod markup;
pub mod paginate;
pub mod template;
pub mod walk;

pub use markup::{Highlighter, part_to_markdown, section_text};
pub use paginate::{PaginationConfig, PaginationEngine};
pub use template::{PageTemplate, page_rule};
pub use walk::{TreeWalker, walk_tree};
