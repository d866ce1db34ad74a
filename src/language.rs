//! Extension → language resolution.
//!
//! The registry is built once from a static catalog of `(canonical name, aliases)` pairs. The canonical
//! name is itself an alias. With an allow-list only the listed extensions are registered.

use std::collections::HashMap;

use crate::LanguageTag;

/// Canonical name of the prose language. Files resolving to it are not fenced.
pub const PROSE: &str = "markdown";

/// Languages the highlighter knows, with the file extensions that select them.
pub static CATALOG: &[(&str, &[&str])] = &[
    ("bash", &["sh", "bash", "zsh", "ksh"]),
    ("c", &["c", "h"]),
    ("clojure", &["clj", "cljs", "cljc", "edn"]),
    ("cmake", &["cmake"]),
    ("coffeescript", &["coffee", "cson", "iced"]),
    ("cpp", &["cc", "cpp", "cxx", "c++", "hpp", "hh", "hxx", "h++", "ino"]),
    ("cs", &["cs", "csx"]),
    ("css", &["css"]),
    ("d", &["d", "di"]),
    ("dart", &["dart"]),
    ("diff", &["diff", "patch"]),
    ("dockerfile", &["dockerfile"]),
    ("elixir", &["ex", "exs"]),
    ("elm", &["elm"]),
    ("erlang", &["erl", "hrl"]),
    ("fsharp", &["fs", "fsi", "fsx"]),
    ("go", &["go"]),
    ("graphql", &["graphql", "gql"]),
    ("groovy", &["groovy", "gradle"]),
    ("haskell", &["hs", "lhs"]),
    ("html", &["html", "htm", "xhtml"]),
    ("ini", &["ini", "cfg", "conf"]),
    ("java", &["java", "jsp"]),
    ("javascript", &["js", "jsx", "mjs", "cjs"]),
    ("json", &["json"]),
    ("julia", &["jl"]),
    ("kotlin", &["kt", "kts"]),
    ("latex", &["tex", "sty", "cls"]),
    ("less", &["less"]),
    ("lisp", &["lisp", "lsp", "el"]),
    ("lua", &["lua"]),
    ("makefile", &["mk", "mak"]),
    (PROSE, &["md", "markdown", "mkd", "mkdown"]),
    ("nim", &["nim", "nims"]),
    ("nix", &["nix"]),
    ("objectivec", &["m", "mm"]),
    ("ocaml", &["ml", "mli"]),
    ("perl", &["pl", "pm"]),
    ("php", &["php", "php3", "php4", "php5", "phtml"]),
    ("powershell", &["ps1", "psm1"]),
    ("protobuf", &["proto"]),
    ("python", &["py", "pyw", "gyp", "pyi"]),
    ("r", &["r"]),
    ("ruby", &["rb", "gemspec", "podspec", "thor", "rake"]),
    ("rust", &["rs"]),
    ("scala", &["scala", "sc"]),
    ("scheme", &["scm", "ss"]),
    ("scss", &["scss", "sass"]),
    ("sql", &["sql"]),
    ("swift", &["swift"]),
    ("tcl", &["tcl", "tk"]),
    ("toml", &["toml"]),
    ("typescript", &["ts", "tsx", "mts", "cts"]),
    ("vbnet", &["vb"]),
    ("verilog", &["v", "sv", "svh"]),
    ("vhdl", &["vhd", "vhdl"]),
    ("vim", &["vim"]),
    ("xml", &["xml", "xsd", "xsl", "xslt", "svg", "plist", "rss"]),
    ("yaml", &["yml", "yaml"]),
    ("zig", &["zig"]),
];

/// Maps extensions to [`LanguageTag`]s. Pure after construction.
#[derive(Clone, Debug, Default)]
pub struct LanguageRegistry {
    aliases: HashMap<String, LanguageTag>,
}

impl LanguageRegistry {
    /// Registry over [`CATALOG`], restricted to `allow_list` when given.
    pub fn new(allow_list: Option<&[String]>) -> Self {
        Self::from_catalog(CATALOG, allow_list)
    }

    pub fn from_catalog(catalog: &[(&str, &[&str])], allow_list: Option<&[String]>) -> Self {
        let allowed = |alias: &str| allow_list.is_none_or(|list| list.iter().any(|a| a == alias));
        let mut aliases = HashMap::new();
        for (name, exts) in catalog {
            let tag = if *name == PROSE {
                LanguageTag::Prose
            } else {
                LanguageTag::Code((*name).to_string())
            };
            for alias in std::iter::once(name).chain(exts.iter()) {
                if allowed(*alias) {
                    aliases
                        .entry((*alias).to_string())
                        .or_insert_with(|| tag.clone());
                }
            }
        }
        Self { aliases }
    }

    /// Tag for `extension` (no dot), or None when unsupported or not allowed.
    pub fn resolve(&self, extension: &str) -> Option<&LanguageTag> {
        self.aliases.get(extension).or_else(|| {
            let lower = extension.to_ascii_lowercase();
            (lower != extension)
                .then(|| self.aliases.get(&lower))
                .flatten()
        })
    }

    pub fn is_supported(&self, extension: &str) -> bool {
        self.resolve(extension).is_some()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
