//! Translation coverage check for release builds.
//!
//! Each language lives in `translations/translation_<lang>.xml` with the layout
//! `<l10n><texts><text name="..." text="..."/></texts></l10n>`.

use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use std::path::Path;
use tokio::fs;
use xmltree::{Element, XMLNode};

const FILE_PREFIX: &str = "translation_";

/// Text names found for each language, keyed by language code.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TranslationSet {
    languages: IndexMap<String, IndexSet<String>>,
}

impl TranslationSet {
    pub async fn load(dir: &Path) -> Result<Self> {
        let mut languages = IndexMap::new();

        let mut entries = fs::read_dir(dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if let Some(lang) = language_of(&file_name) {
                files.push((lang.to_string(), entry.path()));
            }
        }
        files.sort();

        for (lang, path) in files {
            let content = fs::read(&path).await?;
            let root = Element::parse(content.as_slice())
                .map_err(|e| Error::ValidationError(format!("{}: {}", path.display(), e)))?;
            debug!("Loaded translation '{}' from {}", lang, path.display());
            languages.insert(lang, text_names(&root));
        }

        Ok(Self { languages })
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Names defined by some language but absent from `lang`.
    pub fn missing(&self, lang: &str) -> Vec<&str> {
        let Some(own) = self.languages.get(lang) else {
            return Vec::new();
        };

        let mut all: IndexSet<&str> = IndexSet::new();
        for names in self.languages.values() {
            all.extend(names.iter().map(String::as_str));
        }
        all.into_iter().filter(|name| !own.contains(*name)).collect()
    }
}

/// Warns about every text name missing from at least one language.
/// Returns the number of gaps found.
pub async fn check_translations(dir: &Path) -> Result<usize> {
    let set = TranslationSet::load(dir).await?;
    let mut gaps = 0;

    for lang in set.languages() {
        let missing = set.missing(lang);
        if !missing.is_empty() {
            warn!("Translation '{}' is missing {} texts: {}", lang, missing.len(), missing.join(", "));
            gaps += missing.len();
        }
    }

    Ok(gaps)
}

fn language_of(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(".xml")
        .filter(|lang| !lang.is_empty())
}

fn text_names(root: &Element) -> IndexSet<String> {
    let Some(texts) = root.get_child("texts") else {
        return IndexSet::new();
    };

    texts
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(e) if e.name == "text" => e.attributes.get("name").cloned(),
            _ => None,
        })
        .collect()
}
