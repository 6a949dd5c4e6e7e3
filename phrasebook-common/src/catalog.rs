//! Clip catalog: ordered categories of pronunciation clips
//!
//! The catalog is read-only input to the playback service. Clips are
//! immutable once constructed; lookups hand out shared references only.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One word or phrase with its translation and pronunciation audio.
///
/// A descriptor never mutates after construction: there is no `&mut`
/// accessor on purpose.
#[derive(Debug, Clone)]
pub struct Clip {
    id: Uuid,
    text: String,
    translation: String,
    audio: PathBuf,
    image: Option<PathBuf>,
}

impl Clip {
    pub fn new(
        text: impl Into<String>,
        translation: impl Into<String>,
        audio: impl Into<PathBuf>,
        image: Option<PathBuf>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            translation: translation.into(),
            audio: audio.into(),
            image,
        }
    }

    /// Catalog-unique identifier, assigned at load time.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The word or phrase in the language being learned.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The translation shown alongside it.
    pub fn translation(&self) -> &str {
        &self.translation
    }

    /// Opaque reference to the loadable pronunciation audio.
    pub fn audio(&self) -> &Path {
        &self.audio
    }

    pub fn image(&self) -> Option<&Path> {
        self.image.as_deref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}

/// A named, ordered group of clips (one list screen in the UI).
#[derive(Debug, Clone)]
pub struct Category {
    name: String,
    clips: Vec<Clip>,
}

impl Category {
    pub fn new(name: impl Into<String>, clips: Vec<Clip>) -> Self {
        Self {
            name: name.into(),
            clips,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }
}

/// The full catalog: categories in manifest order plus an id index.
#[derive(Debug, Clone)]
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<Uuid, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog from already-constructed categories.
    pub fn from_categories(categories: Vec<Category>) -> Self {
        let mut index = HashMap::new();
        for (cat_idx, category) in categories.iter().enumerate() {
            for (clip_idx, clip) in category.clips.iter().enumerate() {
                index.insert(clip.id(), (cat_idx, clip_idx));
            }
        }
        Self { categories, index }
    }

    /// Load a catalog from a TOML manifest.
    ///
    /// Relative `audio`/`image` paths resolve against the manifest's
    /// directory. Clip ids are assigned fresh on every load.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest = toml::from_str(&content)
            .map_err(|e| Error::Manifest(format!("{}: {}", path.display(), e)))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut categories = Vec::with_capacity(manifest.categories.len());
        let mut seen_names = HashMap::new();
        for raw in manifest.categories {
            if seen_names.insert(raw.name.clone(), ()).is_some() {
                return Err(Error::Manifest(format!(
                    "duplicate category name: {}",
                    raw.name
                )));
            }
            if raw.entries.is_empty() {
                return Err(Error::Manifest(format!("category {} has no entries", raw.name)));
            }
            let clips = raw
                .entries
                .into_iter()
                .map(|entry| {
                    Clip::new(
                        entry.text,
                        entry.translation,
                        resolve(base, entry.audio),
                        entry.image.map(|p| resolve(base, p)),
                    )
                })
                .collect();
            categories.push(Category::new(raw.name, clips));
        }

        if categories.is_empty() {
            return Err(Error::Manifest(format!(
                "{}: manifest defines no categories",
                path.display()
            )));
        }

        Ok(Self::from_categories(categories))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a clip by id, failing with `NotFound` for absent ids.
    pub fn clip(&self, id: Uuid) -> Result<&Clip> {
        self.index
            .get(&id)
            .map(|&(cat_idx, clip_idx)| &self.categories[cat_idx].clips[clip_idx])
            .ok_or_else(|| Error::NotFound(format!("clip {}", id)))
    }

    /// Total number of clips across all categories.
    pub fn clip_count(&self) -> usize {
        self.index.len()
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "category")]
    categories: Vec<ManifestCategory>,
}

#[derive(Debug, Deserialize)]
struct ManifestCategory {
    name: String,
    #[serde(default, rename = "entry")]
    entries: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    text: String,
    translation: String,
    audio: PathBuf,
    image: Option<PathBuf>,
}
