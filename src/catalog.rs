//! Category catalog
//!
//! The default set of classes the dataset is built from: cat breeds (the
//! positive classes, grouped under `cats/`) and a handful of generic
//! "not a pet" classes used as negatives.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directory name of the cat breed group, both in the raw and processed trees
pub const CATS_GROUP_DIR: &str = "cats";

/// Directory name of the negative-class group in the raw tree
pub const NOT_A_PET_GROUP_DIR: &str = "not-a-pet";

const CAT_BREEDS: &[&str] = &[
    "Abyssinian",
    "American Bobtail",
    "American Curl",
    "American Shorthair",
    "American Wirehair",
    "Balinese",
    "Bengal",
    "Birman",
    "Bombay",
    "British Shorthair",
    "Burmese",
    "Chartreux",
    "Ragdoll",
    "Exotic Shorthair",
    "Persian",
    "Maine Coon",
    "Sphynx",
    "Siamese",
    "Turkish Van",
    "Scottish Fold",
    "Devon Rex",
    "Cornish Rex",
    "Norwegian Forest Cat",
    "Russian Blue",
    "Egyptian Mau",
    "Oriental Shorthair",
    "Japanese Bobtail",
    "Somali",
    "Manx",
    "Singapura",
    "LaPerm",
    "Turkish Angora",
    "Ocicat",
    "Tonkinese",
    "Havana Brown",
    "Siberian",
    "Snowshoe",
    "Selkirk Rex",
    "Savannah",
    "Khao Manee",
    "Lykoi",
    "Toyger",
    "Peterbald",
    "Munchkin",
    "Cheetoh",
];

const OTHER_TYPES: &[&str] = &[
    "human faces",
    "trees",
    "forests",
    "buildings",
    "sea",
    "boats",
    "cars",
];

/// Top-level group a category belongs to in the raw corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryGroup {
    /// A cat breed, stored under `raw/cats/<breed>`
    Cats,
    /// A negative class, stored under `raw/not-a-pet/<label>`
    NotAPet,
}

impl CategoryGroup {
    /// Directory name of this group under the raw root
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Cats => CATS_GROUP_DIR,
            Self::NotAPet => NOT_A_PET_GROUP_DIR,
        }
    }
}

/// A named class of subject, mapped 1:1 to a raw-corpus directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    pub group: CategoryGroup,
}

impl Category {
    #[must_use]
    pub fn new<S: Into<String>>(label: S, group: CategoryGroup) -> Self {
        Self {
            label: label.into(),
            group,
        }
    }

    /// Text sent to the image search collaborator
    #[must_use]
    pub fn search_query(&self) -> String {
        match self.group {
            CategoryGroup::Cats => format!("{} cat", self.label),
            CategoryGroup::NotAPet => self.label.clone(),
        }
    }

    /// Folder the category's raw images live in
    #[must_use]
    pub fn raw_dir(&self, raw_root: &Path) -> PathBuf {
        raw_root.join(self.group.dir_name()).join(&self.label)
    }
}

/// Default cat breed categories, sorted by label
#[must_use]
pub fn cat_breeds() -> Vec<Category> {
    let mut breeds: Vec<Category> = CAT_BREEDS
        .iter()
        .map(|breed| Category::new(*breed, CategoryGroup::Cats))
        .collect();
    breeds.sort_by(|a, b| a.label.cmp(&b.label));
    breeds
}

/// Default negative-class categories
#[must_use]
pub fn other_types() -> Vec<Category> {
    OTHER_TYPES
        .iter()
        .map(|label| Category::new(*label, CategoryGroup::NotAPet))
        .collect()
}
