use serde::{Deserialize, Serialize};

/// A graph-provided assertion that an identity appears at a normalized
/// position in a photo. `x`/`y` are percentages of image width/height, so
/// tags stay valid across photo resolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialTag {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagList {
    #[serde(default)]
    pub data: Vec<SocialTag>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoRecord {
    pub source: String,
    #[serde(default)]
    pub tags: Option<TagList>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Friend {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a paged graph collection.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}
