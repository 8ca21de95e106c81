use serde::{Deserialize, Serialize};

use crate::tmdb::image_url;

/// A movie as it appears in search, trending and recommendation listings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: i32,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    /// 0.0 to 10.0, rounded to one decimal.
    pub rating: f32,
    /// Four digit year, empty when TMDB has no release date.
    pub release_year: String,
    pub genre_ids: Vec<i32>,
    pub language: String,
}

impl MovieSummary {
    pub fn poster_url(&self) -> Option<String> {
        self.poster_path.as_deref().map(image_url)
    }

    pub fn backdrop_url(&self) -> Option<String> {
        self.backdrop_path.as_deref().map(image_url)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CastMember {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

impl CastMember {
    pub fn profile_url(&self) -> Option<String> {
        self.profile_path.as_deref().map(image_url)
    }
}

/// A summary enriched with details, top cast and recommendations.
///
/// Built once by the aggregator and replaced wholesale on reload.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub summary: MovieSummary,
    pub runtime: u32,
    pub genres: Vec<Genre>,
    pub cast: Vec<CastMember>,
    pub recommended: Vec<MovieSummary>,
}

impl MovieDetail {
    /// The detail record before any branch has contributed.
    pub fn empty(summary: MovieSummary) -> Self {
        Self {
            summary,
            runtime: 0,
            genres: Vec::new(),
            cast: Vec::new(),
            recommended: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}
