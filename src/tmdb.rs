use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::TmdbConfig;
use crate::models::{CastMember, Genre, MovieSummary, Review};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const IMAGE_SIZE: &str = "/w500";

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("request to TMDB failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("TMDB response was not the expected JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("no TMDB result for '{0}'")]
    NotFound(String),
    #[error("TMDB returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("TMDB call did not finish within {0:?}")]
    Timeout(Duration),
}

/// The logical TMDB operations the rest of the crate depends on.
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// First search hit for `name`.
    async fn search_by_name(&self, name: &str) -> Result<MovieSummary, TmdbError>;
    async fn trending(&self) -> Result<Vec<MovieSummary>, TmdbError>;
    async fn details(&self, id: i32) -> Result<MovieDetails, TmdbError>;
    async fn credits(&self, id: i32) -> Result<Credits, TmdbError>;
    /// Related movies in the order TMDB ranks them.
    async fn recommendations(&self, id: i32) -> Result<Vec<MovieSummary>, TmdbError>;
    async fn reviews(&self, id: i32) -> Result<Vec<Review>, TmdbError>;
}

/// Absolute w500 CDN URL for an image path such as `/abc.jpg`.
pub fn image_url(path: &str) -> String {
    format!("{IMAGE_BASE}{IMAGE_SIZE}{path}")
}

#[derive(Debug, Clone)]
pub struct MovieDetails {
    pub summary: MovieSummary,
    pub runtime: u32,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    /// Already URL-encoded for the query string.
    language: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> anyhow::Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_token))
            .context("TMDB_API_TOKEN is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = format!("cinedeck/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .context("Failed to build TMDB HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            language: urlencoding::encode(&config.language).into_owned(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TmdbError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(path = %path, "TMDB request");
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(TmdbError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl MovieApi for TmdbClient {
    async fn search_by_name(&self, name: &str) -> Result<MovieSummary, TmdbError> {
        let path = format!(
            "/search/movie?query={}&language={}",
            urlencoding::encode(name),
            self.language
        );
        let page: ResultPage<MovieResult> = self.get_json(&path).await?;
        first_result(page, name)
    }

    async fn trending(&self) -> Result<Vec<MovieSummary>, TmdbError> {
        let path = format!("/trending/movie/day?language={}", self.language);
        let page: ResultPage<MovieResult> = self.get_json(&path).await?;
        Ok(page.results.into_iter().map(MovieSummary::from).collect())
    }

    async fn details(&self, id: i32) -> Result<MovieDetails, TmdbError> {
        let path = format!("/movie/{id}?language={}", self.language);
        let raw: RawDetails = self.get_json(&path).await?;
        Ok(raw.into())
    }

    async fn credits(&self, id: i32) -> Result<Credits, TmdbError> {
        let path = format!("/movie/{id}/credits?language={}", self.language);
        self.get_json(&path).await
    }

    async fn recommendations(&self, id: i32) -> Result<Vec<MovieSummary>, TmdbError> {
        let path = format!(
            "/movie/{id}/recommendations?language={}&page=1",
            self.language
        );
        let page: ResultPage<MovieResult> = self.get_json(&path).await?;
        Ok(page.results.into_iter().map(MovieSummary::from).collect())
    }

    async fn reviews(&self, id: i32) -> Result<Vec<Review>, TmdbError> {
        let path = format!("/movie/{id}/reviews?language={}&page=1", self.language);
        let page: ResultPage<Review> = self.get_json(&path).await?;
        Ok(page.results)
    }
}

#[derive(Debug, Deserialize)]
struct ResultPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct MovieResult {
    id: i32,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    release_date: Option<String>,
    #[serde(default)]
    genre_ids: Vec<i32>,
    original_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    id: i32,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    release_date: Option<String>,
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
    original_language: Option<String>,
}

impl From<MovieResult> for MovieSummary {
    fn from(raw: MovieResult) -> Self {
        MovieSummary {
            id: raw.id,
            title: display_title(raw.original_title, raw.title),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path,
            backdrop_path: raw.backdrop_path,
            rating: round_rating(raw.vote_average),
            release_year: release_year(raw.release_date.as_deref()),
            genre_ids: raw.genre_ids,
            language: raw.original_language.unwrap_or_default(),
        }
    }
}

impl From<RawDetails> for MovieDetails {
    fn from(raw: RawDetails) -> Self {
        let summary = MovieSummary {
            id: raw.id,
            title: display_title(raw.original_title, raw.title),
            overview: raw.overview.unwrap_or_default(),
            poster_path: raw.poster_path,
            backdrop_path: raw.backdrop_path,
            rating: round_rating(raw.vote_average),
            release_year: release_year(raw.release_date.as_deref()),
            genre_ids: raw.genres.iter().map(|g| g.id).collect(),
            language: raw.original_language.unwrap_or_default(),
        };
        MovieDetails {
            summary,
            runtime: raw.runtime.unwrap_or(0),
            genres: raw.genres,
        }
    }
}

fn first_result(page: ResultPage<MovieResult>, query: &str) -> Result<MovieSummary, TmdbError> {
    page.results
        .into_iter()
        .next()
        .map(MovieSummary::from)
        .ok_or_else(|| TmdbError::NotFound(query.to_string()))
}

fn display_title(original: Option<String>, localized: Option<String>) -> String {
    original
        .filter(|t| !t.trim().is_empty())
        .or(localized)
        .unwrap_or_default()
}

fn round_rating(vote_average: Option<f64>) -> f32 {
    let v = vote_average.unwrap_or(0.0).clamp(0.0, 10.0);
    ((v * 10.0).round() / 10.0) as f32
}

fn release_year(date: Option<&str>) -> String {
    date.and_then(|d| d.get(..4))
        .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
        .map(|y| y.to_string())
        .unwrap_or_default()
}
