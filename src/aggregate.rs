//! Fan-out/fan-in assembly of a [`MovieDetail`] from three TMDB calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{MovieDetail, MovieSummary};
use crate::tmdb::{Credits, MovieApi, MovieDetails, TmdbError};

pub const MAX_CAST: usize = 5;
pub const MAX_RECOMMENDED: usize = 5;

#[derive(Clone)]
pub struct DetailAggregator {
    api: Arc<dyn MovieApi>,
    branch_timeout: Duration,
}

impl DetailAggregator {
    pub fn new(api: Arc<dyn MovieApi>, branch_timeout: Duration) -> Self {
        Self {
            api,
            branch_timeout,
        }
    }

    /// Fetches details, credits and recommendations concurrently and merges
    /// whatever succeeded. A failed or slow branch leaves its fields empty.
    pub async fn aggregate(&self, summary: &MovieSummary) -> MovieDetail {
        let id = summary.id;
        debug!(movie_id = id, "Aggregating movie detail");

        let (details, credits, recommended) = tokio::join!(
            self.branch("details", id, self.api.details(id)),
            self.branch("credits", id, self.api.credits(id)),
            self.branch("recommendations", id, self.api.recommendations(id)),
        );

        merge(summary.clone(), details, credits, recommended)
    }

    /// Like [`aggregate`](Self::aggregate) when details are already in hand:
    /// only credits and recommendations are fetched.
    pub async fn aggregate_from_details(&self, details: MovieDetails) -> MovieDetail {
        let id = details.summary.id;
        debug!(movie_id = id, "Aggregating movie detail from fetched details");

        let (credits, recommended) = tokio::join!(
            self.branch("credits", id, self.api.credits(id)),
            self.branch("recommendations", id, self.api.recommendations(id)),
        );

        let summary = details.summary.clone();
        merge(summary, Some(details), credits, recommended)
    }

    async fn branch<T, F>(&self, name: &'static str, id: i32, fut: F) -> Option<T>
    where
        F: Future<Output = Result<T, TmdbError>>,
    {
        let outcome = match tokio::time::timeout(self.branch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(TmdbError::Timeout(self.branch_timeout)),
        };
        match outcome {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(movie_id = id, branch = name, "Degrading branch: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for DetailAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailAggregator")
            .field("branch_timeout", &self.branch_timeout)
            .finish_non_exhaustive()
    }
}

fn merge(
    summary: MovieSummary,
    details: Option<MovieDetails>,
    credits: Option<Credits>,
    recommended: Option<Vec<MovieSummary>>,
) -> MovieDetail {
    let mut detail = MovieDetail::empty(summary);

    if let Some(d) = details {
        detail.runtime = d.runtime;
        detail.genres = d.genres;
    }
    if let Some(c) = credits {
        detail.cast = c.cast.into_iter().take(MAX_CAST).collect();
    }
    if let Some(r) = recommended {
        detail.recommended = r.into_iter().take(MAX_RECOMMENDED).collect();
    }

    detail
}
