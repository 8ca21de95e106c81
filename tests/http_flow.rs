use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cinedeck::aggregate::DetailAggregator;
use cinedeck::app::{build_router, AppState};
use cinedeck::models::{CastMember, Genre, MovieSummary, Review};
use cinedeck::tmdb::{Credits, MovieApi, MovieDetails, TmdbError};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

const KNOWN_ID: i32 = 603;

#[derive(Default)]
struct FakeTmdb {
    details_calls: AtomicUsize,
}

fn matrix() -> MovieSummary {
    MovieSummary {
        id: KNOWN_ID,
        title: "The Matrix".to_string(),
        overview: "Neo wakes up.".to_string(),
        poster_path: Some("/p.jpg".to_string()),
        backdrop_path: Some("/b.jpg".to_string()),
        rating: 8.2,
        release_year: "1999".to_string(),
        genre_ids: vec![28, 878],
        language: "en".to_string(),
    }
}

fn upstream_missing() -> TmdbError {
    TmdbError::Upstream {
        status: 404,
        body: r#"{"status_code":34}"#.to_string(),
    }
}

#[async_trait::async_trait]
impl MovieApi for FakeTmdb {
    async fn search_by_name(&self, name: &str) -> Result<MovieSummary, TmdbError> {
        if name.eq_ignore_ascii_case("matrix") {
            Ok(matrix())
        } else {
            Err(TmdbError::NotFound(name.to_string()))
        }
    }
    async fn trending(&self) -> Result<Vec<MovieSummary>, TmdbError> {
        Ok(vec![matrix()])
    }
    async fn details(&self, id: i32) -> Result<MovieDetails, TmdbError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if id != KNOWN_ID {
            return Err(TmdbError::Upstream {
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(MovieDetails {
            summary: matrix(),
            runtime: 136,
            genres: vec![Genre {
                id: 28,
                name: "Action".to_string(),
            }],
        })
    }
    async fn credits(&self, _id: i32) -> Result<Credits, TmdbError> {
        Ok(Credits {
            cast: (0..8)
                .map(|i| CastMember {
                    id: i,
                    name: format!("Actor {i}"),
                    character: None,
                    profile_path: None,
                })
                .collect(),
        })
    }
    async fn recommendations(&self, _id: i32) -> Result<Vec<MovieSummary>, TmdbError> {
        Err(TmdbError::Timeout(Duration::from_secs(1)))
    }
    async fn reviews(&self, id: i32) -> Result<Vec<Review>, TmdbError> {
        if id != KNOWN_ID {
            return Err(upstream_missing());
        }
        Ok(vec![Review {
            id: "r1".to_string(),
            author: "critic".to_string(),
            content: "Still holds up.".to_string(),
            url: None,
            created_at: None,
        }])
    }
}

fn router() -> Router {
    router_with(Arc::new(FakeTmdb::default()))
}

fn router_with(fake: Arc<FakeTmdb>) -> Router {
    let api: Arc<dyn MovieApi> = fake;
    let aggregator = DetailAggregator::new(api.clone(), Duration::from_secs(5));
    build_router(AppState::new(api, aggregator))
}

async fn get(uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn search_returns_first_match() {
    let (status, body) = get("/movies/search?query=matrix").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["id"], KNOWN_ID);
    assert_eq!(json["release_year"], "1999");
}

#[tokio::test]
async fn search_without_match_is_404() {
    let (status, _) = get("/movies/search?query=nothing%20here").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_rejects_missing_or_blank_query() {
    assert_eq!(get("/movies/search").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(
        get("/movies/search?query=%20%20").await.0,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn trending_lists_summaries() {
    let (status, body) = get("/movies/trending").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.as_array().map(|a| a.len()), Some(1));
}

#[tokio::test]
async fn detail_is_aggregated_and_flattened() {
    let (status, body) = get(&format!("/movies/{KNOWN_ID}")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "The Matrix");
    assert_eq!(json["runtime"], 136);
    assert_eq!(json["genres"][0]["name"], "Action");
    assert_eq!(json["cast"].as_array().map(|a| a.len()), Some(5));
    assert_eq!(json["recommended"].as_array().map(|a| a.len()), Some(0));
}

#[tokio::test]
async fn detail_for_failing_movie_is_bad_gateway() {
    let (status, _) = get("/movies/1").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn reviews_are_listed_and_upstream_404_maps_through() {
    let (status, body) = get(&format!("/movies/{KNOWN_ID}/reviews")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json[0]["author"], "critic");

    let (status, _) = get("/movies/2/reviews").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn detail_fetches_details_only_once() {
    let fake = Arc::new(FakeTmdb::default());
    let response = router_with(fake.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/movies/{KNOWN_ID}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(fake.details_calls.load(Ordering::SeqCst), 1);
}
