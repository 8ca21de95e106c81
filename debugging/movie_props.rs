//! Resolve a movie by name or TMDB id, aggregate its detail view and print it.
//! Usage:
//!   cargo run --bin movie_props -- <title or tmdb id>
//!   cargo run --bin movie_props -- --trending
//!   cargo run --bin movie_props -- --reviews <tmdb_id>
//! Requires TMDB_API_TOKEN in the environment (.env supported).

use anyhow::{Context, Result};
use cinedeck::aggregate::DetailAggregator;
use cinedeck::config::Config;
use cinedeck::tmdb::{MovieApi, TmdbClient};
use cinedeck::view::{self, DetailView, LoadOutcome};
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let first = args
        .first()
        .context("Usage: movie_props <title or tmdb id> | --trending | --reviews <tmdb_id>")?;

    let config = Config::from_env()?;
    let api: Arc<dyn MovieApi> = Arc::new(TmdbClient::new(&config.tmdb)?);

    match first.as_str() {
        "--trending" => {
            let movies = api.trending().await?;
            println!("{}", view::render_list(&movies));
        }
        "--reviews" => {
            let id: i32 = args
                .get(1)
                .context("--reviews needs a TMDB id")?
                .parse()
                .context("TMDB id must be numeric")?;
            let reviews = api.reviews(id).await?;
            println!("{}", serde_json::to_string_pretty(&reviews)?);
        }
        _ => {
            let query = args.join(" ");
            let summary = match query.parse::<i32>() {
                Ok(id) => api.details(id).await?.summary,
                Err(_) => api.search_by_name(&query).await?,
            };

            let detail_view = DetailView::new(DetailAggregator::new(api.clone(), config.branch_timeout));
            if let LoadOutcome::Superseded(seq) = detail_view.load(&summary).await {
                anyhow::bail!("load {} was superseded", seq);
            }
            println!("{}", view::render(&detail_view.state()));
        }
    }

    Ok(())
}
