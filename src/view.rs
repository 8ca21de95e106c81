use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

use crate::aggregate::DetailAggregator;
use crate::models::{MovieDetail, MovieSummary};

/// What the detail screen currently shows.
#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub loading: bool,
    /// Sequence of the load that produced `detail`, 0 before the first commit.
    pub sequence: u64,
    pub detail: Option<Arc<MovieDetail>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Committed(u64),
    /// A later load was dispatched before this one settled; its result was dropped.
    Superseded(u64),
}

/// Single state slot for the detail screen.
///
/// Every `load` takes a sequence number when dispatched. Only the result of
/// the most recently dispatched load is written, regardless of which one
/// settles last.
#[derive(Debug)]
pub struct DetailView {
    aggregator: DetailAggregator,
    dispatched: AtomicU64,
    state: watch::Sender<DetailState>,
}

impl DetailView {
    pub fn new(aggregator: DetailAggregator) -> Self {
        let (state, _) = watch::channel(DetailState::default());
        Self {
            aggregator,
            dispatched: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    pub async fn load(&self, summary: &MovieSummary) -> LoadOutcome {
        // The counter only moves under the channel's write lock, so dispatch
        // and commit checks are totally ordered.
        let mut seq = 0;
        self.state.send_modify(|s| {
            seq = self.dispatched.fetch_add(1, Ordering::SeqCst) + 1;
            s.loading = true;
        });

        let mut guard = InFlight {
            view: self,
            seq,
            settled: false,
        };

        let detail = self.aggregator.aggregate(summary).await;

        let committed = self.state.send_if_modified(|s| {
            if self.dispatched.load(Ordering::SeqCst) != seq {
                return false;
            }
            s.loading = false;
            s.sequence = seq;
            s.detail = Some(Arc::new(detail));
            true
        });
        guard.settled = true;

        if committed {
            LoadOutcome::Committed(seq)
        } else {
            debug!(
                movie_id = summary.id,
                sequence = seq,
                "Discarding superseded detail result"
            );
            LoadOutcome::Superseded(seq)
        }
    }
}

/// Clears `loading` when a load is dropped before it settles, provided no
/// newer load has been dispatched since.
struct InFlight<'a> {
    view: &'a DetailView,
    seq: u64,
    settled: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let seq = self.seq;
        let dispatched = &self.view.dispatched;
        let cleared = self.view.state.send_if_modified(|s| {
            if dispatched.load(Ordering::SeqCst) != seq || !s.loading {
                return false;
            }
            s.loading = false;
            true
        });
        if cleared {
            debug!(sequence = seq, "Detail load cancelled");
        }
    }
}

pub fn render(state: &DetailState) -> String {
    match (&state.detail, state.loading) {
        (_, true) | (None, false) => "Loading...".to_string(),
        (Some(detail), false) => render_detail(detail),
    }
}

pub fn render_detail(detail: &MovieDetail) -> String {
    let movie = &detail.summary;
    let mut lines = Vec::new();

    if let Some(poster) = movie.poster_url() {
        lines.push(poster);
    }
    lines.push(movie.title.clone());
    if !movie.release_year.is_empty() {
        lines.push(movie.release_year.clone());
    }
    lines.push(format!("{:.1} ★", movie.rating));
    if detail.runtime > 0 {
        lines.push(format!("{} min", detail.runtime));
    }
    if !detail.genres.is_empty() {
        let names: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        lines.push(names.join(" | "));
    }

    lines.push(String::new());
    lines.push("About Movie".to_string());
    lines.push(movie.overview.clone());

    lines.push(String::new());
    lines.push("Cast".to_string());
    for member in &detail.cast {
        let mut line = format!("- {}", member.name);
        if let Some(character) = member.character.as_deref().filter(|c| !c.is_empty()) {
            line.push_str(&format!(" as {character}"));
        }
        if let Some(url) = member.profile_url() {
            line.push_str(&format!(" ({url})"));
        }
        lines.push(line);
    }

    lines.push(String::new());
    lines.push("Recommended".to_string());
    lines.push(render_list(&detail.recommended));

    lines.join("\n")
}

/// One line per movie: title, year and rating.
pub fn render_list(movies: &[MovieSummary]) -> String {
    movies
        .iter()
        .map(|m| {
            if m.release_year.is_empty() {
                format!("{} - {:.1} ★", m.title, m.rating)
            } else {
                format!("{} ({}) - {:.1} ★", m.title, m.release_year, m.rating)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
