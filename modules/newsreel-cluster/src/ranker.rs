//! Per-query thread ranking: window, weigh, decay, order.

use std::collections::HashSet;

use newsreel_common::{AgencyRating, Category, RankingConfig, Thread};

/// A thread with its query-time score breakdown.
#[derive(Debug)]
pub struct ScoredThread<'a> {
    pub thread: &'a Thread,
    pub weight: f64,
    pub importance: f64,
    pub age_penalty: f64,
    pub score: f64,
}

/// Rank the threads of one language for a `(period, category)` query.
/// `threads` must be sorted by `best_time` ascending; `now` is the index's
/// `iter_timestamp`. Stateless — scoring is recomputed per query so that
/// freshness reflects query time.
pub fn rank<'a>(
    threads: &'a [Thread],
    rating: &AgencyRating,
    category: Category,
    period_secs: u64,
    now: u64,
    config: &RankingConfig,
) -> Vec<ScoredThread<'a>> {
    let cutoff = now.saturating_sub(period_secs);
    let start = threads.partition_point(|t| t.best_time < cutoff);

    let mut scored: Vec<ScoredThread<'a>> = threads[start..]
        .iter()
        .filter(|t| category == Category::Any || t.category == category)
        .map(|t| score_thread(t, rating, now, config))
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(config.max_threads);
    scored
}

fn score_thread<'a>(
    thread: &'a Thread,
    rating: &AgencyRating,
    now: u64,
    config: &RankingConfig,
) -> ScoredThread<'a> {
    // Host-deduplicated agency weight: a burst from one outlet counts once.
    let mut seen_hosts: HashSet<&str> = HashSet::new();
    let mut weight = 0.0;
    for doc in &thread.documents {
        if seen_hosts.insert(doc.host.as_str()) {
            weight += rating.get(&doc.host);
        }
    }

    let importance = weight * (1.0 + thread.len() as f64).ln();

    let age = now.saturating_sub(thread.best_time) as f64;
    let half_life = config.age_penalty_half_life_secs.max(1) as f64;
    let age_penalty = 0.5f64.powf(age / half_life).clamp(0.0, 1.0);

    ScoredThread {
        thread,
        weight,
        importance,
        age_penalty,
        score: importance * age_penalty,
    }
}
