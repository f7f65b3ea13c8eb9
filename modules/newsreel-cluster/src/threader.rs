//! Turns flat cluster labels into threads: same-site deduplication, title
//! and category election, representative timestamps, final ordering.

use std::collections::{HashMap, HashSet};

use newsreel_common::{AgencyRating, Category, Document, ClusteringParams, Thread};

/// Assemble the final per-language thread list from clustering labels.
/// `documents` must be in working-set order (fetch time ascending) with
/// `labels[i]` belonging to `documents[i]`.
pub fn assemble_threads(
    documents: Vec<Document>,
    labels: &[usize],
    rating: &AgencyRating,
    params: &ClusteringParams,
) -> Vec<Thread> {
    debug_assert_eq!(documents.len(), labels.len());

    // Group member indices by label, first-appearance order. Member order
    // inside a group follows the input, i.e. fetch time ascending.
    let mut order: Vec<usize> = Vec::new();
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        groups
            .entry(label)
            .or_insert_with(|| {
                order.push(label);
                Vec::new()
            })
            .push(i);
    }

    let mut clusters: Vec<Vec<usize>> = Vec::with_capacity(order.len());
    if params.ban_threads_from_same_site {
        // Within a cluster only the earliest article per host stays; later
        // same-host articles split off as singleton threads.
        for label in &order {
            let members = &groups[label];
            let mut seen_hosts: HashSet<&str> = HashSet::new();
            let mut retained = Vec::new();
            let mut evicted = Vec::new();
            for &i in members {
                if seen_hosts.insert(documents[i].host.as_str()) {
                    retained.push(i);
                } else {
                    evicted.push(i);
                }
            }
            clusters.push(retained);
            for i in evicted {
                clusters.push(vec![i]);
            }
        }
    } else {
        for label in &order {
            clusters.push(groups[label].clone());
        }
    }

    let mut slots: Vec<Option<Document>> = documents.into_iter().map(Some).collect();
    let mut threads: Vec<Thread> = clusters
        .into_iter()
        .filter(|members| !members.is_empty())
        .map(|members| {
            let members: Vec<Document> = members
                .into_iter()
                .map(|i| slots[i].take().expect("each document joins one thread"))
                .collect();
            build_thread(members, rating, params.use_timestamp_moving)
        })
        .collect();

    threads.sort_by_key(|t| t.best_time);
    threads
}

fn build_thread(members: Vec<Document>, rating: &AgencyRating, timestamp_moving: bool) -> Thread {
    let title = elect_title(&members, rating);
    let category = elect_category(&members);
    let best_time = if timestamp_moving {
        members.iter().map(|d| d.fetch_time).max().unwrap_or(0)
    } else {
        median_fetch_time(&members)
    };

    Thread {
        title,
        category,
        language: members[0].language,
        best_time,
        documents: members,
    }
}

/// The title comes from the member with the highest agency rating; ties go
/// to the earliest fetch time, then the lexicographically smallest file id.
fn elect_title(members: &[Document], rating: &AgencyRating) -> String {
    members
        .iter()
        .min_by(|a, b| {
            rating
                .get(&b.host)
                .total_cmp(&rating.get(&a.host))
                .then_with(|| a.fetch_time.cmp(&b.fetch_time))
                .then_with(|| a.file_id.cmp(&b.file_id))
        })
        .map(|d| d.title.clone())
        .unwrap_or_default()
}

/// Majority vote over member categories. NotNews and Undefined abstain;
/// ties break by the fixed election order. A cluster with no votes at all
/// falls back to Other.
fn elect_category(members: &[Document]) -> Category {
    let mut votes: HashMap<Category, usize> = HashMap::new();
    for doc in members {
        if doc.is_news() {
            *votes.entry(doc.category).or_default() += 1;
        }
    }
    let mut elected = Category::Other;
    let mut elected_votes = 0;
    for category in Category::ELECTION_ORDER {
        let count = votes.get(&category).copied().unwrap_or(0);
        if count > elected_votes {
            elected_votes = count;
            elected = category;
        }
    }
    elected
}

/// Lower median of member fetch times. Members arrive sorted ascending.
fn median_fetch_time(members: &[Document]) -> u64 {
    members[(members.len() - 1) / 2].fetch_time
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsreel_common::{EmbeddingKey, Language};

    fn doc(file_id: &str, host: &str, fetch_time: u64, category: Category) -> Document {
        Document {
            file_id: file_id.to_string(),
            url: format!("https://{host}/{file_id}"),
            host: host.to_string(),
            title: format!("Title {file_id}"),
            pub_time: 0,
            fetch_time,
            ttl_secs: 3600,
            language: Language::En,
            category,
            embeddings: HashMap::from([(EmbeddingKey::Sentence, vec![1.0, 0.0])]),
        }
    }

    fn params(ban_same_site: bool) -> ClusteringParams {
        ClusteringParams {
            ban_threads_from_same_site: ban_same_site,
            ..ClusteringParams::default()
        }
    }

    #[test]
    fn same_site_ban_splits_later_duplicates() {
        let documents = vec![
            doc("x1", "x.com", 10, Category::Society),
            doc("x2", "x.com", 20, Category::Society),
            doc("x3", "x.com", 30, Category::Society),
            doc("y1", "y.com", 40, Category::Society),
        ];
        let labels = vec![0, 0, 0, 0];
        let threads = assemble_threads(documents, &labels, &AgencyRating::default(), &params(true));

        assert_eq!(threads.len(), 3);
        let sizes: Vec<usize> = threads.iter().map(|t| t.len()).collect();
        let mut hosts_of_pair: Vec<&str> = threads
            .iter()
            .find(|t| t.len() == 2)
            .unwrap()
            .documents
            .iter()
            .map(|d| d.host.as_str())
            .collect();
        hosts_of_pair.sort();
        assert_eq!(hosts_of_pair, vec!["x.com", "y.com"]);
        assert_eq!(sizes.iter().sum::<usize>(), 4, "no document is lost");
        // The retained x.com article is the earliest one.
        let pair = threads.iter().find(|t| t.len() == 2).unwrap();
        assert!(pair.documents.iter().any(|d| d.file_id == "x1"));
    }

    #[test]
    fn without_ban_the_cluster_stays_whole() {
        let documents = vec![
            doc("x1", "x.com", 10, Category::Society),
            doc("x2", "x.com", 20, Category::Society),
        ];
        let threads =
            assemble_threads(documents, &[0, 0], &AgencyRating::default(), &params(false));
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].len(), 2);
    }

    #[test]
    fn title_election_prefers_highest_rated_host() {
        let rating = AgencyRating::parse("big.com 5.0\nsmall.com 0.5").unwrap();
        let documents = vec![
            doc("early", "small.com", 10, Category::Society),
            doc("late", "big.com", 20, Category::Society),
        ];
        let threads = assemble_threads(documents, &[0, 0], &rating, &params(false));
        assert_eq!(threads[0].title, "Title late");
    }

    #[test]
    fn title_election_ties_go_to_earliest_then_file_id() {
        let rating = AgencyRating::default();
        let documents = vec![
            doc("b", "x.com", 10, Category::Society),
            doc("a", "y.com", 10, Category::Society),
            doc("c", "z.com", 5, Category::Society),
        ];
        let threads = assemble_threads(documents, &[0, 0, 0], &rating, &params(false));
        // Equal ratings: earliest fetch wins.
        assert_eq!(threads[0].title, "Title c");

        let documents = vec![
            doc("b", "x.com", 10, Category::Society),
            doc("a", "y.com", 10, Category::Society),
        ];
        let threads = assemble_threads(documents, &[0, 0], &rating, &params(false));
        // Equal ratings and fetch times: smaller file id wins.
        assert_eq!(threads[0].title, "Title a");
    }

    #[test]
    fn category_election_is_majority_with_abstentions() {
        let documents = vec![
            doc("1", "a.com", 10, Category::Economy),
            doc("2", "b.com", 20, Category::Economy),
            doc("3", "c.com", 30, Category::Sports),
            doc("4", "d.com", 40, Category::NotNews),
        ];
        let threads = assemble_threads(
            documents,
            &[0, 0, 0, 0],
            &AgencyRating::default(),
            &params(false),
        );
        assert_eq!(threads[0].category, Category::Economy);
    }

    #[test]
    fn category_tie_breaks_by_fixed_order() {
        let documents = vec![
            doc("1", "a.com", 10, Category::Sports),
            doc("2", "b.com", 20, Category::Society),
        ];
        let threads =
            assemble_threads(documents, &[0, 0], &AgencyRating::default(), &params(false));
        assert_eq!(threads[0].category, Category::Society);
    }

    #[test]
    fn best_time_is_median_or_max_with_timestamp_moving() {
        let documents = vec![
            doc("1", "a.com", 10, Category::Society),
            doc("2", "b.com", 20, Category::Society),
            doc("3", "c.com", 90, Category::Society),
        ];
        let threads = assemble_threads(
            documents.clone(),
            &[0, 0, 0],
            &AgencyRating::default(),
            &params(false),
        );
        assert_eq!(threads[0].best_time, 20);

        let moving = ClusteringParams {
            use_timestamp_moving: true,
            ban_threads_from_same_site: false,
            ..ClusteringParams::default()
        };
        let threads =
            assemble_threads(documents, &[0, 0, 0], &AgencyRating::default(), &moving);
        assert_eq!(threads[0].best_time, 90);
    }

    #[test]
    fn threads_are_sorted_by_best_time() {
        let documents = vec![
            doc("late", "a.com", 100, Category::Society),
            doc("early", "b.com", 10, Category::Society),
        ];
        let threads =
            assemble_threads(documents, &[0, 1], &AgencyRating::default(), &params(false));
        assert_eq!(threads[0].best_time, 10);
        assert_eq!(threads[1].best_time, 100);
    }
}
