use crate::domain::model::{JobPosting, WatchList};

/// Keep the postings that share at least one skill tag with `watch_list`, in input order.
pub fn filter_by_interest(postings: Vec<JobPosting>, watch_list: &WatchList) -> Vec<JobPosting> {
    postings
        .into_iter()
        .filter(|posting| watch_list.matches(&posting.skills))
        .collect()
}
