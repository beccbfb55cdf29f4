use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Vote;

/// Per-option tallies for a poll's current vote set. Derived on demand,
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    /// (label, count) pairs in the poll's option order.
    counts: Vec<(String, u64)>,
    total_votes: u64,
}

impl ResultSummary {
    pub fn count(&self, option: &str) -> u64 {
        self.counts
            .iter()
            .find(|(label, _)| label == option)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Total number of recorded votes. This is the raw vote-list length, so
    /// it includes votes whose selected option is no longer in the poll's
    /// option list, if any such rows exist.
    pub fn total_votes(&self) -> u64 {
        self.total_votes
    }

    /// Share of the total for one option, in percent. Unrounded; callers
    /// round for display. An empty poll yields 0 for every option.
    pub fn percentage(&self, option: &str) -> f64 {
        if self.total_votes == 0 {
            return 0.0;
        }
        self.count(option) as f64 / self.total_votes as f64 * 100.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(label, n)| (label.as_str(), *n))
    }
}

/// Tally `votes` against the poll's option labels. Counting is exact,
/// case-sensitive string equality; an option nobody picked counts 0.
pub fn compute_results(votes: &[Vote], options: &[String]) -> ResultSummary {
    let counts = options
        .iter()
        .map(|option| {
            let n = votes
                .iter()
                .filter(|v| v.selected_option == *option)
                .count() as u64;
            (option.clone(), n)
        })
        .collect();

    ResultSummary {
        counts,
        total_votes: votes.len() as u64,
    }
}

/// Whether voting is permitted at `now`. Both bounds are inclusive, so a
/// zero-length window is active at exactly its single instant, and an
/// inverted window (start after end) is never active.
pub fn is_poll_active(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start <= now && now <= end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn vote_for(option: &str) -> Vote {
        Vote::new("poll".to_string(), "user".to_string(), option.to_string())
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tallies_counts_in_option_order() {
        let votes = vec![vote_for("A"), vote_for("A"), vote_for("B")];
        let summary = compute_results(&votes, &labels(&["A", "B", "C"]));

        let collected: Vec<(&str, u64)> = summary.iter().collect();
        assert_eq!(collected, vec![("A", 2), ("B", 1), ("C", 0)]);
        assert_eq!(summary.total_votes(), 3);
        assert!((summary.percentage("A") - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.percentage("C"), 0.0);
    }

    #[test]
    fn empty_vote_list_yields_zero_everything() {
        let summary = compute_results(&[], &labels(&["A", "B"]));
        assert_eq!(summary.total_votes(), 0);
        assert_eq!(summary.count("A"), 0);
        assert_eq!(summary.percentage("A"), 0.0);
        assert_eq!(summary.percentage("B"), 0.0);
    }

    #[test]
    fn empty_option_list_still_counts_total() {
        let votes = vec![vote_for("A"), vote_for("B")];
        let summary = compute_results(&votes, &[]);
        assert_eq!(summary.iter().count(), 0);
        assert_eq!(summary.total_votes(), 2);
    }

    #[test]
    fn stray_votes_count_toward_total_but_not_options() {
        // A vote for a label outside the option list still raises the total,
        // so in-list percentages no longer sum to 100.
        let votes = vec![vote_for("A"), vote_for("Removed")];
        let summary = compute_results(&votes, &labels(&["A", "B"]));
        assert_eq!(summary.count("A"), 1);
        assert_eq!(summary.count("Removed"), 0);
        assert_eq!(summary.total_votes(), 2);
        assert_eq!(summary.percentage("A"), 50.0);
    }

    #[test]
    fn matching_is_case_sensitive() {
        let votes = vec![vote_for("a")];
        let summary = compute_results(&votes, &labels(&["A"]));
        assert_eq!(summary.count("A"), 0);
        assert_eq!(summary.total_votes(), 1);
    }

    #[test]
    fn absent_option_is_zero_not_an_error() {
        let summary = compute_results(&[vote_for("A")], &labels(&["A"]));
        assert_eq!(summary.count("nope"), 0);
        assert_eq!(summary.percentage("nope"), 0.0);
    }

    #[test]
    fn percentages_split_two_way() {
        for (a, b) in [(1u64, 0u64), (0, 1), (3, 1), (7, 7)] {
            let mut votes = Vec::new();
            votes.extend((0..a).map(|_| vote_for("A")));
            votes.extend((0..b).map(|_| vote_for("B")));
            let summary = compute_results(&votes, &labels(&["A", "B"]));

            assert_eq!(summary.total_votes(), a + b);
            let expected = a as f64 / (a + b) as f64 * 100.0;
            assert!((summary.percentage("A") - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn window_is_inclusive_on_both_bounds() {
        let now = Utc::now();
        let second = Duration::seconds(1);

        assert!(is_poll_active(now - second, now + second, now));
        assert!(!is_poll_active(now + second, now + second * 2, now));
        assert!(!is_poll_active(now - second * 2, now - second, now));

        // Zero-length window: active at exactly its instant, nowhere else.
        assert!(is_poll_active(now, now, now));
        assert!(!is_poll_active(now, now, now + Duration::microseconds(1)));

        // Inverted window is never active.
        assert!(!is_poll_active(now + second, now - second, now));
    }
}
