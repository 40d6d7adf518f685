use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::hash::Hash;

use crate::constants::TIMESTAMP_FORMAT;

/// Keep the first record seen for each key, preserving scan order.
///
/// Callers scan newest-first, so the retained record is the most recent one.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Merge the output of several sources by ascending time.
///
/// Falls back to plain source order when any record's time is not in the
/// canonical format.
pub fn merge_by_time<T, F>(sources: Vec<Vec<T>>, time: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let mut merged: Vec<T> = sources.into_iter().flatten().collect();
    let parseable = merged
        .iter()
        .all(|r| NaiveDateTime::parse_from_str(time(r), TIMESTAMP_FORMAT).is_ok());
    if parseable {
        // canonical text sorts chronologically; sort_by is stable
        merged.sort_by(|a, b| time(a).cmp(time(b)));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_occurrence_wins() {
        let rows = vec![("a", 3), ("b", 2), ("a", 1)];
        let kept = dedup_by_key(rows, |r| r.0);
        assert_eq!(kept, vec![("a", 3), ("b", 2)]);
    }

    #[test]
    fn test_merge_orders_by_time() {
        let first = vec!["2024-01-02 00:00:00", "2024-01-04 00:00:00"];
        let second = vec!["2024-01-01 00:00:00", "2024-01-03 00:00:00"];
        let merged = merge_by_time(vec![first, second], |s| s);
        assert_eq!(
            merged,
            vec![
                "2024-01-01 00:00:00",
                "2024-01-02 00:00:00",
                "2024-01-03 00:00:00",
                "2024-01-04 00:00:00"
            ]
        );
    }

    #[test]
    fn test_merge_keeps_source_order_when_unparseable() {
        let merged = merge_by_time(vec![vec!["b", "a"], vec!["2024-01-01 00:00:00"]], |s| s);
        assert_eq!(merged, vec!["b", "a", "2024-01-01 00:00:00"]);
    }

    proptest! {
        #[test]
        fn prop_dedup_is_idempotent(items in proptest::collection::vec((0u8..5, 0u8..5), 0..40)) {
            let once = dedup_by_key(items.clone(), |r| *r);
            let twice = dedup_by_key(once.clone(), |r| *r);
            prop_assert_eq!(&once, &twice);

            let doubled: Vec<_> = items.iter().chain(items.iter()).cloned().collect();
            prop_assert_eq!(dedup_by_key(doubled, |r| *r), once);
        }
    }
}
