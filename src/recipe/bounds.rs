//! Release range bounds for `when=` conditions
//!
//! A clause covers a contiguous run of the package's own releases. The run
//! is widened to the most general Spack range that still excludes the
//! neighbouring known releases, so `1.0..=1.1` followed by `1.2` renders
//! as `:1.1`, and `1.0` followed by `2.0` renders as `:1`.

use crate::domain::{join_parts, release_parts, spack_version, ReleaseRange};
use pep440_rs::Version;

/// Most general upper bound that admits `curr` but not `next` (`curr < next`)
pub fn best_upper_bound(curr: &Version, next: &Version) -> String {
    let curr_parts = release_parts(curr);
    let next_parts = release_parts(next);
    let common = curr_parts.len().min(next_parts.len());
    let i = (0..common)
        .find(|&i| curr_parts[i] != next_parts[i])
        .unwrap_or(common);

    if i == curr_parts.len() && curr_parts.len() < next_parts.len() {
        // `3.4` before `3.4.5`: pad so the bound stops short of the sub-release
        let mut padded = curr_parts.clone();
        padded.resize(next_parts.len(), 0);
        return join_parts(&padded);
    }
    if i == common {
        return spack_version(curr);
    }
    join_parts(&curr_parts[..=i])
}

/// Most general lower bound that admits `curr` but not `prev` (`prev < curr`)
pub fn best_lower_bound(prev: &Version, curr: &Version) -> String {
    let prev_parts = release_parts(prev);
    let curr_parts = release_parts(curr);
    if prev_parts == curr_parts {
        return spack_version(curr);
    }

    let common = prev_parts.len().min(curr_parts.len());
    if let Some(i) = (0..common).find(|&i| prev_parts[i] != curr_parts[i]) {
        return join_parts(&curr_parts[..=i]);
    }

    // same prefix, curr is longer: cut after the first non-zero extra segment
    match (common..curr_parts.len()).find(|&i| curr_parts[i] != 0) {
        Some(i) => join_parts(&curr_parts[..=i]),
        None => spack_version(curr),
    }
}

/// Renders a release range against every known release, oldest first
///
/// Returns None when the range covers everything (no `@` part needed).
pub fn release_range(range: &ReleaseRange, known: &[Version]) -> Option<String> {
    let low = known
        .iter()
        .rev()
        .find(|v| **v < range.low)
        .map(|prev| best_lower_bound(prev, &range.low));

    let high = range.high.as_ref().and_then(|high| {
        known
            .iter()
            .find(|v| *v > high)
            .map(|next| best_upper_bound(high, next))
    });

    match (low, high) {
        (None, None) => None,
        (Some(low), None) => Some(format!("{}:", low)),
        (None, Some(high)) => Some(format!(":{}", high)),
        (Some(low), Some(high)) if low == high => Some(low),
        (Some(low), Some(high)) => Some(format!("{}:{}", low, high)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{compare_to_prefix, parse_version};
    use std::cmp::Ordering;

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn versions(list: &[&str]) -> Vec<Version> {
        list.iter().map(|s| v(s)).collect()
    }

    #[test]
    fn test_upper_bound() {
        assert_eq!(best_upper_bound(&v("1.1"), &v("1.2")), "1.1");
        assert_eq!(best_upper_bound(&v("1.1"), &v("2.0")), "1");
        assert_eq!(best_upper_bound(&v("1.1.3"), &v("1.2.0")), "1.1");
        assert_eq!(best_upper_bound(&v("3.4"), &v("3.4.5")), "3.4.0");
        assert_eq!(best_upper_bound(&v("1.0rc1"), &v("1.0")), "1.0rc1");
    }

    #[test]
    fn test_lower_bound() {
        assert_eq!(best_lower_bound(&v("1.1"), &v("1.2")), "1.2");
        assert_eq!(best_lower_bound(&v("1.9"), &v("2.0")), "2");
        assert_eq!(best_lower_bound(&v("2.0"), &v("2.0.1")), "2.0.1");
        assert_eq!(best_lower_bound(&v("2.0"), &v("2.1.0")), "2.1");
        assert_eq!(best_lower_bound(&v("1.0rc1"), &v("1.0")), "1.0");
    }

    #[test]
    fn test_release_range_change_of_constraint() {
        let known = versions(&["1.0", "1.1", "1.2"]);
        let first = ReleaseRange {
            low: v("1.0"),
            high: Some(v("1.1")),
        };
        let second = ReleaseRange {
            low: v("1.2"),
            high: None,
        };
        assert_eq!(release_range(&first, &known).as_deref(), Some(":1.1"));
        assert_eq!(release_range(&second, &known).as_deref(), Some("1.2:"));
    }

    #[test]
    fn test_release_range_gap() {
        let known = versions(&["1.0", "2.0", "3.0"]);
        let before = ReleaseRange {
            low: v("1.0"),
            high: Some(v("1.0")),
        };
        let after = ReleaseRange {
            low: v("3.0"),
            high: None,
        };
        assert_eq!(release_range(&before, &known).as_deref(), Some(":1"));
        assert_eq!(release_range(&after, &known).as_deref(), Some("3:"));
    }

    #[test]
    fn test_release_range_everything() {
        let known = versions(&["1.0", "2.0"]);
        let all = ReleaseRange {
            low: v("1.0"),
            high: None,
        };
        assert_eq!(release_range(&all, &known), None);
    }

    #[test]
    fn test_release_range_single_release_collapses() {
        let known = versions(&["1.0", "1.1", "1.2"]);
        let middle = ReleaseRange {
            low: v("1.1"),
            high: Some(v("1.1")),
        };
        assert_eq!(release_range(&middle, &known).as_deref(), Some("1.1"));
    }

    #[test]
    fn test_bounds_never_capture_neighbours() {
        let known = versions(&["0.9", "1.0", "1.0.1", "1.1", "1.10", "2.0", "2.0.0.1", "3"]);
        for pair in known.windows(2) {
            let (prev, curr) = (&pair[0], &pair[1]);
            let lower = parts(&best_lower_bound(prev, curr));
            let upper = parts(&best_upper_bound(prev, curr));
            assert_ne!(compare_to_prefix(curr, &lower), Ordering::Less);
            assert_eq!(compare_to_prefix(prev, &lower), Ordering::Less);
            assert_ne!(compare_to_prefix(prev, &upper), Ordering::Greater);
            assert_eq!(compare_to_prefix(curr, &upper), Ordering::Greater);
        }
    }

    fn parts(bound: &str) -> Vec<u64> {
        bound.split('.').map(|p| p.parse().unwrap()).collect()
    }
}
