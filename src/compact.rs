//! Requirement compaction
//!
//! Releases are scanned oldest to newest per requirement track. A maximal
//! run of consecutive releases with identical content becomes one
//! `ConditionedClause`; runs where the requirement is absent produce
//! nothing. The newest run is left open-ended on the assumption that future
//! releases keep the latest behavior.

use crate::domain::{
    ConditionedClause, Constraint, Content, ConversionWarning, DependencyKey, Release,
    ReleaseRange,
};
use pep440_rs::Version;
use std::collections::BTreeMap;

/// Per-release contents of one dependency key, aligned with the releases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementTrack {
    pub key: DependencyKey,
    pub entries: Vec<Option<Content>>,
}

/// Merges every constraint a single release declares for one key
///
/// Returns the content and whether the constraints conflict.
pub fn merge_constraints(constraints: Vec<Constraint>) -> (Content, bool) {
    let merged = constraints
        .iter()
        .fold(Constraint::any(), |acc, c| acc.intersect(c));
    if merged.is_satisfiable() {
        (Content::single(merged), false)
    } else {
        (Content::conflicting(constraints), true)
    }
}

/// Groups the requirements of every release into tracks
pub fn build_tracks(
    package: &str,
    releases: &[Release],
    warnings: &mut Vec<ConversionWarning>,
) -> Vec<RequirementTrack> {
    let mut tracks: BTreeMap<DependencyKey, Vec<Option<Content>>> = BTreeMap::new();

    for (index, release) in releases.iter().enumerate() {
        let mut grouped: BTreeMap<DependencyKey, Vec<Constraint>> = BTreeMap::new();
        for requirement in &release.requirements {
            grouped
                .entry(requirement.key())
                .or_default()
                .push(requirement.constraint.clone());
        }

        for (key, constraints) in grouped {
            let (content, conflicted) = merge_constraints(constraints);
            if conflicted {
                let rendered: Vec<String> =
                    content.constraints().iter().map(|c| c.to_string()).collect();
                warnings.push(ConversionWarning::UnsatisfiableConstraint {
                    package: package.to_string(),
                    version: release.version.to_string(),
                    dependency: key.name.clone(),
                    constraints: rendered.join(" and "),
                });
            }
            let entries = tracks
                .entry(key)
                .or_insert_with(|| vec![None; releases.len()]);
            entries[index] = Some(content);
        }
    }

    tracks
        .into_iter()
        .map(|(key, entries)| RequirementTrack { key, entries })
        .collect()
}

/// Compacts one track into maximal clauses
///
/// `versions` are the releases' versions, aligned with `track.entries`.
pub fn compact_track(track: &RequirementTrack, versions: &[Version]) -> Vec<ConditionedClause> {
    let mut clauses = Vec::new();
    let mut current: Option<&Content> = None;
    let mut run_start = 0;

    for (index, entry) in track.entries.iter().enumerate() {
        let entry = entry.as_ref();
        if index > 0 && entry != current {
            if let Some(content) = current {
                clauses.push(ConditionedClause {
                    key: track.key.clone(),
                    range: ReleaseRange {
                        low: versions[run_start].clone(),
                        high: Some(versions[index - 1].clone()),
                    },
                    content: content.clone(),
                });
            }
            run_start = index;
        }
        current = entry;
    }

    if let Some(content) = current {
        clauses.push(ConditionedClause {
            key: track.key.clone(),
            range: ReleaseRange {
                low: versions[run_start].clone(),
                high: None,
            },
            content: content.clone(),
        });
    }

    clauses
}

fn ranges_overlap(a: &ReleaseRange, b: &ReleaseRange) -> bool {
    let below = |low: &Version, high: &Option<Version>| high.as_ref().map_or(true, |h| low <= h);
    below(&a.low, &b.high) && below(&b.low, &a.high)
}

/// Index pairs of clauses on the same dependency that cannot hold together
///
/// Two clauses clash when their release ranges overlap, their conditions
/// can hold at once and their constraints admit no common version. Clauses
/// whose own content already conflicts are reported by `build_tracks`.
pub fn cross_conflicts(clauses: &[ConditionedClause]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for (i, a) in clauses.iter().enumerate() {
        if a.content.is_conflicting() {
            continue;
        }
        for (j, b) in clauses.iter().enumerate().skip(i + 1) {
            if b.content.is_conflicting()
                || a.key.name != b.key.name
                || a.key == b.key
                || !ranges_overlap(&a.range, &b.range)
                || a.key.condition.and(&b.key.condition).is_none()
            {
                continue;
            }
            let clash = a.content.constraints().iter().any(|x| {
                b.content.constraints().iter().any(|y| x.is_disjoint(y))
            });
            if clash {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Constraint text with the circumstances it applies in
fn describe(clause: &ConditionedClause) -> String {
    let constraints: Vec<String> = clause
        .content
        .constraints()
        .iter()
        .map(|c| c.to_string())
        .collect();
    let mut text = match constraints.join(",") {
        empty if empty.is_empty() => "any version".to_string(),
        joined => joined,
    };
    let mut when: Vec<String> = clause.key.extra.iter().map(|e| format!("+{}", e)).collect();
    when.extend(clause.key.condition.spack_parts());
    if !when.is_empty() {
        text.push_str(" when ");
        text.push_str(&when.join(" "));
    }
    text
}

/// Compacts every requirement of a package's releases (oldest first)
pub fn compact(
    package: &str,
    releases: &[Release],
    warnings: &mut Vec<ConversionWarning>,
) -> Vec<ConditionedClause> {
    let versions: Vec<Version> = releases.iter().map(|r| r.version.clone()).collect();
    let clauses: Vec<ConditionedClause> = build_tracks(package, releases, warnings)
        .iter()
        .flat_map(|track| compact_track(track, &versions))
        .collect();

    for (i, j) in cross_conflicts(&clauses) {
        let (a, b) = (&clauses[i], &clauses[j]);
        let first = a.range.low.clone().max(b.range.low.clone());
        warnings.push(ConversionWarning::UnsatisfiableConstraint {
            package: package.to_string(),
            version: first.to_string(),
            dependency: a.key.name.clone(),
            constraints: format!("{} and {}", describe(a), describe(b)),
        });
    }
    clauses
}

/// Reconstructs the per-release contents of one key from its clauses
pub fn expand(
    clauses: &[ConditionedClause],
    key: &DependencyKey,
    versions: &[Version],
) -> Vec<Option<Content>> {
    versions
        .iter()
        .map(|version| {
            clauses
                .iter()
                .find(|c| &c.key == key && c.range.contains(version))
                .map(|c| c.content.clone())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_version, Condition, DependencyKind, Platform, Requirement};

    fn v(s: &str) -> Version {
        parse_version(s).unwrap()
    }

    fn release(version: &str, requirements: &[(&str, &str)]) -> Release {
        let mut release = Release::new(v(version));
        release.requirements = requirements
            .iter()
            .map(|(name, constraint)| {
                Requirement::new(*name, DependencyKind::BuildRun)
                    .with_constraint(Constraint::parse(constraint).unwrap())
            })
            .collect();
        release
    }

    fn c(s: &str) -> Constraint {
        Constraint::parse(s).unwrap()
    }

    #[test]
    fn test_change_of_constraint_gives_two_clauses() {
        let releases = vec![
            release("1.0", &[("q", ">=1,<2")]),
            release("1.1", &[("q", ">=1,<2")]),
            release("1.2", &[("q", ">=2")]),
        ];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].range.low, v("1.0"));
        assert_eq!(clauses[0].range.high, Some(v("1.1")));
        assert_eq!(clauses[0].content, Content::single(c(">=1,<2")));
        assert_eq!(clauses[1].range.low, v("1.2"));
        assert_eq!(clauses[1].range.high, None);
        assert_eq!(clauses[1].content, Content::single(c(">=2")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_absence_splits_runs() {
        let releases = vec![
            release("1.0", &[("r", ">=1")]),
            release("2.0", &[]),
            release("3.0", &[("r", ">=1")]),
        ];
        let clauses = compact("p", &releases, &mut Vec::new());

        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].range.low, v("1.0"));
        assert_eq!(clauses[0].range.high, Some(v("1.0")));
        assert_eq!(clauses[1].range.low, v("3.0"));
        assert!(clauses[1].range.is_open());
    }

    #[test]
    fn test_dropped_dependency_is_closed() {
        let releases = vec![
            release("1.0", &[("six", "")]),
            release("1.1", &[("six", "")]),
            release("2.0", &[]),
        ];
        let clauses = compact("p", &releases, &mut Vec::new());
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].range.high, Some(v("1.1")));
    }

    #[test]
    fn test_duplicates_in_release_are_intersected() {
        let releases = vec![release("1.0", &[("q", ">=1"), ("q", "<2")])];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].content, Content::single(c(">=1,<2")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_conflicting_duplicates_are_kept_and_warned() {
        let releases = vec![release("1.0", &[("q", ">=2"), ("q", "<1")])];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses.len(), 1);
        assert!(clauses[0].content.is_conflicting());
        assert_eq!(clauses[0].content.constraints().len(), 2);
        assert!(matches!(
            warnings[0],
            ConversionWarning::UnsatisfiableConstraint { .. }
        ));
    }

    #[test]
    fn test_exact_bounds_conflict_in_one_release() {
        for (low, high) in [(">=1.5", "<=1"), (">1.0", "<=1.0")] {
            let releases = vec![release("1.0", &[("q", low), ("q", high)])];
            let mut warnings = Vec::new();
            let clauses = compact("p", &releases, &mut warnings);
            assert!(clauses[0].content.is_conflicting(), "{} and {}", low, high);
            assert_eq!(warnings.len(), 1);
        }
    }

    #[test]
    fn test_touching_bounds_do_not_conflict() {
        let releases = vec![release("1.0", &[("q", ">=1.0"), ("q", "<=1.0")])];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses[0].content, Content::single(c(">=1.0,<=1.0")));
        assert!(warnings.is_empty());
    }

    fn with_condition(mut release: Release, index: usize, condition: Condition) -> Release {
        release.requirements[index] = release.requirements[index].clone().with_condition(condition);
        release
    }

    #[test]
    fn test_clash_across_conditions_is_warned() {
        let old_python = Condition::python(c("<3.8"));
        let releases = vec![
            release("1.0", &[("q", ">=1")]),
            with_condition(release("2.0", &[("q", ">=2"), ("q", "<1")]), 1, old_python),
        ];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);

        assert_eq!(clauses.len(), 3);
        assert_eq!(cross_conflicts(&clauses).len(), 1);
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            ConversionWarning::UnsatisfiableConstraint {
                version,
                dependency,
                constraints,
                ..
            } => {
                assert_eq!(version, "2.0");
                assert_eq!(dependency, "q");
                assert!(constraints.contains(">=2"));
                assert!(constraints.contains("<1 when ^python@:3.7"));
            }
            other => panic!("unexpected warning {:?}", other),
        }
    }

    #[test]
    fn test_exclusive_conditions_do_not_clash() {
        let releases = vec![with_condition(
            with_condition(
                release("1.0", &[("q", ">=2"), ("q", "<1")]),
                0,
                Condition::platform(Platform::Linux),
            ),
            1,
            Condition::platform(Platform::Windows),
        )];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses.len(), 2);
        assert!(cross_conflicts(&clauses).is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_clash_needs_overlapping_releases() {
        let releases = vec![
            with_condition(
                release("1.0", &[("q", "<1")]),
                0,
                Condition::python(c("<3.8")),
            ),
            release("2.0", &[("q", ">=2")]),
        ];
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_compatible_overlap_across_keys_is_quiet() {
        let mut releases = vec![release("1.0", &[("q", ">=1"), ("q", "<3")])];
        releases[0].requirements[1] = releases[0].requirements[1].clone().with_extra("fast");
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(clauses.len(), 2);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_different_extras_can_clash() {
        let mut releases = vec![release("1.0", &[("q", ">=2"), ("q", "<1")])];
        releases[0].requirements[1] = releases[0].requirements[1].clone().with_extra("legacy");
        let mut warnings = Vec::new();
        let clauses = compact("p", &releases, &mut warnings);
        assert_eq!(cross_conflicts(&clauses), vec![(0, 1)]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_extra_gated_track_is_separate() {
        let mut gated = release("1.0", &[("pysocks", ">=1")]);
        gated.requirements[0] = gated.requirements[0].clone().with_extra("socks");
        let plain = release("1.1", &[("pysocks", ">=1")]);
        let clauses = compact("p", &[gated, plain], &mut Vec::new());
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].key.extra, None);
        assert_eq!(clauses[1].key.extra.as_deref(), Some("socks"));
        assert_eq!(clauses[1].range.high, Some(v("1.0")));
    }

    #[test]
    fn test_expand_round_trip() {
        let releases = vec![
            release("1.0", &[("q", ">=1")]),
            release("1.1", &[]),
            release("1.2", &[("q", ">=1")]),
            release("1.3", &[("q", ">=2")]),
        ];
        let versions: Vec<Version> = releases.iter().map(|r| r.version.clone()).collect();
        let mut warnings = Vec::new();
        let tracks = build_tracks("p", &releases, &mut warnings);
        let clauses = compact("p", &releases, &mut warnings);
        for track in &tracks {
            assert_eq!(expand(&clauses, &track.key, &versions), track.entries);
        }
    }

    #[test]
    fn test_empty_releases() {
        assert!(compact("p", &[], &mut Vec::new()).is_empty());
    }
}
