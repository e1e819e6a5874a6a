//! Fuzzy ranking of candidate paths.
//!
//! A query matches a string when its characters appear in order in that
//! string, ignoring case. The score of a match is the Levenshtein distance
//! between the two strings as written, so `0` is an exact hit, a
//! differently-cased hit costs one per changed character and longer detours
//! cost more.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Deref;

use crate::path::KEY_SEPARATOR;

/// Candidates scoring above this distance are not considered matches.
pub const FUZZY_DISTANCE_THRESHOLD: usize = 10;

/// A matched path and how far it is from the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rank {
    pub target: String,
    pub distance: usize,
}

impl Rank {
    pub fn new(target: impl Into<String>, distance: usize) -> Self {
        Self {
            target: target.into(),
            distance,
        }
    }

    /// An exact match.
    pub fn exact(target: impl Into<String>) -> Self {
        Self::new(target, 0)
    }
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.target.cmp(&other.target))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ranks sorted by ascending distance, then target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedRanks(Vec<Rank>);

impl OrderedRanks {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn single(rank: Rank) -> Self {
        Self(vec![rank])
    }

    pub fn into_vec(self) -> Vec<Rank> {
        self.0
    }
}

impl From<Vec<Rank>> for OrderedRanks {
    fn from(mut ranks: Vec<Rank>) -> Self {
        ranks.sort_unstable();
        Self(ranks)
    }
}

impl FromIterator<Rank> for OrderedRanks {
    fn from_iter<I: IntoIterator<Item = Rank>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl Deref for OrderedRanks {
    type Target = [Rank];

    fn deref(&self) -> &[Rank] {
        &self.0
    }
}

impl IntoIterator for OrderedRanks {
    type Item = Rank;
    type IntoIter = std::vec::IntoIter<Rank>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a OrderedRanks {
    type Item = &'a Rank;
    type IntoIter = std::slice::Iter<'a, Rank>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Distance between `query` and `candidate`, or `None` if the query is not a
/// case-insensitive subsequence of the candidate.
pub fn fuzzy_distance(query: &str, candidate: &str) -> Option<usize> {
    let folded_query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
    let folded_candidate: Vec<char> = candidate.chars().flat_map(char::to_lowercase).collect();
    if !is_subsequence(&folded_query, &folded_candidate) {
        return None;
    }

    let query: Vec<char> = query.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();
    Some(levenshtein(&query, &candidate))
}

/// Best distance of `query` against a candidate path: each component and the
/// whole path are scored, the minimum wins.
pub fn path_distance(query: &str, path: &str) -> Option<usize> {
    path.split(KEY_SEPARATOR)
        .chain(std::iter::once(path))
        .filter_map(|representation| fuzzy_distance(query, representation))
        .min()
}

/// Ranks `candidates` against `query`.
///
/// Candidates above [`FUZZY_DISTANCE_THRESHOLD`] are dropped, duplicates keep
/// their best distance, and at most `max_results` ranks are returned.
pub fn rank_candidates<'a, I>(query: &str, candidates: I, max_results: usize) -> OrderedRanks
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates {
        let Some(distance) = path_distance(query, candidate) else {
            continue;
        };
        if distance > FUZZY_DISTANCE_THRESHOLD {
            continue;
        }
        best.entry(candidate)
            .and_modify(|current| *current = (*current).min(distance))
            .or_insert(distance);
    }

    let mut ranks: Vec<Rank> = best
        .into_iter()
        .map(|(target, distance)| Rank::new(target, distance))
        .collect();
    ranks.sort_unstable();
    ranks.truncate(max_results);
    OrderedRanks(ranks)
}

fn is_subsequence(needle: &[char], haystack: &[char]) -> bool {
    let mut remaining = haystack.iter();
    needle
        .iter()
        .all(|wanted| remaining.any(|candidate| candidate == wanted))
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
