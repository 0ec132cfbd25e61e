/// Fuzzy ranking of discovered directories against the filter query.
///
/// The session only depends on the [`Ranker`] trait; any scoring scheme can be
/// injected. [`SubsequenceRanker`] is the built-in one.
use rayon::prelude::*;
use std::path::Path;

/// Score given to every candidate when the query is empty.
pub const EMPTY_QUERY_SCORE: u32 = 100;

/// Candidate sets at least this large are scored on the rayon pool.
const PARALLEL_THRESHOLD: usize = 4_096;

/// One candidate that matched the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoredMatch {
    /// Position of the candidate in the slice passed to [`Ranker::rank`].
    pub index: usize,
    pub score: u32,
    /// Char positions in the candidate that matched query characters.
    pub matched_indexes: Vec<usize>,
}

/// Orders candidates by how well they match a query.
///
/// Implementations must be pure: the same inputs always give the same
/// output. Results are sorted best first; ties keep discovery order.
pub trait Ranker: Send + Sync {
    fn rank(&self, query: &str, candidates: &[String]) -> Vec<ScoredMatch>;
}

/// Case-insensitive subsequence matcher tuned for paths.
///
/// Every query character must appear in the candidate, in order. A match
/// that fits entirely inside the last path component is preferred over one
/// that spans parent directories. Scores reward consecutive runs, hits on
/// word boundaries and hits at the start of the last component; shorter
/// paths win ties.
#[derive(Clone, Debug)]
pub struct SubsequenceRanker {
    parallel_threshold: usize,
}

impl Default for SubsequenceRanker {
    fn default() -> Self {
        Self {
            parallel_threshold: PARALLEL_THRESHOLD,
        }
    }
}

impl SubsequenceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the candidate count above which scoring runs in parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

impl Ranker for SubsequenceRanker {
    fn rank(&self, query: &str, candidates: &[String]) -> Vec<ScoredMatch> {
        if query.is_empty() {
            return (0..candidates.len())
                .map(|index| ScoredMatch {
                    index,
                    score: EMPTY_QUERY_SCORE,
                    matched_indexes: Vec::new(),
                })
                .collect();
        }

        let query: Vec<char> = query.chars().flat_map(char::to_lowercase).collect();
        let score = |(index, candidate): (usize, &String)| {
            score_candidate(&query, candidate).map(|(score, matched_indexes)| ScoredMatch {
                index,
                score,
                matched_indexes,
            })
        };

        let mut matches: Vec<ScoredMatch> = if candidates.len() >= self.parallel_threshold {
            candidates.par_iter().enumerate().filter_map(score).collect()
        } else {
            candidates.iter().enumerate().filter_map(score).collect()
        };
        matches.sort_unstable_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
        matches
    }
}

fn score_candidate(query: &[char], candidate: &str) -> Option<(u32, Vec<usize>)> {
    let chars: Vec<char> = candidate.chars().collect();
    let base = basename_start(&chars);

    let (positions, in_basename) = match find_positions(query, &chars[base..]) {
        Some(mut positions) => {
            positions.iter_mut().for_each(|p| *p += base);
            (positions, true)
        }
        None => (find_positions(query, &chars)?, false),
    };

    let mut score: u32 = 100;

    // Runs of two or more adjacent hits.
    let mut run = 1u32;
    for pair in positions.windows(2) {
        if pair[1] == pair[0] + 1 {
            run += 1;
        } else {
            if run >= 2 {
                score += run * 10;
            }
            run = 1;
        }
    }
    if run >= 2 {
        score += run * 10;
    }

    let boundary_hits = positions
        .iter()
        .filter(|&&p| p == 0 || is_word_separator(chars[p - 1]))
        .count() as u32;
    score += boundary_hits * 15;

    if in_basename {
        score += 50;
        let prefix = positions
            .iter()
            .enumerate()
            .take_while(|(i, &p)| p == base + i)
            .count() as u32;
        score += prefix * 25;
    }

    score += 255 - chars.len().min(255) as u32;
    Some((score, positions))
}

/// Leftmost in-order positions of `query` in `haystack`, compared
/// case-insensitively.
fn find_positions(query: &[char], haystack: &[char]) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(query.len());
    let mut from = 0;
    for &q in query {
        let offset = haystack[from..].iter().position(|&c| eq_ignore_case(c, q))?;
        positions.push(from + offset);
        from += offset + 1;
    }
    Some(positions)
}

fn eq_ignore_case(c: char, lowered: char) -> bool {
    c == lowered || c.to_lowercase().eq(std::iter::once(lowered))
}

fn basename_start(chars: &[char]) -> usize {
    chars
        .iter()
        .rposition(|&c| std::path::is_separator(c))
        .map_or(0, |i| i + 1)
}

fn is_word_separator(c: char) -> bool {
    std::path::is_separator(c) || matches!(c, '-' | '_' | '.' | ' ')
}

/// The user's home directory, from `HOME` (or `USERPROFILE` on Windows).
pub fn home_dir() -> Option<std::path::PathBuf> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(std::path::PathBuf::from)
}

/// Render `path` for display, abbreviating `home` to `~`.
pub fn display_path(path: &Path, home: Option<&Path>) -> String {
    if let Some(home) = home {
        if let Ok(rest) = path.strip_prefix(home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return Path::new("~").join(rest).to_string_lossy().into_owned();
        }
    }
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn ranked_paths(ranker: &SubsequenceRanker, query: &str, paths: &[&str]) -> Vec<String> {
        let cands = candidates(paths);
        ranker
            .rank(query, &cands)
            .into_iter()
            .map(|m| cands[m.index].clone())
            .collect()
    }

    #[test]
    fn empty_query_keeps_discovery_order() {
        let cands = candidates(&["/b", "/a", "/c"]);
        let matches = SubsequenceRanker::new().rank("", &cands);
        assert_eq!(
            matches.iter().map(|m| m.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(matches.iter().all(|m| m.score == EMPTY_QUERY_SCORE));
    }

    #[test]
    fn non_matching_candidates_are_dropped() {
        let paths = ranked_paths(&SubsequenceRanker::new(), "xyz", &["/src", "/docs"]);
        assert!(paths.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let paths = ranked_paths(&SubsequenceRanker::new(), "DOC", &["/home/docs", "/src"]);
        assert_eq!(paths, vec!["/home/docs".to_string()]);
    }

    #[test]
    fn basename_match_beats_spread_match() {
        let paths = ranked_paths(
            &SubsequenceRanker::new(),
            "src",
            &["/home/s/r/c", "/home/proj/src"],
        );
        assert_eq!(paths[0], "/home/proj/src");
    }

    #[test]
    fn consecutive_match_beats_scattered_match() {
        let paths = ranked_paths(
            &SubsequenceRanker::new(),
            "app",
            &["/x/xaxpxp", "/x/xxapp"],
        );
        assert_eq!(paths[0], "/x/xxapp");
    }

    #[test]
    fn matched_indexes_point_at_query_chars() {
        let cands = candidates(&["/srv/web"]);
        let matches = SubsequenceRanker::new().rank("wb", &cands);
        assert_eq!(matches.len(), 1);
        let chars: Vec<char> = cands[0].chars().collect();
        let hit: String = matches[0].matched_indexes.iter().map(|&i| chars[i]).collect();
        assert_eq!(hit, "wb");
    }

    #[test]
    fn ties_keep_discovery_order() {
        let paths = ranked_paths(&SubsequenceRanker::new(), "a", &["/x/a", "/y/a", "/z/a"]);
        assert_eq!(paths, vec!["/x/a", "/y/a", "/z/a"]);
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let cands: Vec<String> = (0..500).map(|i| format!("/data/set{i:03}/item")).collect();
        let sequential = SubsequenceRanker::new().rank("s1i", &cands);
        let parallel = SubsequenceRanker::new()
            .with_parallel_threshold(1)
            .rank("s1i", &cands);
        assert_eq!(sequential, parallel);
        assert!(!sequential.is_empty());
    }

    #[test]
    fn display_path_abbreviates_home() {
        let home = Path::new("/home/user");
        assert_eq!(display_path(Path::new("/home/user"), Some(home)), "~");
        assert_eq!(
            display_path(Path::new("/home/user/src/app"), Some(home)),
            Path::new("~").join("src/app").to_string_lossy()
        );
        assert_eq!(display_path(Path::new("/home/username"), Some(home)), "/home/username");
        assert_eq!(display_path(Path::new("/etc"), None), "/etc");
    }
}
