//! Incremental filename search over a [`Repository`]
//!
//! Each keystroke calls [`SearchEngine::search`] with the full query text. The engine
//! remembers the previous normalized query, every image that matched it (ranked), and
//! the visible top results, which lets it:
//!
//! - skip all work when normalization leaves the query unchanged,
//! - re-filter the previous matches instead of the whole corpus when the new query
//!   extends the old one (a name containing the new query contains its prefix),
//! - tell the caller whether the visible results differ from the previous call.

use std::cmp::Ordering;
use std::path::PathBuf;

use super::normalize::simplify;
use crate::models::ImageRecord;
use crate::repository::Repository;

/// Normalized queries shorter than this are not selective enough to run
pub const MIN_QUERY_LEN: usize = 3;

/// Number of ranked matches exposed as results
pub const MAX_RESULTS: usize = 20;

/// Whether the visible results differ from the previous search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultChange {
    Unchanged,
    Changed,
}

/// Which candidates a search examined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// Same normalized query as last time; nothing was examined
    Skipped,
    /// Query below [`MIN_QUERY_LEN`]; results and cache were cleared
    TooShort,
    /// Every image in the repository
    Corpus,
    /// Only the previous query's matches
    Cache,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub change: ResultChange,
    pub source: MatchSource,
}

impl SearchOutcome {
    pub fn is_changed(&self) -> bool {
        self.change == ResultChange::Changed
    }
}

/// Search state for one query box.
///
/// Matches are kept as image IDs and resolved against the repository on every call,
/// so usage changes are picked up by the next ranking. Narrowing only reuses the
/// cached matches while the repository holds the same image set they were taken
/// from; after an add or rescan the next search goes back to the corpus.
#[derive(Debug, Default)]
pub struct SearchEngine {
    previous_query: Option<String>,
    matches: Vec<i32>,
    results: Vec<i32>,
    corpus: CorpusStamp,
}

/// Image count and highest image ID; changes whenever images are added or replaced
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct CorpusStamp {
    len: usize,
    last_id: Option<i32>,
}

impl CorpusStamp {
    fn of(repo: &Repository) -> Self {
        Self { len: repo.images().len(), last_id: repo.images().last().map(|img| img.id) }
    }
}

impl SearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `input` against the repository's images and update the visible results
    pub fn search(&mut self, repo: &Repository, input: &str) -> SearchOutcome {
        let query = simplify(input);

        if self.previous_query.as_deref() == Some(query.as_str()) {
            return SearchOutcome { change: ResultChange::Unchanged, source: MatchSource::Skipped };
        }

        if query.chars().count() < MIN_QUERY_LEN {
            let change =
                if self.results.is_empty() { ResultChange::Unchanged } else { ResultChange::Changed };
            self.reset();
            return SearchOutcome { change, source: MatchSource::TooShort };
        }

        let corpus = CorpusStamp::of(repo);
        let narrowing = corpus == self.corpus
            && self
                .previous_query
                .as_deref()
                .is_some_and(|previous| query.len() > previous.len() && query.starts_with(previous));

        let (mut found, source): (Vec<&ImageRecord>, _) = if narrowing {
            let found = self
                .matches
                .iter()
                .filter_map(|id| repo.lookup_image(*id))
                .filter(|img| img.simplified_name.contains(&query))
                .collect();
            (found, MatchSource::Cache)
        } else {
            let found =
                repo.images().iter().filter(|img| img.simplified_name.contains(&query)).collect();
            (found, MatchSource::Corpus)
        };

        found.sort_by(|a, b| rank(a, b));
        self.matches = found.iter().map(|img| img.id).collect();

        let visible: Vec<i32> = self.matches.iter().take(MAX_RESULTS).copied().collect();
        let change = if visible == self.results { ResultChange::Unchanged } else { ResultChange::Changed };

        self.results = visible;
        self.previous_query = Some(query);
        self.corpus = corpus;

        SearchOutcome { change, source }
    }

    /// IDs of the visible results, best first
    pub fn results(&self) -> &[i32] {
        &self.results
    }

    /// Visible results resolved against `repo`; images removed since the search are skipped
    pub fn result_images<'r>(&self, repo: &'r Repository) -> Vec<&'r ImageRecord> {
        self.results.iter().filter_map(|id| repo.lookup_image(*id)).collect()
    }

    /// Number of matches for the current query, including those beyond [`MAX_RESULTS`]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// The normalized query behind the current results
    pub fn query(&self) -> Option<&str> {
        self.previous_query.as_deref()
    }

    /// Forget the previous query, its matches and the visible results
    pub fn reset(&mut self) {
        self.previous_query = None;
        self.matches.clear();
        self.results.clear();
    }

    /// Full path of a result, or `None` when its directory is no longer referenced
    pub fn resolve_full_path(&self, repo: &Repository, image: &ImageRecord) -> Option<PathBuf> {
        repo.image_full_path(image)
    }
}

/// Most used first, then by display name ignoring case, then by ID
fn rank(a: &ImageRecord, b: &ImageRecord) -> Ordering {
    b.usage
        .cmp(&a.usage)
        .then_with(|| caseless(a.display_name()).cmp(caseless(b.display_name())))
        .then_with(|| a.display_name().cmp(b.display_name()))
        .then_with(|| a.id.cmp(&b.id))
}

fn caseless(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}
