//! Store aggregations evaluated in process.
//!
//! The `PostgreSQL` adapter expresses these stages in SQL; the in-memory
//! adapter runs them over its store list. Inputs are stores with their
//! reviews already attached.

use std::collections::HashMap;

use tantivy::tokenizer::{
    Language, LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter,
    TextAnalyzer, TokenStream,
};

use crate::models::{ScoredStore, Store, TagCount, TopStore};

/// Minimum number of reviews before a store can rank on the top list.
pub const MIN_TOP_REVIEWS: usize = 2;

/// Tokens longer than this are dropped before matching.
const MAX_TOKEN_LEN: usize = 40;

/// Count stores per tag, most used first.
///
/// Ties keep the order in which tags were first seen.
#[must_use]
pub fn tag_counts(stores: &[Store]) -> Vec<TagCount> {
    let mut counts: Vec<TagCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for tag in stores.iter().flat_map(|s| s.tags.iter()) {
        match index.get(tag.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(tag, counts.len());
                counts.push(TagCount {
                    tag: tag.clone(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Best-rated stores having at least [`MIN_TOP_REVIEWS`] reviews.
#[must_use]
pub fn top_stores(stores: &[Store], limit: usize) -> Vec<TopStore> {
    let mut ranked: Vec<TopStore> = stores
        .iter()
        .filter(|s| s.reviews.len() >= MIN_TOP_REVIEWS)
        .map(|s| {
            let total: f64 = s.reviews.iter().map(|r| f64::from(r.rating.get())).sum();
            #[allow(clippy::cast_precision_loss)]
            let average_rating = total / s.reviews.len() as f64;
            TopStore {
                photo: s.photo.clone(),
                name: s.name.clone(),
                slug: s.slug.clone(),
                reviews: s.reviews.clone(),
                average_rating,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    ranked.truncate(limit);
    ranked
}

/// Rank stores against `query`, keeping at most `limit` hits.
///
/// A store matching any query term is a hit. Terms are stemmed with the
/// English stemmer, so `bakeries` finds `Bakery`. A query made only of
/// whitespace, punctuation or stop words matches nothing.
#[must_use]
pub fn search(stores: &[Store], query: &str, limit: usize) -> Vec<ScoredStore> {
    let mut analyzer = en_stem();

    let mut terms = tokenize(&mut analyzer, query);
    terms.sort_unstable();
    terms.dedup();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<ScoredStore> = stores
        .iter()
        .filter_map(|store| {
            let score = field_score(&mut analyzer, &store.name, &terms)
                + field_score(&mut analyzer, &store.description, &terms);
            (score > 0.0).then(|| ScoredStore {
                store: store.clone(),
                score,
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}

/// Score of `terms` within one field.
#[allow(clippy::cast_precision_loss)]
fn field_score(analyzer: &mut TextAnalyzer, text: &str, terms: &[String]) -> f64 {
    let tokens = tokenize(analyzer, text);
    if tokens.is_empty() {
        return 0.0;
    }
    let n = tokens.len() as f64;

    terms
        .iter()
        .map(|term| {
            let c = tokens.iter().filter(|t| *t == term).count() as f64;
            c * (0.5 * c / n + 0.5)
        })
        .sum()
}

/// English analyzer: split on non-alphanumerics, lowercase, drop stop words,
/// then stem.
fn en_stem() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
        .filter(LowerCaser)
        .filter(StopWordFilter::new(Language::English).expect("English stop words are available"))
        .filter(Stemmer::new(Language::English))
        .build()
}

fn tokenize(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut stream = analyzer.token_stream(text);
    while stream.advance() {
        tokens.push(stream.token().text.clone());
    }
    tokens
}
