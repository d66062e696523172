//! Multi-signal string similarity: token-aligned edit distance, character-set
//! Jaccard, Soundex equality and pooled-embedding cosine, fused per field and
//! combined across the name and surname fields.

pub mod embedding;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use strsim::levenshtein;

use crate::error::ConfigError;
use crate::models::Record;
use crate::normalize::{normalize_text, soundex, tokens};
use embedding::{cosine, mean_pool, EmbeddingCache, Vocabulary};

pub use embedding::Vector;

/// Signal weights and match thresholds for one run. Immutable once validated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityConfig {
    pub levenshtein_weight: f64,
    pub char_set_weight: f64,
    pub phonetic_weight: f64,
    pub surname_weight: f64,
    pub name_weight: f64,
    pub semantic_weight: f64,
    pub syntactic_weight: f64,
    pub similarity_threshold: f64,
    pub name_threshold: f64,
    pub surname_threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self::presets()[7]
    }
}

impl SimilarityConfig {
    /// Checked constructor; argument order follows the field order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        levenshtein_weight: f64, char_set_weight: f64, phonetic_weight: f64,
        surname_weight: f64, name_weight: f64,
        semantic_weight: f64, syntactic_weight: f64,
        similarity_threshold: f64, name_threshold: f64, surname_threshold: f64,
    ) -> Result<Self, ConfigError> {
        let cfg = Self {
            levenshtein_weight, char_set_weight, phonetic_weight,
            surname_weight, name_weight,
            semantic_weight, syntactic_weight,
            similarity_threshold, name_threshold, surname_threshold,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// The eleven weight/threshold combinations of the experiment grid, numbered 1-11 by position.
    pub fn presets() -> Vec<SimilarityConfig> {
        let p = |lw, cw, sw, suw, nw, sem, syn, st, nst, sust| SimilarityConfig {
            levenshtein_weight: lw, char_set_weight: cw, phonetic_weight: sw,
            surname_weight: suw, name_weight: nw,
            semantic_weight: sem, syntactic_weight: syn,
            similarity_threshold: st, name_threshold: nst, surname_threshold: sust,
        };
        vec![
            p(1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.4, 0.8, 0.8),
            p(1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.6, 0.8, 0.8),
            p(1.0, 0.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8),
            p(0.7, 0.3, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8),
            p(0.5, 0.5, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8),
            p(0.0, 1.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8),
            p(0.3, 0.7, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8),
            p(0.7, 0.3, 0.0, 0.5, 0.5, 0.3, 0.7, 0.8, 0.8, 0.8),
            p(0.7, 0.3, 0.0, 0.5, 0.5, 0.5, 0.5, 0.8, 0.8, 0.8),
            p(0.7, 0.3, 0.0, 0.5, 0.5, 0.7, 0.3, 0.8, 0.8, 0.8),
            p(0.7, 0.3, 0.0, 0.5, 0.5, 1.0, 0.0, 0.8, 0.8, 0.8),
        ]
    }

    fn fields(&self) -> [(&'static str, f64); 10] {
        [
            ("levenshtein_weight", self.levenshtein_weight),
            ("char_set_weight", self.char_set_weight),
            ("phonetic_weight", self.phonetic_weight),
            ("surname_weight", self.surname_weight),
            ("name_weight", self.name_weight),
            ("semantic_weight", self.semantic_weight),
            ("syntactic_weight", self.syntactic_weight),
            ("similarity_threshold", self.similarity_threshold),
            ("name_threshold", self.name_threshold),
            ("surname_threshold", self.surname_threshold),
        ]
    }

    /// Every weight and threshold must be finite and in `[0, 1]`. Weight sums are
    /// expected to be 1 but only logged when they are not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { field, value });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value, expected: "[0, 1]" });
            }
        }
        let pairs = [
            ("semantic_weight + syntactic_weight", self.semantic_weight + self.syntactic_weight),
            ("name_weight + surname_weight", self.name_weight + self.surname_weight),
        ];
        for (what, sum) in pairs {
            if (sum - 1.0).abs() > 1e-9 {
                log::warn!("{} = {} (expected 1.0)", what, sum);
            }
        }
        Ok(())
    }

    pub fn syntactic(&self, s: &ScoreBundle) -> f64 {
        s.levenshtein * self.levenshtein_weight
            + s.char_set * self.char_set_weight
            + s.phonetic * self.phonetic_weight
    }

    /// Per-field score: semantic and syntactic parts blended.
    pub fn fuse(&self, s: &ScoreBundle) -> f64 {
        s.semantic * self.semantic_weight + self.syntactic(s) * self.syntactic_weight
    }

    pub fn combine(&self, name: f64, surname: f64) -> f64 {
        name * self.name_weight + surname * self.surname_weight
    }

    /// Either both fields clear their thresholds, or the combined score clears the global one.
    pub fn is_match(&self, f: &FieldScores) -> bool {
        (f.name >= self.name_threshold && f.surname >= self.surname_threshold)
            || f.total >= self.similarity_threshold
    }
}

/// Raw signals for one string pair, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub semantic: f64,
    pub levenshtein: f64,
    pub phonetic: f64,
    pub char_set: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldScores {
    pub name: f64,
    pub surname: f64,
    pub total: f64,
}

/// Token-aligned edit similarity of two normalized strings.
///
/// Positions beyond the shorter token list compare against the empty token;
/// two empty tokens count as a perfect match.
pub fn token_edit_similarity(a: &str, b: &str) -> f64 {
    let ta = tokens(a);
    let tb = tokens(b);
    let positions = ta.len().max(tb.len()).max(1);
    let total: f64 = (0..positions)
        .map(|i| {
            let p1 = ta.get(i).copied().unwrap_or("");
            let p2 = tb.get(i).copied().unwrap_or("");
            let max_len = p1.chars().count().max(p2.chars().count());
            if max_len == 0 {
                return 1.0;
            }
            1.0 - levenshtein(p1, p2) as f64 / max_len as f64
        })
        .sum();
    total / positions as f64
}

/// Jaccard similarity of the normalized strings' character sets. The word
/// separator is a member like any letter; two empty strings score 1.
pub fn char_set_similarity(a: &str, b: &str) -> f64 {
    let s1: HashSet<char> = a.chars().collect();
    let s2: HashSet<char> = b.chars().collect();
    let union = s1.union(&s2).count();
    if union == 0 {
        return 1.0;
    }
    s1.intersection(&s2).count() as f64 / union as f64
}

pub fn phonetic_similarity(a: &str, b: &str) -> f64 {
    if soundex(a) == soundex(b) { 1.0 } else { 0.0 }
}

/// Scores string pairs. Cheap to share: the vocabulary and cache sit behind `Arc`s.
#[derive(Clone)]
pub struct SimilarityEngine {
    vocab: Option<Arc<dyn Vocabulary>>,
    cache: Arc<EmbeddingCache>,
}

impl SimilarityEngine {
    pub fn new(vocab: Option<Arc<dyn Vocabulary>>, cache: Arc<EmbeddingCache>) -> Self {
        Self { vocab, cache }
    }

    /// Engine with no vocabulary: the semantic signal is always 0.
    pub fn syntactic_only(cache: Arc<EmbeddingCache>) -> Self {
        Self { vocab: None, cache }
    }

    pub fn has_vocabulary(&self) -> bool {
        self.vocab.is_some()
    }

    pub fn cache(&self) -> &EmbeddingCache {
        &self.cache
    }

    pub fn score(&self, a: &str, b: &str, cfg: &SimilarityConfig) -> ScoreBundle {
        let na = normalize_text(a);
        let nb = normalize_text(b);
        ScoreBundle {
            semantic: self.semantic(&na, &nb, cfg),
            levenshtein: token_edit_similarity(&na, &nb),
            phonetic: phonetic_similarity(&na, &nb),
            char_set: char_set_similarity(&na, &nb),
        }
    }

    /// Fused name, surname and combined scores for a candidate pair.
    pub fn score_records(&self, existing: &Record, incoming: &Record, cfg: &SimilarityConfig) -> FieldScores {
        let name = cfg.fuse(&self.score(&existing.name, &incoming.name, cfg));
        let surname = cfg.fuse(&self.score(&existing.surname, &incoming.surname, cfg));
        FieldScores { name, surname, total: cfg.combine(name, surname) }
    }

    fn pooled(&self, normalized: &str, vocab: &dyn Vocabulary) -> Option<Vec<f64>> {
        let found: Vec<Vector> = tokens(normalized)
            .into_iter()
            .filter_map(|t| self.cache.resolve(t, vocab))
            .collect();
        mean_pool(&found)
    }

    fn semantic(&self, na: &str, nb: &str, cfg: &SimilarityConfig) -> f64 {
        if cfg.semantic_weight <= 0.0 {
            return 0.0;
        }
        let vocab = match &self.vocab {
            Some(v) => v.as_ref(),
            None => return 0.0,
        };
        let (Some(pa), Some(pb)) = (self.pooled(na, vocab), self.pooled(nb, vocab)) else {
            return 0.0;
        };
        cosine(&pa, &pb).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapVocab(HashMap<String, Vector>);

    impl Vocabulary for MapVocab {
        fn has_token(&self, token: &str) -> bool {
            self.0.contains_key(token)
        }
        fn vector(&self, token: &str) -> Option<Vector> {
            self.0.get(token).cloned()
        }
    }

    fn engine_with(pairs: &[(&str, &[f32])]) -> SimilarityEngine {
        let map = pairs.iter().map(|(k, v)| (k.to_string(), Arc::from(v.to_vec()))).collect();
        let vocab: Arc<dyn Vocabulary> = Arc::new(MapVocab(map));
        SimilarityEngine::new(Some(vocab), Arc::new(EmbeddingCache::new(16).unwrap()))
    }

    fn semantic_cfg() -> SimilarityConfig {
        SimilarityConfig::presets()[8]
    }

    #[test]
    fn edit_similarity_bounds() {
        assert_eq!(token_edit_similarity("maria", "maria"), 1.0);
        assert_eq!(token_edit_similarity("", ""), 1.0);
        assert_eq!(token_edit_similarity("ann", ""), 0.0);
        let s = token_edit_similarity("jon", "john");
        assert!((s - 0.75).abs() < 1e-12);
        // second position compares "lee" with the empty token
        let s = token_edit_similarity("mary lee", "mary");
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn char_set_edges() {
        assert_eq!(char_set_similarity("", ""), 1.0);
        assert_eq!(char_set_similarity("abc", "xyz"), 0.0);
        assert_eq!(char_set_similarity("", "abc"), 0.0);
        assert!((char_set_similarity("abc", "abd") - 0.5).abs() < 1e-12);
    }

    #[test]
    fn char_set_counts_the_word_separator() {
        let a = normalize_text("Mary Ann");
        let b = normalize_text("Maryann");
        // {m,a,r,y,' ',n} vs {m,a,r,y,n}
        assert!((char_set_similarity(&a, &b) - 5.0 / 6.0).abs() < 1e-12);
        assert!((char_set_similarity("mary ann", "maryann") - 5.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn phonetic_equality() {
        assert_eq!(phonetic_similarity("robert", "rupert"), 1.0);
        assert_eq!(phonetic_similarity("robert", "smith"), 0.0);
    }

    #[test]
    fn semantic_skipped_without_weight_or_vocab() {
        let engine = engine_with(&[("anna", &[1.0, 0.0]), ("hannah", &[1.0, 0.1])]);
        let syntactic = SimilarityConfig::presets()[3];
        assert_eq!(engine.score("Anna", "Hannah", &syntactic).semantic, 0.0);
        assert!(engine.cache().is_empty());
        let bare = SimilarityEngine::syntactic_only(Arc::new(EmbeddingCache::new(4).unwrap()));
        assert_eq!(bare.score("Anna", "Hannah", &semantic_cfg()).semantic, 0.0);
    }

    #[test]
    fn semantic_pools_and_clips() {
        let engine = engine_with(&[("anna", &[1.0, 0.0]), ("maria", &[0.0, 1.0]), ("ann", &[-1.0, 0.0])]);
        let cfg = semantic_cfg();
        let s = engine.score("Anna Maria", "Maria Anna", &cfg).semantic;
        assert!((s - 1.0).abs() < 1e-9);
        assert_eq!(engine.score("Anna", "Ann", &cfg).semantic, 0.0);
        assert_eq!(engine.score("Anna", "Unknown", &cfg).semantic, 0.0);
        assert_eq!(engine.cache().len(), 3);
    }

    #[test]
    fn scores_are_symmetric() {
        let engine = engine_with(&[("john", &[0.3, 0.9]), ("jon", &[0.4, 0.7])]);
        let cfg = semantic_cfg();
        for (a, b) in [("John", "Jon"), ("Mary Ann", "Maryann"), ("", "Zoe"), ("Ólafur", "olaf")] {
            assert_eq!(engine.score(a, b, &cfg), engine.score(b, a, &cfg));
        }
    }

    #[test]
    fn disjunctive_match_rule() {
        let cfg = SimilarityConfig { name_weight: 0.5, surname_weight: 0.5, ..SimilarityConfig::presets()[2] };
        // both fields pass their thresholds
        assert!(cfg.is_match(&FieldScores { name: 0.8, surname: 0.8, total: 0.8 }));
        // aggregate passes although one field does not
        assert!(cfg.is_match(&FieldScores { name: 0.7, surname: 0.95, total: 0.825 }));
        assert!(!cfg.is_match(&FieldScores { name: 0.7, surname: 0.85, total: 0.775 }));
    }

    #[test]
    fn config_rejects_bad_values() {
        assert!(SimilarityConfig::new(1.1, 0.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8).is_err());
        let err = SimilarityConfig::new(f64::NAN, 0.0, 0.0, 0.5, 0.5, 0.0, 1.0, 0.8, 0.8, 0.8).unwrap_err();
        assert!(matches!(err, ConfigError::NotFinite { field: "levenshtein_weight", .. }));
        for cfg in SimilarityConfig::presets() {
            assert!(cfg.validate().is_ok());
        }
    }

    #[test]
    fn identical_records_score_one() {
        let engine = SimilarityEngine::syntactic_only(Arc::new(EmbeddingCache::new(4).unwrap()));
        let a = Record::new("a1", "John", "Smith", "", "1");
        let b = Record::new("b1", "John", "Smith", "", "1");
        let f = engine.score_records(&a, &b, &SimilarityConfig::presets()[3]);
        assert!((f.total - 1.0).abs() < 1e-12);
    }
}
