use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

const STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just", "may", "me",
    "might", "more", "most", "must", "my", "myself", "new", "no", "nor", "not", "now", "of", "off",
    "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "said",
    "same", "says", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "us", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static STOP: OnceLock<HashSet<&'static str>> = OnceLock::new();
    STOP.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Lowercased Unicode words of at least two characters, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() >= 2)
        .filter(|w| !is_stop_word(w))
        .collect()
}

/// A sparse vector as `(term index, weight)` pairs sorted by term index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn from_pairs(mut entries: Vec<(usize, f64)>) -> Self {
        entries.retain(|(_, w)| *w != 0.0);
        entries.sort_by_key(|(i, _)| *i);
        Self { entries }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_idx, a_w) = self.entries[i];
            let (b_idx, b_w) = other.entries[j];
            match a_idx.cmp(&b_idx) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// Cosine distance in `[0, 2]`; a zero vector is at distance 1 from everything
    pub fn cosine_distance(&self, other: &SparseVector) -> f64 {
        let (na, nb) = (self.norm(), other.norm());
        if na == 0.0 || nb == 0.0 {
            return 1.0;
        }
        (1.0 - self.dot(other) / (na * nb)).clamp(0.0, 2.0)
    }
}

/// TF-IDF with raw term counts, smoothed IDF and L2-normalized rows
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: Vec<String>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary and document frequencies of a corpus
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in documents {
            let unique: HashSet<String> = tokenize(doc.as_ref()).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let n = documents.len() as f64;
        let (vocabulary, idf) = document_frequency
            .into_iter()
            .map(|(term, df)| (term, ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0))
            .unzip();

        Self { vocabulary, idf }
    }

    pub fn fit_transform<S: AsRef<str>>(documents: &[S]) -> (Self, Vec<SparseVector>) {
        let vectorizer = Self::fit(documents);
        let vectors = documents.iter().map(|d| vectorizer.transform(d.as_ref())).collect();
        (vectorizer, vectors)
    }

    /// Vectorize one document against the fitted vocabulary; unknown terms are ignored
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in tokenize(document) {
            if let Ok(index) = self.vocabulary.binary_search(&term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, count)| (index, count * self.idf[index]))
            .collect();

        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in weighted.iter_mut() {
                *w /= norm;
            }
        }

        SparseVector::from_pairs(weighted)
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.vocabulary.get(index).map(String::as_str)
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|i| self.idf[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let tokens = tokenize("The U.N. says a Ceasefire is NOT holding in Gaza, officials warn");
        assert_eq!(tokens, vec!["u.n", "ceasefire", "holding", "gaza", "officials", "warn"]);
        assert!(tokenize("a I to of").is_empty());
    }

    #[test]
    fn test_smoothed_idf() {
        let docs = ["storm hits coast", "storm moves inland", "markets rally"];
        let vectorizer = TfidfVectorizer::fit(&docs);

        // df("storm") = 2 of 3 documents
        let expected_storm = (4.0f64 / 3.0).ln() + 1.0;
        let expected_rally = (4.0f64 / 2.0).ln() + 1.0;
        assert!((vectorizer.idf("storm").unwrap() - expected_storm).abs() < 1e-12);
        assert!((vectorizer.idf("rally").unwrap() - expected_rally).abs() < 1e-12);
        assert!(vectorizer.idf("absent").is_none());

        let sorted: Vec<String> = {
            let mut v = vectorizer.vocabulary().to_vec();
            v.sort();
            v
        };
        assert_eq!(vectorizer.vocabulary(), sorted.as_slice());
    }

    #[test]
    fn test_rows_are_l2_normalized() {
        let docs = ["storm storm hits coast", "markets rally", "the and of"];
        let (_, vectors) = TfidfVectorizer::fit_transform(&docs);

        assert!((vectors[0].norm() - 1.0).abs() < 1e-12);
        assert!((vectors[1].norm() - 1.0).abs() < 1e-12);
        assert!(vectors[2].is_zero());
    }

    #[test]
    fn test_cosine_distance() {
        let docs = ["storm hits coast", "coast hits storm", "markets rally", ""];
        let (_, vectors) = TfidfVectorizer::fit_transform(&docs);

        assert!(vectors[0].cosine_distance(&vectors[1]) < 1e-9);
        assert!((vectors[0].cosine_distance(&vectors[2]) - 1.0).abs() < 1e-12);
        assert_eq!(vectors[3].cosine_distance(&vectors[3]), 1.0);
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let vectorizer = TfidfVectorizer::fit(&["storm hits coast"]);
        let vector = vectorizer.transform("storm surprises everyone");
        assert_eq!(vector.entries().len(), 1);
        assert_eq!(vectorizer.term(vector.entries()[0].0), Some("storm"));
    }
}
