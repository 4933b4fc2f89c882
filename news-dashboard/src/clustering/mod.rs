//! Topic clustering of articles: TF-IDF vectors, DBSCAN over cosine distance,
//! then grouping, labelling and size filtering.

pub mod dbscan;
pub mod tfidf;

pub use dbscan::{dbscan, Assignment};
pub use tfidf::{tokenize, SparseVector, TfidfVectorizer};

use crate::types::{Article, ArticleCluster, NewsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Maximum cosine distance between neighboring articles
    pub eps: f64,
    /// Neighbors (including itself) an article needs to seed a cluster
    pub min_samples: usize,
    /// Groups smaller than this are discarded
    pub min_cluster_size: usize,
    /// Number of terms used to label a cluster
    pub top_terms: usize,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            eps: 0.3,
            min_samples: 2,
            min_cluster_size: 2,
            top_terms: 3,
        }
    }
}

impl ClusterSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.eps.is_finite() || self.eps <= 0.0 || self.eps >= 1.0 {
            return Err(NewsError::InvalidParameter {
                name: "eps",
                reason: format!("must be in (0, 1), got {}", self.eps),
            });
        }
        if self.min_samples == 0 {
            return Err(NewsError::InvalidParameter {
                name: "min_samples",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_cluster_size == 0 {
            return Err(NewsError::InvalidParameter {
                name: "min_cluster_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Group articles by topic similarity.
///
/// Noise and groups below `min_cluster_size` are dropped. Clusters are ordered
/// largest first (ties by earliest member) and numbered from 1; members keep
/// their input order.
pub fn cluster_articles(articles: &[Article], settings: &ClusterSettings) -> Result<Vec<ArticleCluster>> {
    settings.validate()?;

    if articles.is_empty() {
        return Ok(Vec::new());
    }

    let documents: Vec<String> = articles.iter().map(Article::text).collect();
    let (vectorizer, vectors) = TfidfVectorizer::fit_transform(&documents);
    debug!(
        "Vectorized {} articles over {} terms",
        articles.len(),
        vectorizer.vocabulary().len()
    );

    let assignments = dbscan(vectors.len(), settings.eps, settings.min_samples, |i, j| {
        vectors[i].cosine_distance(&vectors[j])
    });

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut noise = 0;
    for (index, assignment) in assignments.iter().enumerate() {
        match assignment {
            Assignment::Cluster(label) => groups.entry(*label).or_default().push(index),
            Assignment::Noise => noise += 1,
        }
    }

    let found = groups.len();
    let mut kept: Vec<Vec<usize>> = groups
        .into_values()
        .filter(|members| members.len() >= settings.min_cluster_size)
        .collect();
    kept.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));

    let clusters: Vec<ArticleCluster> = kept
        .into_iter()
        .enumerate()
        .map(|(position, members)| build_cluster(position + 1, &members, articles, &vectors, &vectorizer, settings))
        .collect();

    info!(
        "Clustered {} articles: {} groups found, {} kept, {} noise",
        articles.len(),
        found,
        clusters.len(),
        noise
    );

    Ok(clusters)
}

fn build_cluster(
    id: usize,
    members: &[usize],
    articles: &[Article],
    vectors: &[SparseVector],
    vectorizer: &TfidfVectorizer,
    settings: &ClusterSettings,
) -> ArticleCluster {
    let mut sums: HashMap<usize, f64> = HashMap::new();
    for &member in members {
        for &(term, weight) in vectors[member].entries() {
            *sums.entry(term).or_insert(0.0) += weight;
        }
    }
    let size = members.len() as f64;
    let centroid = SparseVector::from_pairs(sums.into_iter().map(|(t, w)| (t, w / size)).collect());

    let mut ranked: Vec<(&str, f64)> = centroid
        .entries()
        .iter()
        .filter_map(|&(term, weight)| vectorizer.term(term).map(|t| (t, weight)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    let terms: Vec<String> = ranked
        .into_iter()
        .take(settings.top_terms)
        .map(|(t, _)| t.to_string())
        .collect();

    // The member closest to the centroid stands in for the whole story
    let mut headline_member = members[0];
    let mut best_distance = f64::INFINITY;
    for &member in members {
        let distance = vectors[member].cosine_distance(&centroid);
        if distance < best_distance {
            best_distance = distance;
            headline_member = member;
        }
    }
    let headline = articles[headline_member].title.clone();

    let label = if terms.is_empty() {
        headline.clone()
    } else {
        terms.join(", ")
    };

    ArticleCluster {
        id,
        label,
        terms,
        headline,
        articles: members.iter().map(|&m| articles[m].clone()).collect(),
    }
}
