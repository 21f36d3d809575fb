//! Fusion of keyword and semantic result lists
//!
//! Two methods are supported: a weighted sum of min-max normalised scores
//! (keyword relevance and vector similarity), and reciprocal rank fusion
//! which ignores raw scores entirely.

use std::collections::HashMap;

use onebox_core::EmailDocument;
use onebox_keyword::KeywordHit;
use onebox_vector::VectorHit;
use serde::Serialize;

use crate::error::{IndexingError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMethod {
    #[default]
    Weighted,
    Rrf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridConfig {
    pub semantic_weight: f32,
    pub keyword_weight: f32,
    pub method: FusionMethod,
    pub rrf_k: u32,
    /// Weighted results below this combined score are dropped
    pub min_score_threshold: f32,
    pub max_results: Option<usize>,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            method: FusionMethod::Weighted,
            rrf_k: 60,
            min_score_threshold: 0.0,
            max_results: None,
        }
    }
}

impl HybridConfig {
    pub fn rrf() -> Self {
        Self {
            method: FusionMethod::Rrf,
            ..Self::default()
        }
    }

    pub fn with_weights(mut self, semantic: f32, keyword: f32) -> Self {
        self.semantic_weight = semantic;
        self.keyword_weight = keyword;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.min_score_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.semantic_weight) || !unit.contains(&self.keyword_weight) {
            return Err(IndexingError::Config("fusion weights must be between 0 and 1".to_string()));
        }
        if ((self.semantic_weight + self.keyword_weight) - 1.0).abs() > 1e-6 {
            return Err(IndexingError::Config("fusion weights must sum to 1".to_string()));
        }
        if self.rrf_k < 1 {
            return Err(IndexingError::Config("rrf_k must be at least 1".to_string()));
        }
        if !unit.contains(&self.min_score_threshold) {
            return Err(IndexingError::Config("min_score_threshold must be between 0 and 1".to_string()));
        }
        Ok(())
    }
}

/// One fused result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridHit {
    pub email_id: String,
    pub score: f32,
    /// Normalised keyword score (weighted) or `None` when absent from that list
    pub keyword_score: Option<f32>,
    /// Normalised similarity (weighted) or `None` when absent from that list
    pub semantic_score: Option<f32>,
    pub document: Option<EmailDocument>,
    pub content: Option<String>,
}

impl HybridHit {
    fn new(email_id: &str) -> Self {
        Self {
            email_id: email_id.to_string(),
            score: 0.0,
            keyword_score: None,
            semantic_score: None,
            document: None,
            content: None,
        }
    }
}

/// Min-max normalisation. A single score maps to 1.0, all-equal scores to 0.5.
pub fn normalize_min_max(scores: &[f32]) -> Vec<f32> {
    if scores.len() <= 1 {
        return vec![1.0; scores.len()];
    }
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if range < 1e-9 {
        return vec![0.5; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}

/// Merge keyword and semantic hits into one ranking
pub fn fuse(keyword: &[KeywordHit], semantic: &[VectorHit], config: &HybridConfig) -> Vec<HybridHit> {
    let mut hits = match (keyword.is_empty(), semantic.is_empty()) {
        (true, true) => return Vec::new(),
        (false, true) | (true, false) => single_sided(keyword, semantic),
        (false, false) => match config.method {
            FusionMethod::Weighted => weighted(keyword, semantic, config),
            FusionMethod::Rrf => reciprocal_rank(keyword, semantic, config.rrf_k),
        },
    };

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.email_id.cmp(&b.email_id))
    });
    if let Some(max) = config.max_results {
        hits.truncate(max);
    }
    hits
}

/// Collects hits by id, keeping first-seen order.
#[derive(Default)]
struct Merger {
    order: Vec<HybridHit>,
    index: HashMap<String, usize>,
}

impl Merger {
    fn entry(&mut self, email_id: &str) -> &mut HybridHit {
        let position = match self.index.get(email_id) {
            Some(&position) => position,
            None => {
                self.order.push(HybridHit::new(email_id));
                self.index.insert(email_id.to_string(), self.order.len() - 1);
                self.order.len() - 1
            }
        };
        &mut self.order[position]
    }

    fn add_keyword(&mut self, hit: &KeywordHit, score: f32) -> &mut HybridHit {
        let entry = self.entry(&hit.document.id);
        if entry.keyword_score.is_none() {
            entry.keyword_score = Some(score);
            entry.document = Some(hit.document.clone());
        }
        entry
    }

    fn add_semantic(&mut self, hit: &VectorHit, score: f32) -> &mut HybridHit {
        let entry = self.entry(&hit.email_id);
        if entry.semantic_score.is_none() {
            entry.semantic_score = Some(score);
            entry.content = Some(hit.content.clone());
        }
        entry
    }
}

fn single_sided(keyword: &[KeywordHit], semantic: &[VectorHit]) -> Vec<HybridHit> {
    let mut merger = Merger::default();
    let keyword_norm = normalize_min_max(&keyword.iter().map(|h| h.score).collect::<Vec<_>>());
    for (hit, score) in keyword.iter().zip(keyword_norm) {
        merger.add_keyword(hit, score);
    }
    let semantic_norm = normalize_min_max(&semantic.iter().map(VectorHit::similarity).collect::<Vec<_>>());
    for (hit, score) in semantic.iter().zip(semantic_norm) {
        merger.add_semantic(hit, score);
    }
    for hit in &mut merger.order {
        hit.score = hit.keyword_score.or(hit.semantic_score).unwrap_or(0.0);
    }
    merger.order
}

fn weighted(keyword: &[KeywordHit], semantic: &[VectorHit], config: &HybridConfig) -> Vec<HybridHit> {
    let mut merger = Merger::default();

    let keyword_norm = normalize_min_max(&keyword.iter().map(|h| h.score).collect::<Vec<_>>());
    for (hit, score) in keyword.iter().zip(keyword_norm) {
        merger.add_keyword(hit, score);
    }
    let semantic_norm = normalize_min_max(&semantic.iter().map(VectorHit::similarity).collect::<Vec<_>>());
    for (hit, score) in semantic.iter().zip(semantic_norm) {
        merger.add_semantic(hit, score);
    }

    merger
        .order
        .into_iter()
        .map(|mut hit| {
            hit.score = config.semantic_weight * hit.semantic_score.unwrap_or(0.0)
                + config.keyword_weight * hit.keyword_score.unwrap_or(0.0);
            hit
        })
        .filter(|hit| hit.score >= config.min_score_threshold)
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn reciprocal_rank(keyword: &[KeywordHit], semantic: &[VectorHit], k: u32) -> Vec<HybridHit> {
    let mut merger = Merger::default();
    let contribution = |rank: usize| 1.0 / (k as f32 + rank as f32);

    for (rank, hit) in keyword.iter().enumerate() {
        let entry = merger.add_keyword(hit, hit.score);
        entry.score += contribution(rank + 1);
    }
    for (rank, hit) in semantic.iter().enumerate() {
        let similarity = hit.similarity();
        let entry = merger.add_semantic(hit, similarity);
        entry.score += contribution(rank + 1);
    }
    merger.order
}
