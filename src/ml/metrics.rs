//! Evaluation metrics for the binary attrition classifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Probability at or above which a row is predicted positive.
pub const DECISION_THRESHOLD: f32 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("No predictions to evaluate")]
    Empty,
    #[error("Labels ({labels}) and scores ({scores}) differ in length")]
    LengthMismatch { labels: usize, scores: usize },
    /// ROC/AUC need both classes present.
    #[error("Only class {0} is present; ROC AUC is undefined")]
    SingleClass(u8),
    #[error("Score at row {0} is not finite")]
    NonFiniteScore(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Confusion matrix for a `K`-class classifier.
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    /// Binary matrix from labels and probabilities at `threshold`.
    pub fn from_scores(labels: &[u8], scores: &[f32], threshold: f32) -> Self {
        let mut cm = Self::new(2);
        for (&truth, &score) in labels.iter().zip(scores) {
            let predicted = usize::from(score >= threshold);
            cm.add(usize::from(truth), predicted);
        }
        cm
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Precision/recall statistics for a single class.
pub struct PerClassStats {
    /// `TP / (TP + FP)`.
    pub precision: f32,
    /// `TP / (TP + FN)`.
    pub recall: f32,
    /// Total number of true examples for the class.
    pub support: u32,
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f32;
        let mut fp = 0f32;
        let mut fn_ = 0f32;
        let mut support = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f32;
            }
        }
        for i in 0..k {
            if i != class_idx {
                fp += cm.get(i, class_idx) as f32;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        stats.push(PerClassStats {
            precision,
            recall,
            support,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f32 {
    let mut correct = 0u64;
    let mut total = 0u64;
    for truth in 0..cm.n_classes {
        for predicted in 0..cm.n_classes {
            let v = cm.get(truth, predicted) as u64;
            total += v;
            if truth == predicted {
                correct += v;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        (correct as f32) / (total as f32)
    }
}

/// ROC curve with one point per distinct score, starting at the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub false_positive_rate: Vec<f32>,
    pub true_positive_rate: Vec<f32>,
    /// Score threshold for each point; the origin uses `+inf`.
    pub thresholds: Vec<f32>,
}

impl RocCurve {
    /// Area under the curve by the trapezoid rule.
    pub fn auc(&self) -> f32 {
        let mut area = 0.0f64;
        for i in 1..self.false_positive_rate.len() {
            let dx = f64::from(self.false_positive_rate[i] - self.false_positive_rate[i - 1]);
            let mean_y =
                0.5 * f64::from(self.true_positive_rate[i] + self.true_positive_rate[i - 1]);
            area += dx * mean_y;
        }
        area as f32
    }
}

pub fn roc_curve(labels: &[u8], scores: &[f32]) -> Result<RocCurve, MetricError> {
    if labels.len() != scores.len() {
        return Err(MetricError::LengthMismatch {
            labels: labels.len(),
            scores: scores.len(),
        });
    }
    if labels.is_empty() {
        return Err(MetricError::Empty);
    }
    if let Some(row) = scores.iter().position(|s| !s.is_finite()) {
        return Err(MetricError::NonFiniteScore(row));
    }
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 {
        return Err(MetricError::SingleClass(0));
    }
    if negatives == 0 {
        return Err(MetricError::SingleClass(1));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut curve = RocCurve {
        false_positive_rate: vec![0.0],
        true_positive_rate: vec![0.0],
        thresholds: vec![f32::INFINITY],
    };
    let (mut tp, mut fp) = (0usize, 0usize);
    for (pos, &idx) in order.iter().enumerate() {
        if labels[idx] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_score = order
            .get(pos + 1)
            .is_none_or(|&next| scores[next] != scores[idx]);
        if last_of_score {
            curve.false_positive_rate.push(fp as f32 / negatives as f32);
            curve.true_positive_rate.push(tp as f32 / positives as f32);
            curve.thresholds.push(scores[idx]);
        }
    }
    Ok(curve)
}

pub fn roc_auc(labels: &[u8], scores: &[f32]) -> Result<f32, MetricError> {
    roc_curve(labels, scores).map(|curve| curve.auc())
}

/// Held-out evaluation of a binary classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f32,
    pub per_class: Vec<PerClassStats>,
    pub roc: RocCurve,
    pub auc: f32,
}

impl Evaluation {
    pub fn compute(labels: &[u8], scores: &[f32]) -> Result<Self, MetricError> {
        let roc = roc_curve(labels, scores)?;
        let confusion = ConfusionMatrix::from_scores(labels, scores, DECISION_THRESHOLD);
        Ok(Self {
            accuracy: accuracy(&confusion),
            per_class: precision_recall_by_class(&confusion),
            auc: roc.auc(),
            confusion,
            roc,
        })
    }
}
