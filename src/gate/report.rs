//! 验证集质量报告（precision / recall / f1 / support + accuracy）
//!
//! 只用于日志输出，不参与部署模型的选择。

use serde::Serialize;

use crate::feedback::Label;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub corpus_size: usize,
    pub train_size: usize,
    pub validation_size: usize,
    pub vocabulary_size: usize,
    /// 验证集为空时为 None
    pub accuracy: Option<f64>,
    pub per_class: Vec<ClassMetrics>,
}

/// 按 labels 顺序逐类统计；分母为 0 时记 0.0
pub fn classification_report(truth: &[Label], predicted: &[Label], labels: &[Label]) -> (Option<f64>, Vec<ClassMetrics>) {
    if truth.is_empty() || truth.len() != predicted.len() {
        return (None, Vec::new());
    }

    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    let accuracy = correct as f64 / truth.len() as f64;

    let per_class = labels
        .iter()
        .map(|&label| {
            let tp = truth
                .iter()
                .zip(predicted)
                .filter(|(t, p)| **t == label && **p == label)
                .count();
            let predicted_pos = predicted.iter().filter(|p| **p == label).count();
            let support = truth.iter().filter(|t| **t == label).count();

            let precision = ratio(tp, predicted_pos);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    (Some(accuracy), per_class)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
