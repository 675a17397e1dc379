//! 多项式朴素贝叶斯（加性平滑）
//!
//! 类别按 Label 排序；预测取 log 先验 + Σ x_j·log θ_cj 最大者，平票取靠前的类别。

use std::collections::BTreeSet;

use super::tfidf::SparseRow;
use crate::feedback::Label;

#[derive(Debug, Clone)]
pub struct MultinomialNb {
    classes: Vec<Label>,
    class_log_prior: Vec<f64>,
    /// [类别][特征] 的 log θ
    feature_log_prob: Vec<Vec<f64>>,
}

impl MultinomialNb {
    /// 行与标签一一对应；无样本时返回 None
    pub fn fit(rows: &[SparseRow], labels: &[Label], n_features: usize, alpha: f64) -> Option<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return None;
        }

        let classes: Vec<Label> = labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let mut class_count = vec![0usize; classes.len()];
        let mut feature_count = vec![vec![0.0f64; n_features]; classes.len()];

        for (row, label) in rows.iter().zip(labels) {
            let c = classes.iter().position(|l| l == label)?;
            class_count[c] += 1;
            for &(j, w) in row {
                feature_count[c][j] += w;
            }
        }

        let total = rows.len() as f64;
        let class_log_prior = class_count
            .iter()
            .map(|&n| (n as f64 / total).ln())
            .collect();

        let feature_log_prob = feature_count
            .iter()
            .map(|counts| {
                let denom = counts.iter().sum::<f64>() + alpha * n_features as f64;
                counts.iter().map(|&c| ((c + alpha) / denom).ln()).collect()
            })
            .collect();

        Some(Self {
            classes,
            class_log_prior,
            feature_log_prob,
        })
    }

    /// 每个类别的联合 log 似然
    pub fn joint_log_likelihood(&self, row: &SparseRow) -> Vec<(Label, f64)> {
        self.classes
            .iter()
            .enumerate()
            .map(|(c, &label)| {
                let score = self.class_log_prior[c]
                    + row
                        .iter()
                        .map(|&(j, w)| w * self.feature_log_prob[c][j])
                        .sum::<f64>();
                (label, score)
            })
            .collect()
    }

    /// 联合 log 似然最大的类别；平票保留靠前者
    pub fn predict(&self, row: &SparseRow) -> Label {
        let mut scores = self.joint_log_likelihood(row).into_iter();
        let Some(first) = scores.next() else {
            return Label::Unrelated;
        };
        scores
            .fold(first, |best, (label, score)| if score > best.1 { (label, score) } else { best })
            .0
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }
}
