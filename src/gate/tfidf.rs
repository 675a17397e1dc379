//! TF-IDF 向量化
//!
//! 词表每次 fit 全量重建（BTreeMap，特征下标与插入顺序无关）；
//! idf 平滑：ln((1+n)/(1+df)) + 1；行向量为原始词频 × idf 后做 L2 归一化。

use std::collections::{BTreeMap, BTreeSet};

/// 稀疏行向量：(特征下标, 权重)，按下标升序
pub type SparseRow = Vec<(usize, f64)>;

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// 从已分析好的文档（每篇为 term 序列）构建词表与 idf
    pub fn fit(docs: &[Vec<String>]) -> Self {
        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in docs {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = docs.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(df.len());
        for (index, (term, count)) in df.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), index);
            idf.push(((1.0 + n) / (1.0 + count as f64)).ln() + 1.0);
        }

        Self { vocabulary, idf }
    }

    pub fn transform(&self, terms: &[String]) -> SparseRow {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in terms {
            if let Some(&index) = self.vocabulary.get(term) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in row.iter_mut() {
                *w /= norm;
            }
        }
        row
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(terms: &[&str]) -> Vec<String> {
        terms.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shared_term_gets_lower_idf() {
        let v = TfidfVectorizer::fit(&[doc(&["what", "hours"]), doc(&["what", "weather"])]);
        assert_eq!(v.vocabulary_size(), 3);

        let row = v.transform(&doc(&["what", "hours"]));
        let what = row.iter().find(|(i, _)| *i == v.vocabulary["what"]).unwrap().1;
        let hours = row.iter().find(|(i, _)| *i == v.vocabulary["hours"]).unwrap().1;
        assert!(hours > what);
    }

    #[test]
    fn test_rows_are_l2_normalised() {
        let v = TfidfVectorizer::fit(&[doc(&["a1", "b1", "b1"]), doc(&["c1"])]);
        let row = v.transform(&doc(&["a1", "b1", "b1", "c1"]));
        let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_terms_give_empty_row() {
        let v = TfidfVectorizer::fit(&[doc(&["hours"])]);
        assert!(v.transform(&doc(&["weekend"])).is_empty());
        assert!(!v.vocabulary.contains_key("weekend"));
    }
}
