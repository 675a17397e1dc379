//! 意图闸门：判断一条用户消息是否属于当前 Agent 的服务范围（related / unrelated）
//!
//! - **训练**：语料按固定种子 80/20 划分，验证集只产出质量报告；部署的分类器用全量语料训练
//! - **特征**：unigram + bigram 的 TF-IDF，每次训练重建词表
//! - **模型**：多项式朴素贝叶斯，α = 1.0
//! - **预测**：纯函数；没有分类器（零样本 / 未训练）时一律返回 unrelated
//! - **重训**：新分类器在旁路完整构建，再通过一次 Arc 指针替换发布，读者只会看到旧的或新的

pub mod naive_bayes;
pub mod report;
pub mod tfidf;
pub mod tokenizer;

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::GateSection;
use crate::feedback::{Label, LabeledExample};

pub use naive_bayes::MultinomialNb;
pub use report::{ClassMetrics, TrainingReport};
pub use tfidf::TfidfVectorizer;

/// 训练产物：特征变换 + 统计模型，构建后只读
#[derive(Debug, Clone)]
pub struct Classifier {
    vectorizer: TfidfVectorizer,
    model: MultinomialNb,
}

impl Classifier {
    /// 在语料上训练；语料为空返回 None
    pub fn train(corpus: &[LabeledExample], settings: &GateSection) -> Option<(Self, TrainingReport)> {
        let examples: Vec<&LabeledExample> = corpus
            .iter()
            .filter(|ex| !ex.text.trim().is_empty())
            .collect();
        let deployed = Self::fit(&examples, settings.alpha)?;

        let (train_idx, validation_idx) =
            train_validation_split(examples.len(), settings.validation_ratio, settings.seed);

        let mut report = TrainingReport {
            corpus_size: examples.len(),
            train_size: train_idx.len(),
            validation_size: validation_idx.len(),
            vocabulary_size: deployed.vectorizer.vocabulary_size(),
            accuracy: None,
            per_class: Vec::new(),
        };

        let train_part: Vec<&LabeledExample> = train_idx.iter().map(|&i| examples[i]).collect();
        if let (Some(evaluator), false) = (Self::fit(&train_part, settings.alpha), validation_idx.is_empty()) {
            let truth: Vec<Label> = validation_idx.iter().map(|&i| examples[i].label).collect();
            let predicted: Vec<Label> = validation_idx
                .iter()
                .map(|&i| evaluator.predict(&examples[i].text))
                .collect();
            let labels: Vec<Label> = truth
                .iter()
                .chain(predicted.iter())
                .copied()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let (accuracy, per_class) = report::classification_report(&truth, &predicted, &labels);
            report.accuracy = accuracy;
            report.per_class = per_class;
        }

        Some((deployed, report))
    }

    fn fit(examples: &[&LabeledExample], alpha: f64) -> Option<Self> {
        if examples.is_empty() {
            return None;
        }
        let docs: Vec<Vec<String>> = examples.iter().map(|ex| tokenizer::analyze(&ex.text)).collect();
        let vectorizer = TfidfVectorizer::fit(&docs);
        let rows: Vec<_> = docs.iter().map(|d| vectorizer.transform(d)).collect();
        let labels: Vec<Label> = examples.iter().map(|ex| ex.label).collect();
        let model = MultinomialNb::fit(&rows, &labels, vectorizer.vocabulary_size(), alpha)?;
        Some(Self { vectorizer, model })
    }

    pub fn predict(&self, text: &str) -> Label {
        let row = self.vectorizer.transform(&tokenizer::analyze(text));
        self.model.predict(&row)
    }

    pub fn classes(&self) -> &[Label] {
        self.model.classes()
    }
}

/// 固定种子打乱后切分：验证集大小 ceil(n·ratio)，至少留 1 条训练样本；n < 2 时不切分
pub fn train_validation_split(n: usize, ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 {
        return (indices, Vec::new());
    }
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_validation = ((n as f64) * ratio.clamp(0.0, 1.0)).ceil() as usize;
    let n_validation = n_validation.min(n - 1);
    let train = indices.split_off(n_validation);
    (train, indices)
}

/// 意图闸门：持有当前分类器（copy-on-write），可被多个会话共享
#[derive(Debug)]
pub struct IntentGate {
    current: RwLock<Option<Arc<Classifier>>>,
    settings: GateSection,
}

impl IntentGate {
    /// 未训练的闸门：predict 恒为 unrelated
    pub fn new(settings: GateSection) -> Self {
        Self {
            current: RwLock::new(None),
            settings,
        }
    }

    pub fn from_corpus(settings: GateSection, corpus: &[LabeledExample]) -> Self {
        let gate = Self::new(settings);
        gate.retrain(corpus);
        gate
    }

    /// 用新语料重建分类器并整体替换；语料为空时清空（回到 fail-closed）
    pub fn retrain(&self, corpus: &[LabeledExample]) -> Option<TrainingReport> {
        let trained = Classifier::train(corpus, &self.settings);
        let (next, report) = match trained {
            Some((classifier, report)) => (Some(Arc::new(classifier)), Some(report)),
            None => (None, None),
        };

        match &report {
            Some(r) => tracing::info!(
                corpus = r.corpus_size,
                train = r.train_size,
                validation = r.validation_size,
                vocabulary = r.vocabulary_size,
                accuracy = ?r.accuracy,
                per_class = %serde_json::to_string(&r.per_class).unwrap_or_default(),
                "intent gate trained"
            ),
            None => tracing::warn!("intent gate has no training data, predictions fail closed"),
        }

        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
        report
    }

    /// 当前分类器快照；读锁只在 clone Arc 期间持有
    pub fn snapshot(&self) -> Option<Arc<Classifier>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn predict(&self, text: &str) -> Label {
        match self.snapshot() {
            Some(classifier) => classifier.predict(text),
            None => Label::Unrelated,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.snapshot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::FeedbackCorpus;

    fn store_corpus() -> FeedbackCorpus {
        vec![
            LabeledExample::new("What are your store hours?", Label::Related),
            LabeledExample::new("What's the weather?", Label::Unrelated),
        ]
    }

    fn larger_corpus() -> FeedbackCorpus {
        let related = [
            "What are your store hours?",
            "Do you have this shirt in medium?",
            "Is there a discount on shoes this week?",
            "Can I return an item without a receipt?",
            "How much does shipping cost?",
            "Do you sell gift cards?",
        ];
        let unrelated = [
            "What's the weather?",
            "Who won the football game yesterday?",
            "Tell me a joke about cats",
            "What is the capital of France?",
        ];
        related
            .iter()
            .map(|t| LabeledExample::new(*t, Label::Related))
            .chain(unrelated.iter().map(|t| LabeledExample::new(*t, Label::Unrelated)))
            .collect()
    }

    #[test]
    fn test_untrained_gate_fails_closed() {
        let gate = IntentGate::new(GateSection::default());
        assert!(!gate.is_trained());
        assert_eq!(gate.predict("What are your store hours?"), Label::Unrelated);
    }

    #[test]
    fn test_empty_corpus_fails_closed() {
        let gate = IntentGate::from_corpus(GateSection::default(), &[]);
        assert_eq!(gate.predict("anything at all"), Label::Unrelated);
    }

    #[test]
    fn test_store_hours_scenario() {
        let gate = IntentGate::from_corpus(GateSection::default(), &store_corpus());
        assert_eq!(gate.predict("Do you have hours on weekends?"), Label::Related);
        assert_eq!(gate.predict("What's the weather like?"), Label::Unrelated);
    }

    #[test]
    fn test_training_is_deterministic() {
        let corpus = larger_corpus();
        let (a, report_a) = Classifier::train(&corpus, &GateSection::default()).unwrap();
        let (b, report_b) = Classifier::train(&corpus, &GateSection::default()).unwrap();
        assert_eq!(report_a, report_b);

        let probes = [
            "store hours on sunday",
            "weather tomorrow",
            "gift cards for shoes",
            "capital of spain",
            "",
        ];
        for probe in probes {
            assert_eq!(a.predict(probe), b.predict(probe), "probe: {probe}");
        }
    }

    #[test]
    fn test_split_is_seeded_and_sized() {
        let (train, validation) = train_validation_split(10, 0.2, 42);
        assert_eq!(validation.len(), 2);
        assert_eq!(train.len(), 8);
        assert_eq!(train_validation_split(10, 0.2, 42), (train.clone(), validation.clone()));

        let mut all: Vec<usize> = train.into_iter().chain(validation).collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_one_training_example() {
        assert_eq!(train_validation_split(1, 0.2, 42), (vec![0], vec![]));
        let (train, validation) = train_validation_split(2, 0.9, 42);
        assert_eq!((train.len(), validation.len()), (1, 1));
    }

    #[test]
    fn test_report_reflects_split() {
        let (_, report) = Classifier::train(&larger_corpus(), &GateSection::default()).unwrap();
        assert_eq!(report.corpus_size, 10);
        assert_eq!(report.validation_size, 2);
        assert_eq!(report.train_size, 8);
        assert!(report.accuracy.is_some());
        assert!(!report.per_class.is_empty());
    }

    #[test]
    fn test_retrain_swaps_classifier() {
        let gate = IntentGate::from_corpus(GateSection::default(), &store_corpus());
        let before = gate.snapshot().unwrap();

        let mut corpus = store_corpus();
        corpus.push(LabeledExample::related("Do you ship internationally?"));
        gate.retrain(&corpus);
        let after = gate.snapshot().unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        // 旧快照仍可独立使用
        assert_eq!(before.predict("What's the weather like?"), Label::Unrelated);
        assert_eq!(gate.predict("Do you ship internationally?"), Label::Related);
    }

    #[test]
    fn test_retrain_with_empty_corpus_clears() {
        let gate = IntentGate::from_corpus(GateSection::default(), &store_corpus());
        assert!(gate.retrain(&[]).is_none());
        assert!(!gate.is_trained());
        assert_eq!(gate.predict("What are your store hours?"), Label::Unrelated);
    }

    #[test]
    fn test_concurrent_predictions_during_retrain() {
        let gate = Arc::new(IntentGate::from_corpus(GateSection::default(), &larger_corpus()));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let label = gate.predict("What are your store hours?");
                        assert_eq!(label, Label::Related);
                    }
                })
            })
            .collect();
        for _ in 0..20 {
            gate.retrain(&larger_corpus());
        }
        for r in readers {
            r.join().unwrap();
        }
    }
}
