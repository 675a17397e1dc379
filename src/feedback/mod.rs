//! 反馈语料：带标签的样本（question, label）及其持久化
//!
//! 语料是意图闸门训练的唯一来源，只追加不修改。`JsonFeedbackStore` 写入人类可读的 JSON 数组；
//! 读取时文件缺失、编码错误、结构不对一律当作空语料（记 warn 日志），保证闸门在零样本下也能构造。

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::FeedbackError;

/// 意图标签；排序即训练时的类别顺序（平票取 Related）
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Related,
    Unrelated,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Related => "related",
            Label::Unrelated => "unrelated",
        }
    }
}

/// 单条带标签样本；磁盘格式为 `{"question": ..., "label": ...}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledExample {
    #[serde(rename = "question")]
    pub text: String,
    pub label: Label,
}

impl LabeledExample {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }

    /// 反馈纠正只会产生 related 样本
    pub fn related(text: impl Into<String>) -> Self {
        Self::new(text, Label::Related)
    }
}

/// 有序语料（保留插入顺序，便于审计）
pub type FeedbackCorpus = Vec<LabeledExample>;

/// 反馈存储接口
pub trait FeedbackStore: Send + Sync {
    /// 追加一条样本；返回 Ok 时数据已落盘
    fn append(&self, example: &LabeledExample) -> Result<(), FeedbackError>;

    /// 读取全部样本；任何读取/解析问题都降级为空语料
    fn load_all(&self) -> FeedbackCorpus;
}

/// JSON 文件存储：整文件读-改-写，临时文件 + fsync + rename 保证持久
///
/// 读取宽松（load_all 跳过坏记录），追加严格（原样保留所有已有记录，文件损坏时拒绝写入）。
#[derive(Debug)]
pub struct JsonFeedbackStore {
    path: PathBuf,
    /// 串行化同进程内的读-改-写
    write_lock: Mutex<()>,
}

impl JsonFeedbackStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_corpus(&self) -> FeedbackCorpus {
        let data = match fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "feedback corpus unreadable, using empty corpus");
                return Vec::new();
            }
        };
        parse_corpus(&data, &self.path)
    }

    /// 追加路径的严格读取：保留每条原始记录（包括本进程不认识的），文件存在但读不出数组时报错
    fn read_raw_records(&self) -> Result<Vec<serde_json::Value>, FeedbackError> {
        let data = match fs::read(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        let corrupt = |reason: String| FeedbackError::Corrupt {
            path: self.path.display().to_string(),
            reason,
        };
        match serde_json::from_slice::<serde_json::Value>(&data) {
            Ok(serde_json::Value::Array(items)) => Ok(items),
            Ok(_) => Err(corrupt("root is not an array".to_string())),
            Err(e) => Err(corrupt(e.to_string())),
        }
    }

    fn write_durable(&self, records: &[serde_json::Value]) -> Result<(), FeedbackError> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        if let Some(ref dir) = parent {
            fs::create_dir_all(dir)?;
        }

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let body = serde_json::to_string_pretty(records)?;
        {
            let mut f = File::create(&tmp)?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        sync_dir(parent.as_deref().unwrap_or_else(|| Path::new(".")))?;
        Ok(())
    }
}

/// rename 落盘需要 fsync 所在目录
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<(), FeedbackError> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

/// Windows 上目录句柄不能 fsync
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<(), FeedbackError> {
    Ok(())
}

impl FeedbackStore for JsonFeedbackStore {
    fn append(&self, example: &LabeledExample) -> Result<(), FeedbackError> {
        if example.text.trim().is_empty() {
            return Err(FeedbackError::EmptyText);
        }
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = self.read_raw_records()?;
        records.push(serde_json::to_value(example)?);
        self.write_durable(&records)?;
        tracing::info!(
            path = %self.path.display(),
            label = example.label.as_str(),
            total = records.len(),
            "feedback example appended"
        );
        Ok(())
    }

    fn load_all(&self) -> FeedbackCorpus {
        self.read_corpus()
    }
}

/// 解析语料文本：根必须是数组，单条坏记录跳过，空文本记录丢弃
fn parse_corpus(data: &str, source: &Path) -> FeedbackCorpus {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %source.display(), error = %e, "feedback corpus is not valid JSON, using empty corpus");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(items) = value else {
        tracing::warn!(path = %source.display(), "feedback corpus root is not an array, using empty corpus");
        return Vec::new();
    };

    let total = items.len();
    let corpus: FeedbackCorpus = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<LabeledExample>(item).ok())
        .filter(|ex| !ex.text.trim().is_empty())
        .collect();
    if corpus.len() < total {
        tracing::warn!(
            path = %source.display(),
            skipped = total - corpus.len(),
            "skipped malformed feedback records"
        );
    }
    corpus
}

/// 内存存储：测试与临时运行用，进程结束即丢失
#[derive(Debug, Default)]
pub struct MemoryFeedbackStore {
    examples: Mutex<FeedbackCorpus>,
}

impl MemoryFeedbackStore {
    pub fn new(seed: FeedbackCorpus) -> Self {
        Self {
            examples: Mutex::new(seed),
        }
    }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn append(&self, example: &LabeledExample) -> Result<(), FeedbackError> {
        if example.text.trim().is_empty() {
            return Err(FeedbackError::EmptyText);
        }
        self.examples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(example.clone());
        Ok(())
    }

    fn load_all(&self) -> FeedbackCorpus {
        self.examples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
