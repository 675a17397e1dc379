//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `GATE__*` 覆盖（双下划线表示嵌套，如 `GATE__GATE__SEED=7`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub gate: GateSection,
    #[serde(default)]
    pub dispatch: DispatchSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub web: WebSection,
}

/// [app] 段：应用名
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [gate] 段：意图闸门训练参数
#[derive(Debug, Clone, Deserialize)]
pub struct GateSection {
    /// 反馈语料文件（JSON 数组，每条 {question, label}）
    #[serde(default = "default_corpus_path")]
    pub corpus_path: PathBuf,
    /// 训练/验证划分的随机种子；相同语料 + 相同种子 => 相同划分
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// 验证集比例，仅用于输出质量报告
    #[serde(default = "default_validation_ratio")]
    pub validation_ratio: f64,
    /// 朴素贝叶斯加性平滑系数
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("related.json")
}

fn default_seed() -> u64 {
    42
}

fn default_validation_ratio() -> f64 {
    0.2
}

fn default_alpha() -> f64 {
    1.0
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            seed: default_seed(),
            validation_ratio: default_validation_ratio(),
            alpha: default_alpha(),
        }
    }
}

/// [dispatch] 段：外部调用超时与任务模板
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// TaskExecutor 单次执行超时（秒）
    #[serde(default = "default_executor_timeout")]
    pub executor_timeout_secs: u64,
    /// Completion 单次调用超时（秒）
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,
    #[serde(default = "default_expected_output")]
    pub expected_output: String,
}

fn default_executor_timeout() -> u64 {
    60
}

fn default_completion_timeout() -> u64 {
    60
}

fn default_expected_output() -> String {
    "A personalized response to the user's request.".to_string()
}

impl Default for DispatchSection {
    fn default() -> Self {
        Self {
            executor_timeout_secs: default_executor_timeout(),
            completion_timeout_secs: default_completion_timeout(),
            expected_output: default_expected_output(),
        }
    }
}

/// [session] 段：反馈关键字、固定话术、会话过期
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSection {
    /// 整条消息等于该关键字（忽略大小写）时进入反馈流程
    #[serde(default = "default_feedback_keyword")]
    pub feedback_keyword: String,
    /// 判定为 unrelated 时的固定拒答
    #[serde(default = "default_refusal_message")]
    pub refusal_message: String,
    #[serde(default = "default_feedback_ack")]
    pub feedback_ack: String,
    /// 会话空闲多久后可被清理（秒）
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_feedback_keyword() -> String {
    "feedback".to_string()
}

fn default_refusal_message() -> String {
    "Sorry, I can only answer questions related to our store and our products.".to_string()
}

fn default_feedback_ack() -> String {
    "Thank you for your feedback!".to_string()
}

fn default_idle_timeout() -> u64 {
    3600
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            feedback_keyword: default_feedback_keyword(),
            refusal_message: default_refusal_message(),
            feedback_ack: default_feedback_ack(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

/// [llm] 段：后端选择
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：openai / mock；openai 需要 OPENAI_API_KEY
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
        }
    }
}

/// [web] 段：HTTP 入口
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8910
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 GATE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 GATE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("GATE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.gate.seed, 42);
        assert!((cfg.gate.validation_ratio - 0.2).abs() < f64::EPSILON);
        assert!((cfg.gate.alpha - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.session.feedback_keyword, "feedback");
        assert_eq!(cfg.web.port, 8910);
    }

    #[test]
    fn test_partial_toml_keeps_field_defaults() {
        let cfg: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "[gate]\nseed = 7\n[session]\nrefusal_message = \"out of domain\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.gate.seed, 7);
        assert!((cfg.gate.alpha - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.session.refusal_message, "out of domain");
        assert_eq!(cfg.session.feedback_keyword, "feedback");
    }
}
