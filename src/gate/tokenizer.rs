//! 分词与 n-gram 展开
//!
//! 英文按 `\b\w\w+\b` 取词（小写、丢弃单字符）；含 CJK 字符时先用 jieba-rs 切词，
//! 中文词保留（单字也保留），其余片段再走正则。最后展开为 unigram + bigram。

use std::sync::OnceLock;

use jieba_rs::Jieba;
use regex::Regex;

/// 全局 Jieba 实例（延迟初始化）
static JIEBA: OnceLock<Jieba> = OnceLock::new();

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn get_jieba() -> &'static Jieba {
    JIEBA.get_or_init(Jieba::new)
}

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static token pattern"))
}

/// 判断字符是否为 CJK（中日韩）字符
fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |   // CJK Unified Ideographs
        '\u{3400}'..='\u{4DBF}' |   // CJK Unified Ideographs Extension A
        '\u{F900}'..='\u{FAFF}' |   // CJK Compatibility Ideographs
        '\u{3040}'..='\u{309F}' |   // Hiragana
        '\u{30A0}'..='\u{30FF}'     // Katakana
    )
}

/// 判断文本是否包含 CJK 字符
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(is_cjk)
}

/// 小写分词，保持原文顺序（bigram 依赖顺序）
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return Vec::new();
    }

    if !contains_cjk(&lower) {
        return token_re()
            .find_iter(&lower)
            .map(|m| m.as_str().to_string())
            .collect();
    }

    let mut tokens = Vec::new();
    for piece in get_jieba().cut(&lower, true) {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        if piece.chars().all(is_cjk) {
            tokens.push(piece.to_string());
        } else {
            tokens.extend(token_re().find_iter(piece).map(|m| m.as_str().to_string()));
        }
    }
    tokens
}

/// 展开为 [min_n, max_n] 范围内的 n-gram，n-gram 内部以单个空格连接
pub fn ngrams(tokens: &[String], min_n: usize, max_n: usize) -> Vec<String> {
    let mut out = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        out.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    out
}

/// 闸门使用的特征词：unigram + bigram
pub fn analyze(text: &str) -> Vec<String> {
    ngrams(&tokenize(text), 1, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_english_drops_single_chars() {
        let tokens = tokenize("What's the weather?");
        assert_eq!(tokens, vec!["what", "the", "weather"]);
    }

    #[test]
    fn test_tokenize_chinese() {
        let tokens = tokenize("我喜欢编程和人工智能");
        assert!(!tokens.is_empty());
        assert!(tokens.iter().any(|t| t.contains("编程") || t.contains("智能")));
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("我喜欢 Rust 编程语言");
        assert!(tokens.iter().any(|t| t == "rust"));
    }

    #[test]
    fn test_analyze_unigrams_then_bigrams() {
        let terms = analyze("Store hours today");
        assert_eq!(
            terms,
            vec!["store", "hours", "today", "store hours", "hours today"]
        );
    }

    #[test]
    fn test_ngrams_short_input() {
        let tokens = vec!["hours".to_string()];
        assert_eq!(ngrams(&tokens, 1, 2), vec!["hours"]);
        assert!(ngrams(&[], 1, 2).is_empty());
    }
}
