use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

/// 标题最大字符数（与后端截断长度保持一致）
pub const TITLE_MAX_CHARS: usize = 50;

/// 解析时间戳字符串
///
/// 后端返回不带时区的 UTC 时间（如 `2025-07-12T10:00:00.123456`），
/// 同时兼容带时区偏移的 RFC 3339 格式
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// 时间戳反序列化函数
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("无法解析时间戳: {}", s)))
}

/// 可选时间戳反序列化函数（支持 null 值）
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    // 先尝试反序列化为 Option<String>，以支持 null 值
    let opt_s: Option<String> = Deserialize::deserialize(deserializer)?;
    match opt_s {
        Some(s) if !s.is_empty() => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无法解析时间戳: {}", s))),
        _ => Ok(None),
    }
}

/// 根据首条消息生成会话标题：取前 50 个字符
pub fn derive_title(text: &str) -> String {
    text.chars().take(TITLE_MAX_CHARS).collect()
}
