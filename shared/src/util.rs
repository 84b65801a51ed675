/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// 当前 UTC 时间，RFC 3339 毫秒精度 (`2025-01-01T00:00:00.000Z`)
///
/// Used for `archivedAt` / `updated_at` stamps on written documents.
pub fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_iso_format() {
        let stamp = now_iso();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());
        assert!(now_millis() > 1_700_000_000_000);
    }
}
