//! Time-related utilities.
//!
//! Every envelope exchanged by the gateway carries an ISO-8601 UTC timestamp with
//! millisecond precision, e.g. `2026-10-19T08:00:00.000Z`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format an instant as ISO-8601 (RFC 3339, UTC, milliseconds, `Z` suffix)
pub fn to_iso8601(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current instant formatted as ISO-8601
pub fn now_iso8601() -> String {
    to_iso8601(&Utc::now())
}

/// Current Unix timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_iso8601_format() {
        // テスト項目: ミリ秒精度・Z サフィックスの ISO-8601 形式に変換される
        // given (前提条件):
        let instant = DateTime::from_timestamp_millis(1_672_531_200_123).unwrap(); // 2023-01-01T00:00:00.123Z

        // when (操作):
        let result = to_iso8601(&instant);

        // then (期待する結果):
        assert_eq!(result, "2023-01-01T00:00:00.123Z");
    }

    #[test]
    fn test_now_iso8601_is_parseable() {
        // テスト項目: now_iso8601 の出力が RFC 3339 としてパースできる
        // given (前提条件):

        // when (操作):
        let now = now_iso8601();

        // then (期待する結果):
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.ends_with('Z'));
    }

    #[test]
    fn test_now_millis_tracks_wall_clock() {
        // テスト項目: now_millis が現在時刻のミリ秒を返す
        // given (前提条件):
        let before = Utc::now().timestamp_millis();

        // when (操作):
        let now = now_millis();

        // then (期待する結果):
        assert!(now >= before);
        assert!(now - before < 1_000);
    }
}
