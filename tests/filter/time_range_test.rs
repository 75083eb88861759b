#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use semlayer::filter::time_range::resolve_date_range;
    use semlayer::input::DateRangeInput;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_single_date_is_one_full_day() {
        let (start, end) = resolve_date_range(&DateRangeInput::Single("2026-03-10".into()), now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_absolute_range_rejects_inverted_bounds() {
        let result = resolve_date_range(
            &DateRangeInput::Absolute("2026-03-15".into(), "2026-03-01".into()),
            now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_absolute_range_with_bare_dates_is_half_open() {
        let (start, end) = resolve_date_range(
            &DateRangeInput::Absolute("2026-03-01".into(), "2026-03-05".into()),
            now(),
        )
        .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        // end is exclusive of the named end date's own day per the [start, end) contract
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_relative_today_brackets_the_current_day() {
        let (start, end) = resolve_date_range(&DateRangeInput::Relative("today".into()), now()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_relative_last_30_days_ends_at_today() {
        let (start, end) = resolve_date_range(&DateRangeInput::Relative("last 30 days".into()), now()).unwrap();
        assert!(start < end);
        assert_eq!((end - start).num_days(), 30);
    }

    #[test]
    fn test_unknown_relative_phrase_errors() {
        let result = resolve_date_range(&DateRangeInput::Relative("fortnight".into()), now());
        assert!(result.is_err());
    }
}
