/// Renders elapsed seconds as `Xh Ym`. Negative spans render as zero.
pub fn format_duration(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Whole minutes in a second count, rounded down.
pub fn whole_minutes(seconds: i32) -> i32 {
    seconds.max(0) / 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_and_minutes() {
        assert_eq!(format_duration(0), "0h 0m");
        assert_eq!(format_duration(59), "0h 0m");
        assert_eq!(format_duration(3 * 3600 + 5 * 60 + 9), "3h 5m");
        assert_eq!(format_duration(-10), "0h 0m");
    }

    #[test]
    fn minutes_floor() {
        assert_eq!(whole_minutes(119), 1);
        assert_eq!(whole_minutes(-5), 0);
    }
}
