use chrono::TimeDelta;

/// Human-readable duration, e.g. `45 minutes`, `1 hour`, `2 hours and 5 minutes`.
pub fn format_duration(duration: TimeDelta) -> String {
    let total = duration.num_minutes().max(0);
    let hours = total / 60;
    let minutes = total % 60;

    match (hours, minutes) {
        (0, m) => plural(m, "minute"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} and {}", plural(h, "hour"), plural(m, "minute")),
    }
}

/// Whole minutes, e.g. `1 minute`, `17 minutes`. Negative durations read as zero.
pub fn format_minutes(duration: TimeDelta) -> String {
    plural(duration.num_minutes().max(0), "minute")
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{} {}", n, unit)
    } else {
        format!("{} {}s", n, unit)
    }
}
