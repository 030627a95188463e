//! Aggregation of 3-hour forecast samples into daily buckets
//!
//! Used when only a coarse 5 day / 3 hour series is available. Samples are
//! grouped by the provider's local calendar date string; each bucket yields the
//! temperature spread, averaged humidity/pressure/wind, and the most frequent icon.

/// Maximum number of days produced
pub const MAX_DAYS: usize = 7;

/// Icon code used when no sample in a bucket carried one
pub const DEFAULT_ICON_CODE: &str = "01d";

/// One 3-hour forecast sample, values in a single unit system
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Calendar date, "YYYY-MM-DD"
    pub day: String,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind: f64,
    pub icon: Option<String>,
    pub description: String,
}

/// Aggregated values for one calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub day: String,
    pub temp_min: f64,
    pub temp_max: f64,
    /// Arithmetic mean of the samples
    pub temp_day: f64,
    pub humidity: u8,
    pub pressure: i32,
    pub wind: f64,
    /// Mode icon code, first seen wins ties
    pub icon: String,
    /// Description of the first sample showing `icon`
    pub description: String,
}

/// Groups samples by day and reduces each group to a `DayBucket`
///
/// Days come out in ascending date order, capped at `MAX_DAYS`. Fewer days in
/// the input means fewer buckets; nothing is padded.
pub fn bucket_by_day(samples: &[Sample]) -> Vec<DayBucket> {
    let mut groups: Vec<(&str, Vec<&Sample>)> = Vec::new();
    for sample in samples {
        match groups.iter_mut().find(|(day, _)| *day == sample.day) {
            Some((_, members)) => members.push(sample),
            None => groups.push((sample.day.as_str(), vec![sample])),
        }
    }

    groups.sort_by(|a, b| a.0.cmp(b.0));

    groups
        .into_iter()
        .take(MAX_DAYS)
        .map(|(day, members)| reduce_day(day, &members))
        .collect()
}

fn reduce_day(day: &str, members: &[&Sample]) -> DayBucket {
    let temps: Vec<f64> = members.iter().map(|s| s.temp).collect();
    let temp_min = temps.iter().copied().fold(f64::INFINITY, f64::min);
    let temp_max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let icon = mode_icon(members);
    let description = members
        .iter()
        .find(|s| s.icon.as_deref() == Some(icon.as_str()))
        .map(|s| s.description.clone())
        .unwrap_or_default();

    DayBucket {
        day: day.to_string(),
        temp_min,
        temp_max,
        temp_day: mean(&temps),
        humidity: super::round_half_up(mean_of(members, |s| s.humidity)).clamp(0, 100) as u8,
        pressure: super::round_half_up(mean_of(members, |s| s.pressure)) as i32,
        wind: mean_of(members, |s| s.wind),
        icon,
        description,
    }
}

/// Most frequent icon code; ties go to the code seen first
fn mode_icon(members: &[&Sample]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for icon in members.iter().filter_map(|s| s.icon.as_deref()) {
        match counts.iter_mut().find(|(code, _)| *code == icon) {
            Some((_, count)) => *count += 1,
            None => counts.push((icon, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (code, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((code, count));
        }
    }

    best.map(|(code, _)| code.to_string())
        .unwrap_or_else(|| DEFAULT_ICON_CODE.to_string())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_of(members: &[&Sample], field: impl Fn(&Sample) -> f64) -> f64 {
    let values: Vec<f64> = members.iter().map(|s| field(*s)).collect();
    mean(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(day: &str, temp: f64, icon: &str) -> Sample {
        Sample {
            day: day.to_string(),
            temp,
            humidity: 60.0,
            pressure: 1012.0,
            wind: 3.0,
            icon: Some(icon.to_string()),
            description: format!("desc {}", icon),
        }
    }

    #[test]
    fn test_two_days_of_samples_split_four_and_four() {
        let temps = [20.0, 22.0, 25.0, 24.0, 19.0, 18.0, 17.0, 16.0];
        let icons = ["01d", "02d", "02d", "01d", "10d", "10d", "04d", "10d"];
        let samples: Vec<Sample> = temps
            .iter()
            .zip(icons.iter())
            .enumerate()
            .map(|(i, (t, icon))| {
                let day = if i < 4 { "2024-07-15" } else { "2024-07-16" };
                sample(day, *t, icon)
            })
            .collect();

        let days = bucket_by_day(&samples);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "2024-07-15");
        assert_eq!(days[0].temp_min, 20.0);
        assert_eq!(days[0].temp_max, 25.0);
        assert!((days[0].temp_day - 22.75).abs() < 1e-9);
        // 01d and 02d both appear twice; 01d was seen first
        assert_eq!(days[0].icon, "01d");
        assert_eq!(days[0].description, "desc 01d");

        assert_eq!(days[1].temp_min, 16.0);
        assert_eq!(days[1].temp_max, 19.0);
        assert_eq!(days[1].icon, "10d");
    }

    #[test]
    fn test_mode_icon_prefers_most_frequent() {
        let samples = vec![
            sample("2024-07-15", 10.0, "04d"),
            sample("2024-07-15", 11.0, "10d"),
            sample("2024-07-15", 12.0, "10d"),
        ];

        let days = bucket_by_day(&samples);

        assert_eq!(days[0].icon, "10d");
    }

    #[test]
    fn test_missing_icons_fall_back_to_default() {
        let mut s = sample("2024-07-15", 10.0, "x");
        s.icon = None;

        let days = bucket_by_day(&[s]);

        assert_eq!(days[0].icon, DEFAULT_ICON_CODE);
        assert_eq!(days[0].description, "");
    }

    #[test]
    fn test_humidity_and_pressure_are_rounded_means() {
        let mut a = sample("2024-07-15", 10.0, "01d");
        let mut b = sample("2024-07-15", 12.0, "01d");
        a.humidity = 60.0;
        b.humidity = 65.0;
        a.pressure = 1010.0;
        b.pressure = 1013.0;
        a.wind = 2.0;
        b.wind = 3.0;

        let days = bucket_by_day(&[a, b]);

        assert_eq!(days[0].humidity, 63); // 62.5 rounds up
        assert_eq!(days[0].pressure, 1012); // 1011.5 rounds up
        assert!((days[0].wind - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_caps_at_seven_days() {
        let samples: Vec<Sample> = (1..=9)
            .map(|d| sample(&format!("2024-07-{:02}", d), 10.0, "01d"))
            .collect();

        let days = bucket_by_day(&samples);

        assert_eq!(days.len(), MAX_DAYS);
        assert_eq!(days[0].day, "2024-07-01");
        assert_eq!(days[6].day, "2024-07-07");
    }

    #[test]
    fn test_fewer_days_are_not_padded() {
        let samples = vec![
            sample("2024-07-15", 10.0, "01d"),
            sample("2024-07-16", 11.0, "01d"),
            sample("2024-07-17", 12.0, "01d"),
        ];

        let days = bucket_by_day(&samples);

        assert_eq!(days.len(), 3);
    }

    #[test]
    fn test_days_come_out_in_ascending_order() {
        let samples = vec![
            sample("2024-07-16", 10.0, "01d"),
            sample("2024-07-15", 11.0, "01d"),
            sample("2024-07-16", 12.0, "01d"),
        ];

        let days = bucket_by_day(&samples);

        assert_eq!(days[0].day, "2024-07-15");
        assert_eq!(days[1].day, "2024-07-16");
        assert_eq!(days[1].temp_max, 12.0);
    }

    #[test]
    fn test_empty_input_yields_no_days() {
        assert!(bucket_by_day(&[]).is_empty());
    }
}
