use std::collections::BTreeMap;

use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

// 1.0 = safest area of its city, 10.0 = most dangerous
pub const MIN_DANGER: f64 = 1.0;
pub const MAX_DANGER: f64 = 10.0;

/// One incident report. Every record counts as one incident for its area.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Observation {
    pub city: String,
    pub area_name: String,
    pub lighting_quality_score: f64,
    pub uptime_ratio: f64,
}

/// Per-area aggregate with its city-relative danger score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaProfile {
    pub city: String,
    pub area_name: String,
    pub crime_count: usize,
    pub lighting_quality_mean: f64,
    /// Aggregated but not part of the composite.
    pub uptime_mean: f64,
    pub danger_score: f64,
}

/// Weights of the composite before the final rescale.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub crime_weight: f64,
    pub lighting_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            crime_weight: 0.7,
            lighting_weight: 0.3,
        }
    }
}

#[derive(Default)]
struct AreaTotals {
    count: usize,
    lighting_sum: f64,
    uptime_sum: f64,
}

/// Min-max scales `values` into [0, 1]. A flat series (including a single
/// value) maps to all zeros.
pub fn normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = match values.iter().copied().minmax() {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(min, max) => (min, max),
    };

    if max == min {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Aggregates observations per (city, area) and scores every area relative
/// to the other areas of its city.
///
/// Output is ordered by city, then area name, so repeated runs over the same
/// observations are bit-identical.
pub fn score_areas(observations: &[Observation], weights: &ScoreWeights) -> Vec<AreaProfile> {
    let mut totals: BTreeMap<&str, BTreeMap<&str, AreaTotals>> = BTreeMap::new();
    for obs in observations {
        let area = totals
            .entry(obs.city.as_str())
            .or_default()
            .entry(obs.area_name.as_str())
            .or_default();
        area.count += 1;
        area.lighting_sum += obs.lighting_quality_score;
        area.uptime_sum += obs.uptime_ratio;
    }

    let mut profiles = Vec::with_capacity(totals.values().map(BTreeMap::len).sum());
    for (city, areas) in totals {
        profiles.extend(score_city(city, &areas, weights));
    }

    log::info!(
        "Scored {} areas from {} observations",
        profiles.len(),
        observations.len()
    );
    profiles
}

fn score_city(
    city: &str,
    areas: &BTreeMap<&str, AreaTotals>,
    weights: &ScoreWeights,
) -> Vec<AreaProfile> {
    let crime_counts: Vec<f64> = areas.values().map(|a| a.count as f64).collect();
    let lighting_means: Vec<f64> = areas
        .values()
        .map(|a| a.lighting_sum / a.count as f64)
        .collect();

    let crime_norm = normalize(&crime_counts);
    let lighting_norm = normalize(&lighting_means);

    // Poor lighting raises danger, so its normalized value is inverted.
    let composite: Vec<f64> = crime_norm
        .iter()
        .zip(&lighting_norm)
        .map(|(crime, lighting)| {
            weights.crime_weight * crime + weights.lighting_weight * (1.0 - lighting)
        })
        .collect();
    let scaled = normalize(&composite);

    areas
        .iter()
        .zip(lighting_means)
        .zip(scaled)
        .map(|(((name, totals), lighting_mean), scale)| AreaProfile {
            city: city.to_string(),
            area_name: (*name).to_string(),
            crime_count: totals.count,
            lighting_quality_mean: lighting_mean,
            uptime_mean: totals.uptime_sum / totals.count as f64,
            danger_score: MIN_DANGER + (MAX_DANGER - MIN_DANGER) * scale,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(city: &str, area: &str, lighting: f64, uptime: f64) -> Observation {
        Observation {
            city: city.to_string(),
            area_name: area.to_string(),
            lighting_quality_score: lighting,
            uptime_ratio: uptime,
        }
    }

    fn sample() -> Vec<Observation> {
        vec![
            obs("Delhi", "Karol Bagh", 2.0, 0.9),
            obs("Delhi", "Karol Bagh", 4.0, 0.7),
            obs("Delhi", "Karol Bagh", 3.0, 0.8),
            obs("Delhi", "Saket", 8.0, 0.95),
            obs("Delhi", "Dwarka", 6.0, 0.99),
            obs("Delhi", "Dwarka", 5.0, 0.97),
            obs("Kochi", "Fort Kochi", 7.0, 0.9),
            obs("Kochi", "Edappally", 7.0, 0.6),
            obs("Mumbai", "Bandra", 5.0, 0.5),
        ]
    }

    fn find<'a>(profiles: &'a [AreaProfile], city: &str, area: &str) -> &'a AreaProfile {
        profiles
            .iter()
            .find(|p| p.city == city && p.area_name == area)
            .unwrap()
    }

    #[test]
    fn normalize_bounds() {
        let out = normalize(&[3.0, 1.0, 2.0, 5.0]);
        assert_eq!(out, vec![0.5, 0.0, 0.25, 1.0]);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn normalize_flat_series_is_zero() {
        assert_eq!(normalize(&[4.2, 4.2, 4.2]), vec![0.0, 0.0, 0.0]);
        assert_eq!(normalize(&[7.0]), vec![0.0]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn aggregates_counts_and_means() {
        let profiles = score_areas(&sample(), &ScoreWeights::default());
        assert_eq!(profiles.len(), 6);

        let karol = find(&profiles, "Delhi", "Karol Bagh");
        assert_eq!(karol.crime_count, 3);
        assert!((karol.lighting_quality_mean - 3.0).abs() < 1e-12);
        assert!((karol.uptime_mean - 0.8).abs() < 1e-12);
    }

    #[test]
    fn scores_span_one_to_ten_per_city() {
        let profiles = score_areas(&sample(), &ScoreWeights::default());
        let delhi: Vec<f64> = profiles
            .iter()
            .filter(|p| p.city == "Delhi")
            .map(|p| p.danger_score)
            .collect();

        let min = delhi.iter().copied().fold(f64::INFINITY, f64::min);
        let max = delhi.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(min, MIN_DANGER);
        assert_eq!(max, MAX_DANGER);

        // most incidents and the worst lighting
        assert_eq!(find(&profiles, "Delhi", "Karol Bagh").danger_score, MAX_DANGER);
        // one incident and the best lighting
        assert_eq!(find(&profiles, "Delhi", "Saket").danger_score, MIN_DANGER);
        let dwarka = find(&profiles, "Delhi", "Dwarka").danger_score;
        assert!(dwarka > MIN_DANGER && dwarka < MAX_DANGER);
    }

    #[test]
    fn flat_city_and_single_area_city_score_one() {
        let profiles = score_areas(&sample(), &ScoreWeights::default());
        // Kochi: same count, same lighting
        assert_eq!(find(&profiles, "Kochi", "Fort Kochi").danger_score, 1.0);
        assert_eq!(find(&profiles, "Kochi", "Edappally").danger_score, 1.0);
        assert_eq!(find(&profiles, "Mumbai", "Bandra").danger_score, 1.0);
    }

    #[test]
    fn uptime_does_not_move_the_score() {
        let base = score_areas(&sample(), &ScoreWeights::default());
        let shifted: Vec<Observation> = sample()
            .into_iter()
            .map(|mut o| {
                o.uptime_ratio = 1.0 - o.uptime_ratio;
                o
            })
            .collect();
        let other = score_areas(&shifted, &ScoreWeights::default());
        for (a, b) in base.iter().zip(&other) {
            assert_eq!(a.danger_score, b.danger_score);
        }
    }

    #[test]
    fn scores_are_relative_to_city() {
        // Delhi's safest area reports far more incidents than Mumbai's only area
        let mut input = sample();
        for _ in 0..50 {
            input.push(obs("Delhi", "Saket", 8.0, 0.95));
        }
        let profiles = score_areas(&input, &ScoreWeights::default());
        assert_eq!(find(&profiles, "Mumbai", "Bandra").danger_score, 1.0);
        assert_eq!(find(&profiles, "Delhi", "Saket").danger_score, MAX_DANGER);
    }

    #[test]
    fn idempotent() {
        let input = sample();
        let first = score_areas(&input, &ScoreWeights::default());
        let second = score_areas(&input, &ScoreWeights::default());
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.danger_score.to_bits(), b.danger_score.to_bits());
            assert_eq!(a.lighting_quality_mean.to_bits(), b.lighting_quality_mean.to_bits());
            assert_eq!(a.uptime_mean.to_bits(), b.uptime_mean.to_bits());
            assert_eq!(a, b);
        }
    }

    #[test]
    fn empty_input_yields_no_profiles() {
        assert!(score_areas(&[], &ScoreWeights::default()).is_empty());
    }
}
