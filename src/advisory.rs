use serde::Serialize;
use std::fmt;

/// Whether outdoor exercise is advisable at a given PM2.5 level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryLevel {
    Safe,
    Caution,
    Unsafe,
}

impl AdvisoryLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryLevel::Safe => "safe",
            AdvisoryLevel::Caution => "caution",
            AdvisoryLevel::Unsafe => "unsafe",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            AdvisoryLevel::Safe => "Outdoor exercise is fine.",
            AdvisoryLevel::Caution => {
                "Keep outdoor exercise short and light; sensitive groups should train indoors."
            }
            AdvisoryLevel::Unsafe => "Avoid outdoor exercise; move workouts indoors.",
        }
    }
}

impl fmt::Display for AdvisoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Air-quality band of the predicted concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityCategory {
    Good,
    Moderate,
    UnhealthyForSensitiveGroups,
    Unhealthy,
    Hazardous,
}

impl AirQualityCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => "Good",
            AirQualityCategory::Moderate => "Moderate",
            AirQualityCategory::UnhealthyForSensitiveGroups => "Unhealthy for Sensitive Groups",
            AirQualityCategory::Unhealthy => "Unhealthy",
            AirQualityCategory::Hazardous => "Hazardous",
        }
    }

    pub fn health_advice(&self) -> &'static str {
        match self {
            AirQualityCategory::Good => {
                "Air quality is excellent. Perfect for outdoor activities."
            }
            AirQualityCategory::Moderate => {
                "Air quality is acceptable. Sensitive groups should consider reducing outdoor activity."
            }
            AirQualityCategory::UnhealthyForSensitiveGroups => {
                "Children, elderly, and people with respiratory conditions should limit outdoor activity."
            }
            AirQualityCategory::Unhealthy => {
                "Everyone may experience health effects. Limit outdoor activity."
            }
            AirQualityCategory::Hazardous => {
                "Health warning of emergency conditions. Avoid all outdoor activity."
            }
        }
    }
}

impl fmt::Display for AirQualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exclusive upper bounds in µg/m³, ascending. A value belongs to the first
/// row whose bound it is below; anything else (including NaN) falls into
/// the last band.
///
/// Bands are wide relative to the model's ~45 µg/m³ MAE.
pub const LEVEL_BOUNDS: [(f64, AdvisoryLevel); 2] = [
    (55.0, AdvisoryLevel::Safe),
    (150.0, AdvisoryLevel::Caution),
];

pub const CATEGORY_BOUNDS: [(f64, AirQualityCategory); 4] = [
    (12.0, AirQualityCategory::Good),
    (35.0, AirQualityCategory::Moderate),
    (55.0, AirQualityCategory::UnhealthyForSensitiveGroups),
    (150.0, AirQualityCategory::Unhealthy),
];

fn band<T: Copy>(pm25: f64, bounds: &[(f64, T)], last: T) -> T {
    bounds
        .iter()
        .find(|(upper, _)| pm25 < *upper)
        .map(|(_, v)| *v)
        .unwrap_or(last)
}

pub fn level_for(pm25: f64) -> AdvisoryLevel {
    band(pm25, &LEVEL_BOUNDS, AdvisoryLevel::Unsafe)
}

pub fn category_for(pm25: f64) -> AirQualityCategory {
    band(pm25, &CATEGORY_BOUNDS, AirQualityCategory::Hazardous)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub recommendation: &'static str,
    pub category: AirQualityCategory,
    pub health_advice: &'static str,
}

/// Maps a PM2.5 value to its advisory. Total over all `f64`.
pub fn advise(pm25: f64) -> Advisory {
    let level = level_for(pm25);
    let category = category_for(pm25);
    Advisory {
        level,
        recommendation: level.recommendation(),
        category,
        health_advice: category.health_advice(),
    }
}

/// Traffic-based hint for the requested hour of day.
pub fn outdoor_timing_tip(hour: u32) -> &'static str {
    if hour < 10 || hour > 18 {
        "Current hour is good (away from rush hours)"
    } else {
        "Consider early morning or evening (less traffic pollution)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_examples() {
        assert_eq!(advise(40.0).level, AdvisoryLevel::Safe);
        assert_eq!(advise(160.0).level, AdvisoryLevel::Unsafe);
        assert_eq!(advise(160.0).category, AirQualityCategory::Hazardous);
        assert_eq!(advise(80.0).level, AdvisoryLevel::Caution);
    }

    #[test]
    fn boundaries_belong_to_the_upper_band() {
        assert_eq!(level_for(54.999), AdvisoryLevel::Safe);
        assert_eq!(level_for(55.0), AdvisoryLevel::Caution);
        assert_eq!(level_for(149.999), AdvisoryLevel::Caution);
        assert_eq!(level_for(150.0), AdvisoryLevel::Unsafe);

        assert_eq!(category_for(11.9), AirQualityCategory::Good);
        assert_eq!(category_for(12.0), AirQualityCategory::Moderate);
        assert_eq!(category_for(35.0), AirQualityCategory::UnhealthyForSensitiveGroups);
        assert_eq!(category_for(55.0), AirQualityCategory::Unhealthy);
        assert_eq!(category_for(150.0), AirQualityCategory::Hazardous);
    }

    #[test]
    fn tables_are_strictly_ascending() {
        assert!(LEVEL_BOUNDS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(CATEGORY_BOUNDS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn levels_are_monotonic_over_a_sweep() {
        let rank = |l: AdvisoryLevel| l as u8;
        let mut prev = rank(level_for(-1000.0));
        let mut x = -1000.0;
        while x < 1000.0 {
            let r = rank(level_for(x));
            assert!(r >= prev, "level dropped at {x}");
            prev = r;
            x += 0.25;
        }
    }

    #[test]
    fn every_value_gets_exactly_one_level() {
        for v in [
            f64::NEG_INFINITY,
            f64::MIN,
            -0.0,
            0.0,
            f64::MAX,
            f64::INFINITY,
            f64::NAN,
        ] {
            let a = advise(v);
            assert_eq!(a.recommendation, a.level.recommendation());
        }
        assert_eq!(level_for(f64::NEG_INFINITY), AdvisoryLevel::Safe);
        assert_eq!(level_for(f64::INFINITY), AdvisoryLevel::Unsafe);
        assert_eq!(level_for(f64::NAN), AdvisoryLevel::Unsafe);
    }

    #[test]
    fn rush_hour_tip() {
        assert!(outdoor_timing_tip(7).starts_with("Current hour is good"));
        assert!(outdoor_timing_tip(19).starts_with("Current hour is good"));
        assert!(outdoor_timing_tip(10).starts_with("Consider"));
        assert!(outdoor_timing_tip(18).starts_with("Consider"));
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_value(advise(20.0)).unwrap();
        assert_eq!(json["level"], "safe");
        assert_eq!(json["category"], "moderate");
    }
}
