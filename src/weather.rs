//! Weather presentation: Celsius conversion and condition icons.

use crate::model::WeatherState;

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Converts a reading to Celsius. Units mentioning Fahrenheit are converted, anything
/// else is taken as Celsius already.
pub fn to_celsius(temperature: f64, unit: &str) -> f64 {
    let unit = unit.trim().to_lowercase();
    if unit.ends_with('f') || unit.contains("fahrenheit") {
        fahrenheit_to_celsius(temperature)
    } else {
        temperature
    }
}

/// Icon for a weather condition, or an empty string for unknown conditions.
pub fn condition_icon(condition: &str) -> &'static str {
    match condition.trim().to_lowercase().as_str() {
        "clear-night" => "🌙",
        "cloudy" => "☁️",
        "exceptional" => "⚠️",
        "fog" => "🌫️",
        "hail" => "🌨️",
        "lightning" => "🌩️",
        "lightning-rainy" => "⛈️",
        "partlycloudy" => "⛅",
        "pouring" => "🌧️",
        "rainy" => "🌦️",
        "snowy" => "❄️",
        "snowy-rainy" => "🌨️",
        "sunny" => "☀️",
        "windy" | "windy-variant" => "💨",
        _ => "",
    }
}

/// What the weather overlay shows.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct WeatherDisplay {
    pub icon: &'static str,
    pub condition: String,
    /// Rounded Celsius, if the source reported a temperature.
    pub temperature_celsius: Option<i64>,
}

impl WeatherDisplay {
    pub fn from_state(state: &WeatherState) -> Self {
        Self {
            icon: condition_icon(&state.condition),
            condition: state.condition.clone(),
            temperature_celsius: state
                .temperature
                .filter(|t| t.is_finite())
                .map(|t| to_celsius(t, &state.temperature_unit).round() as i64),
        }
    }

    /// Single-line label, e.g. "☀️ 21°C".
    pub fn label(&self) -> String {
        let temperature = self.temperature_celsius.map(|t| format!("{}°C", t));
        match (self.icon.is_empty(), temperature) {
            (false, Some(t)) => format!("{} {}", self.icon, t),
            (true, Some(t)) => t,
            (false, None) => self.icon.to_string(),
            (true, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(condition: &str, temperature: Option<f64>, unit: &str) -> WeatherState {
        WeatherState { condition: condition.to_string(), temperature, temperature_unit: unit.to_string() }
    }

    #[test]
    fn hundred_fahrenheit_displays_as_38() {
        let display = WeatherDisplay::from_state(&state("sunny", Some(100.0), "°F"));
        assert_eq!(display.temperature_celsius, Some(38));
        assert_eq!(display.label(), "☀️ 38°C");
    }

    #[test]
    fn celsius_passes_through() {
        assert_eq!(to_celsius(21.4, "°C"), 21.4);
        assert_eq!(WeatherDisplay::from_state(&state("rainy", Some(-3.6), "°C")).temperature_celsius, Some(-4));
    }

    #[test]
    fn freezing_point_converts_exactly() {
        assert_eq!(fahrenheit_to_celsius(32.0), 0.0);
        assert_eq!(to_celsius(212.0, "F"), 100.0);
    }

    #[test]
    fn unknown_condition_has_no_icon() {
        let display = WeatherDisplay::from_state(&state("volcanic-ash", Some(10.0), "°C"));
        assert_eq!(display.icon, "");
        assert_eq!(display.label(), "10°C");
    }

    #[test]
    fn missing_temperature_shows_icon_only() {
        assert_eq!(WeatherDisplay::from_state(&state("cloudy", None, "°C")).label(), "☁️");
    }
}
