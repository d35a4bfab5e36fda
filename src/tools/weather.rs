//! Simulated weather, a demo tool with no external service behind it.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;

use super::{one_of, required_text, ToolOutput, ToolSpec};
use crate::error::Result;

pub const NAME: &str = "weather";

const CONDITIONS: [&str; 5] = ["Sunny", "Partly Cloudy", "Cloudy", "Light Rain", "Overcast"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Units {
    Celsius,
    Fahrenheit,
}

impl Units {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "celsius" => Some(Units::Celsius),
            "fahrenheit" => Some(Units::Fahrenheit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherArgs {
    pub location: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherQuery {
    pub location: String,
    pub units: Units,
}

impl WeatherArgs {
    pub fn validate(self) -> Result<WeatherQuery> {
        let location = required_text(
            self.location,
            100,
            "You must specify a location to get weather for. For example, \"New York City\" or \"Tokyo\".",
            "Location name cannot be longer than 100 characters.",
        )?;
        let units = one_of(
            self.units.as_deref(),
            Units::from_name,
            Units::Celsius,
            "You must specify either \"celsius\" or \"fahrenheit\" for the units.",
        )?;
        Ok(WeatherQuery { location, units })
    }
}

/// Stable 10..=39 °C base temperature for a location.
fn base_celsius(location: &str) -> u32 {
    let hash = location
        .bytes()
        .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
    hash % 30 + 10
}

pub fn run(query: WeatherQuery) -> ToolOutput {
    let base = base_celsius(&query.location);
    let (temperature, unit) = match query.units {
        Units::Celsius => (base as f64, "C"),
        Units::Fahrenheit => ((base as f64 * 9.0 / 5.0 + 32.0).round(), "F"),
    };

    let mut rng = rand::thread_rng();
    let condition = CONDITIONS.choose(&mut rng).copied().unwrap_or(CONDITIONS[0]);
    let humidity: u32 = rng.gen_range(30..=80);
    let wind_speed: u32 = rng.gen_range(5..=25);

    ToolOutput::lines(vec![
        format!("🌤️ Weather for {}:", query.location),
        format!("Temperature: {temperature}° {unit}"),
        format!("Condition: {condition}"),
        format!("Humidity: {humidity}%"),
        format!("Wind Speed: {wind_speed} km/h"),
    ])
}

pub fn spec() -> ToolSpec {
    ToolSpec {
        name: NAME,
        description: "Provides simulated weather information for a given location. This is a demo tool that returns mock weather data.",
        input_schema: json!({
            "type": "object",
            "required": ["location"],
            "properties": {
                "location": { "type": "string", "description": "The location to get the weather for." },
                "units": {
                    "type": "string",
                    "enum": ["celsius", "fahrenheit"],
                    "default": "celsius",
                    "description": "The temperature units to use."
                }
            }
        }),
    }
}
