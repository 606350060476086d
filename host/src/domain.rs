use serde::{Deserialize, Serialize};

/// a monitoring station with its own sensor endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// unique id (e.g., "A")
    pub id: String,
    /// display name shown in the location switcher
    pub name: String,
    /// sensor json endpoint polled for this station
    pub api_url: String,
}

/// one fully-populated set of metric values
///
/// every field is finite: fields missing upstream are defaulted or simulated
/// by the poller before a snapshot is built.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// fine particulate matter in μg/m³
    pub pm25: f64,
    /// temperature in celsius
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
    /// carbon dioxide in ppm
    pub co2: f64,
    /// total volatile organic compounds in mg/m³
    pub tvoc: f64,
    /// wind speed in m/s (simulated)
    pub windspeed: f64,
    /// illuminance in lx (simulated)
    pub sunlight: f64,
    /// power draw in kW (simulated)
    pub electricity: f64,
    /// chance of rain in percent (simulated)
    pub precipitation: u8,
}

/// metric tags used by the detail overlay and the value cards
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Pm25,
    Temperature,
    Humidity,
    Co2,
    Tvoc,
    Windspeed,
    Sunlight,
    Electricity,
    Precipitation,
}

impl Metric {
    /// sidebar menu entries, in display order
    pub const MENU: [Metric; 8] = [
        Metric::Temperature,
        Metric::Sunlight,
        Metric::Windspeed,
        Metric::Humidity,
        Metric::Co2,
        Metric::Tvoc,
        Metric::Pm25,
        Metric::Electricity,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Metric::Pm25 => "pm25",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Co2 => "co2",
            Metric::Tvoc => "tvoc",
            Metric::Windspeed => "windspeed",
            Metric::Sunlight => "sunlight",
            Metric::Electricity => "electricity",
            Metric::Precipitation => "precipitation",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Metric> {
        match tag {
            "pm25" => Some(Metric::Pm25),
            "temperature" => Some(Metric::Temperature),
            "humidity" => Some(Metric::Humidity),
            "co2" => Some(Metric::Co2),
            "tvoc" => Some(Metric::Tvoc),
            "windspeed" => Some(Metric::Windspeed),
            "sunlight" => Some(Metric::Sunlight),
            "electricity" => Some(Metric::Electricity),
            "precipitation" => Some(Metric::Precipitation),
            _ => None,
        }
    }

    /// menu / overlay title
    pub fn title(self) -> &'static str {
        match self {
            Metric::Pm25 => "PM2.5",
            Metric::Temperature => "溫度",
            Metric::Humidity => "濕度",
            Metric::Co2 => "碳排放",
            Metric::Tvoc => "有機物",
            Metric::Windspeed => "風速",
            Metric::Sunlight => "日照",
            Metric::Electricity => "用電量",
            Metric::Precipitation => "降雨機率",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Pm25 => "μg/m³",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Co2 => "ppm",
            Metric::Tvoc => "mg/m³",
            Metric::Windspeed => "m/s",
            Metric::Sunlight => "lx",
            Metric::Electricity => "kW",
            Metric::Precipitation => "%",
        }
    }

    /// fixed decimal places for the value card, None prints the value as-is
    pub fn precision(self) -> Option<usize> {
        match self {
            Metric::Temperature | Metric::Windspeed | Metric::Electricity => Some(1),
            Metric::Sunlight => Some(0),
            Metric::Tvoc => Some(2),
            Metric::Pm25 | Metric::Humidity | Metric::Co2 | Metric::Precipitation => None,
        }
    }
}

impl EnvironmentSnapshot {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Pm25 => self.pm25,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Co2 => self.co2,
            Metric::Tvoc => self.tvoc,
            Metric::Windspeed => self.windspeed,
            Metric::Sunlight => self.sunlight,
            Metric::Electricity => self.electricity,
            Metric::Precipitation => f64::from(self.precipitation),
        }
    }

    /// true when every field is a finite number
    pub fn is_finite(&self) -> bool {
        [
            self.pm25,
            self.temperature,
            self.humidity,
            self.co2,
            self.tvoc,
            self.windspeed,
            self.sunlight,
            self.electricity,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
