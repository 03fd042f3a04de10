use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Coarse technical area an IoT project touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Sensor,
    Display,
    Cloud,
    Actuator,
}

/// Substring markers per domain, matched against lower-cased component names.
const DOMAIN_MARKERS: [(Domain, &[&str]); 4] = [
    (Domain::Sensor, &["sensor", "dht", "mq", "ultrasonic", "ir"]),
    (Domain::Display, &["lcd", "oled", "display"]),
    (Domain::Cloud, &["wifi", "cloud", "mqtt", "thingspeak", "esp"]),
    (Domain::Actuator, &["relay", "motor", "buzzer", "pump", "servo"]),
];

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Sensor,
        Domain::Display,
        Domain::Cloud,
        Domain::Actuator,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Sensor => "sensor",
            Domain::Display => "display",
            Domain::Cloud => "cloud",
            Domain::Actuator => "actuator",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Map free-text component names to the set of domains they touch.
pub fn classify<S: AsRef<str>>(components: &[S]) -> BTreeSet<Domain> {
    let lowered: Vec<String> = components
        .iter()
        .map(|c| c.as_ref().to_lowercase())
        .collect();

    DOMAIN_MARKERS
        .iter()
        .filter(|(_, markers)| {
            lowered
                .iter()
                .any(|name| markers.iter().any(|m| name.contains(m)))
        })
        .map(|(domain, _)| *domain)
        .collect()
}
