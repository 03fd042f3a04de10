//! Wokwi simulator scene built from a project's microcontroller and parts list.
//!
//! Only placement is derived here. Wiring is left to the user, so every
//! document carries an empty connection list.

use std::fmt;

use serde::{Deserialize, Serialize};

const SCENE_VERSION: u32 = 1;
const SCENE_AUTHOR: &str = "IoT GPT";
const SCENE_EDITOR: &str = "wokwi";

const GRID_LEFT_START: i32 = -180;
const GRID_LEFT_MAX: i32 = 180;
const GRID_TOP_START: i32 = 140;
const GRID_STEP: i32 = 120;

/// Simulator parts a component name can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartType {
    Dht11,
    HcSr04,
    Lcd1602,
    Ssd1306,
    Relay,
    Servo,
    Led,
    Buzzer,
    Mq2,
}

/// Part lookup rules, first match wins. Order matters: `oled` must be tried
/// before `led`.
const PART_RULES: [(&[&str], PartType); 9] = [
    (&["dht"], PartType::Dht11),
    (&["ultrasonic", "hc-sr04"], PartType::HcSr04),
    (&["lcd"], PartType::Lcd1602),
    (&["oled"], PartType::Ssd1306),
    (&["relay"], PartType::Relay),
    (&["servo"], PartType::Servo),
    (&["led"], PartType::Led),
    (&["buzzer"], PartType::Buzzer),
    (&["gas", "mq"], PartType::Mq2),
];

impl PartType {
    pub fn label(self) -> &'static str {
        match self {
            PartType::Dht11 => "DHT11",
            PartType::HcSr04 => "HC-SR04",
            PartType::Lcd1602 => "LCD1602",
            PartType::Ssd1306 => "SSD1306",
            PartType::Relay => "RELAY",
            PartType::Servo => "SERVO",
            PartType::Led => "LED",
            PartType::Buzzer => "BUZZER",
            PartType::Mq2 => "MQ2",
        }
    }

    /// Element type understood by the Wokwi editor.
    pub fn wokwi_type(self) -> &'static str {
        match self {
            PartType::Dht11 => "wokwi-dht11",
            PartType::HcSr04 => "wokwi-hc-sr04",
            PartType::Lcd1602 => "wokwi-lcd1602",
            PartType::Ssd1306 => "wokwi-ssd1306",
            PartType::Relay => "wokwi-relay",
            PartType::Servo => "wokwi-servo",
            PartType::Led => "wokwi-led",
            PartType::Buzzer => "wokwi-buzzer",
            PartType::Mq2 => "wokwi-mq2",
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Esp32Devkit,
    Esp8266,
    ArduinoUno,
}

impl Board {
    pub fn for_mcu(mcu: &str) -> Self {
        let mcu = mcu.to_lowercase();
        if mcu.contains("esp32") {
            Board::Esp32Devkit
        } else if mcu.contains("esp8266") {
            Board::Esp8266
        } else {
            Board::ArduinoUno
        }
    }

    pub fn wokwi_type(self) -> &'static str {
        match self {
            Board::Esp32Devkit => "wokwi-esp32-devkit-v1",
            Board::Esp8266 => "wokwi-esp8266",
            Board::ArduinoUno => "wokwi-arduino-uno",
        }
    }

    /// New-project page of the simulator for this board family.
    pub fn simulator_url(self) -> &'static str {
        match self {
            Board::Esp32Devkit => "https://wokwi.com/projects/new/esp32",
            Board::Esp8266 => "https://wokwi.com/projects/new/esp8266",
            Board::ArduinoUno => "https://wokwi.com/projects/new/arduino-uno",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenePart {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub top: i32,
    pub left: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub version: u32,
    pub author: String,
    pub editor: String,
    pub parts: Vec<ScenePart>,
    pub connections: Vec<serde_json::Value>,
}

pub fn part_type_for(component: &str) -> Option<PartType> {
    let name = component.to_lowercase();
    PART_RULES
        .iter()
        .find(|(markers, _)| markers.iter().any(|m| name.contains(m)))
        .map(|(_, part)| *part)
}

/// Place the board at the origin and every resolvable component on a
/// four-column grid below it. Unknown components are skipped without
/// consuming a slot.
pub fn generate_scene<S: AsRef<str>>(
    mcu: &str,
    components: &[S],
) -> (SceneDocument, &'static str) {
    let board = Board::for_mcu(mcu);

    let mut parts = vec![ScenePart {
        id: "mcu".to_string(),
        kind: board.wokwi_type().to_string(),
        top: 0,
        left: 0,
    }];

    let (mut left, mut top) = (GRID_LEFT_START, GRID_TOP_START);
    for (idx, part) in components
        .iter()
        .filter_map(|c| part_type_for(c.as_ref()))
        .enumerate()
    {
        parts.push(ScenePart {
            id: format!("p{idx}"),
            kind: part.wokwi_type().to_string(),
            top,
            left,
        });
        left += GRID_STEP;
        if left > GRID_LEFT_MAX {
            left = GRID_LEFT_START;
            top += GRID_STEP;
        }
    }

    let doc = SceneDocument {
        version: SCENE_VERSION,
        author: SCENE_AUTHOR.to_string(),
        editor: SCENE_EDITOR.to_string(),
        parts,
        connections: Vec::new(),
    };
    (doc, board.simulator_url())
}
