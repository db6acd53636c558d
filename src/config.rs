/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::error::SimResult;
use crate::shared::{Buttons, ElevatorKind, FloorKind, RiderClass};

/// Space units a car holds unless its configuration says otherwise.
pub const DEFAULT_CAPACITY: u32 = 20;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub building: BuildingConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub journeys: Vec<JourneyConfig>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BuildingConfig {
    pub name: String,
    pub floors: Vec<FloorConfig>,
    pub elevators: Vec<ElevatorConfig>,
}

/// One floor, listed bottom to top. The position in the list is the floor index.
#[derive(Deserialize, Clone, Debug)]
pub struct FloorConfig {
    pub label: String,
    #[serde(default = "default_floor_kind")]
    pub kind: FloorKind,
    #[serde(default = "default_buttons")]
    pub buttons: Buttons,
}

/// One car. `lowest`/`highest`/`start` are floor labels; missing values mean the bottom and top
/// floors of the building, and the bottom floor for `start`.
#[derive(Deserialize, Clone, Debug)]
pub struct ElevatorConfig {
    pub number: u32,
    #[serde(default = "default_elevator_kind")]
    pub kind: ElevatorKind,
    pub lowest: Option<String>,
    pub highest: Option<String>,
    pub start: Option<String>,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

/// Latencies of the simulated world, all in milliseconds.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub per_floor_ms: u64,
    pub door_ms: u64,
    pub initial_open_ms: u64,
    pub boarding_ms: u64,
    pub close_poll_ms: u64,
    pub settle_ms: u64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct JourneyConfig {
    pub name: String,
    #[serde(default)]
    pub class: RiderClass,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_rider_capacity")]
    pub capacity: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            per_floor_ms: 2000,
            door_ms: 3000,
            initial_open_ms: 3000,
            boarding_ms: 2000,
            close_poll_ms: 3000,
            settle_ms: 30000,
        }
    }
}

impl TimingConfig {
    pub fn per_floor(&self) -> Duration {
        Duration::from_millis(self.per_floor_ms)
    }

    pub fn door(&self) -> Duration {
        Duration::from_millis(self.door_ms)
    }

    pub fn initial_open(&self) -> Duration {
        Duration::from_millis(self.initial_open_ms)
    }

    pub fn boarding(&self) -> Duration {
        Duration::from_millis(self.boarding_ms)
    }

    pub fn close_poll(&self) -> Duration {
        Duration::from_millis(self.close_poll_ms.max(1))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl JourneyConfig {
    pub fn new(name: &str, from: &str, to: &str) -> JourneyConfig {
        JourneyConfig {
            name: name.to_string(),
            class: RiderClass::default(),
            from: from.to_string(),
            to: to.to_string(),
            delay_ms: 0,
            capacity: default_rider_capacity(),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/***************************************/
/*             Public API              */
/***************************************/
pub fn load_config<P: AsRef<Path>>(path: P) -> SimResult<Config> {
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}

pub fn parse_config(config_str: &str) -> SimResult<Config> {
    Ok(toml::from_str(config_str)?)
}

/***************************************/
/*          Serde defaults             */
/***************************************/
fn default_floor_kind() -> FloorKind {
    FloorKind::Regular
}

fn default_buttons() -> Buttons {
    Buttons::Both
}

fn default_elevator_kind() -> ElevatorKind {
    ElevatorKind::Regular
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_rider_capacity() -> u32 {
    1
}
