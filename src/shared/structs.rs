/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;
use std::fmt;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction a rider travels from `from` to reach `to`. Equal floors count as down.
    pub fn between(from: usize, to: usize) -> Direction {
        if to > from {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    #[serde(rename = "idle")]
    Idle,
    #[serde(rename = "moving")]
    Moving,
    #[serde(rename = "doorCycle")]
    DoorCycle,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ElevatorKind {
    Regular,
    Special,
    Service,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FloorKind {
    Common,
    Regular,
    Service,
    Vip,
}

/// Which hall call buttons a floor panel carries.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Buttons {
    Up,
    Down,
    Both,
}

impl Buttons {
    pub fn has(&self, direction: Direction) -> bool {
        match (*self, direction) {
            (Buttons::Both, _) => true,
            (Buttons::Up, Direction::Up) => true,
            (Buttons::Down, Direction::Down) => true,
            _ => false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiderClass {
    Worker,
    Manager,
    Resident,
    Vip,
}

impl Default for RiderClass {
    fn default() -> Self {
        RiderClass::Resident
    }
}
