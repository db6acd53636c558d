/***************************************/
/*        3rd party libraries          */
/***************************************/
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::{Direction, ElevatorKind};

/// What the registry last heard from one car.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Sighting {
    pub floor: usize,
    pub direction: Option<Direction>,
}

/**
 * Observational record of where every car was last seen.
 *
 * Cars write to it after each motion step; anyone may read it. Nothing in the dispatch or
 * boarding protocol depends on it.
 */
#[derive(Default)]
pub struct Registry {
    sightings: RwLock<HashMap<u32, Sighting>>,
    kinds: RwLock<HashMap<ElevatorKind, Vec<u32>>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn register(&self, number: u32, kind: ElevatorKind, floor: usize) {
        let mut kinds = self.kinds.write();
        let numbers = kinds.entry(kind).or_insert_with(Vec::new);
        if !numbers.contains(&number) {
            numbers.push(number);
        }
        self.sightings.write().insert(
            number,
            Sighting {
                floor,
                direction: None,
            },
        );
    }

    pub fn set_floor(&self, number: u32, floor: usize) {
        self.sightings
            .write()
            .entry(number)
            .or_insert(Sighting {
                floor,
                direction: None,
            })
            .floor = floor;
    }

    pub fn set_direction(&self, number: u32, direction: Option<Direction>) {
        if let Some(sighting) = self.sightings.write().get_mut(&number) {
            sighting.direction = direction;
        }
    }

    pub fn floor_of(&self, number: u32) -> Option<usize> {
        self.sightings.read().get(&number).map(|s| s.floor)
    }

    pub fn direction_of(&self, number: u32) -> Option<Direction> {
        self.sightings.read().get(&number).and_then(|s| s.direction)
    }

    pub fn elevators_of_kind(&self, kind: ElevatorKind) -> Vec<u32> {
        self.kinds.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Ordered copy of every sighting, keyed by car number.
    pub fn snapshot(&self) -> BTreeMap<u32, Sighting> {
        self.sightings
            .read()
            .iter()
            .map(|(number, sighting)| (*number, sighting.clone()))
            .collect()
    }
}
