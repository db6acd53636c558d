/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{error, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{Building, Sighting};
use crate::config::Config;
use crate::elevator::ElevatorStats;
use crate::error::SimResult;
use crate::passenger::JourneyReport;
use crate::shared::{Behaviour, DoorState, ElevatorKind};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ElevatorSummary {
    pub number: u32,
    pub kind: ElevatorKind,
    pub floor: String,
    pub behaviour: Behaviour,
    pub door: DoorState,
    pub stats: ElevatorStats,
}

/// Outcome of the end-of-run consistency check.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "verdict", content = "reason", rename_all = "lowercase")]
pub enum Verdict {
    Skipped,
    Passed,
    Failed(String),
}

/**
 * Everything a run produced.
 *
 * # Fields
 * - `building`:     Building name.
 * - `journeys`:     One report per completed journey, in completion order.
 * - `failures`:     Journeys that ended with an error instead.
 * - `elevators`:    Final position and statistics of every car.
 * - `sightings`:    Registry snapshot at the end of the run.
 * - `consistency`:  Verdict of the consistency check.
 */
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub building: String,
    pub journeys: Vec<JourneyReport>,
    pub failures: Vec<String>,
    pub elevators: Vec<ElevatorSummary>,
    pub sightings: BTreeMap<u32, Sighting>,
    pub consistency: Verdict,
}

/// One scripted run: build the building, play every journey, check and shut down.
pub struct Simulation {
    config: Config,
    check: bool,
}

/***************************************/
/*             Public API              */
/***************************************/
impl Simulation {
    pub fn new(config: Config) -> Simulation {
        Simulation {
            config,
            check: true,
        }
    }

    /// Turn the consistency check at the end of the run on or off.
    pub fn with_check(mut self, check: bool) -> Simulation {
        self.check = check;
        self
    }

    pub fn run(&self) -> SimResult<RunReport> {
        let building = Building::new(&self.config.building, self.config.timing.clone())?;
        for journey in self.config.journeys.iter() {
            building.check_journey(journey)?;
        }

        building.operate()?;
        let result = self.play(&building);
        building.shutdown();
        let (journeys, failures, consistency) = result?;

        Ok(RunReport {
            building: building.name().to_string(),
            journeys,
            failures,
            elevators: summarize(&building),
            sightings: building.registry().snapshot(),
            consistency,
        })
    }

    fn play(
        &self,
        building: &Arc<Building>,
    ) -> SimResult<(Vec<JourneyReport>, Vec<String>, Verdict)> {
        let (report_tx, report_rx) = cbc::unbounded::<SimResult<JourneyReport>>();

        let mut passengers = Vec::with_capacity(self.config.journeys.len());
        for journey in self.config.journeys.iter() {
            passengers.push(building.spawn_passenger(journey, report_tx.clone())?);
        }
        drop(report_tx);

        let mut journeys = Vec::new();
        let mut failures = Vec::new();
        for result in report_rx.iter() {
            match result {
                Ok(report) => journeys.push(report),
                Err(e) => failures.push(e.to_string()),
            }
        }
        for passenger in passengers {
            if passenger.join().is_err() {
                error!("A passenger thread panicked");
            }
        }
        info!("All {} journeys are over", journeys.len() + failures.len());

        let consistency = if self.check {
            info!(
                "Checking consistency in {} ms...",
                building.timing().settle_ms
            );
            match building.check_consistency(building.timing().settle()) {
                Ok(()) => Verdict::Passed,
                Err(e) => {
                    warn!("Consistency check failed: {}", e);
                    Verdict::Failed(e.to_string())
                }
            }
        } else {
            Verdict::Skipped
        };

        Ok((journeys, failures, consistency))
    }
}

fn summarize(building: &Building) -> Vec<ElevatorSummary> {
    building
        .elevators()
        .iter()
        .map(|car| ElevatorSummary {
            number: car.number(),
            kind: car.kind(),
            floor: building
                .floor(car.current_floor())
                .map(|f| f.label().to_string())
                .unwrap_or_default(),
            behaviour: car.behaviour(),
            door: car.door_state(),
            stats: car.stats(),
        })
        .collect()
}
