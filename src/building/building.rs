/***************************************/
/*        3rd party libraries          */
/***************************************/
use crossbeam_channel as cbc;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{sleep, Builder, JoinHandle};
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::floor::{Floor, FloorPlan};
use crate::building::registry::Registry;
use crate::config::{BuildingConfig, JourneyConfig, TimingConfig};
use crate::dispatcher::Dispatcher;
use crate::elevator::{Elevator, ElevatorFSM};
use crate::error::{SimError, SimResult};
use crate::passenger::{JourneyReport, Passenger};
use crate::shared::{Direction, ElevatorKind, FloorKind, Shutdown};

/**
 * Composition root of one simulated building.
 *
 * Owns the floor plan, the cars, the dispatcher and the registry, and starts one thread for
 * the dispatcher and one per car. Passengers are spawned against a running building and hold
 * it only for the length of their journey.
 *
 * # Fields
 * - `name`:        Building name, for logs.
 * - `floors`:      Floor plan shared with the cars and the dispatcher.
 * - `elevators`:   Cars ordered by kind, then number.
 * - `dispatcher`:  Hall call dispatcher.
 * - `registry`:    Last known floor and direction of every car.
 * - `timing`:      Latencies of the simulated world.
 * - `shutdown`:    Stop signal for every actor.
 * - `actors`:      Join handles of the dispatcher and car threads.
 * - `operating`:   Set once `operate` has started the actors.
 */
pub struct Building {
    name: String,
    floors: Arc<FloorPlan>,
    elevators: Vec<Arc<Elevator>>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<Registry>,
    timing: TimingConfig,
    shutdown: Arc<Shutdown>,
    actors: Mutex<Vec<JoinHandle<SimResult<()>>>>,
    operating: AtomicBool,
}

impl Building {
    pub fn new(config: &BuildingConfig, timing: TimingConfig) -> SimResult<Arc<Building>> {
        let floors = Arc::new(FloorPlan::new(&config.floors)?);

        if config.elevators.is_empty() {
            return Err(SimError::Config(format!(
                "building {} has no elevators",
                config.name
            )));
        }

        let mut numbers = HashSet::new();
        let mut elevators = Vec::with_capacity(config.elevators.len());
        for elevator_config in config.elevators.iter() {
            if !numbers.insert(elevator_config.number) {
                return Err(SimError::Config(format!(
                    "elevator number {} is used twice",
                    elevator_config.number
                )));
            }
            elevators.push(Arc::new(Elevator::new(elevator_config, &floors)?));
        }
        elevators.sort_by_key(|car| (car.kind(), car.number()));

        for floor in floors.iter() {
            if !elevators.iter().any(|car| can_call(floor, car)) {
                return Err(SimError::Config(format!(
                    "no elevator can be called to {}",
                    floor
                )));
            }
        }

        let registry = Arc::new(Registry::new());
        for car in elevators.iter() {
            registry.register(car.number(), car.kind(), car.current_floor());
        }

        let shutdown = Arc::new(Shutdown::new());
        let dispatcher = Arc::new(Dispatcher::new(
            floors.clone(),
            elevators.clone(),
            shutdown.clone(),
        ));

        Ok(Arc::new(Building {
            name: config.name.clone(),
            floors,
            elevators,
            dispatcher,
            registry,
            timing,
            shutdown,
            actors: Mutex::new(Vec::new()),
            operating: AtomicBool::new(false),
        }))
    }

    /// Start the dispatcher and every car. Calling it again does nothing.
    pub fn operate(&self) -> SimResult<()> {
        if self.operating.swap(true, Ordering::SeqCst) {
            warn!("Building {} is already operating", self.name);
            return Ok(());
        }

        let mut actors = self.actors.lock();

        let dispatcher = self.dispatcher.clone();
        actors.push(
            Builder::new()
                .name("dispatcher".into())
                .spawn(move || dispatcher.run())?,
        );

        for car in self.elevators.iter() {
            let fsm = ElevatorFSM::new(
                car.clone(),
                self.floors.clone(),
                self.dispatcher.clone(),
                self.registry.clone(),
                self.timing.clone(),
                self.shutdown.clone(),
            );
            actors.push(
                Builder::new()
                    .name(format!("E{}", car.number()))
                    .spawn(move || fsm.run())?,
            );
        }

        info!("Building {} is now operating!", self.name);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn floors(&self) -> &Arc<FloorPlan> {
        &self.floors
    }

    pub fn floor(&self, index: usize) -> Option<&Arc<Floor>> {
        self.floors.get(index)
    }

    pub fn floor_by_label(&self, label: &str) -> SimResult<&Arc<Floor>> {
        self.floors.by_label(label)
    }

    pub fn elevators(&self) -> &[Arc<Elevator>] {
        &self.elevators
    }

    pub fn elevator(&self, number: u32) -> Option<&Arc<Elevator>> {
        self.elevators.iter().find(|car| car.number() == number)
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn shutdown_token(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Start a passenger thread for `journey`. Its report, or the error that stopped it, goes to
    /// `report_tx` when the journey ends.
    pub fn spawn_passenger(
        self: &Arc<Self>,
        journey: &JourneyConfig,
        report_tx: cbc::Sender<SimResult<JourneyReport>>,
    ) -> SimResult<JoinHandle<()>> {
        let passenger = self.admit_journey(journey)?;

        let building = self.clone();
        let passenger = Arc::new(passenger);
        let handle = Builder::new()
            .name(journey.name.clone())
            .spawn(move || {
                let result = passenger.clone().run(&building);
                if let Err(e) = &result {
                    warn!("[{}] gave up: {}", passenger.name(), e);
                }
                if report_tx.send(result).is_err() {
                    debug!("[{}] has nobody to report to", passenger.name());
                }
            })?;
        Ok(handle)
    }

    /// Reject a journey the building could never complete.
    pub fn check_journey(&self, journey: &JourneyConfig) -> SimResult<()> {
        self.admit_journey(journey).map(|_| ())
    }

    /// Wait out the settle window, then verify that every call was served and everybody got
    /// where they were going.
    pub fn check_consistency(&self, settle: Duration) -> SimResult<()> {
        sleep(settle);
        self.verify()
    }

    /// The end-of-run invariant: no pending call, nobody waiting, nobody inside a car.
    pub fn verify(&self) -> SimResult<()> {
        for floor in self.floors.iter() {
            for direction in [Direction::Up, Direction::Down] {
                if floor.is_pressed(direction) {
                    return Err(SimError::PendingCall {
                        floor: floor.label().to_string(),
                        direction,
                    });
                }
            }
            let waiting = floor.waiting_count();
            if waiting > 0 {
                return Err(SimError::Stranded {
                    floor: floor.label().to_string(),
                    waiting,
                });
            }
        }

        for car in self.elevators.iter() {
            let occupants = car.occupant_count();
            if occupants > 0 {
                return Err(SimError::Occupied {
                    car: car.number(),
                    occupants,
                });
            }
        }

        Ok(())
    }

    /// Stop every actor and wait for the dispatcher and car threads to finish.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
        for floor in self.floors.iter() {
            floor.wake_all();
        }
        for car in self.elevators.iter() {
            car.wake_all();
        }
        self.dispatcher.wake_all();

        let actors: Vec<_> = self.actors.lock().drain(..).collect();
        for actor in actors {
            let name = actor.thread().name().unwrap_or("actor").to_string();
            match actor.join() {
                Ok(Ok(())) | Ok(Err(SimError::Interrupted(_))) => debug!("{} stopped", name),
                Ok(Err(e)) => warn!("{} stopped with an error: {}", name, e),
                Err(_) => error!("{} panicked", name),
            }
        }
        info!("Building {} has shut down", self.name);
    }

    fn admit_journey(&self, journey: &JourneyConfig) -> SimResult<Passenger> {
        let passenger = Passenger::from_journey(journey, &self.floors)?;
        self.check_servable(&passenger)?;
        Ok(passenger)
    }

    // Every car the dispatcher might send to the origin must take the passenger all the way and
    // have room for them, otherwise the passenger could be sent the same useless car forever.
    fn check_servable(&self, passenger: &Passenger) -> SimResult<()> {
        if passenger.origin() == passenger.destination() {
            return Ok(());
        }

        let origin = self.floors.at(passenger.origin());
        let candidates: Vec<_> = self
            .elevators
            .iter()
            .filter(|car| can_call(origin, car))
            .collect();
        let servable = !candidates.is_empty()
            && candidates.iter().all(|car| {
                car.serves(passenger.destination()) && car.capacity() >= passenger.capacity()
            });

        if servable {
            Ok(())
        } else {
            Err(SimError::Config(format!(
                "{} cannot be carried from {} to {}",
                passenger.name(),
                origin,
                self.floors.at(passenger.destination())
            )))
        }
    }
}

// Whether the dispatcher could ever send `car` to `floor`.
fn can_call(floor: &Floor, car: &Elevator) -> bool {
    car.serves(floor.index())
        && (floor.kind() != FloorKind::Service || car.kind() == ElevatorKind::Service)
}
