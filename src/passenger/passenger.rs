/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{Building, Floor, FloorPlan};
use crate::config::JourneyConfig;
use crate::elevator::Elevator;
use crate::error::{SimError, SimResult};
use crate::shared::{Direction, RiderClass};

/***************************************/
/*       Public data structures        */
/***************************************/
/// How one journey went, sent back to whoever spawned the passenger.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct JourneyReport {
    pub name: String,
    pub class: RiderClass,
    pub origin: String,
    pub destination: String,
    pub elevator: Option<u32>,
    pub waited_ms: u64,
    pub rode_ms: u64,
}

/**
 * One rider making exactly one journey.
 *
 * # Fields
 * - `name`:            Name used in log lines and reports.
 * - `class`:           Rider class; only informs the default capacity today.
 * - `capacity`:        Space units taken inside a car.
 * - `origin`:          Floor index the journey starts at.
 * - `destination`:     Floor index the journey ends at.
 * - `direction`:       Derived once from origin and destination.
 * - `current_floor`:   Updated by the car while riding.
 * - `delay`:           Time before the rider shows up at the origin.
 */
pub struct Passenger {
    name: String,
    class: RiderClass,
    capacity: u32,
    origin: usize,
    destination: usize,
    direction: Direction,
    current_floor: AtomicUsize,
    delay: Duration,
}

impl Passenger {
    pub fn new(
        name: &str,
        class: RiderClass,
        origin: usize,
        destination: usize,
        delay: Duration,
        capacity: u32,
    ) -> Passenger {
        Passenger {
            name: name.to_string(),
            class,
            capacity,
            origin,
            destination,
            direction: Direction::between(origin, destination),
            current_floor: AtomicUsize::new(origin),
            delay,
        }
    }

    pub fn from_journey(journey: &JourneyConfig, floors: &FloorPlan) -> SimResult<Passenger> {
        let origin = floors.by_label(&journey.from)?;
        let destination = floors.by_label(&journey.to)?;
        if journey.capacity == 0 {
            return Err(SimError::Config(format!(
                "{} takes up no space in a car",
                journey.name
            )));
        }

        let passenger = Passenger::new(
            &journey.name,
            journey.class,
            origin.index(),
            destination.index(),
            journey.delay(),
            journey.capacity,
        );
        if passenger.origin != passenger.destination && !origin.has_button(passenger.direction) {
            return Err(SimError::Config(format!(
                "{} cannot call a car {} from {}",
                journey.name, passenger.direction, origin
            )));
        }
        Ok(passenger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> RiderClass {
        self.class
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn destination(&self) -> usize {
        self.destination
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current_floor(&self) -> usize {
        self.current_floor.load(Ordering::SeqCst)
    }

    pub fn set_current_floor(&self, floor: usize) {
        self.current_floor.store(floor, Ordering::SeqCst);
    }

    /// Make the journey: show up, get into a suitable car, ride, get out.
    pub fn run(self: Arc<Self>, building: &Building) -> SimResult<JourneyReport> {
        if !self.delay.is_zero() {
            sleep(self.delay);
        }

        let floors = building.floors();
        let origin = floors.at(self.origin).clone();
        let destination = floors.at(self.destination).clone();
        let arrived = Instant::now();

        if self.origin == self.destination {
            info!("[{}] is already at {}", self.name, destination);
            return Ok(self.report(&origin, &destination, None, arrived, arrived));
        }

        origin.add_waiting(&self);
        info!(
            "[{}] arrived at {} elevator entrance and wants to go to {}",
            self.name, origin, destination
        );

        let car = self.board(&origin, building)?;
        let boarded = Instant::now();

        self.ride(&car, &destination, building)?;
        info!("[{}] arrived at {}, thanks!", self.name, destination);

        Ok(self.report(&origin, &destination, Some(car.number()), arrived, boarded))
    }

    fn board(self: &Arc<Self>, floor: &Floor, building: &Building) -> SimResult<Arc<Elevator>> {
        let shutdown = building.shutdown_token();
        let dispatcher = building.dispatcher();

        loop {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(self.name.clone()));
            }

            let (open_doors, seen) = floor.open_doors();
            if open_doors.is_empty() {
                if dispatcher.press(floor, self.direction) {
                    info!("[{}] pressed the [{}] button", self.name, self.direction);
                }
                floor.wait_for_door_event(seen, shutdown, &self.name)?;
                continue;
            }

            let car = match self.pick_elevator(&open_doors) {
                Some(car) => car,
                None => {
                    warn!(
                        "[{}] did not like the open elevator, wait for another.",
                        self.name
                    );
                    floor.wait_for_door_event(seen, shutdown, &self.name)?;
                    continue;
                }
            };

            car.wait_while_opening(floor.index(), shutdown, &self.name)?;
            if car.try_admit(self, floor) {
                info!("[{}] is now entering lift: {}", self.name, car);
                sleep(building.timing().boarding());

                if !car.is_floor_pressed(self.destination) {
                    info!(
                        "[{}] presses button for: {}",
                        self.name,
                        building.floors().at(self.destination)
                    );
                    car.press_floor(self.destination, self.direction);
                }
                car.finish_transit();
                return Ok(car);
            }

            debug!("[{}] could not get into {}", self.name, car);
            floor.wait_for_door_event(seen, shutdown, &self.name)?;
        }
    }

    // An open car going our way, with room for us, that stops at our destination.
    fn pick_elevator(&self, open_doors: &[Arc<Elevator>]) -> Option<Arc<Elevator>> {
        open_doors
            .iter()
            .find(|car| {
                car.direction() == Some(self.direction)
                    && car.can_accommodate(self)
                    && car.serves(self.destination)
            })
            .cloned()
    }

    fn ride(
        self: &Arc<Self>,
        car: &Elevator,
        destination: &Floor,
        building: &Building,
    ) -> SimResult<()> {
        debug!("[{}] is waiting to reach desired floor...", self.name);
        loop {
            car.wait_for_open_at(destination.index(), building.shutdown_token(), &self.name)?;
            if car.try_discharge(self, destination.index()) {
                break;
            }
        }

        sleep(building.timing().boarding());
        self.set_current_floor(destination.index());
        car.finish_transit();
        info!("[{}] is now leaving lift: {}", self.name, car);
        Ok(())
    }

    fn report(
        &self,
        origin: &Floor,
        destination: &Floor,
        elevator: Option<u32>,
        arrived: Instant,
        boarded: Instant,
    ) -> JourneyReport {
        JourneyReport {
            name: self.name.clone(),
            class: self.class,
            origin: origin.label().to_string(),
            destination: destination.label().to_string(),
            elevator,
            waited_ms: boarded.duration_since(arrived).as_millis() as u64,
            rode_ms: boarded.elapsed().as_millis() as u64,
        }
    }
}

impl fmt::Debug for Passenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Passenger")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("destination", &self.destination)
            .finish()
    }
}
