/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{Floor, FloorPlan};
use crate::config::ElevatorConfig;
use crate::error::{SimError, SimResult};
use crate::passenger::Passenger;
use crate::shared::{Behaviour, Direction, DoorState, ElevatorKind, Shutdown};

/***************************************/
/*       Public data structures        */
/***************************************/

/// A floor the car has committed to stop at, tagged with the direction that justified the stop.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub floor: usize,
    pub direction: Direction,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ElevatorStats {
    pub moves: u64,
    pub stops: u64,
    pub peak_load: u32,
}

/// What the dispatcher needs to know to decide whether a car may take a call.
///
/// A snapshot taken under two separate locks, so it is advisory only: `assign` re-checks the
/// direction and `try_admit` re-checks the room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capability {
    pub kind: ElevatorKind,
    pub reserved: bool,
    pub free: u32,
    pub direction: Option<Direction>,
    pub lowest: usize,
    pub highest: usize,
}

/**
 * One elevator car, shared between its own FSM thread, the dispatcher and the passengers.
 *
 * The car owns two monitors. The car lock guards the target queue, the service direction and
 * the behaviour; the FSM sleeps on `car_signal` while it has nothing to do. The door lock guards
 * the door state, the occupants and the number of passengers still stepping through the door;
 * passengers sleep on `door_signal` waiting for the door to open or the car to reach their floor.
 * The current floor is an atomic written only by the FSM.
 *
 * # Fields
 * - `number`:          Car number, unique within the building.
 * - `kind`:            Regular, Service or Special.
 * - `lowest`:          Lowest floor index the car serves.
 * - `highest`:         Highest floor index the car serves.
 * - `capacity`:        Space units the car holds.
 * - `current_floor`:   Floor index the car stands at or last passed.
 * - `car`:             Targets, service direction and behaviour.
 * - `car_signal`:      Wakes the FSM when a floor is pressed.
 * - `door`:            Door state, occupants, in-transit count and statistics.
 * - `door_signal`:     Broadcast on every door transition, motion step and finished transit.
 */
pub struct Elevator {
    number: u32,
    kind: ElevatorKind,
    lowest: usize,
    highest: usize,
    capacity: u32,
    current_floor: AtomicUsize,
    car: Mutex<CarState>,
    car_signal: Condvar,
    door: Mutex<DoorStatus>,
    door_signal: Condvar,
}

struct CarState {
    targets: Vec<Target>,
    direction: Option<Direction>,
    behaviour: Behaviour,
    // Set aside by building management; nothing reserves a car yet.
    reserved: bool,
}

struct DoorStatus {
    state: DoorState,
    occupants: Vec<Arc<Passenger>>,
    in_transit: usize,
    stats: ElevatorStats,
}

impl DoorStatus {
    fn load(&self) -> u32 {
        self.occupants.iter().map(|p| p.capacity()).sum()
    }
}

/***************************************/
/*             Public API              */
/***************************************/
impl Elevator {
    pub fn new(config: &ElevatorConfig, floors: &FloorPlan) -> SimResult<Elevator> {
        let lowest = match &config.lowest {
            Some(label) => floors.by_label(label)?.index(),
            None => 0,
        };
        let highest = match &config.highest {
            Some(label) => floors.by_label(label)?.index(),
            None => floors.top(),
        };
        if lowest > highest {
            return Err(SimError::Config(format!(
                "E{} serves an empty floor range",
                config.number
            )));
        }

        let start = match &config.start {
            Some(label) => floors.by_label(label)?.index(),
            None => lowest,
        };
        if start < lowest || start > highest {
            return Err(SimError::Config(format!(
                "E{} starts outside the floors it serves",
                config.number
            )));
        }

        if config.capacity == 0 {
            return Err(SimError::Config(format!(
                "E{} has no room for passengers",
                config.number
            )));
        }

        Ok(Elevator {
            number: config.number,
            kind: config.kind,
            lowest,
            highest,
            capacity: config.capacity,
            current_floor: AtomicUsize::new(start),
            car: Mutex::new(CarState {
                targets: Vec::new(),
                direction: None,
                behaviour: Behaviour::Idle,
                reserved: false,
            }),
            car_signal: Condvar::new(),
            door: Mutex::new(DoorStatus {
                state: DoorState::Closed,
                occupants: Vec::new(),
                in_transit: 0,
                stats: ElevatorStats::default(),
            }),
            door_signal: Condvar::new(),
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn kind(&self) -> ElevatorKind {
        self.kind
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn serves(&self, floor: usize) -> bool {
        floor >= self.lowest && floor <= self.highest
    }

    pub fn current_floor(&self) -> usize {
        self.current_floor.load(Ordering::SeqCst)
    }

    pub fn direction(&self) -> Option<Direction> {
        self.car.lock().direction
    }

    pub fn behaviour(&self) -> Behaviour {
        self.car.lock().behaviour
    }

    /// Queue a stop at `floor`. Pressing an already targeted floor changes nothing; floors outside
    /// the car's range are refused.
    pub fn press_floor(&self, floor: usize, direction: Direction) -> bool {
        if !self.serves(floor) {
            warn!("E{} does not serve floor index {}", self.number, floor);
            return false;
        }

        let mut car = self.car.lock();
        if car.targets.iter().any(|t| t.floor == floor) {
            return false;
        }
        debug!(
            "E{} stop requested at floor index {}, to go {}",
            self.number, floor, direction
        );
        car.targets.push(Target { floor, direction });
        self.car_signal.notify_all();
        true
    }

    pub fn is_floor_pressed(&self, floor: usize) -> bool {
        self.car.lock().targets.iter().any(|t| t.floor == floor)
    }

    pub fn targets(&self) -> Vec<Target> {
        self.car.lock().targets.clone()
    }

    pub fn door_state(&self) -> DoorState {
        self.door.lock().state
    }

    pub fn load(&self) -> u32 {
        self.door.lock().load()
    }

    pub fn can_accommodate(&self, passenger: &Passenger) -> bool {
        passenger.capacity() + self.load() <= self.capacity
    }

    pub fn occupant_count(&self) -> usize {
        self.door.lock().occupants.len()
    }

    pub fn stats(&self) -> ElevatorStats {
        self.door.lock().stats.clone()
    }

    pub fn capability(&self) -> Capability {
        let (direction, reserved) = {
            let car = self.car.lock();
            (car.direction, car.reserved)
        };
        Capability {
            kind: self.kind,
            reserved,
            free: self.capacity.saturating_sub(self.load()),
            direction,
            lowest: self.lowest,
            highest: self.highest,
        }
    }

    /// Queue a pickup and commit the car to the call's direction in one step.
    pub fn assign(&self, floor: usize, direction: Direction) -> bool {
        if !self.serves(floor) {
            return false;
        }

        let mut car = self.car.lock();
        if car.direction.is_some() && car.direction != Some(direction) {
            return false;
        }
        car.direction = Some(direction);
        if !car.targets.iter().any(|t| t.floor == floor) {
            car.targets.push(Target { floor, direction });
        }
        self.car_signal.notify_all();
        true
    }

    /// Step `passenger` in while the door is fully open at `floor` and there is room. On success
    /// the passenger leaves the floor's waiting set and holds a transit slot until
    /// `finish_transit`.
    pub fn try_admit(&self, passenger: &Arc<Passenger>, floor: &Floor) -> bool {
        let mut door = self.door.lock();
        if door.state != DoorState::Open || self.current_floor() != floor.index() {
            return false;
        }
        if door.load() + passenger.capacity() > self.capacity {
            return false;
        }

        floor.remove_waiting(passenger);
        door.occupants.push(passenger.clone());
        door.in_transit += 1;
        let load = door.load();
        door.stats.peak_load = door.stats.peak_load.max(load);
        true
    }

    /// Step `passenger` out while the door is fully open at `floor`.
    pub fn try_discharge(&self, passenger: &Arc<Passenger>, floor: usize) -> bool {
        let mut door = self.door.lock();
        if door.state != DoorState::Open || self.current_floor() != floor {
            return false;
        }
        let before = door.occupants.len();
        door.occupants.retain(|p| !Arc::ptr_eq(p, passenger));
        if door.occupants.len() == before {
            return false;
        }
        door.in_transit += 1;
        true
    }

    pub fn finish_transit(&self) {
        let mut door = self.door.lock();
        door.in_transit = door.in_transit.saturating_sub(1);
        self.door_signal.notify_all();
    }

    /// Block while the door is still opening at `floor`.
    pub fn wait_while_opening(&self, floor: usize, shutdown: &Shutdown, who: &str) -> SimResult<()> {
        let mut door = self.door.lock();
        while door.state == DoorState::Opening && self.current_floor() == floor {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(who.to_string()));
            }
            self.door_signal.wait(&mut door);
        }
        Ok(())
    }

    /// Block until the car stands at `floor` with its door fully open.
    pub fn wait_for_open_at(&self, floor: usize, shutdown: &Shutdown, who: &str) -> SimResult<()> {
        let mut door = self.door.lock();
        while !(door.state == DoorState::Open && self.current_floor() == floor) {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(who.to_string()));
            }
            self.door_signal.wait(&mut door);
        }
        Ok(())
    }

    pub(crate) fn wake_all(&self) {
        {
            let _car = self.car.lock();
            self.car_signal.notify_all();
        }
        let _door = self.door.lock();
        self.door_signal.notify_all();
    }
}

/***************************************/
/*        Motion and door cycle        */
/***************************************/
impl Elevator {
    /// Block until there is a target, then return the closest one. Ties go to the target queued
    /// first. A car without a service direction adopts the heading toward the target.
    pub(crate) fn next_target(&self, shutdown: &Shutdown) -> SimResult<Target> {
        let mut car = self.car.lock();
        loop {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(format!("E{}", self.number)));
            }

            let here = self.current_floor();
            if let Some(target) = closest_target(&car.targets, here) {
                if car.direction.is_none() {
                    car.direction = Some(if target.floor == here {
                        target.direction
                    } else {
                        Direction::between(here, target.floor)
                    });
                }
                car.behaviour = Behaviour::Moving;
                return Ok(target);
            }

            car.behaviour = Behaviour::Idle;
            car.direction = None;
            debug!("E{} has no request, so it'll wait to save power.", self.number);
            self.car_signal.wait(&mut car);
        }
    }

    /// Move one floor in `heading`. Returns the new floor, or `None` when the step would leave
    /// the car's range, in which case the car drops its direction and stays put.
    pub(crate) fn advance(&self, heading: Direction) -> Option<usize> {
        let next = {
            let mut car = self.car.lock();
            let here = self.current_floor();
            let next = match heading {
                Direction::Up if here < self.highest => here + 1,
                Direction::Down if here > self.lowest => here - 1,
                _ => {
                    car.direction = None;
                    return None;
                }
            };
            self.current_floor.store(next, Ordering::SeqCst);
            next
        };

        let mut door = self.door.lock();
        for passenger in door.occupants.iter() {
            passenger.set_current_floor(next);
        }
        door.stats.moves += 1;
        self.door_signal.notify_all();
        Some(next)
    }

    /// Take `target` off the queue and adopt its direction for the coming door cycle.
    pub(crate) fn complete_target(&self, target: Target) {
        let mut car = self.car.lock();
        car.targets.retain(|t| t.floor != target.floor);
        car.direction = Some(target.direction);
        car.behaviour = Behaviour::DoorCycle;
    }

    pub(crate) fn begin_opening(&self) {
        let mut door = self.door.lock();
        door.state = DoorState::Opening;
        door.stats.stops += 1;
        self.door_signal.notify_all();
    }

    pub(crate) fn finish_opening(&self) {
        let mut door = self.door.lock();
        door.state = DoorState::Open;
        self.door_signal.notify_all();
    }

    /// Keep the door open while someone is stepping through it, someone inside wants out here, or
    /// someone waiting here would board in `direction`. Re-checks every `poll`. Moves the door to
    /// Closing under the same lock that admission uses, so nobody can slip in afterwards.
    pub(crate) fn hold_door_until_clear(
        &self,
        floor: &Floor,
        direction: Direction,
        poll: Duration,
        shutdown: &Shutdown,
    ) -> SimResult<()> {
        let mut door = self.door.lock();
        loop {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(format!("E{}", self.number)));
            }

            let here = floor.index();
            let exiting = door.occupants.iter().any(|p| p.destination() == here);
            let free = self.capacity.saturating_sub(door.load());
            let boarding = free > 0 && floor.has_boardable(direction, free, self);

            if door.in_transit == 0 && !exiting && !boarding {
                door.state = DoorState::Closing;
                self.door_signal.notify_all();
                return Ok(());
            }

            debug!(
                "E{} full: {}, people waiting: {}, people exiting: {}",
                self.number, free == 0, boarding, exiting
            );
            if boarding {
                floor.nudge();
            }
            self.door_signal.wait_for(&mut door, poll);
        }
    }

    pub(crate) fn finish_closing(&self) {
        let mut door = self.door.lock();
        door.state = DoorState::Closed;
        self.door_signal.notify_all();
    }

    /// After a door cycle: an empty queue makes the car idle again. Returns whether it is idle.
    pub(crate) fn settle_after_stop(&self) -> bool {
        let mut car = self.car.lock();
        if car.targets.is_empty() {
            car.direction = None;
            car.behaviour = Behaviour::Idle;
            true
        } else {
            car.behaviour = Behaviour::Moving;
            false
        }
    }
}

impl fmt::Display for Elevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.number)
    }
}

impl fmt::Debug for Elevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elevator")
            .field("number", &self.number)
            .field("kind", &self.kind)
            .field("current_floor", &self.current_floor())
            .finish()
    }
}

/// Closest target to `here` by floor distance; the earliest queued wins a tie.
pub fn closest_target(targets: &[Target], here: usize) -> Option<Target> {
    targets
        .iter()
        .min_by_key(|t| (t.floor as isize - here as isize).abs())
        .copied()
}
