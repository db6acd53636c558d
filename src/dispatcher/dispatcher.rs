/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{Floor, FloorPlan};
use crate::dispatcher::eligibility::{is_eligible, Call};
use crate::elevator::Elevator;
use crate::error::{SimError, SimResult};
use crate::shared::{Direction, Shutdown};

/***************************************/
/*               Enums                 */
/***************************************/
/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Idle,
    Assigned { call: Call, car: u32 },
    Unassigned { call: Call, freed_seen: u64 },
}

/**
 * Hands hall calls to cars.
 *
 * Calls live in two ordered sets: up calls lowest floor first, down calls highest floor first.
 * Up calls are always looked at before down calls. This is a proximity-to-the-extremes
 * heuristic, not first come first served, and sustained demand near the front of a set can keep
 * a call further back waiting indefinitely.
 *
 * The call lock also guards the floors' call flags, so a flag is set exactly while its floor
 * sits in the matching set. Lock order is call lock, then car, door or floor locks; no car,
 * door or floor lock holder ever takes the call lock.
 *
 * # Fields
 * - `floors`:      Floor plan, for floor kinds and flags.
 * - `elevators`:   Cars in preference order (by kind, then number).
 * - `calls`:       Pending up and down calls and the car-freed counter.
 * - `signal`:      Broadcast when a call is pressed or a car frees up.
 * - `shutdown`:    Building-wide stop signal.
 */
pub struct Dispatcher {
    floors: Arc<FloorPlan>,
    elevators: Vec<Arc<Elevator>>,
    calls: Mutex<CallBoard>,
    signal: Condvar,
    shutdown: Arc<Shutdown>,
}

#[derive(Default)]
struct CallBoard {
    up: BTreeSet<usize>,
    down: BTreeSet<usize>,
    freed: u64,
}

impl CallBoard {
    fn set_mut(&mut self, direction: Direction) -> &mut BTreeSet<usize> {
        match direction {
            Direction::Up => &mut self.up,
            Direction::Down => &mut self.down,
        }
    }

    fn next(&self) -> Option<Call> {
        if let Some(&floor) = self.up.iter().next() {
            return Some(Call {
                floor,
                direction: Direction::Up,
            });
        }
        self.down.iter().next_back().map(|&floor| Call {
            floor,
            direction: Direction::Down,
        })
    }
}

/***************************************/
/*             Public API              */
/***************************************/
impl Dispatcher {
    pub fn new(
        floors: Arc<FloorPlan>,
        elevators: Vec<Arc<Elevator>>,
        shutdown: Arc<Shutdown>,
    ) -> Dispatcher {
        Dispatcher {
            floors,
            elevators,
            calls: Mutex::new(CallBoard::default()),
            signal: Condvar::new(),
            shutdown,
        }
    }

    pub fn press_up(&self, floor: &Floor) -> bool {
        self.press(floor, Direction::Up)
    }

    pub fn press_down(&self, floor: &Floor) -> bool {
        self.press(floor, Direction::Down)
    }

    /// Raise a call at `floor`. Does nothing when the call is already pending, when the floor has
    /// no button for `direction`, or while a door stands open there.
    pub fn press(&self, floor: &Floor, direction: Direction) -> bool {
        if !floor.has_button(direction) {
            warn!("{} has no {} button", floor, direction);
            return false;
        }

        let mut calls = self.calls.lock();
        if floor.is_pressed(direction) || floor.has_open_door() {
            return false;
        }

        floor.set_pressed(direction, true);
        calls.set_mut(direction).insert(floor.index());
        info!("[{}] button pressed at {}", direction, floor);
        self.signal.notify_all();
        true
    }

    /// Drop the call a car just served.
    pub fn clear_call(&self, floor: &Floor, direction: Direction) {
        let mut calls = self.calls.lock();
        if calls.set_mut(direction).remove(&floor.index()) {
            info!("[{}] call cleared at {}", direction, floor);
        }
        floor.set_pressed(direction, false);
    }

    /// A car closed its doors and may be able to take a call it could not take before.
    pub fn notify_car_freed(&self) {
        let mut calls = self.calls.lock();
        calls.freed += 1;
        self.signal.notify_all();
    }

    pub fn has_call(&self, floor: usize, direction: Direction) -> bool {
        let calls = self.calls.lock();
        match direction {
            Direction::Up => calls.up.contains(&floor),
            Direction::Down => calls.down.contains(&floor),
        }
    }

    /// Pending calls for `direction`, in the order the dispatcher looks at them.
    pub fn pending(&self, direction: Direction) -> Vec<usize> {
        let calls = self.calls.lock();
        match direction {
            Direction::Up => calls.up.iter().copied().collect(),
            Direction::Down => calls.down.iter().rev().copied().collect(),
        }
    }

    pub fn next_call(&self) -> Option<Call> {
        self.calls.lock().next()
    }

    /// First car, in preference order, that may take `call`.
    pub fn find_elevator(&self, call: Call) -> Option<Arc<Elevator>> {
        let floor = self.floors.get(call.floor)?;
        let room_needed = floor.room_needed(call.direction);
        self.elevators
            .iter()
            .find(|car| is_eligible(floor.kind(), call, room_needed, &car.capability()))
            .cloned()
    }

    /// Try to hand the highest priority call to a car. The whole attempt runs under the call
    /// lock, so a car serving the floor meanwhile cannot race with the removal of the call.
    pub fn dispatch_once(&self) -> Dispatch {
        let mut calls = self.calls.lock();
        let call = match calls.next() {
            Some(call) => call,
            None => return Dispatch::Idle,
        };

        debug!("Received lift request, looking for available elevator...");
        let car = match self.find_elevator(call) {
            Some(car) if car.assign(call.floor, call.direction) => car,
            _ => {
                return Dispatch::Unassigned {
                    call,
                    freed_seen: calls.freed,
                }
            }
        };

        let floor = self.floors.at(call.floor);
        calls.set_mut(call.direction).remove(&call.floor);
        floor.set_pressed(call.direction, false);
        info!(
            "Found elevator {} and registered {} call at {}.",
            car, call.direction, floor
        );

        Dispatch::Assigned {
            call,
            car: car.number(),
        }
    }

    pub fn run(&self) -> SimResult<()> {
        info!("Controller Ready!");

        // Main loop
        loop {
            self.wait_for_calls()?;
            if let Dispatch::Unassigned { call, freed_seen } = self.dispatch_once() {
                info!(
                    "No elevator available for {} call at {}, will wait if an elevator frees up...",
                    call.direction,
                    self.floors.at(call.floor)
                );
                self.wait_for_car_freed(freed_seen)?;
            }
        }
    }

    pub(crate) fn wake_all(&self) {
        let _calls = self.calls.lock();
        self.signal.notify_all();
    }

    fn wait_for_calls(&self) -> SimResult<()> {
        let mut calls = self.calls.lock();
        loop {
            if self.shutdown.is_triggered() {
                return Err(SimError::Interrupted("dispatcher".into()));
            }
            if !calls.up.is_empty() || !calls.down.is_empty() {
                return Ok(());
            }
            debug!("Waiting for people wanting a lift...");
            self.signal.wait(&mut calls);
        }
    }

    fn wait_for_car_freed(&self, seen: u64) -> SimResult<()> {
        let mut calls = self.calls.lock();
        loop {
            if self.shutdown.is_triggered() {
                return Err(SimError::Interrupted("dispatcher".into()));
            }
            if calls.freed != seen {
                return Ok(());
            }
            self.signal.wait(&mut calls);
        }
    }
}
