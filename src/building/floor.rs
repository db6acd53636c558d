/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::config::FloorConfig;
use crate::elevator::Elevator;
use crate::error::{SimError, SimResult};
use crate::passenger::Passenger;
use crate::shared::{Buttons, Direction, FloorKind, Shutdown};

/**
 * A floor of the building and the meeting point between passengers and open doors.
 *
 * The lobby monitor guards the waiting set, the open door set and a door event counter. Every
 * door opening or closing bumps the counter and wakes all waiters, who then re-check their own
 * condition. The call flags are atomics that only the dispatcher writes, while holding its own
 * lock, so they always agree with its call sets.
 *
 * # Fields
 * - `index`:         Dense position in the building, used for ordering and distance.
 * - `label`:         Display name, unique within one building.
 * - `kind`:          Service floors may only be served by service cars.
 * - `buttons`:       Hall call buttons present on this floor.
 * - `pressed_up`:    Up call pending at the dispatcher.
 * - `pressed_down`:  Down call pending at the dispatcher.
 * - `lobby`:         Waiting passengers, open doors and the door event counter.
 * - `door_event`:    Broadcast on every door opening or closing.
 */
pub struct Floor {
    index: usize,
    label: String,
    kind: FloorKind,
    buttons: Buttons,
    pressed_up: AtomicBool,
    pressed_down: AtomicBool,
    lobby: Mutex<Lobby>,
    door_event: Condvar,
}

#[derive(Default)]
struct Lobby {
    waiting: Vec<Arc<Passenger>>,
    open_doors: Vec<Arc<Elevator>>,
    door_events: u64,
}

impl Floor {
    pub fn new(index: usize, label: &str, kind: FloorKind, buttons: Buttons) -> Floor {
        Floor {
            index,
            label: label.to_string(),
            kind,
            buttons,
            pressed_up: AtomicBool::new(false),
            pressed_down: AtomicBool::new(false),
            lobby: Mutex::new(Lobby::default()),
            door_event: Condvar::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> FloorKind {
        self.kind
    }

    pub fn has_button(&self, direction: Direction) -> bool {
        self.buttons.has(direction)
    }

    pub fn is_pressed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.pressed_up.load(Ordering::SeqCst),
            Direction::Down => self.pressed_down.load(Ordering::SeqCst),
        }
    }

    // Only the dispatcher calls this, with its call lock held.
    pub(crate) fn set_pressed(&self, direction: Direction, pressed: bool) {
        match direction {
            Direction::Up => self.pressed_up.store(pressed, Ordering::SeqCst),
            Direction::Down => self.pressed_down.store(pressed, Ordering::SeqCst),
        }
    }

    pub fn add_waiting(&self, passenger: &Arc<Passenger>) {
        let mut lobby = self.lobby.lock();
        if !lobby.waiting.iter().any(|p| Arc::ptr_eq(p, passenger)) {
            lobby.waiting.push(passenger.clone());
        }
    }

    pub fn remove_waiting(&self, passenger: &Arc<Passenger>) {
        self.lobby
            .lock()
            .waiting
            .retain(|p| !Arc::ptr_eq(p, passenger));
    }

    pub fn waiting_count(&self) -> usize {
        self.lobby.lock().waiting.len()
    }

    pub fn has_waiting(&self, direction: Direction) -> bool {
        self.lobby
            .lock()
            .waiting
            .iter()
            .any(|p| p.direction() == direction)
    }

    /// Someone waiting here would actually step into `car`: same direction, fits into
    /// `free_units` and heads for a floor the car serves.
    pub fn has_boardable(&self, direction: Direction, free_units: u32, car: &Elevator) -> bool {
        self.lobby.lock().waiting.iter().any(|p| {
            p.direction() == direction && p.capacity() <= free_units && car.serves(p.destination())
        })
    }

    /// Units taken by the smallest rider waiting here to go `direction`, 1 when nobody is.
    pub fn room_needed(&self, direction: Direction) -> u32 {
        self.lobby
            .lock()
            .waiting
            .iter()
            .filter(|p| p.direction() == direction)
            .map(|p| p.capacity())
            .min()
            .unwrap_or(1)
    }

    pub fn mark_door_open(&self, car: &Arc<Elevator>) {
        let mut lobby = self.lobby.lock();
        if !lobby.open_doors.iter().any(|c| Arc::ptr_eq(c, car)) {
            lobby.open_doors.push(car.clone());
        }
        lobby.door_events += 1;
        self.door_event.notify_all();
    }

    pub fn mark_door_closed(&self, car: &Elevator) {
        let mut lobby = self.lobby.lock();
        lobby.open_doors.retain(|c| c.number() != car.number());
        lobby.door_events += 1;
        self.door_event.notify_all();
    }

    /// Make waiters look at the open doors again, e.g. after room freed up in a car.
    pub(crate) fn nudge(&self) {
        let mut lobby = self.lobby.lock();
        lobby.door_events += 1;
        self.door_event.notify_all();
    }

    pub fn has_open_door(&self) -> bool {
        !self.lobby.lock().open_doors.is_empty()
    }

    /// Cars with open doors here, together with the door event counter they were observed at.
    pub fn open_doors(&self) -> (Vec<Arc<Elevator>>, u64) {
        let lobby = self.lobby.lock();
        (lobby.open_doors.clone(), lobby.door_events)
    }

    /// Block until a door opens or closes here after the counter value `seen`.
    pub fn wait_for_door_event(&self, seen: u64, shutdown: &Shutdown, who: &str) -> SimResult<()> {
        let mut lobby = self.lobby.lock();
        while lobby.door_events == seen {
            if shutdown.is_triggered() {
                return Err(SimError::Interrupted(who.to_string()));
            }
            debug!("[{}] is waiting for a door at {}", who, self);
            self.door_event.wait(&mut lobby);
        }
        Ok(())
    }

    pub(crate) fn wake_all(&self) {
        let _lobby = self.lobby.lock();
        self.door_event.notify_all();
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Floor {}", self.label)
    }
}

impl fmt::Debug for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Floor")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Every floor of a building, addressable by index and by label.
pub struct FloorPlan {
    floors: Vec<Arc<Floor>>,
    by_label: HashMap<String, usize>,
}

impl FloorPlan {
    pub fn new(configs: &[FloorConfig]) -> SimResult<FloorPlan> {
        if configs.is_empty() {
            return Err(SimError::Config("a building needs at least one floor".into()));
        }

        let mut floors = Vec::with_capacity(configs.len());
        let mut by_label = HashMap::new();
        for (index, config) in configs.iter().enumerate() {
            if by_label.insert(config.label.clone(), index).is_some() {
                return Err(SimError::Config(format!(
                    "floor label {} is used twice",
                    config.label
                )));
            }
            floors.push(Arc::new(Floor::new(
                index,
                &config.label,
                config.kind,
                config.buttons,
            )));
        }

        Ok(FloorPlan { floors, by_label })
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Floor>> {
        self.floors.get(index)
    }

    // Indices handed out by the plan itself, or checked against a car range, are always valid.
    pub(crate) fn at(&self, index: usize) -> &Arc<Floor> {
        &self.floors[index]
    }

    pub fn by_label(&self, label: &str) -> SimResult<&Arc<Floor>> {
        self.by_label
            .get(label)
            .map(|&index| &self.floors[index])
            .ok_or_else(|| SimError::UnknownFloor(label.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Floor>> {
        self.floors.iter()
    }

    pub fn top(&self) -> usize {
        self.floors.len() - 1
    }
}
