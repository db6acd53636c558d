/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info};
use std::sync::Arc;
use std::thread::sleep;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::{FloorPlan, Registry};
use crate::config::TimingConfig;
use crate::dispatcher::Dispatcher;
use crate::elevator::car::{Elevator, Target};
use crate::error::SimResult;
use crate::shared::{Direction, Shutdown};

/**
 * Drives one car: waits for targets, moves one floor at a time toward the closest one and runs
 * the door cycle on arrival.
 *
 * The FSM runs on its own thread for the life of the building and only returns once the
 * shutdown token interrupts one of its waits.
 *
 * # Fields
 * - `car`:         The car being driven, shared with passengers and the dispatcher.
 * - `floors`:      Floor plan of the building, for arrival bookkeeping.
 * - `dispatcher`:  Told when a call is served and when the car frees up.
 * - `registry`:    Receives the car's floor and direction after every change.
 * - `timing`:      Travel, door and polling latencies.
 * - `shutdown`:    Building-wide stop signal.
 */
pub struct ElevatorFSM {
    car: Arc<Elevator>,
    floors: Arc<FloorPlan>,
    dispatcher: Arc<Dispatcher>,
    registry: Arc<Registry>,
    timing: TimingConfig,
    shutdown: Arc<Shutdown>,
}

impl ElevatorFSM {
    pub fn new(
        car: Arc<Elevator>,
        floors: Arc<FloorPlan>,
        dispatcher: Arc<Dispatcher>,
        registry: Arc<Registry>,
        timing: TimingConfig,
        shutdown: Arc<Shutdown>,
    ) -> ElevatorFSM {
        ElevatorFSM {
            car,
            floors,
            dispatcher,
            registry,
            timing,
            shutdown,
        }
    }

    pub fn run(self) -> SimResult<()> {
        info!("{} is ready.", self.car);
        self.registry
            .set_floor(self.car.number(), self.car.current_floor());

        // Main loop
        loop {
            let target = self.car.next_target(&self.shutdown)?;
            self.registry
                .set_direction(self.car.number(), self.car.direction());

            if target.floor == self.car.current_floor() {
                debug!("{} is at the requested floor.", self.car);
                self.arrive(target)?;
            } else {
                self.step_toward(target.floor);
            }
        }
    }

    fn step_toward(&self, floor: usize) {
        let heading = Direction::between(self.car.current_floor(), floor);
        match heading {
            Direction::Up => info!("{} is going up", self.car),
            Direction::Down => info!("{} is going down", self.car),
        }
        sleep(self.timing.per_floor());

        match self.car.advance(heading) {
            Some(now) => {
                info!("{} is now at {}", self.car, self.floors.at(now));
                self.registry.set_floor(self.car.number(), now);
            }
            None => {
                debug!("{} reached the end of its range", self.car);
                self.registry.set_direction(self.car.number(), None);
            }
        }
    }

    fn arrive(&self, target: Target) -> SimResult<()> {
        let floor = self.floors.at(target.floor).clone();

        // Direction and door state are settled before the floor sees the door, and the door is
        // visible before the call is cleared, so a passenger never finds both the button dark and
        // no door open.
        self.car.complete_target(target);
        self.car.begin_opening();
        floor.mark_door_open(&self.car);
        self.dispatcher.clear_call(&floor, target.direction);
        self.registry
            .set_direction(self.car.number(), Some(target.direction));

        info!("{} is opening door...", self.car);
        sleep(self.timing.door());
        self.car.finish_opening();
        info!("{} is now open at {}", self.car, floor);

        debug!("{} gives people time to enter/exit", self.car);
        sleep(self.timing.initial_open());

        info!("{} is waiting for people to enter or leave...", self.car);
        let held = self.car.hold_door_until_clear(
            &floor,
            target.direction,
            self.timing.close_poll(),
            &self.shutdown,
        );
        if let Err(e) = held {
            floor.mark_door_closed(&self.car);
            return Err(e);
        }

        info!("{} is closing door...", self.car);
        sleep(self.timing.door());
        self.car.finish_closing();
        floor.mark_door_closed(&self.car);
        info!("{} is closed!", self.car);

        if self.car.settle_after_stop() {
            self.registry.set_direction(self.car.number(), None);
        }
        self.dispatcher.notify_car_freed();
        Ok(())
    }
}
