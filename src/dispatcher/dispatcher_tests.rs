/*
 * Unit tests for dispatcher module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 *  - test_eligibility_service_floor
 *  - test_eligibility_car_state
 *  - test_press_is_idempotent
 *  - test_press_without_button
 *  - test_press_suppressed_while_door_open
 *  - test_call_order
 *  - test_dispatch_idle
 *  - test_dispatch_assigns_and_clears
 *  - test_dispatch_waits_for_committed_car
 *  - test_dispatch_service_floor
 *  - test_dispatch_skips_car_without_room
 *  - test_run_until_shutdown
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod dispatcher_tests {
    use crate::building::FloorPlan;
    use crate::config::{ElevatorConfig, FloorConfig, DEFAULT_CAPACITY};
    use crate::dispatcher::{is_eligible, Call, Dispatch, Dispatcher};
    use crate::elevator::{Capability, Elevator};
    use crate::error::SimError;
    use crate::passenger::Passenger;
    use crate::shared::Direction::{Down, Up};
    use crate::shared::{Buttons, ElevatorKind, FloorKind, RiderClass, Shutdown};
    use crossbeam_channel::unbounded;
    use std::sync::Arc;
    use std::thread::{sleep, Builder};
    use std::time::{Duration, Instant};

    fn setup_floors(kinds: &[FloorKind]) -> Arc<FloorPlan> {
        let configs: Vec<FloorConfig> = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| FloorConfig {
                label: format!("F{}", i),
                kind: *kind,
                buttons: Buttons::Both,
            })
            .collect();
        Arc::new(FloorPlan::new(&configs).unwrap())
    }

    fn setup_car(number: u32, kind: ElevatorKind, floors: &FloorPlan) -> Arc<Elevator> {
        let config = ElevatorConfig {
            number,
            kind,
            lowest: None,
            highest: None,
            start: None,
            capacity: DEFAULT_CAPACITY,
        };
        Arc::new(Elevator::new(&config, floors).unwrap())
    }

    fn setup_dispatcher(n_floors: usize) -> (Dispatcher, Arc<FloorPlan>, Arc<Elevator>) {
        let floors = setup_floors(&vec![FloorKind::Regular; n_floors]);
        let car = setup_car(1, ElevatorKind::Regular, &floors);
        let dispatcher = Dispatcher::new(
            floors.clone(),
            vec![car.clone()],
            Arc::new(Shutdown::new()),
        );
        (dispatcher, floors, car)
    }

    fn idle_capability(kind: ElevatorKind) -> Capability {
        Capability {
            kind,
            reserved: false,
            free: DEFAULT_CAPACITY,
            direction: None,
            lowest: 0,
            highest: 5,
        }
    }

    #[test]
    fn test_eligibility_service_floor() {
        // Purpose: Verify that only service cars may be sent to a service floor

        // Arrange
        let call = Call { floor: 2, direction: Up };

        // Act & Assert
        assert!(is_eligible(FloorKind::Service, call, 1, &idle_capability(ElevatorKind::Service)));
        assert!(!is_eligible(FloorKind::Service, call, 1, &idle_capability(ElevatorKind::Regular)));
        assert!(!is_eligible(FloorKind::Service, call, 1, &idle_capability(ElevatorKind::Special)));
        assert!(is_eligible(FloorKind::Vip, call, 1, &idle_capability(ElevatorKind::Regular)));
        assert!(is_eligible(FloorKind::Common, call, 1, &idle_capability(ElevatorKind::Service)));
    }

    #[test]
    fn test_eligibility_car_state() {
        // Purpose: Verify the range, room, reservation and direction conditions

        // Arrange
        let call = Call { floor: 3, direction: Down };
        let idle = idle_capability(ElevatorKind::Regular);

        // Act & Assert
        assert!(is_eligible(FloorKind::Regular, call, 1, &idle));
        assert!(!is_eligible(FloorKind::Regular, call, 1, &Capability { highest: 2, ..idle }));
        assert!(!is_eligible(FloorKind::Regular, call, 1, &Capability { lowest: 4, ..idle }));
        assert!(!is_eligible(FloorKind::Regular, call, 1, &Capability { free: 0, ..idle }));
        assert!(!is_eligible(FloorKind::Regular, call, 2, &Capability { free: 1, ..idle }));
        assert!(is_eligible(FloorKind::Regular, call, 2, &Capability { free: 2, ..idle }));
        assert!(!is_eligible(FloorKind::Regular, call, 1, &Capability { reserved: true, ..idle }));
        assert!(!is_eligible(
            FloorKind::Regular,
            call,
            1,
            &Capability { direction: Some(Up), ..idle }
        ));
        assert!(is_eligible(
            FloorKind::Regular,
            call,
            1,
            &Capability { direction: Some(Down), ..idle }
        ));
    }

    #[test]
    fn test_press_is_idempotent() {
        // Purpose: Verify that a second press of a pending call changes nothing

        // Arrange
        let (dispatcher, floors, _car) = setup_dispatcher(4);
        let floor = floors.at(1);

        // Act
        let first = dispatcher.press_up(floor);
        let second = dispatcher.press_up(floor);

        // Assert
        assert!(first);
        assert!(!second);
        assert!(floor.is_pressed(Up));
        assert!(!floor.is_pressed(Down));
        assert_eq!(dispatcher.pending(Up), vec![1]);
        assert!(dispatcher.pending(Down).is_empty());
    }

    #[test]
    fn test_press_without_button() {
        // Purpose: Verify that a floor without a down button cannot raise a down call

        // Arrange
        let configs = vec![
            FloorConfig {
                label: "G".into(),
                kind: FloorKind::Regular,
                buttons: Buttons::Up,
            },
            FloorConfig {
                label: "1".into(),
                kind: FloorKind::Regular,
                buttons: Buttons::Down,
            },
        ];
        let floors = Arc::new(FloorPlan::new(&configs).unwrap());
        let car = setup_car(1, ElevatorKind::Regular, &floors);
        let dispatcher = Dispatcher::new(floors.clone(), vec![car], Arc::new(Shutdown::new()));

        // Act
        let down = dispatcher.press_down(floors.at(0));
        let up = dispatcher.press_up(floors.at(0));

        // Assert
        assert!(!down);
        assert!(up);
        assert!(!dispatcher.has_call(0, Down));
        assert!(dispatcher.has_call(0, Up));
    }

    #[test]
    fn test_press_suppressed_while_door_open() {
        // Purpose: Verify that nobody can call a car while a door stands open at the floor

        // Arrange
        let (dispatcher, floors, car) = setup_dispatcher(3);
        let floor = floors.at(0);
        floor.mark_door_open(&car);

        // Act
        let while_open = dispatcher.press(floor, Up);
        floor.mark_door_closed(&car);
        let after_close = dispatcher.press(floor, Up);

        // Assert
        assert!(!while_open);
        assert!(after_close);
        assert!(floor.is_pressed(Up));
    }

    #[test]
    fn test_call_order() {
        // Purpose: Verify up calls lowest first, then down calls highest first

        // Arrange
        let (dispatcher, floors, _car) = setup_dispatcher(6);

        // Act
        dispatcher.press_up(floors.at(3));
        dispatcher.press_down(floors.at(2));
        dispatcher.press_up(floors.at(1));
        dispatcher.press_down(floors.at(4));

        // Assert
        assert_eq!(dispatcher.pending(Up), vec![1, 3]);
        assert_eq!(dispatcher.pending(Down), vec![4, 2]);
        assert_eq!(dispatcher.next_call(), Some(Call { floor: 1, direction: Up }));
    }

    #[test]
    fn test_dispatch_idle() {
        // Purpose: Verify that nothing happens without calls

        // Arrange
        let (dispatcher, _floors, car) = setup_dispatcher(3);

        // Act
        let outcome = dispatcher.dispatch_once();

        // Assert
        assert_eq!(outcome, Dispatch::Idle);
        assert!(car.targets().is_empty());
    }

    #[test]
    fn test_dispatch_assigns_and_clears() {
        // Purpose: Verify that an assigned call leaves the board and lands in the car

        // Arrange
        let (dispatcher, floors, car) = setup_dispatcher(4);
        dispatcher.press_up(floors.at(2));

        // Act
        let outcome = dispatcher.dispatch_once();

        // Assert
        let call = Call { floor: 2, direction: Up };
        assert_eq!(outcome, Dispatch::Assigned { call, car: 1 });
        assert!(!floors.at(2).is_pressed(Up));
        assert!(!dispatcher.has_call(2, Up));
        assert!(car.is_floor_pressed(2));
        assert_eq!(car.direction(), Some(Up));
    }

    #[test]
    fn test_dispatch_waits_for_committed_car() {
        // Purpose: Verify that a call no car may take stays pending

        // Arrange
        let (dispatcher, floors, car) = setup_dispatcher(4);
        car.assign(0, Down);
        dispatcher.press_up(floors.at(2));

        // Act
        let before = dispatcher.dispatch_once();
        dispatcher.notify_car_freed();
        let after = dispatcher.dispatch_once();

        // Assert
        let call = Call { floor: 2, direction: Up };
        assert_eq!(before, Dispatch::Unassigned { call, freed_seen: 0 });
        assert_eq!(after, Dispatch::Unassigned { call, freed_seen: 1 });
        assert!(floors.at(2).is_pressed(Up));
        assert!(dispatcher.has_call(2, Up));
        assert!(!car.is_floor_pressed(2));
    }

    #[test]
    fn test_dispatch_service_floor() {
        // Purpose: Verify that a service floor call skips regular cars

        // Arrange
        let floors = setup_floors(&[FloorKind::Regular, FloorKind::Service, FloorKind::Regular]);
        let regular = setup_car(1, ElevatorKind::Regular, &floors);
        let service = setup_car(2, ElevatorKind::Service, &floors);
        let dispatcher = Dispatcher::new(
            floors.clone(),
            vec![regular.clone(), service.clone()],
            Arc::new(Shutdown::new()),
        );
        dispatcher.press_down(floors.at(1));
        dispatcher.press_up(floors.at(0));

        // Act
        let first = dispatcher.dispatch_once();
        let second = dispatcher.dispatch_once();

        // Assert
        assert_eq!(
            first,
            Dispatch::Assigned { call: Call { floor: 0, direction: Up }, car: 1 }
        );
        assert_eq!(
            second,
            Dispatch::Assigned { call: Call { floor: 1, direction: Down }, car: 2 }
        );
        assert!(!regular.is_floor_pressed(1));
        assert!(service.is_floor_pressed(1));
    }

    #[test]
    fn test_dispatch_skips_car_without_room() {
        // Purpose: Verify that a car going the right way is passed over when the rider waiting
        // at the call cannot fit, while a rider who fits still gets it

        // Arrange
        let floors = setup_floors(&vec![FloorKind::Regular; 4]);
        let small = |number: u32| {
            let config = ElevatorConfig {
                number,
                kind: ElevatorKind::Regular,
                lowest: None,
                highest: None,
                start: None,
                capacity: 3,
            };
            Arc::new(Elevator::new(&config, &floors).unwrap())
        };
        let busy = small(1);
        let idle = small(2);
        let dispatcher = Dispatcher::new(
            floors.clone(),
            vec![busy.clone(), idle.clone()],
            Arc::new(Shutdown::new()),
        );

        let rider = |name: &str, origin: usize, destination: usize, units: u32| {
            Arc::new(Passenger::new(
                name,
                RiderClass::Resident,
                origin,
                destination,
                Duration::ZERO,
                units,
            ))
        };
        let inside = rider("Royce", 0, 3, 2);
        busy.begin_opening();
        busy.finish_opening();
        assert!(busy.try_admit(&inside, floors.at(0)));
        busy.finish_transit();
        busy.finish_closing();
        busy.assign(3, Up);

        let bulky = rider("Mitchie", 0, 2, 2);
        let light = rider("Lucy", 1, 2, 1);
        floors.at(0).add_waiting(&bulky);
        floors.at(1).add_waiting(&light);
        dispatcher.press_up(floors.at(0));
        dispatcher.press_up(floors.at(1));

        // Act
        let first = dispatcher.dispatch_once();
        let second = dispatcher.dispatch_once();

        // Assert
        assert_eq!(floors.at(0).room_needed(Up), 2);
        assert_eq!(floors.at(1).room_needed(Up), 1);
        assert_eq!(floors.at(2).room_needed(Up), 1);
        assert_eq!(
            first,
            Dispatch::Assigned { call: Call { floor: 0, direction: Up }, car: 2 }
        );
        assert_eq!(
            second,
            Dispatch::Assigned { call: Call { floor: 1, direction: Up }, car: 1 }
        );
        assert!(!busy.is_floor_pressed(0));
        assert!(idle.is_floor_pressed(0));
        assert!(busy.is_floor_pressed(1));
    }

    #[test]
    fn test_run_until_shutdown() {
        // Purpose: Verify that the dispatcher loop hands out calls and stops on shutdown

        // Arrange
        let floors = setup_floors(&vec![FloorKind::Regular; 4]);
        let car = setup_car(1, ElevatorKind::Regular, &floors);
        let shutdown = Arc::new(Shutdown::new());
        let dispatcher = Arc::new(Dispatcher::new(
            floors.clone(),
            vec![car.clone()],
            shutdown.clone(),
        ));
        let (done_tx, done_rx) = unbounded();
        let runner = dispatcher.clone();
        Builder::new()
            .name("dispatcher".into())
            .spawn(move || {
                let _ = done_tx.send(runner.run());
            })
            .unwrap();

        // Act
        dispatcher.press_down(floors.at(3));
        let deadline = Instant::now() + Duration::from_secs(3);
        while !car.is_floor_pressed(3) && Instant::now() < deadline {
            sleep(Duration::from_millis(5));
        }
        shutdown.trigger();
        dispatcher.wake_all();

        // Assert
        assert!(car.is_floor_pressed(3));
        assert!(!floors.at(3).is_pressed(Down));
        match done_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Err(SimError::Interrupted(who))) => assert_eq!(who, "dispatcher"),
            Ok(other) => panic!("Dispatcher stopped unexpectedly: {:?}", other),
            Err(_) => panic!("Timed out waiting for the dispatcher to stop"),
        }
    }
}
