/*
 * Unit tests for passenger module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Tests:
 *  - test_passenger_from_journey
 *  - test_passenger_from_journey_errors
 *  - test_passenger_same_floor
 *  - test_passenger_interrupted_while_waiting
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod passenger_tests {
    use crate::building::Building;
    use crate::config::{parse_config, Config, JourneyConfig, TimingConfig};
    use crate::error::SimError;
    use crate::passenger::Passenger;
    use crate::shared::Direction::{Down, Up};
    use crate::shared::RiderClass;
    use crossbeam_channel::unbounded;
    use std::sync::Arc;
    use std::thread::sleep;
    use std::time::Duration;

    const THREE_FLOORS: &str = r#"
        [building]
        name = "Building3F1E"

        [[building.floors]]
        label = "G"
        buttons = "up"

        [[building.floors]]
        label = "1"
        buttons = "up"

        [[building.floors]]
        label = "2"
        buttons = "down"

        [[building.elevators]]
        number = 1
    "#;

    fn setup_config() -> Config {
        parse_config(THREE_FLOORS).unwrap()
    }

    fn setup_building() -> Arc<Building> {
        let timing = TimingConfig {
            per_floor_ms: 5,
            door_ms: 5,
            initial_open_ms: 20,
            boarding_ms: 5,
            close_poll_ms: 10,
            settle_ms: 50,
        };
        Building::new(&setup_config().building, timing).unwrap()
    }

    #[test]
    fn test_passenger_from_journey() {
        // Purpose: Verify that a journey becomes a rider with the right floors and direction

        // Arrange
        let building = setup_building();
        let mut journey = JourneyConfig::new("Mitchie", "2", "G");
        journey.class = RiderClass::Manager;
        journey.delay_ms = 250;
        journey.capacity = 2;

        // Act
        let passenger = Passenger::from_journey(&journey, building.floors()).unwrap();

        // Assert
        assert_eq!(passenger.name(), "Mitchie");
        assert_eq!(passenger.class(), RiderClass::Manager);
        assert_eq!(passenger.origin(), 2);
        assert_eq!(passenger.destination(), 0);
        assert_eq!(passenger.direction(), Down);
        assert_eq!(passenger.current_floor(), 2);
        assert_eq!(passenger.capacity(), 2);

        let up = Passenger::from_journey(&JourneyConfig::new("Royce", "1", "2"), building.floors())
            .unwrap();
        assert_eq!(up.direction(), Up);
    }

    #[test]
    fn test_passenger_from_journey_errors() {
        // Purpose: Verify unknown floors, missing buttons and weightless riders are refused

        // Arrange
        let building = setup_building();
        let unknown = JourneyConfig::new("Rye", "G", "9");
        let no_button = JourneyConfig::new("Lucy", "1", "G");
        let with_button = JourneyConfig::new("Lucy", "2", "1");
        let same_floor = JourneyConfig::new("Cid", "1", "1");
        let mut weightless = JourneyConfig::new("Ada", "1", "2");
        weightless.capacity = 0;

        // Act & Assert
        assert!(matches!(
            Passenger::from_journey(&unknown, building.floors()),
            Err(SimError::UnknownFloor(label)) if label == "9"
        ));
        assert!(matches!(
            Passenger::from_journey(&no_button, building.floors()),
            Err(SimError::Config(_))
        ));
        assert!(matches!(
            Passenger::from_journey(&weightless, building.floors()),
            Err(SimError::Config(_))
        ));
        assert!(Passenger::from_journey(&with_button, building.floors()).is_ok());
        assert!(Passenger::from_journey(&same_floor, building.floors()).is_ok());
    }

    #[test]
    fn test_passenger_same_floor() {
        // Purpose: Verify that a rider already at the destination finishes without a car

        // Arrange
        let building = setup_building();
        let passenger = Arc::new(
            Passenger::from_journey(&JourneyConfig::new("Rye", "1", "1"), building.floors())
                .unwrap(),
        );

        // Act
        let report = passenger.run(&building).unwrap();

        // Assert
        assert_eq!(report.elevator, None);
        assert_eq!(report.origin, "1");
        assert_eq!(report.destination, "1");
        assert_eq!(report.waited_ms, 0);
        assert!(!building.floor(1).unwrap().is_pressed(Up));
        assert!(!building.floor(1).unwrap().is_pressed(Down));
    }

    #[test]
    fn test_passenger_interrupted_while_waiting() {
        // Purpose: Verify that a rider waiting for a car that never comes stops on shutdown

        // Arrange
        let building = setup_building();
        let (report_tx, report_rx) = unbounded();
        building
            .spawn_passenger(&JourneyConfig::new("Royce", "G", "2"), report_tx)
            .unwrap();

        // Act
        sleep(Duration::from_millis(100));
        let pressed = building.floor(0).unwrap().is_pressed(Up);
        building.shutdown();

        // Assert
        assert!(pressed);
        match report_rx.recv_timeout(Duration::from_secs(3)) {
            Ok(Err(SimError::Interrupted(who))) => assert_eq!(who, "Royce"),
            Ok(other) => panic!("Unexpected journey result: {:?}", other),
            Err(_) => panic!("Timed out waiting for the rider to give up"),
        }
        assert_eq!(building.floor(0).unwrap().waiting_count(), 1);
    }
}
