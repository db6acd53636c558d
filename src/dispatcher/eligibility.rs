use crate::elevator::Capability;
use crate::shared::{Direction, ElevatorKind, FloorKind};

/// A directional request raised at a floor and not yet handed to a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub floor: usize,
    pub direction: Direction,
}

/// Whether a car described by `car` may take `call`, raised at a floor of kind `floor_kind`
/// where the smallest rider waiting to go the call's way takes `room_needed` units.
///
/// Service floors are served by service cars only. Otherwise the car must reach the floor, have
/// room for that rider, not be reserved, and be idle or already committed to the call's
/// direction.
pub fn is_eligible(
    floor_kind: FloorKind,
    call: Call,
    room_needed: u32,
    car: &Capability,
) -> bool {
    if floor_kind == FloorKind::Service && car.kind != ElevatorKind::Service {
        return false;
    }
    if call.floor < car.lowest || call.floor > car.highest {
        return false;
    }

    car.free >= room_needed.max(1)
        && !car.reserved
        && (car.direction.is_none() || car.direction == Some(call.direction))
}
