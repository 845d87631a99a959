//! ## Position Module
//! Where the cab is, in half floors. Cell `2*f` is floor `f`, odd cells are
//! the gaps between floors. The floor sensor feed snaps the position onto a
//! floor on arrival and shifts it into the neighbouring gap on leaving, so
//! the queue sort can compare against orders without waiting for the next
//! floor.

use crate::modules::config::NUM_FLOORS;
use crate::modules::fleet::state::Dirn;

pub const CELLS: usize = 2 * NUM_FLOORS as usize - 1;

//-----------------------STRUCTS------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionVector {
    cells: [bool; CELLS],
}

impl PositionVector {
    pub fn new() -> PositionVector {
        PositionVector { cells: [false; CELLS] }
    }

    /// A vector parked at the far end a sweep in `dirn` starts from: the top
    /// for a downward sweep, the bottom for an upward one. The queue sort
    /// uses these for its second and third partitions.
    pub fn extreme_for(dirn: Dirn) -> PositionVector {
        let mut pos = PositionVector::new();
        match dirn {
            Dirn::Down => pos.cells[CELLS - 1] = true,
            Dirn::Up | Dirn::Stop => pos.cells[0] = true,
        }
        pos
    }

    /// Index of the occupied cell. An untouched vector reads as the bottom.
    pub fn cell(&self) -> usize {
        self.cells.iter().position(|&c| c).unwrap_or(0)
    }

    /// The floor the cab is exactly at, if it is not in a gap.
    pub fn at_floor(&self) -> Option<u8> {
        let cell = self.cell();
        if cell % 2 == 0 {
            Some((cell / 2) as u8)
        } else {
            None
        }
    }

    pub fn arrive(&mut self, floor: u8) {
        self.cells = [false; CELLS];
        let cell = 2 * usize::from(floor);
        if cell < CELLS {
            self.cells[cell] = true;
        }
    }

    /// The sensor cleared: shift half a floor along the travel direction.
    pub fn leave(&mut self, dirn: Dirn) {
        let cell = self.cell();
        let next = match dirn {
            Dirn::Up if cell + 1 < CELLS => cell + 1,
            Dirn::Down if cell > 0 => cell - 1,
            _ => return,
        };
        self.cells = [false; CELLS];
        self.cells[next] = true;
    }
}

//-----------------------TESTS--------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrivals_snap_to_the_floor_cell() {
        let mut pos = PositionVector::new();
        pos.arrive(2);
        assert_eq!(pos.cell(), 4);
        assert_eq!(pos.at_floor(), Some(2));
    }

    #[test]
    fn leaving_a_floor_moves_into_the_gap() {
        let mut pos = PositionVector::new();
        pos.arrive(1);
        pos.leave(Dirn::Up);
        assert_eq!(pos.cell(), 3);
        assert_eq!(pos.at_floor(), None);
        pos.arrive(2);
        assert_eq!(pos.at_floor(), Some(2));
    }

    #[test]
    fn shifts_stay_inside_the_shaft() {
        let mut pos = PositionVector::new();
        pos.arrive(0);
        pos.leave(Dirn::Down);
        assert_eq!(pos.cell(), 0);
        pos.arrive(NUM_FLOORS - 1);
        pos.leave(Dirn::Up);
        assert_eq!(pos.cell(), CELLS - 1);
    }

    #[test]
    fn extremes_sit_at_the_sweep_start() {
        assert_eq!(PositionVector::extreme_for(Dirn::Down).cell(), CELLS - 1);
        assert_eq!(PositionVector::extreme_for(Dirn::Up).cell(), 0);
    }
}
