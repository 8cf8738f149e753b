//! Commands passed into LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::GearPolarity;
use hw_if::{Direction, Duty};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Directional primitives of the differential drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Motion {
    Forward,
    Reverse,
    PivotLeft,
    PivotRight,
}

/// A demand on the drive, issued once per teleoperation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveDemand {
    /// Run in the given motion with independent left and right duties
    Drive {
        motion: Motion,
        left: Duty,
        right: Duty,
    },

    /// Brake both motors
    Stop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Motion {
    pub const ALL: [Motion; 4] = [
        Motion::Forward,
        Motion::Reverse,
        Motion::PivotLeft,
        Motion::PivotRight,
    ];

    /// The (left, right) shaft directions producing this motion.
    pub fn directions(self, polarity: GearPolarity) -> (Direction, Direction) {
        use Direction::{Clockwise as Cw, CounterClockwise as Ccw};

        let type_a = match self {
            Motion::Forward => (Cw, Ccw),
            Motion::Reverse => (Ccw, Cw),
            Motion::PivotLeft => (Ccw, Ccw),
            Motion::PivotRight => (Cw, Cw),
        };

        match polarity {
            GearPolarity::TypeA => type_a,
            GearPolarity::TypeB => (type_a.0.inverse(), type_a.1.inverse()),
        }
    }

    /// The motion driving the opposite way.
    pub fn inverse(self) -> Self {
        match self {
            Motion::Forward => Motion::Reverse,
            Motion::Reverse => Motion::Forward,
            Motion::PivotLeft => Motion::PivotRight,
            Motion::PivotRight => Motion::PivotLeft,
        }
    }
}

impl DriveDemand {
    /// Same duty on both sides.
    pub fn uniform(motion: Motion, speed: Duty) -> Self {
        DriveDemand::Drive {
            motion,
            left: speed,
            right: speed,
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use Direction::{Clockwise as Cw, CounterClockwise as Ccw};

    #[test]
    fn test_direction_tables() {
        let table = [
            (GearPolarity::TypeA, Motion::Forward, (Cw, Ccw)),
            (GearPolarity::TypeA, Motion::Reverse, (Ccw, Cw)),
            (GearPolarity::TypeA, Motion::PivotLeft, (Ccw, Ccw)),
            (GearPolarity::TypeA, Motion::PivotRight, (Cw, Cw)),
            (GearPolarity::TypeB, Motion::Forward, (Ccw, Cw)),
            (GearPolarity::TypeB, Motion::Reverse, (Cw, Ccw)),
            (GearPolarity::TypeB, Motion::PivotLeft, (Cw, Cw)),
            (GearPolarity::TypeB, Motion::PivotRight, (Ccw, Ccw)),
        ];

        for (polarity, motion, dirs) in table.iter() {
            assert_eq!(motion.directions(*polarity), *dirs, "{:?} {:?}", polarity, motion);
        }
    }

    #[test]
    fn test_inverse_motions() {
        for polarity in GearPolarity::ALL.iter() {
            for motion in Motion::ALL.iter() {
                let (l, r) = motion.directions(*polarity);
                assert_eq!(
                    motion.inverse().directions(*polarity),
                    (l.inverse(), r.inverse())
                );
            }

            // Pivots turn both shafts the same way
            let (l, r) = Motion::PivotLeft.directions(*polarity);
            assert_eq!(l, r);
            let (l, r) = Motion::PivotRight.directions(*polarity);
            assert_eq!(l, r);
        }
    }
}
