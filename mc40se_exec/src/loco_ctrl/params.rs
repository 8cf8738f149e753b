//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::motor_drv::DriveKind;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Params {
    /// Polarity of the gearboxes fitted to the drive motors.
    pub gear_polarity: GearPolarity,

    /// The type of motor driver the board is fitted with.
    pub drive_kind: DriveKind,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Direction convention of the fitted gearboxes.
///
/// Some gearboxes reverse the output shaft relative to the motor and some do not, which flips the
/// meaning of clockwise for locomotion. This is a physical property of the attached motors and must
/// be set to match them, a wrong value silently reverses every motion.
///
/// Motors are listed as `power - gear ratio`:
///
/// - `TypeA`: Linix 10W - 5, 15 and 30W - 20. Vexta 15W - 5, 10, 15, 50, 100, 30W and 50W - 5,
///   10, 15, 20, 200.
/// - `TypeB`: Linix 30W - 10. Vexta 15W - 20, 30, 200, 30W and 50W - 30, 50, 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GearPolarity {
    TypeA,
    TypeB,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GearPolarity {
    pub const ALL: [GearPolarity; 2] = [GearPolarity::TypeA, GearPolarity::TypeB];
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_params() {
        let p: Params = util::params::from_str(
            "gear_polarity = \"TypeB\"\ndrive_kind = \"Brush\"\n",
        )
        .unwrap();

        assert_eq!(p.gear_polarity, GearPolarity::TypeB);
        assert_eq!(p.drive_kind, DriveKind::Brush);

        assert!(util::params::from_str::<Params>("gear_polarity = \"TypeC\"\n").is_err());
    }
}
