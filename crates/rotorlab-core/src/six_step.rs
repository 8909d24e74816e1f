//! Six-step (trapezoidal) commutation
//!
//! The classic sensored BLDC drive: the electrical revolution is divided
//! into six 60° sectors. In each sector exactly two phases conduct (one
//! tied high, one tied low) while the third floats. Current then flows
//! through the two coils whose line-to-line back-EMF is near its peak,
//! which is what makes the crude scheme work at all.
//!
//! A phase-advance term shifts the sector boundaries relative to the
//! rotor, trading torque at low speed for torque at high speed where the
//! winding inductance delays the current buildup.

use crate::gate::Switch;
use crate::types::Scalar;
use std::f64::consts::PI;

/// Gate commands for the sector containing `electrical_angle` shifted by
/// `phase_advance` (in turns, [-0.5, 0.5]).
///
/// Sector order over one electrical revolution: A+B−, A+C−, B+C−, B+A−,
/// C+A−, C+B−.
pub fn commands(electrical_angle: Scalar, phase_advance: Scalar) -> [Switch; 3] {
    use Switch::{High, Low, Off};

    let shifted = (electrical_angle + 2.0 * PI * phase_advance).rem_euclid(2.0 * PI);
    let sector = ((shifted / (PI / 3.0)) as usize).min(5);

    match sector {
        0 => [High, Low, Off],  // A+ B-
        1 => [High, Off, Low],  // A+ C-
        2 => [Off, High, Low],  // B+ C-
        3 => [Low, High, Off],  // B+ A-
        4 => [Low, Off, High],  // C+ A-
        5 => [Off, Low, High],  // C+ B-
        _ => unreachable!("sector index clamped to 0..=5"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_distinct_sectors() {
        let mut seen = Vec::new();
        for k in 0..6 {
            let angle = (k as Scalar + 0.5) * PI / 3.0;
            let cmd = commands(angle, 0.0);
            assert!(!seen.contains(&cmd), "sector {} repeats a pattern", k);
            seen.push(cmd);
        }
    }

    #[test]
    fn test_every_sector_has_one_of_each() {
        for k in 0..6 {
            let cmd = commands(k as Scalar * PI / 3.0 + 0.1, 0.0);
            let highs = cmd.iter().filter(|&&s| s == Switch::High).count();
            let lows = cmd.iter().filter(|&&s| s == Switch::Low).count();
            let offs = cmd.iter().filter(|&&s| s == Switch::Off).count();
            assert_eq!((highs, lows, offs), (1, 1, 1));
        }
    }

    #[test]
    fn test_phase_advance_shifts_sectors() {
        // Half a sector of advance moves the boundary by 60°·0.5.
        let angle = 0.1;
        let advanced = commands(angle, 1.0 / 6.0);
        let base = commands(angle + PI / 3.0, 0.0);
        assert_eq!(advanced, base);
    }

    #[test]
    fn test_negative_angles_wrap() {
        let cmd = commands(-0.1, 0.0);
        // -0.1 rad wraps to just under 2π: the last sector.
        assert_eq!(cmd, commands(2.0 * PI - 0.1, 0.0));
    }

    #[test]
    fn test_first_sector_drives_a_to_b() {
        assert_eq!(
            commands(0.1, 0.0),
            [Switch::High, Switch::Low, Switch::Off]
        );
    }
}
