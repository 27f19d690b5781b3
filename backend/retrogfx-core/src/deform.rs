use crate::trig;
use bincode::{Decode, Encode};

pub const DEFORMATION_LEN: usize = 512;
const DEFORMATION_MASK: i32 = DEFORMATION_LEN as i32 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum DeformationTarget {
    Foreground,
    ForegroundWater,
    Background,
    BackgroundWater,
}

impl DeformationTarget {
    /// Ring used by a layer region: foreground is stage layer 0.
    #[must_use]
    pub fn for_region(foreground: bool, underwater: bool) -> Self {
        match (foreground, underwater) {
            (true, false) => Self::Foreground,
            (true, true) => Self::ForegroundWater,
            (false, false) => Self::Background,
            (false, true) => Self::BackgroundWater,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Foreground => 0,
            Self::ForegroundWater => 1,
            Self::Background => 2,
            Self::BackgroundWater => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub enum WaveType {
    /// Fill the whole ring, capping values below the wave width
    #[default]
    Full,
    /// Fill only `count` entries starting at `offset`
    Partial,
}

/// Four rings of per-line horizontal (or per-column vertical) offsets.
#[derive(Debug, Clone, Encode, Decode)]
pub struct DeformationTables {
    rings: [[i32; DEFORMATION_LEN]; 4],
}

impl Default for DeformationTables {
    fn default() -> Self {
        Self { rings: [[0; DEFORMATION_LEN]; 4] }
    }
}

impl DeformationTables {
    #[inline]
    #[must_use]
    pub fn sample(&self, target: DeformationTarget, position: i32) -> i32 {
        self.rings[target.index()][(position & DEFORMATION_MASK) as usize]
    }

    #[must_use]
    pub fn ring(&self, target: DeformationTarget) -> &[i32; DEFORMATION_LEN] {
        &self.rings[target.index()]
    }

    /// Fill a ring with a sine wave of the given period (`wave_length` entries) and amplitude.
    /// A non-positive wave length is ignored.
    pub fn set_wave(
        &mut self,
        target: DeformationTarget,
        wave_length: i32,
        wave_width: i32,
        wave_type: WaveType,
        offset: usize,
        count: usize,
    ) {
        if wave_length <= 0 {
            log::warn!("Ignoring deformation wave with length {wave_length}");
            return;
        }

        let wave = |i: usize| {
            let angle = ((i as i64 * DEFORMATION_LEN as i64) / i64::from(wave_length)) as i32;
            wave_width.wrapping_mul(trig::sin512(angle)) >> 9
        };

        let ring = &mut self.rings[target.index()];
        match wave_type {
            WaveType::Partial => {
                for i in offset..offset.saturating_add(count).min(DEFORMATION_LEN) {
                    ring[i] = wave(i);
                }
            }
            WaveType::Full => {
                for (i, value) in ring.iter_mut().enumerate() {
                    *value = wave(i);
                    if wave_width > 0 && *value >= wave_width {
                        *value = wave_width - 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn full_wave() {
        let mut tables = DeformationTables::default();
        tables.set_wave(DeformationTarget::Background, 128, 8, WaveType::Full, 0, 0);

        let ring = tables.ring(DeformationTarget::Background);
        assert_eq!(0, ring[0]);
        // Peak of the first period is capped below the wave width
        assert_eq!(7, ring[32]);
        assert_eq!(-8, ring[96]);
        assert_eq!(ring[5], ring[133]);

        assert_eq!(ring[32], tables.sample(DeformationTarget::Background, 32 + 512));
        assert!(tables.ring(DeformationTarget::Foreground).iter().all(|&value| value == 0));
    }

    #[test]
    fn partial_wave() {
        let mut tables = DeformationTables::default();
        tables.set_wave(DeformationTarget::ForegroundWater, 64, 16, WaveType::Partial, 500, 50);

        let ring = tables.ring(DeformationTarget::ForegroundWater);
        assert!(ring[..500].iter().all(|&value| value == 0));
        assert_eq!(16 * trig::sin512(500 * 8) >> 9, ring[500]);
        assert_eq!(16 * trig::sin512(511 * 8) >> 9, ring[511]);
    }
}
