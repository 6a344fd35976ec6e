use core::fmt;
use core::num::NonZeroU32;

/// Position of a chain (or station) in the order the model declares it.
///
/// Stored off by one in a `NonZeroU32` so `Option<ChainId>` costs nothing extra.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    /// Indices past `u32::MAX - 1` saturate.
    pub fn from_index(index: usize) -> Self {
        let raw = u32::try_from(index).unwrap_or(u32::MAX - 1);
        Self(NonZeroU32::MIN.saturating_add(raw))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.index(), f)
    }
}

pub type StationId = Id;
pub type ChainId = Id;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn index_survives_the_offset(i in 0_usize..1_000_000) {
            prop_assert_eq!(ChainId::from_index(i).index(), i);
        }
    }

    #[test]
    fn niche_keeps_option_small() {
        assert_eq!(
            core::mem::size_of::<StationId>(),
            core::mem::size_of::<Option<StationId>>()
        );
        assert_eq!(format!("{:?} {}", Id::from_index(3), Id::from_index(3)), "#3 3");
    }
}
