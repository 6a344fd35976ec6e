use mva_pop::{
    BoundedIter, FullMap, PartialMap, Population, PopulationIter, PopulationMap, SingleMap,
};
use proptest::prelude::*;
use std::collections::HashSet;

fn bounds() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..4, 1..4)
}

proptest! {
    #[test]
    fn full_map_is_a_bijection_in_iteration_order(bound in bounds()) {
        let bound = Population::from(bound);
        let map = FullMap::new(&bound).unwrap();
        let offsets: Vec<usize> = PopulationIter::new(&bound)
            .map(|n| map.offset(&n).unwrap())
            .collect();
        prop_assert_eq!(offsets.len(), map.len());
        for (i, off) in offsets.iter().enumerate() {
            prop_assert_eq!(*off, i);
        }
    }

    #[test]
    fn decrement_lands_on_a_smaller_offset(bound in bounds()) {
        let bound = Population::from(bound);
        let map = FullMap::new(&bound).unwrap();
        for n in PopulationIter::new(&bound) {
            let here = map.offset(&n).unwrap();
            for k in 0..n.classes() {
                if n[k] == 0 {
                    prop_assert!(map.offset_e_j(&n, k).is_err());
                    continue;
                }
                let below = map.offset_e_j(&n, k).unwrap();
                prop_assert!(below < here);
                prop_assert_eq!(below, map.offset(&n.decremented(k).unwrap()).unwrap());
            }
        }
    }

    #[test]
    fn partial_map_covers_the_neighbourhood(bound in prop::collection::vec(2u32..5, 1..5)) {
        let bound = Population::from(bound);
        let map = PartialMap::new(&bound);
        let mut seen = HashSet::new();
        seen.insert(map.offset(&bound).unwrap());
        for c in 0..bound.classes() {
            let n_c = bound.decremented(c).unwrap();
            seen.insert(map.offset(&n_c).unwrap());
            for j in 0..bound.classes() {
                let via_e_j = map.offset_e_j(&n_c, j).unwrap();
                let direct = map.offset(&n_c.decremented(j).unwrap()).unwrap();
                prop_assert_eq!(via_e_j, direct);
                seen.insert(direct);
            }
        }
        prop_assert_eq!(seen.len(), map.len());
        prop_assert!(seen.iter().all(|&off| off < map.len()));
    }

    #[test]
    fn single_map_slots(bound in prop::collection::vec(1u32..6, 1..6)) {
        let bound = Population::from(bound);
        let map = SingleMap::new(&bound);
        prop_assert_eq!(map.len(), bound.classes() + 1);
        for j in 0..bound.classes() {
            prop_assert_eq!(map.offset_e_j(&bound, j).unwrap(), j + 1);
        }
    }

    #[test]
    fn bounded_iter_agrees_with_full_map(bound in bounds(), shrink in prop::collection::vec(0u32..3, 3)) {
        let bound = Population::from(bound);
        let limit: Vec<u32> = (0..bound.classes())
            .map(|k| bound[k].saturating_sub(shrink[k % shrink.len()]))
            .collect();
        let limit = Population::from(limit);
        let map = FullMap::new(&bound).unwrap();
        let mut count = 0usize;
        for (n, off) in BoundedIter::new(&bound, &limit).unwrap() {
            prop_assert!(!n.is_zero());
            prop_assert!(n.is_bounded_by(&limit));
            prop_assert_eq!(off, map.offset(&n).unwrap());
            count += 1;
        }
        let expected: usize = limit.iter().map(|n| n as usize + 1).product::<usize>() - 1;
        prop_assert_eq!(count, expected);
    }
}
