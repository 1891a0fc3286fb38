//! Property tests for supply/demand accumulation.
//!
//! Technologies in different regions and sectors add to the same markets in
//! whatever order the world visits them; the totals must not depend on it.

use marketplace::Marketplace;
use proptest::prelude::*;

const GOODS: [&str; 3] = ["Forest", "FutureForest", "Coal"];

type Contribution = (usize, bool, f64);

fn apply(contributions: &[Contribution]) -> Marketplace {
    let mut mp = Marketplace::new(1);
    for good in GOODS {
        mp.create_market(good, "USA", 1.0, true);
    }
    for (good, is_supply, amount) in contributions {
        let good = GOODS[*good];
        if *is_supply {
            mp.add_to_supply(good, "USA", *amount, 0).unwrap();
        } else {
            mp.add_to_demand(good, "USA", *amount, 0).unwrap();
        }
    }
    mp
}

type Shuffled = (Vec<Contribution>, Vec<Contribution>);

fn contributions_and_permutation() -> impl Strategy<Value = Shuffled> {
    prop::collection::vec((0..GOODS.len(), any::<bool>(), -1.0e6f64..1.0e6), 1..64).prop_flat_map(
        |contributions| {
            let permuted = Just(contributions.clone()).prop_shuffle();
            (Just(contributions), permuted)
        },
    )
}

proptest! {
    #[test]
    fn totals_do_not_depend_on_contribution_order(
        (original, permuted) in contributions_and_permutation()
    ) {
        let a = apply(&original);
        let b = apply(&permuted);
        for good in GOODS {
            prop_assert_eq!(
                a.supply(good, "USA", 0).unwrap().to_bits(),
                b.supply(good, "USA", 0).unwrap().to_bits()
            );
            prop_assert_eq!(
                a.demand(good, "USA", 0).unwrap().to_bits(),
                b.demand(good, "USA", 0).unwrap().to_bits()
            );
        }
    }
}

#[test]
fn test_reset_reads_exact_zero_after_contributions() {
    let mut mp = apply(&[(0, true, 0.1), (0, true, 0.2), (1, false, 0.3)]);
    mp.reset_period(0);
    for good in GOODS {
        assert_eq!(mp.supply(good, "USA", 0).unwrap(), 0.0);
        assert_eq!(mp.demand(good, "USA", 0).unwrap(), 0.0);
    }
}
