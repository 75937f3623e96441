//! Role dealing and leader selection.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::{Role, evil_count, good_count};

/// Deals one role per seat for a table of `player_count`.
///
/// Builds the exact Evil/Good multiset and applies a Fisher–Yates shuffle,
/// so every arrangement of the multiset is equally likely.
pub fn deal_roles<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> Vec<Role> {
    let mut roles = Vec::with_capacity(player_count);
    roles.extend(std::iter::repeat_n(Role::Minion, evil_count(player_count)));
    roles.extend(std::iter::repeat_n(Role::LoyalServant, good_count(player_count)));
    roles.shuffle(rng);
    roles
}

/// Picks the seat index of the first leader, uniformly at random.
///
/// # Panics
/// Panics if `player_count` is 0; callers only deal to full tables.
pub fn pick_leader<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> usize {
    rng.random_range(0..player_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Loyalty;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_deal_roles_has_exact_split() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in 5..=10 {
            let roles = deal_roles(n, &mut rng);
            assert_eq!(roles.len(), n);
            let evil = roles.iter().filter(|r| r.loyalty() == Loyalty::Evil).count();
            assert_eq!(evil, evil_count(n));
        }
    }

    #[test]
    fn test_deal_roles_is_deterministic_for_a_seed() {
        let a = deal_roles(8, &mut StdRng::seed_from_u64(99));
        let b = deal_roles(8, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn test_deal_roles_visits_every_seat() {
        // Over many deals every seat should be Evil at least once.
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen_evil = [false; 5];
        for _ in 0..200 {
            for (seat, role) in deal_roles(5, &mut rng).iter().enumerate() {
                if *role == Role::Minion {
                    seen_evil[seat] = true;
                }
            }
        }
        assert!(seen_evil.iter().all(|s| *s));
    }

    #[test]
    fn test_pick_leader_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = [false; 6];
        for _ in 0..300 {
            let idx = pick_leader(6, &mut rng);
            assert!(idx < 6);
            seen[idx] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
