//! The canonical quest table and team-split arithmetic.

/// Fewest players a game can start with.
pub const MIN_PLAYERS: usize = 5;

/// Most players a game can seat.
pub const MAX_PLAYERS: usize = 10;

/// Number of quests in a full game.
pub const ROUNDS: u8 = 5;

/// Team size per round (rows) and player count 5..=10 (columns).
const TEAM_SIZES: [[usize; 6]; 5] = [
    [2, 2, 2, 3, 3, 3],
    [3, 3, 3, 4, 4, 4],
    [2, 4, 3, 4, 4, 4],
    [3, 3, 4, 5, 5, 5],
    [3, 4, 4, 5, 5, 5],
];

/// Number of Evil players for a table of `player_count`: `ceil(n / 3)`.
pub fn evil_count(player_count: usize) -> usize {
    player_count.div_ceil(3)
}

/// Number of Good players for a table of `player_count`.
pub fn good_count(player_count: usize) -> usize {
    player_count - evil_count(player_count)
}

/// How many players must go on the quest in `round` (1-based).
///
/// Returns `None` when `round` is outside 1..=5 or `player_count` is
/// outside 5..=10.
pub fn required_team_size(round: u8, player_count: usize) -> Option<usize> {
    if !(1..=ROUNDS).contains(&round) || !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) {
        return None;
    }
    Some(TEAM_SIZES[usize::from(round - 1)][player_count - MIN_PLAYERS])
}

/// Fail cards needed to sink the quest in `round`.
///
/// The fourth quest at seven or more players needs two; every other
/// quest needs one.
pub fn fails_required(round: u8, player_count: usize) -> usize {
    if round == 4 && player_count >= 7 { 2 } else { 1 }
}

/// Returns `true` if `failures` fail cards sink the quest.
pub fn quest_fails(round: u8, player_count: usize, failures: usize) -> bool {
    failures >= fails_required(round, player_count)
}
