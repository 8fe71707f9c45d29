//! Reorder decision for a single drag gesture.
//!
//! # Invariants
//! - A reorder yields exactly one new rank, for the moved item only.
//! - Neighbor ranks are read, never rewritten.
//! - UI-only header slots never enter the rank space.

use super::engine::{append, between, initial, prepend};
use super::{Rank, RankError, RankResult};

/// One slot of a rendered column header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSlot {
    /// Leading row-selection checkbox column.
    Selection,
    /// Real column with its persisted rank.
    Column(Rank),
    /// Trailing "add column" affordance.
    AddColumn,
}

impl HeaderSlot {
    /// Returns the rank for real columns, `None` for UI-only slots.
    pub fn rank(&self) -> Option<&Rank> {
        match self {
            Self::Column(rank) => Some(rank),
            Self::Selection | Self::AddColumn => None,
        }
    }
}

/// Computes the new rank for the item dragged from `old_index` to `new_index`.
///
/// `ordered` is the ascending rank list of all siblings, moved item included.
/// `new_index` is the item's position once the move is applied.
///
/// # Errors
/// - `RankError::IndexOutOfRange` when either index is outside `ordered`.
/// - `RankError::UnorderedSiblings` when `ordered` is not strictly ascending.
/// - `RankError::EmptyNeighbor` / `RankError::Exhausted` from rank generation.
pub fn reorder(ordered: &[Rank], old_index: usize, new_index: usize) -> RankResult<Rank> {
    let len = ordered.len();
    for index in [old_index, new_index] {
        if index >= len {
            return Err(RankError::IndexOutOfRange { index, len });
        }
    }
    ensure_ascending(ordered)?;

    if old_index == new_index {
        return Ok(ordered[old_index].clone());
    }
    if len == 1 {
        return Ok(initial());
    }

    let others = ordered
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != old_index)
        .map(|(_, rank)| rank)
        .collect::<Vec<_>>();

    if new_index == 0 {
        return prepend(others[0]);
    }
    if new_index == others.len() {
        return Ok(append(others[others.len() - 1]));
    }
    between(others[new_index - 1], others[new_index])
}

/// Computes the new rank for a column dragged within the raw header row.
///
/// Indices address `headers` as rendered, sentinel slots included. Dropping
/// onto a sentinel position lands the column at the nearest real position.
///
/// # Errors
/// - `RankError::SentinelNotMovable` when `source` is not a real column.
/// - Any error from [`reorder`].
pub fn reorder_columns(
    headers: &[HeaderSlot],
    source: usize,
    destination: usize,
) -> RankResult<Rank> {
    let len = headers.len();
    for index in [source, destination] {
        if index >= len {
            return Err(RankError::IndexOutOfRange { index, len });
        }
    }
    if headers[source].rank().is_none() {
        return Err(RankError::SentinelNotMovable { index: source });
    }

    let ranks = headers
        .iter()
        .filter_map(HeaderSlot::rank)
        .cloned()
        .collect::<Vec<_>>();
    let old_index = headers[..source]
        .iter()
        .filter(|slot| slot.rank().is_some())
        .count();
    let new_index = headers
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != source)
        .take(destination)
        .filter(|(_, slot)| slot.rank().is_some())
        .count();

    reorder(&ranks, old_index, new_index)
}

fn ensure_ascending(ordered: &[Rank]) -> RankResult<()> {
    for (index, pair) in ordered.windows(2).enumerate() {
        if pair[0] >= pair[1] {
            return Err(RankError::UnorderedSiblings {
                index: index + 1,
                lower: pair[0].clone(),
                upper: pair[1].clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{reorder, reorder_columns, HeaderSlot};
    use crate::rank::{append, initial, prepend, Rank, RankError};

    fn ranks(keys: &[&str]) -> Vec<Rank> {
        keys.iter().map(|key| Rank::parse(*key).unwrap()).collect()
    }

    fn apply(list: &[Rank], old_index: usize, new_rank: Rank) -> Vec<Rank> {
        let mut next = list.to_vec();
        next[old_index] = new_rank;
        next.sort();
        next
    }

    #[test]
    fn moving_to_front_prepends() {
        let list = ranks(&["a0", "a1", "a2"]);
        let rank = reorder(&list, 2, 0).unwrap();
        assert!(rank < list[0]);
    }

    #[test]
    fn moving_to_end_appends() {
        let list = ranks(&["a0", "a1", "a2"]);
        let rank = reorder(&list, 0, 2).unwrap();
        assert!(rank > list[2]);
        let reordered = apply(&list, 0, rank.clone());
        assert_eq!(reordered, vec![list[1].clone(), list[2].clone(), rank]);
    }

    #[test]
    fn moving_down_lands_after_item_at_destination() {
        let list = ranks(&["a0", "a1", "a2", "a3"]);
        let rank = reorder(&list, 0, 2).unwrap();
        assert!(list[2] < rank && rank < list[3]);
    }

    #[test]
    fn moving_up_lands_before_item_at_destination() {
        let list = ranks(&["a0", "a1", "a2", "a3"]);
        let rank = reorder(&list, 3, 1).unwrap();
        assert!(list[0] < rank && rank < list[1]);
    }

    #[test]
    fn same_position_keeps_current_rank() {
        let list = ranks(&["a0", "a1"]);
        assert_eq!(reorder(&list, 1, 1).unwrap(), list[1]);
    }

    #[test]
    fn lone_item_in_place_keeps_its_rank() {
        let list = ranks(&["a1"]);
        assert_eq!(reorder(&list, 0, 0).unwrap(), list[0]);
        assert_ne!(list[0], initial());
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let list = ranks(&["a0", "a1"]);
        assert_eq!(
            reorder(&list, 0, 2),
            Err(RankError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            reorder(&[], 0, 0),
            Err(RankError::IndexOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn rejects_duplicate_sibling_ranks() {
        let list = ranks(&["a0", "a1", "a1"]);
        assert!(matches!(
            reorder(&list, 0, 1),
            Err(RankError::UnorderedSiblings { index: 2, .. })
        ));
    }

    #[test]
    fn column_reorder_ignores_sentinels() {
        let col_a = Rank::parse("a5").unwrap();
        let col_b = Rank::parse("aA").unwrap();
        let headers = vec![
            HeaderSlot::Selection,
            HeaderSlot::Column(col_a.clone()),
            HeaderSlot::Column(col_b.clone()),
            HeaderSlot::AddColumn,
        ];

        let rank = reorder_columns(&headers, 1, 2).unwrap();
        assert_eq!(rank, append(&col_b));
        assert_eq!(reorder_columns(&headers, 1, 3).unwrap(), rank);

        let to_front = reorder_columns(&headers, 2, 1).unwrap();
        assert_eq!(to_front, prepend(&col_a).unwrap());
        assert_eq!(reorder_columns(&headers, 2, 0).unwrap(), to_front);
    }

    #[test]
    fn column_drop_on_sentinel_clamps_to_nearest_column() {
        let headers = vec![
            HeaderSlot::Selection,
            HeaderSlot::Column(Rank::parse("a1").unwrap()),
            HeaderSlot::Column(Rank::parse("a2").unwrap()),
            HeaderSlot::Column(Rank::parse("a3").unwrap()),
            HeaderSlot::AddColumn,
        ];

        let to_front = reorder_columns(&headers, 3, 0).unwrap();
        assert!(to_front < Rank::parse("a1").unwrap());

        let to_back = reorder_columns(&headers, 1, 4).unwrap();
        assert!(to_back > Rank::parse("a3").unwrap());
    }

    #[test]
    fn sentinel_slots_cannot_be_dragged() {
        let headers = vec![
            HeaderSlot::Selection,
            HeaderSlot::Column(Rank::parse("a1").unwrap()),
            HeaderSlot::AddColumn,
        ];
        assert_eq!(
            reorder_columns(&headers, 0, 1),
            Err(RankError::SentinelNotMovable { index: 0 })
        );
        assert_eq!(
            reorder_columns(&headers, 2, 1),
            Err(RankError::SentinelNotMovable { index: 2 })
        );
    }
}
