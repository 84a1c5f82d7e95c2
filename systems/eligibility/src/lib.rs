#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic system that re-evaluates which pieces can leave the grid.
//!
//! Presentation layers use the emitted transitions to highlight pieces whose
//! escape just opened up or closed off. The session is queried through the
//! injected `can_exit` predicate so the system itself stays pure.

use std::collections::BTreeMap;

use combine_rush_core::{CellCoord, Event, PieceId, PiecePhase, PieceView};

/// Pure system that caches per-piece exit eligibility and reports changes.
#[derive(Debug, Default)]
pub struct Eligibility {
    known: BTreeMap<PieceId, bool>,
}

impl Eligibility {
    /// Creates a new eligibility system with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes session events and the current piece view to emit
    /// [`Event::ExitEligibilityChanged`] transitions.
    ///
    /// Only idle, clickable pieces are evaluated, in ascending id order.
    /// A transition is emitted when a piece's eligibility differs from the
    /// cached value, and always on first sight of a piece.
    pub fn handle<F>(
        &mut self,
        events: &[Event],
        pieces: &PieceView,
        can_exit: F,
        out: &mut Vec<Event>,
    ) where
        F: Fn(CellCoord) -> bool,
    {
        let mut reset = false;
        let mut recheck = false;
        for event in events {
            match event {
                Event::LevelLoaded { .. } | Event::LevelCleared => {
                    reset = true;
                    recheck = true;
                }
                Event::GridChanged { .. } | Event::GridCleared | Event::BarrelBroken { .. } => {
                    recheck = true;
                }
                _ => {}
            }
        }

        if reset {
            self.known.clear();
        }
        if !recheck {
            return;
        }

        let mut current = BTreeMap::new();
        for snapshot in pieces.iter() {
            if snapshot.phase != PiecePhase::Idle || !snapshot.kind.is_clickable() {
                continue;
            }
            let Some(cell) = snapshot.cell else {
                continue;
            };

            let eligible = can_exit(cell);
            let _ = current.insert(snapshot.id, eligible);
            if self.known.get(&snapshot.id) != Some(&eligible) {
                out.push(Event::ExitEligibilityChanged {
                    piece: snapshot.id,
                    can_exit: eligible,
                });
            }
        }
        self.known = current;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combine_rush_core::{PieceColor, PieceKind, PieceSnapshot};

    fn idle_simple(id: u32, cell: CellCoord) -> PieceSnapshot {
        PieceSnapshot {
            id: PieceId::new(id),
            kind: PieceKind::Simple {
                color: PieceColor::Red,
            },
            phase: PiecePhase::Idle,
            cell: Some(cell),
        }
    }

    fn grid_changed() -> Event {
        Event::GridChanged {
            cell: CellCoord::new(0, 0),
            occupied: false,
        }
    }

    #[test]
    fn first_sight_always_emits() {
        let mut eligibility = Eligibility::new();
        let pieces = PieceView::from_snapshots(vec![
            idle_simple(1, CellCoord::new(0, 0)),
            idle_simple(0, CellCoord::new(1, 0)),
        ]);

        let mut out = Vec::new();
        eligibility.handle(&[grid_changed()], &pieces, |_| true, &mut out);

        assert_eq!(
            out,
            vec![
                Event::ExitEligibilityChanged {
                    piece: PieceId::new(0),
                    can_exit: true,
                },
                Event::ExitEligibilityChanged {
                    piece: PieceId::new(1),
                    can_exit: true,
                },
            ]
        );
    }

    #[test]
    fn unchanged_eligibility_stays_silent() {
        let mut eligibility = Eligibility::new();
        let pieces = PieceView::from_snapshots(vec![idle_simple(0, CellCoord::new(0, 0))]);

        let mut out = Vec::new();
        eligibility.handle(&[grid_changed()], &pieces, |_| true, &mut out);
        out.clear();
        eligibility.handle(&[grid_changed()], &pieces, |_| true, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn no_relevant_event_means_no_work() {
        let mut eligibility = Eligibility::new();
        let pieces = PieceView::from_snapshots(vec![idle_simple(0, CellCoord::new(0, 0))]);

        let mut out = Vec::new();
        eligibility.handle(&[], &pieces, |_| true, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn barrels_and_travellers_are_skipped() {
        let mut eligibility = Eligibility::new();
        let pieces = PieceView::from_snapshots(vec![
            PieceSnapshot {
                id: PieceId::new(0),
                kind: PieceKind::Barrel {
                    color: PieceColor::Blue,
                },
                phase: PiecePhase::Idle,
                cell: Some(CellCoord::new(0, 0)),
            },
            PieceSnapshot {
                id: PieceId::new(1),
                kind: PieceKind::Simple {
                    color: PieceColor::Red,
                },
                phase: PiecePhase::Traveling,
                cell: None,
            },
        ]);

        let mut out = Vec::new();
        eligibility.handle(&[grid_changed()], &pieces, |_| true, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn level_load_resets_the_cache() {
        let mut eligibility = Eligibility::new();
        let pieces = PieceView::from_snapshots(vec![idle_simple(0, CellCoord::new(0, 0))]);

        let mut out = Vec::new();
        eligibility.handle(&[grid_changed()], &pieces, |_| true, &mut out);
        out.clear();

        let reload = Event::LevelLoaded {
            name: "again".to_owned(),
            columns: 2,
            rows: 2,
        };
        eligibility.handle(&[reload], &pieces, |_| true, &mut out);

        assert_eq!(
            out,
            vec![Event::ExitEligibilityChanged {
                piece: PieceId::new(0),
                can_exit: true,
            }]
        );
    }
}
