#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic system that wakes barrels and pipes after grid changes.
//!
//! Barrels break open once any cardinal neighbour frees up; pipes emit their
//! next queued piece once the cell they face frees up. The system only
//! proposes commands; the session re-validates the conditions on apply.

use combine_rush_core::{
    Command, Event, OccupancyView, PieceKind, PiecePhase, PieceView, CARDINAL_DIRECTIONS,
};

/// Pure system that proposes barrel-break and pipe-dispense commands.
#[derive(Debug, Default)]
pub struct Spawners;

impl Spawners {
    /// Creates a new spawners system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Consumes session events and immutable views to emit commands.
    ///
    /// Pieces are inspected in ascending id order so the command batch is
    /// deterministic. Competing proposals (two pipes facing the same free
    /// cell, say) are resolved by the session, which applies them in order
    /// and drops the ones whose condition no longer holds.
    pub fn handle(
        &self,
        events: &[Event],
        pieces: &PieceView,
        occupancy: OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        let relevant = events.iter().any(|event| {
            matches!(
                event,
                Event::GridChanged { .. } | Event::GridCleared | Event::LevelLoaded { .. }
            )
        });
        if !relevant {
            return;
        }

        for snapshot in pieces.iter() {
            if snapshot.phase != PiecePhase::Idle {
                continue;
            }
            let Some(cell) = snapshot.cell else {
                continue;
            };

            match &snapshot.kind {
                PieceKind::Barrel { .. } => {
                    let freed = CARDINAL_DIRECTIONS.iter().any(|&direction| {
                        cell.neighbor(direction)
                            .map_or(false, |neighbor| occupancy.is_walkable(neighbor))
                    });
                    if freed {
                        out.push(Command::BreakBarrel { piece: snapshot.id });
                    }
                }
                PieceKind::Pipe { facing, .. } => {
                    let open = cell
                        .neighbor(*facing)
                        .map_or(false, |neighbor| occupancy.is_walkable(neighbor));
                    if open {
                        out.push(Command::DispensePipe { piece: snapshot.id });
                    }
                }
                PieceKind::Simple { .. } => {}
            }
        }
    }
}
