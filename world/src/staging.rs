//! Staging line that absorbs exiting pieces and resolves colour matches.

use combine_rush_core::{PieceColor, PieceId, SlotShift, StagedSnapshot};

/// Ordered, capacity-bounded buffer of staged pieces.
///
/// Insertion keeps equal colours adjacent and every mutation is followed by
/// match resolution to a fixed point, so the line is always stable between
/// calls.
#[derive(Clone, Debug)]
pub(crate) struct StagingLine {
    capacity: usize,
    match_threshold: usize,
    slots: Vec<StagedPiece>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct StagedPiece {
    id: PieceId,
    color: PieceColor,
}

/// Result of a successful placement, including the animation trace.
#[derive(Clone, Debug)]
pub(crate) struct Placement {
    /// Slot index the new piece was inserted at.
    pub(crate) slot: u32,
    /// Phases the line went through, in execution order.
    pub(crate) steps: Vec<ResolutionStep>,
}

/// One phase of the insertion/match/compaction cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ResolutionStep {
    /// Slots moved right to open the insertion index, tail first.
    Shifted {
        /// Recorded slot moves.
        moves: Vec<SlotShift>,
    },
    /// A run reached the threshold and its leftmost members were removed.
    Matched {
        /// Colour shared by the run.
        color: PieceColor,
        /// Removed pieces, leftmost first.
        pieces: Vec<PieceId>,
    },
    /// Survivors slid left onto contiguous indices.
    Compacted {
        /// Recorded slot moves; empty when the removal was at the tail.
        moves: Vec<SlotShift>,
    },
}

impl StagingLine {
    pub(crate) fn new(capacity: u32, match_threshold: u32) -> Self {
        Self {
            capacity: usize::try_from(capacity).unwrap_or(0),
            match_threshold: usize::try_from(match_threshold).unwrap_or(usize::MAX),
            slots: Vec::new(),
        }
    }

    pub(crate) fn has_empty_slot(&self) -> bool {
        self.slots.len() < self.capacity
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn match_threshold(&self) -> usize {
        self.match_threshold
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    pub(crate) fn snapshots(&self) -> Vec<StagedSnapshot> {
        self.slots
            .iter()
            .map(|staged| StagedSnapshot {
                piece: staged.id,
                color: staged.color,
            })
            .collect()
    }

    /// Inserts a piece next to its rightmost colour sibling and resolves the
    /// line to a fixed point. Returns `None` when every slot is taken; the
    /// piece then remains the caller's responsibility.
    pub(crate) fn place(&mut self, id: PieceId, color: PieceColor) -> Option<Placement> {
        if !self.has_empty_slot() {
            return None;
        }

        let insert_index = self.insert_index(color);
        let mut moves = Vec::new();
        for position in (insert_index..self.slots.len()).rev() {
            moves.push(SlotShift {
                piece: self.slots[position].id,
                from: position as u32,
                to: (position + 1) as u32,
            });
        }
        self.slots.insert(insert_index, StagedPiece { id, color });

        let mut steps = Vec::new();
        if !moves.is_empty() {
            steps.push(ResolutionStep::Shifted { moves });
        }
        steps.extend(self.resolve());

        Some(Placement {
            slot: insert_index as u32,
            steps,
        })
    }

    /// One past the rightmost slot sharing the colour; append when none does.
    fn insert_index(&self, color: PieceColor) -> usize {
        let mut last_same_color = None;
        for (position, staged) in self.slots.iter().enumerate() {
            if staged.color == color {
                last_same_color = Some(position);
            }
        }
        last_same_color.map_or(self.slots.len(), |position| position + 1)
    }

    /// Removes qualifying runs and compacts until the line is stable.
    ///
    /// Each pass consumes exactly `match_threshold` pieces from the front of
    /// the first qualifying run; a longer run keeps its tail, which may
    /// qualify again on a later pass or placement.
    pub(crate) fn resolve(&mut self) -> Vec<ResolutionStep> {
        let mut steps = Vec::new();
        while let Some((run_start, color)) = self.first_run() {
            let pieces: Vec<PieceId> = self
                .slots
                .drain(run_start..run_start + self.match_threshold)
                .map(|staged| staged.id)
                .collect();
            steps.push(ResolutionStep::Matched { color, pieces });

            let mut moves = Vec::new();
            for (offset, staged) in self.slots[run_start..].iter().enumerate() {
                moves.push(SlotShift {
                    piece: staged.id,
                    from: (run_start + self.match_threshold + offset) as u32,
                    to: (run_start + offset) as u32,
                });
            }
            steps.push(ResolutionStep::Compacted { moves });
        }
        steps
    }

    fn first_run(&self) -> Option<(usize, PieceColor)> {
        if self.match_threshold == 0 || self.slots.len() < self.match_threshold {
            return None;
        }

        let mut position = 0;
        while position < self.slots.len() {
            let color = self.slots[position].color;
            let mut length = 1;
            while position + length < self.slots.len()
                && self.slots[position + length].color == color
            {
                length += 1;
            }
            if length >= self.match_threshold {
                return Some((position, color));
            }
            position += length;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(line: &StagingLine) -> Vec<PieceColor> {
        line.slots.iter().map(|staged| staged.color).collect()
    }

    fn seed(line: &mut StagingLine, pieces: &[(u32, PieceColor)]) {
        line.slots = pieces
            .iter()
            .map(|&(id, color)| StagedPiece {
                id: PieceId::new(id),
                color,
            })
            .collect();
    }

    #[test]
    fn insertion_groups_colors_next_to_rightmost_sibling() {
        let mut line = StagingLine::new(5, 3);

        let first = line.place(PieceId::new(1), PieceColor::Red).expect("slot");
        let second = line.place(PieceId::new(2), PieceColor::Blue).expect("slot");
        let third = line.place(PieceId::new(3), PieceColor::Red).expect("slot");

        assert_eq!(first.slot, 0);
        assert_eq!(second.slot, 1);
        assert_eq!(third.slot, 1);
        assert_eq!(
            colors(&line),
            vec![PieceColor::Red, PieceColor::Red, PieceColor::Blue]
        );
    }

    #[test]
    fn insertion_records_the_shift_trace() {
        let mut line = StagingLine::new(5, 3);
        let _ = line.place(PieceId::new(1), PieceColor::Red).expect("slot");
        let _ = line.place(PieceId::new(2), PieceColor::Blue).expect("slot");

        let placement = line.place(PieceId::new(3), PieceColor::Red).expect("slot");

        assert_eq!(
            placement.steps,
            vec![ResolutionStep::Shifted {
                moves: vec![SlotShift {
                    piece: PieceId::new(2),
                    from: 1,
                    to: 2,
                }],
            }]
        );
    }

    #[test]
    fn unmatched_color_appends_at_the_end() {
        let mut line = StagingLine::new(4, 3);
        let _ = line.place(PieceId::new(1), PieceColor::Red).expect("slot");

        let placement = line
            .place(PieceId::new(2), PieceColor::Yellow)
            .expect("slot");

        assert_eq!(placement.slot, 1);
        assert!(placement.steps.is_empty());
    }

    #[test]
    fn third_equal_color_matches_and_later_placements_start_fresh() {
        let mut line = StagingLine::new(5, 3);
        let _ = line.place(PieceId::new(1), PieceColor::Red).expect("slot");
        let _ = line.place(PieceId::new(2), PieceColor::Red).expect("slot");

        let third = line.place(PieceId::new(3), PieceColor::Red).expect("slot");
        assert_eq!(
            third.steps,
            vec![
                ResolutionStep::Matched {
                    color: PieceColor::Red,
                    pieces: vec![PieceId::new(1), PieceId::new(2), PieceId::new(3)],
                },
                ResolutionStep::Compacted { moves: Vec::new() },
            ]
        );
        assert_eq!(line.len(), 0);

        let fourth = line.place(PieceId::new(4), PieceColor::Red).expect("slot");
        let fifth = line.place(PieceId::new(5), PieceColor::Red).expect("slot");
        assert_eq!(fourth.slot, 0);
        assert_eq!(fifth.slot, 1);
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn full_line_rejects_placement() {
        let mut line = StagingLine::new(2, 3);
        let _ = line.place(PieceId::new(1), PieceColor::Red).expect("slot");
        let _ = line.place(PieceId::new(2), PieceColor::Blue).expect("slot");

        assert!(line.place(PieceId::new(3), PieceColor::Green).is_none());
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn fewer_than_threshold_never_matches() {
        let mut line = StagingLine::new(4, 3);
        let _ = line.place(PieceId::new(1), PieceColor::Red).expect("slot");
        let second = line.place(PieceId::new(2), PieceColor::Red).expect("slot");

        assert!(second.steps.is_empty());
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn run_longer_than_threshold_keeps_tail() {
        let mut line = StagingLine::new(6, 3);
        seed(
            &mut line,
            &[
                (1, PieceColor::Red),
                (2, PieceColor::Red),
                (3, PieceColor::Red),
                (4, PieceColor::Red),
            ],
        );

        let steps = line.resolve();

        assert_eq!(
            steps,
            vec![
                ResolutionStep::Matched {
                    color: PieceColor::Red,
                    pieces: vec![PieceId::new(1), PieceId::new(2), PieceId::new(3)],
                },
                ResolutionStep::Compacted {
                    moves: vec![SlotShift {
                        piece: PieceId::new(4),
                        from: 3,
                        to: 0,
                    }],
                },
            ]
        );
        assert_eq!(colors(&line), vec![PieceColor::Red]);
    }

    #[test]
    fn chain_reaction_resolves_to_fixed_point() {
        let mut line = StagingLine::new(6, 3);
        seed(
            &mut line,
            &[
                (1, PieceColor::Red),
                (2, PieceColor::Red),
                (3, PieceColor::Red),
                (4, PieceColor::Blue),
                (5, PieceColor::Blue),
                (6, PieceColor::Blue),
            ],
        );

        let steps = line.resolve();

        let matched: Vec<_> = steps
            .iter()
            .filter_map(|step| match step {
                ResolutionStep::Matched { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(matched, vec![PieceColor::Red, PieceColor::Blue]);
        assert_eq!(line.len(), 0);
    }

    #[test]
    fn compaction_moves_record_old_and_new_indices() {
        let mut line = StagingLine::new(5, 3);
        seed(
            &mut line,
            &[
                (1, PieceColor::Blue),
                (2, PieceColor::Red),
                (3, PieceColor::Red),
                (4, PieceColor::Green),
            ],
        );

        let placement = line.place(PieceId::new(5), PieceColor::Red).expect("slot");

        assert_eq!(placement.slot, 3);
        assert_eq!(
            placement.steps,
            vec![
                ResolutionStep::Shifted {
                    moves: vec![SlotShift {
                        piece: PieceId::new(4),
                        from: 3,
                        to: 4,
                    }],
                },
                ResolutionStep::Matched {
                    color: PieceColor::Red,
                    pieces: vec![PieceId::new(2), PieceId::new(3), PieceId::new(5)],
                },
                ResolutionStep::Compacted {
                    moves: vec![SlotShift {
                        piece: PieceId::new(4),
                        from: 4,
                        to: 1,
                    }],
                },
            ]
        );
        assert_eq!(colors(&line), vec![PieceColor::Blue, PieceColor::Green]);
    }
}
