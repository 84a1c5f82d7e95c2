#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative session state management for Combine Rush.
//!
//! The [`World`] owns one occupancy grid / staging line pair plus the piece
//! table and the change notifier, and mutates them exclusively through
//! [`apply`]. Every mutation is synchronous: by the time `apply` returns, the
//! occupancy model reflects the command and all subscribers have been
//! notified. Animation is a presentation-layer follower fed by the emitted
//! events.

mod notifier;
mod pathfinding;
mod staging;

use combine_rush_core::{
    CellCoord, Command, Event, ExitRejection, LevelError, LevelSpec, PieceId, PieceKind,
    PiecePhase, PlacementRejection, CARDINAL_DIRECTIONS, DEFAULT_MATCH_THRESHOLD, WELCOME_BANNER,
};

pub use notifier::{
    GridNotice, HandlerError, LevelNotice, PublishOutcome, Retention, SubscriberId,
};

use notifier::ChangeNotifier;
use staging::{ResolutionStep, StagingLine};

/// Row a piece must reach to leave the play grid.
pub const EXIT_ROW: u32 = 0;

/// Represents the authoritative Combine Rush session state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    level_name: Option<String>,
    grid: OccupancyGrid,
    staging: StagingLine,
    pieces: Vec<Piece>,
    notifier: ChangeNotifier,
    next_piece_id: u32,
}

impl World {
    /// Creates a new session with no level loaded.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            level_name: None,
            grid: OccupancyGrid::new(0, 0),
            staging: StagingLine::new(0, DEFAULT_MATCH_THRESHOLD),
            pieces: Vec::new(),
            notifier: ChangeNotifier::new(),
            next_piece_id: 0,
        }
    }

    /// Registers a handler for occupancy-change notices.
    pub fn subscribe_grid_changes<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&GridNotice) -> Result<Retention, HandlerError> + 'static,
    {
        self.notifier.subscribe_grid(handler)
    }

    /// Registers a handler for level-loaded notices.
    pub fn subscribe_level_loaded<F>(&mut self, handler: F) -> SubscriberId
    where
        F: FnMut(&LevelNotice) -> Result<Retention, HandlerError> + 'static,
    {
        self.notifier.subscribe_level(handler)
    }

    /// Removes a previously registered handler.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) -> bool {
        self.notifier.unsubscribe(subscriber)
    }

    fn load_level(&mut self, level: LevelSpec, out_events: &mut Vec<Event>) {
        if let Err(reason) = validate_level(&level) {
            out_events.push(Event::LevelRejected { reason });
            return;
        }

        let LevelSpec {
            name,
            columns,
            rows,
            staging_capacity,
            match_threshold,
            placements,
        } = level;

        self.grid = OccupancyGrid::new(columns, rows);
        self.staging = StagingLine::new(staging_capacity, match_threshold);
        self.pieces.clear();
        self.next_piece_id = 0;

        for placement in placements {
            let id = self.allocate_piece_id();
            self.pieces.push(Piece {
                id,
                kind: placement.kind,
                phase: PiecePhase::Idle,
                cell: Some(placement.cell),
            });
            self.occupy_cell(id, placement.cell, out_events);
        }

        self.level_name = Some(name.clone());
        let outcome = self.notifier.publish_level(&LevelNotice { name: name.clone() });
        report_failures(outcome, out_events);
        out_events.push(Event::LevelLoaded {
            name,
            columns,
            rows,
        });
    }

    fn clear_level(&mut self, out_events: &mut Vec<Event>) {
        self.pieces.clear();
        self.staging.clear();
        self.grid.clear();
        self.level_name = None;

        out_events.push(Event::GridCleared);
        let outcome = self.notifier.publish_grid(&GridNotice::Cleared);
        report_failures(outcome, out_events);
        out_events.push(Event::LevelCleared);
    }

    fn request_exit(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        let Some(index) = self.piece_index_at(cell) else {
            out_events.push(Event::ExitRejected {
                cell,
                reason: ExitRejection::NothingToMove,
            });
            return;
        };

        let PieceKind::Simple { color } = &self.pieces[index].kind else {
            out_events.push(Event::ExitRejected {
                cell,
                reason: ExitRejection::NotMovable,
            });
            return;
        };
        let color = *color;

        if !self.staging_can_admit() {
            out_events.push(Event::ExitRejected {
                cell,
                reason: ExitRejection::StagingFull,
            });
            return;
        }

        let Some((path, exit)) = self.exit_route(cell) else {
            out_events.push(Event::ExitRejected {
                cell,
                reason: ExitRejection::NoPath,
            });
            return;
        };

        let piece = self.pieces[index].id;
        self.pieces[index].phase = PiecePhase::Traveling;
        self.pieces[index].cell = None;
        self.vacate_cell(cell, out_events);
        out_events.push(Event::ExitStarted {
            piece,
            color,
            path,
            exit,
        });
    }

    fn complete_travel(&mut self, piece: PieceId, out_events: &mut Vec<Event>) {
        let Some(index) = self.piece_index(piece) else {
            return;
        };
        if self.pieces[index].phase != PiecePhase::Traveling {
            return;
        }
        let PieceKind::Simple { color } = &self.pieces[index].kind else {
            return;
        };
        let color = *color;

        let Some(placement) = self.staging.place(piece, color) else {
            out_events.push(Event::PlacementRejected {
                piece,
                reason: PlacementRejection::LineFull,
            });
            return;
        };

        self.pieces[index].phase = PiecePhase::Staged;
        out_events.push(Event::PiecePlaced {
            piece,
            slot: placement.slot,
        });

        for step in placement.steps {
            match step {
                ResolutionStep::Shifted { moves } => {
                    out_events.push(Event::StagingShifted { moves });
                }
                ResolutionStep::Matched { color, pieces } => {
                    self.remove_pieces(&pieces);
                    out_events.push(Event::RunMatched { color, pieces });
                }
                ResolutionStep::Compacted { moves } => {
                    out_events.push(Event::StagingCompacted { moves });
                }
            }
        }
    }

    fn break_barrel(&mut self, piece: PieceId, out_events: &mut Vec<Event>) {
        let Some(index) = self.piece_index(piece) else {
            return;
        };
        let Some(cell) = self.pieces[index].cell else {
            return;
        };
        let PieceKind::Barrel { color } = &self.pieces[index].kind else {
            return;
        };
        let color = *color;

        if !self.has_free_neighbor(cell) {
            return;
        }

        self.pieces[index].kind = PieceKind::Simple { color };
        out_events.push(Event::BarrelBroken { piece, color });
    }

    fn dispense_pipe(&mut self, pipe: PieceId, out_events: &mut Vec<Event>) {
        let Some(index) = self.piece_index(pipe) else {
            return;
        };
        let Some(pipe_cell) = self.pieces[index].cell else {
            return;
        };
        let (facing, remaining) = match &self.pieces[index].kind {
            PieceKind::Pipe { contents, facing } => (*facing, contents.len()),
            _ => return,
        };

        let Some(target) = pipe_cell.neighbor(facing) else {
            return;
        };
        if !self.grid.is_walkable(target) {
            return;
        }

        if remaining == 0 {
            // An exhausted pipe dismantles itself on its next trigger and
            // frees the cell it guarded.
            let _ = self.pieces.remove(index);
            self.vacate_cell(pipe_cell, out_events);
            out_events.push(Event::PipeExhausted { pipe });
            return;
        }

        let color = match &mut self.pieces[index].kind {
            PieceKind::Pipe { contents, .. } => contents.remove(0),
            _ => return,
        };

        let id = self.allocate_piece_id();
        self.pieces.push(Piece {
            id,
            kind: PieceKind::Simple { color },
            phase: PiecePhase::Idle,
            cell: Some(target),
        });
        self.occupy_cell(id, target, out_events);
        out_events.push(Event::PipeDispensed {
            pipe,
            piece: id,
            color,
            cell: target,
        });
    }

    /// Finds the first exit route from `start`, probing exit-row cells in
    /// increasing column order. The travelling piece may path out of its own
    /// cell, so the start is overlaid as walkable on the query instead of
    /// being written to the grid; pre-query occupancy is untouched.
    fn exit_route(&self, start: CellCoord) -> Option<(Vec<CellCoord>, CellCoord)> {
        let (columns, rows) = self.grid.dimensions();
        let walkable = |cell: CellCoord| cell == start || self.grid.is_walkable(cell);

        for column in 0..columns {
            let exit = CellCoord::new(column, EXIT_ROW);
            if !walkable(exit) {
                continue;
            }
            if let Some(path) = pathfinding::find_path(columns, rows, &walkable, start, exit) {
                return Some((path, exit));
            }
        }
        None
    }

    /// Admission counts travelling pieces as reserved slots so a granted
    /// exit can never arrive at a full line.
    fn staging_can_admit(&self) -> bool {
        let traveling = self
            .pieces
            .iter()
            .filter(|piece| piece.phase == PiecePhase::Traveling)
            .count();
        self.staging.len() + traveling < self.staging.capacity()
    }

    fn has_free_neighbor(&self, cell: CellCoord) -> bool {
        CARDINAL_DIRECTIONS.iter().any(|&direction| {
            cell.neighbor(direction)
                .map_or(false, |neighbor| self.grid.is_walkable(neighbor))
        })
    }

    fn occupy_cell(&mut self, piece: PieceId, cell: CellCoord, out_events: &mut Vec<Event>) {
        self.grid.occupy(piece, cell);
        out_events.push(Event::GridChanged {
            cell,
            occupied: true,
        });
        let outcome = self.notifier.publish_grid(&GridNotice::Changed {
            cell,
            occupied: true,
        });
        report_failures(outcome, out_events);
    }

    fn vacate_cell(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        self.grid.vacate(cell);
        out_events.push(Event::GridChanged {
            cell,
            occupied: false,
        });
        let outcome = self.notifier.publish_grid(&GridNotice::Changed {
            cell,
            occupied: false,
        });
        report_failures(outcome, out_events);
    }

    fn remove_pieces(&mut self, matched: &[PieceId]) {
        self.pieces.retain(|piece| !matched.contains(&piece.id));
    }

    fn allocate_piece_id(&mut self) -> PieceId {
        let id = PieceId::new(self.next_piece_id);
        self.next_piece_id = self.next_piece_id.saturating_add(1);
        id
    }

    fn piece_index(&self, id: PieceId) -> Option<usize> {
        self.pieces.iter().position(|piece| piece.id == id)
    }

    fn piece_index_at(&self, cell: CellCoord) -> Option<usize> {
        self.pieces.iter().position(|piece| piece.cell == Some(cell))
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the session, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadLevel { level } => world.load_level(level, out_events),
        Command::ClearLevel => world.clear_level(out_events),
        Command::RequestExit { cell } => world.request_exit(cell, out_events),
        Command::CompleteTravel { piece } => world.complete_travel(piece, out_events),
        Command::BreakBarrel { piece } => world.break_barrel(piece, out_events),
        Command::DispensePipe { piece } => world.dispense_pipe(piece, out_events),
    }
}

/// Query functions that provide read-only access to the session state.
pub mod query {
    use super::World;
    use combine_rush_core::{
        CellCoord, OccupancyView, PieceSnapshot, PieceView, StagingView,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Name of the currently loaded level, if any.
    #[must_use]
    pub fn level_name(world: &World) -> Option<&str> {
        world.level_name.as_deref()
    }

    /// Dimensions of the play grid as `(columns, rows)`.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Captures a read-only view of every piece in the session.
    #[must_use]
    pub fn piece_view(world: &World) -> PieceView {
        let snapshots: Vec<PieceSnapshot> = world
            .pieces
            .iter()
            .map(|piece| PieceSnapshot {
                id: piece.id,
                kind: piece.kind.clone(),
                phase: piece.phase,
                cell: piece.cell,
            })
            .collect();
        PieceView::from_snapshots(snapshots)
    }

    /// Exposes a read-only view of the dense occupancy grid.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        let (columns, rows) = world.grid.dimensions();
        OccupancyView::new(world.grid.cells(), columns, rows)
    }

    /// Captures a read-only view of the staging line.
    #[must_use]
    pub fn staging_view(world: &World) -> StagingView {
        StagingView::new(
            world.staging.snapshots(),
            world.staging.capacity() as u32,
            world.staging.match_threshold() as u32,
        )
    }

    /// Reports whether the staging line has at least one free slot.
    #[must_use]
    pub fn has_empty_staging_slot(world: &World) -> bool {
        world.staging.has_empty_slot()
    }

    /// Reports whether a route from the cell to the exit row exists.
    ///
    /// The cell's own occupancy is ignored, and the query never mutates
    /// grid state, so walkability reads identically before and after.
    #[must_use]
    pub fn can_exit(world: &World, cell: CellCoord) -> bool {
        world.exit_route(cell).is_some()
    }

    /// Computes the route the cell's occupant would travel to the exit row.
    #[must_use]
    pub fn exit_path(world: &World, cell: CellCoord) -> Option<ExitPath> {
        world
            .exit_route(cell)
            .map(|(steps, exit)| ExitPath { steps, exit })
    }

    /// Route returned by [`exit_path`], start cell included.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ExitPath {
        /// Ordered cells from the start to the exit, inclusive.
        pub steps: Vec<CellCoord>,
        /// Exit-row cell the route terminates in.
        pub exit: CellCoord,
    }
}

#[derive(Clone, Debug)]
struct Piece {
    id: PieceId,
    kind: PieceKind,
    phase: PiecePhase,
    cell: Option<CellCoord>,
}

#[derive(Clone, Debug)]
struct OccupancyGrid {
    columns: u32,
    rows: u32,
    cells: Vec<Option<PieceId>>,
}

impl OccupancyGrid {
    fn new(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![None; capacity],
        }
    }

    /// Walkable means in bounds and unoccupied; out-of-bounds never is.
    fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(false, |index| {
            self.cells.get(index).copied().unwrap_or(None).is_none()
        })
    }

    fn occupy(&mut self, piece: PieceId, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = Some(piece);
            }
        }
    }

    fn vacate(&mut self, cell: CellCoord) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = None;
            }
        }
    }

    fn clear(&mut self) {
        self.cells.fill(None);
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn cells(&self) -> &[Option<PieceId>] {
        &self.cells
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }
}

fn validate_level(level: &LevelSpec) -> Result<(), LevelError> {
    if level.columns == 0 || level.rows == 0 {
        return Err(LevelError::InvalidDimensions);
    }
    if level.staging_capacity == 0 {
        return Err(LevelError::InvalidStagingCapacity);
    }
    if level.match_threshold < 2 {
        return Err(LevelError::InvalidMatchThreshold);
    }

    let mut seen = std::collections::HashSet::new();
    for placement in &level.placements {
        if placement.cell.column() >= level.columns || placement.cell.row() >= level.rows {
            return Err(LevelError::PlacementOutOfBounds(placement.cell));
        }
        if !seen.insert(placement.cell) {
            return Err(LevelError::DuplicatePlacement(placement.cell));
        }
        if let PieceKind::Pipe { contents, .. } = &placement.kind {
            if contents.is_empty() {
                return Err(LevelError::EmptyPipe(placement.cell));
            }
        }
    }
    Ok(())
}

fn report_failures(outcome: PublishOutcome, out_events: &mut Vec<Event>) {
    for (subscriber, error) in outcome.failures {
        out_events.push(Event::NotifyFailed {
            subscriber: subscriber.get(),
            message: error.to_string(),
        });
    }
}
