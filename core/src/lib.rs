#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Combine Rush engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative session, and pure systems. Adapters submit [`Command`]
//! values describing desired mutations, the session executes those commands
//! via its `apply` entry point, and then broadcasts [`Event`] values for
//! systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots, and respond exclusively with new command
//! batches.

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Combine Rush.";

/// Default number of equal-colour pieces required to resolve a match.
pub const DEFAULT_MATCH_THRESHOLD: u32 = 3;

/// Commands that express all permissible session mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the current level with the provided description.
    LoadLevel {
        /// Complete description of the level to load.
        level: LevelSpec,
    },
    /// Clears the play grid, the staging line and every piece.
    ClearLevel,
    /// Requests that the piece occupying the clicked cell leave the grid.
    RequestExit {
        /// Grid cell the player interacted with.
        cell: CellCoord,
    },
    /// Reports that a travelling piece finished its exit animation and is
    /// ready to enter the staging line.
    CompleteTravel {
        /// Identifier of the piece that arrived.
        piece: PieceId,
    },
    /// Requests that a barrel with a freed neighbour turn into a simple piece.
    BreakBarrel {
        /// Identifier of the barrel to convert.
        piece: PieceId,
    },
    /// Requests that a pipe emit the next queued piece into its facing cell.
    DispensePipe {
        /// Identifier of the pipe to advance.
        piece: PieceId,
    },
}

/// Events broadcast by the session after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a level finished loading.
    LevelLoaded {
        /// Name recorded in the level description.
        name: String,
        /// Number of columns in the play grid.
        columns: u32,
        /// Number of rows in the play grid.
        rows: u32,
    },
    /// Reports that a level description was rejected without mutation.
    LevelRejected {
        /// Specific reason the level failed validation.
        reason: LevelError,
    },
    /// Confirms that the current level was cleared.
    LevelCleared,
    /// Announces that the walkability of a single cell changed.
    GridChanged {
        /// Cell whose occupancy flipped.
        cell: CellCoord,
        /// New occupancy state of the cell.
        occupied: bool,
    },
    /// Announces that the whole grid was reset to walkable.
    GridCleared,
    /// Confirms that a piece was granted an exit and began travelling.
    ExitStarted {
        /// Identifier of the departing piece.
        piece: PieceId,
        /// Colour of the departing piece.
        color: PieceColor,
        /// Ordered cells the piece travels through, start included.
        path: Vec<CellCoord>,
        /// Exit-row cell the path terminates in.
        exit: CellCoord,
    },
    /// Reports that an exit request was denied.
    ExitRejected {
        /// Cell named in the rejected request.
        cell: CellCoord,
        /// Specific reason the exit failed.
        reason: ExitRejection,
    },
    /// Confirms that a piece entered the staging line.
    PiecePlaced {
        /// Identifier of the placed piece.
        piece: PieceId,
        /// Slot index assigned by the insertion rule.
        slot: u32,
    },
    /// Reports that an arriving piece could not enter the staging line.
    PlacementRejected {
        /// Identifier of the piece that was refused.
        piece: PieceId,
        /// Specific reason the placement failed.
        reason: PlacementRejection,
    },
    /// Describes the slots that moved right to make room for an insertion.
    StagingShifted {
        /// Slot moves in the order they were performed, tail first.
        moves: Vec<SlotShift>,
    },
    /// Confirms that a run of equal-colour pieces was resolved.
    RunMatched {
        /// Colour shared by the matched pieces.
        color: PieceColor,
        /// Pieces removed by the match, leftmost first.
        pieces: Vec<PieceId>,
    },
    /// Describes the slots that slid left after a match removal.
    StagingCompacted {
        /// Slot moves in increasing slot order.
        moves: Vec<SlotShift>,
    },
    /// Confirms that a barrel turned into a simple piece in place.
    BarrelBroken {
        /// Identifier retained by the converted piece.
        piece: PieceId,
        /// Colour revealed by the conversion.
        color: PieceColor,
    },
    /// Confirms that a pipe emitted a piece into its facing cell.
    PipeDispensed {
        /// Identifier of the emitting pipe.
        pipe: PieceId,
        /// Identifier assigned to the emitted piece.
        piece: PieceId,
        /// Colour of the emitted piece.
        color: PieceColor,
        /// Cell the emitted piece occupies.
        cell: CellCoord,
    },
    /// Confirms that an exhausted pipe removed itself and freed its cell.
    PipeExhausted {
        /// Identifier of the removed pipe.
        pipe: PieceId,
    },
    /// Reports that a piece's ability to reach the exit row changed.
    ExitEligibilityChanged {
        /// Identifier of the re-evaluated piece.
        piece: PieceId,
        /// Whether the piece can currently reach the exit row.
        can_exit: bool,
    },
    /// Reports that a change-notification handler failed.
    NotifyFailed {
        /// Numeric identity of the failing subscriber.
        subscriber: u32,
        /// Message carried by the handler error.
        message: String,
    },
}

/// Unique identifier assigned to a piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(u32);

impl PieceId {
    /// Creates a new piece identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Returns the adjacent cell in the provided direction.
    ///
    /// Yields `None` when the step would underflow the coordinate space;
    /// upper bounds are the grid's concern.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self
                .row
                .checked_sub(1)
                .map(|row| Self::new(self.column, row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Direction::South => self
                .row
                .checked_add(1)
                .map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

/// Cardinal directions used for piece facing and neighbourhood checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices, where the exit row lies.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

/// Cardinal directions in the order neighbourhoods are inspected.
pub const CARDINAL_DIRECTIONS: [Direction; 4] = [
    Direction::East,
    Direction::West,
    Direction::South,
    Direction::North,
];

/// Colour identity used for grouping and matching pieces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceColor {
    /// Red pieces.
    Red,
    /// Green pieces.
    Green,
    /// Blue pieces.
    Blue,
    /// Yellow pieces.
    Yellow,
    /// Purple pieces.
    Purple,
}

/// Behavioural taxonomy of pieces, dispatched by pattern matching.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceKind {
    /// Ordinary clickable piece that can exit toward the staging line.
    Simple {
        /// Colour used for staging-line matching.
        color: PieceColor,
    },
    /// Inert piece that converts to a simple piece once a neighbour frees up.
    Barrel {
        /// Colour revealed when the barrel breaks.
        color: PieceColor,
    },
    /// Dispenser that emits queued pieces into the cell it faces.
    Pipe {
        /// Remaining colours, front of the queue first.
        contents: Vec<PieceColor>,
        /// Direction the pipe opening faces.
        facing: Direction,
    },
}

impl PieceKind {
    /// Reports whether the piece reacts to player clicks.
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        matches!(self, Self::Simple { .. })
    }
}

/// Lifecycle phase of a piece within the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PiecePhase {
    /// Sitting on the play grid, occupying its cell.
    Idle,
    /// Granted an exit and moving along its path; owns no cell.
    Traveling,
    /// Absorbed by the staging line.
    Staged,
}

/// Reasons an exit request may be rejected by the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitRejection {
    /// The clicked cell holds no piece.
    NothingToMove,
    /// The clicked piece is a barrel or a pipe and cannot travel.
    NotMovable,
    /// The staging line cannot absorb another piece right now.
    StagingFull,
    /// No route to the exit row exists from the clicked cell.
    NoPath,
}

/// Reasons a staging placement may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementRejection {
    /// Every staging slot is already taken.
    LineFull,
}

/// Reasons a level description may fail validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelError {
    /// Grid dimensions must both be positive.
    InvalidDimensions,
    /// The staging line needs at least one slot.
    InvalidStagingCapacity,
    /// Matching needs a threshold of at least two pieces.
    InvalidMatchThreshold,
    /// A placement names a cell outside the grid.
    PlacementOutOfBounds(CellCoord),
    /// Two placements name the same cell.
    DuplicatePlacement(CellCoord),
    /// A pipe placement carries no queued colours.
    EmptyPipe(CellCoord),
}

/// Movement of one staged piece from one slot index to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotShift {
    /// Identifier of the piece that moved.
    pub piece: PieceId,
    /// Slot index the piece vacated.
    pub from: u32,
    /// Slot index the piece now occupies.
    pub to: u32,
}

/// Complete description of a level supplied by the level loader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Human-readable level name.
    pub name: String,
    /// Number of columns in the play grid.
    pub columns: u32,
    /// Number of rows in the play grid.
    pub rows: u32,
    /// Number of slots in the staging line.
    pub staging_capacity: u32,
    /// Run length required to resolve a match.
    pub match_threshold: u32,
    /// Pieces seeded onto the grid at load time.
    pub placements: Vec<PiecePlacement>,
}

/// Initial placement of a single piece within a level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PiecePlacement {
    /// Cell the piece starts on.
    pub cell: CellCoord,
    /// Kind of piece seeded at the cell.
    pub kind: PieceKind,
}

/// Immutable representation of a single piece's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PieceSnapshot {
    /// Unique identifier assigned to the piece.
    pub id: PieceId,
    /// Behavioural kind of the piece.
    pub kind: PieceKind,
    /// Lifecycle phase at capture time.
    pub phase: PiecePhase,
    /// Cell occupied while the piece is on the grid.
    pub cell: Option<CellCoord>,
}

/// Read-only snapshot describing all pieces within the session.
#[derive(Clone, Debug, Default)]
pub struct PieceView {
    snapshots: Vec<PieceSnapshot>,
}

impl PieceView {
    /// Creates a new piece view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<PieceSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic id order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &PieceSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<PieceSnapshot> {
        self.snapshots
    }
}

/// Read-only view into the dense occupancy grid.
#[derive(Clone, Copy, Debug)]
pub struct OccupancyView<'a> {
    cells: &'a [Option<PieceId>],
    columns: u32,
    rows: u32,
}

impl<'a> OccupancyView<'a> {
    /// Captures a new occupancy view backed by the provided cell slice.
    #[must_use]
    pub fn new(cells: &'a [Option<PieceId>], columns: u32, rows: u32) -> Self {
        Self {
            cells,
            columns,
            rows,
        }
    }

    /// Returns the piece occupying the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<PieceId> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied().flatten())
    }

    /// Reports whether the cell can be traversed.
    ///
    /// Out-of-bounds coordinates are never walkable.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.index(cell).map_or(false, |index| {
            self.cells.get(index).copied().unwrap_or(None).is_none()
        })
    }

    /// Returns an iterator over all cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Option<PieceId>> + 'a {
        self.cells.iter().copied()
    }

    /// Provides the dimensions of the underlying occupancy grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
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
}

/// Single occupied slot captured from the staging line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StagedSnapshot {
    /// Identifier of the staged piece.
    pub piece: PieceId,
    /// Colour the slot contributes to run detection.
    pub color: PieceColor,
}

/// Read-only snapshot of the staging line.
#[derive(Clone, Debug, Default)]
pub struct StagingView {
    slots: Vec<StagedSnapshot>,
    capacity: u32,
    match_threshold: u32,
}

impl StagingView {
    /// Creates a new staging view from captured slots and configuration.
    #[must_use]
    pub fn new(slots: Vec<StagedSnapshot>, capacity: u32, match_threshold: u32) -> Self {
        Self {
            slots,
            capacity,
            match_threshold,
        }
    }

    /// Occupied slots in left-to-right order.
    #[must_use]
    pub fn slots(&self) -> &[StagedSnapshot] {
        &self.slots
    }

    /// Total number of slots the line offers.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Run length required to resolve a match.
    #[must_use]
    pub const fn match_threshold(&self) -> u32 {
        self.match_threshold
    }
}
