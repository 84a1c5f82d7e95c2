use combine_rush_core::{
    CellCoord, Command, Event, LevelSpec, PieceColor, PieceId, PieceKind, PiecePlacement,
};
use combine_rush_system_eligibility::Eligibility;
use combine_rush_world::{self as world, query, World};

fn load(world: &mut World, placements: Vec<(CellCoord, PieceKind)>) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::LoadLevel {
            level: LevelSpec {
                name: "eligibility".to_owned(),
                columns: 3,
                rows: 3,
                staging_capacity: 3,
                match_threshold: 3,
                placements: placements
                    .into_iter()
                    .map(|(cell, kind)| PiecePlacement { cell, kind })
                    .collect(),
            },
        },
        &mut events,
    );
    events
}

fn corridor_level(world: &mut World) -> Vec<Event> {
    // Column 0 is a corridor: the piece at (0, 2) is stuck behind the one at
    // (0, 1) because barrels wall off column 1.
    load(
        world,
        vec![
            (
                CellCoord::new(0, 2),
                PieceKind::Simple {
                    color: PieceColor::Red,
                },
            ),
            (
                CellCoord::new(0, 1),
                PieceKind::Simple {
                    color: PieceColor::Blue,
                },
            ),
            (
                CellCoord::new(1, 1),
                PieceKind::Barrel {
                    color: PieceColor::Green,
                },
            ),
            (
                CellCoord::new(1, 2),
                PieceKind::Barrel {
                    color: PieceColor::Green,
                },
            ),
        ],
    )
}

#[test]
fn level_load_reports_initial_eligibility() {
    let mut world = World::new();
    let events = corridor_level(&mut world);

    let mut eligibility = Eligibility::new();
    let pieces = query::piece_view(&world);
    let mut out = Vec::new();
    eligibility.handle(&events, &pieces, |cell| query::can_exit(&world, cell), &mut out);

    assert_eq!(
        out,
        vec![
            Event::ExitEligibilityChanged {
                piece: PieceId::new(0),
                can_exit: false,
            },
            Event::ExitEligibilityChanged {
                piece: PieceId::new(1),
                can_exit: true,
            },
        ]
    );
}

#[test]
fn departure_of_a_blocker_flips_eligibility() {
    let mut world = World::new();
    let load_events = corridor_level(&mut world);

    let mut eligibility = Eligibility::new();
    let pieces = query::piece_view(&world);
    let mut out = Vec::new();
    eligibility.handle(
        &load_events,
        &pieces,
        |cell| query::can_exit(&world, cell),
        &mut out,
    );

    // The blocker at (0, 1) leaves; the corridor opens for (0, 2).
    let mut exit_events = Vec::new();
    world::apply(
        &mut world,
        Command::RequestExit {
            cell: CellCoord::new(0, 1),
        },
        &mut exit_events,
    );
    assert!(matches!(exit_events.last(), Some(Event::ExitStarted { .. })));

    let pieces = query::piece_view(&world);
    out.clear();
    eligibility.handle(
        &exit_events,
        &pieces,
        |cell| query::can_exit(&world, cell),
        &mut out,
    );

    assert_eq!(
        out,
        vec![Event::ExitEligibilityChanged {
            piece: PieceId::new(0),
            can_exit: true,
        }]
    );
}

#[test]
fn repeated_checks_without_changes_stay_silent() {
    let mut world = World::new();
    let load_events = corridor_level(&mut world);

    let mut eligibility = Eligibility::new();
    let pieces = query::piece_view(&world);
    let mut out = Vec::new();
    eligibility.handle(
        &load_events,
        &pieces,
        |cell| query::can_exit(&world, cell),
        &mut out,
    );
    out.clear();

    // A grid change that does not alter any route keeps the system quiet.
    let unrelated = vec![Event::GridChanged {
        cell: CellCoord::new(2, 2),
        occupied: false,
    }];
    eligibility.handle(
        &unrelated,
        &pieces,
        |cell| query::can_exit(&world, cell),
        &mut out,
    );

    assert!(out.is_empty());
}
