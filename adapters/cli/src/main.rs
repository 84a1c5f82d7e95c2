#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays a scripted Combine Rush session.
//!
//! Travel animations do not exist here, so every granted exit is completed
//! immediately and the board is reprinted once the systems settle.

use anyhow::{bail, Context, Result};
use clap::Parser;
use combine_rush_core::{
    CellCoord, Command, Direction, Event, LevelSpec, PieceColor, PieceId, PieceKind,
    PiecePlacement, PieceSnapshot,
};
use combine_rush_system_bootstrap::Bootstrap;
use combine_rush_system_eligibility::Eligibility;
use combine_rush_system_spawners::Spawners;
use combine_rush_world::{self as world, query, Retention, World};

/// Headless demo driver for the Combine Rush decision core.
#[derive(Debug, Parser)]
#[command(name = "combine-rush")]
struct Args {
    /// Cells to click as `column,row` pairs; defaults to a scripted run.
    #[arg(long, value_name = "COLUMN,ROW")]
    click: Vec<String>,

    /// Print grid-change notices as they are delivered to subscribers.
    #[arg(long)]
    trace_notices: bool,
}

/// Entry point for the Combine Rush command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let clicks = resolve_clicks(&args.click)?;

    let mut world = World::new();
    let bootstrap = Bootstrap::default();
    let spawners = Spawners::new();
    let mut eligibility = Eligibility::new();

    println!("{}", bootstrap.welcome_banner(&world));

    if args.trace_notices {
        let _observer = world.subscribe_grid_changes(|notice| {
            println!("  notice: {notice:?}");
            Ok(Retention::Keep)
        });
    }

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::LoadLevel {
            level: demo_level(),
        },
        &mut events,
    );
    if let Some(Event::LevelRejected { reason }) = events.first() {
        bail!("demo level failed validation: {reason:?}");
    }

    let settled = settle(&mut world, &spawners, &mut eligibility, events);
    print_events(&settled);
    println!(
        "loaded '{}' ({}x{})",
        bootstrap.level_name(&world).unwrap_or("?"),
        bootstrap.grid_dimensions(&world).0,
        bootstrap.grid_dimensions(&world).1,
    );
    render(&world);

    for cell in clicks {
        println!("click {},{}", cell.column(), cell.row());
        let mut events = Vec::new();
        world::apply(&mut world, Command::RequestExit { cell }, &mut events);

        let started = events.iter().find_map(|event| match event {
            Event::ExitStarted { piece, .. } => Some(*piece),
            _ => None,
        });
        if let Some(piece) = started {
            world::apply(&mut world, Command::CompleteTravel { piece }, &mut events);
        }

        let settled = settle(&mut world, &spawners, &mut eligibility, events);
        print_events(&settled);
        render(&world);
    }

    Ok(())
}

/// Feeds spawner proposals back into the session until no command remains,
/// running eligibility re-evaluation on every batch.
fn settle(
    world: &mut World,
    spawners: &Spawners,
    eligibility: &mut Eligibility,
    mut events: Vec<Event>,
) -> Vec<Event> {
    let mut collected = Vec::new();
    loop {
        let pieces = query::piece_view(world);

        let mut eligibility_events = Vec::new();
        eligibility.handle(
            &events,
            &pieces,
            |cell| query::can_exit(world, cell),
            &mut eligibility_events,
        );

        let mut commands = Vec::new();
        spawners.handle(&events, &pieces, query::occupancy_view(world), &mut commands);

        collected.extend(events);
        collected.extend(eligibility_events);

        if commands.is_empty() {
            return collected;
        }

        events = Vec::new();
        for command in commands {
            world::apply(world, command, &mut events);
        }
    }
}

fn print_events(events: &[Event]) {
    for event in events {
        println!("  {event:?}");
    }
}

fn render(world: &World) {
    let (columns, rows) = query::grid_dimensions(world);
    let pieces = query::piece_view(world).into_vec();
    let occupancy = query::occupancy_view(world);

    for row in 0..rows {
        let mut line = String::new();
        for column in 0..columns {
            let cell = CellCoord::new(column, row);
            let glyph = occupancy
                .occupant(cell)
                .map_or('.', |id| glyph_for(&pieces, id));
            line.push(glyph);
            line.push(' ');
        }
        println!("  {line}");
    }

    let staging = query::staging_view(world);
    let slots: String = staging
        .slots()
        .iter()
        .map(|slot| color_glyph(slot.color))
        .collect();
    println!(
        "  staging [{slots:<width$}]",
        width = staging.capacity() as usize
    );
}

fn glyph_for(pieces: &[PieceSnapshot], id: PieceId) -> char {
    let Some(snapshot) = pieces.iter().find(|snapshot| snapshot.id == id) else {
        return '?';
    };
    match &snapshot.kind {
        PieceKind::Simple { color } => color_glyph(*color),
        PieceKind::Barrel { color } => color_glyph(*color).to_ascii_lowercase(),
        PieceKind::Pipe { facing, .. } => match facing {
            Direction::North => '^',
            Direction::East => '>',
            Direction::South => 'v',
            Direction::West => '<',
        },
    }
}

fn color_glyph(color: PieceColor) -> char {
    match color {
        PieceColor::Red => 'R',
        PieceColor::Green => 'G',
        PieceColor::Blue => 'B',
        PieceColor::Yellow => 'Y',
        PieceColor::Purple => 'P',
    }
}

fn resolve_clicks(raw: &[String]) -> Result<Vec<CellCoord>> {
    if raw.is_empty() {
        return Ok(vec![
            CellCoord::new(0, 3),
            CellCoord::new(1, 3),
            CellCoord::new(3, 3),
        ]);
    }
    raw.iter().map(|value| parse_click(value)).collect()
}

fn parse_click(value: &str) -> Result<CellCoord> {
    let (column, row) = value
        .split_once(',')
        .with_context(|| format!("click '{value}' must look like column,row"))?;
    let column = column
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid column in click '{value}'"))?;
    let row = row
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid row in click '{value}'"))?;
    Ok(CellCoord::new(column, row))
}

/// Built-in level exercising every piece kind.
fn demo_level() -> LevelSpec {
    LevelSpec {
        name: "demo".to_owned(),
        columns: 4,
        rows: 4,
        staging_capacity: 5,
        match_threshold: 3,
        placements: vec![
            placement(0, 3, PieceKind::Simple { color: PieceColor::Red }),
            placement(1, 3, PieceKind::Simple { color: PieceColor::Red }),
            placement(3, 3, PieceKind::Simple { color: PieceColor::Red }),
            placement(1, 2, PieceKind::Simple { color: PieceColor::Blue }),
            placement(2, 2, PieceKind::Barrel { color: PieceColor::Green }),
            placement(
                3,
                1,
                PieceKind::Pipe {
                    contents: vec![PieceColor::Yellow],
                    facing: Direction::West,
                },
            ),
        ],
    }
}

fn placement(column: u32, row: u32, kind: PieceKind) -> PiecePlacement {
    PiecePlacement {
        cell: CellCoord::new(column, row),
        kind,
    }
}
