#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots the GeoToken experience.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use geotoken_cli::ascii::AsciiBackend;
use geotoken_cli::session::{Session, SessionInput, ZoomChange};
use geotoken_cli::storage::DirectoryStorage;
use geotoken_cli::transfer;
use geotoken_core::{Direction, Event, GeoPoint, SessionRules, TileCoord, TileGrid, TokenValue};
use geotoken_rendering::RenderingBackend as _;
use geotoken_system_movement::GeoError;
use geotoken_system_persistence as persistence;
use geotoken_world::query;
use rand::SeedableRng as _;
use rand_chacha::ChaCha8Rng;

/// Grid-based token collecting and crafting on a world map.
#[derive(Debug, Parser)]
#[command(name = "geotoken")]
struct Args {
    /// Directory where the session records are stored.
    #[arg(long, default_value = "geotoken-data")]
    storage_dir: PathBuf,

    /// Side length of a grid tile in degrees.
    #[arg(long, default_value_t = 1e-4)]
    tile_size: f64,

    /// Luck threshold below which a visible tile spawns a token.
    #[arg(long, default_value_t = 0.2)]
    spawn_threshold: f64,

    /// Chebyshev distance within which tokens accept interaction.
    #[arg(long, default_value_t = 3)]
    pickup_radius: u32,

    /// Held value that triggers the win notification.
    #[arg(long, default_value_t = 256)]
    win_threshold: u64,

    /// Restart the session automatically after a win.
    #[arg(long)]
    reset_on_win: bool,

    /// Radius of the visible tile window, in tiles.
    #[arg(long, default_value_t = 7)]
    view_radius: u32,

    /// Seed for the random player placement; entropy-seeded when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Start in manual movement mode, as when no position source exists.
    #[arg(long)]
    manual: bool,
}

enum Request {
    Input(SessionInput),
    Show,
    Export,
    Import(String),
    NewGame,
    Help,
    Quit,
}

/// Entry point for the GeoToken command-line interface.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let grid = TileGrid::new(GeoPoint::new(0.0, 0.0), args.tile_size);
    let rules = SessionRules::new(
        args.pickup_radius,
        args.spawn_threshold,
        TokenValue::new(1),
        TokenValue::new(args.win_threshold),
        args.reset_on_win,
    );
    let mut storage = DirectoryStorage::new(&args.storage_dir);
    let saved = persistence::load(&storage);
    log::info!(
        "restored {} token records from {}",
        saved.tokens.len(),
        storage.root().display()
    );
    let rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut session = Session::new(grid, rules, args.view_radius, saved, rng);
    let _ = session.bootstrap(&mut storage);
    if args.manual {
        let _ = session.handle(SessionInput::ToggleMode, &mut storage);
    }

    let mut backend = AsciiBackend::stdout();
    println!("{}", query::welcome_banner(session.world()));
    println!("Type 'help' for the command list.");
    backend.present(&session.scene())?;

    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;
        line.clear();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let request = match parse_request(trimmed) {
            Ok(request) => request,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match request {
            Request::Input(input) => {
                let events = session.handle(input, &mut storage);
                report(&events);
                backend.present(&session.scene())?;
            }
            Request::Show => backend.present(&session.scene())?,
            Request::Export => println!("{}", transfer::encode(&session.export())),
            Request::Import(code) => match transfer::decode(&code) {
                Ok(saved) => {
                    let _ = session.import(saved, &mut storage);
                    println!("Session imported.");
                    backend.present(&session.scene())?;
                }
                Err(error) => println!("Import failed: {error}"),
            },
            Request::NewGame => {
                if confirm("Start a completely new game? All progress will be lost.")? {
                    let events = session.handle(SessionInput::NewGame, &mut storage);
                    report(&events);
                    backend.present(&session.scene())?;
                }
            }
            Request::Help => print_help(),
            Request::Quit => break,
        }
    }

    Ok(())
}

fn parse_request(line: &str) -> Result<Request, String> {
    let mut fields = line.split_whitespace();
    let verb = fields.next().unwrap_or("");
    let request = match verb {
        "n" | "north" | "up" => Request::Input(SessionInput::Step(Direction::North)),
        "s" | "south" | "down" => Request::Input(SessionInput::Step(Direction::South)),
        "e" | "east" | "right" => Request::Input(SessionInput::Step(Direction::East)),
        "w" | "west" | "left" => Request::Input(SessionInput::Step(Direction::West)),
        "toggle" => Request::Input(SessionInput::ToggleMode),
        "click" => {
            let (i, j) = parse_pair::<i32>(&mut fields)
                .ok_or("usage: click <i> <j>".to_owned())?;
            Request::Input(SessionInput::Click(TileCoord::new(i, j)))
        }
        "geo" => {
            let (lat, lng) = parse_pair::<f64>(&mut fields)
                .ok_or("usage: geo <lat> <lng>".to_owned())?;
            Request::Input(SessionInput::GeoSample(GeoPoint::new(lat, lng)))
        }
        "geo-error" => Request::Input(SessionInput::GeoError(GeoError::PositionUnavailable)),
        "pan" => {
            let (di, dj) = parse_pair::<i32>(&mut fields)
                .ok_or("usage: pan <di> <dj>".to_owned())?;
            Request::Input(SessionInput::Pan { di, dj })
        }
        "zoom" => match fields.next() {
            Some("in") => Request::Input(SessionInput::Zoom(ZoomChange::In)),
            Some("out") => Request::Input(SessionInput::Zoom(ZoomChange::Out)),
            _ => return Err("usage: zoom in|out".to_owned()),
        },
        "show" => Request::Show,
        "export" => Request::Export,
        "import" => {
            let code = fields.next().ok_or("usage: import <code>".to_owned())?;
            Request::Import(code.to_owned())
        }
        "new" => Request::NewGame,
        "help" => Request::Help,
        "q" | "quit" | "exit" => Request::Quit,
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(request)
}

fn parse_pair<T: std::str::FromStr>(
    fields: &mut std::str::SplitWhitespace<'_>,
) -> Option<(T, T)> {
    let first = fields.next()?.parse().ok()?;
    let second = fields.next()?.parse().ok()?;
    Some((first, second))
}

fn report(events: &[Event]) {
    for event in events {
        match event {
            Event::GameWon { value } => {
                println!("Congratulations! You win! (held {})", value.get());
            }
            Event::SessionReset { .. } => println!("New game started."),
            Event::MovementModeChanged { mode } => println!("Movement mode: {mode:?}"),
            _ => {}
        }
    }
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    let _ = io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_help() {
    println!("movement:  n/s/e/w (manual mode), toggle, geo <lat> <lng>, geo-error");
    println!("tokens:    click <i> <j>");
    println!("view:      pan <di> <dj>, zoom in|out, show");
    println!("session:   export, import <code>, new, quit");
}
