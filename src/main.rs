//! Binary entrypoint for the pulsemud CLI.
//!
//! Commands:
//! - `start` - load the world and run the pulse scheduler
//! - `init` - create a starter `config.toml` and seed world files
//! - `status` - print world content and player-store statistics
//!
//! See the library crate docs for module-level details: `pulsemud::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use pulsemud::config::Config;
use pulsemud::pulse::PulseDriver;
use pulsemud::storage::PlayerStore;
use pulsemud::world::errors::WorldError;
use pulsemud::world::{load_world, World};

#[derive(Parser)]
#[command(name = "pulsemud")]
#[command(about = "A pulse-driven multi-user dungeon world engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the world simulation
    Start,
    /// Initialize a new configuration and seed world
    Init,
    /// Show world content and player statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config early to configure logging (except for Init which writes
    // the default later)
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    if !matches!(cli.command, Commands::Init) {
        init_logging(&pre_config, cli.verbose);
    }

    match cli.command {
        Commands::Start => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting pulsemud v{}", env!("CARGO_PKG_VERSION"));

            let data_dir = std::path::PathBuf::from(&config.server.data_dir);
            let store = PlayerStore::open(&data_dir)?;
            let saved_players = store.list_player_names()?.len();
            info!(
                "player store opened at {} ({} saved players)",
                data_dir.display(),
                saved_players
            );

            // Any category failing to load aborts startup; the world cannot
            // run without its static content.
            let content = load_world(data_dir.join("world"))?;
            let world = World::new(content, config.world.settings());

            let driver = PulseDriver::new(world, config.pulse.clone());
            driver.run().await?;
            info!("pulsemud stopped");
        }
        Commands::Init => {
            Config::create_default(&cli.config).await?;
            println!("Wrote default configuration to {}", cli.config);

            let config = Config::load(&cli.config).await?;
            let world_dir = std::path::PathBuf::from(&config.server.data_dir).join("world");
            write_seed_world(&world_dir)?;
            println!("Wrote seed world files to {}", world_dir.display());
            println!("Run `pulsemud start` to bring the world up.");
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let data_dir = std::path::PathBuf::from(&config.server.data_dir);
            match load_world(data_dir.join("world")) {
                Ok(content) => {
                    println!("World content:");
                    println!("  rooms:              {}", content.rooms.len());
                    println!("  zones:              {}", content.zones.len());
                    println!("  mobile prototypes:  {}", content.mob_protos.len());
                    println!("  object prototypes:  {}", content.obj_protos.len());
                    println!("  shops:              {}", content.shops.len());
                }
                Err(e) => println!("World content not loadable: {}", e),
            }
            match PlayerStore::open(&data_dir) {
                Ok(store) => {
                    println!("Saved players: {}", store.list_player_names()?.len());
                }
                Err(WorldError::DataDirLocked(_)) => {
                    println!("Player store is locked: a server appears to be running.");
                }
                Err(e) => println!("Player store not readable: {}", e),
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    if let Some(cfg) = config {
        if let Some(ref file) = cfg.logging.file {
            if let Ok(f) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
            {
                let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));

                // If stdout is a terminal, mirror the log line to the console.
                let is_tty = atty::is(atty::Stream::Stdout);

                builder.format(move |fmt, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                    let line = format!("{} [{}] {}", ts, record.level(), record.args());

                    if let Ok(mut guard) = write_mutex.lock() {
                        let _ = writeln!(guard, "{}", line);
                    }
                    if is_tty {
                        writeln!(fmt, "{}", line)
                    } else {
                        Ok(())
                    }
                });
            }
        }
    }
    let _ = builder.try_init();
}

/// Write a small playable seed world: a three-room town zone with a
/// cityguard, a janitor, a rat, and enough objects to exercise the reset
/// script.
fn write_seed_world(dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    std::fs::write(
        dir.join("rooms.json"),
        r#"[
  {
    "id": 1,
    "zone": 0,
    "name": "The Void",
    "description": "A formless holding place for the misplaced.",
    "flags": ["no_mob", "peaceful"]
  },
  {
    "id": 3001,
    "zone": 30,
    "name": "The Temple Square",
    "description": "A wide square before the temple. The market lies east.",
    "flags": ["peaceful"],
    "exits": {"east": {"to": 3002}}
  },
  {
    "id": 3002,
    "zone": 30,
    "name": "The Market",
    "description": "Stalls and shouting. An alley runs north.",
    "exits": {
      "west": {"to": 3001},
      "north": {"to": 3003, "door": {"keywords": "gate", "initial_state": "closed"}}
    }
  },
  {
    "id": 3003,
    "zone": 30,
    "name": "A Dark Alley",
    "description": "Narrow, damp, and poorly lit.",
    "flags": ["dark"],
    "exits": {"south": {"to": 3002}}
  }
]
"#,
    )?;

    std::fs::write(
        dir.join("zones.json"),
        r#"[
  {
    "id": 30,
    "name": "The Town",
    "bottom": 3000,
    "top": 3099,
    "lifespan": 15,
    "commands": [
      {"command": "load_mobile", "mobile": 3060, "room": 3002, "max": 1},
      {"command": "equip_mobile", "object": 3020, "slot": "wield"},
      {"command": "load_mobile", "mobile": 3061, "room": 3001, "max": 1},
      {"command": "load_mobile", "mobile": 3062, "room": 3003, "max": 2},
      {"command": "load_object", "object": 3021, "room": 3002, "max": 1},
      {"command": "load_object", "object": 3022, "room": 3002, "max": 1},
      {"command": "put_in_object", "object": 3023, "container": 3022},
      {"command": "set_door", "room": 3002, "direction": "north", "state": "closed"}
    ]
  }
]
"#,
    )?;

    std::fs::write(
        dir.join("mobiles.json"),
        r#"[
  {
    "id": 3060,
    "keywords": "guard cityguard",
    "short_desc": "the cityguard",
    "long_desc": "A cityguard stands here, watching the crowd.",
    "level": 10,
    "max_hit": 110,
    "damage": {"count": 2, "size": 4, "bonus": 1},
    "stats": {"strength": 2, "dexterity": 1, "constitution": 2, "hitroll": 4, "damroll": 2, "armor": -20},
    "alignment": 650,
    "gold": 50,
    "flags": ["sentinel"],
    "special": "cityguard"
  },
  {
    "id": 3061,
    "keywords": "janitor",
    "short_desc": "the janitor",
    "long_desc": "A grubby janitor sweeps the square.",
    "level": 3,
    "max_hit": 30,
    "damage": {"count": 1, "size": 3, "bonus": 0},
    "alignment": 100,
    "flags": ["stay_zone"],
    "special": "janitor"
  },
  {
    "id": 3062,
    "keywords": "rat giant",
    "short_desc": "the giant rat",
    "long_desc": "A giant rat scurries along the gutter.",
    "level": 1,
    "max_hit": 8,
    "damage": {"count": 1, "size": 3, "bonus": 0},
    "alignment": -150,
    "flags": ["aggressive", "stay_zone", "scavenger"]
  }
]
"#,
    )?;

    std::fs::write(
        dir.join("objects.json"),
        r#"[
  {
    "id": 3020,
    "keywords": "sword long",
    "short_desc": "a long sword",
    "kind": "weapon",
    "weight": 8,
    "cost": 100,
    "wear_slots": ["wield"],
    "damage": {"count": 1, "size": 8, "bonus": 0},
    "takeable": true
  },
  {
    "id": 3021,
    "keywords": "bread loaf",
    "short_desc": "a loaf of bread",
    "kind": "other",
    "weight": 1,
    "cost": 2,
    "takeable": true
  },
  {
    "id": 3022,
    "keywords": "chest wooden",
    "short_desc": "a wooden chest",
    "kind": "container",
    "weight": 40,
    "cost": 75
  },
  {
    "id": 3023,
    "keywords": "coin gold",
    "short_desc": "a gold coin",
    "kind": "other",
    "weight": 1,
    "cost": 10,
    "takeable": true
  }
]
"#,
    )?;

    std::fs::write(
        dir.join("shops.json"),
        r#"[
  {
    "id": 1,
    "room": 3002,
    "keeper": 3060,
    "selling": [3020, 3021],
    "buy_profit": 1.2,
    "sell_profit": 0.8
  }
]
"#,
    )?;

    Ok(())
}
