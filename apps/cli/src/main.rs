#![deny(warnings)]

//! Headless CLI for the territory-conquest backend.

use anyhow::{anyhow, bail, Context, Result};
use conquest_core::{BuildingKind, Coord, GameConfig, PoiKind, TerritoryId, TroopKind};
use conquest_runtime::{Game, GameError};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: conquest [--config FILE] [--db URL] [--seed N] [--json] <command>

commands:
  register <user>
  resources <user>
  claim <user> <lat> <lon> [poi]
  build <user> <territory_id> <building>
  train <user> <troop>
  accrue <user>
  attack <user> <territory_id>
  territories <user>
  troops <user>
  version";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    db: Option<String>,
    seed: Option<u64>,
    json: bool,
    words: Vec<String>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Register(String),
    Resources(String),
    Claim {
        user: String,
        coord: Coord,
        poi: Option<PoiKind>,
    },
    Build {
        user: String,
        territory: TerritoryId,
        kind: BuildingKind,
    },
    Train {
        user: String,
        kind: TroopKind,
    },
    Accrue(String),
    Attack {
        user: String,
        territory: TerritoryId,
    },
    Territories(String),
    Troops(String),
    Version,
}

fn parse_args<I: IntoIterator<Item = String>>(raw: I) -> Result<Args> {
    let mut args = Args::default();
    let mut it = raw.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = Some(it.next().context("--config needs a path")?.into()),
            "--db" => args.db = Some(it.next().context("--db needs a url")?),
            "--seed" => {
                let s = it.next().context("--seed needs a number")?;
                args.seed = Some(s.parse().with_context(|| format!("invalid seed {s:?}"))?);
            }
            "--json" => args.json = true,
            _ => args.words.push(arg),
        }
    }
    Ok(args)
}

fn arg<'a>(words: &'a [String], i: usize, name: &str) -> Result<&'a str> {
    words
        .get(i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing <{name}>\n\n{USAGE}"))
}

fn territory_arg(words: &[String], i: usize) -> Result<TerritoryId> {
    let s = arg(words, i, "territory_id")?;
    let id = s
        .trim_start_matches('#')
        .parse()
        .with_context(|| format!("invalid territory id {s:?}"))?;
    Ok(TerritoryId(id))
}

fn parse_command(words: &[String]) -> Result<Command> {
    let verb = arg(words, 0, "command")?;
    let user = || arg(words, 1, "user").map(str::to_string);
    let cmd = match verb {
        "register" => Command::Register(user()?),
        "resources" => Command::Resources(user()?),
        "claim" => {
            let lat = arg(words, 2, "lat")?;
            let lon = arg(words, 3, "lon")?;
            let coord = Coord::new(
                lat.parse().with_context(|| format!("invalid lat {lat:?}"))?,
                lon.parse().with_context(|| format!("invalid lon {lon:?}"))?,
            );
            let poi = words.get(4).map(|p| p.parse::<PoiKind>()).transpose()?;
            Command::Claim {
                user: user()?,
                coord,
                poi,
            }
        }
        "build" => Command::Build {
            user: user()?,
            territory: territory_arg(words, 2)?,
            kind: arg(words, 3, "building")?.parse()?,
        },
        "train" => Command::Train {
            user: user()?,
            kind: arg(words, 2, "troop")?.parse()?,
        },
        "accrue" => Command::Accrue(user()?),
        "attack" => Command::Attack {
            user: user()?,
            territory: territory_arg(words, 2)?,
        },
        "territories" => Command::Territories(user()?),
        "troops" => Command::Troops(user()?),
        "version" => Command::Version,
        other => bail!("unknown command {other:?}\n\n{USAGE}"),
    };
    Ok(cmd)
}

fn load_config(args: &Args) -> Result<GameConfig> {
    let mut cfg = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    }
    .with_env()?;
    if let Some(db) = &args.db {
        cfg.database_url = db.clone();
    }
    if args.seed.is_some() {
        cfg.rng_seed = args.seed;
    }
    Ok(cfg)
}

/// Reply printed for every command: a success flag, a message, and data.
#[derive(Debug, Serialize)]
struct Reply {
    ok: bool,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: Value,
}

impl Reply {
    fn ok<T: Serialize>(message: impl Into<String>, data: &T) -> Result<Self> {
        Ok(Self {
            ok: true,
            message: message.into(),
            data: serde_json::to_value(data)?,
        })
    }

    fn rejected(err: &GameError) -> Self {
        Self {
            ok: false,
            message: err.to_string(),
            data: Value::Null,
        }
    }
}

async fn run(game: &mut Game, cmd: Command) -> Result<Reply> {
    match cmd {
        Command::Register(name) => {
            let u = game.register_user(&name).await?;
            Reply::ok(format!("{} | {}", u.name, u.resources), &u)
        }
        Command::Resources(name) => match game.user_resources(&name).await? {
            Some(r) => Reply::ok(r.to_string(), &r),
            None => Reply::ok(format!("no user named {name:?}"), &json!({})),
        },
        Command::Claim { user, coord, poi } => {
            let t = game.claim_territory(&user, coord, poi).await?;
            Reply::ok(format!("{user} claimed territory {} at ({}, {})", t.id, coord.lat, coord.lon), &t)
        }
        Command::Build {
            user,
            territory,
            kind,
        } => {
            let t = game.construct_building(&user, territory, kind).await?;
            Reply::ok(format!("{kind} built on {territory} (defense {})", t.defense), &t)
        }
        Command::Train { user, kind } => {
            let t = game.train_troop(&user, kind).await?;
            Reply::ok(format!("{kind} trained (+{} attack)", t.attack_bonus), &t)
        }
        Command::Accrue(user) => {
            let r = game.accrue_production(&user).await?;
            Reply::ok(
                format!("{} territories produced {}", r.territories_updated, r.credited),
                &r,
            )
        }
        Command::Attack { user, territory } => {
            let r = game.attack(&user, territory).await?;
            Reply::ok(r.message(), &r)
        }
        Command::Territories(user) => {
            let ts = game.territories(&user).await?;
            let lines: Vec<String> = ts
                .iter()
                .map(|t| {
                    format!(
                        "{} ({}, {}) building: {} poi: {} defense: {}",
                        t.id,
                        t.coord.lat,
                        t.coord.lon,
                        t.building.map_or("-", BuildingKind::as_str),
                        t.poi.map_or("-", PoiKind::as_str),
                        t.defense
                    )
                })
                .collect();
            Reply::ok(lines.join("\n"), &ts)
        }
        Command::Troops(user) => {
            let ts = game.troops(&user).await?;
            let total: i64 = ts.iter().map(|t| t.attack_bonus).sum();
            Reply::ok(format!("{} troops, total attack bonus {total}", ts.len()), &ts)
        }
        Command::Version => Reply::ok(
            format!(
                "conquest {} ({} {})",
                env!("CARGO_PKG_VERSION"),
                env!("GIT_SHA"),
                env!("BUILD_DATE")
            ),
            &Value::Null,
        ),
    }
}

fn print_reply(reply: &Reply, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string(reply)?);
    } else if !reply.message.is_empty() {
        println!("{}", reply.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let cmd = parse_command(&args.words)?;
    let cfg = load_config(&args)?;
    info!(db = %cfg.database_url, seed = ?cfg.rng_seed, ?cmd, "starting CLI");

    let mut game = Game::from_config(&cfg).await?;
    let outcome = run(&mut game, cmd).await;
    game.store().close().await;
    match outcome {
        Ok(reply) => {
            print_reply(&reply, args.json)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => match err.downcast_ref::<GameError>() {
            Some(rule) if rule.is_rule() => {
                print_reply(&Reply::rejected(rule), args.json)?;
                Ok(ExitCode::FAILURE)
            }
            _ => Err(err),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn flags_are_split_from_command_words() {
        let a = parse_args(words("--db sqlite::memory: --json claim Alice 10 20 --seed 7")).unwrap();
        assert_eq!(a.db.as_deref(), Some("sqlite::memory:"));
        assert_eq!(a.seed, Some(7));
        assert!(a.json);
        assert_eq!(a.words, words("claim Alice 10 20"));
    }

    #[test]
    fn claim_with_poi() {
        let cmd = parse_command(&words("claim Alice 10.0 20.0 parque")).unwrap();
        assert_eq!(
            cmd,
            Command::Claim {
                user: "Alice".into(),
                coord: Coord::new(10.0, 20.0),
                poi: Some(PoiKind::Parque),
            }
        );
    }

    #[test]
    fn build_and_attack_accept_hash_ids() {
        let cmd = parse_command(&words("build Alice #3 torre")).unwrap();
        assert_eq!(
            cmd,
            Command::Build {
                user: "Alice".into(),
                territory: TerritoryId(3),
                kind: BuildingKind::Torre,
            }
        );
        let cmd = parse_command(&words("attack Bob 3")).unwrap();
        assert_eq!(
            cmd,
            Command::Attack {
                user: "Bob".into(),
                territory: TerritoryId(3),
            }
        );
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(parse_command(&words("train Bob dragao")).is_err());
        assert!(parse_command(&words("claim Alice north 20")).is_err());
        assert!(parse_command(&words("fly Alice")).is_err());
        assert!(parse_command(&[]).is_err());
        assert!(parse_args(words("--seed many")).is_err());
    }
}
