//! Binary entrypoint for the toolmodes CLI.
//!
//! Commands:
//! - `init` - create a starter config plus sample group and object definitions
//! - `status` - print configuration, registry and selection database summary
//! - `list --agent <id> --object <code>` - show the visible modes, marking the active one
//! - `select --agent <id> --object <code> (--index <n> | --mode <code>)` - pick a mode
//! - `resolve --agent <id> --object <code>` - print the active mode
//! - `clear --agent <id> --object <code>` - drop the object's own selection
//!
//! `select` and `clear` run both sides in one process: the observing side makes the
//! selection and forwards it over the sync channel, the authoritative side applies and
//! persists it.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use toolmodes::code::AssetCode;
use toolmodes::config::Config;
use toolmodes::loader;
use toolmodes::mode::Target;
use toolmodes::modes::register_label_modes;
use toolmodes::object::ObjectDefinition;
use toolmodes::registry::ModeRegistry;
use toolmodes::selection::{AgentId, SelectionDb, SelectionStore};
use toolmodes::sync;
use toolmodes::system::{run_sync_loop, Side, ToolModeSystem};

#[derive(Parser)]
#[command(name = "toolmodes")]
#[command(about = "Inspect and change per-agent tool mode selections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "toolmodes.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and sample asset files
    Init,
    /// Show configuration and stored selection summary
    Status,
    /// List the modes an agent can pick for an object
    List {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        object: String,
    },
    /// Select a mode by display index or by code
    Select {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        object: String,
        /// Position in the `list` output
        #[arg(short, long, conflicts_with = "mode")]
        index: Option<usize>,
        /// Mode code, e.g. `game:scythe-trim`
        #[arg(short, long)]
        mode: Option<String>,
    },
    /// Print the active mode for an object
    Resolve {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        object: String,
    },
    /// Clear the object's own selection
    Clear {
        #[arg(short, long)]
        agent: String,
        #[arg(short, long)]
        object: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Init writes the config, everything else needs one
    let config = match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            return run_init(&cli.config).await;
        }
        _ => Config::load(&cli.config).await?,
    };
    init_logging(&Some(config.clone()), cli.verbose);
    config.validate()?;

    match cli.command {
        Commands::Init => {}
        Commands::Status => show_status(&config)?,
        Commands::List { agent, object } => {
            let env = Environment::load(&config)?;
            let agent = AgentId::new(&agent);
            let def = env.object(&object)?;
            let authoritative = env.authoritative(&config, def)?;
            let active = authoritative.active_index(&agent, def);
            let listed = authoritative.list_visible_modes(&agent, def, &Target::Nothing);
            if listed.is_empty() {
                println!("{} has no tool modes", def.code);
            }
            let modes = authoritative.modes(&def.code);
            for (index, listing) in listed.iter().enumerate() {
                let marker = match active {
                    Some(i) if modes[i].code() == &listing.code => "*",
                    _ => " ",
                };
                println!("{} {:>2}  {:<28} {}", marker, index, listing.code, listing.display.name);
            }
        }
        Commands::Select {
            agent,
            object,
            index,
            mode,
        } => {
            let choice = match (index, mode) {
                (Some(index), _) => Choice::Index(index),
                (None, Some(mode)) => {
                    Choice::Code(AssetCode::parse_with_domain(&mode, &config.system.default_domain)?)
                }
                (None, None) => return Err(anyhow!("select needs --index or --mode")),
            };
            let env = Environment::load(&config)?;
            let resolved = env.round_trip(&config, &AgentId::new(&agent), &object, choice).await?;
            println!("{}", resolved);
        }
        Commands::Resolve { agent, object } => {
            let env = Environment::load(&config)?;
            let def = env.object(&object)?;
            let authoritative = env.authoritative(&config, def)?;
            match authoritative.resolve(&AgentId::new(&agent), def) {
                Some(code) => println!("{}", code),
                None => println!("{} has no tool modes", def.code),
            }
        }
        Commands::Clear { agent, object } => {
            let env = Environment::load(&config)?;
            let resolved = env
                .round_trip(&config, &AgentId::new(&agent), &object, Choice::Clear)
                .await?;
            println!("{}", resolved);
        }
    }

    Ok(())
}

enum Choice {
    Index(usize),
    Code(AssetCode),
    Clear,
}

/// Registry and object definitions built from configuration.
struct Environment {
    registry: Arc<ModeRegistry>,
    objects: Vec<ObjectDefinition>,
    default_domain: String,
}

impl Environment {
    fn load(config: &Config) -> Result<Self> {
        let domain = config.system.default_domain.clone();
        let mut registry = ModeRegistry::new();
        let modes = register_label_modes(&mut registry, &config.modes, &domain)?;
        info!("registered {} label modes", modes.len());

        if let Some(dir) = &config.assets.groups_dir {
            if Path::new(dir).is_dir() {
                let groups = loader::load_groups_from_dir(dir, &domain)?;
                let count = loader::register_groups(&mut registry, groups);
                info!("registered {} tool mode groups from {}", count, dir);
            } else {
                warn!("groups directory {} not found; no groups registered", dir);
            }
        }

        let objects = match &config.assets.objects_file {
            Some(file) if Path::new(file).is_file() => loader::load_objects_from_json(file)?,
            Some(file) => {
                warn!("object file {} not found", file);
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(Self {
            registry: registry.freeze(),
            objects,
            default_domain: domain,
        })
    }

    fn object(&self, code: &str) -> Result<&ObjectDefinition> {
        let code = AssetCode::parse_with_domain(code, &self.default_domain)?;
        self.objects
            .iter()
            .find(|def| def.code == code)
            .ok_or_else(|| anyhow!("unknown object {}", code))
    }

    fn authoritative(&self, config: &Config, def: &ObjectDefinition) -> Result<ToolModeSystem> {
        let db = SelectionDb::open(config.selections_path())?;
        let mut system = ToolModeSystem::new(
            self.registry.clone(),
            Side::Authoritative,
            SelectionStore::persistent(db)?,
        );
        system.on_definition_loaded(def)?;
        Ok(system)
    }

    /// Select on the observing side, ship the writes, and report the authoritative result.
    async fn round_trip(&self, config: &Config, agent: &AgentId, object: &str, choice: Choice) -> Result<String> {
        let def = self.object(object)?;
        let authoritative = self.authoritative(config, def)?;

        let (tx, rx) = sync::channel();
        let mut observing =
            ToolModeSystem::new(self.registry.clone(), Side::Observing, SelectionStore::new()).with_sync(tx);
        observing.on_definition_loaded(def)?;
        observing.restore(agent, authoritative.snapshot(agent))?;

        let shared = Arc::new(Mutex::new(authoritative));
        let applier = tokio::spawn(run_sync_loop(shared.clone(), rx));

        let outcome = match choice {
            Choice::Index(index) => observing.set_selection(agent, def, &Target::Nothing, index),
            Choice::Code(code) => observing.select(agent, def, Some(&code)),
            Choice::Clear => observing.select(agent, def, None),
        };
        let observed = observing.resolve(agent, def).cloned();
        // closes the channel so the applier finishes
        drop(observing);
        let applied = applier.await?;
        outcome?;

        let authoritative = shared.lock().await;
        let resolved = authoritative.resolve(agent, def).cloned();
        info!("applied {} sync messages for {}", applied, agent);
        if resolved != observed {
            warn!(
                "sides disagree for {} on {}: observing {:?}, authoritative {:?}",
                agent, def.code, observed, resolved
            );
        }
        Ok(match resolved {
            Some(code) => code.to_string(),
            None => format!("{} has no tool modes", def.code),
        })
    }
}

async fn run_init(path: &str) -> Result<()> {
    info!("Initializing new toolmodes configuration");
    let config = Config::default();
    Config::create_default(path).await?;
    info!("Configuration file created at {}", path);

    if let Some(dir) = &config.assets.groups_dir {
        tokio::fs::create_dir_all(dir).await?;
        let group = serde_json::json!({
            "code": "item-scythe",
            "members": ["scythe-trim", "scythe-remove"],
        });
        let file = Path::new(dir).join("scythe.json");
        tokio::fs::write(&file, serde_json::to_string_pretty(&group)?).await?;
        info!("Sample group written to {}", file.display());
    }

    if let Some(file) = &config.assets.objects_file {
        if let Some(parent) = Path::new(file).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let objects = serde_json::json!([
            { "code": "scythe-copper", "attributes": { "toolmodegroup": "item-scythe" } },
            {
                "code": "scythe-iron",
                "attributes": { "toolmodegroup": "item-scythe", "toolmodes": ["hoe-till"] }
            },
            { "code": "stick" }
        ]);
        tokio::fs::write(file, serde_json::to_string_pretty(&objects)?).await?;
        info!("Sample objects written to {}", file);
    }

    tokio::fs::create_dir_all(&config.storage.data_dir).await?;
    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let env = Environment::load(config)?;
    println!("toolmodes v{}", env!("CARGO_PKG_VERSION"));
    println!("side:            {}", config.system.side);
    println!("default domain:  {}", config.system.default_domain);
    println!("registered modes: {}", env.registry.mode_count());
    for group in env.registry.group_codes() {
        let members = env.registry.group_members(group).map_or(0, |m| m.len());
        println!("  group {} ({} members)", group, members);
    }
    println!("object definitions: {}", env.objects.len());

    let path = config.selections_path();
    if path.exists() {
        let db = SelectionDb::open(&path)?;
        println!("agents with selections: {}", db.list_agent_ids()?.len());
    } else {
        println!("no selection database at {}", path.display());
    }
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    // CLI verbosity overrides config
    let level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            writeln!(fmt, "{}", line)
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
