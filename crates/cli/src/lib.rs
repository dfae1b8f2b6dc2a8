use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use oumodules_bot::{
    format_result, BotConfig, ClaimBackend, DiscordClient, IncomingMessage, Interaction,
    InteractionHandler, InteractionWebhook, MessageProcessor, Outcome,
};
use oumodules_claims::ClaimCoordinator;
use oumodules_protocol::{serialize_json_pretty, Code, Lookup, MessageId};
use oumodules_resolver::{LookupMode, MemoryCache, ModuleCache, ResolutionEngine};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod sink;

use sink::StdoutSink;

pub(crate) fn print_stdout(text: &str) -> io::Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err);
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "oumodules")]
#[command(about = "Resolve Open University module and qualification codes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Seed cache file (overrides OU_MODULES_CACHE; default is the bundled snapshot)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Claims directory shared by bot instances (overrides OU_MODULES_CLAIMS_DIR)
    #[arg(long, global = true)]
    claims_dir: Option<PathBuf>,

    /// How to run the external lookup strategies
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    /// Run all strategies at once, first answer wins
    Race,
    /// Try strategies one after another in precedence order
    Sequential,
}

impl From<ModeArg> for LookupMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Race => LookupMode::Race,
            ModeArg::Sequential => LookupMode::Sequential,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve codes and print one line per code
    Lookup(LookupArgs),

    /// Process a chat message the way the bot would, printing the reply
    Scan(ScanArgs),

    /// Answer a message-command interaction read from a JSON file
    Interaction(InteractionArgs),

    /// Print the loaded cache in seed-file format
    DumpCache,
}

#[derive(Args)]
struct LookupArgs {
    /// Module or qualification codes, e.g. M269 TM111 Q62
    #[arg(required = true)]
    codes: Vec<String>,

    /// Output results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Message text containing `!CODE` mentions
    text: String,

    /// Source message id used for claiming (default: derived from the text)
    #[arg(long)]
    id: Option<String>,

    /// Post the reply to this Discord channel instead of printing it
    #[arg(long)]
    channel: Option<String>,
}

#[derive(Args)]
struct InteractionArgs {
    /// Interaction JSON file, or `-` for stdin
    file: PathBuf,

    /// Send the follow-up to Discord, replacing the deferred response
    #[arg(long)]
    send: bool,

    /// Application id for the follow-up webhook
    #[arg(long)]
    application_id: Option<u64>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Lookup(args) => run_lookup(args, &config).await?,
        Commands::Scan(args) => run_scan(args, &config).await?,
        Commands::Interaction(args) => run_interaction(args, &config).await?,
        Commands::DumpCache => run_dump_cache(&config)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<BotConfig> {
    let mut config = BotConfig::from_env().context("Failed to load bot configuration")?;
    if let Some(path) = &cli.cache {
        config.cache_path = Some(path.clone());
    }
    if let Some(dir) = &cli.claims_dir {
        config.claims = ClaimBackend::Directory(dir.clone());
    }
    if let Some(mode) = cli.mode {
        config.resolver.lookup_mode = mode.into();
    }
    Ok(config)
}

fn load_cache(config: &BotConfig) -> Result<MemoryCache> {
    let cache = config.load_cache().with_context(|| match &config.cache_path {
        Some(path) => format!("Cannot load cache {}", path.display()),
        None => "Cannot load bundled cache".to_string(),
    })?;
    log::debug!("loaded {} cached codes", cache.len());
    Ok(cache)
}

fn build_engine(config: &BotConfig) -> Result<ResolutionEngine> {
    let cache = Arc::new(load_cache(config)?);
    ResolutionEngine::from_config(&config.resolver, cache).context("Invalid resolver settings")
}

fn build_claims(config: &BotConfig) -> Result<ClaimCoordinator> {
    let store = config.claim_store().context("Cannot open claim store")?;
    Ok(ClaimCoordinator::new(store))
}

async fn run_lookup(args: LookupArgs, config: &BotConfig) -> Result<()> {
    let codes = args
        .codes
        .iter()
        .map(|raw| {
            Code::parse(raw).with_context(|| format!("Not a module or qualification code: {raw}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let engine = build_engine(config)?;
    let results: Vec<_> = engine
        .resolve_all(&codes)
        .await
        .iter()
        .map(Lookup::to_display)
        .collect();

    if args.json {
        print_stdout(&serialize_json_pretty(&results)?)?;
    } else {
        for result in &results {
            print_stdout(&format_result(result, false))?;
        }
    }
    Ok(())
}

/// Stable across runs and toolchains, since the id keys shared claim records.
fn message_id_for(text: &str) -> MessageId {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    MessageId::from(u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ]))
}

async fn run_scan(args: ScanArgs, config: &BotConfig) -> Result<()> {
    let id = args
        .id
        .map(MessageId::from)
        .unwrap_or_else(|| message_id_for(&args.text));
    let engine = build_engine(config)?;
    let claims = build_claims(config)?;

    let outcome = match args.channel {
        Some(channel) => {
            let token = config.require_token()?;
            let client = DiscordClient::new(&config.api_url, token, config.api_timeout())?;
            let message = IncomingMessage::new(id, args.text).in_channel(channel);
            MessageProcessor::new(engine, claims, client)
                .process(&message)
                .await?
        }
        None => {
            let message = IncomingMessage::new(id, args.text);
            MessageProcessor::new(engine, claims, StdoutSink::default())
                .process(&message)
                .await?
        }
    };

    match outcome {
        Outcome::NoMentions => log::info!("no !CODE mentions found"),
        Outcome::AlreadyClaimed => log::info!("message already handled by another instance"),
        Outcome::NothingFound => log::info!("none of the mentioned codes could be resolved"),
        Outcome::Replied | Outcome::Edited => {}
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read interaction from stdin")?;
        return Ok(raw);
    }
    fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

async fn run_interaction(args: InteractionArgs, config: &BotConfig) -> Result<()> {
    let interaction = Interaction::from_json(&read_input(&args.file)?)
        .context("Failed to parse interaction JSON")?;
    let handler = InteractionHandler::new(build_engine(config)?, build_claims(config)?);

    let response = handler.respond(&interaction)?;
    print_stdout(&serialize_json_pretty(&response)?)?;
    if !response.is_deferred() {
        return Ok(());
    }

    let sent = if args.send {
        let token = config.token.as_deref().unwrap_or_default();
        let client = DiscordClient::new(&config.api_url, token, config.api_timeout())?;
        let application_id = args.application_id.unwrap_or(config.application_id);
        handler
            .follow_up(&interaction, &InteractionWebhook::new(client, application_id))
            .await
            .context("Failed to send interaction follow-up")?
    } else {
        handler.follow_up(&interaction, &StdoutSink::default()).await?
    };
    if sent.is_none() {
        log::info!("interaction {} already claimed", interaction.id);
    }
    Ok(())
}

fn run_dump_cache(config: &BotConfig) -> Result<()> {
    let cache = load_cache(config)?;
    print_stdout(&cache.to_json_pretty()?)?;
    Ok(())
}
