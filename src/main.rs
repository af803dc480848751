mod analysis;
mod backend;
mod config;
mod context;
mod dates;
mod error;
mod extract;
mod filter;
mod format;
mod frontmatter;
mod interpret;
mod pipeline;
mod record;
mod values;

use chrono::{Datelike, Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use backend::{BackendError, LocalCollection, RemoteBackend, SearchBackend};
use config::{BackendKind, Config};
use context::RequestContext;
use error::{Error, Result};
use extract::PatternExtractor;
use filter::Field;
use interpret::{ChatCompletionsInterpreter, InterpreterStrategy};

#[derive(Parser)]
#[command(
    name = "matchq",
    about = "Ask questions about football games in plain English"
)]
struct Cli {
    #[arg(long, env = "MATCHQ_CONFIG", help = "YAML settings file")]
    config: Option<PathBuf>,

    #[arg(long, env = "MATCHQ_GAMES", help = "Directory of game documents")]
    games: Option<PathBuf>,

    #[arg(long, value_enum, help = "Where to search (overrides the config)")]
    backend: Option<BackendKind>,

    #[arg(long, help = "Read game file paths from stdin")]
    stdin: bool,

    #[arg(long, help = "Collection name on the search backend")]
    collection: Option<String>,

    #[arg(short = 'k', long, help = "Maximum number of games to return")]
    results: Option<usize>,

    #[arg(long, help = "Team whose record is summarised")]
    team: Option<String>,

    #[arg(long, help = "Year that month names resolve into")]
    season_year: Option<i32>,

    #[arg(long, help = "Reference day for relative dates (YYYY-MM-DD)")]
    today: Option<String>,

    #[arg(long, requires = "to", help = "Start of an explicit date range")]
    from: Option<String>,

    #[arg(long, requires = "from", help = "End of an explicit date range")]
    to: Option<String>,

    #[arg(long, help = "Print the compiled filter without searching")]
    filter_only: bool,

    #[arg(long, help = "Emit JSON instead of text")]
    json: bool,

    #[arg(long, value_name = "JSON", help = "Validate and describe a backend filter")]
    explain: Option<String>,

    #[arg(long, help = "List unique values for a metadata field")]
    values: Option<String>,

    #[arg(long, help = "Show count for each value (use with --values)")]
    count: bool,

    #[arg(long, help = "Skip the generative interpreter")]
    no_llm: bool,

    #[arg(short, long, help = "Debug logging on stderr")]
    verbose: bool,

    #[arg(help = "Question, e.g. \"arsenal games at home last month\"")]
    query: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "matchq=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;

    if let Some(raw) = &cli.explain {
        return run_explain(raw);
    }

    if let Some(name) = &cli.values {
        let field = Field::parse(name).ok_or_else(|| {
            Error::Usage(format!("unknown field '{}' for --values", name))
        })?;
        return run_values_mode(&cli, &config, field);
    }

    let query = cli
        .query
        .clone()
        .ok_or_else(|| Error::Usage("no query provided".to_string()))?;
    let today = match &cli.today {
        Some(s) => parse_date(s)?,
        None => Local::now().date_naive(),
    };
    let date_range = match (&cli.from, &cli.to) {
        (Some(from), Some(to)) => Some((parse_date(from)?, parse_date(to)?)),
        _ => None,
    };

    let strategy = build_strategy(&config, cli.no_llm)?;

    let mut ctx = RequestContext::new(
        cli.collection.clone().unwrap_or_else(|| config.collection.clone()),
        cli.results.unwrap_or(config.results),
        today,
    );
    ctx.date_range = date_range;
    ctx.subject_team = cli.team.clone();

    if cli.filter_only {
        ctx.season_year = cli.season_year.or(config.season_year).unwrap_or(today.year());
        return run_filter_only(&query, &ctx, &strategy, cli.json).await;
    }

    let backend = open_backend(&cli, &config)?;
    ctx.season_year = cli
        .season_year
        .or(config.season_year)
        .or_else(|| backend.season_year())
        .unwrap_or(today.year());

    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let outcome = pipeline::run(&query, ctx, &strategy, backend.as_ref(), cancel).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", format::render(&outcome));
    }

    if outcome.matched() {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(1))
    }
}

async fn run_filter_only(
    query: &str,
    ctx: &RequestContext,
    strategy: &InterpreterStrategy,
    json: bool,
) -> Result<ExitCode> {
    let interpretation = strategy.interpret(query, ctx).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&interpretation)?);
    } else {
        match &interpretation.filter {
            Some(filter) => println!("{}", serde_json::to_string_pretty(filter)?),
            None => println!("null"),
        }
        eprintln!("{}", interpretation.explanation);
    }
    Ok(ExitCode::from(0))
}

fn run_explain(raw: &str) -> Result<ExitCode> {
    match filter::wire::parse_str(raw)? {
        Some(expr) => println!("{}", expr.describe()),
        None => println!("no filter"),
    }
    Ok(ExitCode::from(0))
}

fn run_values_mode(cli: &Cli, config: &Config, field: Field) -> Result<ExitCode> {
    let collection = load_local(cli, config)?;
    let counts = values::collect_values(collection.records(), field);

    if counts.is_empty() {
        return Ok(ExitCode::from(1));
    }

    for line in values::format_values(counts, cli.count) {
        println!("{}", line);
    }
    Ok(ExitCode::from(0))
}

fn build_strategy(config: &Config, no_llm: bool) -> Result<InterpreterStrategy> {
    let settings = &config.interpreter;
    let strategy = InterpreterStrategy::new(PatternExtractor::new()?)
        .with_timeout(Duration::from_secs(settings.timeout_secs));

    if no_llm || !settings.enabled {
        return Ok(strategy);
    }
    let Some(api_key) = config::credential(&settings.api_key_env) else {
        tracing::info!(var = %settings.api_key_env, "no interpreter API key, using patterns only");
        return Ok(strategy);
    };

    match ChatCompletionsInterpreter::new(
        &settings.base_url,
        api_key,
        &settings.model,
        Duration::from_secs(settings.timeout_secs),
    ) {
        Ok(interpreter) => {
            Ok(strategy.with_generative(Box::new(interpreter.with_max_tokens(settings.max_tokens))))
        }
        Err(e) => {
            tracing::warn!(error = %e, "cannot build interpreter client, using patterns only");
            Ok(strategy)
        }
    }
}

fn open_backend(cli: &Cli, config: &Config) -> Result<Box<dyn SearchBackend>> {
    let settings = &config.backend;
    match cli.backend.unwrap_or(settings.kind) {
        BackendKind::Local => {
            let collection = load_local(cli, config)?;
            Ok(Box::new(collection))
        }
        BackendKind::Remote => {
            let api_key = config::credential(&settings.api_key_env)
                .ok_or_else(|| BackendError::MissingCredentials(settings.api_key_env.clone()))?;
            let backend = RemoteBackend::new(
                &settings.base_url,
                api_key,
                Duration::from_secs(settings.timeout_secs),
            )?
            .with_season_year(config.season_year);
            Ok(Box::new(backend))
        }
    }
}

fn load_local(cli: &Cli, config: &Config) -> Result<LocalCollection> {
    let games = cli.games.clone().or_else(|| config.backend.games_dir.clone());

    if cli.stdin {
        let root = games.unwrap_or_else(|| PathBuf::from("."));
        let paths = backend::read_paths_from_stdin();
        return Ok(LocalCollection::from_paths(&root, paths));
    }

    let Some(root) = games else {
        return Err(Error::Usage(
            "no games directory specified. Use --games or set MATCHQ_GAMES".to_string(),
        ));
    };
    let collection = LocalCollection::load(&root)?;
    tracing::info!(root = %root.display(), games = collection.len(), "using local collection");
    Ok(collection)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    dates::parse_iso(s).ok_or_else(|| Error::InvalidDate(s.to_string()))
}
