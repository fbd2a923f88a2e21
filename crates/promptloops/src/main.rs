use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::warn;

use promptloops_agent::{create_agent, Agent, AgentConfig, AgentType};
use promptloops_core::{
    ControlConfig, Controller, Episode, EpisodeOutcome, EpisodeRunner, InstructionPair,
    MemoryObservationLog, ObservationLog, TuningSession,
};
use promptloops_critic::AgentScorer;
use promptloops_db::Database;
use promptloops_logging::{init_tracing, LogEvent, LogFormat, Logger, SessionLine, SessionWriter};
use promptloops_rewriter::AgentRewriter;

mod config;
mod observations;
mod serve;

use config::{ProjectConfig, Role};
use observations::{handle_observations_command, ObservationsAction};

#[derive(Parser, Debug)]
#[command(
    name = "promptloops",
    about = "Feedback-driven prompt tuning for coding agents",
    version,
    author
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Working directory (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Agent to use for every role
    #[arg(short, long, value_enum, global = true)]
    agent: Option<AgentChoice>,

    /// Agent to use specifically for scoring
    #[arg(long, value_enum, global = true)]
    scorer_agent: Option<AgentChoice>,

    /// Agent to use specifically for rewriting instructions
    #[arg(long, value_enum, global = true)]
    rewriter_agent: Option<AgentChoice>,

    /// Agent to use specifically for solving (solve only)
    #[arg(long, value_enum, global = true)]
    actor_agent: Option<AgentChoice>,

    /// Model to use (if agent supports it)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Diagnostic log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also append timestamped JSON events to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Observation database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Keep observations in memory for this run only
    #[arg(long, global = true)]
    memory_observations: bool,

    /// Dry run: show the resolved setup without executing
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read critique requests as JSON lines on stdin, answer on stdout
    Serve,

    /// Drive an agent through critique turns until the critic stops it
    Solve(SolveArgs),

    /// Manage the observation log
    Observations {
        #[command(subcommand)]
        action: ObservationsAction,
    },
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// The issue to solve
    #[arg(short, long, conflicts_with = "question_file")]
    question: Option<String>,

    /// Read the issue from a file
    #[arg(long)]
    question_file: Option<PathBuf>,

    /// Repository context handed to the actor and critic
    #[arg(long)]
    context: Option<String>,

    /// Maximum critique turns (default: until the critic stops)
    #[arg(short = 'n', long)]
    max_turns: Option<usize>,

    /// Shell command whose success means the solution already passes
    #[arg(long)]
    check_command: Option<String>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AgentChoice {
    Claude,
    Opencode,
}

impl From<AgentChoice> for AgentType {
    fn from(choice: AgentChoice) -> Self {
        match choice {
            AgentChoice::Claude => AgentType::ClaudeCode,
            AgentChoice::Opencode => AgentType::OpenCode,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Agent and model chosen for one role
#[derive(Debug, Clone)]
struct RoleSetup {
    agent: AgentType,
    model: Option<String>,
}

/// Everything resolved from flags and `promptloops.toml`
struct Setup {
    working_dir: PathBuf,
    control: ControlConfig,
    instructions: InstructionPair,
    scorer: RoleSetup,
    rewriter: RoleSetup,
    actor: RoleSetup,
    db_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = cli.global;
    let log_format: LogFormat = global.log_format.into();
    init_tracing(&global.log_level, log_format);

    let working_dir = match global.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let db_path = global.db.clone().unwrap_or_else(Database::default_path);

    if let Command::Observations { action } = cli.command {
        let db = open_database(&db_path)?;
        return handle_observations_command(action, &db);
    }

    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();
    let setup = Setup {
        instructions: project.initial_instructions(&working_dir)?,
        scorer: resolve_role(&global, global.scorer_agent, &project, Role::Scorer)?,
        rewriter: resolve_role(&global, global.rewriter_agent, &project, Role::Rewriter)?,
        actor: resolve_role(&global, global.actor_agent, &project, Role::Actor)?,
        control: project.control,
        working_dir,
        db_path,
    };

    if global.dry_run {
        print_dry_run(&setup, &global, &cli.command);
        return Ok(());
    }

    let scorer_agent = available_agent(&setup.scorer, "Scorer").await?;
    let rewriter_agent = available_agent(&setup.rewriter, "Rewriter").await?;
    let scorer_name = scorer_agent.name().to_string();
    let rewriter_name = rewriter_agent.name().to_string();

    let scorer = AgentScorer::new(
        scorer_agent,
        AgentConfig::new(setup.working_dir.clone()).with_model(setup.scorer.model.clone()),
    );
    let rewriter = AgentRewriter::new(
        rewriter_agent,
        AgentConfig::new(setup.working_dir.clone()).with_model(setup.rewriter.model.clone()),
    );

    let store: Box<dyn ObservationLog> = if global.memory_observations {
        Box::new(MemoryObservationLog::new())
    } else {
        Box::new(open_database(&setup.db_path)?)
    };

    let logger = Arc::new(build_logger(log_format, global.log_file.as_deref())?);
    logger.log(&LogEvent::SessionStarted {
        scorer: scorer_name.clone(),
        rewriter: rewriter_name.clone(),
        observations: store.read().context("Failed to read observations")?.len(),
    });

    let label = match cli.command {
        Command::Solve(ref args) => args.question.clone().unwrap_or_else(|| "solve".into()),
        _ => "serve".to_string(),
    };
    let session_writer = match SessionWriter::new(&label) {
        Ok(writer) => {
            writer.write(&SessionLine::SessionStart {
                timestamp: Utc::now(),
                label: label.clone(),
                scorer: scorer_name,
                rewriter: rewriter_name,
            });
            Some(Arc::new(writer))
        }
        Err(e) => {
            warn!(error = %e, "Session log unavailable");
            None
        }
    };

    let mut controller = Controller::new(
        &scorer,
        &rewriter,
        store.as_ref(),
        setup.control.clone(),
        logger.clone(),
    );
    if let Some(ref writer) = session_writer {
        controller = controller.with_session_writer(writer.clone());
    }

    let mut session = TuningSession::new(setup.instructions.clone());
    let started = Instant::now();

    let exit_code = match cli.command {
        Command::Serve => {
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            serve::serve(&controller, &mut session, reader, tokio::io::stdout()).await?;
            end_session(session_writer.as_deref(), "closed", session.turns(), started);
            0
        }
        Command::Solve(args) => {
            let outcome = run_solve(&setup, &controller, &mut session, logger, args).await?;
            end_session(
                session_writer.as_deref(),
                outcome.label(),
                outcome.turns(),
                started,
            );
            outcome.exit_code()
        }
        Command::Observations { .. } => 0,
    };

    std::process::exit(exit_code);
}

async fn run_solve(
    setup: &Setup,
    controller: &Controller<'_>,
    session: &mut TuningSession,
    logger: Arc<Logger>,
    args: SolveArgs,
) -> Result<EpisodeOutcome> {
    let question = read_question(&args, &setup.working_dir)?;
    let actor = available_agent(&setup.actor, "Actor").await?;

    let mut episode = Episode::new(question, setup.working_dir.clone())
        .with_actor_model(setup.actor.model.clone());
    if let Some(context) = args.context {
        episode = episode.with_context(context);
    }
    if let Some(max) = args.max_turns {
        episode = episode.with_max_turns(max);
    }
    if let Some(command) = args.check_command {
        episode = episode.with_check_command(command);
    }

    let runner = EpisodeRunner::new(actor.as_ref(), controller, logger);

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current turn...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let outcome = runner.run(session, episode).await;

    if args.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome, session);
    }
    Ok(outcome)
}

fn resolve_role(
    global: &GlobalArgs,
    role_flag: Option<AgentChoice>,
    project: &ProjectConfig,
    role: Role,
) -> Result<RoleSetup> {
    // Priority: role flag > --agent > config file > claude
    let agent = match role_flag.or(global.agent) {
        Some(choice) => choice.into(),
        None => match project.agent_for(role) {
            Some(name) => name.parse::<AgentType>().map_err(anyhow::Error::msg)?,
            None => AgentType::ClaudeCode,
        },
    };
    let model = global
        .model
        .clone()
        .or_else(|| project.model_for(role).map(str::to_string));
    Ok(RoleSetup { agent, model })
}

async fn available_agent(role: &RoleSetup, label: &str) -> Result<Box<dyn Agent>> {
    let agent = create_agent(role.agent);
    if !agent.is_available().await {
        anyhow::bail!(
            "{} agent '{}' is not available. Make sure it's installed and in PATH.",
            label,
            agent.name()
        );
    }
    Ok(agent)
}

fn build_logger(format: LogFormat, log_file: Option<&Path>) -> Result<Logger> {
    match log_file {
        Some(path) => Logger::with_file(format, path)
            .with_context(|| format!("Failed to open log file {}", path.display())),
        None => Ok(Logger::new(format)),
    }
}

fn open_database(path: &Path) -> Result<Database> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    Database::open_at(path).with_context(|| format!("Failed to open {}", path.display()))
}

fn read_question(args: &SolveArgs, working_dir: &Path) -> Result<String> {
    if let Some(ref question) = args.question {
        return Ok(question.clone());
    }

    let Some(ref file) = args.question_file else {
        anyhow::bail!("No question provided. Use --question or --question-file");
    };
    let path = if file.is_absolute() {
        file.clone()
    } else {
        working_dir.join(file)
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content.trim().to_string())
}

fn end_session(writer: Option<&SessionWriter>, outcome: &str, turns: usize, started: Instant) {
    if let Some(writer) = writer {
        writer.write(&SessionLine::SessionEnd {
            outcome: outcome.to_string(),
            turns,
            duration_secs: started.elapsed().as_secs_f64(),
            timestamp: Utc::now(),
        });
    }
}

fn print_dry_run(setup: &Setup, global: &GlobalArgs, command: &Command) {
    println!("=== Dry Run ===");
    println!("Working dir: {}", setup.working_dir.display());
    println!("Scorer: {} ({})", setup.scorer.agent, model_label(&setup.scorer));
    println!("Rewriter: {} ({})", setup.rewriter.agent, model_label(&setup.rewriter));
    if let Command::Solve(ref args) = command {
        println!("Actor: {} ({})", setup.actor.agent, model_label(&setup.actor));
        match args.max_turns {
            Some(max) => println!("Max turns: {}", max),
            None => println!("Max turns: unlimited"),
        }
    }
    if let Some(ref path) = global.log_file {
        println!("Log file: {}", path.display());
    }
    if global.memory_observations {
        println!("Observations: in memory");
    } else {
        println!("Observations: {}", setup.db_path.display());
    }
    println!(
        "Control: satisfied<{} regression<={} avg>={} error>{} cycle>={} dedup={:?}",
        setup.control.satisfied_magnitude,
        setup.control.regression_limit,
        setup.control.min_avg_improvement,
        setup.control.error_trigger,
        setup.control.cycle_trigger,
        setup.control.dedup,
    );
}

fn model_label(role: &RoleSetup) -> &str {
    role.model.as_deref().unwrap_or("default model")
}

fn print_outcome(outcome: &EpisodeOutcome, session: &TuningSession) {
    eprintln!();
    match outcome {
        EpisodeOutcome::Satisfied {
            turns,
            solution,
            scores,
            total_duration_secs,
        } => {
            eprintln!("{}", "=== SATISFIED ===".bright_green().bold());
            eprintln!("Turns: {}", turns);
            eprintln!("Scores: {}", scores);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            println!("{}", solution);
        }
        EpisodeOutcome::AlreadyPassed {
            turns,
            solution,
            total_duration_secs,
        } => {
            eprintln!("{}", "=== PASSED ===".bright_green().bold());
            eprintln!("Turns: {}", turns);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            println!("{}", solution);
        }
        EpisodeOutcome::Stopped {
            turns,
            decision,
            solution,
            scores,
            total_duration_secs,
        } => {
            eprintln!("{}", format!("=== STOPPED: {} ===", decision).yellow().bold());
            eprintln!("Turns: {}", turns);
            eprintln!("Scores: {}", scores);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            println!("{}", solution);
        }
        EpisodeOutcome::MaxTurnsReached {
            turns,
            total_duration_secs,
            ..
        } => {
            eprintln!("{}", "=== INCOMPLETE ===".yellow().bold());
            eprintln!("Reached maximum turns ({})", turns);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        EpisodeOutcome::Interrupted {
            turns,
            total_duration_secs,
        } => {
            eprintln!("{}", "=== INTERRUPTED ===".yellow().bold());
            eprintln!("User stopped after {} turn(s)", turns);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        EpisodeOutcome::Failed {
            turns,
            error,
            total_duration_secs,
        } => {
            eprintln!("{}", "=== FAILED ===".red().bold());
            eprintln!("Error after {} turn(s): {}", turns, error);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
    eprintln!("Instruction rewrites: {}", session.rewrites());
}
