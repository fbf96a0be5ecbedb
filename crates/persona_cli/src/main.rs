use anyhow::{bail, Context, Result};
use clap::Parser;
use persona_core::{
    EmbeddingBackend, Embedder, EngineConfig, HashingEmbedder, LexiconClassifier, Persona,
    ProjectionMode,
};
use persona_dialogue::{ScriptedParticipant, Session};
use persona_memory::export_session;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PLAYER_NAME: &str = "Player";
const FALLBACK_PERSONA_LINES: &[&str] = &["...", "What do you want?", "Go on."];
const FALLBACK_PLAYER_LINES: &[&str] = &["Hello there.", "I'm sorry.", "Can we talk?"];

#[derive(Parser, Debug)]
#[command(name = "persona-sim", author, version, about, long_about = None)]
struct Args {
    /// Persona definition (JSON)
    #[arg(short, long)]
    persona: PathBuf,

    /// Engine config (TOML). Missing or invalid files fall back to defaults.
    #[arg(short, long, default_value = "persona.toml")]
    config: PathBuf,

    /// Number of turns to run (overrides [session] turns)
    #[arg(short, long)]
    turns: Option<usize>,

    /// Projection mode: whole-history or per-turn
    #[arg(long)]
    projection: Option<ProjectionMode>,

    /// Export root (overrides [session] output_dir)
    #[arg(short, long, env = "PERSONA_OUTPUT_DIR")]
    out: Option<PathBuf>,

    /// Player lines, one per line
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_embedder(config: &EngineConfig) -> Result<Arc<dyn Embedder>> {
    match config.embedding.backend {
        EmbeddingBackend::Hashing => Ok(Arc::new(HashingEmbedder::new(
            config.embedding.dimensions,
        )?)),
        #[cfg(feature = "fastembed")]
        EmbeddingBackend::Fastembed => Ok(Arc::new(persona_core::FastEmbedEncoder::new()?)),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingBackend::Fastembed => {
            bail!("fastembed backend requested but persona-sim was built without the `fastembed` feature")
        }
    }
}

fn read_script(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script: {}", path.display()))?;
    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if lines.is_empty() {
        bail!("Script {} has no lines", path.display());
    }
    Ok(lines)
}

/// Sentences of the persona's `user_message`, or a fixed fallback.
fn persona_lines(persona: &Persona) -> Vec<String> {
    let lines: Vec<String> = persona
        .user_message()
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if lines.is_empty() {
        FALLBACK_PERSONA_LINES.iter().map(|s| s.to_string()).collect()
    } else {
        lines
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let mut config = EngineConfig::load_or_default(&args.config);
    if let Some(turns) = args.turns {
        config.session.turns = turns;
    }
    if let Some(mode) = args.projection {
        config.projection.mode = mode;
    }
    if let Some(out) = &args.out {
        config.session.output_dir = out.display().to_string();
    }

    let embedder = build_embedder(&config)?;
    info!("Loading persona from {}...", args.persona.display());
    let persona = Persona::load(&args.persona, embedder.as_ref()).await?;
    let persona_name = persona.username().to_string();

    let player_lines = match &args.script {
        Some(path) => read_script(path)?,
        None => FALLBACK_PLAYER_LINES.iter().map(|s| s.to_string()).collect(),
    };
    let own_lines = persona_lines(&persona);

    let turns = config.session.turns;
    let output_dir = PathBuf::from(&config.session.output_dir);
    let mut session = Session::new(persona, embedder, Arc::new(LexiconClassifier), config);
    session.add_participant(ScriptedParticipant::new(persona_name.clone(), own_lines));
    session.add_participant(ScriptedParticipant::new(PLAYER_NAME, player_lines));

    let opening = session.narrate(format!("{} approaches {}.", PLAYER_NAME, persona_name))?;
    println!("[{}] {}", opening.turn.role, opening.turn.message);

    for outcome in session.run(turns).await? {
        let t = &outcome.turn;
        println!("{:>3} {}: {} ({})", t.order, t.role, t.message, t.sentiment.as_str());
        for f in &outcome.fired {
            println!("    trigger '{}' fired (distance {:.3})", f.phrase, f.distance);
        }
    }

    println!();
    println!("Mental state of {}:", persona_name);
    for (name, value) in session.persona().mental_state().iter() {
        println!("  {:<12} {}", name, value);
    }
    let overall = session.sentiment().overall();
    println!(
        "Sentiment: {} positive, {} neutral, {} negative",
        overall.positive, overall.neutral, overall.negative
    );
    for role in session.sentiment().roles() {
        if let Some(c) = session.sentiment().role_counts(role) {
            println!(
                "  {:<12} +{} ={} -{}",
                role.to_string(),
                c.positive,
                c.neutral,
                c.negative
            );
        }
    }

    let projected = session.project()?;
    let paths = export_session(&output_dir, &session.record(), Some(&projected))?;
    println!("Saved to {}", paths.chat_dir.display());
    Ok(())
}
