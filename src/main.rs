use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::Path;
use std::process::ExitCode;

mod analysis;
mod client;
mod config;
mod error;
mod models;
mod naming;
mod recommend;
mod store;
mod token;

use crate::analysis::{AnalysisResult, VibeNamer, validate_name, write_back};
use crate::client::{SpotifyClient, extract_spotify_id};
use crate::config::{Config, SpotifyAuth, load_config};
use crate::error::AnalysisError;
use crate::naming::{GeminiNamer, NAME_COUNT};
use crate::recommend::{RecommendationRequest, RecommendationStrategy, resolve_seed_track};
use crate::store::AnalysisStore;
use crate::token::{ClientCredentials, CredentialProvider, StaticToken, SystemClock, TokenCache};

#[derive(Parser)]
#[command(name = "mood-muse")]
#[command(about = "Detects the vibe of a Spotify playlist and proposes new names for it")]
#[command(version)]
struct Args {
    /// Enable debug mode - print results only, never store or rename anything
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Quiet mode - only warnings and errors in the log
    #[arg(short = 'q', long = "quiet", global = true)]
    quiet: bool,

    /// Verbose mode - log every request
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List playlists you own or collaborate on
    List,

    /// Analyze a playlist and propose new names for it
    Analyze {
        /// Playlist id, URL or URI
        playlist: String,

        /// Rename the playlist to this candidate (1-based)
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Rename a playlist
    Rename {
        /// Playlist id, URL or URI
        playlist: String,

        /// New playlist name
        name: String,

        /// Vibe label to mention in the description
        #[arg(long)]
        vibe: Option<String>,
    },

    /// Show stored analyses of a playlist
    History {
        /// Playlist id, URL or URI
        playlist: String,
    },

    /// Suggest tracks similar to a seed track
    Recommend {
        /// Track id, URL, URI or search text
        seed: String,

        /// 0-100, above 50 pushes energy and danceability up
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
        chaos: u32,

        /// 0-100, above 50 favours less popular tracks
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(0..=100))]
        underground: u32,

        /// Darker, more intense picks
        #[arg(long)]
        villain: bool,

        /// Softer, more acoustic picks
        #[arg(long)]
        feminine: bool,
    },
}

fn init_logging(args: &Args) {
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn credentials(config: &Config, agent: &ureq::Agent) -> Box<dyn CredentialProvider> {
    match &config.spotify_auth {
        SpotifyAuth::AccessToken(token) => Box::new(StaticToken::new(token.clone())),
        SpotifyAuth::ClientCredentials {
            client_id,
            client_secret,
        } => {
            log::debug!("Using client-credentials grant");
            let source = ClientCredentials::new(
                agent.clone(),
                config.spotify_accounts_base.clone(),
                client_id.clone(),
                client_secret.clone(),
            );
            Box::new(TokenCache::new(source, SystemClock))
        }
    }
}

/// Resolve a user-supplied id, URL or URI
fn resolve_id(input: &str, kind: &str) -> Result<String> {
    extract_spotify_id(input, kind)
        .ok_or_else(|| anyhow::anyhow!("'{input}' is not a valid Spotify {kind} id, URL or URI"))
}

/// A failure already shown to the user. The cause detail is only in the log.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Reported(&'static str);

/// Log the detail, show the user the short message
fn report(e: AnalysisError) -> anyhow::Error {
    log::error!("{e}");
    let reported = Reported(e.user_message());
    eprintln!("✗ {reported}");
    anyhow::Error::new(reported)
}

fn print_result(result: &AnalysisResult) {
    let info = &result.playlist_info;
    let v = &result.aggregate_vector;

    println!("\n{}", info.name);
    println!("{}", "=".repeat(info.name.chars().count()));
    println!(
        "   Tracks: {} ({} analyzed)",
        info.total_tracks, v.track_count
    );
    if let Some(image) = &info.image {
        println!("   Cover: {image}");
    }

    println!("\n📊 Audio Profile:");
    println!(
        "   Tempo: {:.0} BPM | Energy: {:.2} | Valence: {:.2} | Danceability: {:.2}",
        v.avg_tempo, v.avg_energy, v.avg_valence, v.avg_danceability
    );
    println!(
        "   Acousticness: {:.2} | Instrumentalness: {:.2} | Speechiness: {:.2} | Loudness: {:.1} dB",
        v.avg_acousticness, v.avg_instrumentalness, v.avg_speechiness, v.avg_loudness
    );

    println!("\nVibe: {}", result.vibe_label);

    println!("\n🎵 Name ideas:");
    for (i, name) in result.generated_names.iter().enumerate() {
        println!("   {}. {name}", i + 1);
    }
}

fn list(client: &SpotifyClient) -> Result<()> {
    let playlists = client.editable_playlists().map_err(report)?;

    if playlists.is_empty() {
        println!("No editable playlists found.");
        return Ok(());
    }

    println!("Found {} editable playlists:\n", playlists.len());
    for playlist in &playlists {
        println!(
            "- {} ({} tracks) | ID: {}",
            playlist.name, playlist.total_tracks, playlist.id
        );
    }
    Ok(())
}

fn analyze(
    args: &Args,
    config: &Config,
    client: &SpotifyClient,
    namer: &GeminiNamer,
    playlist: &str,
    pick: Option<usize>,
) -> Result<()> {
    let playlist_id = resolve_id(playlist, "playlist")?;

    if let Some(n) = pick {
        if !(1..=NAME_COUNT).contains(&n) {
            return Err(anyhow::anyhow!("--pick must be between 1 and {NAME_COUNT}"));
        }
    }

    let store = if args.debug {
        None
    } else {
        Some(AnalysisStore::open(Path::new(&config.database_path)).map_err(report)?)
    };

    println!("Analyzing playlist {playlist_id}...");
    let result = VibeNamer::new(client, namer, store.as_ref())
        .run(&playlist_id)
        .map_err(report)?;

    print_result(&result);

    if args.debug {
        println!("\n🔍 DEBUG MODE: analysis not stored");
    }

    let Some(n) = pick else {
        return Ok(());
    };
    let new_name = &result.generated_names[n - 1];

    if args.debug {
        println!(
            "🔍 DEBUG MODE: would rename '{}' to '{new_name}'",
            result.playlist_info.name
        );
        return Ok(());
    }

    write_back(
        client,
        &playlist_id,
        new_name,
        Some(result.vibe_label.as_str()),
    )
    .map_err(report)?;
    println!("\n✓ Renamed '{}' to '{new_name}'", result.playlist_info.name);
    Ok(())
}

fn rename(
    args: &Args,
    client: &SpotifyClient,
    playlist: &str,
    name: &str,
    vibe: Option<&str>,
) -> Result<()> {
    let playlist_id = resolve_id(playlist, "playlist")?;
    let name = validate_name(name).map_err(report)?;

    if args.debug {
        println!(
            "🔍 DEBUG MODE: would rename {playlist_id} to '{name}' with description: {}",
            analysis::rename_description(vibe)
        );
        return Ok(());
    }

    let update = write_back(client, &playlist_id, name, vibe).map_err(report)?;
    println!("✓ Renamed {playlist_id} to '{}'", update.name);
    Ok(())
}

fn history(config: &Config, playlist: &str) -> Result<()> {
    let playlist_id = resolve_id(playlist, "playlist")?;
    let store = AnalysisStore::open(Path::new(&config.database_path)).map_err(report)?;
    let rows = store.history(&playlist_id).map_err(report)?;

    if rows.is_empty() {
        println!("No stored analyses for {playlist_id}.");
        return Ok(());
    }

    println!("{} stored analyses for {playlist_id}:", rows.len());
    for row in &rows {
        println!(
            "\n#{} | {} | {}",
            row.id,
            row.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            row.vibe_label
        );
        println!(
            "   Tempo: {:.0} BPM | Energy: {:.2} | Valence: {:.2} | Tracks: {}",
            row.aggregate_vector.avg_tempo,
            row.aggregate_vector.avg_energy,
            row.aggregate_vector.avg_valence,
            row.aggregate_vector.track_count
        );
        println!("   Names: {}", row.generated_names.join(" / "));
    }
    Ok(())
}

fn recommend(
    client: &SpotifyClient,
    seed: &str,
    chaos: u32,
    underground: u32,
    villain: bool,
    feminine: bool,
) -> Result<()> {
    let seed_id = resolve_seed_track(client, seed).map_err(report)?;
    let request = RecommendationRequest::new(seed_id, chaos, underground, villain, feminine);

    let outcome = RecommendationStrategy::default()
        .recommend(client, &request)
        .map_err(report)?;

    println!(
        "Found {} tracks via {} ({}):\n",
        outcome.tracks.len(),
        outcome.source,
        request.tag
    );
    for (i, track) in outcome.tracks.iter().enumerate() {
        println!(
            "   {}. \"{}\" by {} | {}% match | ID: {}",
            i + 1,
            track.name,
            track.artist,
            track.similarity,
            track.id
        );
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    // Load configuration from .env
    let config = load_config()?;

    let agent = ureq::AgentBuilder::new()
        .timeout(config.http_timeout)
        .build();
    let client = SpotifyClient::new(
        agent.clone(),
        config.spotify_api_base.clone(),
        credentials(&config, &agent),
    );

    match &args.command {
        Command::List => list(&client),
        Command::Analyze { playlist, pick } => {
            let namer = GeminiNamer::new(
                agent.clone(),
                config.gemini_api_base.clone(),
                config.gemini_model.clone(),
                config.gemini_api_key.clone(),
            );
            analyze(args, &config, &client, &namer, playlist, *pick)
        }
        Command::Rename {
            playlist,
            name,
            vibe,
        } => rename(args, &client, playlist, name, vibe.as_deref()),
        Command::History { playlist } => history(&config, playlist),
        Command::Recommend {
            seed,
            chaos,
            underground,
            villain,
            feminine,
        } => recommend(&client, seed, *chaos, *underground, *villain, *feminine),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !e.is::<Reported>() {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
