//!
//! drivepress_invoke: single-event entry point
//! ----------------------------------------
//! Reads one trigger-shaped JSON event (file or stdin), runs it through the same
//! handler the HTTP server uses and prints the trigger-shaped JSON response on
//! stdout. Serverless runtimes that speak stdin/stdout, and local debugging of a
//! captured event, both go through here.

use std::env;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use drivepress::config::AppConfig;
use drivepress::drive::MemoryDrive;
use drivepress::handler::{handle_event, AppState, TriggerEvent, TriggerResponse};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--event <file>] [--fixture <file>] [--pretty]\n\nFlags:\n  --event <file>     Trigger event JSON (default: read from stdin)\n  --fixture <file>   Serve from a local fixture instead of Drive (overrides DRIVEPRESS_FIXTURE)\n  --pretty           Pretty-print the response\n  -h, --help         Show this help\n\nConfiguration is read from $DRIVEPRESS_CONFIG and DRIVEPRESS_* variables, as for the server."
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the response, so logs go to stderr
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("building log filter")?;
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("drivepress_invoke");

    let mut event_path: Option<PathBuf> = None;
    let mut fixture: Option<PathBuf> = None;
    let mut pretty = false;

    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--event" => { i += 1; event_path = args.get(i).map(PathBuf::from); }
            "--fixture" => { i += 1; fixture = args.get(i).map(PathBuf::from); }
            "--pretty" => { pretty = true; }
            "-h" | "--help" => { print_usage(program); return Ok(()); }
            other => { print_usage(program); return Err(anyhow!("unknown argument: {other}")); }
        }
        i += 1;
    }

    let raw = match &event_path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("reading event {}", p.display()))?,
        None => {
            let mut s = String::new();
            io::stdin().read_to_string(&mut s).context("reading event from stdin")?;
            s
        }
    };
    let event: TriggerEvent = serde_json::from_str(&raw).context("parsing trigger event")?;

    let mut cfg = AppConfig::load()?;
    if fixture.is_some() {
        cfg.drive.fixture_path = fixture;
    }

    let response = match &cfg.drive.fixture_path {
        Some(path) => {
            let backend = MemoryDrive::from_fixture_file(path)?;
            let state = AppState::new(backend, cfg.access.clone(), cfg.resolver.clone()).with_cache_control(cfg.cache_control.clone());
            handle_event(&state, &event).await
        }
        None => {
            let backend = cfg.drive.build_client()?;
            let state = AppState::new(backend, cfg.access.clone(), cfg.resolver.clone()).with_cache_control(cfg.cache_control.clone());
            handle_event(&state, &event).await
        }
    };

    write_response(&response, pretty)
}

fn write_response(resp: &TriggerResponse, pretty: bool) -> Result<()> {
    let text = if pretty { serde_json::to_string_pretty(resp)? } else { serde_json::to_string(resp)? };
    let mut out = io::stdout().lock();
    writeln!(out, "{text}")?;
    out.flush()?;
    Ok(())
}
