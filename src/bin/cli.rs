//! CLI entry point for arcade-pilot

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arcade_pilot::clock::SystemClock;
use arcade_pilot::coordinator::CoordinatorRegistry;
use arcade_pilot::decision::DecisionStep;
use arcade_pilot::frame_source::MockFrameSource;
use arcade_pilot::llm::{FakeChatModel, HttpVisionModel, VisionChatModel};
use arcade_pilot::memory::MemoryStore;
use arcade_pilot::persistence::{InMemoryBlob, InMemoryKv};
use arcade_pilot::server::{build_router, ServeState};
use arcade_pilot::utils::signal::SignalHandler;
use arcade_pilot::Config;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "arcade-pilot")]
#[command(about = "Vision-model-driven decision loop for emulator agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Serve the HTTP decision/heartbeat/state surface")]
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        addr: String,

        #[arg(long, help = "Use the scripted fake model instead of a real provider")]
        fake_model: bool,
    },

    #[command(about = "Run a fixed number of decision iterations against the mock frame source")]
    Demo {
        #[arg(help = "Agent id to drive")]
        agent_id: String,

        #[arg(long, default_value = "gpt-4o")]
        model_id: String,

        #[arg(long, default_value = "10")]
        iterations: u32,
    },
}

fn build_model(config: &Config, fake_model: bool) -> Arc<dyn VisionChatModel> {
    if fake_model {
        Arc::new(FakeChatModel::scripted(config.model.default_model.clone(), Vec::new()))
    } else {
        Arc::new(HttpVisionModel::new(
            config.model.default_model.clone(),
            config.model.base_url.clone(),
            config.model.api_key.clone(),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    arcade_pilot::init();

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::from_env(),
    };

    match cli.command {
        Commands::Serve { addr, fake_model } => {
            info!("starting arcade-pilot on {addr}");

            let clock = Arc::new(SystemClock);
            let kv = Arc::new(InMemoryKv::new());
            let blob = Arc::new(InMemoryBlob::new());
            let memory = Arc::new(MemoryStore::new(kv.clone()));
            let frame_source = Arc::new(MockFrameSource::changing());
            let model = build_model(&config, fake_model);
            let decision_step = Arc::new(DecisionStep::new(
                model,
                memory.clone(),
                Duration::from_secs(config.model.screen_type_timeout_secs),
                Duration::from_secs(config.model.decision_timeout_secs),
            ));

            let registry = Arc::new(CoordinatorRegistry::new(
                clock.clone(),
                kv.clone(),
                blob.clone(),
                memory.clone(),
                frame_source,
                decision_step,
                config.loop_.clone(),
            ));

            let registry_for_drain = registry.clone();
            let serve_state = ServeState::new(registry, kv, blob, memory, Arc::new(config), clock);
            serve_state.health.mark_live();
            serve_state.health.mark_ready();

            let router = build_router(serve_state);
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            let signals = SignalHandler::new();
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    signals.wait_for_shutdown().await;
                    info!("shutdown requested, letting in-flight requests finish");
                })
                .await?;

            info!("draining {} registered agent(s)", registry_for_drain.len());
            for coordinator in registry_for_drain.all() {
                coordinator.cancellation_token().cancel();
                let agent = coordinator.snapshot().await;
                if let Err(err) = coordinator.save_checkpoint(&agent).await {
                    tracing::warn!(agent_id = %agent.id, error = %err, "checkpoint on shutdown failed");
                }
            }
        }

        Commands::Demo {
            agent_id,
            model_id,
            iterations,
        } => {
            let clock = Arc::new(SystemClock);
            let kv = Arc::new(InMemoryKv::new());
            let blob = Arc::new(InMemoryBlob::new());
            let memory = Arc::new(MemoryStore::new(kv.clone()));
            let frame_source = Arc::new(MockFrameSource::changing());
            let model = build_model(&config, true);
            let decision_step = Arc::new(DecisionStep::new(
                model,
                memory.clone(),
                Duration::from_secs(config.model.screen_type_timeout_secs),
                Duration::from_secs(config.model.decision_timeout_secs),
            ));

            let registry = CoordinatorRegistry::new(
                clock,
                kv,
                blob,
                memory,
                frame_source,
                decision_step,
                config.loop_.clone(),
            );

            let coordinator = registry.get_or_create(&agent_id, &model_id);
            for step in 1..=iterations {
                let outcome = coordinator.run_iteration().await?;
                println!(
                    "step {step}/{iterations}: pressed {:?} (confidence {:.2})",
                    outcome.decision.button, outcome.decision.confidence
                );
                tokio::time::sleep(outcome.cooldown).await;
            }

            let agent = coordinator.snapshot().await;
            println!(
                "\n{} decisions, total cost ${:.4}",
                agent.total_decisions, agent.total_cost
            );
        }
    }

    Ok(())
}
