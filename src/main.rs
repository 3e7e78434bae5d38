//! Paperdesk - academic paper editor
//!
//! Markdown editing with debounced commits, preview, formatting commands
//! and a hosted backend for accounts, settings and papers.

mod app;
mod backend;
mod core;
mod ui;

use anyhow::Context;
use app::PaperdeskApp;
use backend::memory::InMemoryBackend;
use backend::supabase::SupabaseClient;
use backend::Backend;
use crate::core::config::AppConfig;
use eframe::egui;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Paperdesk...");

    let config = AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Using default config: {:#}", e);
        AppConfig::default()
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("paperdesk-io")
        .build()
        .context("Failed to start async runtime")?;
    let _guard = runtime.enter();

    let backend = match SupabaseClient::from_config(&config.backend) {
        Some(client) => {
            tracing::info!("Using hosted backend at {}", client.base_url());
            Backend::Supabase(client)
        }
        None => {
            tracing::info!("No backend configured, using a local in-memory backend");
            Backend::Memory(InMemoryBackend::new())
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("Paperdesk"),
        ..Default::default()
    };

    let handle = runtime.handle().clone();
    eframe::run_native(
        "Paperdesk",
        native_options,
        Box::new(move |cc| Ok(Box::new(PaperdeskApp::new(cc, handle, backend, config)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))
}
