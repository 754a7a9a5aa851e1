//! Dev server command implementation.

use super::build::build_site;
use anyhow::{Context, Result};
use axum::{response::Html, routing::get, Router};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use treewiki_core::{Config, SiteConfig};
use treewiki_render::PublishOptions;

/// Build, serve the output over HTTP and rebuild when an input changes
pub async fn dev_server(config_path: &Path, port: Option<u16>, site: Option<&str>) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    let sites: Vec<SiteConfig> = config.select(site)?.into_iter().cloned().collect();
    let port = port.unwrap_or(config.server.port);

    rebuild(config_path, site).context("Failed to build site")?;

    // Set up file watching for live rebuilds
    let watched = watched_files(config_path, &sites);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut _watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .context("Failed to initialize file watcher")?;

    let dirs: HashSet<&Path> = watched.iter().filter_map(|p| p.parent()).collect();
    for dir in dirs {
        _watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {:?}", dir))?;
    }

    tokio::spawn({
        let config_path = config_path.to_path_buf();
        let site = site.map(str::to_string);
        async move {
            while let Some(event) = rx.recv().await {
                match event {
                    Ok(ev) => {
                        // Output files land next to the inputs; only inputs count
                        if !ev.paths.iter().any(|p| watched.contains(p)) {
                            continue;
                        }
                        // Debounce a bit by draining pending events
                        while rx.try_recv().is_ok() {}
                        tracing::info!("Change detected, rebuilding...");
                        let res = tokio::task::spawn_blocking({
                            let config_path = config_path.clone();
                            let site = site.clone();
                            move || rebuild(&config_path, site.as_deref())
                        })
                        .await;

                        match res {
                            Ok(Ok(())) => tracing::info!("Rebuild complete"),
                            Ok(Err(e)) => tracing::error!("Rebuild failed: {:?}", e),
                            Err(e) => tracing::error!("Rebuild task panicked: {}", e),
                        }
                    }
                    Err(err) => tracing::warn!("Watcher error: {}", err),
                }
            }
        }
    });

    let app = router(&sites).layer(TraceLayer::new_for_http());

    tracing::info!("Starting dev server on http://localhost:{}", port);
    println!("\nServing at http://localhost:{}", port);
    println!("   Press Ctrl+C to stop\n");

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// A single site is served at the root; several sites each get a prefix
fn router(sites: &[SiteConfig]) -> Router {
    if let [only] = sites {
        return Router::new()
            .fallback_service(ServeDir::new(&only.output).append_index_html_on_directories(true));
    }

    let mut listing = String::from("<!DOCTYPE html>\n<ul>\n");
    for site in sites {
        listing.push_str(&format!(
            "<li><a href=\"/{0}/\">{0}</a></li>\n",
            site.name
        ));
    }
    listing.push_str("</ul>\n");

    let mut router = Router::new().route(
        "/",
        get(move || {
            let listing = listing.clone();
            async move { Html(listing) }
        }),
    );
    for site in sites {
        router = router.nest_service(
            &format!("/{}", site.name),
            ServeDir::new(&site.output).append_index_html_on_directories(true),
        );
    }
    router
}

fn rebuild(config_path: &Path, site: Option<&str>) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;
    for site_config in config.select(site)? {
        let report = build_site(site_config, &PublishOptions::default())?;
        tracing::info!(
            "Site '{}': {} pages",
            site_config.name,
            report.pages_written
        );
    }
    Ok(())
}

/// Every input whose change triggers a rebuild, canonicalised to match
/// watcher event paths
fn watched_files(config_path: &Path, sites: &[SiteConfig]) -> HashSet<PathBuf> {
    let mut files = vec![config_path.to_path_buf()];
    for site in sites {
        files.push(site.source.clone());
        files.push(site.template.clone());
        files.extend(site.replacements.clone());
    }
    files
        .into_iter()
        .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
        .collect()
}
