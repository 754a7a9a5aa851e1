//! Verify every site and emit diagnostics.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use treewiki_core::{Config, Diagnostic, DiagnosticSeverity, RenderError, Site};

#[derive(Serialize)]
struct SiteDiagnostic<'a> {
    site: &'a str,
    #[serde(flatten)]
    diagnostic: Diagnostic,
}

#[derive(Serialize)]
struct VerificationSummary<'a> {
    sites: usize,
    pages: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    diagnostics: Vec<SiteDiagnostic<'a>>,
}

/// Parse and render every page without writing output, then report findings
pub fn verify_sites(config_path: &Path, json: bool) -> Result<()> {
    let config = Config::from_file(config_path).context("Failed to load configuration")?;

    let mut pages = 0;
    let mut diagnostics = Vec::new();
    for site_config in &config.sites {
        let site = Site::load(site_config)
            .with_context(|| format!("Failed to load site '{}'", site_config.name))?;
        let renderer = site.renderer();

        for id in site.tree().traverse() {
            pages += 1;
            if let Err(RenderError::UnknownCategory { page, code, fragment }) = renderer.render(id)
            {
                diagnostics.push(SiteDiagnostic {
                    site: &site_config.name,
                    diagnostic: Diagnostic::error(
                        "render.unknown-category",
                        format!("Unknown block category '[{}]' in {:?}", code, fragment),
                    )
                    .with_page(page),
                });
            }
        }

        diagnostics.extend(site.diagnostics().iter().cloned().map(|diagnostic| SiteDiagnostic {
            site: &site_config.name,
            diagnostic,
        }));
    }

    let count = |severity: DiagnosticSeverity| {
        diagnostics
            .iter()
            .filter(|d| d.diagnostic.severity == severity)
            .count()
    };
    let errors = count(DiagnosticSeverity::Error);
    let warnings = count(DiagnosticSeverity::Warning);
    let infos = count(DiagnosticSeverity::Info);

    let summary = VerificationSummary {
        sites: config.sites.len(),
        pages,
        errors,
        warnings,
        infos,
        diagnostics,
    };

    if json {
        let payload = serde_json::to_string_pretty(&summary)?;
        println!("{}", payload);
    } else {
        println!(
            "Verification complete: {} sites, {} pages, {} errors, {} warnings, {} info",
            summary.sites, summary.pages, summary.errors, summary.warnings, summary.infos
        );
        for entry in &summary.diagnostics {
            let diag = &entry.diagnostic;
            let page = diag
                .page
                .as_deref()
                .map(|p| format!(" [{}]", p))
                .unwrap_or_default();
            let line = diag
                .line
                .map(|l| format!(" (line {})", l))
                .unwrap_or_default();
            println!(
                "- {} {} {}{}{}: {}",
                diag.severity.as_str(),
                entry.site,
                diag.code,
                page,
                line,
                diag.message
            );
        }
    }

    Ok(())
}
