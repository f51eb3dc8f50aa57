//! Run command implementation.

use crate::catalog::{self, Product, ProductHistory};
use crate::script::{self, Step};
use retrace_core::{Config, CoreError, CoreResult, HistoryContext};
use retrace_store::InMemoryStore;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use tracing::{debug, info};

/// Result of one script step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    /// 1-based position in the script.
    pub index: usize,
    /// Operation name.
    pub op: &'static str,
    /// Product id.
    pub id: i64,
    /// What happened.
    pub outcome: String,
    /// History rows written.
    pub history_written: usize,
    /// Rejection message, if the step was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One numbered version of a product.
#[derive(Debug, Serialize)]
pub struct VersionReport {
    /// 1-based version.
    pub version: u32,
    /// The recorded row.
    #[serde(flatten)]
    pub history: ProductHistory,
}

/// Final state and history of one product.
#[derive(Debug, Serialize)]
pub struct ProductReport {
    /// Product id.
    pub id: i64,
    /// Live state, if the product exists.
    pub live: Option<Product>,
    /// Recorded versions, oldest first.
    pub versions: Vec<VersionReport>,
}

/// Result of running a script.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Per-step results.
    pub steps: Vec<StepReport>,
    /// Every product touched by the script.
    pub products: Vec<ProductReport>,
}

/// Runs the run command.
pub fn run(path: &Path, config: Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let steps = script::load(path)?;
    info!(path = %path.display(), steps = steps.len(), "running script");
    let summary = execute(&steps, config)?;
    print(&summary, format)
}

/// Prints a summary in the requested format (text, json).
pub fn print(summary: &RunSummary, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(summary)?),
        _ => print!("{}", render_text(summary)),
    }
    Ok(())
}

/// Executes steps against a fresh in-memory catalog.
///
/// Steps that name a missing product or version are reported and skipped;
/// any other error stops the run.
pub fn execute(steps: &[Step], config: Config) -> CoreResult<RunSummary> {
    let ctx = HistoryContext::new(InMemoryStore::new(), catalog::registry()?, config)?;

    let mut reports = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let report = match apply(&ctx, step) {
            Ok((outcome, history_written)) => StepReport {
                index: index + 1,
                op: step.name(),
                id: step.product_id(),
                outcome,
                history_written,
                error: None,
            },
            Err(e @ (CoreError::EntityNotFound { .. } | CoreError::VersionNotFound { .. })) => {
                debug!(step = index + 1, error = %e, "step rejected");
                StepReport {
                    index: index + 1,
                    op: step.name(),
                    id: step.product_id(),
                    outcome: "rejected".to_string(),
                    history_written: 0,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => return Err(e),
        };
        reports.push(report);
    }

    let ids: BTreeSet<i64> = steps.iter().map(Step::product_id).collect();
    let mut products = Vec::with_capacity(ids.len());
    for id in ids {
        let versions = ctx
            .list_versions::<Product>(&id)?
            .into_iter()
            .map(|v| VersionReport {
                version: v.version,
                history: v.record,
            })
            .collect();
        products.push(ProductReport {
            id,
            live: ctx.get::<Product>(&id)?,
            versions,
        });
    }

    Ok(RunSummary {
        steps: reports,
        products,
    })
}

fn apply(ctx: &HistoryContext<InMemoryStore>, step: &Step) -> CoreResult<(String, usize)> {
    match step {
        Step::Save(product) => {
            let report = if ctx.get::<Product>(&product.id)?.is_some() {
                ctx.update(product)?
            } else {
                ctx.insert(product)?
            };
            let outcome = if report.history_written() > 0 {
                "recorded"
            } else {
                "unchanged"
            };
            Ok((outcome.to_string(), report.history_written()))
        }
        Step::Delete { id } => {
            let report = ctx.delete::<Product>(id)?;
            Ok(("deleted".to_string(), report.history_written()))
        }
        Step::Restore { id, version } => {
            let restored = ctx.restore::<Product>(id, *version)?;
            Ok((
                restored.outcome.to_string(),
                restored.report.history_written(),
            ))
        }
    }
}

/// Renders a summary as plain text.
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Steps:");
    for step in &summary.steps {
        let _ = write!(
            out,
            "  {:>3}. {:<8} #{:<4} {}",
            step.index, step.op, step.id, step.outcome
        );
        if let Some(error) = &step.error {
            let _ = write!(out, " ({error})");
        }
        let _ = writeln!(out);
    }

    for product in &summary.products {
        let _ = writeln!(out);
        match &product.live {
            Some(live) => {
                let _ = writeln!(out, "Product #{}: {} @ {}", product.id, live.name, live.price);
            }
            None => {
                let _ = writeln!(out, "Product #{}: deleted", product.id);
            }
        }
        for version in &product.versions {
            let stamp = version
                .history
                .created_at
                .map_or_else(|| "-".to_string(), |t| t.to_rfc3339());
            let state = &version.history.state;
            let _ = writeln!(
                out,
                "  v{:<3} {:<25} {} @ {}{}",
                version.version,
                stamp,
                state.name,
                state.price,
                state
                    .description
                    .as_deref()
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default()
            );
        }
    }
    out
}
