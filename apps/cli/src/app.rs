//! Pipeline stages run by the CLI.

use std::fmt::Write as _;
use std::path::Path;

use assetdeploy_planner::UploadOutcome;
use assetdeploy_plugin::{
    DeployContext, DeployPlugin, FINGERPRINT_ENV, UploadHookResult, scan_dist_dir,
};
use chrono::Utc;
use tracing::{debug, info};

use crate::cli::{Cli, Command, UploadArgs};
use crate::config::FileConfig;
use crate::state;

/// Runs the selected subcommand to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let file = FileConfig::load(&cli.config)?;
    let plugin = DeployPlugin::default();

    match cli.command {
        Command::Prepare => {
            let mut ctx = file.into_context(&cli.credentials, None);
            plugin.configure(&ctx)?;
            let prefix = prepare(&plugin, &mut ctx, &cli.state)?;
            println!("{FINGERPRINT_ENV}={prefix}");
        }
        Command::Upload(args) => {
            let mut ctx = file.into_context(&cli.credentials, args.dist_dir.clone());
            plugin.configure(&ctx)?;
            restore_state(&mut ctx, &cli.state)?;
            upload(&plugin, &mut ctx, &cli.state, &args).await?;
        }
        Command::Deploy(args) => {
            let mut ctx = file.into_context(&cli.credentials, args.dist_dir.clone());
            plugin.configure(&ctx)?;
            prepare(&plugin, &mut ctx, &cli.state)?;
            upload(&plugin, &mut ctx, &cli.state, &args).await?;
        }
    }

    Ok(())
}

/// Pre-build stage: computes the prefix and persists the context state.
fn prepare(plugin: &DeployPlugin, ctx: &mut DeployContext, state_path: &Path) -> anyhow::Result<String> {
    let prefix = plugin.will_build(ctx, Utc::now());
    state::save(state_path, &ctx.state())?;
    Ok(prefix)
}

async fn upload(
    plugin: &DeployPlugin,
    ctx: &mut DeployContext,
    state_path: &Path,
    args: &UploadArgs,
) -> anyhow::Result<()> {
    ensure_dist_files(ctx)?;
    let result = plugin.upload(ctx).await?;
    state::save(state_path, &ctx.state())?;
    print!("{}", render_report(&result, args.json)?);
    Ok(())
}

/// Applies the state left by an earlier `prepare` run, if any.
fn restore_state(ctx: &mut DeployContext, state_path: &Path) -> anyhow::Result<()> {
    match state::load(state_path)? {
        Some(saved) => {
            debug!(folder = %saved.folder, "restoring deploy state");
            ctx.apply_state(saved);
        }
        None => info!(path = %state_path.display(), "no deploy state found, uploading without prepare"),
    }
    Ok(())
}

/// Fills in the file list by scanning the output directory when none was given.
fn ensure_dist_files(ctx: &mut DeployContext) -> anyhow::Result<()> {
    if !ctx.resolved_dist_files().is_empty() {
        return Ok(());
    }
    let dist_dir = ctx.resolved_dist_dir();
    ctx.dist_files = scan_dist_dir(&dist_dir)?;
    debug!(dist_dir = %dist_dir.display(), files = ctx.dist_files.len(), "scanned build output");
    Ok(())
}

fn render_report(result: &UploadHookResult, json: bool) -> anyhow::Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(result)?;
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    let mut failed = 0;
    for outcome in &result.files_uploaded {
        match outcome {
            UploadOutcome::Uploaded { path, url, .. } => writeln!(out, "uploaded {path} -> {url}")?,
            UploadOutcome::Failed { path, error } => {
                failed += 1;
                writeln!(out, "failed   {path}: {error}")?;
            }
        }
    }
    let total = result.files_uploaded.len();
    writeln!(out, "{} uploaded, {failed} failed", total - failed)?;
    Ok(out)
}
