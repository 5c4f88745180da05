use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use twdl_core::{
    collect_targets, parse_archive, render_archive_script, select_by_date_range, AppConfig,
    BatchSummary, DateRange, SelectionStats,
};
use twdl_engine::{
    connect, AtomicFileWriter, BatchWalker, ChannelStatusSink, ColorCategorizer, ConfigStore,
    HostSettings, HttpPageHost, PageProbe, TokioClock, WalkerSettings,
};
use twdl_logging::{twdl_info, twdl_warn};

use crate::progress::spawn_printer;

/// Walk every archive in turn. Stops at the first archive whose batch was
/// aborted or cancelled.
pub fn download(config: &AppConfig, archives: &[PathBuf]) -> Result<Vec<BatchSummary>> {
    let runtime = tokio::runtime::Runtime::new().context("cannot start the async runtime")?;
    runtime.block_on(download_all(config, archives))
}

async fn download_all(config: &AppConfig, archives: &[PathBuf]) -> Result<Vec<BatchSummary>> {
    let host = HttpPageHost::new(HostSettings::from(&config.webview))
        .context("cannot set up the page host")?;
    let bridge = connect(host, PageProbe::new());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                twdl_warn!("interrupted, finishing the current item");
                cancel.cancel();
            }
        }
    });

    let (tx, rx) = mpsc::channel();
    let printer = spawn_printer(rx);
    let sink = ChannelStatusSink::new(tx);
    let settings = WalkerSettings {
        destination: config.destination_directory.clone(),
        timer: config.timer,
    };

    let mut summaries = Vec::with_capacity(archives.len());
    for archive in archives {
        let text = fs::read_to_string(archive)
            .with_context(|| format!("cannot read {}", archive.display()))?;
        let entries =
            parse_archive(&text).with_context(|| format!("cannot parse {}", archive.display()))?;
        let targets = collect_targets(&entries);
        twdl_info!(
            "{}: {} tweet link(s) in {} message(s)",
            archive.display(),
            targets.count,
            targets.messages.len()
        );

        let summary = BatchWalker::new(&bridge, &TokioClock, &sink, settings.clone())
            .with_cancellation(cancel.clone())
            .run(&targets)
            .await
            .with_context(|| format!("batch for {} failed", archive.display()))?;
        let completed = summary.completed();
        summaries.push(summary);
        if !completed {
            break;
        }
    }

    drop(sink);
    let _ = printer.join();
    Ok(summaries)
}

pub fn select(archive: &Path, range: &DateRange, out: &Path) -> Result<SelectionStats> {
    let text = fs::read_to_string(archive)
        .with_context(|| format!("cannot read {}", archive.display()))?;
    let entries =
        parse_archive(&text).with_context(|| format!("cannot parse {}", archive.display()))?;
    let (selected, stats) = select_by_date_range(entries, range.since(), range.until(), Utc::now());

    let script = render_archive_script(&selected).context("cannot render the selection")?;
    let file_name = out
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} is not a file path", out.display()))?;
    let dir = match out.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    AtomicFileWriter::new(dir)
        .write(file_name, script)
        .with_context(|| format!("cannot write {}", out.display()))?;
    twdl_info!(
        "selected {}/{} conversation(s), {}/{} message(s) into {}",
        stats.conversations_kept,
        stats.conversations_total,
        stats.messages_kept,
        stats.messages_total,
        out.display()
    );
    Ok(stats)
}

pub fn categorize(config: &AppConfig) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let printer = spawn_printer(rx);
    let sink = ChannelStatusSink::new(tx);
    let summary = ColorCategorizer::new(&config.destination_directory, &sink)
        .with_development_mode(config.development_mode)
        .run()
        .context("colour categorisation failed")?;
    drop(sink);
    let _ = printer.join();
    println!(
        "{} of {} file(s) sorted into {} folder(s)",
        summary.categorized,
        summary.scanned,
        summary.buckets.len()
    );
    Ok(())
}

pub fn show_config(store: &ConfigStore, config: &AppConfig, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        store
            .save(config)
            .with_context(|| format!("cannot save {}", store.path().display()))?;
        println!("saved to {}", store.path().display());
    }
    Ok(())
}

pub fn report(summary: &BatchSummary) {
    println!(
        "{}/{} tweet(s) processed: {} with media, {} file(s) saved, {} download failure(s), {} skipped, {} timed out",
        summary.processed,
        summary.count,
        summary.found,
        summary.downloaded,
        summary.download_failures,
        summary.skipped,
        summary.timed_out
    );
    if let Some(reason) = &summary.aborted {
        println!("aborted: {reason}");
    }
    if summary.cancelled {
        println!("cancelled");
    }
}
