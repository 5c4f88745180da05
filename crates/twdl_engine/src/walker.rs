use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use twdl_core::{
    BatchContext, BatchSummary, LookupOutcome, LookupSession, Resolution, SessionToken,
    StatusUpdate, TargetList, TimerSettings, TweetUrlReference,
};
use twdl_logging::{twdl_info, twdl_warn};

use crate::bridge::{BridgeClient, BridgeError};
use crate::clock::Clock;
use crate::download::DownloadPipeline;
use crate::error_log::{CsvErrorLog, RowStatus};
use crate::lookup::lookup;
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::sink::StatusSink;
use crate::EngineError;

#[derive(Debug, Clone)]
pub struct WalkerSettings {
    pub destination: PathBuf,
    pub timer: TimerSettings,
}

enum Flow {
    Continue,
    Abort(String),
}

/// Drives load, lookup and download for every tweet link of an archive,
/// strictly one URL at a time.
pub struct BatchWalker<'a> {
    bridge: &'a BridgeClient,
    clock: &'a dyn Clock,
    sink: &'a dyn StatusSink,
    timer: TimerSettings,
    writer: AtomicFileWriter,
    error_log: CsvErrorLog,
    cancel: CancellationToken,
    next_token: u64,
}

impl<'a> BatchWalker<'a> {
    pub fn new(
        bridge: &'a BridgeClient,
        clock: &'a dyn Clock,
        sink: &'a dyn StatusSink,
        settings: WalkerSettings,
    ) -> Self {
        Self {
            bridge,
            clock,
            sink,
            timer: settings.timer,
            error_log: CsvErrorLog::in_directory(&settings.destination),
            writer: AtomicFileWriter::new(settings.destination),
            cancel: CancellationToken::new(),
            next_token: 0,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn error_log(&self) -> &CsvErrorLog {
        &self.error_log
    }

    /// Walk `targets` in order. Returns early (with `aborted` set) when a page
    /// aborts; every other failure is logged and skipped.
    pub async fn run(&mut self, targets: &TargetList) -> Result<BatchSummary, EngineError> {
        ensure_output_dir(self.writer.dir())?;

        let mut ctx = BatchContext::new(targets.count);
        let mut summary = BatchSummary {
            count: targets.count,
            ..BatchSummary::default()
        };
        self.sink.emit(StatusUpdate::Count(targets.count));
        self.sink
            .status(format!("{} links to tweets found", targets.count));
        twdl_logging::set_batch_position(0, targets.count as u64);

        'walk: for message in &targets.messages {
            if ctx.enter_conversation(&message.conversation_id) {
                self.sink
                    .status(format!("conversation {}", message.conversation_id));
            }
            let created = match message.timestamp {
                Some(at) => at.to_rfc3339(),
                None => {
                    twdl_warn!(
                        "message {} has an unparsable createdAt {:?}",
                        message.id,
                        message.created_at
                    );
                    message.created_at.clone()
                }
            };
            self.sink.status(format!(
                "{} {} {} URL(s)",
                message.id,
                created,
                message.urls.len()
            ));

            for reference in &message.urls {
                if self.cancel.is_cancelled() {
                    summary.cancelled = true;
                    break 'walk;
                }
                self.sink.emit(StatusUpdate::Index(ctx.index()));
                self.sink.status(format!(
                    "{}/{} @{} {} analysing tweet",
                    ctx.index() + 1,
                    ctx.count(),
                    reference.user,
                    reference.id
                ));

                match self.visit(reference, &mut summary).await {
                    Ok(Flow::Continue) => {}
                    Ok(Flow::Abort(reason)) => {
                        summary.aborted = Some(reason);
                        break 'walk;
                    }
                    Err(err) => {
                        twdl_logging::clear_batch_position();
                        return Err(err);
                    }
                }

                let index = ctx.advance();
                summary.processed = index;
                self.sink.emit(StatusUpdate::Index(index));
                twdl_logging::set_batch_position(index as u64, ctx.count() as u64);
            }
        }

        twdl_logging::clear_batch_position();
        twdl_info!(
            "batch finished: {}/{} processed, {} found, {} downloaded, {} skipped, {} timed out{}",
            summary.processed,
            summary.count,
            summary.found,
            summary.downloaded,
            summary.skipped,
            summary.timed_out,
            summary
                .aborted
                .as_deref()
                .map(|r| format!(", aborted: {r}"))
                .unwrap_or_default()
        );
        Ok(summary)
    }

    async fn visit(
        &mut self,
        reference: &TweetUrlReference,
        summary: &mut BatchSummary,
    ) -> Result<Flow, EngineError> {
        self.next_token += 1;
        let session = LookupSession::new(
            SessionToken(self.next_token),
            self.clock.now(),
            self.timer.period(),
            self.timer.timeout(),
        );

        if let Err(err) = self.bridge.load(&reference.matched_text).await {
            return match err {
                BridgeError::View(message) => {
                    summary.skipped += 1;
                    self.fail(reference, &message)?;
                    Ok(Flow::Continue)
                }
                other => Err(other.into()),
            };
        }

        let outcome = lookup(
            self.bridge,
            self.clock,
            session,
            self.timer.initial_delay(),
            self.timer.empty_manifest,
        )
        .await?;

        match outcome {
            LookupOutcome::Aborted { reason } => {
                twdl_warn!("aborting batch: {}", reason);
                self.fail(reference, &reason)?;
                Ok(Flow::Abort(reason))
            }
            LookupOutcome::TimedOut { elapsed } => {
                summary.timed_out += 1;
                self.fail(
                    reference,
                    &format!("timeout after {} ms", elapsed.as_millis()),
                )?;
                Ok(Flow::Continue)
            }
            LookupOutcome::Resolved(Resolution::Skipped { message }) => {
                summary.skipped += 1;
                self.fail(reference, &message)?;
                Ok(Flow::Continue)
            }
            LookupOutcome::Resolved(Resolution::Found(manifest)) => {
                summary.found += 1;
                let detail = format!("{} images found", manifest.len());
                self.sink.status(detail.clone());
                self.error_log.append(
                    &reference.original_url,
                    &reference.matched_text,
                    RowStatus::Found,
                    &detail,
                )?;

                let pipeline =
                    DownloadPipeline::new(self.bridge, &self.writer, &self.error_log, self.sink)
                        .with_cancellation(self.cancel.clone());
                for record in pipeline.download(&manifest).await? {
                    if record.bytes.is_some() {
                        summary.downloaded += 1;
                    } else {
                        summary.download_failures += 1;
                    }
                }
                Ok(Flow::Continue)
            }
        }
    }

    fn fail(&self, reference: &TweetUrlReference, message: &str) -> Result<(), EngineError> {
        self.sink.status(message.to_string());
        self.error_log.append(
            &reference.original_url,
            &reference.matched_text,
            RowStatus::Failed,
            message,
        )?;
        Ok(())
    }
}
