pub mod slot;
pub mod state;

use image::GrayImage;
use platewatch_common::config::Config;
use platewatch_common::message::NotificationMessage;
use platewatch_common::plate::{join_fragments, PlateRecord, Region};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::capture::FrameSource;
use crate::detector::{DetectorParams, RegionDetector};
use crate::filter::area::MinAreaFilter;
use crate::filter::sampler::FrameSampler;
use crate::filter::traits::RegionFilter;
use crate::frame::{crop_gray, Frame};
use crate::notify::NotificationClient;
use crate::preview::Preview;
use crate::recognizer::TextRecognizer;
use crate::storage::ArtifactStore;

use slot::SlotProvider;
use state::{ControllerState, RunSummary, StopReason};

/// Run-wide constants for the capture loop.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub frame_skip: u64,
    pub min_area: u64,
    pub detector: DetectorParams,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame_skip: config.sampling.frame_skip,
            min_area: config.detector.min_area,
            detector: DetectorParams::from_config(&config.detector),
        }
    }
}

/// Drives capture -> sample -> detect -> filter -> recognize -> persist ->
/// notify, one sampled frame at a time, on a single task.
///
/// Owns the frame counter and the sequence-id counter; both start at zero
/// for every controller instance.
pub struct PipelineController {
    source: Box<dyn FrameSource>,
    detector: Box<dyn RegionDetector>,
    recognizer: Box<dyn TextRecognizer>,
    region_filter: Box<dyn RegionFilter>,
    store: ArtifactStore,
    notifier: NotificationClient,
    slots: Box<dyn SlotProvider>,
    preview: Option<Preview>,
    sampler: FrameSampler,
    params: DetectorParams,
    next_sequence_id: u64,
    state: ControllerState,
    summary: RunSummary,
}

impl PipelineController {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn RegionDetector>,
        recognizer: Box<dyn TextRecognizer>,
        store: ArtifactStore,
        notifier: NotificationClient,
        slots: Box<dyn SlotProvider>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            detector,
            recognizer,
            region_filter: Box::new(MinAreaFilter::new(settings.min_area)),
            store,
            notifier,
            slots,
            preview: None,
            sampler: FrameSampler::new(settings.frame_skip),
            params: settings.detector,
            next_sequence_id: 0,
            state: ControllerState::Init,
            summary: RunSummary::default(),
        }
    }

    pub fn with_preview(mut self, preview: Preview) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Run the capture loop until capture fails or `shutdown` turns `true`.
    ///
    /// The shutdown flag is only looked at between iterations, never while a
    /// frame is being processed. The controller cannot be run twice.
    pub async fn run(
        &mut self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, ControllerError> {
        if self.state != ControllerState::Init {
            return Err(ControllerError::NotRestartable(self.state));
        }

        self.transition(ControllerState::Running);
        info!(
            source = self.source.name(),
            detector = self.detector.name(),
            recognizer = self.recognizer.name(),
            filter = self.region_filter.name(),
            "entering capture loop"
        );

        let reason = loop {
            if *shutdown.borrow() {
                break StopReason::Interrupted;
            }

            let Some(frame) = self.source.next_frame().await else {
                warn!(
                    frames_captured = self.summary.frames_captured,
                    "failed to read from the camera"
                );
                break StopReason::CaptureFailure;
            };
            self.summary.frames_captured += 1;

            if !self.sampler.admit() {
                continue;
            }
            self.summary.frames_processed += 1;
            self.process_frame(&frame).await;
        };

        info!(?reason, "stopping capture loop");
        self.transition(ControllerState::Stopping);
        self.source.release();
        self.transition(ControllerState::Stopped);

        self.summary.stop_reason = Some(reason);
        Ok(self.summary.clone())
    }

    fn transition(&mut self, next: ControllerState) {
        info!(from = %self.state, to = %next, "controller state change");
        self.state = next;
    }

    async fn process_frame(&mut self, frame: &Frame) {
        let gray = frame.grayscale();

        let detected = match self.detector.detect(&gray, &self.params) {
            Ok(regions) => regions,
            Err(e) => {
                warn!(error = %e, ts = frame.captured_at_ms, "region detection failed, skipping frame");
                return;
            }
        };

        let detected_count = detected.len();
        let candidates: Vec<Region> = detected
            .into_iter()
            .filter(|region| self.region_filter.accept(region))
            .collect();
        debug!(
            counter = self.sampler.counter(),
            ts = frame.captured_at_ms,
            detected = detected_count,
            accepted = candidates.len(),
            "frame processed by detector"
        );

        if let Some(preview) = &self.preview {
            preview.render(&frame.image, &candidates);
        }

        for region in candidates {
            self.summary.regions_accepted += 1;
            self.process_region(frame, &gray, region).await;
        }
    }

    async fn process_region(&mut self, frame: &Frame, gray: &GrayImage, region: Region) {
        let Some(bounds) = region.clamp_to(gray.width(), gray.height()) else {
            warn!(?region, "region lies outside the frame, skipping");
            self.summary.regions_skipped += 1;
            return;
        };

        let fragments = match self.recognizer.recognize(&crop_gray(gray, &bounds)).await {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, ?region, "text recognition failed, skipping region");
                self.summary.regions_skipped += 1;
                return;
            }
        };

        let record = PlateRecord::new(join_fragments(&fragments), region, self.next_sequence_id);
        self.next_sequence_id += 1;

        if let Err(e) = self
            .store
            .persist(record.sequence_id, &frame.crop(&bounds), &record.text)
            .await
        {
            error!(error = %e, seq = record.sequence_id, "failed to persist plate artifacts");
            self.summary.persist_failures += 1;
        }
        self.summary.records_persisted += 1;
        info!(seq = record.sequence_id, text = record.text, "detected plate text");

        if !record.is_announceable() {
            return;
        }
        let slot = self.slots.slot_for(&record);
        if let Some(message) = NotificationMessage::for_record(&record, slot) {
            if self.notifier.notify(&message).await {
                self.summary.notifications_sent += 1;
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("controller cannot run from state {0}; it is not restartable")]
    NotRestartable(ControllerState),
}
