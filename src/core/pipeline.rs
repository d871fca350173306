//! Generation pipeline boundary: the external capability that fills
//! segments with produced media, and the batch driver around it.
//!
//! The generators themselves are opaque (network calls behind the
//! [`Generator`] trait); this module owns sequencing (all images, then
//! all videos), per-segment failure isolation and cooperative stop. All
//! segment state changes go through the transition table - the table is
//! also the per-segment in-flight lock, since a generating segment
//! rejects a second start.
//!
//! Progress travels over a channel ([`PipelineEvent`]) instead of
//! callback parameters, so any number of views can watch the same
//! in-flight generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::entities::analysis::{AnalysisResult, ModelError, TransitionPayload};
use crate::entities::frame::{Frame, FrameError};
use crate::entities::segment::{GenerationPhase, GenerationProgress, SegmentStatus};

/// External generation failures, per capability.
#[derive(Debug)]
pub enum GenerateError {
    Network(String),
    Model(String),
    Timeout(String),
}

impl std::fmt::Display for GenerateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerateError::Network(e) => write!(f, "Network error: {}", e),
            GenerateError::Model(e) => write!(f, "Model error: {}", e),
            GenerateError::Timeout(e) => write!(f, "Timeout: {}", e),
        }
    }
}

impl std::error::Error for GenerateError {}

/// Aspect ratios the image capability accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageAspect {
    Square,
    Portrait3x4,
    Landscape4x3,
    Portrait9x16,
    Landscape16x9,
}

impl ImageAspect {
    /// Wire name used by the external capability.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageAspect::Square => "1:1",
            ImageAspect::Portrait3x4 => "3:4",
            ImageAspect::Landscape4x3 => "4:3",
            ImageAspect::Portrait9x16 => "9:16",
            ImageAspect::Landscape16x9 => "16:9",
        }
    }

    /// Nearest supported ratio for a frame size.
    pub fn classify(width: u32, height: u32) -> Self {
        if width == 0 || height == 0 {
            return ImageAspect::Landscape16x9;
        }
        let ratio = width as f32 / height as f32;
        let candidates = [
            (ImageAspect::Square, 1.0),
            (ImageAspect::Portrait3x4, 3.0 / 4.0),
            (ImageAspect::Landscape4x3, 4.0 / 3.0),
            (ImageAspect::Portrait9x16, 9.0 / 16.0),
            (ImageAspect::Landscape16x9, 16.0 / 9.0),
        ];
        candidates
            .into_iter()
            .min_by(|a, b| {
                (a.1 - ratio)
                    .abs()
                    .partial_cmp(&(b.1 - ratio).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(aspect, _)| aspect)
            .unwrap_or(ImageAspect::Landscape16x9)
    }
}

/// The video capability supports exactly two ratios; everything is
/// coerced (portrait sources go 9:16, the rest 16:9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoAspect {
    Landscape16x9,
    Portrait9x16,
}

impl VideoAspect {
    pub fn as_str(self) -> &'static str {
        match self {
            VideoAspect::Landscape16x9 => "16:9",
            VideoAspect::Portrait9x16 => "9:16",
        }
    }

    pub fn coerce(width: u32, height: u32) -> Self {
        if height > width {
            VideoAspect::Portrait9x16
        } else {
            VideoAspect::Landscape16x9
        }
    }
}

/// Result of a two-phase image generation.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageOutput {
    pub final_image_url: String,
    pub intermediate_image_url: String,
}

/// What kind of generation a pipeline event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationKind {
    Image,
    Video,
}

/// Events emitted while a batch runs. Listeners read these to update the
/// model (see [`apply_progress_event`]) and the views.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    SegmentStarted {
        id: Uuid,
        kind: GenerationKind,
    },
    ImageProgress {
        id: Uuid,
        phase: GenerationPhase,
        message: String,
        intermediate_image_url: Option<String>,
    },
    SegmentFinished {
        id: Uuid,
        status: SegmentStatus,
    },
    SegmentFailed {
        id: Uuid,
        message: String,
    },
    BatchFinished {
        summary: BatchSummary,
    },
}

/// Cloneable event sender. A dummy sink drops everything, which keeps
/// the runner usable without any listener wired up.
#[derive(Clone, Debug, Default)]
pub struct EventSink {
    tx: Option<Sender<PipelineEvent>>,
}

impl EventSink {
    pub fn dummy() -> Self {
        Self { tx: None }
    }

    pub fn from_sender(tx: Sender<PipelineEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = &self.tx {
            // A hung-up listener is not the runner's problem
            let _ = tx.send(event);
        }
    }
}

/// Handle a generator uses to surface two-phase progress for one segment.
pub struct ProgressReporter<'a> {
    id: Uuid,
    sink: &'a EventSink,
}

impl ProgressReporter<'_> {
    pub fn report(
        &self,
        phase: GenerationPhase,
        message: impl Into<String>,
        intermediate_image_url: Option<String>,
    ) {
        self.sink.emit(PipelineEvent::ImageProgress {
            id: self.id,
            phase,
            message: message.into(),
            intermediate_image_url,
        });
    }
}

/// The opaque external generation capability.
///
/// Image generation is two-phase by design: phase 1 composites the
/// requested graphic into the original scene, phase 2 strips everything
/// except the graphic onto a flat key-color background. Video generation
/// is long-running; implementations poll until done and resolve a
/// playable URL.
pub trait Generator {
    fn generate_image(
        &self,
        prompt: &str,
        frame: &Frame,
        aspect: ImageAspect,
        progress: &ProgressReporter<'_>,
    ) -> Result<ImageOutput, GenerateError>;

    fn generate_video(
        &self,
        animation_prompt: &str,
        source_image: &Frame,
        mime_type: &str,
        aspect: VideoAspect,
    ) -> Result<String, GenerateError>;
}

/// Frame extraction / media fetching boundary (thin I/O wrappers, not
/// reproduced here).
pub trait MediaProvider {
    /// Decode the base video frame at `time` seconds.
    fn extract_frame(&self, time: f64) -> Result<Frame, FrameError>;
    /// Fetch a previously generated image by URL.
    fn fetch_image(&self, url: &str) -> Result<Frame, FrameError>;
    /// Source video length in seconds.
    fn duration(&self) -> f64;
}

/// Outcome of one `run_batch` call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub images_generated: usize,
    pub videos_generated: usize,
    pub failures: usize,
    /// Batch ended early on the stop flag; untouched segments keep their
    /// prior state.
    pub stopped: bool,
}

/// Drives a whole batch: image phase over every segment needing an
/// image, then video phase over every segment holding one.
pub struct PipelineRunner {
    stop: Arc<AtomicBool>,
    events: EventSink,
}

impl PipelineRunner {
    pub fn new(events: EventSink) -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    /// Shared stop flag; cooperative, checked between segments. An
    /// in-flight request still runs to completion.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Run the two generation phases over the session. Failures are
    /// isolated per segment; sibling segments continue.
    pub fn run_batch(
        &self,
        analysis: &mut AnalysisResult,
        generator: &dyn Generator,
        media: &dyn MediaProvider,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();

        self.run_image_phase(analysis, generator, media, &mut summary);
        if !summary.stopped {
            self.run_video_phase(analysis, generator, media, &mut summary);
        }

        info!(
            "Batch finished: {} images, {} videos, {} failures{}",
            summary.images_generated,
            summary.videos_generated,
            summary.failures,
            if summary.stopped { " (stopped)" } else { "" }
        );
        self.events.emit(PipelineEvent::BatchFinished { summary });
        summary
    }

    fn run_image_phase(
        &self,
        analysis: &mut AnalysisResult,
        generator: &dyn Generator,
        media: &dyn MediaProvider,
        summary: &mut BatchSummary,
    ) {
        let pending: Vec<Uuid> = analysis
            .segments()
            .iter()
            .filter(|s| matches!(s.status, SegmentStatus::Idle | SegmentStatus::Error))
            .map(|s| s.id)
            .collect();
        debug!("Image phase: {} segments pending", pending.len());

        for id in pending {
            if self.stop_requested() {
                info!("Stop observed, leaving remaining segments untouched");
                summary.stopped = true;
                return;
            }
            // The transition table doubles as the in-flight lock: a
            // segment that started generating elsewhere is skipped here
            if analysis
                .transition(id, SegmentStatus::GeneratingImage, TransitionPayload::None)
                .is_err()
            {
                warn!("Segment {} no longer eligible for image generation", id);
                continue;
            }
            self.events.emit(PipelineEvent::SegmentStarted {
                id,
                kind: GenerationKind::Image,
            });

            let (timestamp, prompt) = match analysis.segment(id) {
                Some(s) => (s.timestamp, s.prompt.clone()),
                None => continue,
            };

            let reporter = ProgressReporter {
                id,
                sink: &self.events,
            };
            let outcome = media
                .extract_frame(timestamp)
                .map_err(|e| e.to_string())
                .and_then(|frame| {
                    let aspect = ImageAspect::classify(frame.width(), frame.height());
                    generator
                        .generate_image(&prompt, &frame, aspect, &reporter)
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(output) => {
                    self.finish(
                        analysis,
                        id,
                        SegmentStatus::ImageSuccess,
                        TransitionPayload::ImageUrl(output.final_image_url),
                    );
                    summary.images_generated += 1;
                }
                Err(message) => {
                    self.fail(analysis, id, message);
                    summary.failures += 1;
                }
            }
        }
    }

    fn run_video_phase(
        &self,
        analysis: &mut AnalysisResult,
        generator: &dyn Generator,
        media: &dyn MediaProvider,
        summary: &mut BatchSummary,
    ) {
        let pending: Vec<Uuid> = analysis
            .segments()
            .iter()
            .filter(|s| s.status == SegmentStatus::ImageSuccess && s.image_url.is_some())
            .map(|s| s.id)
            .collect();
        debug!("Video phase: {} segments pending", pending.len());

        for id in pending {
            if self.stop_requested() {
                info!("Stop observed, leaving remaining segments untouched");
                summary.stopped = true;
                return;
            }
            if analysis
                .transition(id, SegmentStatus::GeneratingVideo, TransitionPayload::None)
                .is_err()
            {
                warn!("Segment {} no longer eligible for video generation", id);
                continue;
            }
            self.events.emit(PipelineEvent::SegmentStarted {
                id,
                kind: GenerationKind::Video,
            });

            let (image_url, animation_prompt) = match analysis.segment(id) {
                Some(s) => (
                    s.image_url.clone().unwrap_or_default(),
                    s.animation_prompt.clone(),
                ),
                None => continue,
            };

            let outcome = media
                .fetch_image(&image_url)
                .map_err(|e| e.to_string())
                .and_then(|image| {
                    let aspect = VideoAspect::coerce(image.width(), image.height());
                    generator
                        .generate_video(&animation_prompt, &image, "image/png", aspect)
                        .map_err(|e| e.to_string())
                });

            match outcome {
                Ok(video_url) => {
                    self.finish(
                        analysis,
                        id,
                        SegmentStatus::VideoSuccess,
                        TransitionPayload::VideoUrl(video_url),
                    );
                    summary.videos_generated += 1;
                }
                Err(message) => {
                    self.fail(analysis, id, message);
                    summary.failures += 1;
                }
            }
        }
    }

    fn finish(
        &self,
        analysis: &mut AnalysisResult,
        id: Uuid,
        status: SegmentStatus,
        payload: TransitionPayload,
    ) {
        if let Err(e) = analysis.transition(id, status, payload) {
            warn!("Completion transition failed for {}: {}", id, e);
            return;
        }
        self.events
            .emit(PipelineEvent::SegmentFinished { id, status });
    }

    fn fail(&self, analysis: &mut AnalysisResult, id: Uuid, message: String) {
        warn!("Segment {} generation failed: {}", id, message);
        if let Err(e) = analysis.transition(
            id,
            SegmentStatus::Error,
            TransitionPayload::ErrorMessage(message.clone()),
        ) {
            warn!("Error transition failed for {}: {}", id, e);
        }
        self.events.emit(PipelineEvent::SegmentFailed { id, message });
    }
}

/// Fold a progress event back into the model so `segment.progress`
/// mirrors what the channel reported. Listeners drain the channel and
/// call this on their side of the event loop.
pub fn apply_progress_event(
    analysis: &mut AnalysisResult,
    event: &PipelineEvent,
) -> Result<(), ModelError> {
    if let PipelineEvent::ImageProgress {
        id,
        phase,
        message,
        intermediate_image_url,
    } = event
    {
        analysis.set_progress(
            *id,
            Some(GenerationProgress {
                phase: *phase,
                message: message.clone(),
                intermediate_image_url: intermediate_image_url.clone(),
            }),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::segment::Segment;
    use crossbeam_channel::unbounded;

    fn seg(t: f64, prompt: &str) -> Segment {
        Segment::new(t, "topic", "", prompt, "slow pan")
    }

    fn session() -> AnalysisResult {
        AnalysisResult::new(
            "",
            "",
            60.0,
            vec![seg(0.0, "banner"), seg(10.0, "lower third")],
        )
    }

    struct MockMedia;

    impl MediaProvider for MockMedia {
        fn extract_frame(&self, _time: f64) -> Result<Frame, FrameError> {
            Ok(Frame::solid(16, 9, [0, 0, 0, 255]))
        }

        fn fetch_image(&self, _url: &str) -> Result<Frame, FrameError> {
            Ok(Frame::solid(16, 9, [0, 255, 0, 255]))
        }

        fn duration(&self) -> f64 {
            60.0
        }
    }

    /// Fails any prompt containing "fail"; optionally trips a stop flag
    /// after the first image to exercise cooperative cancellation.
    struct MockGenerator {
        stop_after_first: Option<Arc<AtomicBool>>,
    }

    impl MockGenerator {
        fn ok() -> Self {
            Self {
                stop_after_first: None,
            }
        }
    }

    impl Generator for MockGenerator {
        fn generate_image(
            &self,
            prompt: &str,
            _frame: &Frame,
            aspect: ImageAspect,
            progress: &ProgressReporter<'_>,
        ) -> Result<ImageOutput, GenerateError> {
            assert_eq!(aspect, ImageAspect::Landscape16x9);
            progress.report(GenerationPhase::Composite, "compositing scene", None);
            if prompt.contains("fail") {
                return Err(GenerateError::Model("refused".into()));
            }
            progress.report(
                GenerationPhase::Isolate,
                "isolating graphic",
                Some("intermediate.png".into()),
            );
            if let Some(stop) = &self.stop_after_first {
                stop.store(true, Ordering::SeqCst);
            }
            Ok(ImageOutput {
                final_image_url: format!("{}.png", prompt),
                intermediate_image_url: "intermediate.png".into(),
            })
        }

        fn generate_video(
            &self,
            animation_prompt: &str,
            _source_image: &Frame,
            mime_type: &str,
            aspect: VideoAspect,
        ) -> Result<String, GenerateError> {
            assert_eq!(mime_type, "image/png");
            assert_eq!(aspect, VideoAspect::Landscape16x9);
            Ok(format!("{}.mp4", animation_prompt))
        }
    }

    #[test]
    fn test_aspect_classification() {
        assert_eq!(ImageAspect::classify(1920, 1080), ImageAspect::Landscape16x9);
        assert_eq!(ImageAspect::classify(1080, 1920), ImageAspect::Portrait9x16);
        assert_eq!(ImageAspect::classify(512, 512), ImageAspect::Square);
        assert_eq!(ImageAspect::classify(800, 600), ImageAspect::Landscape4x3);
        assert_eq!(ImageAspect::classify(600, 800), ImageAspect::Portrait3x4);
        assert_eq!(ImageAspect::classify(0, 0), ImageAspect::Landscape16x9);
    }

    #[test]
    fn test_video_aspect_coercion_two_values_only() {
        assert_eq!(VideoAspect::coerce(1080, 1920), VideoAspect::Portrait9x16);
        assert_eq!(VideoAspect::coerce(1920, 1080), VideoAspect::Landscape16x9);
        // Square is "everything else"
        assert_eq!(VideoAspect::coerce(512, 512), VideoAspect::Landscape16x9);
    }

    #[test]
    fn test_batch_happy_path() {
        let mut a = session();
        let runner = PipelineRunner::new(EventSink::dummy());
        let summary = runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);

        assert_eq!(summary.images_generated, 2);
        assert_eq!(summary.videos_generated, 2);
        assert_eq!(summary.failures, 0);
        assert!(!summary.stopped);
        for s in a.segments() {
            assert_eq!(s.status, SegmentStatus::VideoSuccess);
            assert!(s.image_url.is_some());
            assert!(s.video_url.is_some());
        }
    }

    #[test]
    fn test_failure_is_isolated_per_segment() {
        let mut a = AnalysisResult::new(
            "",
            "",
            60.0,
            vec![seg(0.0, "fail please"), seg(10.0, "banner")],
        );
        let runner = PipelineRunner::new(EventSink::dummy());
        let summary = runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);

        assert_eq!(summary.images_generated, 1);
        assert_eq!(summary.videos_generated, 1);
        assert_eq!(summary.failures, 1);

        let failed = &a.segments()[0];
        assert_eq!(failed.status, SegmentStatus::Error);
        assert!(failed.error.as_deref().unwrap().contains("refused"));

        let ok = &a.segments()[1];
        assert_eq!(ok.status, SegmentStatus::VideoSuccess);
    }

    #[test]
    fn test_stop_before_start_touches_nothing() {
        let mut a = session();
        let runner = PipelineRunner::new(EventSink::dummy());
        runner.request_stop();
        let summary = runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);

        assert!(summary.stopped);
        assert_eq!(summary.images_generated, 0);
        for s in a.segments() {
            assert_eq!(s.status, SegmentStatus::Idle);
        }
    }

    #[test]
    fn test_stop_mid_batch_leaves_rest_in_prior_state() {
        let mut a = session();
        let runner = PipelineRunner::new(EventSink::dummy());
        let generator = MockGenerator {
            stop_after_first: Some(runner.stop_handle()),
        };
        let summary = runner.run_batch(&mut a, &generator, &MockMedia);

        assert!(summary.stopped);
        assert_eq!(summary.images_generated, 1);
        assert_eq!(summary.videos_generated, 0);
        assert_eq!(a.segments()[0].status, SegmentStatus::ImageSuccess);
        assert_eq!(a.segments()[1].status, SegmentStatus::Idle);
    }

    #[test]
    fn test_retry_after_error_goes_through_batch_again() {
        let mut a = AnalysisResult::new("", "", 60.0, vec![seg(0.0, "fail please")]);
        let runner = PipelineRunner::new(EventSink::dummy());
        runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);
        let id = a.segments()[0].id;
        assert_eq!(a.segment(id).unwrap().status, SegmentStatus::Error);

        // Fix the prompt and rerun: Error segments are retried
        a.update_prompts(id, "banner", "slow pan").unwrap();
        let summary = runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);
        assert_eq!(summary.images_generated, 1);
        assert_eq!(a.segment(id).unwrap().status, SegmentStatus::VideoSuccess);
    }

    #[test]
    fn test_events_and_progress_application() {
        let (tx, rx) = unbounded();
        let mut a = AnalysisResult::new("", "", 60.0, vec![seg(0.0, "banner")]);
        let id = a.segments()[0].id;
        let runner = PipelineRunner::new(EventSink::from_sender(tx));
        runner.run_batch(&mut a, &MockGenerator::ok(), &MockMedia);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(matches!(
            events.first(),
            Some(PipelineEvent::SegmentStarted {
                kind: GenerationKind::Image,
                ..
            })
        ));
        assert!(matches!(
            events.last(),
            Some(PipelineEvent::BatchFinished { .. })
        ));

        // Folding the progress events into the model populates the
        // transient progress field
        let progress_event = events
            .iter()
            .find(|e| matches!(e, PipelineEvent::ImageProgress { .. }))
            .unwrap();
        apply_progress_event(&mut a, progress_event).unwrap();
        let p = a.segment(id).unwrap().progress.clone().unwrap();
        assert_eq!(p.phase, GenerationPhase::Composite);
        assert_eq!(p.message, "compositing scene");
    }
}
