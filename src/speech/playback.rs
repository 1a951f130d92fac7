//! Single-slot audio playback for spoken advisories.
//!
//! The controller holds at most one synthesized clip at a time. A new
//! request releases the previous clip's sink resources before the
//! replacement is loaded, and a request superseded mid-synthesis discards
//! its audio without touching the slot.
//!
//! Rodio's output types are not Send, so the real sink runs them on a
//! dedicated thread fed over a channel.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::synthesis::SpeechSynthesis;
use super::voices;
use super::SpeechError;
use crate::config;

/// Seam to the audio device. One clip loaded at a time.
pub trait AudioSink {
    fn load(&self, path: &Path) -> Result<(), SpeechError>;
    fn play(&self) -> Result<(), SpeechError>;
    fn pause(&self) -> Result<(), SpeechError>;
    /// Stop playback and drop any loaded clip.
    fn release(&self) -> Result<(), SpeechError>;
    fn is_playing(&self) -> bool;
}

enum SinkCommand {
    Load(PathBuf),
    Play,
    Pause,
    Release,
}

/// Rodio-backed sink. The stream and sink objects live on a dedicated
/// "audio-engine" thread; playback-finished detection is a poll on the
/// sink's queue while idle.
pub struct RodioSink {
    tx: Arc<Mutex<Option<Sender<SinkCommand>>>>,
    playing: Arc<AtomicBool>,
}

impl RodioSink {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            playing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<SinkCommand>, SpeechError> {
        let mut guard = self.tx.lock().map_err(|_| SpeechError::LockPoisoned)?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<SinkCommand>();
        let playing = Arc::clone(&self.playing);

        thread::Builder::new()
            .name("audio-engine".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn load_clip(
                    path: &Path,
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    let (s, handle) = OutputStream::try_default()
                        .map_err(|e| format!("Failed to open audio output: {e}"))?;
                    let new_sink = Sink::try_new(&handle)
                        .map_err(|e| format!("Failed to create audio sink: {e}"))?;
                    let file = File::open(path).map_err(|e| e.to_string())?;
                    let source = Decoder::new(BufReader::new(file))
                        .map_err(|e| format!("Failed to decode audio: {e}"))?;
                    new_sink.pause();
                    new_sink.append(source);
                    *stream = Some(s);
                    *sink = Some(new_sink);
                    Ok(())
                }

                loop {
                    match rx.recv_timeout(Duration::from_millis(200)) {
                        Ok(SinkCommand::Load(path)) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            _stream = None;
                            playing.store(false, Ordering::SeqCst);
                            if let Err(e) = load_clip(&path, &mut _stream, &mut sink) {
                                warn!(path = %path.display(), error = %e, "Could not load audio clip");
                            }
                        }
                        Ok(SinkCommand::Play) => {
                            if let Some(ref s) = sink {
                                s.play();
                                playing.store(true, Ordering::SeqCst);
                            }
                        }
                        Ok(SinkCommand::Pause) => {
                            if let Some(ref s) = sink {
                                s.pause();
                                playing.store(false, Ordering::SeqCst);
                            }
                        }
                        Ok(SinkCommand::Release) => {
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            _stream = None;
                            playing.store(false, Ordering::SeqCst);
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            // Clip ran to its end.
                            if playing.load(Ordering::SeqCst) {
                                if let Some(ref s) = sink {
                                    if s.empty() {
                                        playing.store(false, Ordering::SeqCst);
                                    }
                                }
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| SpeechError::Playback(e.to_string()))?;

        let tx_clone = tx.clone();
        *guard = Some(tx);
        Ok(tx_clone)
    }

    fn send(&self, cmd: SinkCommand) -> Result<(), SpeechError> {
        self.ensure_thread()?
            .send(cmd)
            .map_err(|e| SpeechError::Playback(e.to_string()))
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for RodioSink {
    fn load(&self, path: &Path) -> Result<(), SpeechError> {
        if !path.exists() {
            return Err(SpeechError::Playback(format!(
                "No audio file at {}",
                path.display()
            )));
        }
        self.send(SinkCommand::Load(path.to_path_buf()))
    }

    fn play(&self) -> Result<(), SpeechError> {
        self.send(SinkCommand::Play)
    }

    fn pause(&self) -> Result<(), SpeechError> {
        self.send(SinkCommand::Pause)
    }

    fn release(&self) -> Result<(), SpeechError> {
        // Nothing to release if the thread never started.
        if let Ok(guard) = self.tx.lock() {
            if let Some(tx) = guard.as_ref() {
                let _ = tx.send(SinkCommand::Release);
            }
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// The clip currently occupying the playback slot. Dropping it deletes
/// the cached audio file.
struct AudioResource {
    file: NamedTempFile,
    voice: &'static str,
}

/// Drives synthesize-then-play for advisory text, one clip at a time.
pub struct SpeechController<S: SpeechSynthesis, P: AudioSink> {
    synthesis: S,
    sink: P,
    cache_dir: PathBuf,
    resource: Mutex<Option<AudioResource>>,
    epoch: AtomicU64,
}

impl<S: SpeechSynthesis, P: AudioSink> SpeechController<S, P> {
    pub fn new(synthesis: S, sink: P) -> Self {
        Self::with_cache_dir(synthesis, sink, config::audio_cache_dir())
    }

    pub fn with_cache_dir(synthesis: S, sink: P, cache_dir: PathBuf) -> Self {
        Self {
            synthesis,
            sink,
            cache_dir,
            resource: Mutex::new(None),
            epoch: AtomicU64::new(0),
        }
    }

    /// Synthesize `text` in the given voice and start playback, replacing
    /// whatever clip held the slot before.
    pub async fn speak(&self, text: &str, voice_id: &str) -> Result<(), SpeechError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SpeechError::EmptyInput);
        }

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let voice = voices::resolve_voice(voice_id);

        let audio = self.synthesis.synthesize(text, voice.id).await?;

        std::fs::create_dir_all(&self.cache_dir)?;
        let mut file = NamedTempFile::new_in(&self.cache_dir)?;
        file.write_all(&audio)?;
        file.flush()?;

        let mut slot = self.resource.lock().map_err(|_| SpeechError::LockPoisoned)?;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            debug!(voice = voice.id, "Discarding superseded speech request");
            return Err(SpeechError::Superseded);
        }
        // Empty the slot before releasing so it never describes a clip
        // the sink no longer holds, even if load/play below fail.
        if slot.take().is_some() {
            self.sink.release()?;
        }
        self.sink.load(file.path())?;
        self.sink.play()?;
        *slot = Some(AudioResource {
            file,
            voice: voice.id,
        });
        info!(voice = voice.id, bytes = audio.len(), "Speaking advisory");
        Ok(())
    }

    /// Pause if playing, resume if paused. Returns whether audio is
    /// playing afterwards; a no-op without a loaded clip.
    pub fn toggle(&self) -> Result<bool, SpeechError> {
        let slot = self.resource.lock().map_err(|_| SpeechError::LockPoisoned)?;
        if slot.is_none() {
            return Ok(false);
        }
        if self.sink.is_playing() {
            self.sink.pause()?;
            Ok(false)
        } else {
            self.sink.play()?;
            Ok(true)
        }
    }

    /// Stop playback and free the slot.
    pub fn stop(&self) -> Result<(), SpeechError> {
        let mut slot = self.resource.lock().map_err(|_| SpeechError::LockPoisoned)?;
        if slot.take().is_some() {
            self.sink.release()?;
        }
        Ok(())
    }

    pub fn is_playing(&self) -> bool {
        self.sink.is_playing()
    }

    pub fn has_audio(&self) -> bool {
        self.resource.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Voice of the clip currently in the slot.
    pub fn current_voice(&self) -> Option<&'static str> {
        self.resource.lock().ok()?.as_ref().map(|r| r.voice)
    }
}

impl<S: SpeechSynthesis, P: AudioSink> Drop for SpeechController<S, P> {
    fn drop(&mut self) {
        let _ = self.sink.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockSynthesis {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl MockSynthesis {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SpeechSynthesis for &MockSynthesis {
        async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, SpeechError> {
            tokio::task::yield_now().await;
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), voice.to_string()));
            Ok(vec![0u8; 16])
        }
    }

    /// Records every sink call in order; playback state is a plain flag.
    struct MockSink {
        events: Arc<Mutex<Vec<&'static str>>>,
        playing: AtomicBool,
        fail_loads: Arc<AtomicBool>,
    }

    impl MockSink {
        fn new() -> (Self, Arc<Mutex<Vec<&'static str>>>) {
            let (sink, events, _) = Self::with_controls();
            (sink, events)
        }

        fn with_controls() -> (
            Self,
            Arc<Mutex<Vec<&'static str>>>,
            Arc<AtomicBool>,
        ) {
            let events = Arc::new(Mutex::new(Vec::new()));
            let fail_loads = Arc::new(AtomicBool::new(false));
            (
                Self {
                    events: Arc::clone(&events),
                    playing: AtomicBool::new(false),
                    fail_loads: Arc::clone(&fail_loads),
                },
                events,
                fail_loads,
            )
        }
    }

    impl AudioSink for MockSink {
        fn load(&self, _path: &Path) -> Result<(), SpeechError> {
            if self.fail_loads.load(Ordering::SeqCst) {
                return Err(SpeechError::Playback("device unavailable".into()));
            }
            self.events.lock().unwrap().push("load");
            Ok(())
        }

        fn play(&self) -> Result<(), SpeechError> {
            self.events.lock().unwrap().push("play");
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn pause(&self) -> Result<(), SpeechError> {
            self.events.lock().unwrap().push("pause");
            self.playing.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn release(&self) -> Result<(), SpeechError> {
            self.events.lock().unwrap().push("release");
            self.playing.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    fn controller(
        synthesis: &MockSynthesis,
    ) -> (
        SpeechController<&MockSynthesis, MockSink>,
        Arc<Mutex<Vec<&'static str>>>,
    ) {
        let (sink, events) = MockSink::new();
        (
            SpeechController::with_cache_dir(synthesis, sink, std::env::temp_dir()),
            events,
        )
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_side_effects() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        let err = ctrl.speak("   \n ", "alloy").await.unwrap_err();

        assert!(matches!(err, SpeechError::EmptyInput));
        assert!(synthesis.calls().is_empty());
        assert!(events.lock().unwrap().is_empty());
        assert!(!ctrl.has_audio());
    }

    #[tokio::test]
    async fn empty_input_leaves_held_clip_untouched() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        ctrl.speak("Take your aspirin", "nova").await.unwrap();
        let err = ctrl.speak("   ", "echo").await.unwrap_err();

        assert!(matches!(err, SpeechError::EmptyInput));
        // The held clip survives exactly as it was: same voice, still
        // playing, no extra sink traffic, no second synthesis call.
        assert_eq!(ctrl.current_voice(), Some("nova"));
        assert!(ctrl.is_playing());
        assert_eq!(*events.lock().unwrap(), vec!["load", "play"]);
        assert_eq!(synthesis.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_load_leaves_the_slot_empty() {
        let synthesis = MockSynthesis::new();
        let (sink, events, fail_loads) = MockSink::with_controls();
        let ctrl = SpeechController::with_cache_dir(&synthesis, sink, std::env::temp_dir());

        ctrl.speak("first advisory", "nova").await.unwrap();
        fail_loads.store(true, Ordering::SeqCst);
        let err = ctrl.speak("second advisory", "echo").await.unwrap_err();

        assert!(matches!(err, SpeechError::Playback(_)));
        // The old clip was released and its replacement never loaded, so
        // the slot must not keep describing the dead clip.
        assert!(!ctrl.has_audio());
        assert_eq!(ctrl.current_voice(), None);
        assert_eq!(*events.lock().unwrap(), vec!["load", "play", "release"]);
    }

    #[tokio::test]
    async fn speak_loads_then_plays() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        ctrl.speak("Take your aspirin", "nova").await.unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["load", "play"]);
        assert!(ctrl.has_audio());
        assert!(ctrl.is_playing());
        assert_eq!(ctrl.current_voice(), Some("nova"));
    }

    #[tokio::test]
    async fn replacement_releases_previous_clip_first() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        ctrl.speak("first advisory", "alloy").await.unwrap();
        ctrl.speak("second advisory", "echo").await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["load", "play", "release", "load", "play"]
        );
        assert_eq!(ctrl.current_voice(), Some("echo"));
    }

    #[tokio::test]
    async fn unknown_voice_synthesizes_with_default() {
        let synthesis = MockSynthesis::new();
        let (ctrl, _events) = controller(&synthesis);

        ctrl.speak("text", "robot").await.unwrap();

        let calls = synthesis.calls();
        assert_eq!(calls[0].1, "alloy");
        assert_eq!(ctrl.current_voice(), Some("alloy"));
    }

    #[tokio::test]
    async fn toggle_pauses_and_resumes() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        ctrl.speak("text", "alloy").await.unwrap();
        assert!(!ctrl.toggle().unwrap());
        assert!(!ctrl.is_playing());
        assert!(ctrl.toggle().unwrap());
        assert!(ctrl.is_playing());

        let recorded = events.lock().unwrap().clone();
        assert_eq!(recorded, vec!["load", "play", "pause", "play"]);
    }

    #[tokio::test]
    async fn toggle_without_audio_is_a_noop() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        assert!(!ctrl.toggle().unwrap());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_frees_the_slot() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        ctrl.speak("text", "alloy").await.unwrap();
        ctrl.stop().unwrap();

        assert!(!ctrl.has_audio());
        assert_eq!(*events.lock().unwrap(), vec!["load", "play", "release"]);
        // The slot is empty again, so toggle does nothing.
        assert!(!ctrl.toggle().unwrap());
    }

    #[tokio::test]
    async fn superseded_request_discards_its_audio() {
        let synthesis = MockSynthesis::new();
        let (ctrl, events) = controller(&synthesis);

        // Both requests interleave on one task; the second bumps the
        // epoch while the first is suspended in synthesis.
        let (first, second) = tokio::join!(
            ctrl.speak("stale advisory", "alloy"),
            ctrl.speak("fresh advisory", "echo"),
        );

        assert!(matches!(first, Err(SpeechError::Superseded)));
        second.unwrap();

        assert_eq!(*events.lock().unwrap(), vec!["load", "play"]);
        assert_eq!(ctrl.current_voice(), Some("echo"));
    }
}
