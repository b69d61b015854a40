use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::{debug, warn};

use crate::TranscriptChunk;

/// A playable audio file in an interactive review session.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    pub id: String,
    /// Where the media layer finds the audio (URL or path).
    pub location: String,
    pub display_name: String,
    pub duration: Option<f64>,
}

/// One opened, seekable audio source. Implementations wrap whatever media
/// layer the host session provides.
pub trait MediaSource {
    fn seek(&mut self, position_secs: f64) -> anyhow::Result<()>;
    fn resume(&mut self) -> anyhow::Result<()>;
    fn pause(&mut self);
}

/// Creates source handles on demand.
pub trait MediaBackend {
    type Source: MediaSource;

    fn open(&mut self, track: &AudioTrack) -> anyhow::Result<Self::Source>;
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveSegment {
    track_id: String,
    chunk_index: usize,
    end_secs: f64,
}

/// Click-to-play synchronizer between transcript chunks and their audio.
///
/// A small state machine: `Idle`, or `Playing(track, chunk)` with the
/// chunk's end offset armed. Playing a chunk pauses whatever was active
/// first (pause only; the previous source keeps its position), seeks the
/// target source to the chunk start, and resumes it. The session's media
/// layer reports progress via [`on_position`](Self::on_position),
/// [`on_ended`](Self::on_ended) and [`on_error`](Self::on_error); the
/// synchronizer stops the instant the position reaches the chunk end.
///
/// Source handles are opened lazily, one per distinct track id, and reused
/// across repeated plays. The map is owned here: single session, single
/// thread, no shared state.
pub struct SegmentSynchronizer<B: MediaBackend> {
    backend: B,
    sources: HashMap<String, B::Source>,
    active: Option<ActiveSegment>,
}

impl<B: MediaBackend> SegmentSynchronizer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            sources: HashMap::new(),
            active: None,
        }
    }

    /// The currently playing `(track id, chunk index)`, if any.
    pub fn active(&self) -> Option<(&str, usize)> {
        self.active
            .as_ref()
            .map(|a| (a.track_id.as_str(), a.chunk_index))
    }

    pub fn is_active(&self, track_id: &str, chunk_index: usize) -> bool {
        self.active() == Some((track_id, chunk_index))
    }

    /// Click handler semantics: clicking the chunk that is already playing
    /// stops it; clicking anything else switches playback there.
    pub fn toggle(
        &mut self,
        track: &AudioTrack,
        chunk: &TranscriptChunk,
        chunk_index: usize,
    ) -> anyhow::Result<()> {
        if self.is_active(&track.id, chunk_index) {
            self.stop();
            Ok(())
        } else {
            self.play(track, chunk, chunk_index)
        }
    }

    /// Plays one chunk's time window, pausing any active source first so at
    /// most one source is ever advancing.
    pub fn play(
        &mut self,
        track: &AudioTrack,
        chunk: &TranscriptChunk,
        chunk_index: usize,
    ) -> anyhow::Result<()> {
        self.pause_active();

        let source = match self.sources.entry(track.id.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.backend.open(track)?),
        };

        source.seek(chunk.start)?;
        source.resume()?;

        debug!(
            track = %track.id,
            chunk = chunk_index,
            start = chunk.start,
            end = chunk.end,
            "Segment playback started"
        );
        self.active = Some(ActiveSegment {
            track_id: track.id.clone(),
            chunk_index,
            end_secs: chunk.end,
        });
        Ok(())
    }

    /// Pauses the active source and returns to `Idle`. Idempotent.
    pub fn stop(&mut self) {
        self.pause_active();
    }

    /// Position report from the media layer. Stops playback once the active
    /// chunk's end offset is reached; reports for other tracks are stale
    /// callbacks and are ignored.
    pub fn on_position(&mut self, track_id: &str, position_secs: f64) {
        let reached_end = self
            .active
            .as_ref()
            .is_some_and(|a| a.track_id == track_id && position_secs >= a.end_secs);
        if reached_end {
            self.stop();
        }
    }

    /// The active source ran out of media.
    pub fn on_ended(&mut self, track_id: &str) {
        if self.active.as_ref().is_some_and(|a| a.track_id == track_id) {
            self.active = None;
        }
    }

    /// The active source failed. The handle is kept for a later retry.
    pub fn on_error(&mut self, track_id: &str) {
        if self.active.as_ref().is_some_and(|a| a.track_id == track_id) {
            warn!(track = %track_id, "Playback error, returning to idle");
            self.active = None;
        }
    }

    fn pause_active(&mut self) {
        if let Some(active) = self.active.take() {
            if let Some(source) = self.sources.get_mut(&active.track_id) {
                source.pause();
            }
        }
    }
}
