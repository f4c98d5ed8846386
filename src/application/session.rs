//! Client-side state of a single streamed download.
//!
//! The session is a sequential reducer over the chunks of one response body:
//! it waits for the metadata header line, then collects payload bytes in
//! arrival order until the stream ends or fails. Every observable change is
//! reported through a [`DownloadObserver`].

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::domain::{
    metadata::{split_header, MAX_HEADER_LEN},
    output_file_name, AppError, DownloadMode, DownloadPhase, DownloadedFile, StreamMetadata,
};

/// Receives the outcome of each session transition.
pub trait DownloadObserver {
    /// Percentage of the announced length received so far, `None` when the
    /// server did not announce a usable length.
    fn on_progress(&mut self, percent: Option<f32>, received_bytes: u64);

    /// Called once, when the metadata header has been parsed.
    fn on_metadata(&mut self, file_name: &str);

    fn on_done(&mut self, file: DownloadedFile);

    fn on_error(&mut self, error: &AppError);
}

#[derive(Debug)]
enum StreamState {
    Idle,
    AwaitingMetadata { pending: BytesMut },
    StreamingPayload,
    Complete,
    Failed,
}

#[derive(Debug)]
pub struct DownloadSession {
    mode: DownloadMode,
    state: StreamState,
    received_bytes: u64,
    total_bytes: Option<u64>,
    file_name: String,
    chunks: Vec<Bytes>,
    error_message: Option<String>,
}

impl Default for DownloadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadSession {
    pub fn new() -> Self {
        Self {
            mode: DownloadMode::default(),
            state: StreamState::Idle,
            received_bytes: 0,
            total_bytes: None,
            file_name: String::new(),
            chunks: Vec::new(),
            error_message: None,
        }
    }

    /// Discards everything from the previous attempt and waits for a header.
    pub fn start(&mut self, mode: DownloadMode) {
        *self = Self {
            mode,
            state: StreamState::AwaitingMetadata {
                pending: BytesMut::new(),
            },
            ..Self::new()
        };
        debug!(%mode, "download session started");
    }

    pub fn on_chunk(&mut self, chunk: Bytes, observer: &mut dyn DownloadObserver) {
        match &mut self.state {
            StreamState::AwaitingMetadata { pending } => {
                pending.extend_from_slice(&chunk);
                match take_header(pending) {
                    Some((metadata, payload)) => self.begin_payload(metadata, payload, observer),
                    None if pending.len() > MAX_HEADER_LEN => {
                        warn!(buffered = pending.len(), "metadata header exceeds limit");
                        self.fail(AppError::MissingMetadata, observer);
                    }
                    None => {}
                }
            }
            StreamState::StreamingPayload => {
                self.push_payload(chunk);
                observer.on_progress(self.progress(), self.received_bytes);
            }
            StreamState::Idle | StreamState::Complete | StreamState::Failed => {
                debug!(len = chunk.len(), "ignoring chunk outside an active session");
            }
        }
    }

    /// End of data: assembles the payload and hands it to the observer.
    pub fn on_complete(&mut self, observer: &mut dyn DownloadObserver) {
        match &self.state {
            StreamState::AwaitingMetadata { pending } => {
                let error = if pending.is_empty() {
                    AppError::EmptyBody
                } else {
                    AppError::MissingMetadata
                };
                self.fail(error, observer);
            }
            StreamState::StreamingPayload => {
                let mut data = BytesMut::with_capacity(self.received_bytes as usize);
                for chunk in self.chunks.drain(..) {
                    data.extend_from_slice(&chunk);
                }

                let file = DownloadedFile {
                    file_name: output_file_name(&self.file_name, self.mode),
                    data: data.freeze(),
                };
                info!(
                    file_name = %file.file_name,
                    bytes = file.data.len(),
                    "download complete"
                );
                self.state = StreamState::Complete;
                observer.on_done(file);
            }
            StreamState::Idle | StreamState::Complete | StreamState::Failed => {}
        }
    }

    pub fn on_error(&mut self, error: AppError, observer: &mut dyn DownloadObserver) {
        if self.is_active() {
            self.fail(error, observer);
        }
    }

    pub fn status(&self) -> DownloadPhase {
        match self.state {
            StreamState::Idle => DownloadPhase::Idle,
            StreamState::AwaitingMetadata { .. } | StreamState::StreamingPayload => {
                DownloadPhase::InProgress
            }
            StreamState::Complete => DownloadPhase::Done,
            StreamState::Failed => DownloadPhase::Failed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == DownloadPhase::InProgress
    }

    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// `100 * received / total`, unclamped. An announced length of zero
    /// counts as finished.
    pub fn progress(&self) -> Option<f32> {
        let total = self.total_bytes?;
        if total == 0 {
            return Some(100.0);
        }
        Some((self.received_bytes as f64 * 100.0 / total as f64) as f32)
    }

    fn begin_payload(
        &mut self,
        metadata: StreamMetadata,
        payload: Bytes,
        observer: &mut dyn DownloadObserver,
    ) {
        info!(
            file_name = %metadata.file_name,
            total_bytes = ?metadata.total_bytes,
            "received stream metadata"
        );
        self.file_name = metadata.file_name;
        self.total_bytes = metadata.total_bytes;
        self.state = StreamState::StreamingPayload;
        observer.on_metadata(&self.file_name);

        self.push_payload(payload);
        observer.on_progress(self.progress(), self.received_bytes);
    }

    fn push_payload(&mut self, chunk: Bytes) {
        if chunk.is_empty() {
            return;
        }
        self.received_bytes += chunk.len() as u64;
        self.chunks.push(chunk);
    }

    fn fail(&mut self, error: AppError, observer: &mut dyn DownloadObserver) {
        warn!(%error, received = self.received_bytes, "download failed");
        self.chunks.clear();
        self.error_message = Some(error.to_string());
        self.state = StreamState::Failed;
        observer.on_error(&error);
    }
}

fn take_header(pending: &[u8]) -> Option<(StreamMetadata, Bytes)> {
    let (header, payload) = split_header(pending)?;
    let metadata = StreamMetadata::parse(&String::from_utf8_lossy(header));
    Some((metadata, Bytes::copy_from_slice(payload)))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every callback in order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingObserver {
        pub progress: Vec<Option<f32>>,
        pub metadata: Vec<String>,
        pub done: Vec<DownloadedFile>,
        pub errors: Vec<AppError>,
    }

    impl DownloadObserver for RecordingObserver {
        fn on_progress(&mut self, percent: Option<f32>, _received_bytes: u64) {
            self.progress.push(percent);
        }

        fn on_metadata(&mut self, file_name: &str) {
            self.metadata.push(file_name.to_string());
        }

        fn on_done(&mut self, file: DownloadedFile) {
            self.done.push(file);
        }

        fn on_error(&mut self, error: &AppError) {
            self.errors.push(error.clone());
        }
    }

    fn run(mode: DownloadMode, chunks: &[&[u8]]) -> (DownloadSession, RecordingObserver) {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.start(mode);
        for chunk in chunks {
            session.on_chunk(Bytes::copy_from_slice(chunk), &mut observer);
        }
        session.on_complete(&mut observer);
        (session, observer)
    }

    #[test]
    fn test_header_chunk_with_payload() {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.start(DownloadMode::Video);

        let mut chunk = b"movie.webm|1048576\n".to_vec();
        chunk.extend(std::iter::repeat(7u8).take(100));
        session.on_chunk(Bytes::from(chunk), &mut observer);

        assert_eq!(session.file_name(), "movie.webm");
        assert_eq!(session.total_bytes(), Some(1048576));
        assert_eq!(session.received_bytes(), 100);
        assert_eq!(observer.metadata, vec!["movie.webm".to_string()]);

        let percent = observer.progress.last().copied().flatten().unwrap();
        assert!((percent - 0.0095367).abs() < 1e-5, "got {}", percent);
        assert_eq!(session.status(), DownloadPhase::InProgress);
    }

    #[test]
    fn test_chunks_assembled_in_arrival_order() {
        let (session, observer) = run(
            DownloadMode::Video,
            &[b"clip.webm|9\nabc", b"def", b"", b"ghi"],
        );

        assert_eq!(session.status(), DownloadPhase::Done);
        assert_eq!(observer.done.len(), 1);
        assert_eq!(observer.done[0].data.as_ref(), b"abcdefghi");
        assert_eq!(observer.done[0].file_name, "clip.mp4");
        assert!(observer.errors.is_empty());
    }

    #[test]
    fn test_progress_is_monotonic_and_reaches_total() {
        let (session, observer) = run(DownloadMode::Audio, &[b"a.ogg|4\n", b"ab", b"c", b"d"]);

        let values: Vec<f32> = observer.progress.iter().map(|p| p.unwrap()).collect();
        assert_eq!(values, vec![0.0, 50.0, 75.0, 100.0]);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(session.received_bytes(), 4);
    }

    #[test]
    fn test_non_numeric_size_streams_without_percentage() {
        let (session, observer) = run(DownloadMode::Video, &[b"movie.webm|abc\n12", b"34"]);

        assert_eq!(session.total_bytes(), None);
        assert!(!observer.progress.is_empty());
        assert!(observer.progress.iter().all(|p| p.is_none()));
        assert_eq!(observer.done[0].data.as_ref(), b"1234");
        assert_eq!(session.status(), DownloadPhase::Done);
    }

    #[test]
    fn test_audio_mode_renames_file() {
        let (_, observer) = run(DownloadMode::Audio, &[b"song.ogg|1\nx"]);
        assert_eq!(observer.done[0].file_name, "song.mp3");
    }

    #[test]
    fn test_empty_payload_completes() {
        let (session, observer) = run(DownloadMode::Video, &[b"empty.webm|0\n"]);

        assert_eq!(session.status(), DownloadPhase::Done);
        assert!(observer.errors.is_empty());
        assert!(observer.done[0].data.is_empty());
        assert_eq!(observer.progress, vec![Some(100.0)]);
    }

    #[test]
    fn test_header_split_across_chunks() {
        let (session, observer) = run(
            DownloadMode::Video,
            &[b"mov", b"ie.webm|1", b"0\n01234", b"56789"],
        );

        assert_eq!(observer.metadata, vec!["movie.webm".to_string()]);
        assert_eq!(session.total_bytes(), Some(10));
        assert_eq!(observer.done[0].data.as_ref(), b"0123456789");
        // No progress before the header is complete.
        assert_eq!(observer.progress.len(), 2);
    }

    #[test]
    fn test_empty_stream_fails() {
        let (session, observer) = run(DownloadMode::Video, &[]);
        assert_eq!(session.status(), DownloadPhase::Failed);
        assert_eq!(observer.errors, vec![AppError::EmptyBody]);
        assert!(observer.done.is_empty());
    }

    #[test]
    fn test_stream_without_terminator_fails() {
        let (session, observer) = run(DownloadMode::Video, &[b"name-only"]);
        assert_eq!(session.status(), DownloadPhase::Failed);
        assert_eq!(observer.errors, vec![AppError::MissingMetadata]);
    }

    #[test]
    fn test_oversized_header_fails_early() {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.start(DownloadMode::Video);

        session.on_chunk(Bytes::from(vec![b'a'; MAX_HEADER_LEN + 1]), &mut observer);
        assert_eq!(session.status(), DownloadPhase::Failed);
        assert_eq!(observer.errors, vec![AppError::MissingMetadata]);
    }

    #[test]
    fn test_read_error_discards_partial_data() {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.start(DownloadMode::Video);
        session.on_chunk(Bytes::from_static(b"a.webm|10\n12345"), &mut observer);

        session.on_error(AppError::StreamRead("connection reset".into()), &mut observer);
        // Late chunks and end-of-stream change nothing.
        session.on_chunk(Bytes::from_static(b"67890"), &mut observer);
        session.on_complete(&mut observer);

        assert_eq!(session.status(), DownloadPhase::Failed);
        assert!(session.error_message().unwrap().contains("connection reset"));
        assert!(observer.done.is_empty());
        assert_eq!(observer.errors.len(), 1);
        assert_eq!(session.received_bytes(), 5);
    }

    #[test]
    fn test_start_resets_previous_attempt() {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.start(DownloadMode::Audio);
        session.on_chunk(Bytes::from_static(b"old.ogg|4\nab"), &mut observer);
        session.on_error(AppError::StreamRead("boom".into()), &mut observer);

        session.start(DownloadMode::Video);

        assert_eq!(session.status(), DownloadPhase::InProgress);
        assert_eq!(session.file_name(), "");
        assert_eq!(session.error_message(), None);
        assert_eq!(session.received_bytes(), 0);
        assert_eq!(session.total_bytes(), None);
        assert_eq!(session.progress(), None);

        let mut observer = RecordingObserver::default();
        session.on_chunk(Bytes::from_static(b"new.webm|1\nz"), &mut observer);
        session.on_complete(&mut observer);
        assert_eq!(observer.done[0].file_name, "new.mp4");
        assert_eq!(observer.done[0].data.as_ref(), b"z");
    }

    #[test]
    fn test_misreported_length_is_not_clamped() {
        let (_, observer) = run(DownloadMode::Video, &[b"a|2\nabcd"]);
        assert_eq!(observer.progress, vec![Some(200.0)]);
    }

    #[test]
    fn test_chunks_before_start_are_ignored() {
        let mut session = DownloadSession::new();
        let mut observer = RecordingObserver::default();
        session.on_chunk(Bytes::from_static(b"a|1\nx"), &mut observer);
        session.on_complete(&mut observer);

        assert_eq!(session.status(), DownloadPhase::Idle);
        assert!(observer.metadata.is_empty());
        assert!(observer.done.is_empty());
    }
}
