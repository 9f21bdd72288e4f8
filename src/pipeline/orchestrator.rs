//! Podcast generation pipeline.
//!
//! One run is a strictly sequential chain of remote calls:
//! fetch posts → generate script → clone guest voice → synthesize each line,
//! followed by byte-level concatenation and storage. Every step reports
//! through an [`EventSink`], and every run ends with exactly one terminal
//! event (`error` or `complete`).

use crate::defaults;
use crate::error::{PodcastError, Result};
use crate::pipeline::sink::EventSink;
use crate::pipeline::types::{DialogueLine, GenerateRequest, ProgressEvent, Role, VoiceId};
use crate::store::ArtifactStore;
use crate::upstream::{SpeechSynthesizer, Upstreams};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use std::time::Instant;

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Voice used for every host line, shared by all runs
    pub host_voice: VoiceId,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            host_voice: VoiceId::new(defaults::HOST_VOICE_ID),
        }
    }
}

/// Role → voice assignment for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMap {
    host: VoiceId,
    guest: VoiceId,
}

impl VoiceMap {
    pub fn new(host: VoiceId, guest: VoiceId) -> Self {
        Self { host, guest }
    }

    pub fn voice_for(&self, role: Role) -> &VoiceId {
        match role {
            Role::Host => &self.host,
            Role::Guest => &self.guest,
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub audio_id: String,
    pub script: Vec<DialogueLine>,
}

/// Drives the collaborators for each run and stores finished audio.
pub struct Pipeline {
    upstreams: Upstreams,
    store: Arc<ArtifactStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(upstreams: Upstreams, store: Arc<ArtifactStore>, config: PipelineConfig) -> Self {
        Self {
            upstreams,
            store,
            config,
        }
    }

    /// Store that receives finished audio.
    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one run, reporting progress to `sink`.
    ///
    /// Emits exactly one terminal event as its last event. On failure nothing
    /// is stored and the returned error is the one reported in the `error`
    /// event.
    pub async fn run(&self, request: GenerateRequest, sink: &dyn EventSink) -> Result<Completed> {
        let started = Instant::now();
        match self.execute(request, sink).await {
            Ok(completed) => {
                tracing::info!(
                    audio_id = %completed.audio_id,
                    lines = completed.script.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "podcast run complete"
                );
                sink.emit(ProgressEvent::Complete {
                    audio_id: completed.audio_id.clone(),
                    script: completed.script.clone(),
                });
                Ok(completed)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "podcast run failed"
                );
                sink.emit(ProgressEvent::error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn execute(&self, request: GenerateRequest, sink: &dyn EventSink) -> Result<Completed> {
        let user_id = require(request.user_id, "userId")?;
        let encoded_sample = require(request.audio_sample, "audioSample")?;
        tracing::info!(user_id = %user_id, "podcast run started");

        sink.emit(ProgressEvent::log(format!("Fetching posts for user {user_id}...")));
        let posts = self.upstreams.fetcher.fetch_posts(&user_id).await?;
        if posts.is_empty() {
            return Err(PodcastError::EmptyResult {
                what: "No posts found for this user".to_string(),
            });
        }
        sink.emit(ProgressEvent::log(format!("Fetched {} posts", posts.len())));

        sink.emit(ProgressEvent::log("Generating podcast script..."));
        let script = self.upstreams.generator.generate_script(&posts).await?;
        drop(posts);
        if script.is_empty() {
            return Err(PodcastError::EmptyResult {
                what: "Script generation produced no dialogue".to_string(),
            });
        }
        sink.emit(ProgressEvent::log(format!("Script ready: {} lines", script.len())));

        let sample = decode_sample(&encoded_sample)?;
        sink.emit(ProgressEvent::log("Cloning guest voice..."));
        let guest = self.upstreams.cloner.clone_voice(&sample).await?;
        sink.emit(ProgressEvent::log(format!("Guest voice cloned: {guest}")));

        let voices = VoiceMap::new(self.config.host_voice.clone(), guest);
        let chunks =
            synthesize_script(self.upstreams.synthesizer.as_ref(), &script, &voices, sink).await?;

        sink.emit(ProgressEvent::log("Merging audio..."));
        let audio = concatenate(chunks);
        let audio_id = self.store.put(audio);
        sink.emit(ProgressEvent::log("Podcast generated"));

        Ok(Completed { audio_id, script })
    }
}

/// Present and non-blank, or a missing-field error.
fn require(value: Option<String>, field: &'static str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(PodcastError::MissingField { field })
}

/// Decode a base64 audio sample, tolerating a `data:<mime>;base64,` prefix.
pub fn decode_sample(encoded: &str) -> Result<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| PodcastError::InvalidAudioSample {
            message: e.to_string(),
        })?;
    if bytes.is_empty() {
        return Err(PodcastError::InvalidAudioSample {
            message: "sample is empty".to_string(),
        });
    }
    Ok(bytes)
}

/// Synthesize every line in order, one call at a time.
///
/// Emits one `log` event per line before its call starts. The i-th chunk
/// belongs to the i-th line.
pub async fn synthesize_script(
    synthesizer: &dyn SpeechSynthesizer,
    script: &[DialogueLine],
    voices: &VoiceMap,
    sink: &dyn EventSink,
) -> Result<Vec<Vec<u8>>> {
    let total = script.len();
    let mut chunks = Vec::with_capacity(total);
    for (i, line) in script.iter().enumerate() {
        sink.emit(ProgressEvent::log(format!(
            "Synthesizing line {}/{} ({})",
            i + 1,
            total,
            line.role
        )));
        let chunk = synthesizer
            .synthesize(&line.text, voices.voice_for(line.role))
            .await?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Byte-level concatenation in order. No container re-muxing happens here,
/// so the result is only as playable as the encoder's frames are
/// self-delimiting (true for MP3).
pub fn concatenate(chunks: Vec<Vec<u8>>) -> Vec<u8> {
    chunks.concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::sink::CollectorSink;
    use crate::pipeline::types::Post;
    use crate::upstream::{MockCloner, MockFetcher, MockGenerator, MockSynthesizer};

    struct Fixture {
        pipeline: Pipeline,
        synth: Arc<MockSynthesizer>,
        cloner: Arc<MockCloner>,
    }

    fn fixture(fetcher: MockFetcher, generator: MockGenerator, synth: MockSynthesizer) -> Fixture {
        let synth = Arc::new(synth);
        let cloner = Arc::new(MockCloner::new("v1"));
        let upstreams = Upstreams {
            fetcher: Arc::new(fetcher),
            generator: Arc::new(generator),
            cloner: cloner.clone(),
            synthesizer: synth.clone(),
        };
        Fixture {
            pipeline: Pipeline::new(
                upstreams,
                Arc::new(ArtifactStore::new()),
                PipelineConfig::default(),
            ),
            synth,
            cloner,
        }
    }

    fn two_posts() -> MockFetcher {
        MockFetcher::new(vec![
            Post::new("1", "first post", ""),
            Post::new("2", "second post", ""),
        ])
    }

    fn sample() -> String {
        BASE64.encode(b"ID3 fake mp3")
    }

    #[test]
    fn test_voice_map_is_deterministic() {
        let voices = VoiceMap::new(VoiceId::new("host"), VoiceId::new("guest"));
        assert_eq!(voices.voice_for(Role::Host).as_str(), "host");
        assert_eq!(voices.voice_for(Role::Guest).as_str(), "guest");
        assert_eq!(voices.voice_for(Role::Host), voices.voice_for(Role::Host));
    }

    #[test]
    fn test_concatenate_preserves_order_and_length() {
        let chunks = vec![b"ab".to_vec(), Vec::new(), b"cde".to_vec()];
        let total: usize = chunks.iter().map(Vec::len).sum();
        let audio = concatenate(chunks);
        assert_eq!(audio, b"abcde");
        assert_eq!(audio.len(), total);
    }

    #[test]
    fn test_decode_sample_plain_and_data_url() {
        assert_eq!(decode_sample("aGk=").unwrap(), b"hi");
        assert_eq!(decode_sample("data:audio/mpeg;base64,aGk=").unwrap(), b"hi");
    }

    #[test]
    fn test_decode_sample_rejects_garbage() {
        assert!(matches!(
            decode_sample("!!not base64!!"),
            Err(PodcastError::InvalidAudioSample { .. })
        ));
    }

    #[test]
    fn test_require_treats_blank_as_missing() {
        assert!(require(Some("  ".to_string()), "userId").is_err());
        assert!(require(None, "userId").is_err());
        assert_eq!(require(Some("42".to_string()), "userId").unwrap(), "42");
    }

    #[tokio::test]
    async fn test_successful_run_emits_complete_last() {
        let f = fixture(
            two_posts(),
            MockGenerator::new(vec![DialogueLine::host("Hi"), DialogueLine::guest("Hello")]),
            MockSynthesizer::new(),
        );
        let sink = CollectorSink::new();

        let completed = f
            .pipeline
            .run(GenerateRequest::new("42", sample()), &sink)
            .await
            .unwrap();

        let events = sink.events();
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(
            events.last(),
            Some(&ProgressEvent::Complete {
                audio_id: completed.audio_id.clone(),
                script: completed.script.clone(),
            })
        );

        let stored = f.pipeline.store().get(&completed.audio_id).unwrap();
        let host = VoiceId::new(defaults::HOST_VOICE_ID);
        let guest = VoiceId::new("v1");
        let mut expected = MockSynthesizer::chunk_for("Hi", &host);
        expected.extend(MockSynthesizer::chunk_for("Hello", &guest));
        assert_eq!(&*stored, expected.as_slice());
        assert_eq!(f.cloner.samples(), vec![b"ID3 fake mp3".to_vec()]);
    }

    #[tokio::test]
    async fn test_one_log_per_line_with_index_and_role() {
        let f = fixture(
            two_posts(),
            MockGenerator::new(vec![
                DialogueLine::host("a"),
                DialogueLine::guest("b"),
                DialogueLine::host("c"),
            ]),
            MockSynthesizer::new(),
        );
        let sink = CollectorSink::new();
        f.pipeline
            .run(GenerateRequest::new("42", sample()), &sink)
            .await
            .unwrap();

        let line_logs: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Log { message } if message.starts_with("Synthesizing") => {
                    Some(message)
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            line_logs,
            vec![
                "Synthesizing line 1/3 (host)",
                "Synthesizing line 2/3 (guest)",
                "Synthesizing line 3/3 (host)",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_user_id_fails_before_any_call() {
        let f = fixture(two_posts(), MockGenerator::default(), MockSynthesizer::new());
        let sink = CollectorSink::new();
        let request = GenerateRequest {
            user_id: None,
            audio_sample: Some(sample()),
        };

        let err = f.pipeline.run(request, &sink).await.unwrap_err();

        assert!(matches!(err, PodcastError::MissingField { field: "userId" }));
        assert_eq!(
            sink.events(),
            vec![ProgressEvent::error("Missing required field: userId")]
        );
        assert!(f.cloner.samples().is_empty());
        assert!(f.pipeline.store().is_empty());
    }

    #[tokio::test]
    async fn test_synthesis_failure_stores_nothing() {
        let f = fixture(
            two_posts(),
            MockGenerator::new(vec![DialogueLine::host("a"), DialogueLine::guest("b")]),
            MockSynthesizer::new().with_failure_at(1),
        );
        let sink = CollectorSink::new();

        let result = f
            .pipeline
            .run(GenerateRequest::new("42", sample()), &sink)
            .await;

        assert!(result.is_err());
        assert_eq!(f.synth.calls().len(), 2);
        assert!(f.pipeline.store().is_empty());
        assert_eq!(
            sink.last(),
            Some(ProgressEvent::error(
                "MiniMax TTS call failed: mock synthesis failure"
            ))
        );
    }

    #[tokio::test]
    async fn test_invalid_sample_fails_after_script_before_clone() {
        let f = fixture(
            two_posts(),
            MockGenerator::new(vec![DialogueLine::host("a")]),
            MockSynthesizer::new(),
        );
        let sink = CollectorSink::new();

        let err = f
            .pipeline
            .run(GenerateRequest::new("42", "%%%"), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PodcastError::InvalidAudioSample { .. }));
        assert!(f.cloner.samples().is_empty());
        assert!(f.synth.calls().is_empty());
    }
}
