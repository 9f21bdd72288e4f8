use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use weibodcast::defaults::HOST_VOICE_ID;
use weibodcast::upstream::{MockCloner, MockFetcher, MockGenerator, MockSynthesizer};
use weibodcast::{
    ArtifactStore, CollectorSink, DialogueLine, GenerateRequest, Pipeline, PipelineConfig,
    PodcastError, Post, ProgressEvent, Upstreams, VoiceId,
};

struct Harness {
    pipeline: Pipeline,
    fetcher: Arc<MockFetcher>,
    generator: Arc<MockGenerator>,
    cloner: Arc<MockCloner>,
    synth: Arc<MockSynthesizer>,
}

impl Harness {
    fn new(fetcher: MockFetcher, generator: MockGenerator, cloner: MockCloner) -> Self {
        Self::with_store(fetcher, generator, cloner, Arc::new(ArtifactStore::new()))
    }

    fn with_store(
        fetcher: MockFetcher,
        generator: MockGenerator,
        cloner: MockCloner,
        store: Arc<ArtifactStore>,
    ) -> Self {
        let fetcher = Arc::new(fetcher);
        let generator = Arc::new(generator);
        let cloner = Arc::new(cloner);
        let synth = Arc::new(MockSynthesizer::new());
        let upstreams = Upstreams {
            fetcher: fetcher.clone(),
            generator: generator.clone(),
            cloner: cloner.clone(),
            synthesizer: synth.clone(),
        };
        Self {
            pipeline: Pipeline::new(upstreams, store, PipelineConfig::default()),
            fetcher,
            generator,
            cloner,
            synth,
        }
    }
}

fn two_posts() -> MockFetcher {
    MockFetcher::new(vec![
        Post::new("1", "Went hiking today", "Mon Jan 01"),
        Post::new("2", "Finished my novel", "Tue Jan 02"),
    ])
}

fn sample_b64() -> String {
    BASE64.encode(b"RIFF small voice sample")
}

fn terminal_count(events: &[ProgressEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

#[tokio::test]
async fn two_line_script_produces_ordered_synthesis_and_complete() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::new(vec![DialogueLine::host("Hi"), DialogueLine::guest("Hello")]),
        MockCloner::new("v1"),
    );
    let sink = CollectorSink::new();

    let completed = h
        .pipeline
        .run(GenerateRequest::new("42", sample_b64()), &sink)
        .await
        .unwrap();

    assert_eq!(h.fetcher.calls(), vec!["42".to_string()]);
    assert_eq!(
        h.synth.calls(),
        vec![
            ("Hi".to_string(), VoiceId::new(HOST_VOICE_ID)),
            ("Hello".to_string(), VoiceId::new("v1")),
        ]
    );

    let events = sink.events();
    assert_eq!(terminal_count(&events), 1);
    match events.last() {
        Some(ProgressEvent::Complete { audio_id, script }) => {
            assert_eq!(audio_id, &completed.audio_id);
            assert_eq!(
                script,
                &vec![DialogueLine::host("Hi"), DialogueLine::guest("Hello")]
            );
        }
        other => panic!("expected complete event last, got {other:?}"),
    }
}

#[tokio::test]
async fn stored_audio_is_concatenation_of_line_chunks() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::new(vec![
            DialogueLine::host("Welcome"),
            DialogueLine::guest("Thanks"),
            DialogueLine::host("Bye"),
        ]),
        MockCloner::new("v1"),
    );

    let completed = h
        .pipeline
        .run(GenerateRequest::new("42", sample_b64()), &CollectorSink::new())
        .await
        .unwrap();

    let chunks: Vec<Vec<u8>> = h
        .synth
        .calls()
        .iter()
        .map(|(text, voice)| MockSynthesizer::chunk_for(text, voice))
        .collect();
    let expected_len: usize = chunks.iter().map(Vec::len).sum();
    let stored = h.pipeline.store().get(&completed.audio_id).unwrap();

    assert_eq!(h.synth.calls().len(), completed.script.len());
    assert_eq!(stored.len(), expected_len);
    assert_eq!(&*stored, chunks.concat().as_slice());
}

#[tokio::test]
async fn empty_post_list_fails_without_synthesis() {
    let h = Harness::new(
        MockFetcher::new(Vec::new()),
        MockGenerator::new(vec![DialogueLine::host("never")]),
        MockCloner::new("v1"),
    );
    let sink = CollectorSink::new();

    let err = h
        .pipeline
        .run(GenerateRequest::new("42", sample_b64()), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, PodcastError::EmptyResult { .. }));
    let events = sink.events();
    assert_eq!(terminal_count(&events), 1);
    assert_eq!(
        events.last(),
        Some(&ProgressEvent::error("No posts found for this user"))
    );
    assert_eq!(h.generator.call_count(), 0);
    assert!(h.synth.calls().is_empty());
    assert!(h.pipeline.store().is_empty());
}

#[tokio::test]
async fn unprefixed_lines_are_dropped_from_script() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::from_transcript(
            "Here is your script:\nHOST: Welcome back\n\nGUEST: Glad to be here\n(laughs)",
        ),
        MockCloner::new("v1"),
    );

    let completed = h
        .pipeline
        .run(GenerateRequest::new("42", sample_b64()), &CollectorSink::new())
        .await
        .unwrap();

    assert_eq!(
        completed.script,
        vec![
            DialogueLine::host("Welcome back"),
            DialogueLine::guest("Glad to be here"),
        ]
    );
}

#[tokio::test]
async fn script_with_no_recognized_lines_is_empty_result() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::from_transcript("Sorry, I cannot help with that."),
        MockCloner::new("v1"),
    );
    let sink = CollectorSink::new();

    let err = h
        .pipeline
        .run(GenerateRequest::new("42", sample_b64()), &sink)
        .await
        .unwrap_err();

    assert!(matches!(err, PodcastError::EmptyResult { .. }));
    assert!(h.cloner.samples().is_empty());
    assert!(h.synth.calls().is_empty());
    assert!(h.pipeline.store().is_empty());
    assert_eq!(terminal_count(&sink.events()), 1);
}

#[tokio::test]
async fn missing_audio_sample_is_rejected_before_fetch() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::default(),
        MockCloner::new("v1"),
    );
    let sink = CollectorSink::new();
    let request = GenerateRequest::from_json(r#"{"userId":"42","audioSample":""}"#).unwrap();

    let err = h.pipeline.run(request, &sink).await.unwrap_err();

    assert!(matches!(
        err,
        PodcastError::MissingField {
            field: "audioSample"
        }
    ));
    assert!(h.fetcher.calls().is_empty());
    assert_eq!(
        sink.events(),
        vec![ProgressEvent::error("Missing required field: audioSample")]
    );
}

#[tokio::test]
async fn upstream_failures_end_with_single_error_event() {
    let cases: Vec<(MockFetcher, MockGenerator, MockCloner, &str)> = vec![
        (
            MockFetcher::default().with_failure("cookie expired"),
            MockGenerator::default(),
            MockCloner::new("v1"),
            "Weibo call failed: cookie expired",
        ),
        (
            two_posts(),
            MockGenerator::default().with_failure("quota exceeded"),
            MockCloner::new("v1"),
            "LLM call failed: quota exceeded",
        ),
        (
            two_posts(),
            MockGenerator::new(vec![DialogueLine::host("Hi")]),
            MockCloner::new("v1").with_failure("sample too short"),
            "MiniMax voice clone call failed: sample too short",
        ),
    ];

    for (fetcher, generator, cloner, expected) in cases {
        let h = Harness::new(fetcher, generator, cloner);
        let sink = CollectorSink::new();

        let result = h
            .pipeline
            .run(GenerateRequest::new("42", sample_b64()), &sink)
            .await;

        assert!(result.is_err());
        let events = sink.events();
        assert_eq!(terminal_count(&events), 1, "{expected}");
        assert_eq!(events.last(), Some(&ProgressEvent::error(expected)));
        assert!(h.synth.calls().is_empty());
        assert!(h.pipeline.store().is_empty());
    }
}

#[tokio::test]
async fn concurrent_runs_use_their_own_cloned_voice() {
    let store = Arc::new(ArtifactStore::new());
    let script = vec![DialogueLine::host("Hi"), DialogueLine::guest("Hello")];
    let alice = Harness::with_store(
        two_posts(),
        MockGenerator::new(script.clone()),
        MockCloner::new("voice-alice"),
        store.clone(),
    );
    let bob = Harness::with_store(
        two_posts(),
        MockGenerator::new(script),
        MockCloner::new("voice-bob"),
        store.clone(),
    );

    let sink_a = CollectorSink::new();
    let sink_b = CollectorSink::new();
    let (a, b) = tokio::join!(
        alice
            .pipeline
            .run(GenerateRequest::new("alice", sample_b64()), &sink_a),
        bob.pipeline
            .run(GenerateRequest::new("bob", sample_b64()), &sink_b),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.audio_id, b.audio_id);
    assert_eq!(store.len(), 2);
    assert_eq!(alice.synth.calls()[1].1, VoiceId::new("voice-alice"));
    assert_eq!(bob.synth.calls()[1].1, VoiceId::new("voice-bob"));
    assert_eq!(alice.synth.calls()[0].1, VoiceId::new(HOST_VOICE_ID));
    assert_eq!(bob.synth.calls()[0].1, VoiceId::new(HOST_VOICE_ID));
}

#[tokio::test]
async fn progress_logs_precede_terminal_event() {
    let h = Harness::new(
        two_posts(),
        MockGenerator::new(vec![DialogueLine::host("Hi"), DialogueLine::guest("Hello")]),
        MockCloner::new("v1"),
    );
    let sink = CollectorSink::new();

    h.pipeline
        .run(GenerateRequest::new("42", sample_b64()), &sink)
        .await
        .unwrap();

    let events = sink.events();
    let (last, logs) = events.split_last().unwrap();
    assert!(last.is_terminal());
    assert!(logs.iter().all(|e| matches!(e, ProgressEvent::Log { .. })));
    assert!(logs.contains(&ProgressEvent::log("Fetched 2 posts")));
    assert!(logs.contains(&ProgressEvent::log("Guest voice cloned: v1")));
}
