//! End-to-end tests for submission, the enrichment pipeline and status tracking.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use common::{ConfigBuilder, EvaluationBuilder, FakeScorer, FakeTranscriber, Reply, TestHarness};
use grader::questions::UNKNOWN_QUESTION;
use grader::{GraderError, JobStatus, StoreError, WorkerError};

#[tokio::test]
async fn submitted_answer_is_transcribed_and_scored() {
    let transcriber = FakeTranscriber::new();
    transcriber.script(
        "ada.webm",
        Reply::Ok("I am a software engineer.".to_string()),
    );
    let harness = TestHarness::with_fakes(ConfigBuilder::new().build(), transcriber, FakeScorer::new());
    let media = harness.write_media("ada.webm");

    let ack = harness
        .grader
        .submit(&media, 0, Some("Ada".to_string()))
        .unwrap();
    assert_eq!(ack.status, JobStatus::Pending);

    // Nothing has run yet on the current-thread runtime
    let pending = harness.grader.get(&ack.id).unwrap();
    assert_eq!(pending.status, JobStatus::Pending);
    assert_eq!(pending.candidate_name, "Ada");
    assert!(pending.transcript.is_none());
    assert!(pending.evaluation.is_none());

    let job = harness.wait_settled(&ack.id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.transcript.as_deref(), Some("I am a software engineer."));
    let evaluation = job.evaluation.expect("completed job has an evaluation");
    assert!((1..=5).contains(&evaluation.overall_score));
    assert!(!evaluation.justification.is_empty());
    assert!(job.error.is_none());

    assert_eq!(
        harness.scorer.calls(),
        vec![(
            "Tell us about yourself".to_string(),
            "I am a software engineer.".to_string()
        )]
    );
}

#[tokio::test]
async fn missing_media_fails_without_transcript() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let media = harness.media_dir.join("never-uploaded.webm");

    let ack = harness.grader.submit(&media, 1, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.transcript.is_none());
    assert!(job.evaluation.is_none());
    assert!(job.error.unwrap().starts_with("transcription: "));
    assert_eq!(job.candidate_name, "Anonymous");
    assert_eq!(harness.transcriber.calls(), 0);
    assert!(harness.scorer.calls().is_empty());
}

#[tokio::test]
async fn non_media_file_is_rejected() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let notes = harness.write_media("notes.txt");

    let ack = harness.grader.submit(&notes, 0, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("not an audio or video type"));
}

#[tokio::test]
async fn transcription_failure_stops_pipeline() {
    let transcriber = FakeTranscriber::new();
    transcriber.script("a.webm", Reply::Fail("upstream unavailable".to_string()));
    let harness = TestHarness::with_fakes(ConfigBuilder::new().build(), transcriber, FakeScorer::new());
    let media = harness.write_media("a.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.transcript.is_none());
    assert!(job.evaluation.is_none());
    assert!(harness.scorer.calls().is_empty());
}

#[tokio::test]
async fn scoring_failure_keeps_transcript() {
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().build(),
        FakeTranscriber::new(),
        FakeScorer::replying(Reply::Malformed("not json".to_string())),
    );
    let media = harness.write_media("b.webm");

    let ack = harness.grader.submit(&media, 2, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.transcript.as_deref(), Some("Answer from b.webm"));
    assert!(job.evaluation.is_none());
    assert!(job.error.unwrap().starts_with("evaluation: "));
}

#[tokio::test]
async fn out_of_range_scores_fail_the_job() {
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().build(),
        FakeTranscriber::new(),
        FakeScorer::replying(Reply::Ok(EvaluationBuilder::new().overall(7).build())),
    );
    let media = harness.write_media("c.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.evaluation.is_none());
    assert!(job.error.unwrap().contains("overall_score"));
}

#[tokio::test]
async fn empty_justification_fails_the_job() {
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().build(),
        FakeTranscriber::new(),
        FakeScorer::replying(Reply::Ok(EvaluationBuilder::new().justification("  ").build())),
    );
    let media = harness.write_media("d.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;
    assert_eq!(job.status, JobStatus::Failed);
}

#[tokio::test]
async fn stage_timeout_fails_the_job() {
    let transcriber = FakeTranscriber::new();
    transcriber.script("slow.webm", Reply::Hang);
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().stage_timeout_secs(1).build(),
        transcriber,
        FakeScorer::new(),
    );
    let media = harness.write_media("slow.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("timed out"));
    assert!(job.transcript.is_none());
}

#[tokio::test]
async fn unknown_question_index_is_scored_against_fallback_text() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let media = harness.write_media("e.webm");

    let ack = harness.grader.submit(&media, 99, None).unwrap();
    let job = harness.wait_settled(&ack.id).await;

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.question_index, 99);
    assert_eq!(harness.scorer.calls()[0].0, UNKNOWN_QUESTION);
}

#[tokio::test]
async fn configured_questions_are_used() {
    let harness = TestHarness::new(
        ConfigBuilder::new()
            .questions(&["Describe a hard bug you fixed"])
            .build(),
    );
    let media = harness.write_media("f.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    harness.wait_settled(&ack.id).await;
    assert_eq!(harness.scorer.calls()[0].0, "Describe a hard bug you fixed");
}

#[tokio::test]
async fn list_returns_every_submission_in_order() {
    let harness = TestHarness::new(ConfigBuilder::new().build());

    let ids: Vec<String> = ["one.webm", "two.webm", "three.webm"]
        .iter()
        .map(|name| {
            let media = harness.write_media(name);
            harness.grader.submit(&media, 0, None).unwrap().id
        })
        .collect();

    let listed: Vec<String> = harness.grader.list().into_iter().map(|j| j.id).collect();
    assert_eq!(listed, ids);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 3);

    for id in &ids {
        harness.wait_settled(id).await;
    }
    assert_eq!(harness.grader.counts().completed, 3);
}

#[tokio::test]
async fn unknown_job_lookup_has_no_side_effects() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let media = harness.write_media("g.webm");
    let ack = harness.grader.submit(&media, 0, None).unwrap();

    assert!(harness.grader.get("no-such-job").is_none());
    match harness.grader.require("no-such-job") {
        Err(GraderError::Store(StoreError::UnknownJob(id))) => assert_eq!(id, "no-such-job"),
        other => panic!("expected UnknownJob, got {:?}", other),
    }

    let job = harness.wait_settled(&ack.id).await;
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(harness.grader.list().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_jobs_do_not_interfere() {
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().worker_count(4).build(),
        FakeTranscriber::with_delay(Duration::from_millis(100)),
        FakeScorer::new(),
    );

    let submissions: Vec<(String, String)> = (0..8)
        .map(|i| {
            let name = format!("answer-{}.webm", i);
            let media = harness.write_media(&name);
            let id = harness.grader.submit(&media, i % 5, None).unwrap().id;
            (id, name)
        })
        .collect();

    for (id, name) in &submissions {
        let job = harness.wait_settled(id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.transcript, Some(format!("Answer from {}", name)));
        assert!(job.media_ref.ends_with(name));
    }
    assert!(harness.transcriber.max_in_flight() > 1);
    assert!(harness.transcriber.max_in_flight() <= 4);
}

#[tokio::test]
async fn progress_events_follow_the_lifecycle() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let mut events = harness.grader.subscribe();
    let media = harness.write_media("h.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    harness.wait_settled(&ack.id).await;
    harness.grader.shutdown().await;

    let mut statuses = Vec::new();
    let mut stages = Vec::new();
    while let Ok(event) = events.try_recv() {
        assert_eq!(event.job_id, ack.id);
        if let Some(stage) = event.stage {
            stages.push(stage);
        }
        statuses.push(event.status);
    }

    assert_eq!(statuses.first(), Some(&JobStatus::Pending));
    assert_eq!(statuses.get(1), Some(&JobStatus::Processing));
    assert_eq!(statuses.last(), Some(&JobStatus::Completed));
    assert_eq!(stages, vec!["transcription", "evaluation"]);
}

#[tokio::test]
async fn shutdown_drains_queue_and_rejects_new_work() {
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().worker_count(1).build(),
        FakeTranscriber::with_delay(Duration::from_millis(20)),
        FakeScorer::new(),
    );
    let ids: Vec<String> = (0..3)
        .map(|i| {
            let media = harness.write_media(&format!("q{}.webm", i));
            harness.grader.submit(&media, 0, None).unwrap().id
        })
        .collect();

    harness.grader.shutdown().await;

    for id in &ids {
        assert_eq!(harness.grader.get(id).unwrap().status, JobStatus::Completed);
    }

    let media = harness.write_media("late.webm");
    let result = harness.grader.submit(&media, 0, None);
    assert!(matches!(
        result,
        Err(GraderError::Worker(WorkerError::ChannelClosed))
    ));
    assert_eq!(harness.grader.list().len(), 3);
}

#[tokio::test]
async fn panicking_transcriber_fails_only_its_job() {
    let transcriber = FakeTranscriber::new();
    transcriber.script("crash.webm", Reply::Panic("codec crashed".to_string()));
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().worker_count(1).build(),
        transcriber,
        FakeScorer::new(),
    );
    let crash = harness.write_media("crash.webm");
    let fine = harness.write_media("fine.webm");

    let crashed = harness.grader.submit(&crash, 0, None).unwrap().id;
    let next = harness.grader.submit(&fine, 0, None).unwrap().id;

    let job = harness.wait_settled(&crashed).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(
        job.error.as_deref(),
        Some("transcription: panicked: codec crashed")
    );
    assert!(job.transcript.is_none());

    // The single worker survived and picked up the next job
    let job = harness.wait_settled(&next).await;
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn zero_progress_capacity_does_not_break_the_grader() {
    let mut config = ConfigBuilder::new().build();
    config.pipeline.progress_capacity = 0;
    let harness = TestHarness::new(config);
    let mut events = harness.grader.subscribe();
    let media = harness.write_media("z.webm");

    let ack = harness.grader.submit(&media, 0, None).unwrap();
    assert_eq!(events.recv().await.unwrap().job_id, ack.id);
    assert_eq!(
        harness.wait_settled(&ack.id).await.status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn abort_fails_unsettled_jobs_without_waiting() {
    let transcriber = FakeTranscriber::new();
    transcriber.script("stuck.webm", Reply::Hang);
    let harness = TestHarness::with_fakes(
        ConfigBuilder::new().worker_count(1).stage_timeout_secs(3600).build(),
        transcriber,
        FakeScorer::new(),
    );
    let stuck = harness.write_media("stuck.webm");
    let queued = harness.write_media("queued.webm");
    let ids = [
        harness.grader.submit(&stuck, 0, None).unwrap().id,
        harness.grader.submit(&queued, 0, None).unwrap().id,
    ];
    tokio::time::sleep(Duration::from_millis(50)).await;

    tokio::time::timeout(Duration::from_secs(2), harness.grader.abort("interrupted"))
        .await
        .expect("abort must not wait for running stages");

    for id in &ids {
        let job = harness.grader.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("interrupted"));
    }
    let media = harness.write_media("late.webm");
    assert!(harness.grader.submit(&media, 0, None).is_err());
}

#[tokio::test]
async fn job_serializes_with_camel_case_keys() {
    let harness = TestHarness::new(ConfigBuilder::new().build());
    let media = harness.write_media("i.webm");
    let ack = harness
        .grader
        .submit(&media, 3, Some("  Grace  ".to_string()))
        .unwrap();

    let pending = serde_json::to_value(harness.grader.get(&ack.id).unwrap()).unwrap();
    assert_eq!(pending["status"], "pending");
    assert_eq!(pending["questionIndex"], 3);
    assert_eq!(pending["candidateName"], "Grace");
    assert!(pending.get("transcript").is_none());
    assert!(pending.get("evaluation").is_none());

    let job = harness.wait_settled(&ack.id).await;
    let completed = serde_json::to_value(&job).unwrap();
    assert_eq!(completed["status"], "completed");
    assert!(completed["evaluation"]["overall_score"].is_u64());
    assert!(completed.get("createdAt").is_some());
    assert!(completed.get("updatedAt").is_some());

    let ack_json = serde_json::to_value(&ack).unwrap();
    assert_eq!(ack_json["status"], "pending");
    assert_eq!(ack_json["id"], ack.id.as_str());
}
