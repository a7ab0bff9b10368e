mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use blast_core::{JobId, JobState, PollPolicy, SearchJob, UnknownStatePolicy};
use blast_engine::{PipelineError, PipelineEvent, PollLoop};
use common::{transport_failure, CancellingSleeper, RecordingSleeper, ScriptedClient, TestSink};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_secs(300),
        ..PollPolicy::default()
    }
}

fn job() -> SearchJob {
    SearchJob::submitted(JobId::new("job-1"))
}

#[tokio::test]
async fn polls_until_finished() {
    let client = ScriptedClient::new(vec![
        JobState::Pending,
        JobState::Running,
        JobState::Running,
        JobState::Finished,
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let poll = PollLoop::with_sleeper(policy(), sleeper.clone());
    let sink = TestSink::new();
    let mut job = job();

    let summary = poll
        .wait_for_completion(&client, &mut job, &CancellationToken::new(), &sink)
        .await
        .expect("job finishes");

    assert_eq!(client.status_queries(), 4);
    assert_eq!(summary.status_queries, 4);
    assert_eq!(job.state(), &JobState::Finished);
    assert_eq!(
        *sleeper.sleeps.lock().unwrap(),
        vec![Duration::from_secs(300); 3]
    );

    let states: Vec<JobState> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            PipelineEvent::StatusChecked { state, .. } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            JobState::Pending,
            JobState::Running,
            JobState::Running,
            JobState::Finished
        ]
    );
}

#[tokio::test]
async fn error_state_fails_after_two_queries() {
    let client = ScriptedClient::new(vec![JobState::Pending, JobState::Error]);
    let poll = PollLoop::with_sleeper(policy(), Arc::new(RecordingSleeper::default()));
    let mut job = job();

    let err = poll
        .wait_for_completion(&client, &mut job, &CancellationToken::new(), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(client.status_queries(), 2);
    match err {
        PipelineError::JobFailed(failed) => {
            assert_eq!(failed.job_id, JobId::new("job-1"));
            assert_eq!(failed.state, JobState::Error);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn transient_status_failures_are_retried() {
    let client = ScriptedClient::with_results(
        vec![
            Err(transport_failure()),
            Ok(JobState::Running),
            Err(transport_failure()),
            Ok(JobState::Finished),
        ],
        Vec::new(),
    );
    let poll = PollLoop::with_sleeper(policy(), Arc::new(RecordingSleeper::default()));
    let sink = TestSink::new();

    poll.wait_for_completion(&client, &mut job(), &CancellationToken::new(), &sink)
        .await
        .expect("transient failures are retried");

    assert_eq!(client.status_queries(), 4);
    let unavailable = sink
        .take()
        .into_iter()
        .filter(|event| matches!(event, PipelineEvent::StatusUnavailable { .. }))
        .count();
    assert_eq!(unavailable, 2);
}

#[tokio::test]
async fn persistent_status_failures_exhaust_the_retry_budget() {
    let client = ScriptedClient::with_results(
        vec![
            Err(transport_failure()),
            Err(transport_failure()),
            Err(transport_failure()),
        ],
        Vec::new(),
    );
    let poll = PollLoop::with_sleeper(
        PollPolicy {
            max_consecutive_errors: 2,
            ..policy()
        },
        Arc::new(RecordingSleeper::default()),
    );

    let err = poll
        .wait_for_completion(&client, &mut job(), &CancellationToken::new(), &TestSink::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Poll { consecutive: 3, .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn max_wait_surfaces_timeout() {
    let client = ScriptedClient::new(vec![JobState::Running; 3]);
    let poll = PollLoop::with_sleeper(
        PollPolicy {
            max_wait: Some(Duration::from_secs(600)),
            ..policy()
        },
        Arc::new(RecordingSleeper::default()),
    );

    let err = poll
        .wait_for_completion(&client, &mut job(), &CancellationToken::new(), &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(client.status_queries(), 3);
    assert!(matches!(err, PipelineError::Timeout { .. }));
    assert_eq!(err.exit_code(), 5);
}

#[tokio::test]
async fn unknown_status_can_be_configured_to_fail() {
    let client = ScriptedClient::new(vec![JobState::Unknown("ARCHIVED".to_string())]);
    let poll = PollLoop::with_sleeper(
        PollPolicy {
            unknown_state: UnknownStatePolicy::Fail,
            ..policy()
        },
        Arc::new(RecordingSleeper::default()),
    );

    let err = poll
        .wait_for_completion(&client, &mut job(), &CancellationToken::new(), &TestSink::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnknownState { ref token, .. } if token == "ARCHIVED"));
}

#[tokio::test]
async fn cancellation_during_wait_stops_the_loop() {
    let token = CancellationToken::new();
    let client = ScriptedClient::new(vec![JobState::Running, JobState::Running, JobState::Finished]);
    let sleeper = Arc::new(CancellingSleeper {
        cancel_on: 2,
        token: token.clone(),
        calls: Mutex::new(0),
    });
    let poll = PollLoop::with_sleeper(policy(), sleeper);

    let err = poll
        .wait_for_completion(&client, &mut job(), &token, &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(client.status_queries(), 2);
    assert!(matches!(err, PipelineError::Cancelled { job_id: Some(_), .. }));
    assert_eq!(err.exit_code(), 6);
}

#[tokio::test]
async fn cancelled_token_prevents_any_query() {
    let token = CancellationToken::new();
    token.cancel();
    let client = ScriptedClient::new(vec![JobState::Finished]);
    let poll = PollLoop::with_sleeper(policy(), Arc::new(RecordingSleeper::default()));

    let err = poll
        .wait_for_completion(&client, &mut job(), &token, &TestSink::new())
        .await
        .unwrap_err();

    assert_eq!(client.status_queries(), 0);
    assert!(matches!(err, PipelineError::Cancelled { .. }));
}
