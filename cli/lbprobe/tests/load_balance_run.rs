//! End-to-end runs of the harness against a mocked scheduling service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lbprobe::client::SchedulerClient;
use lbprobe::config::Config;
use lbprobe::error::ProbeError;
use lbprobe::model::LoginCredentials;
use lbprobe::poller::{PollerConfig, Termination};
use lbprobe::submit::BatchPlan;
use lbprobe::{Harness, HarnessSettings};
use lbprobe_balance::ResourceId;
use serde_json::json;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Hands out `t-0`, `t-1`, ... and rejects the listed submission indices
/// with HTTP 200 and code -1, as the service does.
struct SubmitResponder {
    next: AtomicUsize,
    rejected: Vec<usize>,
}

impl Respond for SubmitResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        if self.rejected.contains(&index) {
            return ResponseTemplate::new(200).set_body_json(json!({
                "code": -1, "data": null, "message": "task submission failed"
            }));
        }
        ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "data": { "id": format!("t-{index}"), "status": 0 }, "message": "ok"
        }))
    }
}

/// Places task `t-n` on communication device `n % 4 + 1`.
struct PlacementResponder;

impl Respond for PlacementResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let id = request.url.path().rsplit('/').next().unwrap_or_default();
        let n: u32 = id.trim_start_matches("t-").parse().unwrap_or(0);
        ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": { "id": id, "assigned_comm_id": n % 4 + 1, "status": 2 },
            "message": "ok"
        }))
    }
}

async fn mount_control(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "data": { "token": "tok-e2e" }, "message": "ok"
        })))
        .expect(1)
        .mount(server)
        .await;

    for command in ["stop", "clear"] {
        Mock::given(method("POST"))
            .and(path(format!("/api/v1/algorithm/{command}")))
            .and(header("Authorization", "Bearer tok-e2e"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "data": null, "message": command
            })))
            .expect(1)
            .mount(server)
            .await;
    }
}

async fn mount_info(server: &MockServer, active_tasks: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/algorithm/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "time_slot": 9, "active_tasks": active_tasks, "completed_tasks": 7,
                "task_count": 7, "comm_count": 4, "user_count": 4, "is_running": true
            },
            "message": "ok"
        })))
        .mount(server)
        .await;
}

fn harness(server: &MockServer, count: usize, timeout: Duration) -> Harness<SchedulerClient> {
    let config = Config {
        api_url: format!("{}/api/v1", server.uri()),
        request_timeout_secs: 5,
        ..Config::default()
    };
    let settings = HarnessSettings {
        credentials: LoginCredentials::new("admin", "admin123"),
        batch: BatchPlan::new(count, vec![5, 6, 7, 8], 1000.0, "compute").unwrap(),
        poller: PollerConfig {
            settle_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(20),
            completion_timeout: timeout,
        },
        post_stop_delay: Duration::ZERO,
        title: "e2e".to_string(),
    };
    Harness::new(SchedulerClient::new(&config).unwrap(), settings)
}

fn rid(n: u32) -> ResourceId {
    ResourceId::new(n).unwrap()
}

#[tokio::test]
async fn run_aggregates_placements_and_skips_rejections() {
    let server = MockServer::start().await;
    mount_control(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/algorithm/tasks"))
        .respond_with(SubmitResponder {
            next: AtomicUsize::new(0),
            rejected: vec![3],
        })
        .expect(8)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/algorithm/tasks/t-\d+$"))
        .respond_with(PlacementResponder)
        .expect(7)
        .mount(&server)
        .await;
    mount_info(&server, 0).await;

    let report = harness(&server, 8, Duration::from_secs(5)).run().await.unwrap();

    assert_eq!(report.requested, 8);
    assert_eq!(report.submitted.len(), 7);
    assert_eq!(report.submission_failures.len(), 1);
    assert_eq!(report.submission_failures[0].index, 3);
    assert_eq!(report.submission_failures[0].request.user_id, 8);

    assert_eq!(report.placed(), 7);
    assert_eq!(report.unplaced, 0);
    assert_eq!(report.distribution.count(rid(1)), 2);
    assert_eq!(report.distribution.count(rid(2)), 2);
    assert_eq!(report.distribution.count(rid(3)), 2);
    assert_eq!(report.distribution.count(rid(4)), 1);
    assert!(matches!(report.termination, Termination::Done { .. }));
    assert_eq!(report.last_snapshot().map(|s| s.time_slot), Some(9));

    let user_ids: Vec<u64> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/api/v1/algorithm/tasks")
        .map(|r| r.body_json::<serde_json::Value>().unwrap()["user_id"].as_u64().unwrap())
        .collect();
    assert_eq!(user_ids, vec![5, 6, 7, 8, 5, 6, 7, 8]);
}

#[tokio::test]
async fn run_times_out_when_service_never_drains() {
    let server = MockServer::start().await;
    mount_control(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/algorithm/tasks"))
        .respond_with(SubmitResponder {
            next: AtomicUsize::new(0),
            rejected: vec![],
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v1/algorithm/tasks/t-\d+$"))
        .respond_with(PlacementResponder)
        .mount(&server)
        .await;
    mount_info(&server, 2).await;

    let report = harness(&server, 4, Duration::from_millis(150))
        .run()
        .await
        .unwrap();

    assert!(report.termination.is_timed_out());
    assert_eq!(report.placed(), 4);
    assert_eq!(report.statistic.std_dev, Some(0.0));
}

#[tokio::test]
async fn run_fails_when_every_submission_is_rejected() {
    let server = MockServer::start().await;
    mount_control(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/algorithm/tasks"))
        .respond_with(SubmitResponder {
            next: AtomicUsize::new(0),
            rejected: vec![0, 1],
        })
        .mount(&server)
        .await;

    let err = harness(&server, 2, Duration::from_secs(1))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::NoTasksAccepted { requested: 2 }));
}

#[tokio::test]
async fn run_aborts_on_login_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 40100, "data": null, "message": "invalid username or password"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/algorithm/stop"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = harness(&server, 2, Duration::from_secs(1))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Login(_)));
}
