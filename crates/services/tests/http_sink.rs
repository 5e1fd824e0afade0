use serde_json::Value;
use services::{HttpSubmissionConfig, HttpSubmissionSink, SubmissionError, SubmissionSink};
use stress_core::model::{
    AnswerSet, Choice, MemberId, QUESTIONS, RespondentInfo, StressTestId, StressTestSubmission,
};
use stress_core::score;
use stress_core::time::fixed_now;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves a single HTTP exchange and hands back the request body.
async fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let request_body = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before full request");
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(split) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            let body_start = split + 4;
            if buf.len() >= body_start + length {
                assert!(text.starts_with("POST /api/stress-test "), "{text}");
                break buf[body_start..body_start + length].to_vec();
            }
        };

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        serde_json::from_slice(&request_body).unwrap()
    });

    (base_url, handle)
}

fn submission() -> StressTestSubmission {
    let answers: AnswerSet = QUESTIONS.iter().map(|q| (q.id, Choice::A)).collect();
    StressTestSubmission::new(
        Some(MemberId::new(12)),
        RespondentInfo::new("王小明", "技師", "2024-05-01"),
        score(&answers),
        answers,
        fixed_now(),
    )
}

fn sink(base_url: String) -> HttpSubmissionSink {
    HttpSubmissionSink::new(&HttpSubmissionConfig { base_url }).unwrap()
}

#[tokio::test]
async fn accepted_submission_returns_server_id() {
    let (base_url, server) =
        one_shot_server("200 OK", r#"{"success":true,"stress_id":41,"message":"ok"}"#).await;

    let id = sink(base_url).submit(&submission()).await.unwrap();
    assert_eq!(id, StressTestId::new(41));

    let sent = server.await.unwrap();
    assert_eq!(sent["member_id"], 12);
    assert_eq!(sent["name"], "王小明");
    assert_eq!(sent["test_date"], "2024-05-01");
    assert_eq!(sent["scores"]["a_score"], 3);
    assert_eq!(sent["scores"]["b_score"], 7);
    assert_eq!(sent["scores"]["total_score"], 20);
    assert_eq!(sent["answers"]["a1"], "A");
}

#[tokio::test]
async fn error_status_is_rejected_with_server_message() {
    let (base_url, server) = one_shot_server(
        "400 Bad Request",
        r#"{"success":false,"error":"缺少會員ID (member_id)"}"#,
    )
    .await;

    let err = sink(base_url).submit(&submission()).await.unwrap_err();
    let SubmissionError::Rejected { status, message } = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(status, Some(400));
    assert!(message.contains("member_id"));
    server.await.unwrap();
}

#[tokio::test]
async fn unsuccessful_body_is_rejected() {
    let (base_url, server) =
        one_shot_server("200 OK", r#"{"success":false,"error":"duplicate"}"#).await;

    let err = sink(base_url).submit(&submission()).await.unwrap_err();
    assert!(matches!(
        err,
        SubmissionError::Rejected { ref message, .. } if message == "duplicate"
    ));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_an_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = sink(base_url).submit(&submission()).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Http(_)));
}
