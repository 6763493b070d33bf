// tests/api_tests.rs

use std::sync::Arc;

use exam_trainer::{
    config::Config,
    models::{
        exam::{Exam, ExamType},
        exam_result::StoredResult,
        question::Question,
        user::Student,
    },
    routes,
    state::AppState,
    store::{Backend, MemoryExamStore},
    utils::jwt::sign_jwt,
};
use serde_json::{Value, json};

const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app(store: Arc<MemoryExamStore>) -> String {
    let config = Config {
        database_url: String::new(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        store_timeout_secs: 5,
        session_idle_secs: 600,
        bind_addr: "127.0.0.1:0".to_string(),
    };

    let backend: Arc<dyn Backend> = store;
    let app = routes::create_router(AppState::new(backend, config));

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn exam(id: i64, exam_type: ExamType, year: i32) -> Exam {
    Exam {
        id,
        title: format!("{} {}", exam_type, year),
        description: Some("Offizielle staatliche Prüfung".to_string()),
        exam_type,
        year,
    }
}

fn question(id: i64, order_index: i32, question_type: &str, options: Value, correct: &str) -> Question {
    serde_json::from_value(json!({
        "id": id,
        "question_text": format!("Frage {}", id),
        "options": options,
        "correct_answer": correct,
        "order_index": order_index,
        "question_type": question_type,
    }))
    .unwrap()
}

fn seeded_store() -> MemoryExamStore {
    MemoryExamStore::new()
        .with_exam(
            exam(1, ExamType::Urt, 2021),
            vec![question(10, 0, "Grammatik", json!(["A", "B"]), "A")],
        )
        .with_exam(
            exam(2, ExamType::Urt, 2023),
            vec![
                question(21, 0, "Grammatik", json!(["der", "die", "das"]), "die"),
                // Options stored as an encoded string.
                question(22, 1, "Landeskunde", json!("[\"Bonn\",\"Berlin\"]"), "Berlin"),
                question(23, 2, "Schriftlicher Ausdruck (E-mail)", Value::Null, ""),
            ],
        )
        .with_exam(exam(3, ExamType::Toc, 2022), vec![])
}

async fn create_session(client: &reqwest::Client, address: &str, token: Option<&str>) -> String {
    let mut request = client.post(format!("{}/api/sessions", address));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request.send().await.expect("Failed to create session");
    assert_eq!(response.status().as_u16(), 201);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["session"]["state"], "type_selection");
    body["session_id"].as_str().unwrap().to_string()
}

async fn post_json(
    client: &reqwest::Client,
    url: String,
    token: Option<&str>,
    body: Value,
) -> reqwest::Response {
    let mut request = client.post(url).json(&body);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("Failed to execute request")
}

async fn put_json(client: &reqwest::Client, url: String, body: Value) -> reqwest::Response {
    client
        .put(url)
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn full_exam_flow_is_saved_for_signed_in_student() {
    // Arrange
    let store = Arc::new(seeded_store());
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();
    let token = sign_jwt(42, "student", JWT_SECRET, 600).unwrap();
    let token = Some(token.as_str());
    let id = create_session(&client, &address, token).await;
    let base = format!("{}/api/sessions/{}", address, id);

    // 1. Type selection lists newest exams first
    let view: Value = post_json(&client, format!("{}/type", base), token, json!({"exam_type": "URT"}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "exam_selection");
    let years: Vec<i64> = view["exams"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![2023, 2021]);

    // 2. Start the 2023 exam
    let view: Value = post_json(&client, format!("{}/exam", base), token, json!({"exam_id": 2}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["state"], "quiz");
    assert_eq!(view["position"], 1);
    assert_eq!(view["total_questions"], 3);
    assert!(view["question"].get("correct_answer").is_none());

    // 3. Right answer
    let response = put_json(&client, format!("{}/option", base), json!({"option": "die"})).await;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = post_json(&client, format!("{}/confirm", base), token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["outcome"], "advanced");
    assert_eq!(body["outcome"]["feedback"]["correct"], true);

    // 4. Wrong answer; options were decoded from an encoded string
    assert_eq!(body["session"]["question"]["options"], json!(["Bonn", "Berlin"]));
    put_json(&client, format!("{}/option", base), json!({"option": "Bonn"})).await;
    let body: Value = post_json(&client, format!("{}/confirm", base), token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["feedback"]["correct"], false);
    assert_eq!(body["outcome"]["feedback"]["correct_answer"], "Berlin");

    // 5. Written answer with one word is rejected
    put_json(&client, format!("{}/written", base), json!({"text": "Hallo"})).await;
    let body: Value = post_json(&client, format!("{}/confirm", base), token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["outcome"], "rejected");
    assert_eq!(body["session"]["position"], 3);

    // 6. Written answer with enough words finishes the exam
    put_json(
        &client,
        format!("{}/written", base),
        json!({"text": "Liebe Anna, ich bin fertig"}),
    )
    .await;
    let body: Value = post_json(&client, format!("{}/confirm", base), token, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["outcome"]["outcome"], "finished");
    assert_eq!(body["session"]["state"], "result");
    assert_eq!(body["session"]["score"], 2);
    assert_eq!(body["session"]["total_questions"], 3);
    assert_eq!(body["session"]["percentage"], 67);
    assert_eq!(body["session"]["verdict"], "passed");
    assert_eq!(body["session"]["saved"]["status"], "saved");

    // Assert the stored record
    let saved = store.saved_results();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].user_id, 42);
    assert_eq!(saved[0].exam_id, 2);
    assert_eq!(saved[0].score, 2);
    assert_eq!(saved[0].total_questions, 3);
    let details: Vec<i64> = saved[0].details.iter().map(|a| a.question_id).collect();
    assert_eq!(details, vec![21, 22, 23]);
}

#[tokio::test]
async fn another_student_cannot_claim_a_finished_result() {
    // Arrange: the first write fails, so the result waits for a retry
    let store = Arc::new(seeded_store());
    store.set_fail_writes(true);
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();
    let owner = sign_jwt(42, "student", JWT_SECRET, 600).unwrap();
    let other = sign_jwt(99, "student", JWT_SECRET, 600).unwrap();
    let (owner, other) = (Some(owner.as_str()), Some(other.as_str()));
    let id = create_session(&client, &address, owner).await;
    let base = format!("{}/api/sessions/{}", address, id);

    post_json(&client, format!("{}/type", base), owner, json!({"exam_type": "URT"})).await;
    post_json(&client, format!("{}/exam", base), owner, json!({"exam_id": 1})).await;
    put_json(&client, format!("{}/option", base), json!({"option": "A"})).await;
    let body: Value = post_json(&client, format!("{}/confirm", base), owner, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["session"]["saved"]["status"], "unsaved");
    store.set_fail_writes(false);

    // Act: another signed-in student retries the save
    let response = post_json(&client, format!("{}/save", base), other, json!({})).await;

    // Assert
    assert_eq!(response.status().as_u16(), 409);
    assert!(store.saved_results().is_empty());

    let body: Value = post_json(&client, format!("{}/save", base), owner, json!({}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["saved"]["status"], "saved");
    let saved = store.saved_results();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].user_id, 42);
}

#[tokio::test]
async fn written_answer_is_stored_as_typed() {
    let store = Arc::new(seeded_store());
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();
    let token = sign_jwt(7, "student", JWT_SECRET, 600).unwrap();
    let token = Some(token.as_str());
    let id = create_session(&client, &address, token).await;
    let base = format!("{}/api/sessions/{}", address, id);

    post_json(&client, format!("{}/type", base), token, json!({"exam_type": "URT"})).await;
    post_json(&client, format!("{}/exam", base), token, json!({"exam_id": 2})).await;
    put_json(&client, format!("{}/option", base), json!({"option": "die"})).await;
    post_json(&client, format!("{}/confirm", base), token, json!({})).await;
    put_json(&client, format!("{}/option", base), json!({"option": "Berlin"})).await;
    post_json(&client, format!("{}/confirm", base), token, json!({})).await;
    put_json(&client, format!("{}/written", base), json!({"text": "Tom & Jerry sind 3 < 5"})).await;
    post_json(&client, format!("{}/confirm", base), token, json!({})).await;

    let saved = store.saved_results();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].details[2].answer, "Tom & Jerry sind 3 < 5");
}

#[tokio::test]
async fn anonymous_result_is_shown_but_not_saved() {
    let store = Arc::new(seeded_store());
    let address = spawn_app(store.clone()).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &address, None).await;
    let base = format!("{}/api/sessions/{}", address, id);

    post_json(&client, format!("{}/type", base), None, json!({"exam_type": "URT"})).await;
    post_json(&client, format!("{}/exam", base), None, json!({"exam_id": 1})).await;
    put_json(&client, format!("{}/option", base), json!({"option": "A"})).await;
    let body: Value = post_json(&client, format!("{}/confirm", base), None, json!({}))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["session"]["score"], 1);
    assert_eq!(body["session"]["verdict"], "excellent");
    assert_eq!(body["session"]["saved"]["status"], "unsaved");
    assert_eq!(body["session"]["saved"]["reason"]["kind"], "anonymous");
    assert!(store.saved_results().is_empty());
}

#[tokio::test]
async fn empty_selections_keep_the_session_where_it_was() {
    let address = spawn_app(Arc::new(seeded_store())).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &address, None).await;
    let base = format!("{}/api/sessions/{}", address, id);

    // No TOC exam has questions, but one TOC exam exists
    let response = post_json(&client, format!("{}/type", base), None, json!({"exam_type": "TOC"})).await;
    assert_eq!(response.status().as_u16(), 200);

    let response = post_json(&client, format!("{}/exam", base), None, json!({"exam_id": 3})).await;
    assert_eq!(response.status().as_u16(), 404);

    let view: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(view["state"], "exam_selection");

    // Back twice returns to type selection; a third time is not allowed
    post_json(&client, format!("{}/back", base), None, json!({})).await;
    let view: Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert_eq!(view["state"], "type_selection");

    let response = post_json(&client, format!("{}/back", base), None, json!({})).await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn type_without_exams_is_not_found() {
    let address = spawn_app(Arc::new(MemoryExamStore::new())).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &address, None).await;

    let response = post_json(
        &client,
        format!("{}/api/sessions/{}/type", address, id),
        None,
        json!({"exam_type": "URT"}),
    )
    .await;

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No exams found for URT");
}

#[tokio::test]
async fn exited_session_is_gone() {
    let address = spawn_app(Arc::new(seeded_store())).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &address, None).await;
    let url = format!("{}/api/sessions/{}", address, id);

    let response = client.delete(&url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client.get(&url).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn oversized_written_answer_fails_validation() {
    let address = spawn_app(Arc::new(seeded_store())).await;
    let client = reqwest::Client::new();
    let id = create_session(&client, &address, None).await;

    let response = put_json(
        &client,
        format!("{}/api/sessions/{}/written", address, id),
        json!({"text": "wort ".repeat(2000)}),
    )
    .await;

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn leaderboard_and_personal_results() {
    let store = Arc::new(
        MemoryExamStore::new()
            .with_exam(exam(1, ExamType::Urt, 2021), vec![])
            .with_student(Student {
                id: 1,
                first_name: Some("Anna".to_string()),
                last_name: Some("Schmidt".to_string()),
            })
            .with_student(Student {
                id: 2,
                first_name: Some("Ben".to_string()),
                last_name: None,
            })
            .with_result(StoredResult {
                user_id: 2,
                exam_id: 1,
                exam_type: Some("URT".to_string()),
                score: 3,
                total_questions: 4,
                completed_at: None,
            }),
    );
    let address = spawn_app(store).await;
    let client = reqwest::Client::new();

    let board: Vec<Value> = client
        .get(format!("{}/api/leaderboard", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0]["name"], "Ben");
    assert_eq!(board[0]["average_score"], 75);
    assert_eq!(board[0]["rank_power"], 80);
    assert_eq!(board[1]["exams_taken"], 0);

    // Personal results need a token
    let response = client
        .get(format!("{}/api/results/me", address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let token = sign_jwt(2, "student", JWT_SECRET, 600).unwrap();
    let body: Value = client
        .get(format!("{}/api/results/me", address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["stats"]["exams_taken"], 1);
    assert_eq!(body["stats"]["verdict"], "passed");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}
