use std::sync::{Arc, Mutex};

use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use super::{
    default_repo_name, Comment, CommentFailure, PullRequest, GITHUB_TOKEN, GITHUB_USERNAME,
};

/// Represents the state of a simulated GH repo.
struct GitHubRepoState {
    base_url: String,
    pull_requests: Vec<PullRequest>,
    comments: Vec<Comment>,
    next_comment_id: u64,
}

impl GitHubRepoState {
    fn comment_url(&self, id: u64) -> String {
        let repo = default_repo_name();
        format!(
            "{}/repos/{}/{}/issues/comments/{id}",
            self.base_url,
            repo.owner(),
            repo.name()
        )
    }

    fn comment_json(&self, comment: &Comment) -> Value {
        json!({
            "id": comment.id,
            "url": self.comment_url(comment.id),
            "body": comment.body,
            "user": { "login": "pr-deployment-bot", "id": 1 }
        })
    }
}

pub struct GitHubMockServer {
    mock_server: MockServer,
    state: Arc<Mutex<GitHubRepoState>>,
}

impl GitHubMockServer {
    pub async fn start(
        pull_requests: &[PullRequest],
        comments: &[(u64, String, Option<CommentFailure>)],
    ) -> Self {
        let mock_server = MockServer::start().await;
        let comments: Vec<Comment> = comments
            .iter()
            .enumerate()
            .map(|(index, (pr, body, failure))| Comment {
                id: index as u64 + 1,
                pr: *pr,
                body: body.clone(),
                failure: *failure,
            })
            .collect();
        let state = Arc::new(Mutex::new(GitHubRepoState {
            base_url: mock_server.uri(),
            pull_requests: pull_requests.to_vec(),
            next_comment_id: comments.len() as u64 + 1,
            comments,
        }));

        mock_pull_requests(&state, &mock_server).await;
        mock_comments(&state, &mock_server).await;

        Self { mock_server, state }
    }

    pub fn api_url(&self) -> String {
        self.mock_server.uri()
    }

    /// Comments currently present on the given PR, ordered by their creation.
    pub fn comments(&self, pr: u64) -> Vec<Comment> {
        self.state
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|comment| comment.pr == pr)
            .cloned()
            .collect()
    }

    pub async fn request_count(&self) -> usize {
        self.mock_server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
    pub async fn post_request_count(&self) -> usize {
        self.mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.method.as_str() == "POST")
            .count()
    }
}

fn repo_path(suffix: &str) -> String {
    let repo = default_repo_name();
    format!("/repos/{}/{}{suffix}", repo.owner(), repo.name())
}

fn repo_path_regex(suffix: &str) -> String {
    let repo = default_repo_name();
    format!("^/repos/{}/{}{suffix}$", repo.owner(), repo.name())
}

/// Parses the number following `segment` in the request path.
fn path_number(req: &Request, segment: &str) -> Option<u64> {
    let mut segments = req.url.path().split('/');
    segments.find(|s| *s == segment)?;
    segments.next()?.trim_start_matches("sha-").parse().ok()
}

fn server_error() -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({ "message": "Internal server error" }))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" }))
}

async fn mock_pull_requests(state: &Arc<Mutex<GitHubRepoState>>, mock_server: &MockServer) {
    let credentials =
        base64::prelude::BASE64_STANDARD.encode(format!("{GITHUB_USERNAME}:{GITHUB_TOKEN}"));

    let pr_state = state.clone();
    Mock::given(method("GET"))
        .and(path(repo_path("/pulls")))
        .and(query_param("state", "open"))
        .and(header("authorization", format!("Basic {credentials}")))
        .and(header("x-github-media-type", "github.v3"))
        .respond_with(move |_: &Request| {
            let state = pr_state.lock().unwrap();
            let pull_requests: Vec<Value> = state
                .pull_requests
                .iter()
                .map(|pr| {
                    json!({
                        "number": pr.number,
                        "state": "open",
                        "_links": {
                            "statuses": {
                                "href": format!(
                                    "{}{}",
                                    state.base_url,
                                    repo_path(&format!("/statuses/sha-{}", pr.number))
                                )
                            }
                        }
                    })
                })
                .collect();
            ResponseTemplate::new(200).set_body_json(pull_requests)
        })
        .mount(mock_server)
        .await;

    let status_state = state.clone();
    Mock::given(method("GET"))
        .and(path_regex(repo_path_regex("/statuses/sha-[0-9]+")))
        .respond_with(move |req: &Request| {
            let state = status_state.lock().unwrap();
            let pr = path_number(req, "statuses")
                .and_then(|number| state.pull_requests.iter().find(|pr| pr.number == number));
            match pr {
                Some(pr) if pr.failing_statuses => server_error(),
                Some(pr) => {
                    let statuses: Vec<Value> = pr
                        .statuses
                        .iter()
                        .map(|(context, target_url)| {
                            json!({ "context": context, "target_url": target_url, "state": "success" })
                        })
                        .collect();
                    ResponseTemplate::new(200).set_body_json(statuses)
                }
                None => not_found(),
            }
        })
        .mount(mock_server)
        .await;
}

#[derive(Deserialize)]
struct CommentCreatePayload {
    body: String,
}

async fn mock_comments(state: &Arc<Mutex<GitHubRepoState>>, mock_server: &MockServer) {
    let list_state = state.clone();
    Mock::given(method("GET"))
        .and(path_regex(repo_path_regex("/issues/[0-9]+/comments")))
        .respond_with(move |req: &Request| {
            let state = list_state.lock().unwrap();
            let pr = path_number(req, "issues");
            // The listing only contains references, the body has to be loaded separately.
            let comments: Vec<Value> = state
                .comments
                .iter()
                .filter(|comment| Some(comment.pr) == pr)
                .map(|comment| json!({ "id": comment.id, "url": state.comment_url(comment.id) }))
                .collect();
            ResponseTemplate::new(200).set_body_json(comments)
        })
        .mount(mock_server)
        .await;

    let get_state = state.clone();
    Mock::given(method("GET"))
        .and(path_regex(repo_path_regex("/issues/comments/[0-9]+")))
        .respond_with(move |req: &Request| {
            let state = get_state.lock().unwrap();
            let id = path_number(req, "comments");
            match state.comments.iter().find(|comment| Some(comment.id) == id) {
                Some(comment) if comment.failure == Some(CommentFailure::Fetch) => server_error(),
                Some(comment) => ResponseTemplate::new(200).set_body_json(state.comment_json(comment)),
                None => not_found(),
            }
        })
        .mount(mock_server)
        .await;

    let delete_state = state.clone();
    Mock::given(method("DELETE"))
        .and(path_regex(repo_path_regex("/issues/comments/[0-9]+")))
        .respond_with(move |req: &Request| {
            let mut state = delete_state.lock().unwrap();
            let id = path_number(req, "comments");
            match state.comments.iter().position(|comment| Some(comment.id) == id) {
                Some(index) if state.comments[index].failure == Some(CommentFailure::Delete) => {
                    server_error()
                }
                Some(index) => {
                    state.comments.remove(index);
                    ResponseTemplate::new(204)
                }
                None => not_found(),
            }
        })
        .mount(mock_server)
        .await;

    let create_state = state.clone();
    Mock::given(method("POST"))
        .and(path_regex(repo_path_regex("/issues/[0-9]+/comments")))
        .respond_with(move |req: &Request| {
            let payload: CommentCreatePayload = req.body_json().unwrap();
            let Some(pr) = path_number(req, "issues") else {
                return not_found();
            };
            let mut state = create_state.lock().unwrap();
            let comment = Comment {
                id: state.next_comment_id,
                pr,
                body: payload.body,
                failure: None,
            };
            state.next_comment_id += 1;
            state.comments.push(comment.clone());
            ResponseTemplate::new(201).set_body_json(state.comment_json(&comment))
        })
        .mount(mock_server)
        .await;
}
