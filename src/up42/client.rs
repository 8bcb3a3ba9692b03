use super::auth::{BearerAuth, ClientCredentials};
use super::models::{Block, Envelope, Job, SignedUrl, Task, Workflow, WorkflowTask};
use super::{ByteStream, Up42Ops};
use crate::error::Up42Error;
use futures_util::StreamExt;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::trace;
use url::Url;

pub struct Client {
    http: reqwest::Client,
    base_url: Url,
    project_id: String,
    auth: BearerAuth<ClientCredentials>,
}

impl Client {
    pub fn new(
        base_url: &str,
        project_id: &str,
        api_key: &str,
        token_timeout: Duration,
    ) -> Result<Self, Up42Error> {
        let http = reqwest::Client::new();
        let base_url = api_root(base_url)?;
        let credentials =
            ClientCredentials::new(http.clone(), base_url.join("oauth/token")?, project_id, api_key);

        Ok(Self {
            http,
            base_url,
            project_id: project_id.to_string(),
            auth: BearerAuth::new(credentials, token_timeout),
        })
    }

    fn project_path(&self, rest: &str) -> String {
        format!("/projects/{}{}", self.project_id, rest)
    }

    /// Resolves an API path below the base URL, keeping any path prefix the
    /// base URL carries.
    fn endpoint(&self, path: &str) -> Result<Url, Up42Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Builds an authorized request; every call to the API goes through here.
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Up42Error> {
        trace!("{method} {path}");
        let url = self.endpoint(path)?;
        self.auth.authorize(self.http.request(method, url)).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Up42Error> {
        let response = self.request(Method::GET, path).await?.send().await?;
        decode(Method::GET, path, response).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T, Up42Error> {
        self.send_json(Method::POST, path, query, body).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, Up42Error> {
        self.send_json(Method::PUT, path, &[], body).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), Up42Error> {
        let response = self.request(Method::DELETE, path).await?.send().await?;
        check_status(Method::DELETE, path, response).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T, Up42Error> {
        let response = self
            .request(method.clone(), path)
            .await?
            .query(query)
            .json(body)
            .send()
            .await?;
        decode(method, path, response).await
    }
}

/// Parses the base URL so that relative joins append to its path.
fn api_root(base_url: &str) -> Result<Url, Up42Error> {
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Signed download URLs carry their credentials in the query string.
fn redact(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

async fn check_status(method: Method, path: &str, response: Response) -> Result<Response, Up42Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Up42Error::Api {
        method,
        path: path.to_string(),
        status,
        body,
    })
}

async fn decode<T: DeserializeOwned>(
    method: Method,
    path: &str,
    response: Response,
) -> Result<T, Up42Error> {
    let response = check_status(method, path, response).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| Up42Error::Decode {
        path: path.to_string(),
        source,
    })
}

/// Job creation body; a dry run only estimates cost and scene availability.
pub(crate) fn job_body(params: &Value, is_dry: bool) -> Value {
    let mut body = params.clone();
    if is_dry {
        if let Some(map) = body.as_object_mut() {
            map.insert("config".to_string(), json!({"mode": "DRY_RUN"}));
        }
    }
    body
}

impl Up42Ops for Client {
    async fn get_blocks(&self) -> Result<Vec<Block>, Up42Error> {
        let blocks: Envelope<Vec<Block>> = self.get("/blocks").await?;
        Ok(blocks.data)
    }

    async fn create_workflow(&self, name: &str, description: &str) -> Result<Workflow, Up42Error> {
        let path = self.project_path("/workflows");
        let body = json!({"name": name, "description": description});
        let workflow: Envelope<Workflow> = self.post(&path, &[], &body).await?;
        Ok(workflow.data)
    }

    async fn set_workflow_tasks(
        &self,
        workflow_id: &str,
        tasks: &[WorkflowTask],
    ) -> Result<(), Up42Error> {
        let path = self.project_path(&format!("/workflows/{workflow_id}/tasks"));
        let body = serde_json::to_value(tasks).map_err(|source| Up42Error::Decode {
            path: path.clone(),
            source,
        })?;
        let _: Value = self.post(&path, &[], &body).await?;
        Ok(())
    }

    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), Up42Error> {
        self.delete(&self.project_path(&format!("/workflows/{workflow_id}")))
            .await
    }

    async fn run_job(
        &self,
        workflow_id: &str,
        name: &str,
        is_dry: bool,
        params: &Value,
    ) -> Result<Job, Up42Error> {
        let path = self.project_path(&format!("/workflows/{workflow_id}/jobs"));
        let job: Envelope<Job> = self
            .post(&path, &[("name", name)], &job_body(params, is_dry))
            .await?;
        Ok(job.data)
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, Up42Error> {
        let job: Envelope<Job> = self.get(&self.project_path(&format!("/jobs/{job_id}"))).await?;
        Ok(job.data)
    }

    async fn get_job_output(&self, job_id: &str) -> Result<Value, Up42Error> {
        self.get(&self.project_path(&format!("/jobs/{job_id}/outputs/data-json")))
            .await
    }

    async fn get_job_tasks(&self, job_id: &str) -> Result<Vec<Task>, Up42Error> {
        let tasks: Envelope<Vec<Task>> = self
            .get(&self.project_path(&format!("/jobs/{job_id}/tasks")))
            .await?;
        Ok(tasks.data)
    }

    async fn get_task_signed_url(&self, job_id: &str, task_id: &str) -> Result<String, Up42Error> {
        let path = self.project_path(&format!("/jobs/{job_id}/tasks/{task_id}/downloads/results"));
        let signed: Envelope<SignedUrl> = self.get(&path).await?;
        Ok(signed.data.url)
    }

    async fn download(&self, url: &str) -> Result<ByteStream, Up42Error> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Up42Error::Http(e.without_url()))?;
        let response = check_status(Method::GET, &redact(url), response).await?;
        let stream = response.bytes_stream().map(|chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|e| Up42Error::Http(e.without_url()))
        });
        Ok(stream.boxed())
    }
}
