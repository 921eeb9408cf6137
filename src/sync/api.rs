use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{SyncError, SyncResult, TaskUpdate, TodoBackend};
use crate::core::list::{ListId, TodoList};
use crate::core::report::{Report, ReportKind};
use crate::core::task::{Task, TaskId};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct TodosEnvelope {
    todos: Vec<Task>,
}

#[derive(Deserialize)]
struct TodoEnvelope {
    todo: Task,
}

#[derive(Deserialize)]
struct ListsEnvelope {
    lists: Vec<TodoList>,
}

#[derive(Deserialize)]
struct ListEnvelope {
    list: TodoList,
}

/// Client for the `/api/todos`, `/api/lists` and `/api/reports` resources.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| SyncError::Request {
                operation: "build HTTP client",
                source,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, resource: &str) -> RequestBuilder {
        let url = format!("{}/api/{}", self.base_url, resource);
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        req: RequestBuilder,
        operation: &'static str,
    ) -> SyncResult<reqwest::Response> {
        let resp = req
            .send()
            .await
            .map_err(|source| SyncError::Request { operation, source })?;

        let status = resp.status();
        if !status.is_success() {
            log::warn!("API call to {} returned {}", operation, status);
            return Err(SyncError::Status {
                operation,
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        operation: &'static str,
    ) -> SyncResult<T> {
        let resp = self.send(req, operation).await?;
        resp.json::<T>().await.map_err(|e| SyncError::Decode {
            operation,
            message: e.to_string(),
        })
    }
}

impl TodoBackend for ApiClient {
    async fn get_todos(&self, list_id: Option<&ListId>) -> SyncResult<Vec<Task>> {
        let mut req = self.request(Method::GET, "todos");
        if let Some(id) = list_id {
            req = req.query(&[("listId", id.as_str())]);
        }
        let env: TodosEnvelope = self.fetch(req, "fetch todos").await?;
        Ok(env.todos)
    }

    async fn create_todo(&self, list_id: &ListId, text: &str) -> SyncResult<Task> {
        let req = self
            .request(Method::POST, "todos")
            .json(&serde_json::json!({ "listId": list_id, "text": text }));
        let env: TodoEnvelope = self.fetch(req, "create todo").await?;
        Ok(env.todo)
    }

    async fn update_todo(&self, id: &TaskId, update: &TaskUpdate) -> SyncResult<Task> {
        let mut body = serde_json::to_value(update).map_err(|e| SyncError::Decode {
            operation: "update todo",
            message: e.to_string(),
        })?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("id".to_string(), serde_json::json!(id));
        }
        let req = self.request(Method::PUT, "todos").json(&body);
        let env: TodoEnvelope = self.fetch(req, "update todo").await?;
        Ok(env.todo)
    }

    async fn delete_todo(&self, id: &TaskId) -> SyncResult<()> {
        let req = self
            .request(Method::DELETE, "todos")
            .query(&[("id", id.as_str())]);
        self.send(req, "delete todo").await?;
        Ok(())
    }

    async fn get_lists(&self) -> SyncResult<Vec<TodoList>> {
        let req = self.request(Method::GET, "lists");
        let env: ListsEnvelope = self.fetch(req, "fetch lists").await?;
        Ok(env.lists)
    }

    async fn create_list(&self, name: &str) -> SyncResult<TodoList> {
        let req = self
            .request(Method::POST, "lists")
            .json(&serde_json::json!({ "name": name }));
        let env: ListEnvelope = self.fetch(req, "create list").await?;
        Ok(env.list)
    }

    async fn update_list(&self, id: &ListId, name: &str) -> SyncResult<TodoList> {
        let req = self
            .request(Method::PUT, "lists")
            .json(&serde_json::json!({ "id": id, "name": name }));
        let env: ListEnvelope = self.fetch(req, "update list").await?;
        Ok(env.list)
    }

    async fn delete_list(&self, id: &ListId) -> SyncResult<()> {
        let req = self
            .request(Method::DELETE, "lists")
            .query(&[("id", id.as_str())]);
        self.send(req, "delete list").await?;
        Ok(())
    }

    async fn get_report(&self, date: NaiveDate, kind: ReportKind) -> SyncResult<Report> {
        let date = date.format("%Y-%m-%d").to_string();
        let req = self
            .request(Method::GET, "reports")
            .query(&[("date", date.as_str()), ("type", kind.as_str())]);
        self.fetch(req, "fetch report").await
    }
}
