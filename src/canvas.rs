use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::Credentials;
use crate::domain::{CanvasId, UserRef};
use crate::error::CanvasError;

const PER_PAGE: &str = "100";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: CanvasId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login_id: Option<String>,
    #[serde(default)]
    pub sis_user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommunicationChannel {
    pub id: CanvasId,
    pub address: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub workflow_state: String,
}

impl CommunicationChannel {
    pub fn is_email(&self) -> bool {
        self.channel_type == "email"
    }

    pub fn is_active(&self) -> bool {
        self.workflow_state == "active"
    }

    pub fn is_unconfirmed(&self) -> bool {
        self.workflow_state == "unconfirmed"
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Course {
    pub id: CanvasId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub sis_course_id: Option<String>,
    #[serde(default)]
    pub account_id: Option<CanvasId>,
    #[serde(default)]
    pub storage_quota_mb: Option<u64>,
    #[serde(default)]
    pub is_public_to_auth_users: Option<bool>,
    #[serde(default)]
    pub workflow_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public_to_auth_users: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_quota_mb: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tab {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, rename = "type")]
    pub tab_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExternalToolTag {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Assignment {
    pub id: CanvasId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(default)]
    pub points_possible: Option<f64>,
    #[serde(default)]
    pub submission_types: Vec<String>,
    #[serde(default)]
    pub external_tool_tag_attributes: Option<ExternalToolTag>,
}

impl Assignment {
    pub fn external_tool_url(&self) -> Option<&str> {
        self.external_tool_tag_attributes
            .as_ref()
            .and_then(|tag| tag.url.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscussionTopic {
    pub id: CanvasId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub posted_at: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DiscussionEntry {
    pub id: CanvasId,
    #[serde(default)]
    pub user_id: Option<CanvasId>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Enrollment {
    pub id: CanvasId,
    pub user_id: CanvasId,
    #[serde(default)]
    pub course_id: Option<CanvasId>,
    #[serde(default)]
    pub enrollment_state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentRole {
    Student,
}

impl EnrollmentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentRole::Student => "StudentEnrollment",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupCategory {
    pub id: CanvasId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Group {
    pub id: CanvasId,
    pub name: String,
}

pub trait CanvasClient: Send + Sync {
    fn get_user(&self, user: &UserRef) -> Result<User, CanvasError>;
    fn list_communication_channels(
        &self,
        user_id: CanvasId,
    ) -> Result<Vec<CommunicationChannel>, CanvasError>;
    fn create_email_channel(
        &self,
        user_id: CanvasId,
        address: &str,
        skip_confirmation: bool,
    ) -> Result<CommunicationChannel, CanvasError>;
    fn delete_communication_channel(
        &self,
        user_id: CanvasId,
        channel_id: CanvasId,
    ) -> Result<(), CanvasError>;
    fn get_course(&self, course_id: CanvasId) -> Result<Course, CanvasError>;
    fn update_course(
        &self,
        course_id: CanvasId,
        update: &CourseUpdate,
    ) -> Result<Course, CanvasError>;
    fn list_tabs(&self, course_id: CanvasId) -> Result<Vec<Tab>, CanvasError>;
    fn list_assignments(&self, course_id: CanvasId) -> Result<Vec<Assignment>, CanvasError>;
    fn list_discussion_topics(
        &self,
        course_id: CanvasId,
        only_announcements: bool,
    ) -> Result<Vec<DiscussionTopic>, CanvasError>;
    fn list_discussion_entries(
        &self,
        course_id: CanvasId,
        topic_id: CanvasId,
    ) -> Result<Vec<DiscussionEntry>, CanvasError>;
    fn enroll_user(
        &self,
        course_id: CanvasId,
        user_id: CanvasId,
        role: EnrollmentRole,
    ) -> Result<Enrollment, CanvasError>;
    fn list_group_categories(&self, course_id: CanvasId)
    -> Result<Vec<GroupCategory>, CanvasError>;
    fn list_groups(&self, category_id: CanvasId) -> Result<Vec<Group>, CanvasError>;
    fn create_group(&self, category_id: CanvasId, name: &str) -> Result<Group, CanvasError>;
    fn create_group_membership(
        &self,
        group_id: CanvasId,
        user_id: CanvasId,
    ) -> Result<(), CanvasError>;
}

#[derive(Clone)]
pub struct CanvasHttpClient {
    client: Client,
    base_url: Url,
}

impl CanvasHttpClient {
    pub fn new(credentials: &Credentials) -> Result<Self, CanvasError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("penn-canvas/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CanvasError::CanvasHttp(err.to_string()))?,
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credentials.token))
            .map_err(|_| CanvasError::MissingCredentials(credentials.instance.to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let base_url = Url::parse(&credentials.url)
            .map_err(|err| CanvasError::InvalidConfig(format!("{}: {err}", credentials.url)))?;

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| CanvasError::CanvasHttp(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, CanvasError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CanvasError::InvalidConfig(format!("{} is not a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1"])
            .extend(segments);
        Ok(url)
    }

    fn handle_status(response: Response) -> Result<Response, CanvasError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "Canvas request failed".to_string());
        Err(CanvasError::CanvasStatus { status, message })
    }

    /// Sends a request, retrying transient failures. Requests that are not
    /// `idempotent` are only retried when Canvas cannot have acted on them.
    fn send_with_retries<F>(
        &self,
        idempotent: bool,
        mut make_req: F,
    ) -> Result<Response, CanvasError>
    where
        F: FnMut() -> RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status, idempotent) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(status, attempt, "retrying Canvas request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err, idempotent) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        debug!(error = %err, attempt, "retrying Canvas request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(CanvasError::CanvasHttp(err.to_string()));
                }
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CanvasError> {
        let response = self.send_with_retries(true, || self.client.get(url.clone()))?;
        Self::handle_status(response)?
            .json()
            .map_err(|err| CanvasError::CanvasHttp(err.to_string()))
    }

    fn get_paginated<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CanvasError> {
        let mut items = Vec::new();
        let mut next = Some(url);
        let mut first = true;
        while let Some(page_url) = next.take() {
            let response = self.send_with_retries(true, || {
                let request = self.client.get(page_url.clone());
                // Later pages carry their query string inside the Link header.
                if first {
                    request.query(&[("per_page", PER_PAGE)]).query(query)
                } else {
                    request
                }
            })?;
            let response = Self::handle_status(response)?;
            next = response
                .headers()
                .get(LINK)
                .and_then(|value| value.to_str().ok())
                .and_then(next_page_url)
                .and_then(|value| Url::parse(&value).ok());
            let page: Vec<T> = response
                .json()
                .map_err(|err| CanvasError::CanvasHttp(err.to_string()))?;
            items.extend(page);
            first = false;
        }
        Ok(items)
    }

    fn send_json<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &serde_json::Value,
    ) -> Result<T, CanvasError> {
        let idempotent = method != reqwest::Method::POST;
        let response = self.send_with_retries(idempotent, || {
            self.client.request(method.clone(), url.clone()).json(body)
        })?;
        Self::handle_status(response)?
            .json()
            .map_err(|err| CanvasError::CanvasHttp(err.to_string()))
    }
}

impl CanvasClient for CanvasHttpClient {
    fn get_user(&self, user: &UserRef) -> Result<User, CanvasError> {
        let segment = user.path_segment();
        self.get_json(self.endpoint(&["users", &segment])?)
    }

    fn list_communication_channels(
        &self,
        user_id: CanvasId,
    ) -> Result<Vec<CommunicationChannel>, CanvasError> {
        let id = user_id.to_string();
        self.get_paginated(
            self.endpoint(&["users", &id, "communication_channels"])?,
            &[],
        )
    }

    fn create_email_channel(
        &self,
        user_id: CanvasId,
        address: &str,
        skip_confirmation: bool,
    ) -> Result<CommunicationChannel, CanvasError> {
        let id = user_id.to_string();
        let body = json!({
            "communication_channel": { "address": address, "type": "email" },
            "skip_confirmation": skip_confirmation,
        });
        self.send_json(
            reqwest::Method::POST,
            self.endpoint(&["users", &id, "communication_channels"])?,
            &body,
        )
    }

    fn delete_communication_channel(
        &self,
        user_id: CanvasId,
        channel_id: CanvasId,
    ) -> Result<(), CanvasError> {
        let id = user_id.to_string();
        let channel = channel_id.to_string();
        let url = self.endpoint(&["users", &id, "communication_channels", &channel])?;
        let response = self.send_with_retries(true, || self.client.delete(url.clone()))?;
        Self::handle_status(response)?;
        Ok(())
    }

    fn get_course(&self, course_id: CanvasId) -> Result<Course, CanvasError> {
        let id = course_id.to_string();
        self.get_json(self.endpoint(&["courses", &id])?)
    }

    fn update_course(
        &self,
        course_id: CanvasId,
        update: &CourseUpdate,
    ) -> Result<Course, CanvasError> {
        let id = course_id.to_string();
        let body = json!({ "course": update });
        self.send_json(
            reqwest::Method::PUT,
            self.endpoint(&["courses", &id])?,
            &body,
        )
    }

    fn list_tabs(&self, course_id: CanvasId) -> Result<Vec<Tab>, CanvasError> {
        let id = course_id.to_string();
        self.get_paginated(self.endpoint(&["courses", &id, "tabs"])?, &[])
    }

    fn list_assignments(&self, course_id: CanvasId) -> Result<Vec<Assignment>, CanvasError> {
        let id = course_id.to_string();
        self.get_paginated(self.endpoint(&["courses", &id, "assignments"])?, &[])
    }

    fn list_discussion_topics(
        &self,
        course_id: CanvasId,
        only_announcements: bool,
    ) -> Result<Vec<DiscussionTopic>, CanvasError> {
        let id = course_id.to_string();
        let query: &[(&str, &str)] = if only_announcements {
            &[("only_announcements", "true")]
        } else {
            &[]
        };
        self.get_paginated(
            self.endpoint(&["courses", &id, "discussion_topics"])?,
            query,
        )
    }

    fn list_discussion_entries(
        &self,
        course_id: CanvasId,
        topic_id: CanvasId,
    ) -> Result<Vec<DiscussionEntry>, CanvasError> {
        let id = course_id.to_string();
        let topic = topic_id.to_string();
        self.get_paginated(
            self.endpoint(&["courses", &id, "discussion_topics", &topic, "entries"])?,
            &[],
        )
    }

    fn enroll_user(
        &self,
        course_id: CanvasId,
        user_id: CanvasId,
        role: EnrollmentRole,
    ) -> Result<Enrollment, CanvasError> {
        let id = course_id.to_string();
        let body = json!({
            "enrollment": {
                "user_id": user_id,
                "type": role.as_str(),
                "enrollment_state": "active",
                "notify": false,
            }
        });
        self.send_json(
            reqwest::Method::POST,
            self.endpoint(&["courses", &id, "enrollments"])?,
            &body,
        )
    }

    fn list_group_categories(
        &self,
        course_id: CanvasId,
    ) -> Result<Vec<GroupCategory>, CanvasError> {
        let id = course_id.to_string();
        self.get_paginated(self.endpoint(&["courses", &id, "group_categories"])?, &[])
    }

    fn list_groups(&self, category_id: CanvasId) -> Result<Vec<Group>, CanvasError> {
        let id = category_id.to_string();
        self.get_paginated(self.endpoint(&["group_categories", &id, "groups"])?, &[])
    }

    fn create_group(&self, category_id: CanvasId, name: &str) -> Result<Group, CanvasError> {
        let id = category_id.to_string();
        self.send_json(
            reqwest::Method::POST,
            self.endpoint(&["group_categories", &id, "groups"])?,
            &json!({ "name": name }),
        )
    }

    fn create_group_membership(
        &self,
        group_id: CanvasId,
        user_id: CanvasId,
    ) -> Result<(), CanvasError> {
        let id = group_id.to_string();
        let _: serde_json::Value = self.send_json(
            reqwest::Method::POST,
            self.endpoint(&["groups", &id, "memberships"])?,
            &json!({ "user_id": user_id }),
        )?;
        Ok(())
    }
}

/// Extracts the `rel="next"` target from a Canvas `Link` header.
pub fn next_page_url(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|param| {
            let param = param.trim();
            param == "rel=\"next\"" || param == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|value| value.strip_suffix('>'))
            .map(|value| value.to_string())
    })
}

fn is_retryable_status(status: u16, idempotent: bool) -> bool {
    if idempotent {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    } else {
        status == 429
    }
}

fn is_retryable_error(err: &reqwest::Error, idempotent: bool) -> bool {
    if idempotent {
        err.is_timeout() || err.is_connect() || err.is_request()
    } else {
        err.is_connect()
    }
}
