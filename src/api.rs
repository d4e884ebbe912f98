use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::models::{
    Course, EnrollmentRequest, Group, RandomGroupsRequest, RemovalRequest, SocialSurveyResponse,
    SpecializedGroupsRequest, Student,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} answered HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("unexpected response body from {path}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(path: impl Into<String>, status: u16) -> Self {
        Self::Status {
            path: path.into(),
            status,
        }
    }
}

/// Remote course service: courses, users, groups and surveys.
#[async_trait]
pub trait CourseApi: Send + Sync {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError>;
    async fn get_user(&self, id: &str) -> Result<Student, ApiError>;
    async fn list_students(&self) -> Result<Vec<Student>, ApiError>;
    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError>;
    async fn remove_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError>;
    async fn course_groups(&self, course_id: &str) -> Result<Vec<Group>, ApiError>;
    async fn student_groups(&self, student_id: &str) -> Result<Vec<Group>, ApiError>;
    async fn create_random_groups(
        &self,
        request: &RandomGroupsRequest,
    ) -> Result<Vec<Group>, ApiError>;
    async fn create_specialized_groups(
        &self,
        request: &SpecializedGroupsRequest,
    ) -> Result<Vec<Group>, ApiError>;
    async fn social_responses(&self) -> Result<Vec<SocialSurveyResponse>, ApiError>;
}

/// `CourseApi` over HTTP/JSON, rooted at a base URL such as
/// `http://localhost:3000/api`.
pub struct HttpCourseApi {
    client: reqwest::Client,
    base: Url,
}

impl HttpCourseApi {
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn from_settings(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self::new(client, base))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let path = display_path(segments);
        let url = self.endpoint(segments)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.clone(),
                source,
            })?;
        decode(path, response).await
    }

    /// Like `get_json` for array endpoints, but a record that does not decode
    /// is logged and skipped instead of failing the whole list.
    async fn get_list<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>, ApiError> {
        let path = display_path(segments);
        let raw: Vec<Value> = self.get_json(segments).await?;
        Ok(decode_records(&path, raw))
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let path = display_path(segments);
        let response = self.post(segments, &path, body).await?;
        decode(path, response).await
    }

    async fn post_unit<B>(&self, segments: &[&str], body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let path = display_path(segments);
        let response = self.post(segments, &path, body).await?;
        check_status(&path, &response)?;
        Ok(())
    }

    async fn post<B>(
        &self,
        segments: &[&str],
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.endpoint(segments)?;
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })
    }
}

fn display_path(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

fn check_status(path: &str, response: &reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::status(path, status.as_u16()))
    }
}

async fn decode<T: DeserializeOwned>(
    path: String,
    response: reqwest::Response,
) -> Result<T, ApiError> {
    check_status(&path, &response)?;
    let body = response
        .bytes()
        .await
        .map_err(|source| ApiError::Transport {
            path: path.clone(),
            source,
        })?;
    debug!(%path, bytes = body.len(), "decoding response");
    serde_json::from_slice(&body).map_err(|source| ApiError::Decode { path, source })
}

fn decode_records<T: DeserializeOwned>(path: &str, raw: Vec<Value>) -> Vec<T> {
    raw.into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                warn!(%path, index, %error, "skipping undecodable record");
                None
            }
        })
        .collect()
}

#[async_trait]
impl CourseApi for HttpCourseApi {
    #[instrument(name = "course_groups.http.list_courses", skip_all)]
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.get_list(&["courses"]).await
    }

    #[instrument(name = "course_groups.http.get_user", skip_all, fields(user_id = %id))]
    async fn get_user(&self, id: &str) -> Result<Student, ApiError> {
        self.get_json(&["users", id]).await
    }

    #[instrument(name = "course_groups.http.list_students", skip_all)]
    async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        self.get_list(&["users", "students"]).await
    }

    #[instrument(
        name = "course_groups.http.add_student",
        skip_all,
        fields(course_id = %course_id, student_id = %student_id)
    )]
    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError> {
        let body = EnrollmentRequest {
            course_id,
            student_id,
        };
        self.post_unit(&["courses", course_id, "add-student"], &body).await
    }

    #[instrument(
        name = "course_groups.http.remove_student",
        skip_all,
        fields(course_id = %course_id, student_id = %student_id)
    )]
    async fn remove_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError> {
        let body = RemovalRequest { student_id };
        self.post_unit(&["courses", course_id, "remove-student"], &body).await
    }

    #[instrument(
        name = "course_groups.http.course_groups",
        skip_all,
        fields(course_id = %course_id)
    )]
    async fn course_groups(&self, course_id: &str) -> Result<Vec<Group>, ApiError> {
        self.get_json(&["groups", "course", course_id]).await
    }

    #[instrument(
        name = "course_groups.http.student_groups",
        skip_all,
        fields(student_id = %student_id)
    )]
    async fn student_groups(&self, student_id: &str) -> Result<Vec<Group>, ApiError> {
        self.get_json(&["groups", "student", student_id]).await
    }

    #[instrument(
        name = "course_groups.http.create_random_groups",
        skip_all,
        fields(course_id = %request.course_id, number_of_groups = request.number_of_groups)
    )]
    async fn create_random_groups(
        &self,
        request: &RandomGroupsRequest,
    ) -> Result<Vec<Group>, ApiError> {
        self.post_json(&["groups", "create-random"], request).await
    }

    #[instrument(
        name = "course_groups.http.create_specialized_groups",
        skip_all,
        fields(
            course_id = %request.course_id,
            number_of_groups = request.number_of_groups,
            students = request.students.len()
        )
    )]
    async fn create_specialized_groups(
        &self,
        request: &SpecializedGroupsRequest,
    ) -> Result<Vec<Group>, ApiError> {
        self.post_json(&["groups", "create-specialized"], request).await
    }

    #[instrument(name = "course_groups.http.social_responses", skip_all)]
    async fn social_responses(&self) -> Result<Vec<SocialSurveyResponse>, ApiError> {
        self.get_list(&["surveys", "all-social"]).await
    }
}
