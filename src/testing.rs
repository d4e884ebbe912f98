//! In-memory `CourseApi` used by the view tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{ApiError, CourseApi};
use crate::models::{
    Course, Group, RandomGroupsRequest, SocialSurveyResponse, SpecializedGroupsRequest, Student,
};
use crate::session::{SessionContext, UserData};

#[derive(Default)]
pub struct FakeApi {
    pub courses: Vec<Course>,
    pub users: HashMap<String, Student>,
    pub directory: Vec<Student>,
    pub course_groups: Vec<Group>,
    pub student_groups: Vec<Group>,
    pub created_groups: Vec<Group>,
    pub social: Vec<SocialSurveyResponse>,
    /// Operation names (as recorded in `calls`) that answer HTTP 500.
    pub failing: HashSet<&'static str>,
    pub calls: Mutex<Vec<String>>,
    pub specialized: Mutex<Option<SpecializedGroupsRequest>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, operation: &str) -> bool {
        self.calls()
            .iter()
            .any(|call| call.split(' ').next() == Some(operation))
    }

    fn record(&self, operation: &'static str, detail: &str) -> Result<(), ApiError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation} {detail}").trim_end().to_string());
        if self.failing.contains(operation) {
            Err(ApiError::status(format!("/{operation}"), 500))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CourseApi for FakeApi {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.record("list_courses", "")?;
        Ok(self.courses.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Student, ApiError> {
        self.record("get_user", id)?;
        self.users
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::status(format!("/users/{id}"), 404))
    }

    async fn list_students(&self) -> Result<Vec<Student>, ApiError> {
        self.record("list_students", "")?;
        Ok(self.directory.clone())
    }

    async fn add_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError> {
        self.record("add_student", &format!("{course_id} {student_id}"))
    }

    async fn remove_student(&self, course_id: &str, student_id: &str) -> Result<(), ApiError> {
        self.record("remove_student", &format!("{course_id} {student_id}"))
    }

    async fn course_groups(&self, course_id: &str) -> Result<Vec<Group>, ApiError> {
        self.record("course_groups", course_id)?;
        Ok(self.course_groups.clone())
    }

    async fn student_groups(&self, student_id: &str) -> Result<Vec<Group>, ApiError> {
        self.record("student_groups", student_id)?;
        Ok(self.student_groups.clone())
    }

    async fn create_random_groups(
        &self,
        request: &RandomGroupsRequest,
    ) -> Result<Vec<Group>, ApiError> {
        self.record(
            "create_random_groups",
            &format!("{} {}", request.course_id, request.number_of_groups),
        )?;
        Ok(self.created_groups.clone())
    }

    async fn create_specialized_groups(
        &self,
        request: &SpecializedGroupsRequest,
    ) -> Result<Vec<Group>, ApiError> {
        self.record(
            "create_specialized_groups",
            &format!("{} {}", request.course_id, request.number_of_groups),
        )?;
        *self.specialized.lock().unwrap() = Some(request.clone());
        Ok(self.created_groups.clone())
    }

    async fn social_responses(&self) -> Result<Vec<SocialSurveyResponse>, ApiError> {
        self.record("social_responses", "")?;
        Ok(self.social.clone())
    }
}

pub fn student(id: &str, name: &str) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        email: Some(format!("{id}@example.com")),
        eneatype: None,
    }
}

pub fn course(id: &str, student_ids: &[&str]) -> Course {
    Course {
        id: id.to_string(),
        name: format!("Course {id}"),
        description: None,
        student_ids: student_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn group(number: i64, course_id: &str, student_ids: &[&str]) -> Group {
    Group {
        group_number: number,
        course_id: course_id.to_string(),
        student_ids: student_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn session(role: &str, sub: &str, course_id: Option<&str>) -> SessionContext {
    SessionContext {
        user: Some(UserData {
            sub: sub.to_string(),
            email: format!("{sub}@example.com"),
            role: role.to_string(),
            name: sub.to_string(),
        }),
        course_id: course_id.map(str::to_string),
    }
}
