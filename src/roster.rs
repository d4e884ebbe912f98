use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::api::{ApiError, CourseApi};
use crate::models::{Course, Student};
use crate::notice::Notice;
use crate::prompt::Confirm;
use crate::session::SessionContext;

/// How a roster is assembled when some per-student lookups fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvePolicy {
    /// Show every student that resolved, skip the rest.
    BestEffort,
    /// Show nobody unless every student resolved.
    AllOrNothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentOption {
    pub label: String,
    pub value: String,
}

/// Looks up each id concurrently; one result per distinct id, in first-seen order.
pub async fn resolve_students(
    api: &dyn CourseApi,
    ids: &[String],
) -> Vec<(String, Result<Student, ApiError>)> {
    let mut distinct: Vec<&String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !distinct.contains(&id) {
            distinct.push(id);
        }
    }

    let lookups = distinct.iter().map(|id| api.get_user(id));
    let results = join_all(lookups).await;
    distinct.into_iter().cloned().zip(results).collect()
}

pub struct RosterManager {
    api: Arc<dyn CourseApi>,
    session: SessionContext,
    policy: ResolvePolicy,
    course: Option<Course>,
    enrolled: Vec<Student>,
    directory: Vec<Student>,
}

impl RosterManager {
    pub fn new(api: Arc<dyn CourseApi>, session: SessionContext, policy: ResolvePolicy) -> Self {
        Self {
            api,
            session,
            policy,
            course: None,
            enrolled: Vec::new(),
            directory: Vec::new(),
        }
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn enrolled(&self) -> &[Student] {
        &self.enrolled
    }

    /// Loads the active course, its enrolled students and the student directory.
    #[instrument(
        name = "course_groups.roster.load",
        skip(self),
        fields(course_id = ?self.session.course_id)
    )]
    pub async fn load(&mut self) -> Option<Notice> {
        let Some(course_id) = self.session.course_id.clone() else {
            return Some(Notice::NoActiveCourse);
        };

        let api = Arc::clone(&self.api);
        let (directory, courses) = futures::join!(api.list_students(), api.list_courses());

        match directory {
            Ok(students) => self.directory = students,
            Err(err) => error!(error = %err, "failed to load student directory"),
        }

        let courses = match courses {
            Ok(courses) => courses,
            Err(err) => {
                error!(error = %err, "failed to load course details");
                return Some(Notice::RosterLoadFailed);
            }
        };

        let Some(course) = courses.into_iter().find(|c| c.id == course_id) else {
            info!("active course not found");
            return Some(Notice::CourseNotFound { course_id });
        };

        let resolved = resolve_students(api.as_ref(), &course.student_ids).await;
        self.course = Some(course);
        self.assemble_roster(resolved)
    }

    fn assemble_roster(
        &mut self,
        resolved: Vec<(String, Result<Student, ApiError>)>,
    ) -> Option<Notice> {
        let total = resolved.len();
        let mut students = Vec::with_capacity(total);
        for (id, result) in resolved {
            match result {
                Ok(student) => students.push(student),
                Err(err) => {
                    warn!(student_id = %id, error = %err, "failed to resolve enrolled student")
                }
            }
        }

        let missing = total - students.len();
        match (self.policy, missing) {
            (_, 0) => {
                self.enrolled = students;
                None
            }
            (ResolvePolicy::BestEffort, missing) => {
                self.enrolled = students;
                Some(Notice::RosterIncomplete { missing })
            }
            (ResolvePolicy::AllOrNothing, _) => {
                error!(missing, "discarding partially resolved roster");
                Some(Notice::RosterLoadFailed)
            }
        }
    }

    /// Directory entries as selectable options, labelled `name (email or id)`.
    pub fn candidates(&self) -> Vec<StudentOption> {
        self.directory
            .iter()
            .map(|student| StudentOption {
                label: format!(
                    "{} ({})",
                    student.name,
                    student.email.as_deref().unwrap_or(&student.id)
                ),
                value: student.id.clone(),
            })
            .collect()
    }

    fn is_enrolled(&self, student_id: &str) -> bool {
        self.enrolled.iter().any(|s| s.id == student_id)
            || self.course.as_ref().is_some_and(|c| c.enrolls(student_id))
    }

    #[instrument(name = "course_groups.roster.add_student", skip(self))]
    pub async fn add_student(&mut self, student_id: &str) -> Notice {
        if !self.session.is_teacher() {
            return Notice::TeacherOnly;
        }
        let Some(course_id) = self.session.course_id.clone() else {
            return Notice::NoActiveCourse;
        };
        if self.is_enrolled(student_id) {
            return Notice::AlreadyEnrolled;
        }

        if let Err(err) = self.api.add_student(&course_id, student_id).await {
            error!(error = %err, "failed to add student");
            return Notice::AddFailed;
        }

        if let Some(course) = self.course.as_mut() {
            course.student_ids.push(student_id.to_string());
        }

        let known = self.directory.iter().find(|s| s.id == student_id).cloned();
        let student = match known {
            Some(student) => Some(student),
            None => match self.api.get_user(student_id).await {
                Ok(student) => Some(student),
                Err(err) => {
                    warn!(error = %err, "added student has no directory record");
                    None
                }
            },
        };

        match student {
            Some(student) => {
                let name = student.name.clone();
                self.enrolled.push(student);
                info!("student added");
                Notice::StudentAdded { name }
            }
            None => Notice::StudentAddedById {
                id: student_id.to_string(),
            },
        }
    }

    #[instrument(name = "course_groups.roster.remove_student", skip(self, confirm))]
    pub async fn remove_student(&mut self, student_id: &str, confirm: &dyn Confirm) -> Notice {
        if !self.session.is_teacher() {
            return Notice::TeacherOnly;
        }
        let Some(course_id) = self.course.as_ref().map(|c| c.id.clone()) else {
            return Notice::NoActiveCourse;
        };
        if !confirm.confirm("Are you sure you want to remove this student from the course?") {
            return Notice::Cancelled;
        }

        match self.api.remove_student(&course_id, student_id).await {
            Ok(()) => {
                self.enrolled.retain(|s| s.id != student_id);
                if let Some(course) = self.course.as_mut() {
                    course.student_ids.retain(|id| id != student_id);
                }
                info!("student removed");
                Notice::StudentRemoved
            }
            Err(err) => {
                error!(error = %err, "failed to remove student");
                Notice::RemoveFailed
            }
        }
    }
}
