use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::api::CourseApi;
use crate::joiner;
use crate::models::{Course, Group, RandomGroupsRequest, SpecializedGroupsRequest, Student};
use crate::notice::Notice;
use crate::prompt::Confirm;
use crate::session::{Role, SessionContext, UserData};

pub const SPECIALIZED_CONFIRMATION: &str = "Create specialized groups? Check that every survey is \
complete and up to date. Groups can still be created leaving out the missing answers.";

pub struct GroupView {
    api: Arc<dyn CourseApi>,
    session: SessionContext,
    groups: Vec<Group>,
    directory: Vec<Student>,
    course: Option<Course>,
}

impl GroupView {
    pub fn new(api: Arc<dyn CourseApi>, session: SessionContext) -> Self {
        Self {
            api,
            session,
            groups: Vec::new(),
            directory: Vec::new(),
            course: None,
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn course(&self) -> Option<&Course> {
        self.course.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.session.role()
    }

    pub fn viewer(&self) -> Option<&UserData> {
        self.session.user.as_ref()
    }

    /// Loads the groups visible to the session's role, plus the directory and
    /// course used for display names and specialized grouping.
    #[instrument(
        name = "course_groups.groups.load",
        skip(self),
        fields(course_id = ?self.session.course_id)
    )]
    pub async fn load(&mut self) -> Option<Notice> {
        let api = Arc::clone(&self.api);
        let (directory, courses) = futures::join!(api.list_students(), api.list_courses());

        match directory {
            Ok(students) => self.directory = students,
            Err(err) => error!(error = %err, "failed to load student directory"),
        }

        let Some(course_id) = self.session.course_id.clone() else {
            return Some(Notice::NoActiveCourse);
        };

        match courses {
            Ok(courses) => {
                self.course = courses.into_iter().find(|c| c.id == course_id);
                if self.course.is_none() {
                    info!("active course not found");
                }
            }
            Err(err) => error!(error = %err, "failed to load course details"),
        }

        let Some(user) = self.session.user.as_ref() else {
            return Some(Notice::NoSession);
        };

        let loaded = match user.role() {
            Role::Teacher => api.course_groups(&course_id).await,
            Role::Student => api.student_groups(&user.sub).await.map(|groups| {
                groups
                    .into_iter()
                    .find(|g| g.course_id == course_id)
                    .into_iter()
                    .collect()
            }),
            Role::Other(role) => {
                info!(%role, "role has no group view");
                return None;
            }
        };

        match loaded {
            Ok(groups) => {
                info!(count = groups.len(), "groups loaded");
                self.groups = groups;
                None
            }
            Err(err) => {
                error!(error = %err, "failed to load groups");
                Some(Notice::GroupsLoadFailed)
            }
        }
    }

    /// Rejects zero and, when the course is known, more groups than enrolled ids.
    pub fn check_group_count(&self, number_of_groups: u32) -> Result<(), Notice> {
        let available = self.course.as_ref().map(|c| c.student_ids.len());
        let too_many = available.is_some_and(|n| number_of_groups as usize > n);
        if number_of_groups == 0 || too_many {
            return Err(Notice::InvalidGroupCount {
                requested: number_of_groups,
                available: available.unwrap_or(0),
            });
        }
        Ok(())
    }

    fn creation_course_id(&self, number_of_groups: u32) -> Result<String, Notice> {
        if !self.session.is_teacher() {
            return Err(Notice::TeacherOnly);
        }
        let course_id = self
            .session
            .course_id
            .clone()
            .ok_or(Notice::NoActiveCourse)?;
        self.check_group_count(number_of_groups)?;
        Ok(course_id)
    }

    #[instrument(name = "course_groups.groups.create_random", skip(self))]
    pub async fn create_random(&mut self, number_of_groups: u32) -> Notice {
        let course_id = match self.creation_course_id(number_of_groups) {
            Ok(course_id) => course_id,
            Err(notice) => return notice,
        };

        let request = RandomGroupsRequest {
            course_id,
            number_of_groups,
        };
        match self.api.create_random_groups(&request).await {
            Ok(groups) => {
                info!(count = groups.len(), "random groups created");
                self.groups = groups;
                Notice::GroupsCreated
            }
            Err(err) => {
                error!(error = %err, "failed to create random groups");
                Notice::GroupsCreateFailed
            }
        }
    }

    #[instrument(name = "course_groups.groups.create_specialized", skip(self, confirm))]
    pub async fn create_specialized(
        &mut self,
        number_of_groups: u32,
        confirm: &dyn Confirm,
    ) -> Notice {
        if let Err(notice) = self.creation_course_id(number_of_groups) {
            return notice;
        }
        if !confirm.confirm(SPECIALIZED_CONFIRMATION) {
            return Notice::Cancelled;
        }

        let request = match self.preview_specialized(number_of_groups).await {
            Ok(request) => request,
            Err(notice) => return notice,
        };

        match self.api.create_specialized_groups(&request).await {
            Ok(groups) => {
                info!(count = groups.len(), "specialized groups created");
                self.groups = groups;
                Notice::GroupsCreated
            }
            Err(err) => {
                error!(error = %err, "failed to create specialized groups");
                Notice::GroupsCreateFailed
            }
        }
    }

    /// Builds the specialized grouping payload without submitting it.
    #[instrument(name = "course_groups.groups.preview_specialized", skip(self))]
    pub async fn preview_specialized(
        &self,
        number_of_groups: u32,
    ) -> Result<SpecializedGroupsRequest, Notice> {
        let course_id = self
            .session
            .course_id
            .as_deref()
            .ok_or(Notice::NoActiveCourse)?;

        let responses = self.api.social_responses().await.map_err(|err| {
            error!(error = %err, "failed to load social survey responses");
            Notice::SurveysLoadFailed
        })?;
        let responses: Vec<_> = responses
            .into_iter()
            .filter(|r| r.course_id == course_id)
            .collect();

        let roster = self
            .course
            .as_ref()
            .map(|course| joiner::course_roster(&self.directory, course))
            .unwrap_or_default();

        info!(
            students = roster.len(),
            responses = responses.len(),
            completed = responses.iter().filter(|r| r.is_completed).count(),
            "assembling specialized grouping payload"
        );
        Ok(joiner::assemble(&roster, &responses, number_of_groups, course_id))
    }

    pub fn directory_entry(&self, student_id: &str) -> Option<&Student> {
        self.directory.iter().find(|s| s.id == student_id)
    }

    /// `name (email)` from the directory, or the raw id when unknown.
    pub fn student_label(&self, student_id: &str) -> String {
        match self.directory_entry(student_id) {
            Some(Student {
                name,
                email: Some(email),
                ..
            }) => format!("{name} ({email})"),
            Some(student) => student.name.clone(),
            None => student_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SocialSurveyResponse, SurveyAnswers};
    use crate::prompt::FixedAnswer;
    use crate::testing::{course, group, session, student, FakeApi};

    fn fake() -> FakeApi {
        let mut eneatyped = student("s2", "Jules Moreno");
        eneatyped.eneatype = Some("4".to_string());
        FakeApi {
            courses: vec![course("C1", &["s1", "s2", "s3"]), course("C2", &["s9"])],
            directory: vec![
                student("s1", "Avery Lee"),
                eneatyped,
                student("s3", "Kiara Patel"),
                student("s9", "Other Course"),
            ],
            course_groups: vec![group(1, "C1", &["s1", "s2"]), group(2, "C1", &["s3"])],
            student_groups: vec![group(4, "C2", &["s1"]), group(1, "C1", &["s1", "s2"])],
            created_groups: vec![group(1, "C1", &["s1", "s3"]), group(2, "C1", &["s2"])],
            social: vec![
                SocialSurveyResponse {
                    id: "r1".to_string(),
                    student_id: "s1".to_string(),
                    course_id: "C1".to_string(),
                    is_completed: true,
                    responses: Some(SurveyAnswers {
                        q1: Some(vec!["s2".to_string()]),
                        q3: Some(vec!["s3".to_string()]),
                        ..SurveyAnswers::default()
                    }),
                },
                SocialSurveyResponse {
                    id: "r2".to_string(),
                    student_id: "s3".to_string(),
                    course_id: "C2".to_string(),
                    is_completed: true,
                    responses: Some(SurveyAnswers {
                        q1: Some(vec!["s9".to_string()]),
                        ..SurveyAnswers::default()
                    }),
                },
            ],
            ..FakeApi::default()
        }
    }

    async fn loaded(fake: Arc<FakeApi>, role: &str) -> GroupView {
        let mut view = GroupView::new(fake, session(role, "s1", Some("C1")));
        assert_eq!(view.load().await, None);
        view
    }

    #[tokio::test]
    async fn teacher_sees_all_course_groups() {
        let fake = Arc::new(fake());
        let view = loaded(fake.clone(), "profesor").await;

        assert_eq!(view.groups().len(), 2);
        assert!(fake.calls().contains(&"course_groups C1".to_string()));
        assert!(!fake.called("student_groups"));
    }

    #[tokio::test]
    async fn student_sees_only_their_group_in_active_course() {
        let fake = Arc::new(fake());
        let view = loaded(fake.clone(), "Estudiante").await;

        assert_eq!(view.groups(), &[group(1, "C1", &["s1", "s2"])]);
        assert!(fake.calls().contains(&"student_groups s1".to_string()));
    }

    #[tokio::test]
    async fn unknown_role_loads_no_groups() {
        let fake = Arc::new(fake());
        let view = loaded(fake.clone(), "visitor").await;

        assert!(view.groups().is_empty());
        assert!(!fake.called("course_groups"));
        assert!(!fake.called("student_groups"));
    }

    #[tokio::test]
    async fn group_load_failure_keeps_prior_state() {
        let mut fake = fake();
        fake.failing.insert("course_groups");
        let mut view = GroupView::new(Arc::new(fake), session("profesor", "t1", Some("C1")));

        assert_eq!(view.load().await, Some(Notice::GroupsLoadFailed));
        assert!(view.groups().is_empty());
        assert_eq!(view.student_label("s1"), "Avery Lee (s1@example.com)");
    }

    #[tokio::test]
    async fn random_groups_replace_displayed_groups() {
        let fake = Arc::new(fake());
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(view.create_random(2).await, Notice::GroupsCreated);
        assert_eq!(view.groups(), fake.created_groups.as_slice());
        assert!(fake.calls().contains(&"create_random_groups C1 2".to_string()));
    }

    #[tokio::test]
    async fn failed_creation_keeps_displayed_groups() {
        let mut fake = fake();
        fake.failing.insert("create_random_groups");
        let fake = Arc::new(fake);
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(view.create_random(2).await, Notice::GroupsCreateFailed);
        assert_eq!(view.groups(), fake.course_groups.as_slice());
    }

    #[tokio::test]
    async fn group_count_is_bounded_by_roster() {
        let fake = Arc::new(fake());
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(
            view.create_random(0).await,
            Notice::InvalidGroupCount {
                requested: 0,
                available: 3
            }
        );
        assert_eq!(
            view.create_random(4).await,
            Notice::InvalidGroupCount {
                requested: 4,
                available: 3
            }
        );
        assert!(!fake.called("create_random_groups"));
        assert!(view.check_group_count(3).is_ok());
    }

    #[tokio::test]
    async fn students_cannot_create_groups() {
        let fake = Arc::new(fake());
        let mut view = loaded(fake.clone(), "estudiante").await;

        assert_eq!(view.create_random(2).await, Notice::TeacherOnly);
        assert_eq!(
            view.create_specialized(2, &FixedAnswer(true)).await,
            Notice::TeacherOnly
        );
    }

    #[tokio::test]
    async fn declined_specialized_creation_sends_nothing() {
        let fake = Arc::new(fake());
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(
            view.create_specialized(2, &FixedAnswer(false)).await,
            Notice::Cancelled
        );
        assert!(!fake.called("social_responses"));
        assert!(!fake.called("create_specialized_groups"));
        assert_eq!(view.groups(), fake.course_groups.as_slice());
    }

    #[tokio::test]
    async fn specialized_creation_submits_joined_roster() {
        let fake = Arc::new(fake());
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(
            view.create_specialized(2, &FixedAnswer(true)).await,
            Notice::GroupsCreated
        );
        assert_eq!(view.groups(), fake.created_groups.as_slice());

        let sent = fake.specialized.lock().unwrap().clone().unwrap();
        assert_eq!(sent.course_id, "C1");
        assert_eq!(sent.number_of_groups, 2);
        let ids: Vec<&str> = sent.students.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
        assert_eq!(sent.students[0].favoritos, vec!["s2"]);
        assert_eq!(sent.students[0].no_favoritos, vec!["s3"]);
        assert_eq!(sent.students[1].eneatype, Some(4));
        assert!(sent.students[2].favoritos.is_empty());
    }

    #[tokio::test]
    async fn survey_failure_aborts_specialized_creation() {
        let mut fake = fake();
        fake.failing.insert("social_responses");
        let fake = Arc::new(fake);
        let mut view = loaded(fake.clone(), "profesor").await;

        assert_eq!(
            view.create_specialized(2, &FixedAnswer(true)).await,
            Notice::SurveysLoadFailed
        );
        assert!(!fake.called("create_specialized_groups"));
    }

    #[tokio::test]
    async fn preview_does_not_submit() {
        let fake = Arc::new(fake());
        let view = loaded(fake.clone(), "profesor").await;

        let request = view.preview_specialized(3).await.unwrap();
        assert_eq!(request.students.len(), 3);
        assert!(!fake.called("create_specialized_groups"));
    }

    #[tokio::test]
    async fn labels_fall_back_to_raw_id() {
        let fake = Arc::new(fake());
        let view = loaded(fake, "profesor").await;

        assert_eq!(view.student_label("s3"), "Kiara Patel (s3@example.com)");
        assert_eq!(view.student_label("ghost"), "ghost");
    }

    #[tokio::test]
    async fn load_without_active_course_reports_it() {
        let fake = Arc::new(fake());
        let mut view = GroupView::new(fake.clone(), session("profesor", "t1", None));

        assert_eq!(view.load().await, Some(Notice::NoActiveCourse));
        assert!(view.groups().is_empty());
        assert!(!fake.called("course_groups"));
        assert_eq!(view.student_label("s1"), "Avery Lee (s1@example.com)");
    }

    #[tokio::test]
    async fn load_without_signed_in_user_reports_no_session() {
        let fake = Arc::new(fake());
        let anonymous = SessionContext {
            user: None,
            course_id: Some("C1".to_string()),
        };
        let mut view = GroupView::new(fake.clone(), anonymous);

        assert_eq!(view.load().await, Some(Notice::NoSession));
        assert!(view.groups().is_empty());
        assert!(!fake.called("course_groups"));
        assert!(!fake.called("student_groups"));
        assert_eq!(view.course().map(|c| c.id.as_str()), Some("C1"));
    }
}
