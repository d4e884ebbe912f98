use std::fmt;

/// Short user-visible status produced by a view operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    NoSession,
    NoActiveCourse,
    CourseNotFound { course_id: String },
    TeacherOnly,
    RosterLoadFailed,
    RosterIncomplete { missing: usize },
    AlreadyEnrolled,
    StudentAdded { name: String },
    StudentAddedById { id: String },
    AddFailed,
    StudentRemoved,
    RemoveFailed,
    Cancelled,
    GroupsLoadFailed,
    InvalidGroupCount { requested: u32, available: usize },
    SurveysLoadFailed,
    GroupsCreated,
    GroupsCreateFailed,
}

impl Notice {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Notice::NoSession
                | Notice::NoActiveCourse
                | Notice::TeacherOnly
                | Notice::RosterLoadFailed
                | Notice::AddFailed
                | Notice::RemoveFailed
                | Notice::GroupsLoadFailed
                | Notice::InvalidGroupCount { .. }
                | Notice::SurveysLoadFailed
                | Notice::GroupsCreateFailed
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::NoSession => write!(f, "No signed-in user found in the session store."),
            Notice::NoActiveCourse => write!(f, "No active course selected."),
            Notice::CourseNotFound { course_id } => {
                write!(f, "No course found with id {course_id}.")
            }
            Notice::TeacherOnly => write!(f, "Only teachers can do that."),
            Notice::RosterLoadFailed => write!(f, "Could not load the enrolled students."),
            Notice::RosterIncomplete { missing } => {
                write!(f, "{missing} enrolled students could not be loaded.")
            }
            Notice::AlreadyEnrolled => {
                write!(f, "The student has already been added to the course.")
            }
            Notice::StudentAdded { name } => write!(f, "Student {name} added."),
            Notice::StudentAddedById { id } => write!(f, "Student {id} added."),
            Notice::AddFailed => write!(f, "Error adding the student."),
            Notice::StudentRemoved => write!(f, "Student removed from the course."),
            Notice::RemoveFailed => write!(f, "Error removing the student."),
            Notice::Cancelled => write!(f, "Cancelled."),
            Notice::GroupsLoadFailed => write!(f, "Could not load the groups."),
            Notice::InvalidGroupCount {
                requested,
                available,
            } => {
                if *requested == 0 {
                    write!(f, "The number of groups must be greater than zero.")
                } else {
                    write!(
                        f,
                        "Not enough students for {requested} groups; the course has {available}."
                    )
                }
            }
            Notice::SurveysLoadFailed => write!(f, "Could not load the social survey responses."),
            Notice::GroupsCreated => write!(f, "Groups created/updated successfully."),
            Notice::GroupsCreateFailed => write!(f, "Error creating groups."),
        }
    }
}
