use tracing::warn;

use crate::models::{
    CombinedStudent, Course, SocialSurveyResponse, SpecializedGroupsRequest, Student,
};

/// Joins roster students with their social survey answers for `course_id`.
///
/// Produces exactly one entry per student, in input order. Course membership
/// is not re-checked here; callers narrow the directory with [`course_roster`].
pub fn assemble(
    all_students: &[Student],
    social_responses: &[SocialSurveyResponse],
    number_of_groups: u32,
    course_id: &str,
) -> SpecializedGroupsRequest {
    let students = all_students
        .iter()
        .map(|student| combine_student(student, social_responses, course_id))
        .collect();

    SpecializedGroupsRequest {
        course_id: course_id.to_string(),
        number_of_groups,
        students,
    }
}

fn combine_student(
    student: &Student,
    social_responses: &[SocialSurveyResponse],
    course_id: &str,
) -> CombinedStudent {
    let answers = social_responses
        .iter()
        .find(|response| response.student_id == student.id && response.course_id == course_id)
        .and_then(|response| response.responses.as_ref());

    let slot = |values: Option<&Vec<String>>| values.cloned().unwrap_or_default();

    CombinedStudent {
        id: student.id.clone(),
        eneatype: parse_eneatype(student),
        favoritos: slot(answers.and_then(|a| a.q1.as_ref())),
        favorito_de: slot(answers.and_then(|a| a.q2.as_ref())),
        no_favoritos: slot(answers.and_then(|a| a.q3.as_ref())),
        no_favorito_de: slot(answers.and_then(|a| a.q4.as_ref())),
    }
}

fn parse_eneatype(student: &Student) -> Option<i64> {
    let raw = student.eneatype.as_deref()?.trim();
    if raw.is_empty() {
        return None;
    }

    match raw.parse::<i64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(student_id = %student.id, eneatype = raw, "ignoring unparsable eneatype");
            None
        }
    }
}

/// Directory students enrolled in `course`, in directory order.
pub fn course_roster(directory: &[Student], course: &Course) -> Vec<Student> {
    directory
        .iter()
        .filter(|student| course.enrolls(&student.id))
        .cloned()
        .collect()
}
