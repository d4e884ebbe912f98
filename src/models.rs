use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Student {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub eneatype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Course {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "studentIds", default, deserialize_with = "null_as_default")]
    pub student_ids: Vec<String>,
}

impl Course {
    pub fn enrolls(&self, student_id: &str) -> bool {
        self.student_ids.iter().any(|id| id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Group {
    pub group_number: i64,
    pub course_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub student_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSurveyResponse {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "lenient_answers")]
    pub responses: Option<SurveyAnswers>,
}

/// Peer ids per survey question: q1 students I favor, q2 students who favor
/// me, q3 students I do not favor, q4 students who do not favor me.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyAnswers {
    pub q1: Option<Vec<String>>,
    pub q2: Option<Vec<String>>,
    pub q3: Option<Vec<String>>,
    pub q4: Option<Vec<String>>,
}

impl SurveyAnswers {
    /// Reads the four slots out of an arbitrary JSON value. Anything that is
    /// not an object yields `None`; a slot that is not a list of strings is
    /// treated as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let slot = |key: &str| {
            object
                .get(key)
                .and_then(|raw| serde_json::from_value::<Vec<String>>(raw.clone()).ok())
        };

        Some(Self {
            q1: slot("q1"),
            q2: slot("q2"),
            q3: slot("q3"),
            q4: slot("q4"),
        })
    }
}

/// One entry of the specialized grouping payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombinedStudent {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eneatype: Option<i64>,
    pub favoritos: Vec<String>,
    pub favorito_de: Vec<String>,
    pub no_favoritos: Vec<String>,
    pub no_favorito_de: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecializedGroupsRequest {
    pub course_id: String,
    pub number_of_groups: u32,
    pub students: Vec<CombinedStudent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RandomGroupsRequest {
    pub course_id: String,
    pub number_of_groups: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest<'a> {
    pub course_id: &'a str,
    pub student_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalRequest<'a> {
    pub student_id: &'a str,
}

/// `null` decodes like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_answers<'de, D>(deserializer: D) -> Result<Option<SurveyAnswers>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(SurveyAnswers::from_value))
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}
