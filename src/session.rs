use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const USER_DATA_KEY: &str = "userData";
pub const COURSE_ID_KEY: &str = "courseId";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot read session store {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session store {path} is not a JSON object of strings")]
    Store {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("session key `{key}` does not hold a valid identity payload")]
    UserData {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Teacher,
    Student,
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "profesor" | "teacher" => Role::Teacher,
            "estudiante" | "student" => Role::Student,
            _ => Role::Other(raw.to_string()),
        }
    }
}

/// Decoded identity payload stored under `userData`. Other keys the login
/// flow writes (`run`, `eneatype`) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub name: String,
}

impl UserData {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// `name (email)`, falling back to whichever is present, then to `sub`.
    pub fn signature(&self) -> String {
        match (self.name.trim(), self.email.trim()) {
            ("", "") => self.sub.clone(),
            (name, "") => name.to_string(),
            ("", email) => email.to_string(),
            (name, email) => format!("{name} ({email})"),
        }
    }
}

/// Identity and active course, loaded once at startup and handed to each view.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user: Option<UserData>,
    pub course_id: Option<String>,
}

impl SessionContext {
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SessionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| SessionError::Store {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_store(&store)
    }

    pub fn from_store(store: &HashMap<String, String>) -> Result<Self, SessionError> {
        let user = store
            .get(USER_DATA_KEY)
            .map(|raw| serde_json::from_str::<UserData>(raw))
            .transpose()
            .map_err(|source| SessionError::UserData {
                key: USER_DATA_KEY,
                source,
            })?;
        let course_id = store
            .get(COURSE_ID_KEY)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Self { user, course_id })
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(UserData::role)
    }

    pub fn is_teacher(&self) -> bool {
        self.role() == Some(Role::Teacher)
    }
}
