use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[serde(rename = "self")]
    SelfProfile,
    Pending,
    Accepted,
    Declined,
}

impl Status {
    /// Statuses that never appear in the candidate feed.
    pub const NON_CANDIDATE: [Status; 3] =
        [Status::SelfProfile, Status::Accepted, Status::Declined];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::SelfProfile => "self",
            Status::Pending => "pending",
            Status::Accepted => "accepted",
            Status::Declined => "declined",
        }
    }

    pub fn is_candidate(&self) -> bool {
        !Self::NON_CANDIDATE.contains(self)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "self" => Ok(Status::SelfProfile),
            "pending" => Ok(Status::Pending),
            "accepted" => Ok(Status::Accepted),
            "declined" => Ok(Status::Declined),
            _ => Err(MatchError::InvalidArgument(format!(
                "unknown status: {value}"
            ))),
        }
    }
}

/// Terminal outcome of a decision on a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Accepted,
    Declined,
}

impl Decision {
    pub fn status(self) -> Status {
        match self {
            Decision::Accepted => Status::Accepted,
            Decision::Declined => Status::Declined,
        }
    }
}

impl TryFrom<Status> for Decision {
    type Error = MatchError;

    fn try_from(status: Status) -> Result<Self, Self::Error> {
        match status {
            Status::Accepted => Ok(Decision::Accepted),
            Status::Declined => Ok(Decision::Declined),
            other => Err(MatchError::InvalidArgument(format!(
                "status {other} is not a decision outcome"
            ))),
        }
    }
}

impl FromStr for Decision {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value.parse::<Status>()?.try_into()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileKey(String);

impl ProfileKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProfileKey {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty() && !normalized.chars().any(char::is_whitespace);
        if !is_valid {
            return Err(MatchError::InvalidProfileKey(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub title: String,
    pub first: String,
    pub last: String,
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.last)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub street_number: i64,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postcode: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone_offset: String,
    pub timezone_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pictures {
    pub large: String,
    pub medium: String,
    pub thumbnail: String,
}

/// A candidate (or the signed-in user). Everything except `status` is fixed
/// once the record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub key: ProfileKey,
    pub gender: String,
    pub name: PersonName,
    pub location: Location,
    pub email: String,
    pub username: String,
    pub dob_date: String,
    pub age: u32,
    pub registered_date: String,
    pub registered_age: u32,
    pub picture: Pictures,
    pub education: String,
    pub religion: String,
    pub status: Status,
}

/// Observation wrapper handed to presentation code.
#[derive(Debug)]
pub enum LoadState<T> {
    Loading,
    Success(T),
    Error(MatchError),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            LoadState::Success(value) => Some(value),
            LoadState::Loading | LoadState::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&MatchError> {
        match self {
            LoadState::Error(err) => Some(err),
            LoadState::Loading | LoadState::Success(_) => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> LoadState<U> {
        match self {
            LoadState::Loading => LoadState::Loading,
            LoadState::Success(value) => LoadState::Success(f(value)),
            LoadState::Error(err) => LoadState::Error(err),
        }
    }
}

impl<T> From<Result<T, MatchError>> for LoadState<T> {
    fn from(result: Result<T, MatchError>) -> Self {
        match result {
            Ok(value) => LoadState::Success(value),
            Err(err) => LoadState::Error(err),
        }
    }
}
