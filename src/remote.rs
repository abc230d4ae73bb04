use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Location, PersonName, Pictures, Profile, ProfileKey, Status};
use crate::error::MatchError;

pub const EDUCATION: [&str; 7] = ["B.Tech", "M.Tech", "MBA", "MCA", "B.Sc", "B.Com", "PhD"];
pub const RELIGION: [&str; 6] = ["Hindu", "Muslim", "Christian", "Sikh", "Jain", "Buddhist"];

/// One candidate as delivered by the remote provider. Every field is optional;
/// gaps are filled in by [`ProfileFactory`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCandidate {
    pub gender: Option<String>,
    pub name: RawName,
    pub location: RawLocation,
    pub email: Option<String>,
    pub login: RawLogin,
    pub dob: RawDated,
    pub registered: RawDated,
    pub picture: RawPicture,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawName {
    pub title: Option<String>,
    pub first: Option<String>,
    pub last: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLocation {
    pub street: RawStreet,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub postcode: Option<String>,
    pub coordinates: RawCoordinates,
    pub timezone: RawTimezone,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawStreet {
    pub number: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawCoordinates {
    #[serde(deserialize_with = "lenient_string")]
    pub latitude: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub longitude: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTimezone {
    pub offset: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawLogin {
    pub uuid: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDated {
    pub date: Option<String>,
    pub age: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPicture {
    pub large: Option<String>,
    pub medium: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    results: Option<Vec<RawCandidate>>,
    #[serde(default)]
    error: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    })
}

/// Classifies one HTTP exchange with the provider.
///
/// A 2xx response with a `results` array is a success, possibly empty. Every
/// other shape is an [`MatchError::ApiError`].
pub fn parse_results(status: u16, body: &str) -> Result<Vec<RawCandidate>, MatchError> {
    if !(200..300).contains(&status) {
        let message = if body.trim().is_empty() {
            "remote source request failed".to_string()
        } else {
            body.trim().chars().take(200).collect()
        };
        return Err(MatchError::ApiError {
            code: status,
            message,
        });
    }

    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(MatchError::ApiError {
            code: status,
            message: "response body is null".to_string(),
        });
    }

    let response: RawResponse =
        serde_json::from_str(trimmed).map_err(|err| MatchError::ApiError {
            code: status,
            message: format!("malformed response body: {err}"),
        })?;
    if let Some(error) = response.error {
        return Err(MatchError::ApiError {
            code: status,
            message: error,
        });
    }
    response.results.ok_or_else(|| MatchError::ApiError {
        code: status,
        message: "malformed response body: missing results".to_string(),
    })
}

/// Transport to the remote provider. No retries happen at this level.
pub trait RemoteSource: Send + Sync {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError>;
    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError>;
}

impl<S: RemoteSource + ?Sized> RemoteSource for Arc<S> {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        (**self).fetch_batch(count)
    }

    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError> {
        (**self).fetch_identity()
    }
}

impl<S: RemoteSource + ?Sized> RemoteSource for Box<S> {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        (**self).fetch_batch(count)
    }

    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError> {
        (**self).fetch_identity()
    }
}

#[derive(Clone)]
pub struct RandomUserHttpClient {
    client: Client,
    base_url: String,
}

impl RandomUserHttpClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://randomuser.me/";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MatchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("match-mate/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MatchError::InvalidArgument(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| MatchError::NetworkFailure(err.to_string()))?;
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        Ok(Self { client, base_url })
    }

    fn endpoint(&self) -> String {
        format!("{}api/", self.base_url)
    }

    fn request(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        let url = self.endpoint();
        debug!(url = %url, results = count, "requesting candidates");
        let response = self
            .client
            .get(&url)
            .query(&[("results", count)])
            .send()
            .map_err(|err| MatchError::NetworkFailure(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|err| MatchError::NetworkFailure(err.to_string()))?;
        debug!(status, bytes = body.len(), "remote source responded");
        parse_results(status, &body)
    }
}

impl RemoteSource for RandomUserHttpClient {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        self.request(count)
    }

    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError> {
        Ok(self.request(1)?.into_iter().next())
    }
}

/// Turns raw payloads into profiles, drawing the supplementary attributes
/// (and missing keys) from one random generator.
#[derive(Debug)]
pub struct ProfileFactory {
    rng: Mutex<StdRng>,
}

impl ProfileFactory {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn build(&self, raw: RawCandidate, status: Status) -> Result<Profile, MatchError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| MatchError::InvalidArgument("profile generator poisoned".to_string()))?;

        let key = match raw.login.uuid.as_deref().map(str::parse::<ProfileKey>) {
            Some(Ok(key)) => key,
            Some(Err(err)) => {
                warn!(error = %err, "remote candidate carried an unusable key; assigning one");
                generated_key(&mut rng)?
            }
            None => generated_key(&mut rng)?,
        };
        let education = EDUCATION[rng.gen_range(0..EDUCATION.len())].to_string();
        let religion = RELIGION[rng.gen_range(0..RELIGION.len())].to_string();

        let RawCandidate {
            gender,
            name,
            location,
            email,
            login,
            dob,
            registered,
            picture,
        } = raw;

        Ok(Profile {
            key,
            gender: gender.unwrap_or_default(),
            name: PersonName {
                title: name.title.unwrap_or_default(),
                first: name.first.unwrap_or_default(),
                last: name.last.unwrap_or_default(),
            },
            location: Location {
                street_number: location.street.number.unwrap_or_default(),
                street_name: location.street.name.unwrap_or_default(),
                city: location.city.unwrap_or_default(),
                state: location.state.unwrap_or_default(),
                country: location.country.unwrap_or_default(),
                postcode: location.postcode.unwrap_or_default(),
                latitude: location.coordinates.latitude.unwrap_or_default(),
                longitude: location.coordinates.longitude.unwrap_or_default(),
                timezone_offset: location.timezone.offset.unwrap_or_default(),
                timezone_description: location.timezone.description.unwrap_or_default(),
            },
            email: email.unwrap_or_default(),
            username: login.username.unwrap_or_default(),
            dob_date: dob.date.unwrap_or_default(),
            age: non_negative(dob.age),
            registered_date: registered.date.unwrap_or_default(),
            registered_age: non_negative(registered.age),
            picture: Pictures {
                large: picture.large.unwrap_or_default(),
                medium: picture.medium.unwrap_or_default(),
                thumbnail: picture.thumbnail.unwrap_or_default(),
            },
            education,
            religion,
            status,
        })
    }
}

fn generated_key(rng: &mut StdRng) -> Result<ProfileKey, MatchError> {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
        .parse()
}

fn non_negative(value: Option<i64>) -> u32 {
    value
        .and_then(|value| u32::try_from(value).ok())
        .unwrap_or_default()
}

/// Remote source plus translation: what the feed and sign-in flows talk to.
pub struct RemoteAdapter<S> {
    source: S,
    factory: ProfileFactory,
}

impl<S: RemoteSource> RemoteAdapter<S> {
    pub fn new(source: S, factory: ProfileFactory) -> Self {
        Self { source, factory }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fresh candidates, all `pending`.
    pub fn fetch_batch(&self, count: usize) -> Result<Vec<Profile>, MatchError> {
        self.source
            .fetch_batch(count)?
            .into_iter()
            .map(|raw| self.factory.build(raw, Status::Pending))
            .collect()
    }

    /// The signed-in user's own profile, marked `self`.
    pub fn fetch_identity(&self) -> Result<Option<Profile>, MatchError> {
        self.source
            .fetch_identity()?
            .map(|raw| self.factory.build(raw, Status::SelfProfile))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_postcode_becomes_string() {
        let body = r#"{"results":[{"location":{"postcode":56012,"coordinates":{"latitude":"1.5","longitude":-3.25}}}]}"#;
        let results = parse_results(200, body).unwrap();
        let location = &results[0].location;
        assert_eq!(location.postcode.as_deref(), Some("56012"));
        assert_eq!(location.coordinates.longitude.as_deref(), Some("-3.25"));
    }

    #[test]
    fn missing_uuid_is_generated_reproducibly() {
        let first = ProfileFactory::new(Some(9))
            .build(RawCandidate::default(), Status::Pending)
            .unwrap();
        let second = ProfileFactory::new(Some(9))
            .build(RawCandidate::default(), Status::Pending)
            .unwrap();
        assert_eq!(first.key, second.key);
        assert_eq!(first.education, second.education);
        assert_eq!(first.key.as_str().len(), 36);
    }
}
