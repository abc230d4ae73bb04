use std::sync::Mutex;

use assert_matches::assert_matches;

use match_mate::domain::Status;
use match_mate::error::MatchError;
use match_mate::fault::{FaultInjector, FaultySource};
use match_mate::remote::{
    EDUCATION, ProfileFactory, RELIGION, RawCandidate, RemoteAdapter, RemoteSource,
    parse_results,
};

const SAMPLE: &str = r#"{
  "results": [
    {
      "gender": "female",
      "name": { "title": "Ms", "first": "Aarohi", "last": "Kulkarni" },
      "location": {
        "street": { "number": 7421, "name": "MG Road" },
        "city": "Pune",
        "state": "Maharashtra",
        "country": "India",
        "postcode": 41100,
        "coordinates": { "latitude": "18.5204", "longitude": "73.8567" },
        "timezone": { "offset": "+5:30", "description": "Bombay, Calcutta, Madras, New Delhi" }
      },
      "email": "aarohi.kulkarni@example.com",
      "login": {
        "uuid": "7a0eed16-9430-4d68-901f-c0d4c1c3bf00",
        "username": "purplecat412",
        "password": "hunter2"
      },
      "dob": { "date": "1993-07-20T09:44:18.674Z", "age": 31 },
      "registered": { "date": "2015-11-04T08:37:18.674Z", "age": 9 },
      "picture": {
        "large": "https://randomuser.me/api/portraits/women/21.jpg",
        "medium": "https://randomuser.me/api/portraits/med/women/21.jpg",
        "thumbnail": "https://randomuser.me/api/portraits/thumb/women/21.jpg"
      }
    }
  ],
  "info": { "seed": "abc", "results": 1, "page": 1, "version": "1.4" }
}"#;

#[derive(Default)]
struct CountingSource {
    calls: Mutex<usize>,
}

impl RemoteSource for CountingSource {
    fn fetch_batch(&self, count: usize) -> Result<Vec<RawCandidate>, MatchError> {
        *self.calls.lock().unwrap() += 1;
        Ok(vec![RawCandidate::default(); count])
    }

    fn fetch_identity(&self) -> Result<Option<RawCandidate>, MatchError> {
        *self.calls.lock().unwrap() += 1;
        Ok(parse_results(200, SAMPLE)?.into_iter().next())
    }
}

#[test]
fn parses_full_payload_into_profile() {
    let raw = parse_results(200, SAMPLE).unwrap().remove(0);
    let profile = ProfileFactory::new(Some(42))
        .build(raw, Status::Pending)
        .unwrap();

    assert_eq!(profile.key.as_str(), "7a0eed16-9430-4d68-901f-c0d4c1c3bf00");
    assert_eq!(profile.name.to_string(), "Aarohi Kulkarni");
    assert_eq!(profile.location.street_number, 7421);
    assert_eq!(profile.location.postcode, "41100");
    assert_eq!(profile.location.timezone_offset, "+5:30");
    assert_eq!(profile.username, "purplecat412");
    assert_eq!(profile.age, 31);
    assert_eq!(profile.registered_age, 9);
    assert!(profile.picture.thumbnail.ends_with("thumb/women/21.jpg"));
    assert!(EDUCATION.contains(&profile.education.as_str()));
    assert!(RELIGION.contains(&profile.religion.as_str()));
    assert_eq!(profile.status, Status::Pending);
}

#[test]
fn supplementary_attributes_follow_the_seed() {
    let build = |seed| {
        let factory = ProfileFactory::new(Some(seed));
        (0..5)
            .map(|_| {
                let raw = parse_results(200, SAMPLE).unwrap().remove(0);
                let profile = factory.build(raw, Status::Pending).unwrap();
                (profile.education, profile.religion)
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(build(11), build(11));
}

#[test]
fn empty_results_is_success() {
    let results = parse_results(200, r#"{"results": []}"#).unwrap();
    assert!(results.is_empty());
}

#[test]
fn non_success_status_is_api_error() {
    let err = parse_results(503, "Service Unavailable").unwrap_err();
    assert_matches!(err, MatchError::ApiError { code: 503, .. });
}

#[test]
fn null_body_is_distinct_api_error() {
    for body in ["", "  ", "null"] {
        let err = parse_results(200, body).unwrap_err();
        assert_matches!(
            err,
            MatchError::ApiError { code: 200, ref message } if message == "response body is null"
        );
    }
}

#[test]
fn malformed_bodies_are_api_errors() {
    let err = parse_results(200, "<html>").unwrap_err();
    assert_matches!(err, MatchError::ApiError { code: 200, .. });

    let err = parse_results(200, r#"{"info": {}}"#).unwrap_err();
    assert_matches!(err, MatchError::ApiError { .. });

    let err = parse_results(200, r#"{"error": "Uh oh, something has gone wrong."}"#).unwrap_err();
    assert_matches!(
        err,
        MatchError::ApiError { ref message, .. } if message.starts_with("Uh oh")
    );
}

#[test]
fn adapter_assigns_statuses() {
    let adapter = RemoteAdapter::new(CountingSource::default(), ProfileFactory::new(Some(5)));

    let batch = adapter.fetch_batch(3).unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|p| p.status == Status::Pending));
    let distinct: std::collections::HashSet<_> = batch.iter().map(|p| p.key.clone()).collect();
    assert_eq!(distinct.len(), 3);

    let me = adapter.fetch_identity().unwrap().unwrap();
    assert_eq!(me.status, Status::SelfProfile);
}

#[test]
fn fault_injection_short_circuits_the_source() {
    let source = FaultySource::new(CountingSource::default(), FaultInjector::always());

    let err = source.fetch_batch(10).unwrap_err();
    assert_matches!(err, MatchError::NetworkFailure(_));
    let err = source.fetch_identity().unwrap_err();
    assert_matches!(err, MatchError::NetworkFailure(_));
    assert_eq!(*source.inner().calls.lock().unwrap(), 0);
}

#[test]
fn zero_rate_never_fails() {
    let source = FaultySource::new(
        CountingSource::default(),
        FaultInjector::new(0.0, Some(1)).unwrap(),
    );
    for _ in 0..20 {
        source.fetch_batch(1).unwrap();
    }
    assert_eq!(*source.inner().calls.lock().unwrap(), 20);
}

#[test]
fn seeded_rate_is_reproducible() {
    let pattern = |seed| {
        let injector = FaultInjector::new(0.3, Some(seed)).unwrap();
        (0..50).map(|_| injector.should_fail()).collect::<Vec<_>>()
    };
    let first = pattern(99);
    assert_eq!(first, pattern(99));
    assert!(first.iter().any(|failed| *failed));
    assert!(first.iter().any(|failed| !*failed));
}

#[test]
fn out_of_range_rate_is_rejected() {
    assert_matches!(
        FaultInjector::new(1.5, None),
        Err(MatchError::InvalidArgument(_))
    );
}
