use std::io::{self, Write};

use serde::Serialize;

use crate::app::ScoredProfile;
use crate::domain::Profile;

#[derive(Debug, Clone, Serialize)]
pub struct FeedResult {
    pub pages: Vec<PageResult>,
    pub cursor: usize,
    pub exhausted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub page: usize,
    pub candidates: Vec<ScoredProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub status: String,
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionResult {
    pub key: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    pub a: String,
    pub b: String,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_profile(profile: &Profile) -> io::Result<()> {
        Self::print_json(profile)
    }

    pub fn print_feed(result: &FeedResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_list(result: &ListResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_decision(result: &DecisionResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_score(result: &ScoreResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
