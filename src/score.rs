use crate::domain::Profile;

pub const LOCALITY_BONUS: u8 = 20;

/// Compatibility of two profiles in `[0, 100]`: an age-gap component plus a
/// bonus when both live in the same city (compared case-insensitively).
pub fn match_score(a: &Profile, b: &Profile) -> u8 {
    let locality = if same_city(&a.location.city, &b.location.city) {
        LOCALITY_BONUS
    } else {
        0
    };
    let total = u16::from(age_score(a.age, b.age)) + u16::from(locality);
    total.clamp(0, 100) as u8
}

pub fn age_score(a: u32, b: u32) -> u8 {
    match a.abs_diff(b) {
        0 => 80,
        1..=2 => 70,
        3..=5 => 60,
        6..=10 => 50,
        _ => 30,
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
