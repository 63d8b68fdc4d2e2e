use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Departments offered by the profile submission form.
pub const KNOWN_DEPARTMENTS: &[&str] = &[
    "Computer Science Engineering",
    "CSE-AIML",
    "CSE-DS",
    "CSE-CS",
    "Information Technology",
    "Electronics & Communication",
    "Mechanical Engineering",
    "Civil Engineering",
    "Electrical Engineering",
];

/// One tracked student as returned by `GET /students`.
///
/// Every display field is optional: the server is not trusted to fill them in,
/// and the ranking pipeline treats a missing field as a non-match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default)]
    pub year: Option<u8>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub total_problems: Option<u32>,
    #[serde(default)]
    pub easy: Option<u32>,
    #[serde(default)]
    pub medium: Option<u32>,
    #[serde(default)]
    pub hard: Option<u32>,
    #[serde(default)]
    pub platform_stats: Option<PlatformStats>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: PlatformLinks,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Nested statistics object some server builds return instead of flat counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    #[serde(default)]
    pub total_score: Option<u32>,
    #[serde(default)]
    pub easy: Option<u32>,
    #[serde(default)]
    pub medium: Option<u32>,
    #[serde(default)]
    pub hard: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformLinks {
    #[serde(default)]
    pub leetcode: Option<String>,
    #[serde(default)]
    pub gfg: Option<String>,
    #[serde(default)]
    pub codechef: Option<String>,
}

impl PlatformLinks {
    /// Display name and URL for each linked platform, in a fixed order.
    pub fn linked(&self) -> Vec<(&'static str, &str)> {
        [
            ("LeetCode", self.leetcode.as_deref()),
            ("GeeksforGeeks", self.gfg.as_deref()),
            ("CodeChef", self.codechef.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.filter(|u| !u.is_empty()).map(|u| (name, u)))
        .collect()
    }
}

impl StudentRecord {
    /// Score used for ranking; nested stats win over the flat counter, absent means 0.
    pub fn total_score(&self) -> u32 {
        self.platform_stats
            .as_ref()
            .and_then(|stats| stats.total_score)
            .or(self.total_problems)
            .unwrap_or(0)
    }

    pub fn easy_count(&self) -> u32 {
        self.nested(|stats| stats.easy).or(self.easy).unwrap_or(0)
    }

    pub fn medium_count(&self) -> u32 {
        self.nested(|stats| stats.medium).or(self.medium).unwrap_or(0)
    }

    pub fn hard_count(&self) -> u32 {
        self.nested(|stats| stats.hard).or(self.hard).unwrap_or(0)
    }

    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or("Unknown student")
    }

    fn nested(&self, pick: impl Fn(&PlatformStats) -> Option<u32>) -> Option<u32> {
        self.platform_stats.as_ref().and_then(pick)
    }
}

/// Year selector: everything, or one exact year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum YearFilter {
    #[default]
    All,
    Year(u8),
}

impl YearFilter {
    pub fn matches(&self, year: Option<u8>) -> bool {
        match self {
            YearFilter::All => true,
            YearFilter::Year(wanted) => year == Some(*wanted),
        }
    }
}

impl FromStr for YearFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "all" {
            return Ok(YearFilter::All);
        }
        // Only the canonical spelling of a year selects it: no sign, no leading zeros.
        let canonical = !value.is_empty()
            && value.bytes().all(|b| b.is_ascii_digit())
            && (value == "0" || !value.starts_with('0'));
        value
            .parse::<u8>()
            .ok()
            .filter(|_| canonical)
            .map(YearFilter::Year)
            .ok_or_else(|| format!("expected `all` or a year number, got `{value}`"))
    }
}

impl fmt::Display for YearFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearFilter::All => write!(f, "all"),
            YearFilter::Year(year) => write!(f, "{year}"),
        }
    }
}

/// Transient filter state for one ranking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub search: String,
    pub year: YearFilter,
}

impl FilterCriteria {
    pub fn new(search: impl Into<String>, year: YearFilter) -> Self {
        Self {
            search: search.into(),
            year,
        }
    }

    pub fn label(&self) -> String {
        let year = match self.year {
            YearFilter::All => "all years".to_string(),
            YearFilter::Year(year) => format!("year {year}"),
        };
        if self.search.is_empty() {
            year
        } else {
            format!("{year}, matching \"{}\"", self.search)
        }
    }
}

/// A row of the ordered leaderboard view. Borrows the record untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedStudent<'a> {
    pub rank: usize,
    pub student: &'a StudentRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEntry {
    pub name: String,
    pub profile_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProfileRequest {
    pub full_name: String,
    pub roll_number: String,
    pub email: String,
    pub password: String,
    pub department: String,
    pub year: Option<u8>,
    pub profile_pic: String,
    pub platforms: Vec<PlatformEntry>,
}
