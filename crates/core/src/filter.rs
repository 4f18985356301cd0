use std::{cmp::Reverse, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::UnknownFilterField, types::EnrichedBuild};

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortBy {
    /// Most recently triggered first.
    #[default]
    Date,
    /// Ascending by status text.
    Status,
    /// Keep the order the filters produced.
    Unsorted,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Status => "status",
            SortBy::Unsorted => "none",
        }
    }
}

impl From<&str> for SortBy {
    fn from(s: &str) -> Self {
        match s {
            "date" => SortBy::Date,
            "status" => SortBy::Status,
            _ => SortBy::Unsorted,
        }
    }
}

impl From<String> for SortBy {
    fn from(s: String) -> Self {
        SortBy::from(s.as_str())
    }
}

impl From<SortBy> for String {
    fn from(sort: SortBy) -> Self {
        sort.as_str().to_string()
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The user's current filter and sort criteria. An empty string means
/// "no constraint" for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub status: String,
    pub branch: String,
    pub app_title: String,
    #[serde(rename = "buildNumber", alias = "build_number")]
    pub build_number: String,
    #[serde(rename = "sortBy", alias = "sort_by")]
    pub sort_by: SortBy,
}

/// A single settable field of a [`FilterSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Status,
    Branch,
    AppTitle,
    BuildNumber,
    SortBy,
}

impl FromStr for FilterField {
    type Err = UnknownFilterField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status" => Ok(FilterField::Status),
            "branch" => Ok(FilterField::Branch),
            "app_title" => Ok(FilterField::AppTitle),
            "buildNumber" | "build_number" => Ok(FilterField::BuildNumber),
            "sortBy" | "sort_by" => Ok(FilterField::SortBy),
            _ => Err(UnknownFilterField(s.to_string())),
        }
    }
}

impl FilterSpec {
    /// Returns a new spec with one field replaced.
    pub fn with(&self, field: FilterField, value: impl Into<String>) -> Self {
        let value = value.into();
        let mut spec = self.clone();
        match field {
            FilterField::Status => spec.status = value,
            FilterField::Branch => spec.branch = value,
            FilterField::AppTitle => spec.app_title = value,
            FilterField::BuildNumber => spec.build_number = value,
            FilterField::SortBy => spec.sort_by = SortBy::from(value),
        }
        spec
    }

    /// All predicates must hold; empty fields are skipped.
    pub fn matches(&self, build: &EnrichedBuild) -> bool {
        if !self.status.is_empty() && build.status_text.as_str() != self.status {
            return false;
        }
        if !self.branch.is_empty() && build.branch.as_deref() != Some(self.branch.as_str()) {
            return false;
        }
        if !self.app_title.is_empty() && build.app_title.as_deref() != Some(self.app_title.as_str())
        {
            return false;
        }
        if !self.build_number.is_empty()
            && !build.build_number.to_string().contains(&self.build_number)
        {
            return false;
        }
        true
    }
}

/// Per-request overrides of a stored [`FilterSpec`]. Fields left out keep
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_title: Option<String>,
    #[serde(rename = "buildNumber", skip_serializing_if = "Option::is_none")]
    pub build_number: Option<String>,
    #[serde(rename = "sortBy", skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
}

impl FilterOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, spec: &FilterSpec) -> FilterSpec {
        let mut spec = spec.clone();
        if let Some(status) = &self.status {
            spec.status = status.clone();
        }
        if let Some(branch) = &self.branch {
            spec.branch = branch.clone();
        }
        if let Some(title) = &self.app_title {
            spec.app_title = title.clone();
        }
        if let Some(number) = &self.build_number {
            spec.build_number = number.clone();
        }
        if let Some(sort_by) = &self.sort_by {
            spec.sort_by = SortBy::from(sort_by.as_str());
        }
        spec
    }
}

/// Filters and sorts `builds` according to `spec`.
///
/// The input is never reordered; the result is a fresh copy. Sorting is
/// stable, so `apply(&apply(b, s), s) == apply(b, s)`.
pub fn apply(builds: &[EnrichedBuild], spec: &FilterSpec) -> Vec<EnrichedBuild> {
    let mut visible: Vec<EnrichedBuild> = builds
        .iter()
        .filter(|build| spec.matches(build))
        .cloned()
        .collect();

    match spec.sort_by {
        // Builds whose timestamp does not parse go last.
        SortBy::Date => visible.sort_by_cached_key(|build| {
            let triggered = build.triggered_timestamp();
            (triggered.is_none(), Reverse(triggered))
        }),
        SortBy::Status => {
            visible.sort_by(|a, b| a.status_text.as_str().cmp(b.status_text.as_str()))
        }
        SortBy::Unsorted => {}
    }

    visible
}

/// Distinct app titles in first-seen order, for building a title picker.
pub fn distinct_app_titles(builds: &[EnrichedBuild]) -> Vec<String> {
    let mut titles: Vec<String> = Vec::new();
    for title in builds.iter().filter_map(|b| b.app_title.as_deref()) {
        if !titles.iter().any(|t| t == title) {
            titles.push(title.to_string());
        }
    }
    titles
}
