use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
}

/// Body returned by login and registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Body returned by the refresh exchange. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&AuthResponse> for TokenPair {
    fn from(response: &AuthResponse) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    Student,
    Teacher,
    Admin,
}

impl RoleType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role type '{other}'")),
        }
    }
}

/// Membership of a user in a subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub role_type: RoleType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub subject_id: Uuid,
    pub created_by_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub created_by: Option<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub task_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub task: Option<Task>,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub members: Option<Vec<User>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemAssignee {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
}

/// A unit of work inside a project, possibly split into subproblems
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    pub number: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub solved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub creator: Option<User>,
    #[serde(default)]
    pub assignees: Option<Vec<ProblemAssignee>>,
    #[serde(default, alias = "children")]
    pub subproblems: Option<Vec<Problem>>,
}

impl Problem {
    /// Whether this problem sits at the top of its project's tree
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Completion record attached to a problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemResult {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub creator_id: Uuid,
    pub done: bool,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildrenStatistics {
    pub completed: u64,
    pub incomplete: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemWithResult {
    pub problem: Problem,
    #[serde(default)]
    pub result: Option<ProblemResult>,
    #[serde(default)]
    pub children_statistics: Option<ChildrenStatistics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProblemStatistics {
    pub completed: u64,
    pub incomplete: u64,
    pub total: u64,
    pub percentage: u64,
}

/// Query parameters for paginated listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Paginated<T> {
    /// Whether more items exist past this page
    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.data.len() as u64) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_type_wire_format() {
        assert_eq!(serde_json::to_value(RoleType::Teacher).unwrap(), json!("teacher"));
        let parsed: RoleType = serde_json::from_value(json!("admin")).unwrap();
        assert_eq!(parsed, RoleType::Admin);
        assert_eq!("Student".parse::<RoleType>().unwrap(), RoleType::Student);
        assert!("owner".parse::<RoleType>().is_err());
    }

    #[test]
    fn test_problem_accepts_children_and_nulls() {
        let value = json!({
            "id": "6a1f0a7e-1c8a-4a6f-9f0e-3f7f0a1b2c3d",
            "project_id": "0b3c8f5e-8a3e-4c6b-9d4e-1a2b3c4d5e6f",
            "creator_id": "1c2d3e4f-5a6b-4c7d-8e9f-0a1b2c3d4e5f",
            "parent_id": null,
            "number": 1,
            "title": "Root",
            "description": "",
            "start_time": "2025-03-01T09:00:00Z",
            "end_time": "2025-03-08T09:00:00Z",
            "solved": false,
            "created_at": "2025-03-01T09:00:00Z",
            "updated_at": "2025-03-01T09:00:00Z",
            "creator": null,
            "assignees": null,
            "children": []
        });

        let problem: Problem = serde_json::from_value(value).unwrap();
        assert!(problem.is_root());
        assert!(problem.assignees.is_none());
        assert_eq!(problem.subproblems, Some(vec![]));
    }

    #[test]
    fn test_pagination_skips_absent_fields() {
        let params = Pagination::new(Some(20), None);
        assert_eq!(serde_json::to_value(params).unwrap(), json!({ "limit": 20 }));
        assert_eq!(serde_json::to_value(Pagination::default()).unwrap(), json!({}));
    }

    #[test]
    fn test_paginated_has_more() {
        let page: Paginated<u32> = Paginated {
            data: vec![1, 2],
            total: 5,
            limit: 2,
            offset: 2,
        };
        assert!(page.has_more());

        let last: Paginated<u32> = Paginated {
            data: vec![5],
            total: 5,
            limit: 2,
            offset: 4,
        };
        assert!(!last.has_more());
    }
}
