//! Project API client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{
    CreateProjectRequest, JoinProjectRequest, ProblemStatistics, Project, User, Validate,
};
use uuid::Uuid;

impl ApiClient {
    /// Projects formed against a task
    pub async fn task_projects(&self, task_id: Uuid) -> Result<Vec<Project>, ClientError> {
        let request = self.request(Method::GET, &format!("/tasks/{task_id}/projects"));
        self.execute(request).await
    }

    pub async fn create_project(
        &self,
        task_id: Uuid,
        project: CreateProjectRequest,
    ) -> Result<Project, ClientError> {
        project.validate()?;
        let request = self
            .request(Method::POST, &format!("/tasks/{task_id}/projects"))
            .json(&project);
        self.execute(request).await
    }

    /// Join a project by its code
    pub async fn join_project(&self, join: JoinProjectRequest) -> Result<Project, ClientError> {
        join.validate()?;
        let request = self.request(Method::POST, "/projects/join").json(&join);
        self.execute(request).await
    }

    /// Projects the current user belongs to
    pub async fn my_projects(&self) -> Result<Vec<Project>, ClientError> {
        let request = self.request(Method::GET, "/projects/my");
        self.execute(request).await
    }

    pub async fn project_users(&self, project_id: Uuid) -> Result<Vec<User>, ClientError> {
        let request = self.request(Method::GET, &format!("/projects/{project_id}/users"));
        self.execute(request).await
    }

    /// Completion counts over the project's problems
    pub async fn project_statistics(
        &self,
        project_id: Uuid,
    ) -> Result<ProblemStatistics, ClientError> {
        let request = self.request(Method::GET, &format!("/projects/{project_id}/statistics"));
        self.execute(request).await
    }
}
