//! Problem and result API client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{
    CreateProblemRequest, CreateResultRequest, Problem, ProblemResult, ProblemWithResult,
    UpdateProblemRequest, Validate,
};
use uuid::Uuid;

impl ApiClient {
    /// Problems in a project, optionally only those assigned to the caller
    pub async fn project_problems(
        &self,
        project_id: Uuid,
        assigned_only: bool,
    ) -> Result<Vec<Problem>, ClientError> {
        let mut request = self.request(Method::GET, &format!("/projects/{project_id}/problems"));
        if assigned_only {
            request = request.query(&[("assigned_only", "true")]);
        }
        self.execute(request).await
    }

    /// A problem with its result, if solved, and child statistics
    pub async fn get_problem(&self, id: Uuid) -> Result<ProblemWithResult, ClientError> {
        let request = self.request(Method::GET, &format!("/problems/{id}"));
        self.execute(request).await
    }

    pub async fn create_subproblem(
        &self,
        parent_id: Uuid,
        problem: CreateProblemRequest,
    ) -> Result<Problem, ClientError> {
        problem.validate()?;
        let request = self
            .request(Method::POST, &format!("/problems/{parent_id}/subproblems"))
            .json(&problem);
        self.execute(request).await
    }

    pub async fn update_problem(
        &self,
        id: Uuid,
        update: UpdateProblemRequest,
    ) -> Result<Problem, ClientError> {
        update.validate()?;
        let request = self
            .request(Method::PUT, &format!("/problems/{id}"))
            .json(&update);
        self.execute(request).await
    }

    pub async fn subproblems(&self, parent_id: Uuid) -> Result<Vec<Problem>, ClientError> {
        let request = self.request(Method::GET, &format!("/problems/{parent_id}/subproblems"));
        self.execute(request).await
    }

    pub async fn problem_result(&self, problem_id: Uuid) -> Result<ProblemResult, ClientError> {
        let request = self.request(Method::GET, &format!("/problems/{problem_id}/result"));
        self.execute(request).await
    }

    /// Record the outcome of a problem
    pub async fn create_result(
        &self,
        problem_id: Uuid,
        result: CreateResultRequest,
    ) -> Result<ProblemResult, ClientError> {
        result.validate()?;
        let request = self
            .request(Method::POST, &format!("/problems/{problem_id}/result"))
            .json(&result);
        self.execute(request).await
    }
}
