//! Task API client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{
    CreateTaskRequest, Paginated, Pagination, Task, UpdateTaskRequest, Validate,
};
use uuid::Uuid;

impl ApiClient {
    /// Tasks posted in a subject
    pub async fn subject_tasks(
        &self,
        subject_id: Uuid,
        pagination: Pagination,
    ) -> Result<Paginated<Task>, ClientError> {
        let request = self
            .request(Method::GET, &format!("/subjects/{subject_id}/tasks"))
            .query(&pagination);
        self.execute(request).await
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Task, ClientError> {
        let request = self.request(Method::GET, &format!("/tasks/{id}"));
        self.execute(request).await
    }

    pub async fn create_task(
        &self,
        subject_id: Uuid,
        task: CreateTaskRequest,
    ) -> Result<Task, ClientError> {
        task.validate()?;
        let request = self
            .request(Method::POST, &format!("/subjects/{subject_id}/tasks"))
            .json(&task);
        self.execute(request).await
    }

    pub async fn update_task(&self, id: Uuid, update: UpdateTaskRequest) -> Result<Task, ClientError> {
        update.validate()?;
        let request = self
            .request(Method::PUT, &format!("/tasks/{id}"))
            .json(&update);
        self.execute(request).await
    }
}
