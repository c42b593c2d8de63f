//! Subject API client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{
    CreateSubjectRequest, JoinSubjectRequest, Paginated, Pagination, Role, Subject,
    UpdateSubjectRequest, Validate,
};
use uuid::Uuid;

impl ApiClient {
    /// List subjects, one page at a time
    pub async fn list_subjects(
        &self,
        pagination: Pagination,
    ) -> Result<Paginated<Subject>, ClientError> {
        let request = self.request(Method::GET, "/subjects").query(&pagination);
        self.execute(request).await
    }

    pub async fn get_subject(&self, id: Uuid) -> Result<Subject, ClientError> {
        let request = self.request(Method::GET, &format!("/subjects/{id}"));
        self.execute(request).await
    }

    pub async fn create_subject(
        &self,
        subject: CreateSubjectRequest,
    ) -> Result<Subject, ClientError> {
        subject.validate()?;
        let request = self.request(Method::POST, "/subjects").json(&subject);
        self.execute(request).await
    }

    pub async fn update_subject(
        &self,
        id: Uuid,
        update: UpdateSubjectRequest,
    ) -> Result<Subject, ClientError> {
        update.validate()?;
        let request = self
            .request(Method::PUT, &format!("/subjects/{id}"))
            .json(&update);
        self.execute(request).await
    }

    pub async fn delete_subject(&self, id: Uuid) -> Result<(), ClientError> {
        let request = self.request(Method::DELETE, &format!("/subjects/{id}"));
        self.execute_empty(request).await
    }

    /// Join a subject by its code
    pub async fn join_subject(&self, join: JoinSubjectRequest) -> Result<Subject, ClientError> {
        join.validate()?;
        let request = self.request(Method::POST, "/subjects/join").json(&join);
        self.execute(request).await
    }

    /// Subjects the current user belongs to
    pub async fn my_subjects(&self) -> Result<Vec<Subject>, ClientError> {
        let request = self.request(Method::GET, "/subjects/get/my");
        self.execute(request).await
    }

    pub async fn subject_members(&self, id: Uuid) -> Result<Vec<Role>, ClientError> {
        let request = self.request(Method::GET, &format!("/subjects/{id}/members"));
        self.execute(request).await
    }
}
