//! Subject membership client methods

use super::{ApiClient, ClientError};
use reqwest::Method;
use studyboard_core::{ChangeRoleRequest, Role, Validate};
use uuid::Uuid;

impl ApiClient {
    /// Change a member's role within a subject
    pub async fn change_role(
        &self,
        subject_id: Uuid,
        role_id: Uuid,
        change: ChangeRoleRequest,
    ) -> Result<Role, ClientError> {
        change.validate()?;
        let request = self
            .request(
                Method::POST,
                &format!("/subjects/{subject_id}/roles/{role_id}/change"),
            )
            .json(&change);
        self.execute(request).await
    }

    /// Remove a member from a subject
    pub async fn remove_member(&self, subject_id: Uuid, role_id: Uuid) -> Result<(), ClientError> {
        let request = self.request(
            Method::DELETE,
            &format!("/subjects/{subject_id}/roles/{role_id}"),
        );
        self.execute_empty(request).await
    }
}
