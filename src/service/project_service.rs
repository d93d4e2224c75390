use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{ProjectRepository, PurchaseRepository},
    storage::{project_file_key, ObjectStore, StoredObject},
};

pub struct ProjectService {
    project_repo: Arc<dyn ProjectRepository>,
    purchase_repo: Arc<dyn PurchaseRepository>,
    store: Arc<dyn ObjectStore>,
}

/// A project file ready to stream to the caller.
pub struct ProjectDownload {
    pub file_name: String,
    pub object: StoredObject,
}

impl ProjectService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        purchase_repo: Arc<dyn PurchaseRepository>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            project_repo,
            purchase_repo,
            store,
        }
    }

    pub async fn create(&self, creator_id: Uuid, mut request: CreateProjectRequest) -> Result<Project> {
        request.validate()?;
        request.currency = request.currency.to_uppercase();
        if !is_supported_currency(&request.currency) {
            return Err(AppError::Validation(format!("Unsupported currency: {}", request.currency)));
        }

        let project = self.project_repo.create(creator_id, request).await?;
        tracing::info!(project_id = %project.id, creator_id = %creator_id, "Project created");
        Ok(project)
    }

    pub async fn get(&self, id: Uuid) -> Result<Project> {
        self.project_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Project>> {
        self.project_repo.list(limit.clamp(1, 100), offset.max(0)).await
    }

    pub async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Project>> {
        self.project_repo.list_by_creator(creator_id).await
    }

    /// Stores a new file for the project, replacing any previous one.
    pub async fn upload_file(
        &self,
        project_id: Uuid,
        creator_id: Uuid,
        file_name: &str,
        data: &[u8],
    ) -> Result<Project> {
        let project = self.get(project_id).await?;
        if project.creator_id != creator_id {
            return Err(AppError::Forbidden);
        }

        let key = project_file_key(project_id, file_name, data.len())?;
        self.store.put(&key, data).await?;

        let updated = self.project_repo.set_file(project_id, &key, file_name).await?;

        if let Some(previous) = project.file_key {
            if let Err(e) = self.store.delete(&previous).await {
                tracing::warn!(project_id = %project_id, key = %previous, "Failed to delete replaced file: {}", e);
            }
        }

        Ok(updated)
    }

    pub async fn list_purchases(&self, buyer_id: Uuid) -> Result<Vec<Purchase>> {
        self.purchase_repo.list_by_buyer(buyer_id).await
    }

    /// Access is re-checked on every download: the caller must hold a
    /// purchase granting access, or be the project's creator.
    pub async fn download(&self, project_id: Uuid, user_id: Uuid) -> Result<ProjectDownload> {
        let project = self.get(project_id).await?;

        let purchase = if project.creator_id == user_id {
            None
        } else {
            let purchase = self
                .purchase_repo
                .find_for_buyer(user_id, project_id)
                .await?
                .filter(|p| p.access_granted)
                .ok_or(AppError::Forbidden)?;
            Some(purchase)
        };

        let (Some(key), Some(file_name)) = (project.file_key, project.file_name) else {
            return Err(AppError::NotFound("Project file not available".to_string()));
        };

        let object = self.store.get(&key).await?;

        if let Some(purchase) = purchase {
            self.purchase_repo.record_download(purchase.id).await?;
        }

        Ok(ProjectDownload { file_name, object })
    }
}
