//! Project queries

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::slug::{slugify, unique_slug};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

impl Repository {
    /// List projects: featured first, then by sort order
    pub async fn list_projects(
        &self,
        owner_id: Uuid,
        status: Option<ContentStatus>,
    ) -> Result<Vec<Project>> {
        let mut query = ProjectEntity::find().filter(ProjectColumn::OwnerId.eq(owner_id));
        if let Some(status) = status {
            query = query.filter(ProjectColumn::Status.eq(status.as_str()));
        }

        query
            .order_by_desc(ProjectColumn::Featured)
            .order_by_asc(ProjectColumn::SortOrder)
            .order_by_desc(ProjectColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_project(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Project>> {
        ProjectEntity::find_by_id(id)
            .filter(ProjectColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_published_project(&self, owner_id: Uuid, slug: &str) -> Result<Option<Project>> {
        ProjectEntity::find()
            .filter(ProjectColumn::OwnerId.eq(owner_id))
            .filter(ProjectColumn::Slug.eq(slug))
            .filter(ProjectColumn::Status.eq(ContentStatus::Published.as_str()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn project_slug_exists(
        &self,
        owner_id: Uuid,
        slug: String,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let mut query = ProjectEntity::find()
            .filter(ProjectColumn::OwnerId.eq(owner_id))
            .filter(ProjectColumn::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(ProjectColumn::Id.ne(id));
        }

        Ok(query.count(self.write_conn()).await? > 0)
    }

    pub async fn create_project(&self, owner_id: Uuid, input: ProjectInput) -> Result<Project> {
        let base = slugify(input.slug.as_deref().unwrap_or(&input.title));
        let slug = unique_slug(&base, |candidate| {
            self.project_slug_exists(owner_id, candidate, None)
        })
        .await?;

        let now = Utc::now();

        let project = ProjectActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            slug: Set(slug),
            title: Set(input.title),
            summary: Set(input.summary),
            body: Set(input.body),
            tech_stack: Set(serde_json::json!(input.tech_stack)),
            repo_url: Set(input.repo_url),
            live_url: Set(input.live_url),
            featured: Set(input.featured),
            sort_order: Set(input.sort_order),
            status: Set(input.status.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        project.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_project(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: ProjectInput,
    ) -> Result<Project> {
        let existing = self
            .find_project(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("project", id))?;

        let slug = match input.slug.as_deref().map(slugify) {
            Some(base) if base != existing.slug => {
                unique_slug(&base, |candidate| {
                    self.project_slug_exists(owner_id, candidate, Some(id))
                })
                .await?
            }
            _ => existing.slug.clone(),
        };

        let mut project: ProjectActiveModel = existing.into();
        project.slug = Set(slug);
        project.title = Set(input.title);
        project.summary = Set(input.summary);
        project.body = Set(input.body);
        project.tech_stack = Set(serde_json::json!(input.tech_stack));
        project.repo_url = Set(input.repo_url);
        project.live_url = Set(input.live_url);
        project.featured = Set(input.featured);
        project.sort_order = Set(input.sort_order);
        project.status = Set(input.status.into());
        project.updated_at = Set(Utc::now().into());

        project.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_project(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ProjectEntity::delete_many()
            .filter(ProjectColumn::OwnerId.eq(owner_id))
            .filter(ProjectColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
