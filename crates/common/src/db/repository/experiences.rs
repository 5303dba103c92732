//! Experience queries

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

impl Repository {
    /// List experiences, most recent position first
    pub async fn list_experiences(
        &self,
        owner_id: Uuid,
        status: Option<ContentStatus>,
    ) -> Result<Vec<Experience>> {
        let mut query = ExperienceEntity::find().filter(ExperienceColumn::OwnerId.eq(owner_id));
        if let Some(status) = status {
            query = query.filter(ExperienceColumn::Status.eq(status.as_str()));
        }

        query
            .order_by_asc(ExperienceColumn::SortOrder)
            .order_by_desc(ExperienceColumn::StartDate)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_experience(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Experience>> {
        ExperienceEntity::find_by_id(id)
            .filter(ExperienceColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_experience(
        &self,
        owner_id: Uuid,
        input: ExperienceInput,
    ) -> Result<Experience> {
        input.check_dates()?;
        let now = Utc::now();

        let experience = ExperienceActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            company: Set(input.company),
            role: Set(input.role),
            location: Set(input.location),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            description: Set(input.description),
            highlights: Set(serde_json::json!(input.highlights)),
            sort_order: Set(input.sort_order),
            status: Set(input.status.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        experience.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_experience(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: ExperienceInput,
    ) -> Result<Experience> {
        input.check_dates()?;

        let existing = self
            .find_experience(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("experience", id))?;

        let mut experience: ExperienceActiveModel = existing.into();
        experience.company = Set(input.company);
        experience.role = Set(input.role);
        experience.location = Set(input.location);
        experience.start_date = Set(input.start_date);
        experience.end_date = Set(input.end_date);
        experience.description = Set(input.description);
        experience.highlights = Set(serde_json::json!(input.highlights));
        experience.sort_order = Set(input.sort_order);
        experience.status = Set(input.status.into());
        experience.updated_at = Set(Utc::now().into());

        experience.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_experience(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ExperienceEntity::delete_many()
            .filter(ExperienceColumn::OwnerId.eq(owner_id))
            .filter(ExperienceColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
