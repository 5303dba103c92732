//! Skill queries

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

impl Repository {
    /// List skills grouped by category, strongest first
    pub async fn list_skills(
        &self,
        owner_id: Uuid,
        status: Option<ContentStatus>,
    ) -> Result<Vec<Skill>> {
        let mut query = SkillEntity::find().filter(SkillColumn::OwnerId.eq(owner_id));
        if let Some(status) = status {
            query = query.filter(SkillColumn::Status.eq(status.as_str()));
        }

        query
            .order_by_asc(SkillColumn::Category)
            .order_by_desc(SkillColumn::Level)
            .order_by_asc(SkillColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_skill(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Skill>> {
        SkillEntity::find_by_id(id)
            .filter(SkillColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn create_skill(&self, owner_id: Uuid, input: SkillInput) -> Result<Skill> {
        let now = Utc::now();

        let skill = SkillActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            name: Set(input.name),
            category: Set(input.category),
            level: Set(input.level),
            description: Set(input.description),
            status: Set(input.status.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        skill.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_skill(&self, owner_id: Uuid, id: Uuid, input: SkillInput) -> Result<Skill> {
        let existing = self
            .find_skill(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("skill", id))?;

        let mut skill: SkillActiveModel = existing.into();
        skill.name = Set(input.name);
        skill.category = Set(input.category);
        skill.level = Set(input.level);
        skill.description = Set(input.description);
        skill.status = Set(input.status.into());
        skill.updated_at = Set(Utc::now().into());

        skill.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_skill(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = SkillEntity::delete_many()
            .filter(SkillColumn::OwnerId.eq(owner_id))
            .filter(SkillColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
