//! Story queries

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
    pub async fn list_stories(
        &self,
        owner_id: Uuid,
        status: Option<ContentStatus>,
    ) -> Result<Vec<Story>> {
        let mut query = StoryEntity::find().filter(StoryColumn::OwnerId.eq(owner_id));
        if let Some(status) = status {
            query = query.filter(StoryColumn::Status.eq(status.as_str()));
        }

        query
            .order_by_desc(StoryColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_story(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Story>> {
        StoryEntity::find_by_id(id)
            .filter(StoryColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn find_published_story(&self, owner_id: Uuid, slug: &str) -> Result<Option<Story>> {
        StoryEntity::find()
            .filter(StoryColumn::OwnerId.eq(owner_id))
            .filter(StoryColumn::Slug.eq(slug))
            .filter(StoryColumn::Status.eq(ContentStatus::Published.as_str()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn story_slug_exists(
        &self,
        owner_id: Uuid,
        slug: String,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let mut query = StoryEntity::find()
            .filter(StoryColumn::OwnerId.eq(owner_id))
            .filter(StoryColumn::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(StoryColumn::Id.ne(id));
        }

        Ok(query.count(self.write_conn()).await? > 0)
    }

    pub async fn create_story(&self, owner_id: Uuid, input: StoryInput) -> Result<Story> {
        let base = slugify(input.slug.as_deref().unwrap_or(&input.title));
        let slug = unique_slug(&base, |candidate| {
            self.story_slug_exists(owner_id, candidate, None)
        })
        .await?;

        let now = Utc::now();

        let story = StoryActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            slug: Set(slug),
            title: Set(input.title),
            body: Set(input.body),
            status: Set(input.status.into()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        story.insert(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn update_story(&self, owner_id: Uuid, id: Uuid, input: StoryInput) -> Result<Story> {
        let existing = self
            .find_story(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("story", id))?;

        let slug = match input.slug.as_deref().map(slugify) {
            Some(base) if base != existing.slug => {
                unique_slug(&base, |candidate| {
                    self.story_slug_exists(owner_id, candidate, Some(id))
                })
                .await?
            }
            _ => existing.slug.clone(),
        };

        let mut story: StoryActiveModel = existing.into();
        story.slug = Set(slug);
        story.title = Set(input.title);
        story.body = Set(input.body);
        story.status = Set(input.status.into());
        story.updated_at = Set(Utc::now().into());

        story.update(self.write_conn()).await.map_err(Into::into)
    }

    pub async fn delete_story(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = StoryEntity::delete_many()
            .filter(StoryColumn::OwnerId.eq(owner_id))
            .filter(StoryColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
