//! Article queries

use super::{page_bounds, Page, Repository};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::slug::{slugify, unique_slug};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

impl Repository {
    /// List articles, newest publication first
    pub async fn list_articles(
        &self,
        owner_id: Uuid,
        status: Option<ContentStatus>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<Page<Article>> {
        let (page_index, per_page) = page_bounds(page, per_page);

        let mut query = ArticleEntity::find().filter(ArticleColumn::OwnerId.eq(owner_id));
        if let Some(status) = status {
            query = query.filter(ArticleColumn::Status.eq(status.as_str()));
        }

        let paginator = query
            .order_by_desc(ArticleColumn::PublishedAt)
            .order_by_desc(ArticleColumn::CreatedAt)
            .paginate(self.read_conn(), per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page_index).await?;

        Ok(Page { items, total, page: page_index + 1, per_page })
    }

    /// All articles in a status, unpaginated
    pub async fn all_articles(&self, owner_id: Uuid, status: ContentStatus) -> Result<Vec<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::OwnerId.eq(owner_id))
            .filter(ArticleColumn::Status.eq(status.as_str()))
            .order_by_desc(ArticleColumn::PublishedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find article by ID
    pub async fn find_article(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Article>> {
        ArticleEntity::find_by_id(id)
            .filter(ArticleColumn::OwnerId.eq(owner_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a published article by slug
    pub async fn find_published_article(&self, owner_id: Uuid, slug: &str) -> Result<Option<Article>> {
        ArticleEntity::find()
            .filter(ArticleColumn::OwnerId.eq(owner_id))
            .filter(ArticleColumn::Slug.eq(slug))
            .filter(ArticleColumn::Status.eq(ContentStatus::Published.as_str()))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Whether a slug is taken by another article of the owner
    pub async fn article_slug_exists(
        &self,
        owner_id: Uuid,
        slug: String,
        exclude: Option<Uuid>,
    ) -> Result<bool> {
        let mut query = ArticleEntity::find()
            .filter(ArticleColumn::OwnerId.eq(owner_id))
            .filter(ArticleColumn::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(ArticleColumn::Id.ne(id));
        }

        Ok(query.count(self.write_conn()).await? > 0)
    }

    /// Create a new article
    pub async fn create_article(&self, owner_id: Uuid, input: ArticleInput) -> Result<Article> {
        let base = slugify(input.slug.as_deref().unwrap_or(&input.title));
        let slug = unique_slug(&base, |candidate| {
            self.article_slug_exists(owner_id, candidate, None)
        })
        .await?;

        let now = Utc::now();

        let article = ArticleActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(owner_id),
            slug: Set(slug),
            title: Set(input.title),
            excerpt: Set(input.excerpt),
            body: Set(input.body),
            tags: Set(serde_json::json!(input.tags)),
            status: Set(input.status.into()),
            published_at: Set(input.status.is_published().then(|| now.into())),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        article.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Replace an article's editable fields
    ///
    /// The slug only changes when the input names one explicitly.
    pub async fn update_article(
        &self,
        owner_id: Uuid,
        id: Uuid,
        input: ArticleInput,
    ) -> Result<Article> {
        let existing = self
            .find_article(owner_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("article", id))?;

        let slug = match input.slug.as_deref().map(slugify) {
            Some(base) if base != existing.slug => {
                unique_slug(&base, |candidate| {
                    self.article_slug_exists(owner_id, candidate, Some(id))
                })
                .await?
            }
            _ => existing.slug.clone(),
        };

        let now = Utc::now();
        let published_at = match existing.published_at {
            Some(at) => Some(at),
            None if input.status.is_published() => Some(now.into()),
            None => None,
        };

        let mut article: ArticleActiveModel = existing.into();
        article.slug = Set(slug);
        article.title = Set(input.title);
        article.excerpt = Set(input.excerpt);
        article.body = Set(input.body);
        article.tags = Set(serde_json::json!(input.tags));
        article.status = Set(input.status.into());
        article.published_at = Set(published_at);
        article.updated_at = Set(now.into());

        article.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete article by ID
    pub async fn delete_article(&self, owner_id: Uuid, id: Uuid) -> Result<bool> {
        let result = ArticleEntity::delete_many()
            .filter(ArticleColumn::OwnerId.eq(owner_id))
            .filter(ArticleColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn repo(db: MockDatabase) -> Repository {
        Repository::new(DbPool::from_connection(db.into_connection()))
    }

    #[tokio::test]
    async fn test_slug_exists_reads_count() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(1)]])
                .append_query_results([[count_row(0)]]),
        );
        let owner = Uuid::new_v4();

        assert!(repo.article_slug_exists(owner, "taken".into(), None).await.unwrap());
        assert!(!repo.article_slug_exists(owner, "free".into(), None).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_article_is_not_found() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Article>::new()]),
        );

        let input = ArticleInput {
            title: "Title".into(),
            slug: None,
            excerpt: String::new(),
            body: "Body".into(),
            tags: vec![],
            status: ContentStatus::Draft,
        };

        let err = repo.update_article(Uuid::new_v4(), Uuid::new_v4(), input).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_huge_page_is_empty_not_a_panic() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(2)]])
                .append_query_results([Vec::<Article>::new()]),
        );

        let page = repo
            .list_articles(Uuid::new_v4(), None, Some(u64::MAX), Some(100))
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 2);
        assert_eq!(page.page, super::super::MAX_PAGE);
    }

    #[tokio::test]
    async fn test_delete_reports_rows_affected() {
        let repo = repo(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult { last_insert_id: 0, rows_affected: 1 },
                    MockExecResult { last_insert_id: 0, rows_affected: 0 },
                ]),
        );
        let owner = Uuid::new_v4();

        assert!(repo.delete_article(owner, Uuid::new_v4()).await.unwrap());
        assert!(!repo.delete_article(owner, Uuid::new_v4()).await.unwrap());
    }
}
