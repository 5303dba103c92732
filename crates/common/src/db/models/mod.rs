//! SeaORM entity models
//!
//! Database entities for Folio

mod article;
mod chunk;
mod experience;
mod project;
mod skill;
mod status;
mod story;

pub use status::ContentStatus;

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    ActiveModel as ArticleActiveModel,
    Column as ArticleColumn,
    ArticleInput,
};

pub use project::{
    Entity as ProjectEntity,
    Model as Project,
    ActiveModel as ProjectActiveModel,
    Column as ProjectColumn,
    ProjectInput,
    is_http_url,
};

pub use skill::{
    Entity as SkillEntity,
    Model as Skill,
    ActiveModel as SkillActiveModel,
    Column as SkillColumn,
    SkillInput,
};

pub use story::{
    Entity as StoryEntity,
    Model as Story,
    ActiveModel as StoryActiveModel,
    Column as StoryColumn,
    StoryInput,
};

pub use experience::{
    Entity as ExperienceEntity,
    Model as Experience,
    ActiveModel as ExperienceActiveModel,
    Column as ExperienceColumn,
    ExperienceInput,
};

pub use chunk::{
    Entity as ChunkEntity,
    Model as Chunk,
    ActiveModel as ChunkActiveModel,
    Column as ChunkColumn,
    ChunkUpdate,
    KnowledgeInput,
    SourceKind,
};
