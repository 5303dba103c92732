//! Indexable documents built from content rows

use crate::db::models::*;
use crate::db::Repository;
use crate::errors::Result;
use serde_json::json;
use uuid::Uuid;

/// Text of one source, ready to be chunked under its source key
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub kind: SourceKind,
    /// `None` for the resume
    pub source_id: Option<Uuid>,
    pub title: String,
    pub text: String,
    pub metadata: serde_json::Value,
}

impl SourceDocument {
    pub fn resume(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Resume,
            source_id: None,
            title: title.into(),
            text: text.into(),
            metadata: json!({}),
        }
    }

    /// A manual knowledge entry; every chunk of the entry shares `entry_id`
    pub fn manual(
        entry_id: Uuid,
        title: impl Into<String>,
        text: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: SourceKind::Manual,
            source_id: Some(entry_id),
            title: title.into(),
            text: text.into(),
            metadata: metadata.unwrap_or_else(|| json!({})),
        }
    }
}

fn join_sections(sections: &[&str]) -> String {
    sections
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl From<&Article> for SourceDocument {
    fn from(article: &Article) -> Self {
        let heading = format!("# {}", article.title);
        Self {
            kind: SourceKind::Article,
            source_id: Some(article.id),
            title: article.title.clone(),
            text: join_sections(&[&heading, &article.excerpt, &article.body]),
            metadata: json!({ "slug": article.slug, "tags": article.tags }),
        }
    }
}

impl From<&Project> for SourceDocument {
    fn from(project: &Project) -> Self {
        let heading = format!("Project: {}", project.title);
        let tech = project.tech_list();
        let stack = if tech.is_empty() {
            String::new()
        } else {
            format!("Tech stack: {}", tech.join(", "))
        };

        Self {
            kind: SourceKind::Project,
            source_id: Some(project.id),
            title: project.title.clone(),
            text: join_sections(&[&heading, &project.summary, &project.body, &stack]),
            metadata: json!({
                "slug": project.slug,
                "repo_url": project.repo_url,
                "live_url": project.live_url,
            }),
        }
    }
}

impl From<&Skill> for SourceDocument {
    fn from(skill: &Skill) -> Self {
        let category = if skill.category.is_empty() {
            String::new()
        } else {
            format!(" Category: {}.", skill.category)
        };
        let summary = format!(
            "Skill: {}.{} Self-assessed proficiency: {} out of 5.",
            skill.name, category, skill.level
        );

        Self {
            kind: SourceKind::Skill,
            source_id: Some(skill.id),
            title: skill.name.clone(),
            text: join_sections(&[&summary, &skill.description]),
            metadata: json!({ "category": skill.category, "level": skill.level }),
        }
    }
}

impl From<&Story> for SourceDocument {
    fn from(story: &Story) -> Self {
        let heading = format!("# {}", story.title);
        Self {
            kind: SourceKind::Story,
            source_id: Some(story.id),
            title: story.title.clone(),
            text: join_sections(&[&heading, &story.body]),
            metadata: json!({ "slug": story.slug }),
        }
    }
}

impl From<&Experience> for SourceDocument {
    fn from(experience: &Experience) -> Self {
        let title = format!("{} at {}", experience.role, experience.company);
        let end = experience
            .end_date
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| "present".to_string());
        let location = experience
            .location
            .as_deref()
            .map(|l| format!(", {}", l))
            .unwrap_or_default();
        let heading = format!(
            "{}{} ({} to {})",
            title,
            location,
            experience.start_date.format("%B %Y"),
            end
        );

        let highlights = experience.highlight_list();
        let highlights = if highlights.is_empty() {
            String::new()
        } else {
            let items: Vec<String> = highlights.iter().map(|h| format!("- {}", h)).collect();
            format!("Highlights:\n{}", items.join("\n"))
        };

        Self {
            kind: SourceKind::Experience,
            source_id: Some(experience.id),
            title,
            text: join_sections(&[&heading, &experience.description, &highlights]),
            metadata: json!({ "company": experience.company, "role": experience.role }),
        }
    }
}

/// Every published content row of the owner as an indexable document
pub async fn published_documents(repo: &Repository, owner_id: Uuid) -> Result<Vec<SourceDocument>> {
    let published = Some(ContentStatus::Published);

    let (articles, projects, skills, stories, experiences) = futures::try_join!(
        repo.all_articles(owner_id, ContentStatus::Published),
        repo.list_projects(owner_id, published),
        repo.list_skills(owner_id, published),
        repo.list_stories(owner_id, published),
        repo.list_experiences(owner_id, published),
    )?;

    let mut documents = Vec::with_capacity(
        articles.len() + projects.len() + skills.len() + stories.len() + experiences.len(),
    );
    documents.extend(articles.iter().map(SourceDocument::from));
    documents.extend(projects.iter().map(SourceDocument::from));
    documents.extend(skills.iter().map(SourceDocument::from));
    documents.extend(stories.iter().map(SourceDocument::from));
    documents.extend(experiences.iter().map(SourceDocument::from));

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn experience(end: Option<NaiveDate>) -> Experience {
        let now = Utc::now().into();
        Experience {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            company: "Acme".into(),
            role: "Staff Engineer".into(),
            location: Some("Berlin".into()),
            start_date: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            end_date: end,
            description: "Led the storage team.".into(),
            highlights: json!(["Cut p99 latency by half", 7]),
            sort_order: 0,
            status: ContentStatus::Published.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_experience_document() {
        let doc = SourceDocument::from(&experience(None));

        assert_eq!(doc.kind, SourceKind::Experience);
        assert_eq!(doc.title, "Staff Engineer at Acme");
        assert!(doc
            .text
            .starts_with("Staff Engineer at Acme, Berlin (March 2021 to present)\n\n"));
        assert!(doc.text.ends_with("Highlights:\n- Cut p99 latency by half"));

        let ended = SourceDocument::from(&experience(NaiveDate::from_ymd_opt(2023, 9, 30)));
        assert!(ended.text.contains("to September 2023)"));
    }

    #[test]
    fn test_skill_document_skips_empty_sections() {
        let now = Utc::now().into();
        let skill = Skill {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            name: "Rust".into(),
            category: String::new(),
            level: 5,
            description: String::new(),
            status: ContentStatus::Published.into(),
            created_at: now,
            updated_at: now,
        };

        let doc = SourceDocument::from(&skill);
        assert_eq!(doc.text, "Skill: Rust. Self-assessed proficiency: 5 out of 5.");
        assert_eq!(doc.source_id, Some(skill.id));
    }

    #[test]
    fn test_manual_and_resume_keys() {
        let entry = Uuid::new_v4();
        let manual = SourceDocument::manual(entry, "FAQ", "text", None);
        assert_eq!(manual.source_id, Some(entry));
        assert_eq!(manual.metadata, json!({}));

        let resume = SourceDocument::resume("Resume", "text");
        assert_eq!(resume.kind, SourceKind::Resume);
        assert!(resume.source_id.is_none());
    }
}
