//! Comment service
//!
//! Comments are public writes, so they are only accepted on published posts.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CreateCommentInput, ANONYMOUS_AUTHOR};
use crate::services::realtime::{ChangeFeed, ChangeOp, Table};
use anyhow::Context;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Comment not found: {0}")]
    NotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    feed: ChangeFeed,
}

impl CommentService {
    pub fn new(
        repo: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        feed: ChangeFeed,
    ) -> Self {
        Self { repo, posts, feed }
    }

    /// Comments on a post, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, CommentServiceError> {
        Ok(self
            .repo
            .list_for_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    pub async fn create(
        &self,
        post_id: i64,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment content is required".to_string(),
            ));
        }
        let author = input
            .author
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(ANONYMOUS_AUTHOR);

        match self
            .posts
            .get_by_id(post_id)
            .await
            .context("Failed to check post")?
        {
            Some(post) if post.published => {}
            _ => return Err(CommentServiceError::PostNotFound(post_id)),
        }

        let comment = self
            .repo
            .create(post_id, author, content)
            .await
            .context("Failed to create comment")?;
        self.feed.publish(Table::Comments, ChangeOp::Insert, comment.id);
        Ok(comment)
    }

    pub async fn delete(&self, id: i64) -> Result<(), CommentServiceError> {
        if !self
            .repo
            .delete(id)
            .await
            .context("Failed to delete comment")?
        {
            return Err(CommentServiceError::NotFound(id));
        }
        self.feed.publish(Table::Comments, ChangeOp::Delete, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxCommentRepository, SqlxPostRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::Post;
    use chrono::Utc;

    async fn setup() -> (CommentService, Arc<dyn PostRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let posts = SqlxPostRepository::boxed(pool.clone());
        let service = CommentService::new(
            SqlxCommentRepository::boxed(pool),
            posts.clone(),
            ChangeFeed::new(),
        );
        (service, posts)
    }

    async fn post(posts: &Arc<dyn PostRepository>, published: bool) -> Post {
        let now = Utc::now();
        posts
            .create(&Post {
                id: 0,
                title: "Psalm 121".to_string(),
                content: "<p>I lift up my eyes</p>".to_string(),
                published,
                date: now,
                author: "Cantor".to_string(),
                image: None,
                category_id: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_defaults_author_and_trims() {
        let (service, posts) = setup().await;
        let post = post(&posts, true).await;

        let comment = service
            .create(
                post.id,
                CreateCommentInput {
                    author: Some("   ".to_string()),
                    content: "  Amen  ".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(comment.author, ANONYMOUS_AUTHOR);
        assert_eq!(comment.content, "Amen");
    }

    #[tokio::test]
    async fn test_create_requires_content() {
        let (service, posts) = setup().await;
        let post = post(&posts, true).await;
        let result = service
            .create(
                post.id,
                CreateCommentInput {
                    author: None,
                    content: " \n ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_requires_published_post() {
        let (service, posts) = setup().await;
        let draft = post(&posts, false).await;
        let input = CreateCommentInput {
            author: None,
            content: "Hello".to_string(),
        };
        assert!(matches!(
            service.create(draft.id, input.clone()).await,
            Err(CommentServiceError::PostNotFound(_))
        ));
        assert!(matches!(
            service.create(9999, input).await,
            Err(CommentServiceError::PostNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn test_list_oldest_first_and_delete() {
        let (service, posts) = setup().await;
        let post = post(&posts, true).await;
        for text in ["first", "second"] {
            service
                .create(
                    post.id,
                    CreateCommentInput {
                        author: Some("Reader".to_string()),
                        content: text.to_string(),
                    },
                )
                .await
                .unwrap();
        }

        let comments = service.list_for_post(post.id).await.unwrap();
        let texts: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);

        service.delete(comments[0].id).await.unwrap();
        assert_eq!(service.list_for_post(post.id).await.unwrap().len(), 1);
        assert!(matches!(
            service.delete(comments[0].id).await,
            Err(CommentServiceError::NotFound(_))
        ));
    }
}
