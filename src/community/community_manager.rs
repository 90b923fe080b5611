use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info};

use super::community_store::{CommunityStore, VisibilityScope};
use super::models::{
    Comment, CommentDraft, CommunityCounts, LikeState, PollOptionResult, Post, PostDraft,
    PostType, PostView, Privacy,
};
use crate::error::{ServiceError, ServiceResult, Validator};
use crate::learning::LearningStore;
use crate::notifications::{NotificationType, Notifier};
use crate::server::metrics;
use crate::sqlite_persistence::{new_entity_id, now_secs};
use crate::user::{Actor, FullUserStore, Permission};

pub const DEFAULT_MAX_POST_LENGTH: usize = 5000;
pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;
const MAX_COMMENT_LENGTH: usize = 2000;
const MAX_POLL_OPTION_LENGTH: usize = 200;

fn is_moderator(actor: &Actor) -> bool {
    actor.role.permissions().contains(&Permission::ModerateContent)
}

/// Posts, comments, likes, polls and shares.
pub struct CommunityManager {
    store: Arc<dyn CommunityStore>,
    user_store: Arc<dyn FullUserStore>,
    learning_store: Arc<dyn LearningStore>,
    notifier: Notifier,
    max_post_length: usize,
}

impl CommunityManager {
    pub fn new(
        store: Arc<dyn CommunityStore>,
        user_store: Arc<dyn FullUserStore>,
        learning_store: Arc<dyn LearningStore>,
        notifier: Notifier,
        max_post_length: usize,
    ) -> Self {
        Self {
            store,
            user_store,
            learning_store,
            notifier,
            max_post_length,
        }
    }

    fn load_post(&self, post_id: &str) -> ServiceResult<Post> {
        self.store
            .get_post(post_id)?
            .ok_or(ServiceError::NotFound("Post"))
    }

    fn can_view(&self, viewer_id: usize, post: &Post) -> ServiceResult<bool> {
        Ok(match post.privacy {
            Privacy::Public => true,
            _ if post.author_id == viewer_id => true,
            Privacy::Friends => self.user_store.are_friends(viewer_id, post.author_id)?,
            Privacy::Private => false,
        })
    }

    /// Loads a post `viewer_id` may see. Invisible posts look missing.
    fn visible_post(&self, viewer_id: usize, post_id: &str) -> ServiceResult<Post> {
        let post = self.load_post(post_id)?;
        if !self.can_view(viewer_id, &post)? {
            return Err(ServiceError::NotFound("Post"));
        }
        Ok(post)
    }

    fn view(&self, viewer_id: usize, post: Post) -> ServiceResult<PostView> {
        let mut handles = HashMap::new();
        self.view_with_handles(viewer_id, post, &mut handles)
    }

    fn view_with_handles(
        &self,
        viewer_id: usize,
        post: Post,
        handles: &mut HashMap<usize, Option<String>>,
    ) -> ServiceResult<PostView> {
        let author_handle = match handles.get(&post.author_id) {
            Some(handle) => handle.clone(),
            None => {
                let handle = self
                    .user_store
                    .get_user(post.author_id)?
                    .map(|user| user.handle);
                handles.insert(post.author_id, handle.clone());
                handle
            }
        };

        let (poll_options, my_vote) = if post.post_type == PostType::Poll {
            let counts: HashMap<usize, usize> =
                self.store.count_votes(&post.id)?.into_iter().collect();
            let options = self
                .store
                .get_poll_options(&post.id)?
                .into_iter()
                .enumerate()
                .map(|(index, text)| PollOptionResult {
                    index,
                    text,
                    votes: counts.get(&index).copied().unwrap_or(0),
                })
                .collect();
            (options, self.store.get_vote(&post.id, viewer_id)?)
        } else {
            (vec![], None)
        };

        Ok(PostView {
            author_handle,
            likes_count: self.store.count_likes(&post.id)?,
            comments_count: self.store.count_comments(&post.id)?,
            liked_by_me: self.store.has_liked(&post.id, viewer_id)?,
            poll_options,
            my_vote,
            post,
        })
    }

    fn validate_draft(&self, draft: &PostDraft) -> ServiceResult<()> {
        let mut validator = Validator::new();
        validator
            .check(
                draft.post_type != PostType::Share,
                "postType",
                "shares are created through the share endpoint",
            )
            .max_len(&draft.content, self.max_post_length, "content");
        match draft.post_type {
            PostType::Blog | PostType::Debate => {
                validator.non_blank(&draft.content, "content");
            }
            PostType::Image => {
                validator.check(
                    draft
                        .image_url
                        .as_deref()
                        .map(|url| !url.trim().is_empty())
                        .unwrap_or(false),
                    "imageUrl",
                    "image posts need an image",
                );
            }
            PostType::Poll => {
                validator
                    .check(
                        (MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&draft.poll_options.len()),
                        "pollOptions",
                        "polls need between 2 and 10 options",
                    )
                    .check(
                        draft.poll_options.iter().all(|option| {
                            !option.trim().is_empty()
                                && option.chars().count() <= MAX_POLL_OPTION_LENGTH
                        }),
                        "pollOptions",
                        "options must be non-empty and at most 200 characters",
                    );
            }
            PostType::CourseShare => {
                validator.check(draft.course_id.is_some(), "courseId", "must not be empty");
            }
            PostType::Share => {}
        }
        validator.finish()
    }

    pub fn create_post(&self, author: &Actor, draft: PostDraft) -> ServiceResult<PostView> {
        self.validate_draft(&draft)?;
        if let (PostType::CourseShare, Some(course_id)) = (draft.post_type, &draft.course_id) {
            let published = self
                .learning_store
                .get_course(course_id)?
                .map(|course| course.published)
                .unwrap_or(false);
            if !published {
                return Err(ServiceError::NotFound("Course"));
            }
        }

        let poll_options: Vec<String> = if draft.post_type == PostType::Poll {
            draft
                .poll_options
                .iter()
                .map(|option| option.trim().to_string())
                .collect()
        } else {
            vec![]
        };
        let post = Post {
            id: new_entity_id(),
            author_id: author.user_id,
            post_type: draft.post_type,
            privacy: draft.privacy,
            content: draft.content,
            image_url: draft.image_url.filter(|_| draft.post_type == PostType::Image),
            course_id: draft
                .course_id
                .filter(|_| draft.post_type == PostType::CourseShare),
            shared_from: None,
            shares_count: 0,
            created: now_secs(),
        };
        self.store.create_post(&post, &poll_options)?;
        metrics::record_post_created(post.post_type.as_str());
        info!(
            "User {} created {} post {}",
            author.user_id,
            post.post_type.as_str(),
            post.id
        );
        self.view(author.user_id, post)
    }

    pub fn get_post(&self, viewer: &Actor, post_id: &str) -> ServiceResult<PostView> {
        let post = self.visible_post(viewer.user_id, post_id)?;
        self.view(viewer.user_id, post)
    }

    fn list(
        &self,
        viewer: &Actor,
        author_id: Option<usize>,
        limit: usize,
        offset: usize,
    ) -> ServiceResult<Vec<PostView>> {
        let friend_ids = self.user_store.list_friend_ids(viewer.user_id)?;
        let scope = VisibilityScope {
            viewer_id: viewer.user_id,
            friend_ids: &friend_ids,
            author_id,
        };
        let mut handles = HashMap::new();
        self.store
            .list_visible_posts(&scope, limit, offset)?
            .into_iter()
            .map(|post| self.view_with_handles(viewer.user_id, post, &mut handles))
            .collect()
    }

    /// Posts visible to `viewer`, newest first.
    pub fn feed(&self, viewer: &Actor, limit: usize, offset: usize) -> ServiceResult<Vec<PostView>> {
        self.list(viewer, None, limit, offset)
    }

    pub fn user_posts(
        &self,
        viewer: &Actor,
        author_id: usize,
        limit: usize,
        offset: usize,
    ) -> ServiceResult<Vec<PostView>> {
        if self.user_store.get_user(author_id)?.is_none() {
            return Err(ServiceError::NotFound("User"));
        }
        self.list(viewer, Some(author_id), limit, offset)
    }

    pub fn delete_post(&self, actor: &Actor, post_id: &str) -> ServiceResult<()> {
        let post = self.load_post(post_id)?;
        if post.author_id != actor.user_id && !is_moderator(actor) {
            if !self.can_view(actor.user_id, &post)? {
                return Err(ServiceError::NotFound("Post"));
            }
            return Err(ServiceError::forbidden("Only the author can delete this post"));
        }
        self.store.delete_post(post_id)?;
        info!("User {} deleted post {}", actor.user_id, post_id);
        Ok(())
    }

    /// Changes who can see a post. Existing shares are not affected.
    pub fn set_privacy(
        &self,
        actor: &Actor,
        post_id: &str,
        privacy: Privacy,
    ) -> ServiceResult<PostView> {
        let mut post = self.visible_post(actor.user_id, post_id)?;
        if post.author_id != actor.user_id {
            return Err(ServiceError::forbidden(
                "Only the author can change the privacy of a post",
            ));
        }
        self.store.update_privacy(post_id, privacy)?;
        post.privacy = privacy;
        self.view(actor.user_id, post)
    }

    pub fn share(
        &self,
        actor: &Actor,
        post_id: &str,
        caption: Option<String>,
    ) -> ServiceResult<PostView> {
        // Public posts are visible to everyone, so the privacy check covers
        // visibility too.
        let original = self.load_post(post_id)?;
        if original.privacy != Privacy::Public {
            return Err(ServiceError::forbidden("Only public posts can be shared"));
        }
        let caption = caption.unwrap_or_default();
        Validator::new()
            .max_len(&caption, self.max_post_length, "caption")
            .finish()?;

        let share = Post {
            id: new_entity_id(),
            author_id: actor.user_id,
            post_type: PostType::Share,
            privacy: Privacy::Public,
            content: caption,
            image_url: None,
            course_id: None,
            shared_from: Some(original.id.clone()),
            shares_count: 0,
            created: now_secs(),
        };
        self.store.share_post(&original.id, &share)?;
        metrics::record_post_created(PostType::Share.as_str());
        info!(
            "User {} shared post {} as {}",
            actor.user_id, original.id, share.id
        );
        self.notifier.notify(
            original.author_id,
            Some(actor.user_id),
            NotificationType::PostShared,
            json!({ "postId": original.id, "shareId": share.id }),
        );
        self.view(actor.user_id, share)
    }

    pub fn toggle_like(&self, actor: &Actor, post_id: &str) -> ServiceResult<LikeState> {
        self.visible_post(actor.user_id, post_id)?;
        let liked = self.store.toggle_like(post_id, actor.user_id)?;
        debug!(
            "User {} {} post {}",
            actor.user_id,
            if liked { "liked" } else { "unliked" },
            post_id
        );
        Ok(LikeState {
            liked,
            likes_count: self.store.count_likes(post_id)?,
        })
    }

    pub fn add_comment(
        &self,
        actor: &Actor,
        post_id: &str,
        draft: CommentDraft,
    ) -> ServiceResult<Comment> {
        let post = self.visible_post(actor.user_id, post_id)?;
        Validator::new()
            .non_blank(&draft.content, "content")
            .max_len(&draft.content, MAX_COMMENT_LENGTH, "content")
            .check(
                draft.stance.is_none() || post.post_type == PostType::Debate,
                "stance",
                "only debate comments take a stance",
            )
            .finish()?;

        let comment = Comment {
            id: new_entity_id(),
            post_id: post.id.clone(),
            author_id: actor.user_id,
            content: draft.content,
            stance: draft.stance,
            created: now_secs(),
        };
        self.store.add_comment(&comment)?;
        self.notifier.notify(
            post.author_id,
            Some(actor.user_id),
            NotificationType::PostComment,
            json!({ "postId": post.id, "commentId": comment.id }),
        );
        Ok(comment)
    }

    pub fn list_comments(&self, viewer: &Actor, post_id: &str) -> ServiceResult<Vec<Comment>> {
        self.visible_post(viewer.user_id, post_id)?;
        Ok(self.store.list_comments(post_id)?)
    }

    /// The comment's author, the post's author and moderators may delete it.
    pub fn delete_comment(
        &self,
        actor: &Actor,
        post_id: &str,
        comment_id: &str,
    ) -> ServiceResult<()> {
        let comment = self
            .store
            .get_comment(comment_id)?
            .filter(|comment| comment.post_id == post_id)
            .ok_or(ServiceError::NotFound("Comment"))?;
        let post = self.load_post(post_id)?;
        if comment.author_id != actor.user_id
            && post.author_id != actor.user_id
            && !is_moderator(actor)
        {
            return Err(ServiceError::forbidden(
                "You cannot delete this comment",
            ));
        }
        self.store.delete_comment(comment_id)?;
        Ok(())
    }

    /// Votes on a poll. Voting again replaces the earlier choice.
    pub fn vote(&self, actor: &Actor, post_id: &str, option_index: usize) -> ServiceResult<PostView> {
        let post = self.visible_post(actor.user_id, post_id)?;
        if post.post_type != PostType::Poll {
            return Err(ServiceError::bad_request("This post is not a poll"));
        }
        let options = self.store.get_poll_options(post_id)?;
        if option_index >= options.len() {
            return Err(ServiceError::bad_request(format!(
                "Option {} does not exist, the poll has {} options",
                option_index,
                options.len()
            )));
        }
        self.store.upsert_vote(post_id, actor.user_id, option_index)?;
        self.view(actor.user_id, post)
    }

    pub fn counts(&self) -> ServiceResult<CommunityCounts> {
        Ok(self.store.count()?)
    }
}
