//! Community post models

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Blog,
    Image,
    Poll,
    Debate,
    CourseShare,
    Share,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Blog => "blog",
            PostType::Image => "image",
            PostType::Poll => "poll",
            PostType::Debate => "debate",
            PostType::CourseShare => "course_share",
            PostType::Share => "share",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blog" => Some(PostType::Blog),
            "image" => Some(PostType::Image),
            "poll" => Some(PostType::Poll),
            "debate" => Some(PostType::Debate),
            "course_share" => Some(PostType::CourseShare),
            "share" => Some(PostType::Share),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    Public,
    Friends,
    Private,
}

impl Privacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Privacy::Public => "public",
            Privacy::Friends => "friends",
            Privacy::Private => "private",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Privacy::Public),
            "friends" => Some(Privacy::Friends),
            "private" => Some(Privacy::Private),
            _ => None,
        }
    }
}

/// Side taken by a comment on a debate post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    For,
    Against,
}

impl Stance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::For => "for",
            Stance::Against => "against",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "for" => Some(Stance::For),
            "against" => Some(Stance::Against),
            _ => None,
        }
    }
}

/// A stored post. Counters and poll results are filled in by the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: usize,
    pub post_type: PostType,
    pub privacy: Privacy,
    pub content: String,
    pub image_url: Option<String>,
    pub course_id: Option<String>,
    pub shared_from: Option<String>,
    pub shares_count: usize,
    pub created: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub post_type: PostType,
    #[serde(default = "default_privacy")]
    pub privacy: Privacy,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub poll_options: Vec<String>,
}

fn default_privacy() -> Privacy {
    Privacy::Public
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollOptionResult {
    pub index: usize,
    pub text: String,
    pub votes: usize,
}

/// A post as returned to a viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    pub author_handle: Option<String>,
    pub likes_count: usize,
    pub comments_count: usize,
    pub liked_by_me: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub poll_options: Vec<PollOptionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_vote: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author_id: usize,
    pub content: String,
    pub stance: Option<Stance>,
    pub created: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    pub content: String,
    #[serde(default)]
    pub stance: Option<Stance>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityCounts {
    pub posts: usize,
    pub comments: usize,
    pub likes: usize,
    pub shares: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_type_names_match_serde() {
        for post_type in [
            PostType::Blog,
            PostType::Image,
            PostType::Poll,
            PostType::Debate,
            PostType::CourseShare,
            PostType::Share,
        ] {
            let json = serde_json::to_string(&post_type).unwrap();
            assert_eq!(json, format!("\"{}\"", post_type.as_str()));
            assert_eq!(PostType::from_str(post_type.as_str()), Some(post_type));
        }
        assert_eq!(PostType::from_str("video"), None);
    }

    #[test]
    fn draft_defaults_to_public() {
        let draft: PostDraft =
            serde_json::from_str(r#"{"postType":"blog","content":"hello"}"#).unwrap();
        assert_eq!(draft.privacy, Privacy::Public);
        assert!(draft.poll_options.is_empty());
    }

    #[test]
    fn privacy_and_stance_round_trip_through_their_names() {
        for privacy in [Privacy::Public, Privacy::Friends, Privacy::Private] {
            assert_eq!(Privacy::from_str(privacy.as_str()), Some(privacy));
        }
        assert_eq!(Stance::from_str("against"), Some(Stance::Against));
        assert_eq!(Stance::from_str("neutral"), None);
    }
}
