use crate::{ArticleId, Error, Resource, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CommentId(pub i64);

/// Author summary, denormalized into articles and comments
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub article_id: ArticleId,
    pub author: Author,
    #[serde(with = "crate::time")]
    pub created_at: Time,
    #[serde(with = "crate::time")]
    pub updated_at: Time,

    /// Absent for top-level comments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,

    /// Only ever filled in client-side, when nesting a flat list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

impl Resource for Comment {
    type Id = CommentId;
    type New = NewComment;
    type Update = CommentUpdate;

    const PATH: &'static str = "comments";

    fn id(&self) -> CommentId {
        self.id
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,
    pub article_id: ArticleId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<CommentId>,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_length("content", &self.content, 1, usize::MAX)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CommentUpdate {
    pub content: String,
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_length("content", &self.content, 1, usize::MAX)
    }
}
