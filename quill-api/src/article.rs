use crate::{Author, Error, Resource, Time, UserId};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct ArticleId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    pub author: Author,
    #[serde(with = "crate::time")]
    pub created_at: Time,
    #[serde(with = "crate::time")]
    pub updated_at: Time,
}

impl Resource for Article {
    type Id = ArticleId;
    type New = NewArticle;
    type Update = ArticleUpdate;

    const PATH: &'static str = "articles";

    fn id(&self) -> ArticleId {
        self.id
    }
}

const TITLE_LEN: (usize, usize) = (5, 200);
const CONTENT_MIN_LEN: usize = 10;

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
}

impl NewArticle {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_length("title", &self.title, TITLE_LEN.0, TITLE_LEN.1)?;
        crate::validate_length("content", &self.content, CONTENT_MIN_LEN, usize::MAX)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Reassigns the article, admin only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<UserId>,
}

impl ArticleUpdate {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(title) = &self.title {
            crate::validate_length("title", title, TITLE_LEN.0, TITLE_LEN.1)?;
        }
        if let Some(content) = &self.content {
            crate::validate_length("content", content, CONTENT_MIN_LEN, usize::MAX)?;
        }
        Ok(())
    }
}
