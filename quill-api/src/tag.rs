use crate::{Error, Resource, Time};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct TagId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    #[serde(with = "crate::time")]
    pub created_at: Time,
    #[serde(with = "crate::time")]
    pub updated_at: Time,
}

impl Resource for Tag {
    type Id = TagId;
    type New = NewTag;
    type Update = TagUpdate;

    const PATH: &'static str = "tags";

    fn id(&self) -> TagId {
        self.id
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewTag {
    pub name: String,
}

impl NewTag {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_length("name", &self.name, 1, 50)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct TagUpdate {
    pub name: String,
}

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct CategoryId(pub i64);

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "crate::time")]
    pub created_at: Time,
    #[serde(with = "crate::time")]
    pub updated_at: Time,
}

impl Resource for Category {
    type Id = CategoryId;
    type New = NewCategory;
    type Update = CategoryUpdate;

    const PATH: &'static str = "categories";

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_length("name", &self.name, 1, 100)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
