use crate::{Resource, Time};

#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
pub struct UserId(pub i64);

/// Role name as the server spells it (`ADMIN`, `ROLE_ADMIN`, `user`...)
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct Role(pub String);

impl Role {
    pub fn is_admin(&self) -> bool {
        let name = self.0.trim();
        let name = name
            .get(..5)
            .filter(|p| p.eq_ignore_ascii_case("role_"))
            .map(|_| &name[5..])
            .unwrap_or(name);
        name.eq_ignore_ascii_case("admin")
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(with = "crate::time")]
    pub created_at: Time,
}

impl Resource for User {
    type Id = UserId;
    type New = NewUser;
    type Update = UserUpdate;

    const PATH: &'static str = "users";

    fn id(&self) -> UserId {
        self.id
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_roles() {
        for r in ["ADMIN", "admin", "ROLE_ADMIN", "role_Admin", " Admin "] {
            assert!(Role(String::from(r)).is_admin(), "{r:?} should be admin");
        }
        for r in ["USER", "ROLE_USER", "administrator", "", "ROLE_"] {
            assert!(!Role(String::from(r)).is_admin(), "{r:?} should not be admin");
        }
    }
}
