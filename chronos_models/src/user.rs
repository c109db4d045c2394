pub type UserId = String;

/// An authenticated session as handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(value: &User) -> Self {
        Self {
            display_name: value.display_name.clone(),
            email: value.email.clone(),
        }
    }
}
