use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnFollows,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageOwnFollows,
            ActionType::ManageAllRecipes,
            ActionType::ManageCatalog,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnCart,
    ManageOwnFollows,

    ManageUsers,
    ManageAllRecipes,
    ManageCatalog,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_uid = &session.user_uid;

        ACTION_TABLE
            .iter()
            .find_map(|(uid, actions)| {
                if user_uid != uid {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(uid: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("cook_01"),
            is_admin: uid == UserRole::Admin,
            user_uid: uid,
        }
    }

    #[test]
    fn users_manage_their_own_content() {
        let session = session(UserRole::User);
        assert!(ActionType::CreateRecipes.authenticate(&session));
        assert!(ActionType::ManageOwnFavorites.authenticate(&session));
        assert!(ActionType::ManageOwnCart.authenticate(&session));
    }

    #[test]
    fn users_do_not_touch_the_catalog() {
        let session = session(UserRole::User);
        assert!(!ActionType::ManageCatalog.authenticate(&session));
        assert!(!ActionType::ManageAllRecipes.authenticate(&session));
        assert!(!ActionType::ManageUsers.authenticate(&session));
    }

    #[test]
    fn admins_manage_everything() {
        let session = session(UserRole::Admin);
        assert!(ActionType::ManageCatalog.authenticate(&session));
        assert!(ActionType::ManageAllRecipes.authenticate(&session));
        assert!(ActionType::ManageOwnRecipes.authenticate(&session));
    }
}
