mod auth;
mod health;
mod users;

pub use auth::{
    change_password, forgot_password, login, me, register, reset_password, revoke, revoke_all,
};
pub use health::{handler_404, health};
pub use users::{delete_user, get_user, list_users, list_users_by_role, update_user};
