mod auth;
mod local;
mod output;
pub mod ui;
mod users;

pub use auth::{
    change_password, forgot_password, login, me, register, reset_password, revoke, revoke_all,
};
pub use local::{create_admin, latest_user, SigningConfig};
pub use output::OutputFormat;
pub use users::{delete_user, get_user, list_users, update_user};
