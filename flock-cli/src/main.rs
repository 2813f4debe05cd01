mod client;
mod ops;

use clap::{Parser, Subcommand};
use flock_core::user::{DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER};
use flock_core::{RegisterRequest, Role, UpdateUserRequest};
use ops::{
    change_password, create_admin, delete_user, forgot_password, get_user, latest_user,
    list_users, login, me, register, reset_password, revoke, revoke_all, update_user,
    OutputFormat, SigningConfig,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CLI wrapper around the Flock church-admin HTTP API.
#[derive(Parser)]
#[command(name = "flock-cli", author, version, about = "CLI for the Flock API")]
struct Cli {
    /// API base url
    #[arg(long, env = "FLOCK_API_BASE", default_value = "http://127.0.0.1:5000")]
    api_base: String,

    /// Bearer token for authentication
    #[arg(long, env = "FLOCK_TOKEN")]
    token: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ==================== 认证 ====================
    /// 注册新用户
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
        /// 角色（默认 MEMBER）
        #[arg(long, short)]
        role: Option<Role>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
    },
    /// 用户登录，获取 token
    Login {
        #[arg(long, short)]
        email: String,
        #[arg(long, short)]
        password: String,
    },
    /// 当前用户信息及仪表盘
    Me,
    /// 撤销当前 token（登出）
    Revoke,
    /// 撤销当前用户的所有 token
    RevokeAll,
    /// 修改自己的密码
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
    /// 发送重置密码邮件
    ForgotPassword {
        #[arg(long, short)]
        email: String,
    },
    /// 使用邮件中的 token 重置密码
    ResetPassword {
        /// 重置 token（邮件链接的最后一段）
        token: String,
        #[arg(long, short)]
        password: String,
    },

    // ==================== 用户管理（仅管理员）====================
    /// 用户管理命令
    #[command(subcommand)]
    User(UserCommands),

    // ==================== 本地维护 ====================
    /// 在数据目录中创建管理员账户
    CreateAdmin {
        #[command(flatten)]
        local: LocalArgs,
        #[arg(long, default_value = "admin@test.com")]
        email: String,
        #[arg(long, default_value = "password123")]
        password: String,
        #[arg(long, default_value = "Super")]
        first_name: String,
        #[arg(long, default_value = "Admin")]
        last_name: String,
    },
    /// 显示数据目录中最近创建的用户
    LatestUser {
        #[command(flatten)]
        local: LocalArgs,
    },
}

#[derive(clap::Args)]
struct LocalArgs {
    /// 数据目录
    #[arg(long, env = "FLOCK_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,
    /// 与 API 相同的签名密钥
    #[arg(long, env = "FLOCK_JWT_SECRET", default_value = "flock-local", hide_env_values = true)]
    jwt_secret: String,
    /// 与 API 相同的 JWT iss
    #[arg(long, env = "FLOCK_JWT_ISSUER", default_value = DEFAULT_JWT_ISSUER)]
    jwt_issuer: String,
    /// 与 API 相同的 JWT aud
    #[arg(long, env = "FLOCK_JWT_AUDIENCE", default_value = DEFAULT_JWT_AUDIENCE)]
    jwt_audience: String,
}

impl LocalArgs {
    fn signing(&self) -> SigningConfig {
        SigningConfig {
            secret: self.jwt_secret.clone(),
            issuer: self.jwt_issuer.clone(),
            audience: self.jwt_audience.clone(),
        }
    }
}

#[derive(Subcommand)]
enum UserCommands {
    /// 列出用户
    List {
        /// 按角色过滤
        #[arg(long, short)]
        role: Option<Role>,
    },
    /// 获取用户详情
    Get { id: String },
    /// 更新用户资料
    Update {
        id: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<Role>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        phone_number: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// 删除用户
    Delete { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载 .env 文件（如果存在），忽略错误
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();
    let client = client::build_client(&cli.token)?;
    let base = cli.api_base.as_str();

    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            role,
            department,
            phone_number,
        } => {
            let req = RegisterRequest {
                first_name,
                last_name,
                email,
                password,
                role,
                department,
                phone_number,
            };
            register(&client, base, req, cli.output).await?
        }
        Commands::Login { email, password } => {
            login(&client, base, &email, &password, cli.output).await?
        }
        Commands::Me => me(&client, base, cli.output).await?,
        Commands::Revoke => revoke(&client, base).await?,
        Commands::RevokeAll => revoke_all(&client, base).await?,
        Commands::Password { current, new } => {
            change_password(&client, base, &current, &new, cli.output).await?
        }
        Commands::ForgotPassword { email } => forgot_password(&client, base, &email).await?,
        Commands::ResetPassword { token, password } => {
            reset_password(&client, base, &token, &password, cli.output).await?
        }

        Commands::User(user_cmd) => match user_cmd {
            UserCommands::List { role } => list_users(&client, base, role, cli.output).await?,
            UserCommands::Get { id } => get_user(&client, base, &id, cli.output).await?,
            UserCommands::Update {
                id,
                first_name,
                last_name,
                email,
                role,
                department,
                phone_number,
                active,
            } => {
                let req = UpdateUserRequest {
                    first_name,
                    last_name,
                    email,
                    role,
                    department,
                    phone_number,
                    is_active: active,
                };
                update_user(&client, base, &id, req, cli.output).await?
            }
            UserCommands::Delete { id } => delete_user(&client, base, &id).await?,
        },

        Commands::CreateAdmin {
            local,
            email,
            password,
            first_name,
            last_name,
        } => {
            let req = RegisterRequest {
                first_name,
                last_name,
                email,
                password,
                ..Default::default()
            };
            create_admin(&local.data_dir, &local.signing(), req, cli.output).await?;
        }
        Commands::LatestUser { local } => {
            latest_user(&local.data_dir, &local.signing(), cli.output).await?
        }
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
