//! 认证相关 CLI 操作（通过 HTTP API）

use super::output::print_json;
use super::ui::{print_header, print_hint, print_kv, print_section, print_success, print_user};
use super::OutputFormat;
use crate::client::{endpoint, handle_error};
use crossterm::style::Stylize;
use flock_core::{
    AuthResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, ProfileResponse,
    RegisterRequest, ResetPasswordRequest, ResetPasswordResponse, UserSummary,
};
use reqwest::Client;
use serde_json::Value;

pub(super) fn print_token_hint(token: &str) {
    print_section("💡 提示");
    print_kv("Token", token);
    print_hint(&format!(
        "设置环境变量以使用此 token: {}",
        "FLOCK_TOKEN=<token>".cyan()
    ));
}

/// 从 `{"message": ...}` 响应中取出消息
async fn message_of(resp: reqwest::Response) -> anyhow::Result<String> {
    let body: Value = resp.json().await?;
    Ok(body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("ok")
        .to_string())
}

/// 注册新用户
pub async fn register(
    client: &Client,
    base: &str,
    req: RegisterRequest,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resp = client
        .post(endpoint(base, "/api/auth/register"))
        .json(&req)
        .send()
        .await?;
    let auth: AuthResponse = handle_error(resp).await?.json().await?;

    if print_json(&auth, output)? {
        return Ok(());
    }
    print_header("📝 注册成功");
    print_user(&auth.user);
    print_token_hint(&auth.token);
    Ok(())
}

/// 用户登录
pub async fn login(
    client: &Client,
    base: &str,
    email: &str,
    password: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let req = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let resp = client
        .post(endpoint(base, "/api/auth/login"))
        .json(&req)
        .send()
        .await?;
    let auth: AuthResponse = handle_error(resp).await?.json().await?;

    if print_json(&auth, output)? {
        return Ok(());
    }
    print_header("🔐 登录成功");
    print_user(&auth.user);
    print_token_hint(&auth.token);
    Ok(())
}

/// 当前用户信息
pub async fn me(client: &Client, base: &str, output: OutputFormat) -> anyhow::Result<()> {
    let resp = client.get(endpoint(base, "/api/auth/me")).send().await?;
    let profile: ProfileResponse = handle_error(resp).await?.json().await?;

    if print_json(&profile, output)? {
        return Ok(());
    }
    print_header(&format!("👤 {}", profile.dashboard.title()));
    print_user(&profile.user);
    print_section("可执行的操作");
    for op in &profile.operations {
        println!("  • {}", format!("{:?}", op).cyan());
    }
    println!();
    Ok(())
}

/// 撤销当前 token
pub async fn revoke(client: &Client, base: &str) -> anyhow::Result<()> {
    let resp = client.post(endpoint(base, "/api/auth/revoke")).send().await?;
    print_success(&message_of(handle_error(resp).await?).await?);
    Ok(())
}

/// 撤销当前用户的所有 token
pub async fn revoke_all(client: &Client, base: &str) -> anyhow::Result<()> {
    let resp = client
        .post(endpoint(base, "/api/auth/revoke-all"))
        .send()
        .await?;
    print_success(&message_of(handle_error(resp).await?).await?);
    Ok(())
}

/// 请求发送重置密码邮件
pub async fn forgot_password(client: &Client, base: &str, email: &str) -> anyhow::Result<()> {
    let req = ForgotPasswordRequest {
        email: email.to_string(),
    };
    let resp = client
        .post(endpoint(base, "/api/auth/forgotpassword"))
        .json(&req)
        .send()
        .await?;
    print_success(&message_of(handle_error(resp).await?).await?);
    Ok(())
}

/// 使用邮件中的 token 重置密码
pub async fn reset_password(
    client: &Client,
    base: &str,
    reset_token: &str,
    password: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let req = ResetPasswordRequest {
        password: password.to_string(),
    };
    let resp = client
        .put(endpoint(base, &format!("/api/auth/resetpassword/{}", reset_token)))
        .json(&req)
        .send()
        .await?;
    let reset: ResetPasswordResponse = handle_error(resp).await?.json().await?;

    if print_json(&reset, output)? {
        return Ok(());
    }
    print_success(&reset.message);
    print_token_hint(&reset.token);
    Ok(())
}

/// 修改自己的密码
pub async fn change_password(
    client: &Client,
    base: &str,
    current: &str,
    new: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let req = ChangePasswordRequest {
        current_password: current.to_string(),
        new_password: new.to_string(),
    };
    let resp = client
        .put(endpoint(base, "/api/auth/password"))
        .json(&req)
        .send()
        .await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;

    if print_json(&user, output)? {
        return Ok(());
    }
    print_success(&format!("{} 的密码已更新", user.email));
    Ok(())
}
