//! 用户管理 CLI 操作（需要 ADMIN token）

use super::output::print_json;
use super::ui::{print_empty, print_header, print_success, print_user};
use super::OutputFormat;
use crate::client::{endpoint, handle_error};
use crossterm::style::Stylize;
use flock_core::{Role, UpdateUserRequest, UserSummary};
use reqwest::Client;

/// 列出用户，可按角色过滤
pub async fn list_users(
    client: &Client,
    base: &str,
    role: Option<Role>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let path = match role {
        Some(role) => format!("/api/users/role/{}", role),
        None => "/api/users".to_string(),
    };
    let resp = client.get(endpoint(base, &path)).send().await?;
    let users: Vec<UserSummary> = handle_error(resp).await?.json().await?;

    if print_json(&users, output)? {
        return Ok(());
    }
    print_header("👥 用户列表");
    if users.is_empty() {
        print_empty("暂无用户");
        return Ok(());
    }
    println!(
        "  {:<36}  {:<28}  {:<14}  {}",
        "ID".bold(),
        "Email".bold(),
        "Role".bold(),
        "Name".bold()
    );
    println!("  {}", "─".repeat(96).dark_grey());
    for user in users {
        println!(
            "  {:<36}  {:<28}  {:<14}  {} {}",
            user.id.dark_grey(),
            user.email.cyan(),
            user.role.as_str(),
            user.first_name,
            user.last_name
        );
    }
    println!();
    Ok(())
}

/// 获取用户详情
pub async fn get_user(
    client: &Client,
    base: &str,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resp = client
        .get(endpoint(base, &format!("/api/users/{}", id)))
        .send()
        .await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;

    if print_json(&user, output)? {
        return Ok(());
    }
    print_header(&format!("👤 {} {}", user.first_name, user.last_name));
    print_user(&user);
    println!();
    Ok(())
}

/// 更新用户资料
pub async fn update_user(
    client: &Client,
    base: &str,
    id: &str,
    req: UpdateUserRequest,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let resp = client
        .put(endpoint(base, &format!("/api/users/{}", id)))
        .json(&req)
        .send()
        .await?;
    let user: UserSummary = handle_error(resp).await?.json().await?;

    if print_json(&user, output)? {
        return Ok(());
    }
    print_success(&format!("用户 {} 已更新", user.email));
    print_user(&user);
    Ok(())
}

/// 删除用户
pub async fn delete_user(client: &Client, base: &str, id: &str) -> anyhow::Result<()> {
    let resp = client
        .delete(endpoint(base, &format!("/api/users/{}", id)))
        .send()
        .await?;
    handle_error(resp).await?;
    print_success(&format!("用户 {} 已删除", id));
    Ok(())
}
