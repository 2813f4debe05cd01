//! Terminal output helpers.

use crossterm::style::Stylize;
use flock_core::UserSummary;

/// Calculate display width of a string (accounting for wide chars like emoji).
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

/// Print a section header with box drawing characters.
pub fn print_header(title: &str) {
    let inner_width: usize = 58;
    let total_padding = inner_width.saturating_sub(display_width(title));
    let left_pad = total_padding / 2;
    let right_pad = total_padding - left_pad;

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(inner_width)).dark_cyan());
    println!(
        "{}",
        format!("║{}{}{}║", " ".repeat(left_pad), title, " ".repeat(right_pad)).dark_cyan()
    );
    println!("{}", format!("╚{}╝", "═".repeat(inner_width)).dark_cyan());
    println!();
}

/// Print a small section title.
pub fn print_section(title: &str) {
    println!();
    println!("  {} {}", "▸".dark_cyan(), title.white().bold());
    println!("  {}", "─".repeat(50).dark_grey());
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<14} {}", format!("{}:", key).dark_grey(), value);
}

/// Print a hint/tip message.
pub fn print_hint(msg: &str) {
    println!("  {} {}", "💡".yellow(), msg.dark_grey());
}

/// Print an empty state message.
pub fn print_empty(msg: &str) {
    println!();
    println!("  {}", msg.dark_grey().italic());
    println!();
}

/// 用户详情（不含任何敏感字段）
pub fn print_user(user: &UserSummary) {
    print_kv("ID", &user.id);
    print_kv("Name", &format!("{} {}", user.first_name, user.last_name));
    print_kv("Email", &user.email);
    print_kv("Role", &user.role.as_str().cyan().to_string());
    if let Some(dept) = &user.department {
        print_kv("Department", dept);
    }
    if let Some(phone) = &user.phone_number {
        print_kv("Phone", phone);
    }
    let status = if user.is_active {
        "active".green().to_string()
    } else {
        "inactive".red().to_string()
    };
    print_kv("Status", &status);
    print_kv(
        "Last login",
        &user
            .last_login
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into()),
    );
    if let Some(created) = user.created_at {
        print_kv("Created", &created.to_rfc3339());
    }
}

#[cfg(test)]
mod tests {
    use super::display_width;

    #[test]
    fn wide_chars_count_double() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("用户"), 4);
    }
}
