use clap::ValueEnum;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

/// JSON 模式下打印原始结构，返回 true 表示已处理
pub fn print_json<T: serde::Serialize>(value: &T, output: OutputFormat) -> anyhow::Result<bool> {
    if output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(value)?);
        return Ok(true);
    }
    Ok(false)
}
