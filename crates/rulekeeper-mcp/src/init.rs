//! `rulekeeper-mcp init`: register the server with the coding agents
//! installed on this machine, for the current project only.

use rulekeeper_core::{RulesConfig, RULES_DIR_ENV};
use std::path::Path;

const SERVER_NAME: &str = "rulekeeper";

type InitResult<T> = Result<T, Box<dyn std::error::Error>>;

pub fn init_project() -> InitResult<()> {
    let binary_path = std::env::current_exe()?
        .canonicalize()?
        .to_string_lossy()
        .to_string();
    let cwd = std::env::current_dir()?;

    // Pin the rules directory that is in effect right now, so the agent
    // launches the server against the same rules from any working directory.
    let config = RulesConfig::from_env();
    let rules_dir = config
        .rules_dir
        .canonicalize()
        .unwrap_or_else(|_| config.rules_dir.clone());
    let rules_dir = rules_dir.to_string_lossy().to_string();

    let has_claude = which("claude");
    let has_codex = which("codex");

    if !has_claude && !has_codex {
        eprintln!("Neither `claude` nor `codex` found in PATH.");
        return Err(
            "install Claude Code or OpenAI Codex first, then re-run `rulekeeper-mcp init`".into(),
        );
    }

    let mut clients = Vec::new();
    if has_claude {
        let path = write_claude_config(&cwd, &binary_path, &rules_dir)?;
        eprintln!("Wrote {}", path.display());
        clients.push("Claude Code");
    }
    if has_codex {
        let path = write_codex_config(&cwd, &binary_path, &rules_dir)?;
        eprintln!("Wrote {}", path.display());
        clients.push("Codex");
    }

    eprintln!(
        "\nDone. {} will load rules from {} in this project.",
        clients.join(" and "),
        rules_dir
    );
    Ok(())
}

fn which(name: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                dir.join(name).is_file() || dir.join(format!("{name}.exe")).is_file()
            })
        })
        .unwrap_or(false)
}

/// Merge our entry into `.mcp.json`, keeping every other server.
fn write_claude_config(
    cwd: &Path,
    binary_path: &str,
    rules_dir: &str,
) -> InitResult<std::path::PathBuf> {
    let mcp_json_path = cwd.join(".mcp.json");
    let mut root: serde_json::Value = if mcp_json_path.exists() {
        let contents = std::fs::read_to_string(&mcp_json_path)?;
        serde_json::from_str(&contents).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    if !root.is_object() {
        root = serde_json::json!({});
    }

    if !root.get("mcpServers").is_some_and(|v| v.is_object()) {
        root["mcpServers"] = serde_json::json!({});
    }
    root["mcpServers"][SERVER_NAME] = serde_json::json!({
        "type": "stdio",
        "command": binary_path,
        "args": [],
        "env": { RULES_DIR_ENV: rules_dir },
    });

    std::fs::write(&mcp_json_path, serde_json::to_string_pretty(&root)?)?;
    Ok(mcp_json_path)
}

/// Merge our entry into `.codex/config.toml`, preserving formatting and
/// other servers.
fn write_codex_config(
    cwd: &Path,
    binary_path: &str,
    rules_dir: &str,
) -> InitResult<std::path::PathBuf> {
    let codex_dir = cwd.join(".codex");
    let config_toml_path = codex_dir.join("config.toml");

    let mut doc: toml_edit::DocumentMut = if config_toml_path.exists() {
        std::fs::read_to_string(&config_toml_path)?
            .parse()
            .unwrap_or_default()
    } else {
        toml_edit::DocumentMut::new()
    };

    if !doc.contains_table("mcp_servers") {
        doc["mcp_servers"] = toml_edit::Item::Table(toml_edit::Table::new());
    }

    let mut env = toml_edit::InlineTable::new();
    env.insert(RULES_DIR_ENV, rules_dir.into());

    let mut server = toml_edit::Table::new();
    server.insert("command", toml_edit::value(binary_path));
    server.insert("args", toml_edit::value(toml_edit::Array::new()));
    server.insert("env", toml_edit::value(env));
    doc["mcp_servers"][SERVER_NAME] = toml_edit::Item::Table(server);

    std::fs::create_dir_all(&codex_dir)?;
    std::fs::write(&config_toml_path, doc.to_string())?;
    Ok(config_toml_path)
}
