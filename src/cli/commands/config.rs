//! recall config - Show the effective configuration

use clap::Args;

use crate::app::AppContext;
use crate::cli::output;
use crate::config::Config;
use crate::error::{RecallError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Dotted key to print (e.g. `search.rrf_k`); omit for everything
    pub key: Option<String>,

    /// Print the config file locations that were consulted
    #[arg(long)]
    pub paths: bool,
}

pub async fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    if args.paths {
        return emit_paths(ctx);
    }

    match &args.key {
        Some(key) => {
            let value = config_value_at(&ctx.config, key)?;
            if ctx.robot_mode {
                return output::emit_json(&value);
            }
            println!("{}", format_value(&value));
            Ok(())
        }
        None => {
            if ctx.robot_mode {
                return output::emit_json(&ctx.config);
            }
            let rendered = toml::to_string_pretty(&ctx.config)
                .map_err(|err| RecallError::Config(format!("render config: {err}")))?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn emit_paths(ctx: &AppContext) -> Result<()> {
    let global = Config::global_path();
    let project = Config::project_path(&ctx.project_root);

    if ctx.robot_mode {
        return output::emit_json(&serde_json::json!({
            "global": global.as_ref().map(|p| p.display().to_string()),
            "global_exists": global.as_ref().is_some_and(|p| p.exists()),
            "project": project.display().to_string(),
            "project_exists": project.exists(),
        }));
    }

    let mut layout = output::HumanLayout::new();
    layout.kv(
        "global",
        &global.map_or_else(|| "(no config dir)".to_string(), |p| p.display().to_string()),
    );
    layout.kv("project", &project.display().to_string());
    println!("{}", layout.build());
    Ok(())
}

fn config_value_at(config: &Config, key: &str) -> Result<toml::Value> {
    let doc = toml::Value::try_from(config)
        .map_err(|err| RecallError::Config(format!("serialize config: {err}")))?;
    get_path(&doc, key)
}

fn get_path(doc: &toml::Value, key: &str) -> Result<toml::Value> {
    let mut current = doc;
    for part in key.split('.') {
        current = current
            .get(part)
            .ok_or_else(|| RecallError::Config(format!("unknown key: {key}")))?;
    }
    Ok(current.clone())
}

fn format_value(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        _ => value.to_string(),
    }
}
