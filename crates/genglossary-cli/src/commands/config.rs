//! `genglossary config ...` -- layered configuration inspection and edits.

use genglossary_config::config::{save_config, AppConfig};
use genglossary_config::data_dir::config_file_path;
use genglossary_core::enums::LlmProvider;

use crate::cli::ConfigSetArgs;
use crate::context::RuntimeContext;
use crate::output::output_json;

pub fn run_show(ctx: &RuntimeContext) -> anyhow::Result<()> {
    let config = ctx.load_config()?;
    if ctx.json {
        output_json(&config);
    } else {
        println!("data_dir: {}", ctx.data_dir.display());
        println!("llm.provider: {}", config.llm.provider);
        println!("llm.model: {}", config.llm.model);
        println!("llm.base_url: {}", config.llm.base_url);
        println!("llm.timeout_secs: {}", config.llm.timeout_secs);
        println!("actor: {}", config.actor.as_deref().unwrap_or("(auto)"));
        println!("log_level: {}", config.log_level);
        println!("json: {}", config.json);
    }
    Ok(())
}

pub fn run_set(ctx: &RuntimeContext, args: &ConfigSetArgs) -> anyhow::Result<()> {
    let mut config = ctx.load_config()?;
    apply_set(&mut config, &args.key, &args.value)?;

    let path = config_file_path(&ctx.data_dir);
    save_config(&path, &config)?;

    if !ctx.json {
        println!("set {} = {}", args.key, args.value);
    }
    Ok(())
}

fn apply_set(config: &mut AppConfig, key: &str, value: &str) -> anyhow::Result<()> {
    match key {
        "llm.provider" => {
            config.llm.provider = value
                .parse::<LlmProvider>()
                .map_err(|s| anyhow::anyhow!("invalid llm.provider '{s}' (expected 'ollama' or 'openai_compatible')"))?;
        }
        "llm.model" => config.llm.model = value.to_string(),
        "llm.base_url" => config.llm.base_url = value.to_string(),
        "llm.timeout_secs" => {
            config.llm.timeout_secs =
                value.parse().map_err(|_| anyhow::anyhow!("invalid llm.timeout_secs '{value}': not a number"))?;
        }
        "actor" => config.actor = Some(value.to_string()),
        "log_level" => config.log_level = value.to_string(),
        "json" => {
            config.json = value.parse().map_err(|_| anyhow::anyhow!("invalid json '{value}': expected true or false"))?;
        }
        other => anyhow::bail!(
            "unknown config key '{other}' (expected one of: llm.provider, llm.model, llm.base_url, \
             llm.timeout_secs, actor, log_level, json)"
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_set_rejects_unknown_key() {
        let mut config = AppConfig::default();
        assert!(apply_set(&mut config, "nonsense", "1").is_err());
    }

    #[test]
    fn apply_set_updates_llm_model() {
        let mut config = AppConfig::default();
        apply_set(&mut config, "llm.model", "mixtral").unwrap();
        assert_eq!(config.llm.model, "mixtral");
    }

    #[test]
    fn apply_set_rejects_invalid_bool() {
        let mut config = AppConfig::default();
        assert!(apply_set(&mut config, "json", "maybe").is_err());
    }
}
