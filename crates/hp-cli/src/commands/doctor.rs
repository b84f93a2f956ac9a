use serde_json::json;

use super::{api_client, friendly_error};

/// `doctor`: connectivity and environment checks an operator runs before
/// trusting a daemon.
pub async fn run(api_url: &str, json_output: bool) -> anyhow::Result<()> {
    let client = api_client();
    let mut failures = 0usize;

    let health_check = match client.get(format!("{api_url}/health")).send().await {
        Ok(resp) if resp.status().is_success() => json!({ "ok": true }),
        Ok(resp) => {
            failures += 1;
            json!({ "ok": false, "status": resp.status().as_u16() })
        }
        Err(e) => {
            failures += 1;
            json!({ "ok": false, "error": friendly_error(e).to_string() })
        }
    };

    let config = hp_core::config::Config::load();
    let config_check = match &config {
        Ok(cfg) => json!({
            "ok": true,
            "project_name": cfg.general.project_name,
            "max_concurrent_agents": cfg.agents.max_concurrent_agents,
        }),
        Err(e) => {
            failures += 1;
            json!({ "ok": false, "error": e.to_string() })
        }
    };

    let phases_folder_check = config.as_ref().ok().and_then(|c| c.phases_folder());
    let phases_check = match &phases_folder_check {
        Some(path) if path.exists() => json!({ "ok": true, "path": path }),
        Some(path) => {
            failures += 1;
            json!({ "ok": false, "path": path, "error": "HEPHAESTUS_PHASES_FOLDER does not exist" })
        }
        None => json!({ "ok": true, "path": null, "note": "HEPHAESTUS_PHASES_FOLDER unset" }),
    };

    if json_output {
        let report = json!({
            "daemon": health_check,
            "config": config_check,
            "phases_folder": phases_check,
            "failures": failures,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("hephaestus doctor  ({api_url})");
        println!("{}", "-".repeat(40));
        print_check("daemon reachable", &health_check);
        print_check("config loads", &config_check);
        print_check("phases folder", &phases_check);
        println!("{failures} check(s) failed.");
    }

    if failures > 0 {
        anyhow::bail!("{failures} doctor check(s) failed");
    }
    Ok(())
}

fn print_check(label: &str, value: &serde_json::Value) {
    let ok = value["ok"].as_bool().unwrap_or(false);
    let marker = if ok { "ok" } else { "FAIL" };
    println!("[{marker}] {label}");
    if !ok {
        if let Some(err) = value["error"].as_str() {
            println!("        {err}");
        }
    }
}
