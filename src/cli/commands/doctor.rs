//! Doctor command - verify credentials and configuration.

use crate::cli::Output;
use crate::config::{Credentials, Settings};
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, credentials: &Credentials) -> anyhow::Result<()> {
    Output::header("Palaver Doctor");
    println!();
    println!("Checking credentials and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("Credentials").bold());
    let credential_checks = check_credentials(credentials);
    for check in &credential_checks {
        check.print();
    }
    checks.extend(credential_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_checks = vec![check_config_file(), check_static_dir(settings)];
    for check in &config_checks {
        check.print();
    }
    checks.extend(config_checks);
    Output::kv("Model", &format!("{} @ {}", settings.model.name, settings.model.api_base));
    Output::kv(
        "Limits",
        &format!(
            "{} iterations/turn, {}s per tool, {}s per model call",
            settings.agent.max_iterations,
            settings.agent.tool_timeout_secs,
            settings.model.timeout_secs
        ),
    );

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Chat turns will fail until they are fixed.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!(
            "All checks passed with {} warning(s); some tools will report errors to the model.",
            warnings
        ));
    } else {
        Output::success("All checks passed! Palaver is ready to use.");
    }

    Ok(())
}

/// One check per secret. Only the model key is fatal.
fn check_credentials(credentials: &Credentials) -> Vec<CheckResult> {
    let model = match &credentials.model_api_key {
        Some(key) => CheckResult::ok(
            Credentials::MODEL_API_KEY,
            &format!("configured ({})", mask(key)),
        ),
        None => CheckResult::error(
            Credentials::MODEL_API_KEY,
            "not set",
            &format!(
                "Set {} (or {}) in the environment or a .env file",
                Credentials::MODEL_API_KEY,
                Credentials::MODEL_API_KEY_FALLBACK
            ),
        ),
    };

    vec![
        model,
        optional(
            Credentials::SEARCH_API_KEY,
            credentials.search_api_key.as_deref(),
            "search",
        ),
        optional(
            Credentials::WEATHER_API_KEY,
            credentials.weather_api_key.as_deref(),
            "get_weather and summarize_weather",
        ),
        optional(
            Credentials::MAIL_ADDRESS,
            credentials.mail_address.as_deref(),
            "send_email",
        ),
        optional(
            Credentials::MAIL_APP_PASSWORD,
            credentials.mail_app_password.as_deref(),
            "send_email",
        ),
    ]
}

fn optional(name: &str, value: Option<&str>, tools: &str) -> CheckResult {
    match value {
        Some(v) => CheckResult::ok(name, &format!("configured ({})", mask(v))),
        None => CheckResult::warning(
            name,
            &format!("not set; {} will be unavailable", tools),
            &format!("Set {} in the environment or a .env file", name),
        ),
    }
}

/// Show only the edges of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Check if config file exists.
fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override defaults", config_path.display()),
        )
    }
}

fn check_static_dir(settings: &Settings) -> CheckResult {
    let dir = settings.static_dir();
    if dir.join("index.html").exists() {
        CheckResult::ok("Static UI", &format!("{}", dir.display()))
    } else {
        CheckResult::warning(
            "Static UI",
            &format!("{} has no index.html", dir.display()),
            "Only the /chat API will be available",
        )
    }
}
