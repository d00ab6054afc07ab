use clap::{Args, Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "carehub", about = "CareHub API CLI")]
struct Cli {
    #[arg(long, env = "CAREHUB_BASE_URL", default_value = "http://127.0.0.1:5000")]
    base_url: String,

    /// Sent as `X-User-Id`.
    #[arg(long, env = "CAREHUB_USER_ID")]
    user_id: Option<Uuid>,

    /// Sent as `X-Organization-Id`.
    #[arg(long, env = "CAREHUB_ORGANIZATION_ID")]
    organization_id: Option<Uuid>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    user_id: Option<Uuid>,
    organization_id: Option<Uuid>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Health,
    Patients(DirectoryCommand),
    Caregivers(DirectoryCommand),
    Leave(LeaveCommand),
    Schedules(ScheduleCommand),
    /// Send an arbitrary request, e.g. `raw GET /api/tasks`.
    Raw {
        method: String,
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
}

#[derive(Args, Debug)]
struct DirectoryCommand {
    #[command(subcommand)]
    command: DirectorySubcommand,
}

#[derive(Subcommand, Debug)]
enum DirectorySubcommand {
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        per_page: Option<u32>,
    },
    Get {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct LeaveCommand {
    #[command(subcommand)]
    command: LeaveSubcommand,
}

#[derive(Subcommand, Debug)]
enum LeaveSubcommand {
    List {
        #[arg(long)]
        status: Option<String>,
    },
    Approve {
        id: Uuid,
    },
    Deny {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
struct ScheduleCommand {
    #[command(subcommand)]
    command: ScheduleSubcommand,
}

#[derive(Subcommand, Debug)]
enum ScheduleSubcommand {
    Upcoming,
    Cancel { id: Uuid },
    Start { id: Uuid },
    End { id: Uuid },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext {
        base_url: cli.base_url,
        user_id: cli.user_id,
        organization_id: cli.organization_id,
    };

    let json = match cli.command {
        Command::Health => api_request(&ctx, reqwest::Method::GET, "/health", &[], None).await?,
        Command::Patients(cmd) => run_directory(&ctx, "/api/patients", cmd).await?,
        Command::Caregivers(cmd) => run_directory(&ctx, "/api/caregivers", cmd).await?,
        Command::Leave(cmd) => run_leave(&ctx, cmd).await?,
        Command::Schedules(cmd) => run_schedules(&ctx, cmd).await?,
        Command::Raw { method, path, data } => {
            let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| CliError::InvalidMethod(method))?;
            let body = data.as_deref().map(serde_json::from_str::<Value>).transpose()?;
            api_request(&ctx, method, &path, &[], body).await?
        }
    };
    print_json(&json)
}

async fn run_directory(cli: &CliContext, base: &str, cmd: DirectoryCommand) -> Result<Value, CliError> {
    match cmd.command {
        DirectorySubcommand::List { search, page, per_page } => {
            let query = list_query(search.as_deref(), page, per_page);
            api_request(cli, reqwest::Method::GET, base, &query, None).await
        }
        DirectorySubcommand::Get { id } => {
            api_request(cli, reqwest::Method::GET, &format!("{base}/{id}"), &[], None).await
        }
        DirectorySubcommand::Delete { id } => {
            api_request(cli, reqwest::Method::DELETE, &format!("{base}/{id}"), &[], None).await
        }
    }
}

async fn run_leave(cli: &CliContext, cmd: LeaveCommand) -> Result<Value, CliError> {
    match cmd.command {
        LeaveSubcommand::List { status } => {
            let query: Vec<_> = status.into_iter().map(|status| ("status", status)).collect();
            api_request(cli, reqwest::Method::GET, "/api/leave-requests", &query, None).await
        }
        LeaveSubcommand::Approve { id } => {
            api_request(cli, reqwest::Method::POST, &format!("/api/leave-requests/{id}/approve"), &[], None).await
        }
        LeaveSubcommand::Deny { id } => {
            api_request(cli, reqwest::Method::POST, &format!("/api/leave-requests/{id}/deny"), &[], None).await
        }
    }
}

async fn run_schedules(cli: &CliContext, cmd: ScheduleCommand) -> Result<Value, CliError> {
    match cmd.command {
        ScheduleSubcommand::Upcoming => {
            api_request(cli, reqwest::Method::GET, "/api/schedules", &[("upcoming", "true".to_owned())], None).await
        }
        ScheduleSubcommand::Cancel { id } => {
            api_request(cli, reqwest::Method::DELETE, &format!("/api/schedules/{id}"), &[], None).await
        }
        ScheduleSubcommand::Start { id } => {
            api_request(cli, reqwest::Method::POST, &format!("/api/schedules/{id}/start"), &[], None).await
        }
        ScheduleSubcommand::End { id } => {
            api_request(cli, reqwest::Method::POST, &format!("/api/schedules/{id}/end"), &[], None).await
        }
    }
}

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    query: &[(&str, String)],
    body: Option<Value>,
) -> Result<Value, CliError> {
    let mut headers = HeaderMap::new();
    if let Some(user_id) = cli.user_id {
        headers.insert("x-user-id", HeaderValue::from_str(&user_id.to_string())?);
    }
    if let Some(organization_id) = cli.organization_id {
        headers.insert("x-organization-id", HeaderValue::from_str(&organization_id.to_string())?);
    }

    let client = reqwest::Client::builder()
        .default_headers(headers)
        .build()?;
    let url = join_url(&cli.base_url, path);

    let request = client.request(method, &url).query(query);
    let request = if let Some(json) = body {
        request.json(&json)
    } else {
        request
    };

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;
    let value = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text))
    };

    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: error_message(&value) });
    }

    Ok(value)
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// The server's `{code, message}` envelope, or the raw body when it is not one.
fn error_message(body: &Value) -> String {
    match body.get("message").and_then(Value::as_str) {
        Some(message) => match body.get("code").and_then(Value::as_str) {
            Some(code) => format!("{message} ({code})"),
            None => message.to_owned(),
        },
        None => match body {
            Value::Null => "empty response".to_owned(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}

fn list_query(search: Option<&str>, page: Option<u32>, per_page: Option<u32>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        params.push(("search", search.to_owned()));
    }
    if let Some(page) = page {
        params.push(("page", page.to_string()));
    }
    if let Some(per_page) = per_page {
        params.push(("per_page", per_page.to_string()));
    }
    params
}

fn print_json(value: &Value) -> Result<(), CliError> {
    if value.is_null() {
        println!("ok");
        return Ok(());
    }
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes() {
        assert_eq!(join_url("http://localhost:5000/", "/api/patients"), "http://localhost:5000/api/patients");
        assert_eq!(join_url("http://localhost:5000", "health"), "http://localhost:5000/health");
    }

    #[test]
    fn error_message_prefers_envelope() {
        let body = serde_json::json!({"code": "E_CONFLICT", "message": "leave request is already approved"});
        assert_eq!(error_message(&body), "leave request is already approved (E_CONFLICT)");
        assert_eq!(error_message(&Value::String("Bad Gateway".into())), "Bad Gateway");
        assert_eq!(error_message(&Value::Null), "empty response");
    }

    #[test]
    fn list_query_skips_blank_search() {
        assert_eq!(
            list_query(Some(" Ana Lee "), Some(2), None),
            vec![("search", "Ana Lee".to_owned()), ("page", "2".to_owned())]
        );
        assert!(list_query(Some("  "), None, None).is_empty());
    }

    #[test]
    fn query_params_are_percent_encoded_by_request_builder() {
        let request = reqwest::Client::new()
            .get(join_url("http://localhost:5000", "/api/patients"))
            .query(&list_query(Some("Ana & Lee"), None, Some(50)))
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("search=Ana+%26+Lee&per_page=50"));
    }

    #[test]
    fn cli_parses_leave_approve() {
        let id = Uuid::nil().to_string();
        let cli = Cli::try_parse_from(["carehub", "leave", "approve", &id]).unwrap();
        assert!(matches!(cli.command, Command::Leave(LeaveCommand { command: LeaveSubcommand::Approve { .. } })));
        assert_eq!(cli.base_url, "http://127.0.0.1:5000");
    }
}
