use anyhow::Result;
use clap::Parser;
use clap_derive::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use switchboard_core::mcp::{
    Orchestrator, RegistryConfig, RmcpConnector, ServerEntry, TransportConfig,
    DEFAULT_MAX_ATTEMPTS, READ_RESOURCE_TOOL,
};
use switchboard_core::AgentBundle;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Connect to tool servers and explore their catalog", long_about = None)]
struct Args {
    /// Path to a server registry file (defaults to ~/.switchboard/servers.toml)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Maximum full-registry discovery attempts before degrading
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Seconds to wait between discovery attempts
    #[arg(long, default_value_t = 2)]
    retry_delay: u64,

    /// Per-call timeout in seconds, overriding the registry's setting
    #[arg(long, env = "SWITCHBOARD_CALL_TIMEOUT")]
    call_timeout: Option<u64>,

    #[arg(long, short)]
    tracing: bool,
}

fn setup_tracing(enable: bool) {
    let level = if enable { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default subscriber failed");
}

/// Registry mirroring the standard local deployment: a spawned math server
/// plus networked weather, web search, and image generation servers.
fn default_registry() -> Result<RegistryConfig> {
    let base_dir = std::env::current_dir()?;
    let math_server = base_dir.join("servers").join("math").join("server.py");

    let mut registry = RegistryConfig::new();
    registry.add_server(ServerEntry {
        name: "math".to_string(),
        transport: TransportConfig::Stdio {
            command: "python".to_string(),
            args: vec![math_server.to_string_lossy().into_owned()],
            cwd: None,
        },
        fallback: true,
    })?;
    registry.add_server(ServerEntry {
        name: "weather".to_string(),
        transport: TransportConfig::StreamableHttp {
            url: "http://127.0.0.1:8000/mcp".to_string(),
        },
        fallback: false,
    })?;
    registry.add_server(ServerEntry {
        name: "web".to_string(),
        transport: TransportConfig::StreamableHttp {
            url: "http://127.0.0.1:8001/mcp".to_string(),
        },
        fallback: false,
    })?;
    registry.add_server(ServerEntry {
        name: "image_gen".to_string(),
        transport: TransportConfig::StreamableHttp {
            url: "http://127.0.0.1:8003/mcp".to_string(),
        },
        fallback: false,
    })?;
    Ok(registry)
}

fn load_registry(args: &Args) -> Result<RegistryConfig> {
    match &args.registry {
        Some(path) => {
            let registry = RegistryConfig::load_from(path)?;
            if registry.servers.is_empty() {
                anyhow::bail!("Registry file {} declares no servers", path.display());
            }
            Ok(registry)
        }
        None => {
            let registry = RegistryConfig::load()?;
            if registry.servers.is_empty() {
                return default_registry();
            }
            Ok(registry)
        }
    }
}

enum Command {
    Tools,
    Resources,
    Read(String),
    Call(String, serde_json::Value),
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if matches!(trimmed.to_lowercase().as_str(), "quit" | "exit" | "q") {
        return Command::Quit;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Unknown(trimmed.to_string());
    };
    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };
    match cmd {
        "tools" => Command::Tools,
        "resources" => Command::Resources,
        "read" => Command::Read(arg.to_string()),
        "call" => {
            let (name, json) = match arg.split_once(char::is_whitespace) {
                Some((name, json)) => (name, json.trim()),
                None => (arg, ""),
            };
            let arguments = if json.is_empty() {
                serde_json::json!({})
            } else {
                match serde_json::from_str(json) {
                    Ok(value) => value,
                    Err(e) => return Command::Unknown(format!("invalid JSON arguments: {e}")),
                }
            };
            Command::Call(name.to_string(), arguments)
        }
        "help" => Command::Help,
        other => Command::Unknown(format!("/{other}")),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /tools                 list every tool in the catalog");
    println!("  /resources             list every resource URI");
    println!("  /read <uri>            read a resource");
    println!("  /call <tool> {{json}}    invoke a tool with named arguments");
    println!("  quit | exit | q        leave");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.tracing);

    let registry = load_registry(&args)?;
    let timeout = args.call_timeout.unwrap_or(registry.call_timeout_secs);

    println!("Connecting to {} servers...", registry.servers.len());
    let connector = RmcpConnector::new(Duration::from_secs(timeout));
    let mut orchestrator = Orchestrator::new(connector, registry)
        .with_max_attempts(args.max_attempts)
        .with_retry_delay(Duration::from_secs(args.retry_delay));

    let result = orchestrator.initialize().await?;

    if result.degraded {
        println!(
            "WARNING: running degraded, unreachable servers: {}",
            result.failed_servers.join(", ")
        );
    }

    println!("Loaded {} tools:", result.catalog.tools.len());
    for tool in &result.catalog.tools {
        println!(
            "  - {} [{}]: {}",
            tool.name,
            tool.server,
            tool.description.as_deref().unwrap_or("(no description)")
        );
    }
    println!("Loaded {} resources:", result.catalog.resources.len());
    for resource in &result.catalog.resources {
        println!("  - {} [{}]", resource.uri, resource.server);
    }

    let bundle = AgentBundle::new(&result);
    println!("\nExplore the catalog (/help for commands).\n");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Tools => {
                for tool in bundle.tools() {
                    println!(
                        "  - {}: {}",
                        tool.name,
                        tool.description.as_deref().unwrap_or("(no description)")
                    );
                }
            }
            Command::Resources => {
                for resource in &result.catalog.resources {
                    println!("  - {}", resource.uri);
                }
            }
            Command::Read(uri) => {
                let content = bundle
                    .invoke(READ_RESOURCE_TOOL, serde_json::json!({ "uri": uri }))
                    .await;
                println!("{content}");
            }
            Command::Call(name, arguments) => {
                let output = bundle.invoke(&name, arguments).await;
                println!("{output}");
            }
            Command::Unknown(what) => {
                println!("Unrecognized input: {what}");
                print_help();
            }
        }
    }

    println!("Bye.");
    result.client.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_aliases_are_recognized() {
        assert!(matches!(parse_command("quit"), Command::Quit));
        assert!(matches!(parse_command("  EXIT "), Command::Quit));
        assert!(matches!(parse_command("q"), Command::Quit));
    }

    #[test]
    fn call_parses_name_and_json_arguments() {
        match parse_command(r#"/call add {"a": 1, "b": 2}"#) {
            Command::Call(name, args) => {
                assert_eq!(name, "add");
                assert_eq!(args["a"], 1);
            }
            _ => panic!("expected a call command"),
        }
    }

    #[test]
    fn call_without_arguments_gets_an_empty_object() {
        match parse_command("/call add") {
            Command::Call(name, args) => {
                assert_eq!(name, "add");
                assert!(args.as_object().unwrap().is_empty());
            }
            _ => panic!("expected a call command"),
        }
    }

    #[test]
    fn read_keeps_the_uri() {
        match parse_command("/read weather://alerts") {
            Command::Read(uri) => assert_eq!(uri, "weather://alerts"),
            _ => panic!("expected a read command"),
        }
    }

    #[test]
    fn explicit_empty_registry_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "switchboard-empty-registry-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "").unwrap();
        let args = Args {
            registry: Some(path.clone()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: 2,
            call_timeout: None,
            tracing: false,
        };
        let result = load_registry(&args);
        std::fs::remove_file(&path).ok();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("no servers"), "got: {err:#}");
    }

    #[test]
    fn default_registry_marks_math_as_fallback() {
        let registry = default_registry().unwrap();
        let fallback: Vec<String> = registry
            .fallback_servers()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(fallback, vec!["math"]);
    }
}
