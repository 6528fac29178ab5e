mod config;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::warn;

use nimbus_core::diagnostics::{Diagnostic, Diagnostics, Severity};
use nimbus_core::differ::{self, Diff};
use nimbus_core::provider::{Provider, ProviderError};
use nimbus_core::resource::{Resource, ResourceId, State};
use nimbus_provider::{NimbusProvider, ProviderConfig, resources, validate_resource};
use nimbus_state::{LockInfo, ResourceState, StateBackend, StateFile, create_backend};

use config::{DEFAULT_CONFIG_FILE, HostConfig};

#[derive(Parser)]
#[command(name = "nimbus")]
#[command(about = "Manage Nimbus cloud resources declared in a JSON file", long_about = None)]
struct Cli {
    /// Log HTTP requests and provider operations
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print resource schemas as JSON
    Schema {
        /// Resource type (all types when omitted)
        resource_type: Option<String>,
    },
    /// Validate the configuration file
    Validate {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Create or update resources to match the configuration
    Apply {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Refresh state from the API and drop resources that no longer exist
    Refresh {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
    /// Import an existing object into state
    Import {
        /// Path to the configuration file
        file: PathBuf,
        /// Resource type (e.g. "database")
        resource_type: String,
        /// Binding name to record in state
        name: String,
        /// Composite identifier (e.g. "prod/main/app")
        id: String,
    },
    /// Delete every resource recorded in state
    Destroy {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Inspect state
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List managed resources and their identifiers
    List {
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::Validate { file } => run_validate(&file),
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Refresh { file } => run_refresh(&file).await,
        Commands::Import {
            file,
            resource_type,
            name,
            id,
        } => run_import(&file, ResourceId::new(resource_type, name), &id).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::State { command } => match command {
            StateCommands::List { file } => run_state_list(&file).await,
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; `--verbose` raises the default from `warn` to `debug`
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let output = match resource_type {
        Some(name) => resources::handler(name)
            .ok_or_else(|| format!("Unknown resource type '{}'", name))?
            .schema()
            .to_json(),
        None => serde_json::Value::Array(
            resources::handlers()
                .iter()
                .map(|h| h.schema().to_json())
                .collect(),
        ),
    };
    let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn run_validate(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;

    println!("{}", "Validating...".cyan());

    validate_all(&config.resources)?;

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", config.resources.len())
            .green()
            .bold()
    );
    for resource in &config.resources {
        println!("  • {}", resource.id);
    }
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    validate_all(&config.resources)?;

    let provider = build_provider(&config)?;
    let session = StateSession::open(&config, "apply").await?;
    let result = apply_resources(&provider, &session, &config.resources).await;
    session.close(result).await
}

async fn apply_resources(
    provider: &NimbusProvider,
    session: &StateSession,
    resources: &[Resource],
) -> Result<(), String> {
    let mut state = session.read().await?;

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let mut changed = 0;
    let mut failed = 0;
    for resource in resources {
        let id = &resource.id;
        let recorded = state.find_resource(&id.resource_type, &id.name);

        let current = match recorded {
            Some(recorded) if recorded.identifier.is_some() => {
                match provider.read(&recorded.to_state()).await {
                    Ok(current) => current,
                    Err(e) => {
                        report_failure("Failed to refresh resource", &e);
                        failed += 1;
                        continue;
                    }
                }
            }
            _ => State::not_found(id.clone()),
        };
        if recorded.is_some() && !current.exists {
            warn!("{} was deleted outside of nimbus; it will be recreated", id);
        }

        let planned = plan_change(resource, &current);
        let is_change = planned.is_change();
        let outcome = match planned {
            Diff::NoChange => {
                println!("  {} {} (no changes)", "=".dimmed(), id);
                Ok(current)
            }
            Diff::Create => {
                println!("  {} {}", "+".green(), id);
                provider
                    .create(resource)
                    .await
                    .map_err(|e| ("Failed to create resource", e))
            }
            Diff::Update { changed_attributes } => {
                let identifier = current.identifier.clone().unwrap_or_default();
                println!("  {} {} ({})", "~".yellow(), id, changed_attributes.join(", "));
                provider
                    .update(id, &identifier, &current, resource)
                    .await
                    .map_err(|e| ("Failed to update resource", e))
            }
            Diff::Replace { attributes } => Err((
                "Resource requires replacement",
                ProviderError::new(format!(
                    "changing {} requires replacing the object; destroy it first",
                    attributes.join(", ")
                ))
                .for_resource(id.clone()),
            )),
        };

        match outcome {
            Ok(new_state) if new_state.exists => {
                if is_change {
                    println!("  {} {}", "✓".green(), id);
                    changed += 1;
                }
                state.upsert_resource(ResourceState::from_state(&new_state, provider.name()));
            }
            Ok(_) => {
                state.remove_resource(&id.resource_type, &id.name);
            }
            Err((summary, e)) => {
                println!("  {} {}", "✗".red(), id);
                report_failure(summary, &e);
                failed += 1;
            }
        }
        session.write(&mut state).await?;
    }

    let orphaned: Vec<String> = state
        .resources
        .iter()
        .filter(|r| {
            !resources
                .iter()
                .any(|c| c.id.resource_type == r.resource_type && c.id.name == r.name)
        })
        .map(|r| r.id().to_string())
        .collect();
    if !orphaned.is_empty() {
        println!();
        println!(
            "{} {}",
            "Not in configuration (left untouched):".yellow(),
            orphaned.join(", ")
        );
    }

    println!();
    if failed == 0 {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", changed)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            changed, failed
        ))
    }
}

/// Compare the configuration (with defaults) against the refreshed state
fn plan_change(resource: &Resource, current: &State) -> Diff {
    let Some(handler) = resources::handler(&resource.id.resource_type) else {
        return Diff::Create;
    };
    let schema = handler.schema();
    let mut desired = resource.clone();
    schema.apply_defaults(&mut desired.attributes);
    differ::diff(&schema, &desired, current)
}

async fn run_refresh(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    let provider = build_provider(&config)?;
    let session = StateSession::open(&config, "refresh").await?;
    let result = refresh_resources(&provider, &session).await;
    session.close(result).await
}

async fn refresh_resources(
    provider: &NimbusProvider,
    session: &StateSession,
) -> Result<(), String> {
    let mut state = session.read().await?;
    let recorded = state.resources.clone();

    let mut failed = 0;
    for resource in &recorded {
        let id = resource.id();
        match provider.read(&resource.to_state()).await {
            Ok(current) if current.exists => {
                println!("  {} {}", "✓".green(), id);
                state.upsert_resource(ResourceState::from_state(&current, provider.name()));
            }
            Ok(_) => {
                println!("  {} {} (no longer exists, removed from state)", "-".red(), id);
                state.remove_resource(&id.resource_type, &id.name);
            }
            Err(e) => {
                report_failure("Failed to refresh resource", &e);
                failed += 1;
            }
        }
    }
    session.write(&mut state).await?;

    if failed == 0 {
        println!(
            "{}",
            format!("Refresh complete! {} resources in state.", state.resources.len())
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!("Refresh failed for {} resources.", failed))
    }
}

async fn run_import(file: &Path, id: ResourceId, import_id: &str) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    if resources::handler(&id.resource_type).is_none() {
        return Err(format!("Unknown resource type '{}'", id.resource_type));
    }
    let provider = build_provider(&config)?;
    let session = StateSession::open(&config, "import").await?;
    let result = import_resource(&provider, &session, id, import_id).await;
    session.close(result).await
}

async fn import_resource(
    provider: &NimbusProvider,
    session: &StateSession,
    id: ResourceId,
    import_id: &str,
) -> Result<(), String> {
    let mut state = session.read().await?;
    if let Some(existing) = state.find_resource(&id.resource_type, &id.name) {
        return Err(format!(
            "{} is already managed (identifier: {})",
            id,
            existing.identifier.as_deref().unwrap_or("none")
        ));
    }

    let imported = match provider.import(&id, import_id).await {
        Ok(imported) => imported,
        Err(e) => {
            report_failure("Failed to import resource", &e);
            return Err(format!("Import of {} failed.", id));
        }
    };
    state.upsert_resource(ResourceState::from_state(&imported, provider.name()));
    session.write(&mut state).await?;

    println!(
        "{}",
        format!("Import complete! {} is now managed as {}.", import_id, id)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    let provider = build_provider(&config)?;
    let session = StateSession::open(&config, "destroy").await?;
    let result = destroy_resources(&provider, &session, auto_approve).await;
    session.close(result).await
}

async fn destroy_resources(
    provider: &NimbusProvider,
    session: &StateSession,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = session.read().await?;

    // Reverse order: dependents were recorded after what they depend on
    let destroy_order: Vec<ResourceState> = state.resources.iter().rev().cloned().collect();
    if destroy_order.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for resource in &destroy_order {
        println!(
            "  {} {} ({})",
            "-".red().bold(),
            resource.id(),
            resource.identifier.as_deref().unwrap_or("no identifier")
        );
    }
    println!();
    println!("Plan: {} to destroy.", destroy_order.len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut success_count = 0;
    let mut failure_count = 0;
    for resource in destroy_order {
        let id = resource.id();
        let outcome = match resource.identifier.as_deref() {
            Some(identifier) => provider.delete(&id, identifier).await,
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                println!("  {} Delete {}", "✓".green(), id);
                state.remove_resource(&id.resource_type, &id.name);
                success_count += 1;
            }
            Err(e) => {
                println!("  {} Delete {}", "✗".red(), id);
                report_failure("Failed to delete resource", &e);
                failure_count += 1;
            }
        }
        session.write(&mut state).await?;
    }

    println!();
    if failure_count == 0 {
        println!(
            "{}",
            format!("Destroy complete! {} resources destroyed.", success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            success_count, failure_count
        ))
    }
}

async fn run_state_list(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    let backend = create_backend(&config.backend)
        .await
        .map_err(|e| e.to_string())?;
    let state = backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    if state.resources.is_empty() {
        println!("{}", "No resources in state.".yellow());
        return Ok(());
    }
    for resource in &state.resources {
        println!(
            "{}\t{}",
            resource.id().to_string().bold(),
            resource.identifier.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn build_provider(config: &HostConfig) -> Result<NimbusProvider, String> {
    let provider_config = ProviderConfig::from_attributes(&config.provider)
        .map_err(|e| e.to_string())?
        .with_env();
    NimbusProvider::from_config(&provider_config).map_err(|e| e.to_string())
}

fn validate_all(resources: &[Resource]) -> Result<(), String> {
    let mut diagnostics = Diagnostics::new();
    for resource in resources {
        diagnostics.extend(validate_resource(resource));
    }
    print_diagnostics(&diagnostics);

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    if errors > 0 {
        return Err(format!("Validation failed with {} error(s).", errors));
    }
    Ok(())
}

fn report_failure(summary: &str, err: &ProviderError) {
    print_diagnostics(&Diagnostic::from_provider_error(summary, err).into());
}

fn print_diagnostics(diagnostics: &Diagnostics) {
    for diagnostic in diagnostics {
        let severity = match diagnostic.severity {
            Severity::Error => "Error:".red().bold(),
            Severity::Warning => "Warning:".yellow().bold(),
        };
        eprintln!("{} {}", severity, diagnostic.summary);
        match (&diagnostic.resource, &diagnostic.attribute) {
            (Some(id), Some(attr)) => eprintln!("  with {}.{}", id, attr),
            (Some(id), None) => eprintln!("  with {}", id),
            (None, Some(attr)) => eprintln!("  on {}", attr),
            (None, None) => {}
        }
        if let Some(detail) = &diagnostic.detail {
            eprintln!("  {}", detail);
        }
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    Ok(input.trim() == "yes")
}

/// Backend plus the lock held for one mutating command
struct StateSession {
    backend: Box<dyn StateBackend>,
    lock: LockInfo,
}

impl StateSession {
    async fn open(config: &HostConfig, operation: &str) -> Result<Self, String> {
        let backend = create_backend(&config.backend)
            .await
            .map_err(|e| e.to_string())?;
        let lock = backend
            .acquire_lock(operation)
            .await
            .map_err(|e| e.to_string())?;
        Ok(Self { backend, lock })
    }

    async fn read(&self) -> Result<StateFile, String> {
        Ok(self
            .backend
            .read_state()
            .await
            .map_err(|e| e.to_string())?
            .unwrap_or_default())
    }

    async fn write(&self, state: &mut StateFile) -> Result<(), String> {
        state.increment_serial();
        self.backend
            .write_state(state)
            .await
            .map_err(|e| format!("Failed to save state: {}", e))
    }

    /// Release the lock, keeping the command's own error first
    async fn close(self, result: Result<(), String>) -> Result<(), String> {
        let released = self
            .backend
            .release_lock(&self.lock)
            .await
            .map_err(|e| format!("Failed to release state lock: {}", e));
        result.and(released)
    }
}
