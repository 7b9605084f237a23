//! stratus CLI entrypoint.
//!
//! This is the main entrypoint for the stratus command-line tool.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use stratus_deploy::azure::{ArmClient, AzureProvisioner, StackObserver, StackProvisioner};
use stratus_deploy::cli::{Cli, Commands, OutputFormatter, StateCommands};
use stratus_deploy::config::{
    find_config_file, ConfigHasher, ConfigParser, ConfigValidator, DeployConfig,
};
use stratus_deploy::error::Result;
use stratus_deploy::graph::DeploymentContext;
use stratus_deploy::package::SitePackage;
use stratus_deploy::planner::{DeploymentPlan, DiffEngine};
use stratus_deploy::stack::{StackResource, StaticSiteStack};
use stratus_deploy::state::{
    holder_id, DeploymentHistoryEntry, DeploymentOperation, DeploymentState, LocalStateStore,
    StateStore, STATE_DIR,
};

use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);

    match cli.command {
        Commands::Init { path, force } => cmd_init(&path, force),
        Commands::Validate { warnings } => cmd_validate(cli.config.as_ref(), warnings),
        Commands::Preview { detailed } => {
            cmd_preview(cli.config.as_ref(), detailed, &formatter).await
        }
        Commands::Up { yes } => cmd_up(cli.config.as_ref(), yes, &formatter).await,
        Commands::Status { health } => cmd_status(cli.config.as_ref(), health, &formatter).await,
        Commands::Outputs { show_secrets } => {
            cmd_outputs(cli.config.as_ref(), show_secrets, &formatter).await
        }
        Commands::Destroy { yes } => cmd_destroy(cli.config.as_ref(), yes).await,
        Commands::State { command } => cmd_state(cli.config.as_ref(), command, &formatter).await,
    }
}

/// Initialize a new project.
fn cmd_init(path: &PathBuf, force: bool) -> Result<()> {
    info!("Initializing new stratus project in: {}", path.display());

    let config_path = path.join(stratus_deploy::config::CONFIG_FILE_NAME);
    let env_path = path.join(".env.example");
    let gitignore_path = path.join(".gitignore");

    if !force && config_path.exists() {
        eprintln!("Configuration file already exists: {}", config_path.display());
        eprintln!("Use --force to overwrite.");
        return Ok(());
    }

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    let config_template = include_str!("../templates/stratus.deploy.yaml");
    std::fs::write(&config_path, config_template)?;
    eprintln!("Created: {}", config_path.display());

    let env_template = include_str!("../templates/.env.example");
    std::fs::write(&env_path, env_template)?;
    eprintln!("Created: {}", env_path.display());

    let gitignore_entries = [".env", ".stratus/"];
    if gitignore_path.exists() {
        let existing = std::fs::read_to_string(&gitignore_path)?;
        let missing: Vec<_> = gitignore_entries
            .iter()
            .filter(|e| !existing.contains(*e))
            .collect();
        if !missing.is_empty() {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            writeln!(file, "\n# stratus")?;
            for entry in missing {
                writeln!(file, "{entry}")?;
            }
            eprintln!("Updated: {}", gitignore_path.display());
        }
    } else {
        std::fs::write(&gitignore_path, ".env\n.stratus/\n")?;
        eprintln!("Created: {}", gitignore_path.display());
    }

    eprintln!("\nProject initialized successfully!");
    eprintln!("Next steps:");
    eprintln!("  1. Copy .env.example to .env and fill in your Azure credentials");
    eprintln!("  2. Edit stratus.deploy.yaml and point site.source at your site");
    eprintln!("  3. Run 'stratus validate' to check your configuration");
    eprintln!("  4. Run 'stratus preview' to see what will be deployed");
    eprintln!("  5. Run 'stratus up' to deploy the stack");

    Ok(())
}

/// Validate configuration.
fn cmd_validate(config_path: Option<&PathBuf>, show_warnings: bool) -> Result<()> {
    let config_file = resolve_config_path(config_path)?;
    info!("Validating configuration: {}", config_file.display());

    let parser = ConfigParser::new().with_base_path(
        config_file
            .parent()
            .unwrap_or_else(|| std::path::Path::new(".")),
    );
    parser.load_dotenv()?;
    let config = parser.load_with_env(&config_file)?;

    let validator = ConfigValidator::new();
    let result = validator.validate(&config)?;

    eprintln!("Configuration is valid!");
    if show_warnings && !result.warnings.is_empty() {
        eprintln!("\nWarnings:");
        for warning in &result.warnings {
            eprintln!("  - {warning}");
        }
    }

    eprintln!("\nConfiguration summary:");
    eprintln!("  Project:         {}", config.project.name);
    eprintln!("  Environment:     {}", config.project.environment);
    eprintln!("  Location:        {}", config.project.location);
    eprintln!("  Resource group:  {}", config.resource_group_name());
    eprintln!("  Storage account: {}", config.storage_account_name());
    eprintln!("  Web app:         {}", config.web_app_name());

    Ok(())
}

/// Show what the next deployment would change.
async fn cmd_preview(
    config_path: Option<&PathBuf>,
    detailed: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let package = SitePackage::load(&config.site.source)?;
    let state = state_store.load().await?;

    let hasher = ConfigHasher::new();
    let config_hash = hasher.hash_config(&config, package.content_hash());
    let diff = DiffEngine::new().compute(&config, state.as_ref(), package.content_hash());
    let plan = DeploymentPlan::from_diff(&diff, &config_hash);

    eprintln!("{}", formatter.format_plan(&plan));

    if detailed {
        eprintln!("\nResource hashes:");
        for entry in &diff.entries {
            eprintln!(
                "  {:18} {} ({})",
                entry.resource.name(),
                hasher.short_hash(&entry.desired_hash),
                entry.action
            );
        }
    }

    Ok(())
}

/// Deploy the stack.
async fn cmd_up(
    config_path: Option<&PathBuf>,
    auto_approve: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let package = SitePackage::load(&config.site.source)?;

    let mut state = state_store.load().await?.unwrap_or_else(|| {
        DeploymentState::new(&config.project.name, &config.project.environment)
    });

    let hasher = ConfigHasher::new();
    let config_hash = hasher.hash_config(&config, package.content_hash());
    let diff = DiffEngine::new().compute(&config, Some(&state), package.content_hash());
    let plan = DeploymentPlan::from_diff(&diff, &config_hash);

    if plan.is_empty() {
        eprintln!("{}", formatter.format_plan(&plan));
        return Ok(());
    }

    eprintln!("{}", formatter.format_plan(&plan));

    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Deployment cancelled.");
        return Ok(());
    }

    let lock = state_store.acquire_lock(&holder_id()).await?;
    let result = deploy(&config, &package, &mut state, formatter).await;

    // Record the outcome before releasing the lock either way.
    match &result {
        Ok(()) => {
            state.add_history(DeploymentHistoryEntry::new(
                DeploymentOperation::Deploy,
                &config_hash,
            ));
            state.config_hash.clone_from(&config_hash);
        }
        Err(e) => {
            state.add_history(DeploymentHistoryEntry::failed(
                DeploymentOperation::Deploy,
                &config_hash,
                &e.to_string(),
            ));
        }
    }
    state_store.save(&state).await?;
    state_store.release_lock(&lock.lock_id).await?;

    result
}

/// Runs the deployment graph and records resolved resources into state.
async fn deploy(
    config: &DeployConfig,
    package: &SitePackage,
    state: &mut DeploymentState,
    formatter: &OutputFormatter,
) -> Result<()> {
    let provisioner: Arc<dyn StackProvisioner> =
        Arc::new(AzureProvisioner::new(create_arm_client()?));

    let skip_upload = state.package_matches(&config.storage.blob, package.content_hash());
    let package_hash = package.content_hash().to_string();
    let package_size = package.size_bytes();

    info!(
        "Deploying stack '{}' ({} nodes)",
        config.project.name,
        StackResource::ALL.len()
    );

    let mut ctx = DeploymentContext::new();
    let outputs = StaticSiteStack::build(
        &mut ctx,
        config,
        provisioner,
        package.clone(),
        skip_upload,
    );

    ctx.run().await?;

    // Everything resolved; record resource identities and hashes.
    let hasher = ConfigHasher::new();
    let resource_group = outputs.resource_group.resolve().await?;
    let storage_account = outputs.storage_account.resolve().await?;
    let container = outputs.container.resolve().await?;
    let blob = outputs.blob.resolve().await?;
    let plan_id = outputs.app_service_plan_id.resolve().await?;
    let blob_url = outputs.blob_url.resolve().await?;
    let app_url = outputs.app_url.resolve().await?;

    let azure_names: &[(StackResource, &str)] = &[
        (StackResource::ResourceGroup, &resource_group),
        (StackResource::StorageAccount, &storage_account),
        (StackResource::StaticWebsite, &storage_account),
        (StackResource::BlobContainer, &container),
        (StackResource::SiteArchive, &blob),
        (StackResource::AppServicePlan, &plan_id),
        (StackResource::WebApp, &app_url),
    ];
    for (resource, azure_name) in azure_names {
        state.set_resource(
            resource.name(),
            azure_name,
            &hasher.hash_resource(config, *resource, &package_hash),
        );
    }
    state.set_package(&blob, &package_hash, package_size);
    state.set_outputs(&blob_url, &app_url);

    eprintln!("\n{} Stack deployed.", "✓".green());
    eprintln!("{}", formatter.format_outputs(&blob_url, &app_url, None));

    Ok(())
}

/// Show live stack status.
async fn cmd_status(
    config_path: Option<&PathBuf>,
    include_health: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, _) = load_config(config_path)?;
    let observer = StackObserver::new(create_arm_client()?);

    let status = observer.observe(&config).await?;

    let health = match (&status.app_host, include_health) {
        (Some(host), true) => Some(observer.probe_site(host).await?),
        _ => None,
    };

    eprintln!("{}", formatter.format_status(&status, health.as_ref()));

    Ok(())
}

/// Show the exported stack outputs.
async fn cmd_outputs(
    config_path: Option<&PathBuf>,
    show_secrets: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;

    let Some(state) = state_store.load().await? else {
        eprintln!("No deployment recorded. Run 'stratus up' first.");
        return Ok(());
    };

    let Some(outputs) = &state.outputs else {
        eprintln!("No outputs recorded. Run 'stratus up' first.");
        return Ok(());
    };

    // The storage key is a secret: never persisted, fetched live on demand.
    let primary_key = if show_secrets {
        let provisioner = AzureProvisioner::new(create_arm_client()?);
        let keys = provisioner
            .list_account_keys(
                &config.resource_group_name(),
                &config.storage_account_name(),
            )
            .await?;
        keys.into_iter().next().map(|key| key.value)
    } else {
        None
    };

    eprintln!(
        "{}",
        formatter.format_outputs(&outputs.blob_url, &outputs.app_url, primary_key.as_deref())
    );

    Ok(())
}

/// Destroy the deployed stack.
async fn cmd_destroy(config_path: Option<&PathBuf>, auto_approve: bool) -> Result<()> {
    let (config, state_store) = load_config_and_state(config_path)?;
    let resource_group = config.resource_group_name();

    if let Some(state) = state_store.load().await? {
        let plan = DeploymentPlan::for_destroy(&state);
        eprintln!("The following resources will be destroyed:");
        for action in &plan.actions {
            eprintln!("  - {}", action.resource_name);
        }
    } else {
        eprintln!("No state recorded; the resource group '{resource_group}' will be deleted.");
    }

    if !auto_approve
        && !confirm(
            "\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ",
            "destroy",
        )?
    {
        eprintln!("Destruction cancelled.");
        return Ok(());
    }

    let provisioner = AzureProvisioner::new(create_arm_client()?);
    provisioner.delete_resource_group(&resource_group).await?;
    eprintln!("Delete accepted for resource group: {resource_group}");

    state_store.delete().await?;
    eprintln!("State cleared.");

    Ok(())
}

/// State management commands.
async fn cmd_state(
    config_path: Option<&PathBuf>,
    command: StateCommands,
    formatter: &OutputFormatter,
) -> Result<()> {
    let (_config, state_store) = load_config_and_state(config_path)?;

    match command {
        StateCommands::Show => {
            if let Some(state) = state_store.load().await? {
                eprintln!("{}", formatter.format_state(&state));
            } else {
                eprintln!("No state found.");
            }
        }
        StateCommands::Unlock { lock_id, force } => {
            if force {
                if let Some(lock_info) = state_store.get_lock_info().await? {
                    state_store.release_lock(&lock_info.lock_id).await?;
                    eprintln!("State forcefully unlocked.");
                } else {
                    eprintln!("State is not locked.");
                }
            } else if let Some(id) = lock_id {
                state_store.release_lock(&id).await?;
                eprintln!("State unlocked.");
            } else {
                eprintln!("Please provide --lock-id or use --force");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Prompts on stderr and compares the answer case-insensitively.
fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim().eq_ignore_ascii_case(expected))
}

/// Resolves the configuration file path.
fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}

/// Loads and validates the configuration.
fn load_config(config_path: Option<&PathBuf>) -> Result<(DeployConfig, PathBuf)> {
    let config_file = resolve_config_path(config_path)?;
    debug!("Loading configuration from: {}", config_file.display());

    let base_path = config_file
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."))
        .to_path_buf();

    let parser = ConfigParser::new().with_base_path(&base_path);
    parser.load_dotenv()?;

    let config = parser.load_with_env(&config_file)?;
    ConfigValidator::new().validate(&config)?;

    Ok((config, base_path))
}

/// Loads configuration and creates the state store next to it.
fn load_config_and_state(
    config_path: Option<&PathBuf>,
) -> Result<(DeployConfig, LocalStateStore)> {
    let (config, base_path) = load_config(config_path)?;

    let state_dir = config
        .state
        .path
        .as_ref()
        .map_or_else(|| base_path.join(STATE_DIR), PathBuf::from);

    Ok((config, LocalStateStore::new(state_dir)))
}

/// Creates an ARM client from environment credentials.
fn create_arm_client() -> Result<ArmClient> {
    let token = ConfigParser::get_arm_token()?;
    let subscription_id = ConfigParser::get_subscription_id()?;
    ArmClient::new(&token, &subscription_id)
}
