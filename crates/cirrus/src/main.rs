use cirrus_apiserver::{ApiServer, AppState, Config as ApiConfig};
use cirrus_backend::{BlockStorage, CinderClient, CinderConfig};
use cirrus_core::CreateVolumeRequest;
use cirrus_provisioner::{MismatchPolicy, ProvisionerConfig, ProvisioningController};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "cirrus", about = "Cirrus block-volume provisioner for OpenStack Cinder")]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "CIRRUS_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve CreateVolume requests over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080", env = "CIRRUS_BIND")]
        bind: String,

        #[command(flatten)]
        openstack: OpenStackArgs,

        #[command(flatten)]
        provisioner: ProvisionerArgs,
    },
    /// Create (or fetch) a single volume and print it as JSON
    Create {
        /// Volume name
        name: String,

        /// Volume type passed as the `vtype` parameter
        #[arg(long)]
        vtype: Option<String>,

        #[command(flatten)]
        openstack: OpenStackArgs,

        #[command(flatten)]
        provisioner: ProvisionerArgs,
    },
}

#[derive(Args)]
struct OpenStackArgs {
    /// Keystone v3 endpoint
    #[arg(long, env = "OS_AUTH_URL")]
    auth_url: String,

    #[arg(long, env = "OS_USERNAME")]
    username: String,

    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    password: String,

    /// Project (tenant) id the token is scoped to
    #[arg(long, env = "OS_PROJECT_ID")]
    project_id: String,

    #[arg(long, default_value = "Default", env = "OS_USER_DOMAIN_NAME")]
    domain_name: String,

    #[arg(long, default_value = cirrus_backend::config::DEFAULT_REGION, env = "OS_REGION_NAME")]
    region: String,

    /// Use this block-storage endpoint instead of the service catalog
    #[arg(long, env = "CIRRUS_VOLUME_ENDPOINT")]
    volume_endpoint: Option<String>,

    /// Volumes requested per listing page
    #[arg(long, default_value_t = cirrus_backend::config::DEFAULT_PAGE_SIZE, env = "CIRRUS_PAGE_SIZE")]
    page_size: u32,

    /// Timeout for each OpenStack request, in seconds
    #[arg(long, default_value_t = 30, env = "CIRRUS_REQUEST_TIMEOUT")]
    request_timeout: u64,
}

impl OpenStackArgs {
    fn cinder_config(&self) -> CinderConfig {
        let mut config = CinderConfig::new(
            &self.auth_url,
            &self.username,
            &self.password,
            &self.project_id,
            &self.domain_name,
        );
        config.region = self.region.clone();
        config.volume_endpoint = self.volume_endpoint.clone();
        config.page_size = self.page_size;
        config.request_timeout = Duration::from_secs(self.request_timeout);
        config
    }
}

#[derive(Args)]
struct ProvisionerArgs {
    /// Directory under which a mount directory is kept for every volume
    #[arg(long, env = "CIRRUS_MOUNT_ROOT")]
    mount_root: Option<PathBuf>,

    /// Size of new volumes, in GiB
    #[arg(long, default_value_t = 1, env = "CIRRUS_DEFAULT_SIZE")]
    default_size: u64,

    /// Description stored on new volumes
    #[arg(long, default_value = "CSI Volume", env = "CIRRUS_DESCRIPTION")]
    description: String,

    /// What to do when an existing volume differs from the request (ignore, reject)
    #[arg(long, default_value_t = MismatchPolicy::Ignore, env = "CIRRUS_MISMATCH_POLICY")]
    mismatch_policy: MismatchPolicy,
}

impl ProvisionerArgs {
    fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            mount_root: self.mount_root.clone(),
            default_size_gib: self.default_size,
            description: self.description.clone(),
            mismatch_policy: self.mismatch_policy,
        }
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve {
            bind,
            openstack,
            provisioner,
        } => run_serve(&bind, &openstack, &provisioner).await,
        Commands::Create {
            name,
            vtype,
            openstack,
            provisioner,
        } => run_create(name, vtype, &openstack, &provisioner).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Run the HTTP server until ctrl-c
async fn run_serve(
    bind: &str,
    openstack: &OpenStackArgs,
    provisioner: &ProvisionerArgs,
) -> miette::Result<()> {
    info!("Starting cirrus provisioner");

    let listen_addr = bind
        .parse()
        .map_err(|e| miette::miette!("Invalid bind address '{}': {}", bind, e))?;

    let controller = create_controller(openstack, provisioner).await?;

    let token = CancellationToken::new();
    let state = Arc::new(AppState::new(controller, token.clone()));
    let server = ApiServer::new(ApiConfig { listen_addr }, state);

    let server_token = token.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("API server error: {}", e);
            server_token.cancel();
        }
    });

    info!("Provisioner ready on {}", bind);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| miette::miette!("Failed to listen for ctrl-c: {}", e))?;
            info!("Shutting down gracefully...");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }

    let shutdown_timeout = Duration::from_secs(5);
    if tokio::time::timeout(shutdown_timeout, server_handle)
        .await
        .is_err()
    {
        warn!("API server did not stop within {:?}", shutdown_timeout);
    }

    info!("Shutdown complete");

    Ok(())
}

/// Provision one volume and print the resulting record
async fn run_create(
    name: String,
    vtype: Option<String>,
    openstack: &OpenStackArgs,
    provisioner: &ProvisionerArgs,
) -> miette::Result<()> {
    let controller = create_controller(openstack, provisioner).await?;

    let mut request = CreateVolumeRequest::new(name);
    if let Some(vtype) = vtype {
        request = request.with_parameter(cirrus_core::VTYPE_PARAM, vtype);
    }

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let provisioned = controller.create_volume(request, &token).await?;
    info!(
        "Volume '{}' is {} ({:?})",
        provisioned.record.name, provisioned.record.id, provisioned.outcome
    );

    let json = serde_json::to_string_pretty(&provisioned.record)
        .map_err(|e| miette::miette!("Failed to encode volume record: {}", e))?;
    println!("{}", json);

    Ok(())
}

/// Authenticate against OpenStack and build the controller
async fn create_controller(
    openstack: &OpenStackArgs,
    provisioner: &ProvisionerArgs,
) -> miette::Result<Arc<ProvisioningController>> {
    let client = CinderClient::connect(openstack.cinder_config()).await?;
    let backend: Arc<dyn BlockStorage> = Arc::new(client);

    Ok(Arc::new(ProvisioningController::new(
        backend,
        provisioner.provisioner_config(),
    )))
}
