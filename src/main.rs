// ABOUTME: Entry point for the labs-launcher CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use labs_launcher::config::{self, Config};
use labs_launcher::error::{Error, Result};
use labs_launcher::manager::{ContainerManager, FailureKind, LaunchRequest, ManagerError};
use labs_launcher::output::{Output, OutputMode};
use labs_launcher::puller::{self, CancelToken};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // SAFETY: no other threads exist yet; the runtime is built below.
    unsafe { puller::prepare_host_environment() };

    let level = if cli.debug {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let output = Output::new(mode);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            output.error(&format!("failed to start async runtime: {e}"));
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(cli, output)) {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, mut output: Output) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { image, force } = cli.command {
        let path = config::init_config(&cwd, image.as_deref(), force)?;
        output.success(&format!("Created {}", path.display()));
        return Ok(());
    }

    let config = Config::resolve(cli.config.as_deref(), &cwd)?;
    let manager = Arc::new(ContainerManager::from_config(&config)?);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Status => status(&manager, &output).await,
        Commands::Tags => tags(&manager, &output).await,
        Commands::Pull { tag } => {
            output.start_timer();
            pull(&manager, tag, &output).await
        }
        Commands::Update => {
            output.start_timer();
            if !manager.update_available().await? {
                output.success("Already up to date");
                return Ok(());
            }
            pull(&manager, None, &output).await
        }
        Commands::Start {
            mount,
            port,
            aux_port,
            token,
        } => {
            let defaults = config.launch_request();
            let request = LaunchRequest {
                mount: mount.unwrap_or(defaults.mount),
                token: token.unwrap_or(defaults.token),
                port: port.unwrap_or(defaults.port),
                aux_port: aux_port.unwrap_or(defaults.aux_port),
            };
            output.start_timer();
            start(&manager, &request, &output).await
        }
        Commands::Stop => stop(&manager, &output).await,
        Commands::Watch { interval } => {
            let period = interval
                .map(Duration::from_secs)
                .filter(|d| !d.is_zero())
                .unwrap_or(config.heartbeat);
            watch(&manager, period, &output).await
        }
    }
}

async fn status(manager: &ContainerManager, output: &Output) -> Result<()> {
    manager.refresh().await;
    let snapshot = manager.snapshot();

    if output.mode() == OutputMode::Json {
        output.record("status", &snapshot);
        return Ok(());
    }

    output.field("engine", if snapshot.available { "available" } else { "unreachable" });
    if snapshot.available
        && let Ok(version) = manager.engine_version().await
    {
        output.field("engine version", &version.version);
    }
    output.field("container", snapshot.status.current.as_str());
    output.field("tag", &snapshot.tag.to_string());

    if snapshot.available {
        match manager.update_available().await {
            Ok(update) => output.field("update available", if update { "yes" } else { "no" }),
            Err(e) => output.warning(&format!("could not check for updates: {e}")),
        }
    }
    if !snapshot.last_failure.is_none() {
        output.field("last failure", &snapshot.last_failure.detail);
    }
    Ok(())
}

async fn tags(manager: &ContainerManager, output: &Output) -> Result<()> {
    let remote = manager.remote_tags().await?;
    let local = match manager.latest_local_tag().await {
        Ok(tag) => tag,
        Err(e) => {
            output.warning(&e.to_string());
            None
        }
    };

    if output.mode() == OutputMode::Json {
        output.record("tags", &serde_json::json!({ "remote": remote, "local": local }));
        return Ok(());
    }

    for tag in &remote {
        if local.as_deref() == Some(tag.as_str()) {
            output.success(&format!("{tag} (local)"));
        } else {
            output.success(tag);
        }
    }
    Ok(())
}

async fn pull(manager: &ContainerManager, tag: Option<String>, output: &Output) -> Result<()> {
    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let label = match tag {
        Some(ref tag) => format!("Pulling {tag}"),
        None => "Pulling newest tag".to_string(),
    };
    let result = manager
        .pull(tag, |percent| output.percent(&label, percent), &cancel)
        .await;
    interrupt.abort();

    match result {
        Ok(Some(pulled)) => {
            output.success(&format!("Pulled {}", pulled.info.reference));
            Ok(())
        }
        Ok(None) => Err(Error::Cancelled),
        Err(e) => Err(e.into()),
    }
}

async fn start(manager: &ContainerManager, request: &LaunchRequest, output: &Output) -> Result<()> {
    manager.refresh().await;
    if !manager.snapshot().available {
        return Err(Error::EngineUnavailable);
    }

    match manager.resolve_image(None, false).await {
        Ok(Some(image)) => output.progress(&format!("Using {}", image.reference)),
        Ok(None) | Err(ManagerError::NoLocalTag { .. }) => {
            return Err(Error::NoLocalImage {
                repository: manager.settings().repository.clone(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    manager.clear_last_failure().await;
    manager.start(request).await;
    let snapshot = manager.snapshot();

    match snapshot.last_failure.kind {
        FailureKind::None => {
            output.success(&format!(
                "Started {} on http://localhost:{}/?token={}",
                manager.settings().server_name,
                request.port,
                request.token
            ));
            Ok(())
        }
        FailureKind::FileShareDenied => Err(Error::FileShareDenied {
            mount: request.mount.clone(),
        }),
        FailureKind::Unknown => Err(Error::StartFailed(snapshot.last_failure.detail)),
    }
}

async fn stop(manager: &ContainerManager, output: &Output) -> Result<()> {
    manager.stop().await;
    let snapshot = manager.snapshot();
    if !snapshot.available {
        return Err(Error::EngineUnavailable);
    }

    if let Some(stats) = snapshot.final_stats {
        if let (Some(usage), Some(limit)) = (stats.memory_usage, stats.memory_limit) {
            output.field(
                "final memory",
                &format!("{:.1} MiB / {:.1} MiB", mib(usage), mib(limit)),
            );
        }
        if let Some(cpu) = stats.cpu_percent {
            output.field("final cpu", &format!("{cpu:.1}%"));
        }
    }
    output.success("Stopped");
    Ok(())
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

async fn watch(manager: &Arc<ContainerManager>, period: Duration, output: &Output) -> Result<()> {
    let observers = manager.observers();
    let mut status = observers.subscribe_status();
    let mut available = observers.subscribe_available();
    let mut tag = observers.subscribe_tag();

    let heartbeat = manager.start_heartbeat(period);
    output.progress("Watching for changes (Ctrl-C to stop)");

    loop {
        tokio::select! {
            Ok(()) = status.changed() => {
                let change = status.borrow_and_update().clone();
                output.field("status", &format!("{} -> {}", change.previous, change.current));
            }
            Ok(()) = available.changed() => {
                let value = *available.borrow_and_update();
                output.field("engine", if value { "available" } else { "unreachable" });
            }
            Ok(()) = tag.changed() => {
                let value = tag.borrow_and_update().to_string();
                output.field("tag", &value);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    heartbeat.stop().await;
    Ok(())
}
