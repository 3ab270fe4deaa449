use std::process::ExitCode;

use subpub::{
    init_logging,
    network::banner::{print_banner, print_startup_log, BannerInfo},
    App, Settings,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let logging = match init_logging(settings.logging.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let listen = settings.listen_addr();
    print_banner(&BannerInfo {
        listen: &listen,
        queue_capacity: settings.queue_capacity,
        max_connections: settings.max_connections,
    });

    let app = App::new(settings);
    let code = serve_until_signal(&app).await;

    logging.shutdown();
    code
}

/// Обслуживает клиентов до SIGINT/SIGTERM или ошибки сервера, затем
/// останавливает сервис.
async fn serve_until_signal(app: &App) -> ExitCode {
    let server = match app.bind().await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    print_startup_log();

    let mut failed = false;
    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "Server stopped with error");
                failed = true;
            }
        }
        signal = wait_for_signal() => {
            info!(signal, "Received shutdown signal");
        }
    }

    if let Err(e) = app.stop(app.settings().shutdown_timeout()).await {
        error!(error = %e, "Shutdown did not complete cleanly");
        failed = true;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!(error = %e, "Cannot install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
