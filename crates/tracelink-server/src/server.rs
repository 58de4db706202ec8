use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracelink_core::{Credentials, ListenerAddr, Settings, TokenIssuer};
use tracelink_store::EventStore;

use crate::auth::AuthGate;
use crate::capture::{self, CaptureState};
use crate::error::ServerError;
use crate::operator::{self, OperatorState};
use crate::render::CodeRenderer;
use crate::shutdown::ShutdownCoordinator;

/// Bind both listeners and start serving them.
///
/// The listeners share `store` and nothing else. When the capture port is
/// `0`, links issued without a public URL point at the port actually bound.
pub async fn start(
    settings: &Settings,
    store: EventStore,
    credentials: Credentials,
    renderer: Arc<dyn CodeRenderer>,
) -> Result<ServerHandle, ServerError> {
    let capture_listener = bind(&settings.capture).await?;
    let capture_addr = capture_listener.local_addr()?;
    let operator_listener = bind(&settings.operator).await?;
    let operator_addr = operator_listener.local_addr()?;

    let mut effective = settings.clone();
    effective.capture.port = capture_addr.port();

    let capture_router = capture::router(CaptureState::new(store.clone()), settings.max_body_bytes);
    let operator_router = operator::router(
        OperatorState {
            store,
            issuer: Arc::new(TokenIssuer::new(&effective)),
            renderer,
            codes_dir: settings.codes_dir(),
        },
        AuthGate::new(credentials),
        &settings.static_dir(),
    );

    let shutdown = ShutdownCoordinator::new();
    let tasks = vec![
        serve("capture", capture_listener, capture_router, shutdown.token()),
        serve("operator", operator_listener, operator_router, shutdown.token()),
    ];

    tracing::info!(%capture_addr, %operator_addr, "listeners started");

    Ok(ServerHandle {
        capture_addr,
        operator_addr,
        shutdown,
        tasks,
    })
}

async fn bind(addr: &ListenerAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind((addr.host.as_str(), addr.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

fn serve(
    name: &'static str,
    listener: TcpListener,
    router: Router,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let service = router.into_make_service_with_connect_info::<SocketAddr>();
        if let Err(e) = axum::serve(listener, service)
            .with_graceful_shutdown(token.cancelled_owned())
            .await
        {
            tracing::error!(listener = name, error = %e, "listener stopped with error");
        }
        tracing::info!(listener = name, "listener stopped");
    })
}

/// Running listeners; dropping it leaves them running until process exit.
pub struct ServerHandle {
    pub capture_addr: SocketAddr,
    pub operator_addr: SocketAddr,
    shutdown: ShutdownCoordinator,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Stop accepting, drain in-flight requests, and wait for both listeners.
    pub async fn shutdown(self) -> bool {
        self.shutdown.graceful_shutdown(self.tasks, None).await
    }
}
