pub mod rpc;

use std::sync::Arc;

use actix_web::{
    dev::ServerHandle,
    web::{self, Data},
    App, HttpServer,
};
use anyhow::Context as AnyContext;
use log::info;
use tokio::sync::Mutex;

use crate::core::{error::CoreError, ledger::Ledger, storage::Storage};
use pulse_common::rpc::{
    server::{json_rpc, RPCServerHandler},
    RPCHandler,
};

pub type SharedDaemonRpcServer<S> = Arc<DaemonRpcServer<S>>;

pub struct DaemonRpcServer<S: Storage> {
    handle: Mutex<Option<ServerHandle>>,
    rpc_handler: RPCHandler<Arc<Ledger<S>>>,
}

impl<S: Storage> DaemonRpcServer<S> {
    pub async fn new(
        ledger: Arc<Ledger<S>>,
        bind_address: String,
        workers: usize,
    ) -> Result<SharedDaemonRpcServer<S>, CoreError> {
        // register all available methods up front
        let mut rpc_handler = RPCHandler::new(ledger);
        rpc::register_methods(&mut rpc_handler);

        let server = Arc::new(Self {
            handle: Mutex::new(None),
            rpc_handler,
        });

        let cloned = Arc::clone(&server);
        let mut http_server = HttpServer::new(move || {
            App::new()
                .app_data(Data::from(Arc::clone(&cloned)))
                .route(
                    "/json_rpc",
                    web::post().to(json_rpc::<Arc<Ledger<S>>, DaemonRpcServer<S>>),
                )
        })
        .disable_signals();

        if workers > 0 {
            http_server = http_server.workers(workers);
        }

        let http_server = http_server
            .bind(&bind_address)
            .with_context(|| format!("Error while binding RPC server on {}", bind_address))?
            .run();

        info!("RPC server listening on {}", bind_address);

        {
            let mut handle = server.handle.lock().await;
            *handle = Some(http_server.handle());
        }
        tokio::spawn(http_server);

        Ok(server)
    }

    pub async fn stop(&self) {
        info!("Stopping RPC server...");
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            handle.stop(true).await;
        }
    }
}

impl<S: Storage> RPCServerHandler<Arc<Ledger<S>>> for DaemonRpcServer<S> {
    fn get_rpc_handler(&self) -> &RPCHandler<Arc<Ledger<S>>> {
        &self.rpc_handler
    }
}
