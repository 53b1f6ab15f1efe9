use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use url::Url;

/// Serves `app` on an ephemeral local port for the duration of the test.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn url_for(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).unwrap()
}
