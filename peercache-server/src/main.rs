//! Reference fleet node: wires a [`peercache::Group`] backed by a small
//! in-memory sample loader, a [`peercache::PeerPool`], and serves both the
//! inbound peer RPC route and the HTTP server loop.
//!
//! This binary is not part of the core library; it exists purely to give
//! `peercache` a runnable demonstration, the same role the original
//! source's `main.go` plays for its own library.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use peercache::error::CacheError;
use peercache::pool::PeerPool;
use tracing::info;

/// A node in a peercache fleet.
#[derive(Parser, Debug)]
#[command(name = "peercache-server", about = "Runs one node of a peercache fleet")]
struct Args {
    /// This node's own address, as `host:port`. Must also appear in `--peers`.
    #[arg(long)]
    self_addr: SocketAddr,

    /// Every peer address in the fleet, including this node's own.
    #[arg(long, value_delimiter = ',')]
    peers: Vec<SocketAddr>,

    /// Name of the cache group to serve.
    #[arg(long, default_value = "scores")]
    group: String,

    /// Byte budget for the group's cache.
    #[arg(long, default_value_t = 1 << 20)]
    max_bytes: i64,
}

fn sample_db() -> HashMap<&'static str, &'static str> {
    let mut db = HashMap::new();
    db.insert("Tom", "630");
    db.insert("Jack", "888");
    db.insert("Mike", "321");
    db
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let db = sample_db();

    let group = peercache::new_group(args.group.clone(), args.max_bytes, move |key: &str| {
        info!(key = %key, "slow source lookup");
        db.get(key)
            .map(|v| v.as_bytes().to_vec())
            .ok_or_else(|| CacheError::loader_msg(format!("{key} not exist")))
    });

    let self_addr_str = args.self_addr.to_string();
    let pool = Arc::new(PeerPool::new(self_addr_str.clone()));
    let peer_addrs: Vec<String> = args.peers.iter().map(ToString::to_string).collect();
    pool.set(peer_addrs);
    group.register_peers(pool.clone());

    let router = pool.router();
    info!(addr = %args.self_addr, group = %args.group, "starting peercache node");

    let listener = tokio::net::TcpListener::bind(args.self_addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
