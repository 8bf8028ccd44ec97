//! Commands that talk to a running Jars API server

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use jars_core::{
    start_notification_poller, ApiClient, FileCredentials, Notification, PollerConfig,
};
use tracing::info;

/// API client using the saved token file
pub fn api_client(api_url: &str) -> ApiClient {
    ApiClient::new(api_url, Arc::new(FileCredentials::default()))
}

pub async fn cmd_login(client: &ApiClient, email: &str, password: &str) -> Result<()> {
    let auth = client
        .login(email, password)
        .await
        .with_context(|| format!("Login to {} failed", client.base_url()))?;

    let name = if auth.user.full_name.is_empty() {
        auth.user.email.as_str()
    } else {
        auth.user.full_name.as_str()
    };
    println!("✅ Logged in as {}", name);
    Ok(())
}

pub async fn cmd_logout(client: &ApiClient) -> Result<()> {
    client.logout().await.context("Failed to remove saved token")?;
    println!("👋 Logged out");
    Ok(())
}

fn print_notification(n: &Notification) {
    let marker = if n.is_read() { " " } else { "●" };
    println!("   {} [{}] {}", marker, n.notification_id, n.title);
    if !n.message.is_empty() {
        println!("       {}", n.message);
    }
}

pub async fn cmd_notifications_list(client: &ApiClient) -> Result<()> {
    let notifications = client
        .list_notifications()
        .await
        .context("Failed to fetch notifications")?;

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    let unread = notifications.iter().filter(|n| !n.is_read()).count();
    println!();
    println!("🔔 Notifications ({} unread)", unread);
    println!("   ─────────────────────────────────────────────────────────────");
    for n in &notifications {
        print_notification(n);
    }

    Ok(())
}

/// Notifications not seen in any earlier poll; remembers the ones returned
pub fn new_notifications(seen: &mut HashSet<String>, batch: &[Notification]) -> Vec<Notification> {
    batch
        .iter()
        .filter(|n| seen.insert(n.notification_id.clone()))
        .cloned()
        .collect()
}

pub async fn cmd_notifications_watch(client: ApiClient, interval: Option<u64>) -> Result<()> {
    let config = match interval {
        Some(secs) => PollerConfig::from_secs(secs),
        None => PollerConfig::default(),
    };
    println!(
        "🔔 Watching notifications every {}s (Ctrl+C to stop)",
        config.interval.as_secs()
    );

    let seen = Mutex::new(HashSet::new());
    let handle = start_notification_poller(Arc::new(client), config, move |batch| {
        let Ok(mut seen) = seen.lock() else {
            return;
        };
        let fresh = new_notifications(&mut seen, &batch);
        if fresh.is_empty() {
            return;
        }
        let unread = batch.iter().filter(|n| !n.is_read()).count();
        println!();
        println!("🔔 {} new ({} unread)", fresh.len(), unread);
        for n in &fresh {
            print_notification(n);
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Stopping notification watch");
    handle.shutdown().await;

    Ok(())
}
