//! Bulk creation of test characters for load testing the backend.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::bridge::dictionary::DictionaryCache;
use crate::bridge::dispatcher::Dispatcher;
use crate::bridge::protocol::{Command, CommandKind};

/// Locale stamped on test character commands.
const TEST_USER_LOCALE: &str = "en";

/// Wait until the class list has arrived. Returns false on shutdown.
pub async fn wait_for_classes(
    dictionary: &DictionaryCache,
    poll_interval: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> bool {
    while !dictionary.is_ready() {
        if *shutdown_rx.borrow() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    return false;
                }
            }
        }
    }
    true
}

/// Create `per_class` characters of every known class, named `<class>_<n>`.
/// Returns how many commands were published.
pub async fn create_test_users(
    dispatcher: &Dispatcher,
    dictionary: &DictionaryCache,
    per_class: usize,
) -> usize {
    let classes = dictionary.snapshot_classes();
    info!(
        "Creating {} test users for each of {} classes",
        per_class,
        classes.len()
    );

    let mut created = 0;
    for n in 1..=per_class {
        for class in &classes {
            let kind = CommandKind::CreateCharacter {
                name: format!("{}_{}", class, n),
                class: class.clone(),
            };
            let command = Command::system(kind).with_locale(TEST_USER_LOCALE);
            match dispatcher.publish(command, false).await {
                Ok(_) => created += 1,
                Err(e) => warn!("Test user {}_{} not created: {}", class, n, e),
            }
        }
    }

    info!("Finished creating test users, {} sent", created);
    created
}
