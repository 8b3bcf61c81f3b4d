//! Cooperative cancellation shared by every long-lived task.

use tokio::sync::watch;

/// A linked cancellation pair. Sending `true` (or dropping the sender)
/// resolves every pending [`cancelled`] call on the receiver.
pub fn cancel_pair() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolves once the cancellation flag is raised or the sender is gone.
pub async fn cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolves_on_cancel() {
        let (tx, mut rx) = cancel_pair();
        let waiter = tokio::spawn(async move { cancelled(&mut rx).await });

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation did not propagate")
            .unwrap();
    }

    #[tokio::test]
    async fn resolves_on_sender_drop() {
        let (tx, mut rx) = cancel_pair();
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), cancelled(&mut rx))
            .await
            .expect("drop did not propagate");
    }
}
