use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::models::UserId;

/// Serializes the turns of each user in arrival order. Turns of different
/// users never wait on each other.
///
/// Every user has a chain of tickets. A ticket waits for the one handed out
/// before it, so the order of `enter` calls is the order turns run in, no
/// matter which task gets polled first.
#[derive(Default)]
pub struct TurnGate {
    tails: Mutex<HashMap<UserId, oneshot::Receiver<()>>>,
}

/// A reserved place in a user's line.
pub struct Ticket {
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

/// A running turn. The next ticket of the same user starts once it drops.
pub struct Turn {
    _done: oneshot::Sender<()>,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the next place in line for `user_id` without waiting.
    pub fn enter(&self, user_id: UserId) -> Ticket {
        let (done, tail) = oneshot::channel();
        let previous = self
            .tails
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, tail);
        Ticket { previous, done }
    }

    /// Enters the line and waits for the turn.
    pub async fn acquire(&self, user_id: UserId) -> Turn {
        self.enter(user_id).wait().await
    }
}

impl Ticket {
    /// Resolves once every earlier ticket of the same user has finished.
    pub async fn wait(self) -> Turn {
        if let Some(previous) = self.previous {
            // The sender is only ever dropped, so this always ends in RecvError.
            let _ = previous.await;
        }
        Turn { _done: self.done }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_user_waits() {
        let gate = Arc::new(TurnGate::new());
        let first = gate.acquire(1).await;

        let waiting = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                let _turn = gate.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("second turn never started")
            .expect("task failed");
    }

    #[tokio::test]
    async fn test_other_users_do_not_wait() {
        let gate = TurnGate::new();
        let _first = gate.acquire(1).await;

        tokio::time::timeout(Duration::from_secs(1), gate.acquire(2))
            .await
            .expect("other user was blocked");
    }

    #[tokio::test]
    async fn test_turns_follow_enter_order() {
        let gate = TurnGate::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = gate.enter(1);
        let second = gate.enter(1);

        let later = {
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let _turn = second.wait().await;
                order.lock().unwrap().push("second");
            })
        };
        // Let the second ticket be polled before the first one.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(order.lock().unwrap().is_empty());

        let turn = first.wait().await;
        order.lock().unwrap().push("first");
        drop(turn);

        tokio::time::timeout(Duration::from_secs(1), later)
            .await
            .expect("second turn never started")
            .expect("task failed");
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }
}
