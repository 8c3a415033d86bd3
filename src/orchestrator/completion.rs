//! 单次完成信号
//!
//! 进程退出、启动失败、超时三条路径会竞争同一个结果，
//! 只有第一个到达的会被送出，其余全部丢弃

use std::sync::Mutex;
use tokio::sync::oneshot;

/// 只能触发一次的完成信号
#[derive(Debug)]
pub struct CompletionLatch<T> {
    sender: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> CompletionLatch<T> {
    /// 创建信号和对应的接收端
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let latch = Self {
            sender: Mutex::new(Some(tx)),
        };
        (latch, rx)
    }

    /// 尝试送出结果
    ///
    /// 返回 true 表示本次调用赢得了竞争（即使接收端已经不在）
    pub fn fire(&self, value: T) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_fired(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_fire_wins() {
        let (latch, rx) = CompletionLatch::channel();
        assert!(!latch.is_fired());
        assert!(latch.fire("exit"));
        assert!(!latch.fire("timeout"));
        assert!(latch.is_fired());
        assert_eq!(rx.await.unwrap(), "exit");
    }

    #[tokio::test]
    async fn test_concurrent_fires_deliver_exactly_one() {
        let (latch, rx) = CompletionLatch::channel();
        let latch = Arc::new(latch);

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let latch = latch.clone();
                tokio::spawn(async move { latch.fire(i) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(rx.await.is_ok());
    }

    #[test]
    fn test_fire_after_receiver_dropped_still_counts() {
        let (latch, rx) = CompletionLatch::channel();
        drop(rx);
        assert!(latch.fire(1));
        assert!(!latch.fire(2));
    }
}
