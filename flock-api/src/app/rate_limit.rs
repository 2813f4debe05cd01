use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// 按 key 计数的滑动窗口限流器（内存实现）。
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    buckets: Mutex<HashMap<String, VecDeque<Instant>>>,
    sweep_threshold: usize,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Mutex::new(HashMap::new()),
            sweep_threshold: 1024,
        }
    }

    /// 记录一次尝试并返回是否放行；超限时不记录。
    pub async fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        let bucket = buckets.entry(key.to_string()).or_default();
        while bucket
            .front()
            .map(|t| now.duration_since(*t) >= self.window)
            .unwrap_or(false)
        {
            bucket.pop_front();
        }
        let allowed = bucket.len() < self.limit;
        if allowed {
            bucket.push_back(now);
        }

        if buckets.len() > self.sweep_threshold {
            let window = self.window;
            buckets.retain(|_, times| {
                times.retain(|t| now.duration_since(*t) < window);
                !times.is_empty()
            });
        }
        allowed
    }

    /// 清空某个 key 的计数（例如登录成功后）
    pub async fn forget(&self, key: &str) {
        self.buckets.lock().await.remove(key);
    }
}
