use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

/// 跟踪的文件数量上限，超出时淘汰最早记录的条目
pub const MAX_TRACKED_FILES: usize = 10_000;

#[derive(Debug, Default)]
struct TrackerState {
    failures: HashMap<String, (u32, u64)>,
    sequence: u64,
}

/// 进程内的瞬时失败计数，按 file-id 记录
///
/// 经典队列不会带 `x-delivery-count`，重新入队的消息只有 `redelivered` 标志，
/// 投递标签每次都会变化，所以用 file-id 关联同一请求的多次投递。
/// 首次投递（`redelivered == false`）会清除旧的计数；请求被接受或被丢弃后条目移除。
#[derive(Debug)]
pub struct RedeliveryTracker {
    state: Mutex<TrackerState>,
    capacity: usize,
}

impl Default for RedeliveryTracker {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_FILES)
    }
}

impl RedeliveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            capacity: capacity.max(1),
        }
    }

    /// 本次投递之前已经因瞬时错误重新入队的次数
    pub fn failures_before(&self, file_id: &str, redelivered: bool) -> u32 {
        let mut state = self.lock();
        if !redelivered {
            state.failures.remove(file_id);
            return 0;
        }
        state.failures.get(file_id).map(|(count, _)| *count).unwrap_or(0)
    }

    /// 记录一次重新入队
    pub fn record_requeue(&self, file_id: &str, failures: u32) {
        let mut state = self.lock();
        state.sequence += 1;
        let sequence = state.sequence;

        if !state.failures.contains_key(file_id) && state.failures.len() >= self.capacity {
            let oldest = state
                .failures
                .iter()
                .min_by_key(|(_, (_, seq))| *seq)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!(file_id = %oldest, "重投计数表已满，淘汰最早的条目");
                state.failures.remove(&oldest);
            }
        }

        state.failures.insert(file_id.to_string(), (failures, sequence));
    }

    pub fn forget(&self, file_id: &str) {
        self.lock().failures.remove(file_id);
    }

    pub fn len(&self) -> usize {
        self.lock().failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        // 临界区内没有可能panic的代码，中毒的锁仍可继续使用
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_only_redelivered_attempts() {
        let tracker = RedeliveryTracker::new();
        assert_eq!(tracker.failures_before("abc", true), 0);

        tracker.record_requeue("abc", 1);
        tracker.record_requeue("abc", 2);
        assert_eq!(tracker.failures_before("abc", true), 2);

        // 同一个file-id的新消息从头计数
        assert_eq!(tracker.failures_before("abc", false), 0);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_forget_removes_entry() {
        let tracker = RedeliveryTracker::new();
        tracker.record_requeue("abc", 1);
        tracker.forget("abc");
        assert_eq!(tracker.failures_before("abc", true), 0);
    }

    #[test]
    fn test_capacity_evicts_oldest_entry() {
        let tracker = RedeliveryTracker::with_capacity(2);
        tracker.record_requeue("first", 1);
        tracker.record_requeue("second", 1);
        tracker.record_requeue("third", 1);

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.failures_before("first", true), 0);
        assert_eq!(tracker.failures_before("second", true), 1);
        assert_eq!(tracker.failures_before("third", true), 1);
    }
}
